//! Startup data for administrator-managed records: users provisioned by the
//! auth subsystem and groups.

use std::path::Path;

use anyhow::{Context, Result};
use log::{info, warn};
use serde::Deserialize;

use crate::dtos::group_dtos::validate_new_group;
use crate::models::{NewGroup, User};
use crate::repositories::{Store, StoreError};

#[derive(Debug, Default, Deserialize)]
pub struct Fixtures {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub groups: Vec<NewGroup>,
}

impl Fixtures {
    pub async fn read(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("cannot read fixtures from {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("invalid fixtures in {}", path.display()))
    }

    /// Upserts users and inserts groups. Invalid groups and groups whose slug
    /// is already taken are skipped with a warning.
    pub async fn load(self, store: &dyn Store) -> Result<()> {
        let user_count = self.users.len();
        for user in self.users {
            store
                .insert_user(user)
                .await
                .context("failed to insert fixture user")?;
        }

        let mut group_count = 0;
        for group in self.groups {
            if let Err(errors) = validate_new_group(&group) {
                warn!("skipping group {:?}: {:?}", group.slug, errors);
                continue;
            }
            match store.insert_group(group).await {
                Ok(_) => group_count += 1,
                Err(StoreError::Constraint { message, .. }) => warn!("skipping group: {}", message),
                Err(e) => return Err(e).context("failed to insert fixture group"),
            }
        }

        info!("loaded {} users and {} groups from fixtures", user_count, group_count);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::MemoryStore;

    #[tokio::test]
    async fn loads_users_and_skips_bad_groups() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixtures.json");
        std::fs::write(
            &path,
            r#"{
                "users": [{"id": "6f1c7a52-3b1e-4c0a-9a57-0d3c1f0e2a11", "username": "alice"}],
                "groups": [
                    {"title": "Cats", "slug": "cats", "description": "about cats"},
                    {"title": "Cats again", "slug": "cats", "description": ""},
                    {"title": "Bad", "slug": "bad slug", "description": ""}
                ]
            }"#,
        )
        .unwrap();

        let store = MemoryStore::new();
        Fixtures::read(&path).await.unwrap().load(&store).await.unwrap();

        assert!(store.find_user_by_username("alice").await.unwrap().is_some());
        let groups = store.list_groups().await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].description, "about cats");
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        assert!(Fixtures::read(Path::new("/nonexistent/fixtures.json")).await.is_err());
    }
}
