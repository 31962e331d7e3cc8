use serde::{Deserialize, Serialize};

use super::{MAY_NOT_BE_NULL, REQUIRED, deserialize_some};
use crate::error::{ApiError, ApiResult, FieldErrors, NON_FIELD_ERRORS};
use crate::models::{Follow, User};
use crate::repositories::Store;

pub const CANNOT_FOLLOW_SELF: &str = "Нельзя подписаться на самого себя!";
pub const ALREADY_SUBSCRIBED: &str = "Вы уже подписаны на этого автора!";

pub fn user_does_not_exist(username: &str) -> String {
    format!("Объект с username={} не существует.", username)
}

/// `user` is always the requester, so only `following` is read.
#[derive(Debug, Default, Deserialize)]
pub struct FollowPayload {
    #[serde(default, deserialize_with = "deserialize_some")]
    pub following: Option<Option<String>>,
}

impl FollowPayload {
    /// Resolves `following` by username, then rejects self-follow, then
    /// rejects an existing subscription. Returns the user to follow.
    pub async fn validate(self, store: &dyn Store, requester: &User) -> ApiResult<User> {
        let username = match self.following {
            None => return Err(field_error(REQUIRED)),
            Some(None) => return Err(field_error(MAY_NOT_BE_NULL)),
            Some(Some(name)) if name.is_empty() => return Err(field_error(MAY_NOT_BE_NULL)),
            Some(Some(name)) => name,
        };
        let Some(following) = store.find_user_by_username(&username).await? else {
            return Err(field_error(user_does_not_exist(&username)));
        };
        if following.id == requester.id {
            return Err(field_error(CANNOT_FOLLOW_SELF));
        }
        if store.follow_exists(requester.id, following.id).await? {
            return Err(ApiError::Validation(FieldErrors::single(
                NON_FIELD_ERRORS,
                ALREADY_SUBSCRIBED,
            )));
        }
        Ok(following)
    }
}

fn field_error(message: impl Into<String>) -> ApiError {
    ApiError::Validation(FieldErrors::single("following", message))
}

#[derive(Debug, Serialize)]
pub struct FollowOut {
    pub user: String,
    pub following: String,
}

impl From<Follow> for FollowOut {
    fn from(follow: Follow) -> Self {
        FollowOut {
            user: follow.user_username,
            following: follow.following_username,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct FollowQuery {
    pub search: Option<String>,
}

impl FollowQuery {
    /// Search terms split on whitespace and commas.
    pub fn terms(&self) -> Vec<String> {
        self.search
            .as_deref()
            .unwrap_or_default()
            .replace('\0', "")
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|term| !term.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewFollow;
    use crate::repositories::MemoryStore;
    use uuid::Uuid;

    async fn setup() -> (MemoryStore, User, User) {
        let store = MemoryStore::new();
        let bob = User { id: Uuid::new_v4(), username: "bob".into() };
        let alice = User { id: Uuid::new_v4(), username: "alice".into() };
        store.insert_user(bob.clone()).await.unwrap();
        store.insert_user(alice.clone()).await.unwrap();
        (store, bob, alice)
    }

    fn payload(following: &str) -> FollowPayload {
        FollowPayload { following: Some(Some(following.to_string())) }
    }

    fn messages(err: ApiError, field: &str) -> Vec<String> {
        match err {
            ApiError::Validation(errors) => errors.get(field).unwrap_or_default().to_vec(),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn resolves_followed_user() {
        let (store, bob, alice) = setup().await;
        let following = payload("alice").validate(&store, &bob).await.unwrap();
        assert_eq!(following, alice);
    }

    #[tokio::test]
    async fn self_follow_is_checked_before_duplicates() {
        let (store, bob, _) = setup().await;
        let err = payload("bob").validate(&store, &bob).await.unwrap_err();
        assert_eq!(messages(err, "following"), vec![CANNOT_FOLLOW_SELF]);
    }

    #[tokio::test]
    async fn existing_subscription_is_rejected() {
        let (store, bob, alice) = setup().await;
        store
            .create_follow(NewFollow { user_id: bob.id, following_id: alice.id })
            .await
            .unwrap();
        let err = payload("alice").validate(&store, &bob).await.unwrap_err();
        assert_eq!(messages(err, NON_FIELD_ERRORS), vec![ALREADY_SUBSCRIBED]);
    }

    #[tokio::test]
    async fn unknown_missing_and_null_following() {
        let (store, bob, _) = setup().await;
        let err = payload("carol").validate(&store, &bob).await.unwrap_err();
        assert_eq!(messages(err, "following"), vec![user_does_not_exist("carol")]);
        let err = FollowPayload::default().validate(&store, &bob).await.unwrap_err();
        assert_eq!(messages(err, "following"), vec![REQUIRED]);
        let err = FollowPayload { following: Some(None) }
            .validate(&store, &bob)
            .await
            .unwrap_err();
        assert_eq!(messages(err, "following"), vec![MAY_NOT_BE_NULL]);
    }

    #[test]
    fn search_terms_split_on_spaces_and_commas() {
        let query = FollowQuery { search: Some(" al, ice  bo ".into()) };
        assert_eq!(query.terms(), vec!["al", "ice", "bo"]);
        assert!(FollowQuery::default().terms().is_empty());
    }
}
