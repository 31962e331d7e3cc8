use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Foreign key from a post to its group.
pub const GROUP_REFERENCE: &str = "posts_group_id_fkey";

/// Post joined with its author's username.
/// `pub_date` is written once on insert; updates never touch it.
#[derive(Debug, Clone)]
pub struct Post {
    pub id: i64,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    /// Path relative to the media root, e.g. `posts/<uuid>.png`.
    pub image: Option<String>,
    pub author_id: Uuid,
    pub author_username: String,
    pub group_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub text: String,
    pub image: Option<String>,
    pub author_id: Uuid,
    pub group_id: Option<i64>,
}

/// Fields to overwrite on update. `None` leaves the column as is.
#[derive(Debug, Clone, Default)]
pub struct PostChanges {
    pub text: Option<String>,
    pub image: Option<Option<String>>,
    pub group_id: Option<Option<i64>>,
}

impl PostChanges {
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.image.is_none() && self.group_id.is_none()
    }
}
