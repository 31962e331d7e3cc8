use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{deserialize_some, validate_text};
use crate::error::{ApiError, ApiResult, FieldErrors};
use crate::models::Comment;

/// Only `text` is writable; `post` comes from the URL and `author` from the
/// requester.
#[derive(Debug, Default, Deserialize)]
pub struct CommentPayload {
    #[serde(default, deserialize_with = "deserialize_some")]
    pub text: Option<Option<String>>,
}

impl CommentPayload {
    /// New text, or `None` for a PATCH that leaves it untouched.
    pub fn validate(self, partial: bool) -> ApiResult<Option<String>> {
        validate_text(self.text, partial)
            .map_err(|msg| ApiError::Validation(FieldErrors::single("text", msg)))
    }
}

#[derive(Debug, Serialize)]
pub struct CommentOut {
    pub id: i64,
    pub author: String,
    pub post: i64,
    pub text: String,
    pub created: DateTime<Utc>,
}

impl From<Comment> for CommentOut {
    fn from(comment: Comment) -> Self {
        CommentOut {
            id: comment.id,
            author: comment.author_username,
            post: comment.post_id,
            text: comment.text,
            created: comment.created,
        }
    }
}
