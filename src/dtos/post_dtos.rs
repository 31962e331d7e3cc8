use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{deserialize_some, validate_text};
use crate::error::{ApiResult, FieldErrors};
use crate::models::Post;
use crate::repositories::Store;
use crate::services::media_service::{DecodedImage, MediaStorage, decode_image};

/// Body of POST/PUT/PATCH `/posts/`. `id`, `author` and `pub_date` are
/// read-only and ignored when sent.
#[derive(Debug, Default, Deserialize)]
pub struct PostPayload {
    #[serde(default, deserialize_with = "deserialize_some")]
    pub text: Option<Option<String>>,
    /// `data:image/<fmt>;base64,...`
    #[serde(default, deserialize_with = "deserialize_some")]
    pub image: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub group: Option<Option<i64>>,
}

/// Payload that passed validation; the image is decoded but not stored yet.
#[derive(Debug)]
pub struct ValidatedPost {
    pub text: Option<String>,
    pub image: Option<Option<DecodedImage>>,
    pub group: Option<Option<i64>>,
}

pub fn group_does_not_exist(id: i64) -> String {
    format!("Недопустимый первичный ключ \"{}\" - объект не существует.", id)
}

impl PostPayload {
    /// `partial` is true for PATCH: absent fields are left unchanged.
    pub async fn validate(self, store: &dyn Store, partial: bool) -> ApiResult<ValidatedPost> {
        let mut errors = FieldErrors::new();

        let text = validate_text(self.text, partial).unwrap_or_else(|msg| {
            errors.add("text", msg);
            None
        });

        let image = match self.image {
            Some(Some(data)) => match decode_image(&data) {
                Ok(image) => Some(Some(image)),
                Err(msg) => {
                    errors.add("image", msg);
                    None
                }
            },
            Some(None) => Some(None),
            None => None,
        };

        if let Some(Some(group_id)) = self.group {
            if store.get_group(group_id).await?.is_none() {
                errors.add("group", group_does_not_exist(group_id));
            }
        }

        errors.into_result()?;
        Ok(ValidatedPost {
            text,
            image,
            group: self.group,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct PostOut {
    pub id: i64,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub author: String,
    pub image: Option<String>,
    pub group: Option<i64>,
}

impl PostOut {
    pub fn new(post: Post, media: &MediaStorage, base_url: &str) -> Self {
        PostOut {
            id: post.id,
            text: post.text,
            pub_date: post.pub_date,
            author: post.author_username,
            image: post.image.map(|name| media.url(base_url, &name)),
            group: post.group_id,
        }
    }
}
