use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::error::FieldErrors;
use crate::models::group::{NewGroup, SLUG_MAX_LENGTH, TITLE_MAX_LENGTH};
use crate::models::Group;

const INVALID_SLUG: &str =
    "Значение должно состоять только из латинских букв, цифр, знаков подчеркивания или дефиса.";

fn slug_pattern() -> &'static Regex {
    static SLUG: OnceLock<Regex> = OnceLock::new();
    SLUG.get_or_init(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("slug pattern is valid"))
}

fn too_long(max: usize, actual: usize) -> String {
    format!(
        "Убедитесь, что это значение содержит не более {} символов (сейчас {}).",
        max, actual
    )
}

/// Field checks for administrator-provided groups.
pub fn validate_new_group(group: &NewGroup) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    let title_len = group.title.chars().count();
    if title_len > TITLE_MAX_LENGTH {
        errors.add("title", too_long(TITLE_MAX_LENGTH, title_len));
    }
    let slug_len = group.slug.chars().count();
    if slug_len > SLUG_MAX_LENGTH {
        errors.add("slug", too_long(SLUG_MAX_LENGTH, slug_len));
    }
    if !slug_pattern().is_match(&group.slug) {
        errors.add("slug", INVALID_SLUG);
    }
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[derive(Debug, Serialize)]
pub struct GroupOut {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
}

impl From<Group> for GroupOut {
    fn from(group: Group) -> Self {
        GroupOut {
            id: group.id,
            title: group.title,
            slug: group.slug,
            description: group.description,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(title: &str, slug: &str) -> NewGroup {
        NewGroup {
            title: title.into(),
            slug: slug.into(),
            description: String::new(),
        }
    }

    #[test]
    fn accepts_plain_slug() {
        assert!(validate_new_group(&group("Cats", "cats_and-dogs-2")).is_ok());
    }

    #[test]
    fn rejects_bad_slug_and_long_title() {
        let errors = validate_new_group(&group(&"x".repeat(201), "кошки")).unwrap_err();
        assert_eq!(errors.get("slug"), Some(&[INVALID_SLUG.to_string()][..]));
        assert_eq!(errors.get("title"), Some(&[too_long(200, 201)][..]));
    }
}
