pub mod comment_dtos;
pub mod follow_dtos;
pub mod group_dtos;
pub mod pagination_dtos;
pub mod post_dtos;

use serde::{Deserialize, Deserializer};

pub const REQUIRED: &str = "Обязательное поле.";
pub const MAY_NOT_BE_NULL: &str = "Это поле не может быть null.";
pub const MAY_NOT_BE_BLANK: &str = "Это поле не может быть пустым.";

/// Keeps "field absent" and "field is null" apart:
/// absent -> `None`, `null` -> `Some(None)`, value -> `Some(Some(v))`.
/// Use together with `#[serde(default)]`.
pub fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Shared rules for required text fields: present, not null, not blank.
/// Surrounding whitespace is trimmed from the stored value.
/// Returns `Ok(None)` when the field is absent on a partial update.
pub fn validate_text(value: Option<Option<String>>, partial: bool) -> Result<Option<String>, &'static str> {
    match value {
        None if partial => Ok(None),
        None => Err(REQUIRED),
        Some(None) => Err(MAY_NOT_BE_NULL),
        Some(Some(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                Err(MAY_NOT_BE_BLANK)
            } else {
                Ok(Some(trimmed.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Payload {
        #[serde(default, deserialize_with = "deserialize_some")]
        text: Option<Option<String>>,
    }

    #[test]
    fn absent_and_null_are_distinguished() {
        let absent: Payload = serde_json::from_str("{}").unwrap();
        let null: Payload = serde_json::from_str(r#"{"text": null}"#).unwrap();
        let value: Payload = serde_json::from_str(r#"{"text": "hi"}"#).unwrap();
        assert_eq!(absent.text, None);
        assert_eq!(null.text, Some(None));
        assert_eq!(value.text, Some(Some("hi".to_string())));
    }

    #[test]
    fn text_rules() {
        assert_eq!(validate_text(None, false), Err(REQUIRED));
        assert_eq!(validate_text(None, true), Ok(None));
        assert_eq!(validate_text(Some(None), true), Err(MAY_NOT_BE_NULL));
        assert_eq!(validate_text(Some(Some("   ".into())), false), Err(MAY_NOT_BE_BLANK));
        assert_eq!(
            validate_text(Some(Some("  hi ".into())), false),
            Ok(Some("hi".to_string()))
        );
    }
}
