use std::collections::BTreeMap;

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use log::error;
use serde::Serialize;
use thiserror::Error;

use crate::repositories::StoreError;

pub const NOT_FOUND: &str = "Страница не найдена.";
pub const PERMISSION_DENIED: &str = "У вас недостаточно прав для выполнения данного действия.";
pub const NOT_AUTHENTICATED: &str = "Учетные данные не были предоставлены.";

pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Field name -> messages, serialised as `{"field": ["msg"]}`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` when nothing was collected.
    pub fn into_result(self) -> Result<(), ApiError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self))
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed: {0:?}")]
    Validation(FieldErrors),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotAuthenticated(String),
    #[error("{}", PERMISSION_DENIED)]
    Forbidden,
    #[error("{}", NOT_FOUND)]
    NotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("media storage error: {0}")]
    Media(#[from] std::io::Error),
    #[error("{0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Serialize)]
struct Detail<'a> {
    detail: &'a str,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotAuthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Store(StoreError::Constraint { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Store(_) | ApiError::Media(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        match self {
            ApiError::Validation(errors) => HttpResponse::build(status).json(errors),
            ApiError::Store(StoreError::Constraint { message, .. }) => {
                HttpResponse::build(status).json(FieldErrors::single(NON_FIELD_ERRORS, message.clone()))
            }
            ApiError::Store(_) | ApiError::Media(_) | ApiError::Internal(_) => {
                error!("request failed: {}", self);
                HttpResponse::build(status).json(Detail {
                    detail: "Internal server error",
                })
            }
            other => HttpResponse::build(status).json(Detail {
                detail: &other.to_string(),
            }),
        }
    }
}
