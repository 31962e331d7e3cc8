// src/middleware/auth_extractor.rs - bearer token -> requesting user
use actix_web::{FromRequest, HttpRequest, dev::Payload, web};
use futures::future::LocalBoxFuture;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use log::debug;

use crate::AppState;
use crate::error::{ApiError, NOT_AUTHENTICATED};
use crate::models::User;
use crate::models::user::JwtClaims;

pub const INVALID_TOKEN: &str = "Данный токен недействителен для любого типа токена";
pub const USER_NOT_FOUND: &str = "Пользователь не найден";

/// The user making the request, loaded from the store.
/// Use `Option<AuthenticatedUser>` on endpoints open to anonymous readers.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: User,
}

impl FromRequest for AuthenticatedUser {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<AuthenticatedUser, ApiError>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let token = bearer_token(req);
        let state = req.app_data::<web::Data<AppState>>().cloned();

        Box::pin(async move {
            let state = state.ok_or_else(|| ApiError::Internal("application state missing".into()))?;
            let token = token.ok_or_else(|| ApiError::NotAuthenticated(NOT_AUTHENTICATED.into()))?;

            let claims = decode_claims(&token, &state.jwt_secret).map_err(|e| {
                debug!("rejected token: {}", e);
                ApiError::NotAuthenticated(INVALID_TOKEN.into())
            })?;

            match state.store.find_user(claims.user_id).await? {
                Some(user) => Ok(AuthenticatedUser { user }),
                None => Err(ApiError::NotAuthenticated(USER_NOT_FOUND.into())),
            }
        })
    }
}

/// Token from `Authorization: Bearer <token>`; other schemes count as absent.
fn bearer_token(req: &HttpRequest) -> Option<String> {
    let header = req.headers().get("Authorization")?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Verifies an HS256 token and returns its claims.
pub fn decode_claims(token: &str, secret: &str) -> Result<JwtClaims, jsonwebtoken::errors::Error> {
    let validation = Validation::new(Algorithm::HS256);
    decode::<JwtClaims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use uuid::Uuid;

    fn token(user_id: Uuid, secret: &str, exp: u64) -> String {
        encode(
            &Header::default(),
            &JwtClaims { user_id, exp },
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn far_future() -> u64 {
        (chrono::Utc::now().timestamp() + 3600) as u64
    }

    #[test]
    fn valid_token_yields_user_id() {
        let id = Uuid::new_v4();
        let claims = decode_claims(&token(id, "secret", far_future()), "secret").unwrap();
        assert_eq!(claims.user_id, id);
    }

    #[test]
    fn wrong_secret_and_expired_tokens_are_rejected() {
        let id = Uuid::new_v4();
        assert!(decode_claims(&token(id, "other", far_future()), "secret").is_err());
        assert!(decode_claims(&token(id, "secret", 1), "secret").is_err());
        assert!(decode_claims("not-a-jwt", "secret").is_err());
    }

    #[test]
    fn only_bearer_scheme_is_read() {
        let req = actix_web::test::TestRequest::default()
            .insert_header(("Authorization", "Bearer abc.def.ghi"))
            .to_http_request();
        assert_eq!(bearer_token(&req).as_deref(), Some("abc.def.ghi"));

        let req = actix_web::test::TestRequest::default()
            .insert_header(("Authorization", "Token abc"))
            .to_http_request();
        assert_eq!(bearer_token(&req), None);
    }
}
