use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Row of the `users` table.
/// Users are provisioned by the auth subsystem; this service only reads them
/// (and inserts them when loading fixtures).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
}

/// JWT claims issued by the auth subsystem.
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub user_id: Uuid,
    pub exp: u64,
}
