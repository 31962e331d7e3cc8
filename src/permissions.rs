//! Write access for posts and comments: reads are open, changes are reserved
//! for the author. Authentication itself is enforced by requiring an
//! `AuthenticatedUser` in the handler signature.

use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::middleware::auth_extractor::AuthenticatedUser;

/// Fails with 403 unless `requester` wrote the object.
pub fn ensure_author(requester: &AuthenticatedUser, author_id: Uuid) -> ApiResult<()> {
    if requester.user.id == author_id {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;

    #[test]
    fn only_author_passes() {
        let bob = AuthenticatedUser {
            user: User { id: Uuid::new_v4(), username: "bob".into() },
        };
        assert!(ensure_author(&bob, bob.user.id).is_ok());
        assert!(matches!(ensure_author(&bob, Uuid::new_v4()), Err(ApiError::Forbidden)));
    }
}
