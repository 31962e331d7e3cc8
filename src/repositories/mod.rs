pub mod memory_store;
pub mod pg_store;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Comment, Follow, Group, NewComment, NewFollow, NewGroup, NewPost, Post, PostChanges, User,
    follow, group,
};

pub use memory_store::MemoryStore;
pub use pg_store::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A storage-level integrity constraint rejected the write.
    #[error("{message}")]
    Constraint {
        constraint: String,
        message: String,
    },
    /// A referenced row (author, post, group) does not exist. Carries the
    /// foreign key name when the backend reports one.
    #[error("missing related row: {0}")]
    MissingReference(String),
    #[error("database error: {0}")]
    Database(#[from] tokio_postgres::Error),
    #[error("pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),
}

impl StoreError {
    /// Builds a constraint violation carrying the descriptive message for `name`.
    pub fn constraint(name: &str) -> Self {
        let message = constraint_message(name)
            .map(str::to_string)
            .unwrap_or_else(|| format!("constraint \"{}\" violated", name));
        StoreError::Constraint {
            constraint: name.to_string(),
            message,
        }
    }

    pub fn is_missing(&self, reference: &str) -> bool {
        matches!(self, StoreError::MissingReference(r) if r == reference)
    }
}

/// Violation message for one of our named constraints.
pub fn constraint_message(constraint: &str) -> Option<&'static str> {
    match constraint {
        follow::UNIQUE_SUBSCRIBE => Some(follow::UNIQUE_SUBSCRIBE_MESSAGE),
        follow::FOLLOWING_IS_NOT_USER => Some(follow::FOLLOWING_IS_NOT_USER_MESSAGE),
        group::UNIQUE_SLUG => Some(group::UNIQUE_SLUG_MESSAGE),
        _ => None,
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence seam shared by the PostgreSQL and in-memory backends.
/// Both backends enforce the follow constraints, the group slug uniqueness
/// and the cascade rules on their own.
#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_user(&self, user: User) -> StoreResult<()>;
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    async fn insert_group(&self, group: NewGroup) -> StoreResult<Group>;
    async fn list_groups(&self) -> StoreResult<Vec<Group>>;
    async fn get_group(&self, id: i64) -> StoreResult<Option<Group>>;
    /// Admin-side removal. The group's posts and their comments go with it.
    /// Returns false if it did not exist.
    async fn delete_group(&self, id: i64) -> StoreResult<bool>;

    async fn count_posts(&self) -> StoreResult<i64>;
    /// Newest first. `limit = None` returns everything from `offset`.
    async fn list_posts(&self, limit: Option<i64>, offset: i64) -> StoreResult<Vec<Post>>;
    async fn get_post(&self, id: i64) -> StoreResult<Option<Post>>;
    async fn create_post(&self, post: NewPost) -> StoreResult<Post>;
    async fn update_post(&self, id: i64, changes: PostChanges) -> StoreResult<Option<Post>>;
    /// Removes the post and its comments. Returns false if it did not exist.
    async fn delete_post(&self, id: i64) -> StoreResult<bool>;

    async fn list_comments(&self, post_id: i64) -> StoreResult<Vec<Comment>>;
    async fn get_comment(&self, post_id: i64, id: i64) -> StoreResult<Option<Comment>>;
    async fn create_comment(&self, comment: NewComment) -> StoreResult<Comment>;
    async fn update_comment(&self, post_id: i64, id: i64, text: String) -> StoreResult<Option<Comment>>;
    async fn delete_comment(&self, post_id: i64, id: i64) -> StoreResult<bool>;

    /// Subscriptions of `user_id` whose followed username contains every term
    /// (case-insensitive).
    async fn list_follows(&self, user_id: Uuid, search_terms: &[String]) -> StoreResult<Vec<Follow>>;
    async fn follow_exists(&self, user_id: Uuid, following_id: Uuid) -> StoreResult<bool>;
    async fn create_follow(&self, follow: NewFollow) -> StoreResult<Follow>;
}
