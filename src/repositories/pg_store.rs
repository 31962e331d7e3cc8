// src/repositories/pg_store.rs - PostgreSQL backend over a deadpool pool

use async_trait::async_trait;
use deadpool_postgres::Pool;
use log::{debug, info};
use tokio_postgres::Row;
use tokio_postgres::error::SqlState;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::models::{
    Comment, Follow, Group, NewComment, NewFollow, NewGroup, NewPost, Post, PostChanges, User,
};

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

const POST_COLUMNS: &str =
    "p.id, p.text, p.pub_date, p.image, p.author_id, u.username AS author_username, p.group_id";
const COMMENT_COLUMNS: &str =
    "c.id, c.text, c.created, c.author_id, u.username AS author_username, c.post_id";
const FOLLOW_COLUMNS: &str = "f.id, f.user_id, u.username AS user_username, \
     f.following_id, fu.username AS following_username";

#[derive(Clone)]
pub struct PgStore {
    pool: Pool,
}

impl PgStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Creates the tables and constraints if they are missing.
    pub async fn migrate(&self) -> StoreResult<()> {
        let client = self.pool.get().await?;
        client.batch_execute(SCHEMA).await.map_err(map_db_error)?;
        info!("database schema is up to date");
        Ok(())
    }
}

/// Translates constraint violations into `StoreError::Constraint` so callers
/// see the same errors as from the in-memory backend.
fn map_db_error(err: tokio_postgres::Error) -> StoreError {
    if let Some(db) = err.as_db_error() {
        let code = db.code();
        if code == &SqlState::UNIQUE_VIOLATION || code == &SqlState::CHECK_VIOLATION {
            if let Some(constraint) = db.constraint() {
                return StoreError::constraint(constraint);
            }
        }
        if code == &SqlState::FOREIGN_KEY_VIOLATION {
            let reference = db.constraint().unwrap_or(db.message());
            return StoreError::MissingReference(reference.to_string());
        }
    }
    StoreError::Database(err)
}

fn user_from_row(row: &Row) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
    }
}

fn group_from_row(row: &Row) -> Group {
    Group {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get("slug"),
        description: row.get("description"),
    }
}

fn post_from_row(row: &Row) -> Post {
    Post {
        id: row.get("id"),
        text: row.get("text"),
        pub_date: row.get("pub_date"),
        image: row.get("image"),
        author_id: row.get("author_id"),
        author_username: row.get("author_username"),
        group_id: row.get("group_id"),
    }
}

fn comment_from_row(row: &Row) -> Comment {
    Comment {
        id: row.get("id"),
        text: row.get("text"),
        created: row.get("created"),
        author_id: row.get("author_id"),
        author_username: row.get("author_username"),
        post_id: row.get("post_id"),
    }
}

fn follow_from_row(row: &Row) -> Follow {
    Follow {
        id: row.get("id"),
        user_id: row.get("user_id"),
        user_username: row.get("user_username"),
        following_id: row.get("following_id"),
        following_username: row.get("following_username"),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_user(&self, user: User) -> StoreResult<()> {
        let client = self.pool.get().await?;
        client
            .execute(
                "INSERT INTO users (id, username) VALUES ($1, $2)
                 ON CONFLICT (id) DO UPDATE SET username = EXCLUDED.username",
                &[&user.id, &user.username],
            )
            .await
            .map_err(map_db_error)?;
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt("SELECT id, username FROM users WHERE id = $1", &[&id])
            .await
            .map_err(map_db_error)?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt("SELECT id, username FROM users WHERE username = $1", &[&username])
            .await
            .map_err(map_db_error)?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn insert_group(&self, group: NewGroup) -> StoreResult<Group> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                "INSERT INTO groups (title, slug, description) VALUES ($1, $2, $3)
                 RETURNING id, title, slug, description",
                &[&group.title, &group.slug, &group.description],
            )
            .await
            .map_err(map_db_error)?;
        Ok(group_from_row(&row))
    }

    async fn list_groups(&self) -> StoreResult<Vec<Group>> {
        let client = self.pool.get().await?;
        let rows = client
            .query("SELECT id, title, slug, description FROM groups ORDER BY id", &[])
            .await
            .map_err(map_db_error)?;
        Ok(rows.iter().map(group_from_row).collect())
    }

    async fn get_group(&self, id: i64) -> StoreResult<Option<Group>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT id, title, slug, description FROM groups WHERE id = $1",
                &[&id],
            )
            .await
            .map_err(map_db_error)?;
        Ok(row.as_ref().map(group_from_row))
    }

    async fn delete_group(&self, id: i64) -> StoreResult<bool> {
        let client = self.pool.get().await?;
        // posts and comments follow through ON DELETE CASCADE
        let deleted = client
            .execute("DELETE FROM groups WHERE id = $1", &[&id])
            .await
            .map_err(map_db_error)?;
        Ok(deleted > 0)
    }

    async fn count_posts(&self) -> StoreResult<i64> {
        let client = self.pool.get().await?;
        let row = client
            .query_one("SELECT COUNT(*) FROM posts", &[])
            .await
            .map_err(map_db_error)?;
        Ok(row.get(0))
    }

    async fn list_posts(&self, limit: Option<i64>, offset: i64) -> StoreResult<Vec<Post>> {
        let client = self.pool.get().await?;
        // LIMIT NULL means no limit in PostgreSQL.
        let sql = format!(
            "SELECT {} FROM posts p JOIN users u ON u.id = p.author_id
             ORDER BY p.pub_date DESC, p.id DESC LIMIT $1 OFFSET $2",
            POST_COLUMNS
        );
        let rows = client
            .query(sql.as_str(), &[&limit, &offset])
            .await
            .map_err(map_db_error)?;
        debug!("fetched {} posts (limit={:?}, offset={})", rows.len(), limit, offset);
        Ok(rows.iter().map(post_from_row).collect())
    }

    async fn get_post(&self, id: i64) -> StoreResult<Option<Post>> {
        let client = self.pool.get().await?;
        let sql = format!(
            "SELECT {} FROM posts p JOIN users u ON u.id = p.author_id WHERE p.id = $1",
            POST_COLUMNS
        );
        let row = client
            .query_opt(sql.as_str(), &[&id])
            .await
            .map_err(map_db_error)?;
        Ok(row.as_ref().map(post_from_row))
    }

    async fn create_post(&self, post: NewPost) -> StoreResult<Post> {
        let client = self.pool.get().await?;
        let sql = format!(
            "WITH p AS (
                 INSERT INTO posts (text, image, author_id, group_id) VALUES ($1, $2, $3, $4)
                 RETURNING *
             )
             SELECT {} FROM p JOIN users u ON u.id = p.author_id",
            POST_COLUMNS
        );
        let row = client
            .query_one(
                sql.as_str(),
                &[&post.text, &post.image, &post.author_id, &post.group_id],
            )
            .await
            .map_err(map_db_error)?;
        Ok(post_from_row(&row))
    }

    async fn update_post(&self, id: i64, changes: PostChanges) -> StoreResult<Option<Post>> {
        let client = self.pool.get().await?;
        let set_image = changes.image.is_some();
        let image = changes.image.flatten();
        let set_group = changes.group_id.is_some();
        let group_id = changes.group_id.flatten();
        // pub_date is never part of the SET list.
        let sql = format!(
            "WITH p AS (
                 UPDATE posts SET
                     text = COALESCE($2::text, text),
                     image = CASE WHEN $3 THEN $4::varchar ELSE image END,
                     group_id = CASE WHEN $5 THEN $6::bigint ELSE group_id END
                 WHERE id = $1
                 RETURNING *
             )
             SELECT {} FROM p JOIN users u ON u.id = p.author_id",
            POST_COLUMNS
        );
        let row = client
            .query_opt(
                sql.as_str(),
                &[&id, &changes.text, &set_image, &image, &set_group, &group_id],
            )
            .await
            .map_err(map_db_error)?;
        Ok(row.as_ref().map(post_from_row))
    }

    async fn delete_post(&self, id: i64) -> StoreResult<bool> {
        let client = self.pool.get().await?;
        let deleted = client
            .execute("DELETE FROM posts WHERE id = $1", &[&id])
            .await
            .map_err(map_db_error)?;
        Ok(deleted > 0)
    }

    async fn list_comments(&self, post_id: i64) -> StoreResult<Vec<Comment>> {
        let client = self.pool.get().await?;
        let sql = format!(
            "SELECT {} FROM comments c JOIN users u ON u.id = c.author_id
             WHERE c.post_id = $1 ORDER BY c.id",
            COMMENT_COLUMNS
        );
        let rows = client
            .query(sql.as_str(), &[&post_id])
            .await
            .map_err(map_db_error)?;
        Ok(rows.iter().map(comment_from_row).collect())
    }

    async fn get_comment(&self, post_id: i64, id: i64) -> StoreResult<Option<Comment>> {
        let client = self.pool.get().await?;
        let sql = format!(
            "SELECT {} FROM comments c JOIN users u ON u.id = c.author_id
             WHERE c.post_id = $1 AND c.id = $2",
            COMMENT_COLUMNS
        );
        let row = client
            .query_opt(sql.as_str(), &[&post_id, &id])
            .await
            .map_err(map_db_error)?;
        Ok(row.as_ref().map(comment_from_row))
    }

    async fn create_comment(&self, comment: NewComment) -> StoreResult<Comment> {
        let client = self.pool.get().await?;
        let sql = format!(
            "WITH c AS (
                 INSERT INTO comments (text, author_id, post_id) VALUES ($1, $2, $3)
                 RETURNING *
             )
             SELECT {} FROM c JOIN users u ON u.id = c.author_id",
            COMMENT_COLUMNS
        );
        let row = client
            .query_one(
                sql.as_str(),
                &[&comment.text, &comment.author_id, &comment.post_id],
            )
            .await
            .map_err(map_db_error)?;
        Ok(comment_from_row(&row))
    }

    async fn update_comment(&self, post_id: i64, id: i64, text: String) -> StoreResult<Option<Comment>> {
        let client = self.pool.get().await?;
        let sql = format!(
            "WITH c AS (
                 UPDATE comments SET text = $3 WHERE post_id = $1 AND id = $2
                 RETURNING *
             )
             SELECT {} FROM c JOIN users u ON u.id = c.author_id",
            COMMENT_COLUMNS
        );
        let row = client
            .query_opt(sql.as_str(), &[&post_id, &id, &text])
            .await
            .map_err(map_db_error)?;
        Ok(row.as_ref().map(comment_from_row))
    }

    async fn delete_comment(&self, post_id: i64, id: i64) -> StoreResult<bool> {
        let client = self.pool.get().await?;
        let deleted = client
            .execute(
                "DELETE FROM comments WHERE post_id = $1 AND id = $2",
                &[&post_id, &id],
            )
            .await
            .map_err(map_db_error)?;
        Ok(deleted > 0)
    }

    async fn list_follows(&self, user_id: Uuid, search_terms: &[String]) -> StoreResult<Vec<Follow>> {
        let client = self.pool.get().await?;
        // strpos avoids escaping LIKE wildcards in user input.
        let sql = format!(
            "SELECT {} FROM follows f
             JOIN users u ON u.id = f.user_id
             JOIN users fu ON fu.id = f.following_id
             WHERE f.user_id = $1
               AND NOT EXISTS (
                   SELECT 1 FROM unnest($2::text[]) AS t(term)
                   WHERE strpos(lower(fu.username), lower(t.term)) = 0
               )
             ORDER BY f.id",
            FOLLOW_COLUMNS
        );
        let rows = client
            .query(sql.as_str(), &[&user_id, &search_terms])
            .await
            .map_err(map_db_error)?;
        Ok(rows.iter().map(follow_from_row).collect())
    }

    async fn follow_exists(&self, user_id: Uuid, following_id: Uuid) -> StoreResult<bool> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                "SELECT EXISTS (SELECT 1 FROM follows WHERE user_id = $1 AND following_id = $2)",
                &[&user_id, &following_id],
            )
            .await
            .map_err(map_db_error)?;
        Ok(row.get(0))
    }

    async fn create_follow(&self, follow: NewFollow) -> StoreResult<Follow> {
        let client = self.pool.get().await?;
        let sql = format!(
            "WITH f AS (
                 INSERT INTO follows (user_id, following_id) VALUES ($1, $2)
                 RETURNING *
             )
             SELECT {} FROM f
             JOIN users u ON u.id = f.user_id
             JOIN users fu ON fu.id = f.following_id",
            FOLLOW_COLUMNS
        );
        let row = client
            .query_one(sql.as_str(), &[&follow.user_id, &follow.following_id])
            .await
            .map_err(map_db_error)?;
        Ok(follow_from_row(&row))
    }
}
