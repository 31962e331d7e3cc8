// src/repositories/memory_store.rs - in-process backend for tests and local runs

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::models::{
    Comment, Follow, Group, NewComment, NewFollow, NewGroup, NewPost, Post, PostChanges, User,
    follow, group, post,
};

#[derive(Debug, Clone)]
struct CommentRow {
    id: i64,
    text: String,
    created: chrono::DateTime<Utc>,
    author_id: Uuid,
    post_id: i64,
}

#[derive(Debug, Clone)]
struct PostRow {
    id: i64,
    text: String,
    pub_date: chrono::DateTime<Utc>,
    image: Option<String>,
    author_id: Uuid,
    group_id: Option<i64>,
}

#[derive(Debug, Clone, Copy)]
struct FollowRow {
    id: i64,
    user_id: Uuid,
    following_id: Uuid,
}

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<Uuid, User>,
    groups: BTreeMap<i64, Group>,
    posts: BTreeMap<i64, PostRow>,
    comments: BTreeMap<i64, CommentRow>,
    follows: BTreeMap<i64, FollowRow>,
    last_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn username(&self, id: Uuid) -> String {
        self.users
            .get(&id)
            .map(|u| u.username.clone())
            .unwrap_or_default()
    }

    fn post(&self, row: &PostRow) -> Post {
        Post {
            id: row.id,
            text: row.text.clone(),
            pub_date: row.pub_date,
            image: row.image.clone(),
            author_id: row.author_id,
            author_username: self.username(row.author_id),
            group_id: row.group_id,
        }
    }

    fn comment(&self, row: &CommentRow) -> Comment {
        Comment {
            id: row.id,
            text: row.text.clone(),
            created: row.created,
            author_id: row.author_id,
            author_username: self.username(row.author_id),
            post_id: row.post_id,
        }
    }

    fn follow(&self, row: &FollowRow) -> Follow {
        Follow {
            id: row.id,
            user_id: row.user_id,
            user_username: self.username(row.user_id),
            following_id: row.following_id,
            following_username: self.username(row.following_id),
        }
    }

    fn require_user(&self, id: Uuid) -> StoreResult<()> {
        if self.users.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::MissingReference(format!("user {}", id)))
        }
    }

    fn require_group(&self, id: Option<i64>) -> StoreResult<()> {
        match id {
            Some(id) if !self.groups.contains_key(&id) => {
                Err(StoreError::MissingReference(post::GROUP_REFERENCE.to_string()))
            }
            _ => Ok(()),
        }
    }
}

/// Store that keeps every table in memory behind a single lock.
/// Holding the write lock across check-and-insert serialises concurrent
/// follows the same way a unique index does.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: User) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        if t
            .users
            .values()
            .any(|u| u.username == user.username && u.id != user.id)
        {
            return Err(StoreError::constraint("users_username_key"));
        }
        t.users.insert(user.id, user);
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let t = self.tables.read().await;
        Ok(t.users.values().find(|u| u.username == username).cloned())
    }

    async fn insert_group(&self, new: NewGroup) -> StoreResult<Group> {
        let mut t = self.tables.write().await;
        if t.groups.values().any(|g| g.slug == new.slug) {
            return Err(StoreError::constraint(group::UNIQUE_SLUG));
        }
        let id = t.next_id();
        let group = Group {
            id,
            title: new.title,
            slug: new.slug,
            description: new.description,
        };
        t.groups.insert(id, group.clone());
        Ok(group)
    }

    async fn list_groups(&self) -> StoreResult<Vec<Group>> {
        Ok(self.tables.read().await.groups.values().cloned().collect())
    }

    async fn get_group(&self, id: i64) -> StoreResult<Option<Group>> {
        Ok(self.tables.read().await.groups.get(&id).cloned())
    }

    async fn delete_group(&self, id: i64) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        if t.groups.remove(&id).is_none() {
            return Ok(false);
        }
        let removed: Vec<i64> = t
            .posts
            .values()
            .filter(|p| p.group_id == Some(id))
            .map(|p| p.id)
            .collect();
        t.posts.retain(|_, p| p.group_id != Some(id));
        t.comments.retain(|_, c| !removed.contains(&c.post_id));
        Ok(true)
    }

    async fn count_posts(&self) -> StoreResult<i64> {
        Ok(self.tables.read().await.posts.len() as i64)
    }

    async fn list_posts(&self, limit: Option<i64>, offset: i64) -> StoreResult<Vec<Post>> {
        let t = self.tables.read().await;
        let mut rows: Vec<&PostRow> = t.posts.values().collect();
        rows.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));
        let take = limit.map(|l| l.max(0) as usize).unwrap_or(usize::MAX);
        Ok(rows
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(take)
            .map(|row| t.post(row))
            .collect())
    }

    async fn get_post(&self, id: i64) -> StoreResult<Option<Post>> {
        let t = self.tables.read().await;
        Ok(t.posts.get(&id).map(|row| t.post(row)))
    }

    async fn create_post(&self, new: NewPost) -> StoreResult<Post> {
        let mut t = self.tables.write().await;
        t.require_user(new.author_id)?;
        t.require_group(new.group_id)?;
        let id = t.next_id();
        let row = PostRow {
            id,
            text: new.text,
            pub_date: Utc::now(),
            image: new.image,
            author_id: new.author_id,
            group_id: new.group_id,
        };
        let post = t.post(&row);
        t.posts.insert(id, row);
        Ok(post)
    }

    async fn update_post(&self, id: i64, changes: PostChanges) -> StoreResult<Option<Post>> {
        let mut t = self.tables.write().await;
        if let Some(group_id) = changes.group_id {
            t.require_group(group_id)?;
        }
        let Some(row) = t.posts.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(text) = changes.text {
            row.text = text;
        }
        if let Some(image) = changes.image {
            row.image = image;
        }
        if let Some(group_id) = changes.group_id {
            row.group_id = group_id;
        }
        let row = row.clone();
        Ok(Some(t.post(&row)))
    }

    async fn delete_post(&self, id: i64) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        if t.posts.remove(&id).is_none() {
            return Ok(false);
        }
        t.comments.retain(|_, c| c.post_id != id);
        Ok(true)
    }

    async fn list_comments(&self, post_id: i64) -> StoreResult<Vec<Comment>> {
        let t = self.tables.read().await;
        Ok(t.comments
            .values()
            .filter(|c| c.post_id == post_id)
            .map(|c| t.comment(c))
            .collect())
    }

    async fn get_comment(&self, post_id: i64, id: i64) -> StoreResult<Option<Comment>> {
        let t = self.tables.read().await;
        Ok(t.comments
            .get(&id)
            .filter(|c| c.post_id == post_id)
            .map(|c| t.comment(c)))
    }

    async fn create_comment(&self, new: NewComment) -> StoreResult<Comment> {
        let mut t = self.tables.write().await;
        t.require_user(new.author_id)?;
        if !t.posts.contains_key(&new.post_id) {
            return Err(StoreError::MissingReference(format!("post {}", new.post_id)));
        }
        let id = t.next_id();
        let row = CommentRow {
            id,
            text: new.text,
            created: Utc::now(),
            author_id: new.author_id,
            post_id: new.post_id,
        };
        let comment = t.comment(&row);
        t.comments.insert(id, row);
        Ok(comment)
    }

    async fn update_comment(&self, post_id: i64, id: i64, text: String) -> StoreResult<Option<Comment>> {
        let mut t = self.tables.write().await;
        let Some(row) = t.comments.get_mut(&id).filter(|c| c.post_id == post_id) else {
            return Ok(None);
        };
        row.text = text;
        let row = row.clone();
        Ok(Some(t.comment(&row)))
    }

    async fn delete_comment(&self, post_id: i64, id: i64) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        match t.comments.get(&id) {
            Some(c) if c.post_id == post_id => {
                t.comments.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_follows(&self, user_id: Uuid, search_terms: &[String]) -> StoreResult<Vec<Follow>> {
        let t = self.tables.read().await;
        let terms: Vec<String> = search_terms.iter().map(|s| s.to_lowercase()).collect();
        Ok(t.follows
            .values()
            .filter(|f| f.user_id == user_id)
            .map(|f| t.follow(f))
            .filter(|f| {
                let name = f.following_username.to_lowercase();
                terms.iter().all(|term| name.contains(term.as_str()))
            })
            .collect())
    }

    async fn follow_exists(&self, user_id: Uuid, following_id: Uuid) -> StoreResult<bool> {
        let t = self.tables.read().await;
        Ok(t.follows
            .values()
            .any(|f| f.user_id == user_id && f.following_id == following_id))
    }

    async fn create_follow(&self, new: NewFollow) -> StoreResult<Follow> {
        let mut t = self.tables.write().await;
        if new.user_id == new.following_id {
            return Err(StoreError::constraint(follow::FOLLOWING_IS_NOT_USER));
        }
        if t
            .follows
            .values()
            .any(|f| f.user_id == new.user_id && f.following_id == new.following_id)
        {
            return Err(StoreError::constraint(follow::UNIQUE_SUBSCRIBE));
        }
        t.require_user(new.user_id)?;
        t.require_user(new.following_id)?;
        let id = t.next_id();
        let row = FollowRow {
            id,
            user_id: new.user_id,
            following_id: new.following_id,
        };
        t.follows.insert(id, row);
        Ok(t.follow(&row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    async fn store_with_users() -> (MemoryStore, User, User) {
        let store = MemoryStore::new();
        let bob = User { id: Uuid::new_v4(), username: "bob".into() };
        let alice = User { id: Uuid::new_v4(), username: "alice".into() };
        store.insert_user(bob.clone()).await.unwrap();
        store.insert_user(alice.clone()).await.unwrap();
        (store, bob, alice)
    }

    #[tokio::test]
    async fn self_follow_is_rejected_by_storage() {
        let (store, bob, _) = store_with_users().await;
        let err = store
            .create_follow(NewFollow { user_id: bob.id, following_id: bob.id })
            .await
            .unwrap_err();
        match err {
            StoreError::Constraint { constraint, message } => {
                assert_eq!(constraint, follow::FOLLOWING_IS_NOT_USER);
                assert_eq!(message, follow::FOLLOWING_IS_NOT_USER_MESSAGE);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn duplicate_follow_is_rejected_by_storage() {
        let (store, bob, alice) = store_with_users().await;
        let new = NewFollow { user_id: bob.id, following_id: alice.id };
        store.create_follow(new).await.unwrap();
        let err = store.create_follow(new).await.unwrap_err();
        assert_eq!(err.to_string(), follow::UNIQUE_SUBSCRIBE_MESSAGE);
    }

    #[tokio::test]
    async fn concurrent_follows_leave_one_row() {
        let (store, bob, alice) = store_with_users().await;
        let store = Arc::new(store);
        let new = NewFollow { user_id: bob.id, following_id: alice.id };
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.create_follow(new).await.is_ok() })
            })
            .collect();
        let mut created = 0;
        for h in handles {
            if h.await.unwrap() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
        assert_eq!(store.list_follows(bob.id, &[]).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn deleting_post_removes_its_comments() {
        let (store, bob, _) = store_with_users().await;
        let post = store
            .create_post(NewPost { text: "hi".into(), image: None, author_id: bob.id, group_id: None })
            .await
            .unwrap();
        store
            .create_comment(NewComment { text: "c".into(), author_id: bob.id, post_id: post.id })
            .await
            .unwrap();
        assert!(store.delete_post(post.id).await.unwrap());
        assert!(store.list_comments(post.id).await.unwrap().is_empty());
        assert!(!store.delete_post(post.id).await.unwrap());
    }

    #[tokio::test]
    async fn posts_are_listed_newest_first() {
        let (store, bob, _) = store_with_users().await;
        for text in ["first", "second", "third"] {
            store
                .create_post(NewPost { text: text.into(), image: None, author_id: bob.id, group_id: None })
                .await
                .unwrap();
        }
        let texts: Vec<String> = store
            .list_posts(Some(2), 0)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.text)
            .collect();
        assert_eq!(texts, vec!["third", "second"]);
        assert_eq!(store.count_posts().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn follow_search_matches_every_term() {
        let (store, bob, alice) = store_with_users().await;
        let alina = User { id: Uuid::new_v4(), username: "Alina".into() };
        store.insert_user(alina.clone()).await.unwrap();
        for following in [alice.id, alina.id] {
            store
                .create_follow(NewFollow { user_id: bob.id, following_id: following })
                .await
                .unwrap();
        }
        let found = store.list_follows(bob.id, &["ali".into()]).await.unwrap();
        assert_eq!(found.len(), 2);
        let found = store
            .list_follows(bob.id, &["ali".into(), "NA".into()])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].following_username, "Alina");
    }

    #[tokio::test]
    async fn duplicate_group_slug_is_rejected() {
        let store = MemoryStore::new();
        let new = NewGroup { title: "Cats".into(), slug: "cats".into(), description: "".into() };
        store.insert_group(new.clone()).await.unwrap();
        let err = store.insert_group(new).await.unwrap_err();
        assert!(matches!(err, StoreError::Constraint { .. }));
    }

    #[tokio::test]
    async fn deleting_group_removes_its_posts_and_their_comments() {
        let (store, bob, _) = store_with_users().await;
        let cats = store
            .insert_group(NewGroup { title: "Cats".into(), slug: "cats".into(), description: "".into() })
            .await
            .unwrap();
        let in_group = store
            .create_post(NewPost { text: "meow".into(), image: None, author_id: bob.id, group_id: Some(cats.id) })
            .await
            .unwrap();
        let outside = store
            .create_post(NewPost { text: "hi".into(), image: None, author_id: bob.id, group_id: None })
            .await
            .unwrap();
        for post_id in [in_group.id, outside.id] {
            store
                .create_comment(NewComment { text: "c".into(), author_id: bob.id, post_id })
                .await
                .unwrap();
        }

        assert!(store.delete_group(cats.id).await.unwrap());
        assert!(store.get_group(cats.id).await.unwrap().is_none());
        assert!(store.get_post(in_group.id).await.unwrap().is_none());
        assert!(store.list_comments(in_group.id).await.unwrap().is_empty());
        assert!(store.get_post(outside.id).await.unwrap().is_some());
        assert_eq!(store.list_comments(outside.id).await.unwrap().len(), 1);
        assert!(!store.delete_group(cats.id).await.unwrap());
    }

    #[tokio::test]
    async fn post_in_missing_group_names_the_group_reference() {
        let (store, bob, _) = store_with_users().await;
        let err = store
            .create_post(NewPost { text: "hi".into(), image: None, author_id: bob.id, group_id: Some(9) })
            .await
            .unwrap_err();
        assert!(err.is_missing(post::GROUP_REFERENCE));
    }
}
