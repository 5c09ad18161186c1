//! Feed loading and the delete operation
//!
//! Each load is a fresh fetch of the whole feed, newest first, with author
//! display data joined in. Fetch failures surface as `LoadError` so a
//! caller can render a retry affordance without touching already-rendered
//! state. The service holds no feed state of its own and may be invoked
//! repeatedly.

use std::sync::Arc;

use tracing::{debug, info};

use crate::backend::{DataStore, Order, OwnerPredicate};
use crate::error::{DbError, LoadError, Result};
use crate::types::{AuthorRef, Identity, Post};

const AUTHOR_JOIN: &str = "profiles(full_name,nickname)";

/// One feed row: the stored post plus its author's resolved display name
#[derive(Debug, Clone)]
pub struct FeedPost {
    pub post: Post,
    pub display_name: String,
}

pub struct FeedService {
    store: Arc<dyn DataStore>,
}

impl FeedService {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    /// Fetch the current feed, newest first
    ///
    /// # Errors
    ///
    /// Returns `LoadError::Fetch` when the store call fails and
    /// `LoadError::Decode` when a row cannot be interpreted as a post.
    pub async fn load(&self) -> Result<Vec<FeedPost>> {
        let rows = self
            .store
            .select_all("posts", Order::newest_first("created_at"), Some(AUTHOR_JOIN))
            .await
            .map_err(|e| LoadError::Fetch(e.to_string()))?;

        debug!(count = rows.len(), "feed fetched");

        rows.into_iter()
            .map(|row| {
                let post: Post = serde_json::from_value(row)
                    .map_err(|e| LoadError::Decode(e.to_string()))?;
                let display_name = display_name(post.profiles.as_ref());
                Ok(FeedPost { post, display_name })
            })
            .collect()
    }

    /// Fetch a single post by id (used when entering edit mode)
    pub async fn get(&self, post_id: &str) -> Result<Post> {
        let row = self.store.select_one("posts", post_id).await?;
        serde_json::from_value(row)
            .map_err(|e| DbError::Malformed(format!("stored post: {}", e)).into())
    }

    /// Delete a post, scoped to the viewer's ownership
    ///
    /// The predicate matching nothing (wrong owner, already deleted) is not
    /// an error; nothing is removed. Uploaded assets referenced by the post
    /// are never retracted from the object store.
    pub async fn delete(&self, post_id: &str, viewer: &Identity) -> Result<()> {
        self.store
            .delete("posts", post_id, OwnerPredicate::new("user_id", &viewer.id))
            .await?;
        info!(post_id = %post_id, "post deleted");
        Ok(())
    }
}

/// Resolve an author's display name: nickname if set, else full name,
/// else "Anonymous"
pub fn display_name(author: Option<&AuthorRef>) -> String {
    author
        .and_then(|a| {
            a.nickname
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .or_else(|| a.full_name.as_deref().filter(|s| !s.trim().is_empty()))
        })
        .unwrap_or("Anonymous")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::MockBackend;
    use crate::error::CampusfeedError;

    async fn seed_post(backend: &MockBackend, user_id: &str, content: &str) -> String {
        let row = backend
            .insert(
                "posts",
                serde_json::json!({ "user_id": user_id, "content": content }),
            )
            .await
            .unwrap();
        row["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_load_newest_first_with_display_names() {
        let backend = MockBackend::new();
        backend
            .upsert(
                "profiles",
                serde_json::json!({"id": "u1", "full_name": "Ada Lovelace", "nickname": "ada"}),
            )
            .await
            .unwrap();
        seed_post(&backend, "u1", "older").await;
        seed_post(&backend, "u1", "newer").await;

        let service = FeedService::new(Arc::new(backend));
        let feed = service.load().await.unwrap();

        assert_eq!(feed.len(), 2);
        assert_eq!(feed[0].post.content.as_deref(), Some("newer"));
        assert_eq!(feed[1].post.content.as_deref(), Some("older"));
        assert_eq!(feed[0].display_name, "ada");
    }

    #[tokio::test]
    async fn test_load_failure_surfaces_load_error() {
        let backend = MockBackend::select_failure();
        let service = FeedService::new(Arc::new(backend));

        let result = service.load().await;
        assert!(matches!(
            result.unwrap_err(),
            CampusfeedError::Load(LoadError::Fetch(_))
        ));
    }

    #[tokio::test]
    async fn test_load_is_restartable_after_failure() {
        // Each load is a fresh fetch; a previous failure leaves no state
        let backend = MockBackend::new();
        seed_post(&backend, "u1", "hello").await;
        let service = FeedService::new(Arc::new(backend.clone()));

        assert_eq!(service.load().await.unwrap().len(), 1);
        assert_eq!(service.load().await.unwrap().len(), 1);
        assert_eq!(backend.select_call_count(), 2);
    }

    #[tokio::test]
    async fn test_delete_scoped_to_owner() {
        let backend = MockBackend::new();
        let id = seed_post(&backend, "owner", "mine").await;
        let service = FeedService::new(Arc::new(backend.clone()));

        let intruder = Identity {
            id: "intruder".to_string(),
            email: "i@example.edu".to_string(),
        };
        service.delete(&id, &intruder).await.unwrap();
        assert_eq!(backend.rows("posts").len(), 1);

        let owner = Identity {
            id: "owner".to_string(),
            email: "o@example.edu".to_string(),
        };
        service.delete(&id, &owner).await.unwrap();
        assert!(backend.rows("posts").is_empty());
    }

    #[test]
    fn test_display_name_fallbacks() {
        assert_eq!(display_name(None), "Anonymous");

        let no_names = AuthorRef::default();
        assert_eq!(display_name(Some(&no_names)), "Anonymous");

        let full_only = AuthorRef {
            full_name: Some("Grace Hopper".to_string()),
            nickname: None,
        };
        assert_eq!(display_name(Some(&full_only)), "Grace Hopper");

        let both = AuthorRef {
            full_name: Some("Grace Hopper".to_string()),
            nickname: Some("amazing-grace".to_string()),
        };
        assert_eq!(display_name(Some(&both)), "amazing-grace");

        let blank_nickname = AuthorRef {
            full_name: Some("Grace Hopper".to_string()),
            nickname: Some("   ".to_string()),
        };
        assert_eq!(display_name(Some(&blank_nickname)), "Grace Hopper");
    }
}
