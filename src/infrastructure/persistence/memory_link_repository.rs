//! In-process link store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::entities::ShortLink;
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;

/// [`LinkRepository`] backed by a map behind a lock.
///
/// Each call holds the lock for its whole read-modify-write, which gives the
/// same single-record atomicity as the PostgreSQL store.
#[derive(Default)]
pub struct InMemoryLinkRepository {
    links: RwLock<HashMap<String, ShortLink>>,
}

impl InMemoryLinkRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.links.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.links.read().await.is_empty()
    }
}

#[async_trait]
impl LinkRepository for InMemoryLinkRepository {
    async fn insert(&self, link: &ShortLink) -> Result<ShortLink, AppError> {
        let mut links = self.links.write().await;
        if links.contains_key(&link.code) {
            return Err(AppError::conflict(
                "Short code already exists",
                json!({ "code": link.code }),
            ));
        }
        links.insert(link.code.clone(), link.clone());
        Ok(link.clone())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<ShortLink>, AppError> {
        Ok(self.links.read().await.get(code).cloned())
    }

    async fn record_visit(
        &self,
        code: &str,
        visited_at: DateTime<Utc>,
    ) -> Result<Option<ShortLink>, AppError> {
        let mut links = self.links.write().await;
        let Some(link) = links.get_mut(code) else {
            return Ok(None);
        };

        link.last_visit_at = Some(match link.last_visit_at {
            Some(previous) => previous.max(visited_at),
            None => visited_at,
        });
        if let Some(budget) = link.remaining_redirects.as_mut()
            && *budget >= 1
        {
            *budget -= 1;
        }

        Ok(Some(link.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn link(code: &str, budget: Option<u32>) -> ShortLink {
        ShortLink::new(
            code.into(),
            "http://a.example/x".into(),
            budget,
            None,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_code() {
        let repo = InMemoryLinkRepository::new();

        repo.insert(&link("abc", None)).await.unwrap();
        let err = repo.insert(&link("abc", Some(1))).await.unwrap_err();

        assert!(err.is_conflict());
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn test_visits_decrement_to_zero_and_stop() {
        let repo = InMemoryLinkRepository::new();
        repo.insert(&link("abc", Some(2))).await.unwrap();
        let now = Utc::now();

        for _ in 0..3 {
            repo.record_visit("abc", now).await.unwrap();
        }

        let stored = repo.find_by_code("abc").await.unwrap().unwrap();
        assert_eq!(stored.remaining_redirects, Some(0));
    }

    #[tokio::test]
    async fn test_last_visit_only_moves_forward() {
        let repo = InMemoryLinkRepository::new();
        repo.insert(&link("abc", None)).await.unwrap();
        let later = Utc::now();
        let earlier = later - Duration::minutes(5);

        repo.record_visit("abc", later).await.unwrap();
        let updated = repo.record_visit("abc", earlier).await.unwrap().unwrap();

        assert_eq!(updated.last_visit_at, Some(later));
        assert_eq!(updated.remaining_redirects, None);
    }

    #[tokio::test]
    async fn test_unknown_code_visit_returns_none() {
        let repo = InMemoryLinkRepository::new();
        assert!(repo.record_visit("nope", Utc::now()).await.unwrap().is_none());
    }
}
