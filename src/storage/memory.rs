use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use super::PasteStore;
use crate::types::{NewPaste, Paste};

/// Pastes kept in process memory; everything is lost on restart.
#[derive(Clone, Default)]
pub struct MemoryStore {
    pastes: Arc<DashMap<String, Paste>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.pastes.is_empty()
    }
}

impl PasteStore for MemoryStore {
    async fn create(&self, paste: NewPaste) -> crate::AppResult<Paste> {
        let paste = Paste {
            id: Uuid::new_v4().to_string(),
            content: paste.content,
            created_at: Utc::now().trunc_subsecs(3),
            ttl_seconds: paste.ttl_seconds,
            max_views: paste.max_views,
            view_count: 0,
        };
        self.pastes.insert(paste.id.clone(), paste.clone());
        Ok(paste)
    }

    async fn fetch(&self, id: &str) -> crate::AppResult<Option<Paste>> {
        Ok(self.pastes.get(id).map(|entry| entry.value().clone()))
    }

    async fn consume_view(&self, id: &str) -> crate::AppResult<Option<i64>> {
        // the shard stays write-locked until `entry` drops, so check and increment are one step
        let Some(mut entry) = self.pastes.get_mut(id) else {
            return Ok(None);
        };
        let paste = entry.value_mut();
        if paste.max_views.is_some_and(|max| paste.view_count >= max) {
            return Ok(None);
        }
        paste.view_count += 1;
        Ok(Some(paste.view_count))
    }

    async fn ping(&self) -> crate::AppResult<()> {
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> crate::AppResult<u64> {
        let mut removed = 0;
        self.pastes.retain(|_, paste| {
            let keep = paste.expiry_state(now).is_none();
            if !keep {
                removed += 1;
            }
            keep
        });
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn new_paste(ttl_seconds: Option<i64>, max_views: Option<i64>) -> NewPaste {
        NewPaste {
            content: "hello".into(),
            ttl_seconds,
            max_views,
        }
    }

    #[tokio::test]
    async fn consume_stops_at_budget() {
        let store = MemoryStore::new();
        let paste = store.create(new_paste(None, Some(2))).await.unwrap();

        assert_eq!(store.consume_view(&paste.id).await.unwrap(), Some(1));
        assert_eq!(store.consume_view(&paste.id).await.unwrap(), Some(2));
        assert_eq!(store.consume_view(&paste.id).await.unwrap(), None);
        assert_eq!(store.fetch(&paste.id).await.unwrap().unwrap().view_count, 2);
    }

    #[tokio::test]
    async fn consume_missing_is_none() {
        let store = MemoryStore::new();
        assert_eq!(store.consume_view("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn purge_removes_only_gone_pastes() {
        let store = MemoryStore::new();
        let timed = store.create(new_paste(Some(10), None)).await.unwrap();
        let used = store.create(new_paste(None, Some(1))).await.unwrap();
        let kept = store.create(new_paste(None, None)).await.unwrap();
        store.consume_view(&used.id).await.unwrap();

        let purged = store
            .purge_expired(timed.created_at + Duration::seconds(10))
            .await
            .unwrap();

        assert_eq!(purged, 2);
        assert!(store.fetch(&timed.id).await.unwrap().is_none());
        assert!(store.fetch(&used.id).await.unwrap().is_none());
        assert!(store.fetch(&kept.id).await.unwrap().is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn purge_counts_only_removed_while_creating() {
        let store = MemoryStore::new();
        let mut gone = Vec::new();
        for _ in 0..50 {
            let paste = store.create(new_paste(None, Some(1))).await.unwrap();
            store.consume_view(&paste.id).await.unwrap();
            gone.push(paste.id);
        }

        let writer = {
            let store = store.clone();
            tokio::spawn(async move {
                for _ in 0..200 {
                    store.create(new_paste(None, None)).await.unwrap();
                }
            })
        };
        let purged = store.purge_expired(Utc::now()).await.unwrap();
        writer.await.unwrap();

        assert_eq!(purged, 50);
        for id in &gone {
            assert!(store.fetch(id).await.unwrap().is_none());
        }
    }
}
