use chrono::{DateTime, SubsecRound, Utc};
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;
use tracing::info;
use uuid::Uuid;

use crate::storage::PasteStore;
use crate::types::{NewPaste, Paste};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS paste (
    id TEXT PRIMARY KEY NOT NULL,
    content TEXT NOT NULL,
    created_at DATETIME NOT NULL,
    ttl_seconds INTEGER,
    max_views INTEGER,
    view_count INTEGER NOT NULL DEFAULT 0
)";

#[derive(Clone)]
pub struct Database {
    pool: AnyPool,
}

impl Database {
    /// Connect to a database by URL and make sure the schema exists.
    pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = AnyPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    async fn migrate(&self) -> crate::AppResult<()> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query(SCHEMA).execute(&mut conn).await?;
        info!("database schema ready");
        Ok(())
    }

    /// Get all pastes.
    pub async fn get_all_pastes(&self) -> crate::AppResult<Vec<Paste>> {
        let mut conn = self.pool.acquire().await?;
        Ok(sqlx::query_as::<_, Paste>(
            "SELECT id, content, created_at, ttl_seconds, max_views, view_count FROM paste",
        )
        .fetch_all(&mut conn)
        .await?)
    }

    /// Delete a paste by id.
    pub async fn delete_paste(&self, id: &str) -> crate::AppResult<()> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("DELETE FROM paste WHERE id = ?")
            .bind(id)
            .execute(&mut conn)
            .await?;
        Ok(())
    }
}

impl PasteStore for Database {
    async fn create(&self, paste: NewPaste) -> crate::AppResult<Paste> {
        let mut conn = self.pool.acquire().await?;
        let paste = sqlx::query_as::<_, Paste>(
            "INSERT INTO paste (id, content, created_at, ttl_seconds, max_views, view_count) \
             VALUES (?, ?, ?, ?, ?, 0) RETURNING id, content, created_at, ttl_seconds, \
             max_views, view_count",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(paste.content)
        .bind(Utc::now().trunc_subsecs(3))
        .bind(paste.ttl_seconds)
        .bind(paste.max_views)
        .fetch_one(&mut conn)
        .await?;
        Ok(paste)
    }

    async fn fetch(&self, id: &str) -> crate::AppResult<Option<Paste>> {
        let mut conn = self.pool.acquire().await?;
        let paste = sqlx::query_as::<_, Paste>(
            "SELECT id, content, created_at, ttl_seconds, max_views, view_count FROM paste \
             WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&mut conn)
        .await?;
        Ok(paste)
    }

    async fn consume_view(&self, id: &str) -> crate::AppResult<Option<i64>> {
        let mut conn = self.pool.acquire().await?;
        // a single conditional update, so concurrent readers can never overspend the budget
        let view_count = sqlx::query_scalar::<_, i64>(
            "UPDATE paste SET view_count = view_count + 1 WHERE id = ? AND (max_views IS NULL \
             OR view_count < max_views) RETURNING view_count",
        )
        .bind(id)
        .fetch_optional(&mut conn)
        .await?;
        Ok(view_count)
    }

    async fn ping(&self) -> crate::AppResult<()> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("SELECT 1").execute(&mut conn).await?;
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> crate::AppResult<u64> {
        let mut count = 0;
        for paste in self.get_all_pastes().await? {
            if let Some(reason) = paste.expiry_state(now) {
                info!("deleting paste {}: {reason}", paste.id);
                self.delete_paste(&paste.id).await?;
                count += 1;
            }
        }
        Ok(count)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::Duration;

    use super::*;

    /// A fresh in-memory database. One connection, since every sqlite memory
    /// connection would otherwise see its own empty database.
    pub(crate) async fn memory_db() -> Database {
        Database::connect("sqlite::memory:", 1).await.unwrap()
    }

    fn new_paste(ttl_seconds: Option<i64>, max_views: Option<i64>) -> NewPaste {
        NewPaste {
            content: "hello\nworld".into(),
            ttl_seconds,
            max_views,
        }
    }

    #[tokio::test]
    async fn create_then_fetch() {
        let db = memory_db().await;
        let created = db.create(new_paste(Some(30), Some(4))).await.unwrap();
        assert_eq!(created.view_count, 0);

        let fetched = db.fetch(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched.content, "hello\nworld");
        assert_eq!(fetched.ttl_seconds, Some(30));
        assert_eq!(fetched.max_views, Some(4));
        assert_eq!(fetched.created_at, created.created_at);
    }

    #[tokio::test]
    async fn fetch_missing_is_none() {
        let db = memory_db().await;
        assert!(db.fetch("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn conditional_increment_respects_budget() {
        let db = memory_db().await;
        let limited = db.create(new_paste(None, Some(1))).await.unwrap();
        let unlimited = db.create(new_paste(None, None)).await.unwrap();

        assert_eq!(db.consume_view(&limited.id).await.unwrap(), Some(1));
        assert_eq!(db.consume_view(&limited.id).await.unwrap(), None);
        assert_eq!(db.fetch(&limited.id).await.unwrap().unwrap().view_count, 1);

        for expected in 1..=3 {
            assert_eq!(
                db.consume_view(&unlimited.id).await.unwrap(),
                Some(expected)
            );
        }
        assert_eq!(db.consume_view("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn purge_keeps_live_pastes() {
        let db = memory_db().await;
        let timed = db.create(new_paste(Some(5), None)).await.unwrap();
        let kept = db.create(new_paste(None, Some(3))).await.unwrap();

        let purged = db
            .purge_expired(timed.created_at + Duration::seconds(5))
            .await
            .unwrap();

        assert_eq!(purged, 1);
        assert!(db.fetch(&timed.id).await.unwrap().is_none());
        assert!(db.fetch(&kept.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn ping_succeeds() {
        memory_db().await.ping().await.unwrap();
    }
}
