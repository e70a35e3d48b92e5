use chrono::{DateTime, Utc};

use crate::db::Database;
use crate::types::{NewPaste, Paste};

pub mod memory;

pub use memory::MemoryStore;

/// Persistence the paste lifecycle relies on.
pub trait PasteStore {
    /// Persist a new paste, assigning its id and creation time.
    async fn create(&self, paste: NewPaste) -> crate::AppResult<Paste>;

    /// Get a paste by id.
    async fn fetch(&self, id: &str) -> crate::AppResult<Option<Paste>>;

    /// Atomically count one view, but only while the paste is below its view budget.
    ///
    /// Returns the view count after the increment, or `None` if the paste is
    /// missing or its budget was already used up.
    async fn consume_view(&self, id: &str) -> crate::AppResult<Option<i64>>;

    /// Check that the store is reachable.
    async fn ping(&self) -> crate::AppResult<()>;

    /// Physically remove every paste that is already gone at `now`.
    async fn purge_expired(&self, now: DateTime<Utc>) -> crate::AppResult<u64>;
}

#[derive(Clone)]
pub enum AnyStore {
    Sql(Database),
    Memory(MemoryStore),
}

impl PasteStore for AnyStore {
    async fn create(&self, paste: NewPaste) -> crate::AppResult<Paste> {
        match self {
            AnyStore::Sql(db) => db.create(paste).await,
            AnyStore::Memory(memory) => memory.create(paste).await,
        }
    }

    async fn fetch(&self, id: &str) -> crate::AppResult<Option<Paste>> {
        match self {
            AnyStore::Sql(db) => db.fetch(id).await,
            AnyStore::Memory(memory) => memory.fetch(id).await,
        }
    }

    async fn consume_view(&self, id: &str) -> crate::AppResult<Option<i64>> {
        match self {
            AnyStore::Sql(db) => db.consume_view(id).await,
            AnyStore::Memory(memory) => memory.consume_view(id).await,
        }
    }

    async fn ping(&self) -> crate::AppResult<()> {
        match self {
            AnyStore::Sql(db) => db.ping().await,
            AnyStore::Memory(memory) => memory.ping().await,
        }
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> crate::AppResult<u64> {
        match self {
            AnyStore::Sql(db) => db.purge_expired(now).await,
            AnyStore::Memory(memory) => memory.purge_expired(now).await,
        }
    }
}

impl From<Database> for AnyStore {
    fn from(value: Database) -> Self {
        AnyStore::Sql(value)
    }
}

impl From<MemoryStore> for AnyStore {
    fn from(value: MemoryStore) -> Self {
        AnyStore::Memory(value)
    }
}
