//! Storage layer for engine snapshot persistence.
//!
//! The engine treats persistence as an opaque blob store keyed by user id.
//! This module provides the trait and a SQLite-backed implementation.

mod sqlite;

pub use sqlite::SqliteStorage;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StorageResult;

/// A persisted snapshot blob.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSnapshot {
    /// Owner of the snapshot.
    pub user_id: String,
    /// Serialized engine snapshot.
    pub blob: Vec<u8>,
    /// When the blob was last written.
    pub updated_at: DateTime<Utc>,
}

/// Key-value persistence for serialized engine snapshots.
#[async_trait]
pub trait SnapshotStorage: Send + Sync {
    /// Load the latest snapshot for a user.
    async fn load_snapshot(&self, user_id: &str) -> StorageResult<Option<StoredSnapshot>>;
    /// Write (or overwrite) the snapshot for a user.
    async fn save_snapshot(&self, user_id: &str, blob: &[u8]) -> StorageResult<()>;
    /// Delete a user's snapshot. Returns whether one existed.
    async fn delete_snapshot(&self, user_id: &str) -> StorageResult<bool>;
}
