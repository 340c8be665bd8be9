//! Durable settings store
//!
//! The store is shared by every context and every tab without locking. It is
//! read and written as a full snapshot; concurrent writers resolve by last
//! write wins at snapshot granularity.

mod file;
mod memory;
mod transaction;

use async_trait::async_trait;

use vb_core::StoreSnapshot;

pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use transaction::transact;

/// Error type for store I/O.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Store contents are malformed: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("Store is unavailable")]
    Unavailable,
}

#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Read the full snapshot. A store that was never written reads as the
    /// default snapshot.
    async fn load(&self) -> Result<StoreSnapshot, StoreError>;

    /// Replace the full snapshot.
    async fn save(&self, snapshot: &StoreSnapshot) -> Result<(), StoreError>;

    /// Drop everything, preferences included.
    async fn clear(&self) -> Result<(), StoreError> {
        self.save(&StoreSnapshot::default()).await
    }
}
