//! Record persistence.
//!
//! Two backends sit behind one two-operation contract: a local JSON document
//! (the default) and an HTTP collection for fleet deployments. Both persist
//! whole collections; there is no per-record update path, so a load followed
//! by a save of the same data is byte-stable.

mod local;
mod remote;

pub use local::LocalStore;
pub use remote::RemoteStore;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::AttendanceRecord;

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// The full collection, newest first. Missing backing data is an empty
    /// collection, not an error.
    async fn load(&self) -> Result<Vec<AttendanceRecord>>;

    /// Replace the whole persisted collection.
    async fn save(&self, records: &[AttendanceRecord]) -> Result<()>;
}
