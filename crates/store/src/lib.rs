//! Analytics data-store collaborator consumed by the retention engine.
//!
//! The store is read-only from the engine's point of view. Handles are
//! constructed by the hosting service and injected as `Arc<dyn AnalyticsStore>`.

#![warn(clippy::unwrap_used)]

pub mod clickhouse_store;
pub mod memory;

pub use clickhouse_store::ClickHouseStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nexus_core::{EventScope, NexusResult};
use uuid::Uuid;

/// Query surface the retention engine needs from the document store.
#[async_trait]
pub trait AnalyticsStore: Send + Sync {
    /// Ids of every project owned by `company_id`.
    async fn company_projects(&self, company_id: Uuid) -> NexusResult<Vec<Uuid>>;

    /// External ids of tracked users in `scope` first seen within `[start, end)`.
    /// One entry per tracked-user record.
    async fn cohort_members(
        &self,
        scope: &EventScope,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> NexusResult<Vec<String>>;

    /// Number of distinct users among `user_ids` with at least one in-scope
    /// event at or after `since`.
    async fn count_active_users(
        &self,
        scope: &EventScope,
        user_ids: &[String],
        since: DateTime<Utc>,
    ) -> NexusResult<u64>;
}
