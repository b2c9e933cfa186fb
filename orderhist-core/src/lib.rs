//! orderhist core: the fetch / partition / aggregate pipeline.
//!
//! - Domain types (order records, query params, artifacts, reports)
//! - Exchange access behind the `OrdersApi` trait, with a Bitget client
//! - Cursor-following fetcher with partial results on recoverable errors
//! - Symbol partitioner writing one artifact per `(productType, symbol)`
//! - Report aggregator merging artifacts into one report per product type
//! - Object storage behind the `ObjectStore` trait (filesystem, in-memory)

pub mod aggregate;
pub mod domain;
pub mod fetch;
pub mod partition;
pub mod storage;
pub mod upstream;

pub use aggregate::{AggregateError, Aggregation, ReportAggregator};
pub use domain::{AggregateReport, OrderRecord, QueryParams, SymbolArtifact, TaskDescriptor};
pub use fetch::{Completeness, FetchResult, HistoryFetcher};
pub use partition::{partition, partition_single, PersistedArtifact, SymbolPartitioner};
pub use storage::{ArtifactReceipt, FsStore, MemoryStore, ObjectStore, StorageError};
pub use upstream::{OrdersApi, OrdersPage, UpstreamError};

#[cfg(test)]
mod tests {
    use super::*;

    /// Tasks run on a thread pool and share the client and store, so every
    /// type crossing that boundary must be Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<OrderRecord>();
        require_sync::<OrderRecord>();
        require_send::<QueryParams>();
        require_sync::<QueryParams>();
        require_send::<SymbolArtifact>();
        require_sync::<SymbolArtifact>();
        require_send::<AggregateReport>();
        require_sync::<AggregateReport>();
        require_send::<FetchResult>();
        require_sync::<FetchResult>();
        require_send::<UpstreamError>();
        require_sync::<UpstreamError>();
        require_send::<StorageError>();
        require_sync::<StorageError>();

        require_send::<upstream::BitgetClient>();
        require_sync::<upstream::BitgetClient>();
        require_send::<upstream::CircuitBreaker>();
        require_sync::<upstream::CircuitBreaker>();
        require_send::<FsStore>();
        require_sync::<FsStore>();
        require_send::<MemoryStore>();
        require_sync::<MemoryStore>();
    }
}
