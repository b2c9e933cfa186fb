//! Domain types shared across the pipeline.

pub mod artifact;
pub mod order;
pub mod params;

pub use artifact::{AggregateReport, SymbolArtifact, TaskDescriptor};
pub use order::{OrderRecord, UNKNOWN_SYMBOL};
pub use params::QueryParams;
