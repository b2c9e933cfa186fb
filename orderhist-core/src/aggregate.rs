//! Fan-in: merge per-symbol artifacts into one report per product type.
//!
//! Artifacts are read in parallel and merged in descriptor order, so the same
//! inputs always produce the same report. A descriptor naming an artifact
//! already listed is dropped. A malformed artifact is skipped and recorded; a
//! failed storage read aborts the aggregation.

use crate::domain::{AggregateReport, SymbolArtifact, TaskDescriptor};
use crate::storage::{put_json, report_key, ArtifactReceipt, ObjectStore, StorageError};
use rayon::prelude::*;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("reading artifact {key}: {source}")]
    Read {
        key: String,
        #[source]
        source: StorageError,
    },

    #[error("writing report: {0}")]
    Write(#[from] StorageError),
}

/// Report plus bookkeeping about what went into it.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub report: AggregateReport,
    /// Artifacts read and merged.
    pub merged: usize,
    /// Descriptors skipped because their count hint was zero.
    pub skipped_empty: usize,
    /// Descriptors dropped because an earlier one named the same artifact.
    pub duplicates: usize,
    /// Keys of artifacts that failed to parse.
    pub malformed: Vec<String>,
}

enum ArtifactRead {
    Parsed(SymbolArtifact),
    Malformed(String),
}

pub struct ReportAggregator<'a> {
    store: &'a dyn ObjectStore,
}

impl<'a> ReportAggregator<'a> {
    pub fn new(store: &'a dyn ObjectStore) -> Self {
        Self { store }
    }

    /// Merge the artifacts named by `tasks` into a report.
    pub fn aggregate(&self, tasks: &[TaskDescriptor]) -> Result<AggregateReport, AggregateError> {
        self.collect(tasks).map(|a| a.report)
    }

    /// Like [`aggregate`](Self::aggregate), keeping skip counts and malformed keys.
    pub fn collect(&self, tasks: &[TaskDescriptor]) -> Result<Aggregation, AggregateError> {
        let (candidates, empty): (Vec<&TaskDescriptor>, Vec<&TaskDescriptor>) =
            tasks.iter().partition(|t| t.orders_count > 0);

        let mut seen: HashSet<(&str, &str)> = HashSet::new();
        let pending: Vec<&TaskDescriptor> = candidates
            .iter()
            .copied()
            .filter(|t| seen.insert((t.bucket.as_str(), t.s3_key.as_str())))
            .collect();
        let duplicates = candidates.len() - pending.len();
        if duplicates > 0 {
            warn!(duplicates, "dropping descriptors that repeat an artifact");
        }

        let reads: Vec<Result<ArtifactRead, AggregateError>> =
            pending.par_iter().map(|task| self.read(task)).collect();

        let mut aggregation = Aggregation {
            report: AggregateReport::new(),
            merged: 0,
            skipped_empty: empty.len(),
            duplicates,
            malformed: Vec::new(),
        };

        for read in reads {
            match read? {
                ArtifactRead::Parsed(artifact) => {
                    for order in artifact.into_orders() {
                        aggregation.report.push(order);
                    }
                    aggregation.merged += 1;
                }
                ArtifactRead::Malformed(key) => aggregation.malformed.push(key),
            }
        }

        info!(
            artifacts = tasks.len(),
            merged = aggregation.merged,
            skipped_empty = aggregation.skipped_empty,
            duplicates = aggregation.duplicates,
            malformed = aggregation.malformed.len(),
            symbols = aggregation.report.symbols().len(),
            total_orders = aggregation.report.total_orders(),
            "artifacts aggregated"
        );

        Ok(aggregation)
    }

    fn read(&self, task: &TaskDescriptor) -> Result<ArtifactRead, AggregateError> {
        let body = self
            .store
            .get(&task.bucket, &task.s3_key)
            .map_err(|source| AggregateError::Read {
                key: task.s3_key.clone(),
                source,
            })?;

        match serde_json::from_slice::<SymbolArtifact>(&body) {
            Ok(artifact) => Ok(ArtifactRead::Parsed(artifact)),
            Err(e) => {
                warn!(bucket = %task.bucket, key = %task.s3_key, error = %e, "skipping malformed artifact");
                Ok(ArtifactRead::Malformed(task.s3_key.clone()))
            }
        }
    }

    /// Write `report` to `orders-history/{productType}/{productType}_orders.json`.
    pub fn write_report(
        &self,
        bucket: &str,
        product_type: &str,
        report: &AggregateReport,
    ) -> Result<ArtifactReceipt, AggregateError> {
        let key = report_key(product_type);
        let receipt = put_json(self.store, bucket, &key, report)?;
        info!(
            product_type,
            key = %receipt.key,
            total_orders = report.total_orders(),
            "aggregate report written"
        );
        Ok(receipt)
    }
}
