//! Task handlers: one fetch (fan-out unit) and one aggregation (fan-in).
//!
//! Invalid payloads produce a 400 response without touching the exchange or
//! storage. Fatal errors are logged and returned as `Err`; callers decide how
//! to surface them.

use crate::context::TaskContext;
use crate::request::{AggregateRequest, FetchRequest};
use crate::response::TaskResponse;
use orderhist_core::storage::StorageError;
use orderhist_core::{
    AggregateError, Completeness, HistoryFetcher, QueryParams, ReportAggregator, SymbolPartitioner,
    TaskDescriptor, UpstreamError,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("exchange error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("aggregation failed: {0}")]
    Aggregate(#[from] AggregateError),

    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("scheduler error: {0}")]
    Scheduler(String),
}

/// Result body of a fetch task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchOutput {
    pub bucket: String,
    /// One descriptor per artifact written, ready to feed the aggregator.
    pub artifacts: Vec<TaskDescriptor>,
    /// Orders fetched across all artifacts.
    pub record_count: usize,
    pub complete: bool,
    /// Exchange error that cut the fetch short, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result body of an aggregation task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateOutput {
    pub bucket: String,
    pub s3_key: String,
    #[serde(rename = "total_orders")]
    pub total_orders: usize,
    pub symbols: usize,
    pub skipped_empty: usize,
    /// Descriptors dropped because they repeated an earlier artifact.
    #[serde(default)]
    pub duplicates: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub malformed: Vec<String>,
    pub digest: String,
}

/// Validate `request`, fetch, partition, persist.
pub fn run_fetch_task(ctx: &TaskContext, request: &FetchRequest) -> Result<TaskResponse, TaskError> {
    let params = match request.to_params() {
        Ok(params) => params,
        Err(e) => {
            warn!(error = %e, "rejecting fetch request");
            return Ok(TaskResponse::bad_request(&e));
        }
    };
    let output = execute_fetch(ctx, &params)?;
    Ok(TaskResponse::ok(&output)?)
}

/// Fetch with already-validated params.
///
/// A symbol-scoped fetch always writes exactly one artifact (possibly empty).
/// An unscoped fetch writes one artifact per symbol found.
pub fn execute_fetch(ctx: &TaskContext, params: &QueryParams) -> Result<FetchOutput, TaskError> {
    let result = HistoryFetcher::new(ctx.api.as_ref())
        .fetch(params)
        .map_err(|e| {
            error!(params = %params, error = %e, "order history fetch failed");
            e
        })?;

    if result.is_empty() {
        info!(params = %params, "no orders found");
    }

    let complete = result.is_complete();
    let error = match &result.completeness {
        Completeness::Complete => None,
        Completeness::Partial { error, .. } => Some(error.to_string()),
    };
    let record_count = result.len();

    let partitioner = SymbolPartitioner::new(ctx.store.as_ref(), &ctx.bucket);
    let persisted = match params.symbol() {
        Some(symbol) => vec![partitioner.persist_single(params.product_type(), symbol, result.orders)?],
        None => partitioner.persist_grouped(params.product_type(), result.orders)?,
    };

    let artifacts = persisted
        .into_iter()
        .map(|p| TaskDescriptor::new(p.receipt.bucket, p.receipt.key, p.orders_count))
        .collect();

    Ok(FetchOutput {
        bucket: ctx.bucket.clone(),
        artifacts,
        record_count,
        complete,
        error,
    })
}

/// Validate `request`, merge its artifacts, write the report.
pub fn run_aggregate_task(
    ctx: &TaskContext,
    request: &AggregateRequest,
) -> Result<TaskResponse, TaskError> {
    let product_type = match request.product_type() {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "rejecting aggregate request");
            return Ok(TaskResponse::bad_request(&e));
        }
    };
    let output = execute_aggregate(ctx, product_type, &request.tasks)?;
    Ok(TaskResponse::ok(&output)?)
}

pub fn execute_aggregate(
    ctx: &TaskContext,
    product_type: &str,
    tasks: &[TaskDescriptor],
) -> Result<AggregateOutput, TaskError> {
    let aggregator = ReportAggregator::new(ctx.store.as_ref());
    let aggregation = aggregator.collect(tasks).map_err(|e| {
        error!(product_type, error = %e, "aggregation failed");
        e
    })?;
    let receipt = aggregator.write_report(&ctx.bucket, product_type, &aggregation.report)?;

    Ok(AggregateOutput {
        bucket: receipt.bucket,
        s3_key: receipt.key,
        total_orders: aggregation.report.total_orders(),
        symbols: aggregation.report.symbols().len(),
        skipped_empty: aggregation.skipped_empty,
        duplicates: aggregation.duplicates,
        malformed: aggregation.malformed,
        digest: receipt.digest,
    })
}

/// Liveness response for the front door.
pub fn run_health_check() -> TaskResponse {
    TaskResponse {
        status_code: TaskResponse::OK,
        body: serde_json::json!({ "messages": "API is healthy" }),
    }
}
