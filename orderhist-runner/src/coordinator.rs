//! Extraction coordinator: fan out one fetch per symbol, then fan in.
//!
//! Symbol fetches run on a bounded rayon pool. A failed fetch is recorded in
//! the summary and does not stop the others; aggregation runs over whatever
//! artifacts were written. Once the exchange client reports itself
//! unavailable (circuit breaker open) the remaining symbols are skipped.

use crate::context::TaskContext;
use crate::request::ExtractRequest;
use crate::response::TaskResponse;
use crate::tasks::{execute_aggregate, execute_fetch, AggregateOutput, FetchOutput, TaskError};
use chrono::{DateTime, Utc};
use orderhist_core::{QueryParams, TaskDescriptor};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Progress callbacks for a batch of symbol fetches.
pub trait TaskProgress: Send + Sync {
    fn on_start(&self, symbol: &str, index: usize, total: usize);
    fn on_complete(&self, symbol: &str, index: usize, total: usize, result: &SymbolResult);
    fn on_batch_complete(&self, summary: &ExecutionSummary);
}

/// Progress reporter that logs through `tracing`.
pub struct LogProgress;

impl TaskProgress for LogProgress {
    fn on_start(&self, symbol: &str, index: usize, total: usize) {
        info!(symbol, task = index + 1, total, "fetch started");
    }

    fn on_complete(&self, symbol: &str, index: usize, total: usize, result: &SymbolResult) {
        match result.status {
            TaskStatus::Complete => {
                info!(symbol, task = index + 1, total, orders = result.orders_count, "fetch complete")
            }
            TaskStatus::Partial => warn!(
                symbol,
                task = index + 1,
                total,
                orders = result.orders_count,
                error = result.error.as_deref().unwrap_or_default(),
                "fetch partial"
            ),
            TaskStatus::Failed | TaskStatus::Skipped => warn!(
                symbol,
                task = index + 1,
                total,
                status = ?result.status,
                error = result.error.as_deref().unwrap_or_default(),
                "fetch did not run to completion"
            ),
        }
    }

    fn on_batch_complete(&self, summary: &ExecutionSummary) {
        info!(
            execution_id = %summary.execution_id,
            total = summary.symbols.len(),
            failed = summary.failed(),
            skipped = summary.skipped(),
            total_orders = summary.report.total_orders,
            "extraction finished"
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Complete,
    Partial,
    Failed,
    Skipped,
}

/// Outcome of one symbol's fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolResult {
    pub symbol: String,
    pub status: TaskStatus,
    pub orders_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything one extraction did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionSummary {
    pub execution_id: String,
    pub product_type: String,
    pub started_at: DateTime<Utc>,
    pub symbols: Vec<SymbolResult>,
    /// Artifacts handed to the aggregator, in symbol order.
    pub tasks: Vec<TaskDescriptor>,
    pub report: AggregateOutput,
}

impl ExecutionSummary {
    pub fn count(&self, status: TaskStatus) -> usize {
        self.symbols.iter().filter(|s| s.status == status).count()
    }

    pub fn failed(&self) -> usize {
        self.count(TaskStatus::Failed)
    }

    pub fn skipped(&self) -> usize {
        self.count(TaskStatus::Skipped)
    }

    pub fn all_complete(&self) -> bool {
        self.count(TaskStatus::Complete) == self.symbols.len()
    }
}

/// Deterministic id for a run: BLAKE3 over product type, symbols, start time.
pub fn execution_id(product_type: &str, symbols: &[&str], started_at: DateTime<Utc>) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(product_type.as_bytes());
    for symbol in symbols {
        hasher.update(b"\0");
        hasher.update(symbol.as_bytes());
    }
    hasher.update(started_at.to_rfc3339().as_bytes());
    hasher.finalize().to_hex().as_str()[..16].to_string()
}

pub struct Coordinator {
    ctx: TaskContext,
    max_parallel: usize,
    progress: Arc<dyn TaskProgress>,
}

impl Coordinator {
    pub fn new(ctx: TaskContext, max_parallel: usize) -> Self {
        Self {
            ctx,
            max_parallel: max_parallel.max(1),
            progress: Arc::new(LogProgress),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn TaskProgress>) -> Self {
        self.progress = progress;
        self
    }

    /// Validate, run, and wrap the outcome as a task response.
    ///
    /// 400 for an invalid request, 500 if the run itself fails, 200 otherwise
    /// (even when individual symbols failed; see the summary).
    pub fn start(&self, request: &ExtractRequest) -> TaskResponse {
        let (product_type, symbols) = match request.validate() {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "rejecting extract request");
                return TaskResponse::bad_request(&e);
            }
        };

        let summary = match self.execute(product_type, &symbols) {
            Ok(summary) => summary,
            Err(e) => {
                error!(product_type, error = %e, "extraction failed");
                return TaskResponse::internal_error(format!("Error starting execution: {e}"));
            }
        };

        let body = json!({
            "message": format!("Execution completed for {} symbols.", summary.symbols.len()),
            "executionArn": summary.execution_id,
            "summary": summary,
        });
        TaskResponse {
            status_code: TaskResponse::OK,
            body,
        }
    }

    /// Fetch every symbol, then aggregate what was written.
    pub fn execute(&self, product_type: &str, symbols: &[&str]) -> Result<ExecutionSummary, TaskError> {
        let started_at = Utc::now();
        let execution_id = execution_id(product_type, symbols, started_at);
        info!(%execution_id, product_type, symbols = symbols.len(), "extraction started");

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_parallel)
            .build()
            .map_err(|e| TaskError::Scheduler(e.to_string()))?;

        let total = symbols.len();
        let outcomes: Vec<(SymbolResult, Option<FetchOutput>)> = pool.install(|| {
            symbols
                .par_iter()
                .enumerate()
                .map(|(i, symbol)| self.run_symbol(product_type, symbol, i, total))
                .collect()
        });

        let mut results = Vec::with_capacity(total);
        let mut tasks = Vec::new();
        for (result, output) in outcomes {
            if let Some(output) = output {
                tasks.extend(output.artifacts);
            }
            results.push(result);
        }

        let report = execute_aggregate(&self.ctx, product_type, &tasks)?;

        let summary = ExecutionSummary {
            execution_id,
            product_type: product_type.to_string(),
            started_at,
            symbols: results,
            tasks,
            report,
        };
        self.progress.on_batch_complete(&summary);
        Ok(summary)
    }

    fn run_symbol(
        &self,
        product_type: &str,
        symbol: &str,
        index: usize,
        total: usize,
    ) -> (SymbolResult, Option<FetchOutput>) {
        self.progress.on_start(symbol, index, total);

        let (result, output) = if !self.ctx.api.is_available() {
            let result = SymbolResult {
                symbol: symbol.to_string(),
                status: TaskStatus::Skipped,
                orders_count: 0,
                error: Some(format!("{} unavailable", self.ctx.api.name())),
            };
            (result, None)
        } else {
            let params = QueryParams::new(product_type).with("symbol", symbol);
            match execute_fetch(&self.ctx, &params) {
                Ok(output) => {
                    let result = SymbolResult {
                        symbol: symbol.to_string(),
                        status: if output.complete {
                            TaskStatus::Complete
                        } else {
                            TaskStatus::Partial
                        },
                        orders_count: output.record_count,
                        error: output.error.clone(),
                    };
                    (result, Some(output))
                }
                Err(e) => {
                    let result = SymbolResult {
                        symbol: symbol.to_string(),
                        status: TaskStatus::Failed,
                        orders_count: 0,
                        error: Some(e.to_string()),
                    };
                    (result, None)
                }
            }
        };

        self.progress.on_complete(symbol, index, total, &result);
        (result, output)
    }
}
