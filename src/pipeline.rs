//! The two-stage pipeline orchestrator.
//!
//! Given a refresh flag and the current cache state, decides which of
//! {fetch feeds, run pass 1, run pass 2, persist} are stale and must be
//! recomputed, chains their outputs, and decides whether the final narrative
//! qualifies for persistence. Execution is fully sequential: no step starts
//! until the previous one resolves, and no two outbound calls overlap within
//! a request.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;
use crate::feeds::FeedSnapshot;
use crate::passes::PassResult;
use crate::store::Evaluation;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("pipeline_runs_total", "Pipeline invocations.");
        describe_counter!("feed_fetch_total", "Individual feed fetches.");
        describe_counter!("generation_calls_total", "Generation endpoint calls by model.");
        describe_counter!(
            "evaluations_persisted_total",
            "Second-round results stored durably."
        );
        describe_counter!(
            "persist_failures_total",
            "Store inserts that failed and were swallowed."
        );
    });
}

/// Fetches one complete feed cycle and caches it as a unit.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// All-or-nothing fetch of every configured source; writes the slot.
    async fn refresh(&self) -> Result<FeedSnapshot>;
    /// Best-effort read of the cached snapshot.
    async fn read(&self) -> Option<FeedSnapshot>;
    /// Location of the snapshot slot, reported in the pipeline response.
    fn cache_path(&self) -> PathBuf;
}

/// Runs the two generation passes and caches each result independently.
#[async_trait]
pub trait PassRunner: Send + Sync {
    async fn run_cleaning(&self, snapshot: &FeedSnapshot) -> Result<PassResult>;
    async fn run_evaluation(&self, cleaned: &str) -> Result<PassResult>;
    async fn read_cleaning(&self) -> Option<PassResult>;
    async fn read_evaluation(&self) -> Option<PassResult>;
}

/// Durable home for finalized second-round narratives. Rows are append-only.
#[async_trait]
pub trait EvaluationStore: Send + Sync {
    async fn persist(&self, result: &PassResult) -> Result<()>;
    async fn list(&self) -> Result<Vec<Evaluation>>;
    async fn fetch(&self, id: &str) -> Result<Option<Evaluation>>;
}

/// Where the snapshot in a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunSource {
    Cache,
    Refreshed,
}

/// Everything a pipeline run resolved, returned regardless of whether
/// persistence succeeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineOutcome {
    pub source: RunSource,
    pub temp_file: String,
    pub snapshot: FeedSnapshot,
    pub first_round: Option<PassResult>,
    pub second_round: Option<PassResult>,
}

pub struct Pipeline {
    snapshots: Arc<dyn SnapshotStore>,
    passes: Arc<dyn PassRunner>,
    sink: Arc<dyn EvaluationStore>,
}

impl Pipeline {
    pub fn new(
        snapshots: Arc<dyn SnapshotStore>,
        passes: Arc<dyn PassRunner>,
        sink: Arc<dyn EvaluationStore>,
    ) -> Self {
        ensure_metrics_described();
        Self {
            snapshots,
            passes,
            sink,
        }
    }

    /// Run the four-step state machine. Any step failure propagates, except
    /// persistence, which is logged and swallowed so the computed results
    /// still reach the caller.
    pub async fn run(&self, refresh: bool) -> Result<PipelineOutcome> {
        counter!("pipeline_runs_total").increment(1);
        info!(refresh, "pipeline invoked");

        // Step 1: resolve the snapshot. `refreshed` whenever a fetch happened.
        let mut source = RunSource::Cache;
        let snapshot = if refresh {
            info!("refresh requested, fetching feeds");
            source = RunSource::Refreshed;
            self.snapshots.refresh().await?
        } else {
            match self.snapshots.read().await {
                Some(cached) => {
                    info!("using cached snapshot");
                    cached
                }
                None => {
                    info!("no cached snapshot, fetching feeds");
                    source = RunSource::Refreshed;
                    self.snapshots.refresh().await?
                }
            }
        };

        let mut first_round = self.passes.read_cleaning().await;
        let mut second_round = self.passes.read_evaluation().await;

        // Step 2: first-round cleaning, if stale or missing.
        if refresh || first_round.is_none() {
            info!(refresh, had_cached = first_round.is_some(), "running first-round cleaning");
            first_round = Some(self.passes.run_cleaning(&snapshot).await?);
        } else {
            info!("using cached first-round result");
        }

        // Step 3 + 4: second-round evaluation and best-effort persistence.
        // Blank first-round output is never sent downstream, and only a
        // freshly computed narrative is persisted.
        match first_round.as_ref() {
            Some(first) if first.output.trim().is_empty() => {
                info!("skipping second round: first-round output is empty");
            }
            Some(first) if refresh || second_round.is_none() => {
                info!(
                    refresh,
                    had_cached = second_round.is_some(),
                    input_chars = first.output.trim().len(),
                    "running second-round evaluation"
                );
                let fresh = self.passes.run_evaluation(&first.output).await?;
                if fresh.output.trim().is_empty() {
                    info!("skipping persistence: second-round output is empty");
                } else {
                    match self.sink.persist(&fresh).await {
                        Ok(()) => {
                            counter!("evaluations_persisted_total").increment(1);
                            info!(model = %fresh.model, "evaluation persisted");
                        }
                        Err(e) => {
                            counter!("persist_failures_total").increment(1);
                            warn!(error = %e, "failed to persist evaluation");
                        }
                    }
                }
                second_round = Some(fresh);
            }
            Some(_) => {
                info!("using cached second-round result");
            }
            None => {}
        }

        info!(source = ?source, "pipeline completed");
        Ok(PipelineOutcome {
            source,
            temp_file: self.snapshots.cache_path().display().to_string(),
            snapshot,
            first_round,
            second_round,
        })
    }
}
