//! Daily pipeline
//!
//! resolve → learn → scan → dashboard stats, then a run snapshot and an
//! audit line. Every step reports `ok: …` or `error: …`; a failing step is
//! logged and the run moves on to the next one.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{error, info, warn};

use crate::api::PriceSource;
use crate::catalog::default_catalog;
use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::learner::{learn, LearnMode};
use crate::resolver::{resolve_pending, ResolveRequest};
use crate::scanner::{run_scan, ScanRequest};
use crate::store::{Store, StrategyStore};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub step: String,
    pub ok: bool,
    pub message: String,
}

impl StepOutcome {
    fn from_result(step: &str, result: EngineResult<String>) -> Self {
        match result {
            Ok(detail) => {
                info!(step, %detail, "Pipeline step done");
                Self {
                    step: step.to_string(),
                    ok: true,
                    message: format!("ok: {detail}"),
                }
            }
            Err(e) => {
                error!(step, error = %e, "Pipeline step failed");
                Self {
                    step: step.to_string(),
                    ok: false,
                    message: format!("error: {e}"),
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub steps: Vec<StepOutcome>,
}

impl PipelineSummary {
    pub fn all_ok(&self) -> bool {
        self.steps.iter().all(|s| s.ok)
    }
}

/// Seed the default strategy catalog; existing rows keep their tuned values
pub async fn ensure_schema<S>(store: &S) -> EngineResult<usize>
where
    S: StrategyStore + ?Sized,
{
    let mut seeded = 0;
    for strategy in default_catalog() {
        if store.seed_strategy(&strategy).await? {
            seeded += 1;
        }
    }
    Ok(seeded)
}

pub async fn run_pipeline<S, P>(
    store: &S,
    source: &P,
    config: &EngineConfig,
    today: NaiveDate,
) -> PipelineSummary
where
    S: Store + ?Sized,
    P: PriceSource + ?Sized,
{
    let started_at = Utc::now();
    let start = Instant::now();
    let run_id = format!("run-{}", started_at.format("%Y%m%dT%H%M%S%3f"));
    info!(%run_id, %today, "Pipeline starting");

    let mut steps = Vec::with_capacity(5);

    let result = ensure_schema(store)
        .await
        .map(|seeded| format!("{seeded} strategies seeded"));
    steps.push(StepOutcome::from_result("ensure_schema", result));

    let request = ResolveRequest::from_config(config);
    let result = resolve_pending(store, source, &request, config, today)
        .await
        .map(|s| {
            format!(
                "{} checked, {} winners, {} losers, {} expired, {} pending, {} already settled, {} errors",
                s.checked,
                s.winners,
                s.losers,
                s.expired,
                s.still_pending,
                s.already_settled,
                s.errors
            )
        });
    steps.push(StepOutcome::from_result("resolve", result));

    let result = learn(store, LearnMode::Adjust).await.map(|outcome| {
        format!(
            "{} resolved picks, {} adjustments",
            outcome.report.total_resolved,
            outcome.adjustments.len()
        )
    });
    steps.push(StepOutcome::from_result("learn", result));

    let result = run_scan(store, source, &ScanRequest::default(), config)
        .await
        .map(|s| {
            format!(
                "{} scanned, {} signals, {} saved, {} errors",
                s.scanned, s.signals, s.saved, s.errors
            )
        });
    steps.push(StepOutcome::from_result("scan", result));

    let result = store.refresh_dashboard_stats().await.map(|stats| {
        format!(
            "{} picks, {} pending, win rate {:.1}%",
            stats.total_picks, stats.pending, stats.win_rate
        )
    });
    steps.push(StepOutcome::from_result("dashboard", result));

    let summary = PipelineSummary {
        run_id,
        started_at,
        elapsed_ms: start.elapsed().as_millis() as u64,
        steps,
    };

    if let Err(e) = store.save_run_snapshot(&summary).await {
        warn!(run_id = %summary.run_id, error = %e, "Failed to save run snapshot");
    }
    let failed = summary.steps.iter().filter(|s| !s.ok).count();
    let detail = format!(
        "{} steps, {} failed, {} ms",
        summary.steps.len(),
        failed,
        summary.elapsed_ms
    );
    if let Err(e) = store.audit("pipeline_run", &detail).await {
        warn!(run_id = %summary.run_id, error = %e, "Failed to write audit entry");
    }

    info!(
        run_id = %summary.run_id,
        elapsed_ms = summary.elapsed_ms,
        failed,
        "Pipeline complete"
    );
    summary
}
