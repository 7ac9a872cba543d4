//! Swing Picks Engine: signal generation, outcome tracking and self-tuning
//!
//! Provides:
//! - Indicator library and eight swing-trade strategy detectors
//! - Fee model, scorer and confidence classifier
//! - Outcome resolver and adaptive learner over stored picks
//! - Daily pipeline tying scan, resolve and learn together
//! - Yahoo Finance daily-bar client

pub mod api;
pub mod budget;
pub mod catalog;
pub mod config;
pub mod detectors;
pub mod error;
pub mod fees;
pub mod indicators;
pub mod learner;
pub mod pipeline;
pub mod resolver;
pub mod scanner;
pub mod scorer;
pub mod store;
pub mod types;

#[cfg(test)]
mod testing;

// Re-exports for convenience
pub use api::{PriceSource, YahooClient};
pub use budget::{budget_view, BudgetLine, BudgetView};
pub use catalog::{default_catalog, Strategy};
pub use config::EngineConfig;
pub use detectors::{DetectorKind, Signal, StrategyParams};
pub use error::{EngineError, EngineResult};
pub use fees::{FeeClass, FeeConfig, FeeEstimate, RoundTripFee};
pub use learner::{
    analyze, learn, LearnMode, LearningOutcome, LearningReport, ReasonCode, StrategyAdjustment,
    StrategyStats,
};
pub use pipeline::{ensure_schema, run_pipeline, PipelineSummary, StepOutcome};
pub use resolver::{resolve_pending, ResolveRequest, ResolveSummary};
pub use scanner::{run_scan, ScanRequest, ScanSummary};
pub use store::{
    AuditSink, DashboardStats, PickQuery, PickQueryResult, PickStore, SqliteStore, Store,
    StrategyStore, WatchlistStore,
};
pub use types::*;
