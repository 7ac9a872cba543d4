//! Swing Picks: daily swing-trade signal scanner with outcome tracking
//!
//! Usage:
//!   swing-picks serve --port 3001          Launch the HTTP API
//!   swing-picks daily                      Resolve, learn, scan (cron entry point)
//!   swing-picks scan --ticker SHOP.TO      Scan from CLI

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use engine::{
    budget_view, learn, resolve_pending, run_pipeline, run_scan, EngineConfig, EngineError,
    LearnMode, Outcome, PickQuery, PickStore, PipelineSummary, ResolveRequest, ScanRequest,
    SqliteStore, StrategyStore, TickerMeta, WatchlistStore, YahooClient,
};
use persistence::repository::PickSort;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

const APP_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "-", env!("GIT_HASH"));

#[derive(Parser)]
#[command(name = "swing-picks")]
#[command(about = "Swing-trade signal scanner with outcome tracking and self-tuning", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// SQLite database path (overrides SWING_PICKS_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch the HTTP API
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        /// Port to listen on
        #[arg(short, long, default_value_t = 3001)]
        port: u16,
    },
    /// Run the daily pipeline: resolve, learn, scan, refresh stats
    Daily,
    /// Scan the watchlist for new picks
    Scan {
        /// Only this ticker (need not be on the watchlist)
        #[arg(long)]
        ticker: Option<String>,
        /// Only this strategy (name or detector key)
        #[arg(long)]
        strategy: Option<String>,
        /// Print picks without saving them
        #[arg(long)]
        dry_run: bool,
        /// Keep only the best N picks
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Settle pending picks against price history
    Resolve {
        /// Only picks scanned within this many days
        #[arg(long)]
        lookback_days: Option<i64>,
        /// Trading window before a pick expires
        #[arg(long)]
        max_hold_days: Option<i64>,
    },
    /// Analyze resolved picks, optionally tuning strategies
    Learn {
        /// analyze or adjust
        #[arg(long, default_value = "analyze")]
        mode: String,
    },
    /// List stored picks
    Picks {
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        strategy: Option<String>,
        #[arg(long)]
        ticker: Option<String>,
        /// pending, winner, loser or expired
        #[arg(long)]
        outcome: Option<String>,
        /// high, medium or low
        #[arg(long)]
        confidence: Option<String>,
        /// Only fee-free (CDR) listings
        #[arg(long)]
        cdr: bool,
        /// score or risk_reward
        #[arg(long, default_value = "score")]
        sort: PickSort,
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
    /// Size pending picks for a cash amount, fees included
    Budget {
        #[arg(long)]
        amount: Decimal,
        /// Only picks from this scan date
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Manage the watchlist
    Watch {
        #[command(subcommand)]
        action: WatchAction,
    },
}

#[derive(Subcommand)]
enum WatchAction {
    /// Add or update a ticker
    Add {
        ticker: String,
        #[arg(long, default_value = "")]
        sector: String,
        #[arg(long)]
        name: Option<String>,
        /// Listing trades fee-free (CDR)
        #[arg(long)]
        cdr: bool,
    },
    /// Stop scanning a ticker
    Remove { ticker: String },
    /// Show active tickers
    List,
}

#[derive(Clone)]
struct AppState {
    store: Arc<SqliteStore>,
    prices: Arc<YahooClient>,
    config: Arc<EngineConfig>,
    pipeline_running: Arc<AtomicBool>,
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("debug,engine=debug,swing_picks=debug,sqlx=warn")
    } else {
        EnvFilter::new("info,engine=info,swing_picks=info,sqlx=warn")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).compact())
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    dotenvy::dotenv().ok();

    let mut config = EngineConfig::from_env();
    if let Some(db) = cli.db {
        config.db_path = db;
    }

    match cli.command {
        Commands::Serve { host, port } => {
            cmd_serve(config, &host, port).await?;
        }
        Commands::Daily => {
            cmd_daily(config).await?;
        }
        Commands::Scan {
            ticker,
            strategy,
            dry_run,
            limit,
        } => {
            let request = ScanRequest {
                ticker,
                strategy,
                dry_run,
                limit,
            };
            cmd_scan(config, request).await?;
        }
        Commands::Resolve {
            lookback_days,
            max_hold_days,
        } => {
            cmd_resolve(config, lookback_days, max_hold_days).await?;
        }
        Commands::Learn { mode } => {
            let mode: LearnMode = mode.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            cmd_learn(config, mode).await?;
        }
        Commands::Picks {
            date,
            strategy,
            ticker,
            outcome,
            confidence,
            cdr,
            sort,
            limit,
        } => {
            let query = PickQuery {
                date,
                strategy,
                ticker,
                outcome: outcome
                    .map(|o| o.parse())
                    .transpose()
                    .map_err(|e: String| anyhow::anyhow!(e))?,
                confidence: confidence
                    .map(|c| c.parse())
                    .transpose()
                    .map_err(|e: String| anyhow::anyhow!(e))?,
                is_cdr: cdr.then_some(true),
                sort,
                limit: Some(limit),
            };
            cmd_picks(config, query).await?;
        }
        Commands::Budget { amount, date } => {
            cmd_budget(config, amount, date).await?;
        }
        Commands::Watch { action } => {
            cmd_watch(config, action).await?;
        }
    }

    Ok(())
}

async fn open_store(config: &EngineConfig) -> anyhow::Result<SqliteStore> {
    let db = persistence::Database::new(&config.db_path)
        .await
        .map_err(|e| {
            error!("Failed to initialize database: {}", e);
            anyhow::anyhow!("Database initialization failed: {}", e)
        })?;
    info!("Database initialized: {}", config.db_path.display());

    let store = SqliteStore::new(db.pool_clone());
    engine::ensure_schema(&store).await?;
    Ok(store)
}

fn price_client(config: &EngineConfig) -> anyhow::Result<YahooClient> {
    YahooClient::new(config.fetch_timeout(), &config.history_range)
}

// ============================================================================
// Serve command: Axum web server
// ============================================================================

async fn cmd_serve(config: EngineConfig, host: &str, port: u16) -> anyhow::Result<()> {
    info!("Swing Picks v{} starting...", APP_VERSION);

    let store = open_store(&config).await?;
    let state = AppState {
        store: Arc::new(store),
        prices: Arc::new(price_client(&config)?),
        config: Arc::new(config.clone()),
        pipeline_running: Arc::new(AtomicBool::new(false)),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/health", get(api_health))
        .route("/picks", get(api_picks))
        .route("/scan", post(api_scan))
        .route("/resolve", post(api_resolve))
        .route("/learning", get(api_learning))
        .route("/budget", get(api_budget))
        .route("/pipeline/run", post(api_run_pipeline))
        .route("/strategies", get(api_strategies))
        .with_state(state);

    let app = Router::new().nest("/api", api_routes).layer(cors);

    let addr: std::net::SocketAddr = format!("{}:{}", host, port).parse()?;
    println!("\n=== Swing Picks v{} ===", APP_VERSION);
    println!("Listening on http://{}", addr);
    println!("\nEndpoints:");
    println!("  GET  /api/health              - Health check");
    println!("  GET  /api/picks               - Stored picks with filters");
    println!("  POST /api/scan                - Scan the watchlist");
    println!("  POST /api/resolve             - Settle pending picks");
    println!("  GET  /api/learning            - Strategy performance (?mode=adjust to tune)");
    println!("  GET  /api/budget              - Position sizing for ?amount=");
    println!("  POST /api/pipeline/run        - Run the daily pipeline");
    println!("  GET  /api/strategies          - Strategies and recent adjustments");
    println!("\n  Database: {}", config.db_path.display());
    println!("\nPress Ctrl+C to stop\n");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// CLI commands
// ============================================================================

async fn cmd_daily(config: EngineConfig) -> anyhow::Result<()> {
    println!("\n=== Swing Picks v{} daily run ===", APP_VERSION);
    let store = open_store(&config).await?;
    let prices = price_client(&config)?;

    let summary = run_pipeline(&store, &prices, &config, Utc::now().date_naive()).await;
    print_pipeline(&summary);

    let failed = summary.steps.iter().filter(|s| !s.ok).count();
    if failed > 0 {
        anyhow::bail!("{} pipeline step(s) failed", failed);
    }
    Ok(())
}

fn print_pipeline(summary: &PipelineSummary) {
    println!("Run {} ({} ms)", summary.run_id, summary.elapsed_ms);
    for step in &summary.steps {
        println!("  {:<14} {}", step.step, step.message);
    }
}

async fn cmd_scan(config: EngineConfig, request: ScanRequest) -> anyhow::Result<()> {
    let store = open_store(&config).await?;
    let prices = price_client(&config)?;

    let summary = run_scan(&store, &prices, &request, &config).await?;
    println!(
        "\nScanned {} tickers: {} signals, {} saved{} ({} ms)\n",
        summary.scanned,
        summary.signals,
        summary.saved,
        if request.dry_run { " [dry run]" } else { "" },
        summary.elapsed_ms
    );
    println!(
        "{:<10} {:<24} {:>5} {:<6} {:>10} {:>8} {:>8} {:>6} {:>9}",
        "TICKER", "STRATEGY", "SCORE", "CONF", "ENTRY", "TP%", "SL%", "R:R", "NET@TP"
    );
    for p in &summary.picks {
        println!(
            "{:<10} {:<24} {:>5} {:<6} {:>10.2} {:>8.2} {:>8.2} {:>6.2} {:>9}",
            p.ticker,
            p.strategy_name,
            p.score,
            p.confidence.as_str(),
            p.entry_price,
            p.take_profit_pct,
            p.stop_loss_pct,
            p.risk_reward_ratio,
            p.net_profit_if_target
        );
    }
    Ok(())
}

async fn cmd_resolve(
    config: EngineConfig,
    lookback_days: Option<i64>,
    max_hold_days: Option<i64>,
) -> anyhow::Result<()> {
    let store = open_store(&config).await?;
    let prices = price_client(&config)?;

    let defaults = ResolveRequest::from_config(&config);
    let request = ResolveRequest {
        lookback_days: lookback_days.unwrap_or(defaults.lookback_days),
        max_hold_days: max_hold_days.unwrap_or(defaults.max_hold_days),
    };
    let summary = resolve_pending(&store, &prices, &request, &config, Utc::now().date_naive()).await?;

    println!(
        "\nChecked {}: {} winners, {} losers, {} expired, {} still pending, {} already settled, {} errors",
        summary.checked,
        summary.winners,
        summary.losers,
        summary.expired,
        summary.still_pending,
        summary.already_settled,
        summary.errors
    );
    Ok(())
}

async fn cmd_learn(config: EngineConfig, mode: LearnMode) -> anyhow::Result<()> {
    let store = open_store(&config).await?;
    let outcome = learn(&store, mode).await?;
    let report = &outcome.report;

    println!("\n=== Learning report ({} resolved picks) ===\n", report.total_resolved);
    println!(
        "{:<24} {:>7} {:>7} {:>8} {:>8} {:>7} {:>5}",
        "STRATEGY", "SAMPLES", "WIN%", "AVG WIN", "AVG LOSS", "EXP%", "GRADE"
    );
    for s in &report.strategies {
        println!(
            "{:<24} {:>7} {:>7.1} {:>8.2} {:>8.2} {:>7.2} {:>5}",
            s.strategy_name,
            s.samples,
            s.win_rate,
            s.avg_win_pct,
            s.avg_loss_pct,
            s.expectancy_pct,
            s.grade.map(|g| format!("{:?}", g)).unwrap_or_else(|| "-".to_string())
        );
    }

    println!("\nScore bands:");
    for band in &report.score_bands {
        println!(
            "  {:<10} {:>5} picks  {:>5.1}% win  {:>6.2}% avg",
            band.label, band.samples, band.win_rate, band.avg_outcome_pct
        );
    }

    if mode == LearnMode::Adjust {
        println!("\n{} adjustment(s):", outcome.adjustments.len());
        for a in &outcome.adjustments {
            println!("  [{}] {}: {}", a.reason_code, a.strategy_name, a.reason);
        }
    }
    Ok(())
}

async fn cmd_picks(config: EngineConfig, query: PickQuery) -> anyhow::Result<()> {
    let store = open_store(&config).await?;
    let result = store.query_picks(&query).await?;
    let s = &result.summary;

    println!(
        "\n{} picks: {} winners, {} losers, {} expired, {} pending (avg score {:.1})\n",
        s.total, s.winners, s.losers, s.expired, s.pending, s.avg_score
    );
    println!(
        "{:<10} {:<10} {:<24} {:>5} {:>10} {:<8} {:>8}",
        "DATE", "TICKER", "STRATEGY", "SCORE", "ENTRY", "OUTCOME", "PCT"
    );
    for p in &result.picks {
        println!(
            "{:<10} {:<10} {:<24} {:>5} {:>10.2} {:<8} {:>8}",
            p.scan_date.to_string(),
            p.ticker,
            p.strategy_name,
            p.score,
            p.entry_price,
            p.outcome.as_str(),
            p.outcome_pct
                .map(|v| format!("{:.2}%", v))
                .unwrap_or_else(|| "-".to_string())
        );
    }
    Ok(())
}

async fn pending_for_budget(
    store: &SqliteStore,
    date: Option<NaiveDate>,
) -> Result<Vec<engine::Pick>, EngineError> {
    let query = PickQuery {
        date,
        outcome: Some(Outcome::Pending),
        ..Default::default()
    };
    Ok(store.query_picks(&query).await?.picks)
}

async fn cmd_budget(config: EngineConfig, amount: Decimal, date: Option<NaiveDate>) -> anyhow::Result<()> {
    let store = open_store(&config).await?;
    let picks = pending_for_budget(&store, date).await?;
    let view = budget_view(&picks, amount, &config.fees)?;

    println!(
        "\nBudget ${}: {} affordable, {} above budget\n",
        view.amount,
        view.lines.len(),
        view.unaffordable
    );
    println!(
        "{:<10} {:<24} {:>6} {:>10} {:>9} {:>9} {:>10} {:>10}",
        "TICKER", "STRATEGY", "SHARES", "COST", "FEE@TP", "FEE@SL", "NET@TP", "NET@SL"
    );
    for line in &view.lines {
        println!(
            "{:<10} {:<24} {:>6} {:>10} {:>9} {:>9} {:>10} {:>10}",
            line.ticker,
            line.strategy_name,
            line.shares,
            line.cost,
            line.fees_at_target,
            line.fees_at_stop,
            line.net_at_target,
            line.net_at_stop
        );
    }
    Ok(())
}

async fn cmd_watch(config: EngineConfig, action: WatchAction) -> anyhow::Result<()> {
    let store = open_store(&config).await?;

    match action {
        WatchAction::Add {
            ticker,
            sector,
            name,
            cdr,
        } => {
            let mut meta = TickerMeta::new(&ticker, &sector, cdr);
            meta.name = name;
            store.upsert_ticker(&meta).await?;
            println!("Watching {} ({}{})", meta.ticker, meta.sector, if cdr { ", CDR" } else { "" });
        }
        WatchAction::Remove { ticker } => {
            if store.deactivate_ticker(&ticker).await? {
                println!("Stopped watching {}", ticker.to_uppercase());
            } else {
                warn!(ticker = %ticker, "Ticker not on the watchlist");
            }
        }
        WatchAction::List => {
            let watchlist = store.active_watchlist().await?;
            println!("\n{} active tickers\n", watchlist.len());
            for meta in &watchlist {
                println!(
                    "{:<10} {:<20} {:<4} {}",
                    meta.ticker,
                    meta.sector,
                    if meta.is_cdr { "CDR" } else { "" },
                    meta.name.as_deref().unwrap_or("")
                );
            }
        }
    }
    Ok(())
}

// ============================================================================
// API Handlers
// ============================================================================

type ApiResult = Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)>;

fn api_error(e: EngineError) -> (StatusCode, Json<serde_json::Value>) {
    let status = match &e {
        EngineError::UnknownStrategy(_)
        | EngineError::InvalidBudget(_)
        | EngineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!("API error: {}", e);
    }
    (
        status,
        Json(serde_json::json!({
            "success": false,
            "error": e.to_string(),
        })),
    )
}

/// GET /api/health
async fn api_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "swing-picks",
        "version": APP_VERSION,
    }))
}

/// GET /api/picks: stored picks with filters and summary counts
async fn api_picks(State(state): State<AppState>, Query(query): Query<PickQuery>) -> ApiResult {
    let result = state.store.query_picks(&query).await.map_err(api_error)?;
    Ok(Json(serde_json::json!({
        "success": true,
        "data": result.picks,
        "summary": result.summary,
    })))
}

/// POST /api/scan: scan now; body is optional
async fn api_scan(State(state): State<AppState>, body: Option<Json<ScanRequest>>) -> ApiResult {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    info!(
        ticker = ?request.ticker,
        strategy = ?request.strategy,
        dry_run = request.dry_run,
        "Scan requested via API"
    );

    let summary = run_scan(
        state.store.as_ref(),
        state.prices.as_ref(),
        &request,
        &state.config,
    )
    .await
    .map_err(api_error)?;

    Ok(Json(serde_json::json!({
        "success": true,
        "summary": summary,
    })))
}

#[derive(Debug, Default, Deserialize)]
struct ResolveParams {
    lookback_days: Option<i64>,
    max_hold_days: Option<i64>,
}

/// POST /api/resolve: settle pending picks
async fn api_resolve(State(state): State<AppState>, body: Option<Json<ResolveParams>>) -> ApiResult {
    let params = body.map(|Json(p)| p).unwrap_or_default();
    let defaults = ResolveRequest::from_config(&state.config);
    let request = ResolveRequest {
        lookback_days: params.lookback_days.unwrap_or(defaults.lookback_days),
        max_hold_days: params.max_hold_days.unwrap_or(defaults.max_hold_days),
    };

    let summary = resolve_pending(
        state.store.as_ref(),
        state.prices.as_ref(),
        &request,
        &state.config,
        Utc::now().date_naive(),
    )
    .await
    .map_err(api_error)?;

    Ok(Json(serde_json::json!({
        "success": true,
        "summary": summary,
    })))
}

#[derive(Debug, Deserialize)]
struct LearningParams {
    #[serde(default)]
    mode: LearnMode,
}

/// GET /api/learning?mode=analyze|adjust
async fn api_learning(State(state): State<AppState>, Query(params): Query<LearningParams>) -> ApiResult {
    let outcome = learn(state.store.as_ref(), params.mode)
        .await
        .map_err(api_error)?;
    Ok(Json(serde_json::json!({
        "success": true,
        "mode": outcome.mode,
        "report": outcome.report,
        "adjustments": outcome.adjustments,
    })))
}

#[derive(Debug, Deserialize)]
struct BudgetParams {
    amount: Decimal,
    date: Option<NaiveDate>,
}

/// GET /api/budget?amount=&date=: size pending picks for a cash amount
async fn api_budget(State(state): State<AppState>, Query(params): Query<BudgetParams>) -> ApiResult {
    let picks = pending_for_budget(&state.store, params.date)
        .await
        .map_err(api_error)?;
    let view = budget_view(&picks, params.amount, &state.config.fees).map_err(api_error)?;
    Ok(Json(serde_json::json!({
        "success": true,
        "budget": view,
    })))
}

/// Exclusive hold on the pipeline-running flag. The flag clears on drop,
/// so a cancelled or panicked run cannot leave it set.
struct PipelineGuard(Arc<AtomicBool>);

impl PipelineGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(Arc::clone(flag)))
    }
}

impl Drop for PipelineGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// POST /api/pipeline/run: run the daily pipeline and wait for its summary.
/// The run is detached, so it finishes even if the client goes away.
async fn api_run_pipeline(State(state): State<AppState>) -> ApiResult {
    let Some(guard) = PipelineGuard::acquire(&state.pipeline_running) else {
        return Ok(Json(serde_json::json!({
            "success": false,
            "message": "Pipeline already running",
        })));
    };

    info!("Pipeline run requested via API");
    let task_state = state.clone();
    let run = tokio::spawn(async move {
        let _guard = guard;
        run_pipeline(
            task_state.store.as_ref(),
            task_state.prices.as_ref(),
            &task_state.config,
            Utc::now().date_naive(),
        )
        .await
    });

    let summary = run.await.map_err(|e| {
        error!("Pipeline task failed: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({
                "success": false,
                "error": format!("pipeline task failed: {e}"),
            })),
        )
    })?;

    Ok(Json(serde_json::json!({
        "success": summary.all_ok(),
        "summary": summary,
    })))
}

/// GET /api/strategies: current strategy parameters and recent learner actions
async fn api_strategies(State(state): State<AppState>) -> ApiResult {
    let strategies = state.store.strategies().await.map_err(api_error)?;
    let adjustments = state.store.adjustments(50).await.map_err(api_error)?;
    Ok(Json(serde_json::json!({
        "success": true,
        "data": strategies,
        "adjustments": adjustments,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_guard_is_exclusive() {
        let flag = Arc::new(AtomicBool::new(false));

        let first = PipelineGuard::acquire(&flag).unwrap();
        assert!(PipelineGuard::acquire(&flag).is_none());

        drop(first);
        assert!(!flag.load(Ordering::Acquire));
        assert!(PipelineGuard::acquire(&flag).is_some());
    }

    #[tokio::test]
    async fn test_cancelled_run_releases_guard() {
        let flag = Arc::new(AtomicBool::new(false));
        let guard = PipelineGuard::acquire(&flag).unwrap();

        let run = tokio::spawn(async move {
            let _guard = guard;
            std::future::pending::<()>().await;
        });
        tokio::task::yield_now().await;
        assert!(flag.load(Ordering::Acquire));

        run.abort();
        assert!(run.await.unwrap_err().is_cancelled());
        assert!(!flag.load(Ordering::Acquire));
    }

    #[test]
    fn test_picks_sort_flag() {
        let cli = Cli::try_parse_from(["swing-picks", "picks", "--sort", "rr"]).unwrap();
        match cli.command {
            Commands::Picks { sort, .. } => assert_eq!(sort, PickSort::RiskReward),
            _ => panic!("expected picks command"),
        }

        let defaulted = Cli::try_parse_from(["swing-picks", "picks"]).unwrap();
        assert!(matches!(defaulted.command, Commands::Picks { sort: PickSort::Score, .. }));

        assert!(Cli::try_parse_from(["swing-picks", "picks", "--sort", "volume"]).is_err());
    }
}
