//! Database schema definitions

/// SQL to create all tables
/// NOTE: money amounts are stored as TEXT to preserve rust_decimal::Decimal precision;
/// dates are ISO `YYYY-MM-DD` TEXT so lexical order is chronological order
pub const CREATE_TABLES: &str = r#"
-- Candidate trade signals (historical ledger, never deleted)
CREATE TABLE IF NOT EXISTS picks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    pick_hash TEXT NOT NULL UNIQUE,
    ticker TEXT NOT NULL,
    strategy_name TEXT NOT NULL,
    scan_date TEXT NOT NULL,
    entry_price REAL NOT NULL CHECK (entry_price > 0),
    stop_loss_price REAL NOT NULL,
    take_profit_price REAL NOT NULL,
    stop_loss_pct REAL NOT NULL,
    take_profit_pct REAL NOT NULL,
    score INTEGER NOT NULL CHECK (score BETWEEN 0 AND 100),
    confidence TEXT NOT NULL,
    is_cdr INTEGER NOT NULL DEFAULT 0,
    fee_roundtrip TEXT NOT NULL DEFAULT '0',
    net_profit_if_target TEXT NOT NULL DEFAULT '0',
    risk_reward_ratio REAL NOT NULL DEFAULT 0,
    signal_snapshot TEXT NOT NULL DEFAULT '{}',
    outcome TEXT NOT NULL DEFAULT 'pending',
    outcome_price REAL,
    outcome_pct REAL,
    outcome_date TEXT,
    created_at INTEGER DEFAULT (strftime('%s', 'now'))
);

-- Detector configuration, tuned by the learner
CREATE TABLE IF NOT EXISTS strategies (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    family TEXT NOT NULL,
    detector_key TEXT NOT NULL,
    ideal_hold_days INTEGER NOT NULL DEFAULT 5,
    default_target_pct REAL NOT NULL,
    default_stop_pct REAL NOT NULL,
    target_pct REAL NOT NULL,
    stop_pct REAL NOT NULL,
    enabled INTEGER NOT NULL DEFAULT 1,
    updated_at INTEGER DEFAULT (strftime('%s', 'now'))
);

-- Ticker universe
CREATE TABLE IF NOT EXISTS watchlist (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    ticker TEXT NOT NULL UNIQUE,
    sector TEXT NOT NULL DEFAULT '',
    is_cdr INTEGER NOT NULL DEFAULT 0,
    active INTEGER NOT NULL DEFAULT 1,
    added_at INTEGER DEFAULT (strftime('%s', 'now'))
);

-- Learner parameter changes and advisories
CREATE TABLE IF NOT EXISTS strategy_adjustments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    strategy_name TEXT NOT NULL,
    field TEXT NOT NULL,
    old_value REAL,
    new_value REAL,
    sample_count INTEGER NOT NULL,
    reason_code TEXT NOT NULL,
    reason TEXT NOT NULL,
    created_at INTEGER DEFAULT (strftime('%s', 'now'))
);

-- Append-only operational log
CREATE TABLE IF NOT EXISTS audit_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    action TEXT NOT NULL,
    detail TEXT NOT NULL DEFAULT '',
    created_at INTEGER DEFAULT (strftime('%s', 'now'))
);

-- One row per daily pipeline run
CREATE TABLE IF NOT EXISTS run_snapshots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id TEXT NOT NULL UNIQUE,
    started_at TEXT NOT NULL,
    elapsed_ms INTEGER NOT NULL,
    steps_json TEXT NOT NULL,
    created_at INTEGER DEFAULT (strftime('%s', 'now'))
);

-- Single-row aggregate refreshed by the pipeline
CREATE TABLE IF NOT EXISTS dashboard_stats (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    total_picks INTEGER NOT NULL DEFAULT 0,
    pending INTEGER NOT NULL DEFAULT 0,
    winners INTEGER NOT NULL DEFAULT 0,
    losers INTEGER NOT NULL DEFAULT 0,
    expired INTEGER NOT NULL DEFAULT 0,
    win_rate REAL NOT NULL DEFAULT 0,
    avg_score REAL NOT NULL DEFAULT 0,
    avg_outcome_pct REAL NOT NULL DEFAULT 0,
    refreshed_at INTEGER DEFAULT (strftime('%s', 'now'))
);

-- ========== INDEXES ==========

CREATE INDEX IF NOT EXISTS idx_picks_scan_date ON picks(scan_date);
CREATE INDEX IF NOT EXISTS idx_picks_outcome ON picks(outcome, scan_date);
CREATE INDEX IF NOT EXISTS idx_picks_strategy ON picks(strategy_name, outcome);
CREATE INDEX IF NOT EXISTS idx_picks_ticker ON picks(ticker);
CREATE INDEX IF NOT EXISTS idx_adjustments_strategy ON strategy_adjustments(strategy_name, created_at);
CREATE INDEX IF NOT EXISTS idx_audit_created ON audit_log(created_at)
"#;

/// Column additions applied after the initial table layout.
/// "duplicate column name" errors are tolerated so these can run on every start.
pub const MIGRATIONS: &[&str] = &[
    "ALTER TABLE strategies ADD COLUMN advisory TEXT",
    "ALTER TABLE watchlist ADD COLUMN name TEXT",
];
