//! Input, configuration, and output types for the backtest engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How the stake for each accepted bet is sized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StakingMode {
    /// Constant stake amount per bet.
    Flat,
    /// Alias of `Flat` kept for configuration compatibility.
    FixedAmount,
    /// `bankroll * fraction`, capped by `max_fraction_per_bet`.
    FixedFraction,
    /// Kelly criterion fraction, clamped to `[0, kelly_cap]`.
    Kelly,
}

/// Backtest configuration: bankroll, staking mode, and bet filters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StakingConfig {
    /// Starting bankroll.
    pub initial_bankroll: f64,

    pub mode: StakingMode,

    /// Stake amount for `Flat`/`FixedAmount` (and the Kelly fallback).
    pub flat_stake: f64,

    /// Bankroll fraction wagered under `FixedFraction`.
    pub fraction: f64,

    /// Upper bound on the Kelly fraction (e.g. 0.25 = quarter bankroll).
    pub kelly_cap: f64,

    /// Hard per-bet cap as a fraction of the current bankroll.
    pub max_fraction_per_bet: f64,

    /// Candidates below this confidence are skipped, when set.
    pub min_confidence: Option<f64>,

    /// Skip candidates whose expected value per unit stake is not positive.
    pub require_positive_ev: bool,
}

impl Default for StakingConfig {
    fn default() -> Self {
        Self {
            initial_bankroll: 1_000.0,
            mode: StakingMode::Flat,
            flat_stake: 100.0,
            fraction: 0.02,
            kelly_cap: 0.25,
            max_fraction_per_bet: 0.10,
            min_confidence: None,
            require_positive_ev: true,
        }
    }
}

/// One potential bet presented to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetCandidate {
    /// Event timestamp; candidates are processed in this order.
    pub event_time: DateTime<Utc>,

    /// Calibrated win probability.
    pub probability: f64,

    /// Decimal odds (> 1).
    pub odds: f64,

    /// Model confidence in the prediction, if available.
    pub confidence: Option<f64>,

    /// Market line; when present, a win means `actual > line`.
    pub line: Option<f64>,

    /// Model point-estimate, the fallback comparison when no line exists.
    pub prediction: Option<f64>,

    /// Realized outcome value; `None` means the event is still pending.
    pub actual: Option<f64>,
}

/// Append-only ledger entry, one per accepted bet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetRecord {
    pub event_time: DateTime<Utc>,
    pub probability: f64,
    pub odds: f64,
    pub stake: f64,
    pub won: bool,
    pub profit: f64,
    pub bankroll_after: f64,
}

/// One point of the bankroll trajectory.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BankrollPoint {
    pub timestamp: DateTime<Utc>,
    pub balance: f64,
}

/// Candidates the engine declined, broken down by reason.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipCounts {
    /// No realized outcome yet.
    pub pending: usize,
    /// Expected value per unit stake was not positive.
    pub negative_ev: usize,
    /// Confidence below the configured minimum.
    pub low_confidence: usize,
    /// Computed stake was non-positive (e.g. exhausted bankroll).
    pub zero_stake: usize,
    /// Resolved outcome but neither a line nor a prediction to settle against.
    pub unresolvable: usize,
}

impl SkipCounts {
    pub fn total(&self) -> usize {
        self.pending + self.negative_ev + self.low_confidence + self.zero_stake + self.unresolvable
    }
}

/// Aggregate statistics of one backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestSummary {
    pub initial_bankroll: f64,
    pub final_bankroll: f64,
    pub total_bets: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_rate: f64,
    pub roi: f64,
    pub sharpe: f64,
    pub max_drawdown: f64,
    /// Compound annual growth rate; `None` when elapsed time is zero or the
    /// bankroll ratio is non-positive.
    pub cagr: Option<f64>,
}

/// Everything a backtest run produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    pub summary: BacktestSummary,
    /// Per-bet ledger, in processing order.
    pub bets: Vec<BetRecord>,
    /// Balance after each accepted bet, one point per ledger entry; the
    /// initial bankroll lives in the summary, not the curve.
    pub bankroll_curve: Vec<BankrollPoint>,
    pub skipped: SkipCounts,
}
