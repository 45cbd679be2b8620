pub mod engine;
pub mod metrics;
pub mod models;

pub use engine::BacktestEngine;
pub use metrics::{max_drawdown, sharpe_ratio, summarize};
pub use models::{
    BacktestResult, BacktestSummary, BankrollPoint, BetCandidate, BetRecord, SkipCounts,
    StakingConfig, StakingMode,
};
