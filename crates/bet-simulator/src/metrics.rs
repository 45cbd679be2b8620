//! Risk and performance statistics derived from a backtest ledger.

use crate::models::{BacktestSummary, BetRecord};

const SECONDS_PER_YEAR: f64 = 365.25 * 86_400.0;

/// Summarize a ledger into the standard performance record.
pub fn summarize(initial_bankroll: f64, bets: &[BetRecord]) -> BacktestSummary {
    let final_bankroll = bets
        .last()
        .map(|b| b.bankroll_after)
        .unwrap_or(initial_bankroll);

    let total_bets = bets.len();
    let wins = bets.iter().filter(|b| b.won).count();
    let losses = total_bets - wins;
    let win_rate = if total_bets > 0 {
        wins as f64 / total_bets as f64
    } else {
        0.0
    };

    let returns: Vec<f64> = bets.iter().map(|b| b.profit / b.stake).collect();

    let balances: Vec<f64> = std::iter::once(initial_bankroll)
        .chain(bets.iter().map(|b| b.bankroll_after))
        .collect();

    BacktestSummary {
        initial_bankroll,
        final_bankroll,
        total_bets,
        wins,
        losses,
        win_rate,
        roi: (final_bankroll - initial_bankroll) / initial_bankroll,
        sharpe: sharpe_ratio(&returns),
        max_drawdown: max_drawdown(&balances),
        cagr: cagr(initial_bankroll, final_bankroll, bets),
    }
}

/// Largest peak-to-trough decline, as a fraction of the running peak.
pub fn max_drawdown(balances: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst: f64 = 0.0;
    for &balance in balances {
        if balance > peak {
            peak = balance;
        }
        if peak > 0.0 {
            worst = worst.max((peak - balance) / peak);
        }
    }
    worst
}

/// Mean of per-bet returns over their sample standard deviation.
///
/// Raw mean/std of the realized return series: no annualization and no
/// risk-free-rate subtraction. Zero when the series has fewer than two
/// points or zero variance.
pub fn sharpe_ratio(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean) * (r - mean)).sum::<f64>() / (n - 1.0);
    // Identical returns can leave a tiny positive variance from rounding in
    // the mean, so the zero check is relative to the mean's magnitude.
    if variance <= f64::EPSILON * mean * mean {
        return 0.0;
    }
    mean / variance.sqrt()
}

/// Compound annual growth rate over the ledger's time span.
///
/// `None` when the span is zero (fewer than two distinct timestamps) or the
/// bankroll ratio is non-positive.
fn cagr(initial_bankroll: f64, final_bankroll: f64, bets: &[BetRecord]) -> Option<f64> {
    let first = bets.first()?.event_time;
    let last = bets.last()?.event_time;
    let years = (last - first).num_seconds() as f64 / SECONDS_PER_YEAR;
    if years <= 0.0 {
        return None;
    }

    let ratio = final_bankroll / initial_bankroll;
    if ratio <= 0.0 {
        return None;
    }
    Some(ratio.powf(1.0 / years) - 1.0)
}
