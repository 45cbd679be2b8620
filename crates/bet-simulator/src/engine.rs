//! Sequential bankroll simulation over an ordered bet-candidate stream.
//!
//! The engine is deliberately single-threaded: each stake can depend on the
//! bankroll left by every previous bet, so processing order is part of the
//! semantics. A run is a pure function of (candidates, configuration).

use anyhow::{bail, Result};
use tracing::debug;

use crate::metrics::summarize;
use crate::models::{
    BacktestResult, BankrollPoint, BetCandidate, BetRecord, SkipCounts, StakingConfig, StakingMode,
};

pub struct BacktestEngine {
    config: StakingConfig,
}

impl BacktestEngine {
    pub fn new(config: StakingConfig) -> Result<Self> {
        if config.initial_bankroll <= 0.0 {
            bail!("initial_bankroll must be positive");
        }
        if config.flat_stake <= 0.0 {
            bail!("flat_stake must be positive");
        }
        if config.fraction <= 0.0 || config.fraction > 1.0 {
            bail!("fraction must be between 0 and 1");
        }
        if config.kelly_cap <= 0.0 || config.kelly_cap > 1.0 {
            bail!("kelly_cap must be between 0 and 1");
        }
        if config.max_fraction_per_bet <= 0.0 || config.max_fraction_per_bet > 1.0 {
            bail!("max_fraction_per_bet must be between 0 and 1");
        }

        Ok(Self { config })
    }

    pub fn config(&self) -> &StakingConfig {
        &self.config
    }

    /// Simulate the candidate stream and return the ledger, trajectory, and
    /// summary statistics.
    ///
    /// Candidates are stable-sorted by event time first, so same-timestamp
    /// entries settle in input order.
    pub fn run(&self, candidates: &[BetCandidate]) -> BacktestResult {
        let mut ordered: Vec<&BetCandidate> = candidates.iter().collect();
        ordered.sort_by_key(|c| c.event_time);

        let mut bankroll = self.config.initial_bankroll;
        let mut bets: Vec<BetRecord> = Vec::new();
        let mut curve: Vec<BankrollPoint> = Vec::new();
        let mut skipped = SkipCounts::default();

        for candidate in ordered {
            let Some(actual) = candidate.actual else {
                skipped.pending += 1;
                continue;
            };

            let p = candidate.probability;
            let ev = p * (candidate.odds - 1.0) - (1.0 - p);
            if self.config.require_positive_ev && ev <= 0.0 {
                skipped.negative_ev += 1;
                continue;
            }

            if let (Some(min), Some(confidence)) = (self.config.min_confidence, candidate.confidence)
            {
                if confidence < min {
                    skipped.low_confidence += 1;
                    continue;
                }
            }

            let stake = self.stake_for(bankroll, candidate);
            if stake <= 0.0 {
                skipped.zero_stake += 1;
                continue;
            }

            let won = match (candidate.line, candidate.prediction) {
                (Some(line), _) => actual > line,
                (None, Some(prediction)) => actual > prediction,
                (None, None) => {
                    skipped.unresolvable += 1;
                    continue;
                }
            };

            let profit = if won {
                stake * (candidate.odds - 1.0)
            } else {
                -stake
            };
            bankroll += profit;

            bets.push(BetRecord {
                event_time: candidate.event_time,
                probability: p,
                odds: candidate.odds,
                stake,
                won,
                profit,
                bankroll_after: bankroll,
            });
            curve.push(BankrollPoint {
                timestamp: candidate.event_time,
                balance: bankroll,
            });
        }

        debug!(
            placed = bets.len(),
            skipped = skipped.total(),
            final_bankroll = bankroll,
            "backtest complete"
        );

        let summary = summarize(self.config.initial_bankroll, &bets);
        BacktestResult {
            summary,
            bets,
            bankroll_curve: curve,
            skipped,
        }
    }

    /// Stake for one candidate under the configured mode, clamped to
    /// `[0, bankroll]`.
    fn stake_for(&self, bankroll: f64, candidate: &BetCandidate) -> f64 {
        let stake = match self.config.mode {
            StakingMode::Flat | StakingMode::FixedAmount => self.config.flat_stake,
            StakingMode::FixedFraction => {
                let fraction = self.config.fraction.min(self.config.max_fraction_per_bet);
                bankroll * fraction
            }
            StakingMode::Kelly => {
                let b = candidate.odds - 1.0;
                if b <= 0.0 {
                    self.config.flat_stake
                } else {
                    let p = candidate.probability;
                    let f = ((b * p - (1.0 - p)) / b).clamp(0.0, self.config.kelly_cap);
                    bankroll * f
                }
            }
        };
        stake.clamp(0.0, bankroll.max(0.0))
    }
}
