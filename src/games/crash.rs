//! Crash round state and payout rule
//!
//! A crash point is drawn when the round opens: with a configured
//! probability it lands in the early band, otherwise on a low-skewed curve
//! up to the ceiling. The multiplier starts at 1.0 and rises by a bounded
//! random increment per tick, clamped at the crash point. Cashing out pays
//! wager x multiplier; detonation or expiry pays nothing.

use super::{GamePayload, PayoutRule, ResultDetail, ResultTag, RuleOutcome};
use crate::config::CrashConfig;
use crate::session::ResolveTrigger;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrashRound {
    pub crash_point: f64,
    pub multiplier: f64,
}

impl CrashRound {
    pub fn start(config: &CrashConfig, rng: &mut impl Rng) -> Self {
        Self {
            crash_point: draw_crash_point(config, rng),
            multiplier: 1.0,
        }
    }

    /// Advance one tick; returns true once the curve hits the crash point
    pub fn advance(&mut self, config: &CrashConfig, rng: &mut impl Rng) -> bool {
        if self.detonated() {
            return true;
        }
        let increment = rng.gen_range(0.01..=config.tick_increment_max);
        self.multiplier += increment;
        if self.multiplier >= self.crash_point {
            self.multiplier = self.crash_point;
            return true;
        }
        false
    }

    pub fn detonated(&self) -> bool {
        self.multiplier >= self.crash_point
    }

    /// Total return at the current multiplier, floored to whole credits
    pub fn payout_at_current(&self, wager: u64) -> u64 {
        (wager as f64 * self.multiplier).floor() as u64
    }
}

/// Skewed draw: a fixed probability of the early band, otherwise a squared
/// uniform over the remaining range so low multipliers dominate
pub fn draw_crash_point(config: &CrashConfig, rng: &mut impl Rng) -> f64 {
    if rng.gen_bool(config.early_crash_probability) {
        rng.gen_range(1.0..config.early_crash_ceiling)
    } else {
        let skew: f64 = rng.gen_range(0.0..1.0);
        1.0 + (config.max_multiplier - 1.0) * skew * skew
    }
}

pub struct CrashRule;

impl PayoutRule for CrashRule {
    fn settle(&self, payload: &mut GamePayload, trigger: ResolveTrigger, wager: u64) -> RuleOutcome {
        let round = match payload {
            GamePayload::Crash(round) => round,
            _ => {
                return RuleOutcome {
                    tag: ResultTag::Crashed,
                    payout: 0,
                    detail: ResultDetail::Crash {
                        multiplier: 0.0,
                        crash_point: 0.0,
                    },
                }
            }
        };

        let (tag, payout) = match trigger {
            ResolveTrigger::Action => {
                (ResultTag::CashedOut, round.payout_at_current(wager))
            }
            // detonation and deadline both keep the wager
            ResolveTrigger::Expiry | ResolveTrigger::Cancel => (ResultTag::Crashed, 0),
        };

        RuleOutcome {
            tag,
            payout,
            detail: ResultDetail::Crash {
                multiplier: round.multiplier,
                crash_point: round.crash_point,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config() -> CrashConfig {
        CrashConfig::default()
    }

    #[test]
    fn test_crash_point_stays_in_bounds() {
        let config = config();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1_000 {
            let point = draw_crash_point(&config, &mut rng);
            assert!(point >= 1.0);
            assert!(point <= config.max_multiplier);
        }
    }

    #[test]
    fn test_early_band_respected_when_certain() {
        let config = CrashConfig {
            early_crash_probability: 1.0,
            ..CrashConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let point = draw_crash_point(&config, &mut rng);
            assert!(point < config.early_crash_ceiling);
        }
    }

    #[test]
    fn test_advance_clamps_at_crash_point() {
        let config = config();
        let mut rng = StdRng::seed_from_u64(1);
        let mut round = CrashRound {
            crash_point: 1.3,
            multiplier: 1.0,
        };
        let mut ticks = 0;
        while !round.advance(&config, &mut rng) {
            ticks += 1;
            assert!(ticks < 1_000, "round never detonated");
        }
        assert_eq!(round.multiplier, 1.3);
        assert!(round.detonated());
    }

    #[test]
    fn test_cashout_pays_wager_times_multiplier() {
        let mut payload = GamePayload::Crash(CrashRound {
            crash_point: 5.0,
            multiplier: 2.0,
        });
        let outcome = CrashRule.settle(&mut payload, ResolveTrigger::Action, 100);
        assert_eq!(outcome.tag, ResultTag::CashedOut);
        assert_eq!(outcome.payout, 200);
    }

    #[test]
    fn test_cashout_floors_fractional_credits() {
        let mut payload = GamePayload::Crash(CrashRound {
            crash_point: 5.0,
            multiplier: 1.57,
        });
        let outcome = CrashRule.settle(&mut payload, ResolveTrigger::Action, 100);
        assert_eq!(outcome.payout, 157);

        let mut payload = GamePayload::Crash(CrashRound {
            crash_point: 5.0,
            multiplier: 1.999,
        });
        let outcome = CrashRule.settle(&mut payload, ResolveTrigger::Action, 10);
        assert_eq!(outcome.payout, 19);
    }

    #[test]
    fn test_detonation_keeps_the_wager() {
        let mut payload = GamePayload::Crash(CrashRound {
            crash_point: 1.4,
            multiplier: 1.4,
        });
        let outcome = CrashRule.settle(&mut payload, ResolveTrigger::Expiry, 100);
        assert_eq!(outcome.tag, ResultTag::Crashed);
        assert_eq!(outcome.payout, 0);
    }
}
