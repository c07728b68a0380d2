//! Fixed-odds instant games: roulette, dice, slots, coinflip
//!
//! Payout tables are total-return multipliers keyed by bet type and spin
//! outcome. All draws happen when the session opens; settlement only reads
//! the recorded payload.

use super::{GamePayload, PayoutRule, ResultDetail, ResultTag, RuleOutcome};
use crate::session::ResolveTrigger;
use once_cell::sync::Lazy;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

pub static RED_NUMBERS: Lazy<HashSet<u8>> = Lazy::new(|| {
    [
        1, 3, 5, 7, 9, 12, 14, 16, 18, 19, 21, 23, 25, 27, 30, 32, 34, 36,
    ]
    .into_iter()
    .collect()
});

pub static BLACK_NUMBERS: Lazy<HashSet<u8>> = Lazy::new(|| {
    [
        2, 4, 6, 8, 10, 11, 13, 15, 17, 20, 22, 24, 26, 28, 29, 31, 33, 35,
    ]
    .into_iter()
    .collect()
});

/// Roulette bet types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RouletteBet {
    Red,
    Black,
    Odd,
    Even,
    Number(u8),
}

impl RouletteBet {
    /// Parse a user-supplied bet string; numbers must be 0-36
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "red" => Some(RouletteBet::Red),
            "black" => Some(RouletteBet::Black),
            "odd" => Some(RouletteBet::Odd),
            "even" => Some(RouletteBet::Even),
            other => {
                let n: u8 = other.parse().ok()?;
                if n <= 36 {
                    Some(RouletteBet::Number(n))
                } else {
                    None
                }
            }
        }
    }
}

impl fmt::Display for RouletteBet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouletteBet::Red => write!(f, "red"),
            RouletteBet::Black => write!(f, "black"),
            RouletteBet::Odd => write!(f, "odd"),
            RouletteBet::Even => write!(f, "even"),
            RouletteBet::Number(n) => write!(f, "{}", n),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WheelColor {
    Green,
    Red,
    Black,
}

impl fmt::Display for WheelColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WheelColor::Green => write!(f, "green"),
            WheelColor::Red => write!(f, "red"),
            WheelColor::Black => write!(f, "black"),
        }
    }
}

pub fn spin_wheel(rng: &mut impl Rng) -> u8 {
    rng.gen_range(0..=36)
}

pub fn color_of(pocket: u8) -> WheelColor {
    if pocket == 0 {
        WheelColor::Green
    } else if RED_NUMBERS.contains(&pocket) {
        WheelColor::Red
    } else {
        WheelColor::Black
    }
}

/// Total return for a roulette bet: straight numbers pay 36x (35:1 plus
/// stake), outside bets pay 2x, zero beats every outside bet
pub fn roulette_payout(bet: RouletteBet, spun: u8, wager: u64) -> u64 {
    let won = match bet {
        RouletteBet::Red => RED_NUMBERS.contains(&spun),
        RouletteBet::Black => BLACK_NUMBERS.contains(&spun),
        RouletteBet::Odd => spun > 0 && spun % 2 == 1,
        RouletteBet::Even => spun > 0 && spun % 2 == 0,
        RouletteBet::Number(n) => n == spun,
    };
    if !won {
        return 0;
    }
    match bet {
        RouletteBet::Number(_) => wager * 36,
        _ => wager * 2,
    }
}

/// Coin side for flips
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CoinSide {
    Heads,
    Tails,
}

impl fmt::Display for CoinSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoinSide::Heads => write!(f, "heads"),
            CoinSide::Tails => write!(f, "tails"),
        }
    }
}

pub fn flip_coin(rng: &mut impl Rng) -> CoinSide {
    if rng.gen_bool(0.5) {
        CoinSide::Heads
    } else {
        CoinSide::Tails
    }
}

pub fn roll_die(rng: &mut impl Rng) -> u8 {
    rng.gen_range(1..=6)
}

/// Slot symbols with their draw weight and triple-match multiplier
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SlotSymbol {
    Cherry,
    Lemon,
    Orange,
    Grape,
    Diamond,
    Seven,
}

impl fmt::Display for SlotSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let emoji = match self {
            SlotSymbol::Cherry => "🍒",
            SlotSymbol::Lemon => "🍋",
            SlotSymbol::Orange => "🍊",
            SlotSymbol::Grape => "🍇",
            SlotSymbol::Diamond => "💎",
            SlotSymbol::Seven => "7️⃣",
        };
        write!(f, "{}", emoji)
    }
}

/// (symbol, weight, triple multiplier)
pub static SLOT_PAYTABLE: Lazy<Vec<(SlotSymbol, u32, u64)>> = Lazy::new(|| {
    vec![
        (SlotSymbol::Cherry, 35, 2),
        (SlotSymbol::Lemon, 30, 3),
        (SlotSymbol::Orange, 20, 5),
        (SlotSymbol::Grape, 10, 10),
        (SlotSymbol::Diamond, 4, 25),
        (SlotSymbol::Seven, 1, 100),
    ]
});

pub fn spin_reels(rng: &mut impl Rng) -> [SlotSymbol; 3] {
    let total_weight: u32 = SLOT_PAYTABLE.iter().map(|(_, w, _)| w).sum();
    let mut reels = [SlotSymbol::Cherry; 3];
    for reel in reels.iter_mut() {
        let mut roll = rng.gen_range(0..total_weight);
        for (symbol, weight, _) in SLOT_PAYTABLE.iter() {
            if roll < *weight {
                *reel = *symbol;
                break;
            }
            roll -= weight;
        }
    }
    reels
}

fn triple_multiplier(symbol: SlotSymbol) -> u64 {
    SLOT_PAYTABLE
        .iter()
        .find(|(s, _, _)| *s == symbol)
        .map(|(_, _, m)| *m)
        .unwrap_or(0)
}

/// Total return: three of a kind pays the symbol multiplier, any two
/// matching pays 1.5x (floored), otherwise nothing
pub fn slots_payout(reels: &[SlotSymbol; 3], wager: u64) -> u64 {
    if reels[0] == reels[1] && reels[1] == reels[2] {
        wager * triple_multiplier(reels[0])
    } else if reels[0] == reels[1] || reels[1] == reels[2] || reels[0] == reels[2] {
        wager * 3 / 2
    } else {
        0
    }
}

pub struct FixedOddsRule;

impl PayoutRule for FixedOddsRule {
    fn settle(&self, payload: &mut GamePayload, _trigger: ResolveTrigger, wager: u64) -> RuleOutcome {
        match payload {
            GamePayload::Roulette { bet, spun } => {
                let payout = roulette_payout(*bet, *spun, wager);
                RuleOutcome {
                    tag: if payout > 0 {
                        ResultTag::Win
                    } else {
                        ResultTag::Lose
                    },
                    payout,
                    detail: ResultDetail::Roulette {
                        bet: *bet,
                        spun: *spun,
                        color: color_of(*spun),
                    },
                }
            }
            GamePayload::Dice { called, rolled } => {
                let payout = if called == rolled { wager * 6 } else { 0 };
                RuleOutcome {
                    tag: if payout > 0 {
                        ResultTag::Win
                    } else {
                        ResultTag::Lose
                    },
                    payout,
                    detail: ResultDetail::Dice {
                        called: *called,
                        rolled: *rolled,
                    },
                }
            }
            GamePayload::Slots { reels } => {
                let payout = slots_payout(reels, wager);
                RuleOutcome {
                    tag: if payout > 0 {
                        ResultTag::Win
                    } else {
                        ResultTag::Lose
                    },
                    payout,
                    detail: ResultDetail::Slots { reels: *reels },
                }
            }
            GamePayload::Coinflip { call, landed } => {
                let payout = if call == landed { wager * 2 } else { 0 };
                RuleOutcome {
                    tag: if payout > 0 {
                        ResultTag::Win
                    } else {
                        ResultTag::Lose
                    },
                    payout,
                    detail: ResultDetail::Coinflip {
                        call: *call,
                        landed: *landed,
                    },
                }
            }
            _ => RuleOutcome {
                tag: ResultTag::Lose,
                payout: 0,
                detail: ResultDetail::Dice {
                    called: 0,
                    rolled: 0,
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bet_parsing() {
        assert_eq!(RouletteBet::parse("RED"), Some(RouletteBet::Red));
        assert_eq!(RouletteBet::parse(" even "), Some(RouletteBet::Even));
        assert_eq!(RouletteBet::parse("17"), Some(RouletteBet::Number(17)));
        assert_eq!(RouletteBet::parse("0"), Some(RouletteBet::Number(0)));
        assert_eq!(RouletteBet::parse("37"), None);
        assert_eq!(RouletteBet::parse("banana"), None);
    }

    #[test]
    fn test_wheel_colors_partition() {
        assert_eq!(color_of(0), WheelColor::Green);
        assert_eq!(color_of(1), WheelColor::Red);
        assert_eq!(color_of(2), WheelColor::Black);
        let colored = RED_NUMBERS.len() + BLACK_NUMBERS.len();
        assert_eq!(colored, 36);
        assert!(RED_NUMBERS.is_disjoint(&BLACK_NUMBERS));
    }

    #[test]
    fn test_straight_number_pays_thirty_six() {
        assert_eq!(
            roulette_payout(RouletteBet::Number(17), 17, 10),
            360
        );
        assert_eq!(roulette_payout(RouletteBet::Number(17), 18, 10), 0);
    }

    #[test]
    fn test_outside_bets_pay_even_money() {
        assert_eq!(roulette_payout(RouletteBet::Red, 1, 10), 20);
        assert_eq!(roulette_payout(RouletteBet::Black, 2, 10), 20);
        assert_eq!(roulette_payout(RouletteBet::Odd, 3, 10), 20);
        assert_eq!(roulette_payout(RouletteBet::Even, 4, 10), 20);
    }

    #[test]
    fn test_zero_beats_outside_bets() {
        assert_eq!(roulette_payout(RouletteBet::Red, 0, 10), 0);
        assert_eq!(roulette_payout(RouletteBet::Even, 0, 10), 0);
        assert_eq!(roulette_payout(RouletteBet::Odd, 0, 10), 0);
        assert_eq!(roulette_payout(RouletteBet::Number(0), 0, 10), 360);
    }

    #[test]
    fn test_slots_triples_and_pairs() {
        let triple = [SlotSymbol::Seven, SlotSymbol::Seven, SlotSymbol::Seven];
        assert_eq!(slots_payout(&triple, 10), 1_000);

        let pair = [SlotSymbol::Cherry, SlotSymbol::Lemon, SlotSymbol::Cherry];
        assert_eq!(slots_payout(&pair, 10), 15);
        // floor on odd wagers
        assert_eq!(slots_payout(&pair, 5), 7);

        let nothing = [SlotSymbol::Cherry, SlotSymbol::Lemon, SlotSymbol::Grape];
        assert_eq!(slots_payout(&nothing, 10), 0);
    }

    #[test]
    fn test_dice_and_coinflip_rules() {
        let mut payload = GamePayload::Dice {
            called: 3,
            rolled: 3,
        };
        let outcome = FixedOddsRule.settle(&mut payload, ResolveTrigger::Action, 10);
        assert_eq!(outcome.payout, 60);

        let mut payload = GamePayload::Coinflip {
            call: CoinSide::Heads,
            landed: CoinSide::Tails,
        };
        let outcome = FixedOddsRule.settle(&mut payload, ResolveTrigger::Action, 10);
        assert_eq!(outcome.tag, ResultTag::Lose);
        assert_eq!(outcome.payout, 0);
    }

    #[test]
    fn test_spin_reels_draws_from_table() {
        let mut rng = rand::thread_rng();
        for _ in 0..100 {
            let reels = spin_reels(&mut rng);
            for symbol in reels {
                assert!(SLOT_PAYTABLE.iter().any(|(s, _, _)| *s == symbol));
            }
        }
    }

    #[test]
    fn test_spin_wheel_in_range() {
        let mut rng = rand::thread_rng();
        for _ in 0..100 {
            assert!(spin_wheel(&mut rng) <= 36);
        }
    }
}
