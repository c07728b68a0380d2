//! Game payloads and payout rules
//!
//! Each session kind carries its own strongly-typed payload in the
//! `GamePayload` union and settles through the `PayoutRule` strategy bound
//! to that kind. Rules are pure: every random draw happens when the payload
//! is created or advanced, never during settlement.

pub mod blackjack;
pub mod crash;
pub mod life;
pub mod odds;
pub mod trivia;

pub use blackjack::{hand_value, BlackjackTable, Card};
pub use crash::CrashRound;
pub use life::LifeGrid;
pub use odds::{CoinSide, RouletteBet, SlotSymbol, WheelColor};
pub use trivia::{AnswerVerdict, PendingPrompt, PendingPrompts, TriviaRound};

use crate::session::{ResolveTrigger, SessionKind};
use serde::{Deserialize, Serialize};

/// Kind-specific session data (discriminated union)
#[derive(Debug, Clone)]
pub enum GamePayload {
    Blackjack(BlackjackTable),
    Crash(CrashRound),
    Roulette { bet: RouletteBet, spun: u8 },
    Dice { called: u8, rolled: u8 },
    Slots { reels: [SlotSymbol; 3] },
    Coinflip { call: CoinSide, landed: CoinSide },
    Trivia(TriviaRound),
    Life(LifeGrid),
}

impl GamePayload {
    pub fn kind(&self) -> SessionKind {
        match self {
            GamePayload::Blackjack(_) => SessionKind::Blackjack,
            GamePayload::Crash(_) => SessionKind::Crash,
            GamePayload::Roulette { .. } => SessionKind::Roulette,
            GamePayload::Dice { .. } => SessionKind::Dice,
            GamePayload::Slots { .. } => SessionKind::Slots,
            GamePayload::Coinflip { .. } => SessionKind::Coinflip,
            GamePayload::Trivia(_) => SessionKind::Trivia,
            GamePayload::Life(_) => SessionKind::LifeSim,
        }
    }
}

/// Terminal outcome classification carried on the result descriptor
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResultTag {
    /// Natural 21, pays 3:2
    Blackjack,
    Win,
    DealerBust,
    Push,
    Lose,
    Bust,
    CashedOut,
    Crashed,
    TimedOut,
    Cancelled,
    /// Session abandoned; wager returned
    Refunded,
    /// Simulation ended
    Ended,
}

/// Narrative fields for the front end to render
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "game", rename_all = "lowercase")]
pub enum ResultDetail {
    Blackjack {
        player: Vec<Card>,
        dealer: Vec<Card>,
        player_value: u8,
        dealer_value: u8,
    },
    Crash {
        multiplier: f64,
        crash_point: f64,
    },
    Roulette {
        bet: RouletteBet,
        spun: u8,
        color: WheelColor,
    },
    Dice {
        called: u8,
        rolled: u8,
    },
    Slots {
        reels: [SlotSymbol; 3],
    },
    Coinflip {
        call: CoinSide,
        landed: CoinSide,
    },
    Trivia {
        question: String,
        answer_display: String,
        winners: Vec<String>,
    },
    Life {
        generations: u64,
        population: usize,
    },
}

/// What a rule decided: classification, total credit due, render fields
#[derive(Debug, Clone)]
pub struct RuleOutcome {
    pub tag: ResultTag,
    /// Total amount to credit back (stake included where the rule returns it)
    pub payout: u64,
    pub detail: ResultDetail,
}

/// Pure settlement strategy, one per session kind
pub trait PayoutRule: Send + Sync {
    fn settle(&self, payload: &mut GamePayload, trigger: ResolveTrigger, wager: u64) -> RuleOutcome;
}

/// Look up the strategy bound to a kind
pub fn rule_for(kind: SessionKind) -> &'static dyn PayoutRule {
    match kind {
        SessionKind::Blackjack => &blackjack::BlackjackRule,
        SessionKind::Crash => &crash::CrashRule,
        SessionKind::Roulette | SessionKind::Dice | SessionKind::Slots | SessionKind::Coinflip => {
            &odds::FixedOddsRule
        }
        SessionKind::Trivia => &trivia::TriviaRule,
        SessionKind::LifeSim => &life::LifeRule,
    }
}
