//! Blackjack table state and payout rule
//!
//! Standard hand values: faces count 10, aces 11 reduced to 1 per ace while
//! the total busts. Dealer draws while under 17. Natural 21 pays 3:2 unless
//! both sides hold one (push). Expiry refunds the wager (abandoned game).

use super::{GamePayload, PayoutRule, ResultDetail, ResultTag, RuleOutcome};
use crate::session::ResolveTrigger;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

const DEALER_STAND: u8 = 17;
const BLACKJACK: u8 = 21;

/// One card, 0..52. Rank index = card % 13: 0..=8 are 2..10, then J, Q, K, A.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card(pub u8);

impl Card {
    pub fn rank_index(&self) -> u8 {
        self.0 % 13
    }

    pub fn is_ace(&self) -> bool {
        self.rank_index() == 12
    }

    /// Blackjack value before ace reduction
    pub fn value(&self) -> u8 {
        match self.rank_index() {
            r @ 0..=8 => r + 2,
            9 | 10 | 11 => 10,
            _ => 11,
        }
    }

    pub fn rank_label(&self) -> &'static str {
        match self.rank_index() {
            0 => "2",
            1 => "3",
            2 => "4",
            3 => "5",
            4 => "6",
            5 => "7",
            6 => "8",
            7 => "9",
            8 => "10",
            9 => "J",
            10 => "Q",
            11 => "K",
            _ => "A",
        }
    }

    pub fn suit_label(&self) -> &'static str {
        match self.0 / 13 {
            0 => "♠",
            1 => "♥",
            2 => "♦",
            _ => "♣",
        }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank_label(), self.suit_label())
    }
}

/// Total hand value, reducing aces from 11 to 1 while the hand busts
pub fn hand_value(cards: &[Card]) -> u8 {
    let mut value: u16 = cards.iter().map(|c| c.value() as u16).sum();
    let mut aces = cards.iter().filter(|c| c.is_ace()).count();
    while value > BLACKJACK as u16 && aces > 0 {
        value -= 10;
        aces -= 1;
    }
    value as u8
}

/// Shuffled 52-card deck
pub fn fresh_deck(rng: &mut impl Rng) -> Vec<Card> {
    let mut deck: Vec<Card> = (0..52).map(Card).collect();
    deck.shuffle(rng);
    deck
}

#[derive(Debug, Clone)]
pub struct BlackjackTable {
    pub deck: Vec<Card>,
    pub player: Vec<Card>,
    pub dealer: Vec<Card>,
}

impl BlackjackTable {
    /// Deal two cards each from a fresh shuffled deck
    pub fn deal(rng: &mut impl Rng) -> Self {
        let mut deck = fresh_deck(rng);
        let player = vec![deck.pop().unwrap_or(Card(0)), deck.pop().unwrap_or(Card(1))];
        let dealer = vec![deck.pop().unwrap_or(Card(2)), deck.pop().unwrap_or(Card(3))];
        Self {
            deck,
            player,
            dealer,
        }
    }

    pub fn player_value(&self) -> u8 {
        hand_value(&self.player)
    }

    pub fn dealer_value(&self) -> u8 {
        hand_value(&self.dealer)
    }

    pub fn player_busted(&self) -> bool {
        self.player_value() > BLACKJACK
    }

    /// Natural: 21 on the opening two cards
    pub fn player_has_natural(&self) -> bool {
        self.player.len() == 2 && self.player_value() == BLACKJACK
    }

    pub fn dealer_has_natural(&self) -> bool {
        self.dealer.len() == 2 && self.dealer_value() == BLACKJACK
    }

    /// Player draws one card
    pub fn hit(&mut self) -> Option<Card> {
        let card = self.deck.pop()?;
        self.player.push(card);
        Some(card)
    }

    /// Dealer draws while under 17
    pub fn dealer_play(&mut self) {
        while self.dealer_value() < DEALER_STAND {
            match self.deck.pop() {
                Some(card) => self.dealer.push(card),
                None => break,
            }
        }
    }
}

/// Classify the stand outcome and total return after the dealer has played
fn compare_hands(table: &BlackjackTable, wager: u64) -> (ResultTag, u64) {
    let player = table.player_value();
    let dealer = table.dealer_value();

    if table.player_has_natural() {
        return if table.dealer_has_natural() {
            (ResultTag::Push, wager)
        } else {
            // 3:2 on the wager, stake returned
            (ResultTag::Blackjack, wager * 5 / 2)
        };
    }

    if dealer > BLACKJACK {
        (ResultTag::DealerBust, wager * 2)
    } else if player > dealer {
        (ResultTag::Win, wager * 2)
    } else if player < dealer {
        (ResultTag::Lose, 0)
    } else {
        (ResultTag::Push, wager)
    }
}

pub struct BlackjackRule;

impl PayoutRule for BlackjackRule {
    fn settle(&self, payload: &mut GamePayload, trigger: ResolveTrigger, wager: u64) -> RuleOutcome {
        let table = match payload {
            GamePayload::Blackjack(table) => table,
            _ => {
                return RuleOutcome {
                    tag: ResultTag::Refunded,
                    payout: wager,
                    detail: ResultDetail::Blackjack {
                        player: Vec::new(),
                        dealer: Vec::new(),
                        player_value: 0,
                        dealer_value: 0,
                    },
                }
            }
        };

        let (tag, payout) = match trigger {
            // abandoned game, return the stake
            ResolveTrigger::Expiry | ResolveTrigger::Cancel => (ResultTag::Refunded, wager),
            ResolveTrigger::Action => {
                if table.player_busted() {
                    (ResultTag::Bust, 0)
                } else {
                    table.dealer_play();
                    compare_hands(table, wager)
                }
            }
        };

        RuleOutcome {
            tag,
            payout,
            detail: ResultDetail::Blackjack {
                player: table.player.clone(),
                dealer: table.dealer.clone(),
                player_value: table.player_value(),
                dealer_value: table.dealer_value(),
            },
        }
    }
}
