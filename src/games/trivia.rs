//! Trivia round state, answer handling, and pending prompts
//!
//! A trivia session stays open until its timer fires: every distinct
//! correct respondent is rewarded once, tracked in the payload, and the
//! asker is always ineligible. Cancellation by the asker reveals the
//! answer without further payouts.

use super::{GamePayload, PayoutRule, ResultDetail, ResultTag, RuleOutcome};
use crate::matcher;
use crate::session::ResolveTrigger;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriviaRound {
    pub asker: String,
    pub question: String,
    /// Accepted answers, already split and lowercased
    pub answers: Vec<String>,
    /// Original answer text, revealed when the round closes
    pub answer_display: String,
    pub xp: u64,
    pub credits: u64,
    /// Respondents already rewarded, in answer order
    pub correct: Vec<String>,
}

/// Classification of one submitted answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerVerdict {
    /// First correct answer from this respondent; reward them
    Correct,
    /// Correct again, but already rewarded
    AlreadyCounted,
    /// The asker may not answer their own question
    AskerIneligible,
    Incorrect,
}

impl TriviaRound {
    pub fn new(
        asker: &str,
        question: &str,
        answer_raw: &str,
        xp: u64,
        credits: u64,
    ) -> Option<Self> {
        let answers = matcher::split_answers(answer_raw);
        if answers.is_empty() {
            return None;
        }
        Some(Self {
            asker: asker.to_string(),
            question: question.to_string(),
            answers,
            answer_display: answer_raw.to_string(),
            xp,
            credits,
            correct: Vec::new(),
        })
    }

    /// Judge a submission and record first-time correct respondents
    pub fn submit(&mut self, respondent: &str, text: &str, threshold: f64) -> AnswerVerdict {
        if !matcher::is_match(text, &self.answers, threshold) {
            return AnswerVerdict::Incorrect;
        }
        if respondent == self.asker {
            return AnswerVerdict::AskerIneligible;
        }
        if self.correct.iter().any(|r| r == respondent) {
            return AnswerVerdict::AlreadyCounted;
        }
        self.correct.push(respondent.to_string());
        AnswerVerdict::Correct
    }
}

pub struct TriviaRule;

impl PayoutRule for TriviaRule {
    fn settle(&self, payload: &mut GamePayload, trigger: ResolveTrigger, _wager: u64) -> RuleOutcome {
        let round = match payload {
            GamePayload::Trivia(round) => round,
            _ => {
                return RuleOutcome {
                    tag: ResultTag::Cancelled,
                    payout: 0,
                    detail: ResultDetail::Trivia {
                        question: String::new(),
                        answer_display: String::new(),
                        winners: Vec::new(),
                    },
                }
            }
        };

        // respondents were paid as they answered; closing pays nobody new
        let tag = match trigger {
            ResolveTrigger::Cancel => ResultTag::Cancelled,
            _ => ResultTag::TimedOut,
        };

        RuleOutcome {
            tag,
            payout: 0,
            detail: ResultDetail::Trivia {
                question: round.question.clone(),
                answer_display: round.answer_display.clone(),
                winners: round.correct.clone(),
            },
        }
    }
}

/// A question posted without an answer, parked until the asker supplies one
#[derive(Debug, Clone)]
pub struct PendingPrompt {
    pub asker: String,
    /// Scope the finished question should open in
    pub scope: String,
    pub question: String,
}

/// Askers awaiting a reply that completes their question
pub struct PendingPrompts {
    prompts: DashMap<String, PendingPrompt>,
}

impl PendingPrompts {
    pub fn new() -> Self {
        Self {
            prompts: DashMap::new(),
        }
    }

    /// Park a question; replaces any earlier prompt from the same asker
    pub fn open(&self, asker: &str, scope: &str, question: &str) {
        self.prompts.insert(
            asker.to_string(),
            PendingPrompt {
                asker: asker.to_string(),
                scope: scope.to_string(),
                question: question.to_string(),
            },
        );
    }

    /// Claim the parked prompt so the completed question can be posted
    pub fn take(&self, asker: &str) -> Option<PendingPrompt> {
        self.prompts.remove(asker).map(|(_, prompt)| prompt)
    }

    /// Drop a parked prompt; absent askers are a no-op
    pub fn abandon(&self, asker: &str) -> bool {
        self.prompts.remove(asker).is_some()
    }

    pub fn pending_count(&self) -> usize {
        self.prompts.len()
    }
}

impl Default for PendingPrompts {
    fn default() -> Self {
        Self::new()
    }
}
