//! Engine counters
//!
//! Lightweight atomic counters for session and ledger activity, with a
//! snapshot accessor for reporting.

use crate::session::ResolveTrigger;
use std::sync::atomic::{AtomicU64, Ordering};

pub struct EngineMetrics {
    sessions_started: AtomicU64,
    resolved_by_action: AtomicU64,
    resolved_by_expiry: AtomicU64,
    resolved_by_cancel: AtomicU64,
    busy_rejections: AtomicU64,
    insufficient_rejections: AtomicU64,
    wagered_total: AtomicU64,
    paid_total: AtomicU64,
    trivia_rewards_paid: AtomicU64,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self {
            sessions_started: AtomicU64::new(0),
            resolved_by_action: AtomicU64::new(0),
            resolved_by_expiry: AtomicU64::new(0),
            resolved_by_cancel: AtomicU64::new(0),
            busy_rejections: AtomicU64::new(0),
            insufficient_rejections: AtomicU64::new(0),
            wagered_total: AtomicU64::new(0),
            paid_total: AtomicU64::new(0),
            trivia_rewards_paid: AtomicU64::new(0),
        }
    }

    pub fn record_session_started(&self, wager: u64) {
        self.sessions_started.fetch_add(1, Ordering::Relaxed);
        self.wagered_total.fetch_add(wager, Ordering::Relaxed);
    }

    pub fn record_resolution(&self, trigger: ResolveTrigger, payout: u64) {
        let counter = match trigger {
            ResolveTrigger::Action => &self.resolved_by_action,
            ResolveTrigger::Expiry => &self.resolved_by_expiry,
            ResolveTrigger::Cancel => &self.resolved_by_cancel,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.paid_total.fetch_add(payout, Ordering::Relaxed);
    }

    pub fn record_busy_rejection(&self) {
        self.busy_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_insufficient_rejection(&self) {
        self.insufficient_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_trivia_reward(&self, credits: u64) {
        self.trivia_rewards_paid.fetch_add(credits, Ordering::Relaxed);
        self.paid_total.fetch_add(credits, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sessions_started: self.sessions_started.load(Ordering::Relaxed),
            resolved_by_action: self.resolved_by_action.load(Ordering::Relaxed),
            resolved_by_expiry: self.resolved_by_expiry.load(Ordering::Relaxed),
            resolved_by_cancel: self.resolved_by_cancel.load(Ordering::Relaxed),
            busy_rejections: self.busy_rejections.load(Ordering::Relaxed),
            insufficient_rejections: self.insufficient_rejections.load(Ordering::Relaxed),
            wagered_total: self.wagered_total.load(Ordering::Relaxed),
            paid_total: self.paid_total.load(Ordering::Relaxed),
            trivia_rewards_paid: self.trivia_rewards_paid.load(Ordering::Relaxed),
        }
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of the counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub sessions_started: u64,
    pub resolved_by_action: u64,
    pub resolved_by_expiry: u64,
    pub resolved_by_cancel: u64,
    pub busy_rejections: u64,
    pub insufficient_rejections: u64,
    pub wagered_total: u64,
    pub paid_total: u64,
    pub trivia_rewards_paid: u64,
}

impl MetricsSnapshot {
    pub fn total_resolved(&self) -> u64 {
        self.resolved_by_action + self.resolved_by_expiry + self.resolved_by_cancel
    }
}
