//! Session entity and state machine primitives
//!
//! A session is one in-progress game bound to a scope. Its state lives in
//! an atomic so the Active -> Resolving transition is a compare-and-swap:
//! exactly one of a racing timer and user action wins it.

use crate::games::GamePayload;
use crate::scheduler::ExpiryHandle;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

/// Supported session kinds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    Blackjack,
    Crash,
    Roulette,
    Dice,
    Slots,
    Coinflip,
    Trivia,
    LifeSim,
}

impl SessionKind {
    /// Instant kinds resolve inside the opening call and never arm a timer
    pub fn is_instant(&self) -> bool {
        matches!(
            self,
            SessionKind::Roulette | SessionKind::Dice | SessionKind::Slots | SessionKind::Coinflip
        )
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionKind::Blackjack => "blackjack",
            SessionKind::Crash => "crash",
            SessionKind::Roulette => "roulette",
            SessionKind::Dice => "dice",
            SessionKind::Slots => "slots",
            SessionKind::Coinflip => "coinflip",
            SessionKind::Trivia => "trivia",
            SessionKind::LifeSim => "lifesim",
        };
        write!(f, "{}", name)
    }
}

/// Session lifecycle states
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created = 0,
    Active = 1,
    Resolving = 2,
    Resolved = 3,
}

impl SessionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => SessionState::Created,
            1 => SessionState::Active,
            2 => SessionState::Resolving,
            _ => SessionState::Resolved,
        }
    }
}

/// What drove a resolution attempt
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResolveTrigger {
    /// Explicit user action (stand, cash out, quit)
    Action,
    /// Expiry timer or tick driver detonation
    Expiry,
    /// Owner/asker cancellation
    Cancel,
}

/// One in-progress session bound to a scope
pub struct Session {
    pub id: String,
    pub scope: String,
    /// Account that placed the wager (or authored the question)
    pub owner: String,
    pub kind: SessionKind,
    pub wager: u64,
    state: AtomicU8,
    pub payload: Mutex<GamePayload>,
    expiry: Mutex<Option<ExpiryHandle>>,
}

impl Session {
    pub fn new(scope: &str, owner: &str, kind: SessionKind, wager: u64, payload: GamePayload) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            scope: scope.to_string(),
            owner: owner.to_string(),
            kind,
            wager,
            state: AtomicU8::new(SessionState::Created as u8),
            payload: Mutex::new(payload),
            expiry: Mutex::new(None),
        }
    }

    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn is_active(&self) -> bool {
        self.state() == SessionState::Active
    }

    pub fn is_terminal(&self) -> bool {
        self.state() == SessionState::Resolved
    }

    /// Created -> Active, once the wager has been debited
    pub fn activate(&self) -> bool {
        self.state
            .compare_exchange(
                SessionState::Created as u8,
                SessionState::Active as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    /// Active -> Resolving. The caller that wins this transition is the only
    /// one allowed to compute payout; everyone else observes a closed session.
    pub fn begin_resolution(&self) -> bool {
        self.state
            .compare_exchange(
                SessionState::Active as u8,
                SessionState::Resolving as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    /// Resolving -> Resolved
    pub fn finish_resolution(&self) {
        self.state
            .store(SessionState::Resolved as u8, Ordering::SeqCst);
    }

    /// Attach the armed expiry handle for later cancellation
    pub fn arm(&self, handle: ExpiryHandle) {
        *self.expiry.lock().unwrap() = Some(handle);
    }

    /// Cancel any pending expiry timer; safe if it already fired
    pub fn disarm(&self) {
        if let Some(mut handle) = self.expiry.lock().unwrap().take() {
            handle.cancel();
        }
    }
}
