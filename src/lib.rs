//! croupier - Session lifecycle engine for timed wagering games
//!
//! Many independent users run short-lived, timed, stateful sessions
//! (blackjack hands, crash bets, trivia rounds, auto-advancing simulations)
//! that are concurrently subject to two competing resolution triggers: an
//! explicit user action and a background expiry timer. The engine
//! guarantees exactly-once resolution of each session under that race and
//! keeps the shared credit ledger consistent, so no session ever pays out
//! twice.
//!
//! The front end (command parsing, rendering, identity, permissions) is an
//! external collaborator: it opens sessions and routes actions through
//! [`SessionEngine`], and subscribes to [`EngineEvent`]s for rendering.

pub mod config;
pub mod engine;
pub mod errors;
pub mod games;
pub mod ledger;
pub mod matcher;
pub mod metrics;
pub mod registry;
pub mod scheduler;
pub mod session;

pub use config::EngineConfig;
pub use engine::{
    ActionOutcome, EngineEvent, RenderState, ResolutionResult, SessionAction, SessionEngine,
    SessionRequest, StartOutcome,
};
pub use errors::{EngineError, EngineResult};
pub use games::{ResultDetail, ResultTag};
pub use ledger::Ledger;
pub use session::{ResolveTrigger, SessionKind, SessionState};

/// Install a tracing subscriber honoring `RUST_LOG`; call once at startup
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}
