//! Session engine: registry, wagers, timers, and exactly-once resolution
//!
//! The engine is the single entry point the front end talks to. Opening a
//! session claims the scope, debits the wager, deals the payload, and arms
//! the expiry timer. Both the timer and user actions funnel into the same
//! resolution gate: an atomic Active -> Resolving transition whose winner
//! settles, credits, and removes the session; the loser observes
//! `NoActiveSession` and mutates nothing.

mod events;

pub use events::{render_view, EngineEvent, RenderState, ResolutionResult};

use crate::config::EngineConfig;
use crate::errors::{EngineError, EngineResult};
use crate::games::{
    life, odds, rule_for, AnswerVerdict, CoinSide, CrashRound, GamePayload, LifeGrid,
    PendingPrompts, RouletteBet, TriviaRound,
};
use crate::games::blackjack::BlackjackTable;
use crate::ledger::Ledger;
use crate::metrics::EngineMetrics;
use crate::registry::SessionRegistry;
use crate::scheduler::ExpiryScheduler;
use crate::session::{ResolveTrigger, Session, SessionKind};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// What the front end asks for when opening a session
#[derive(Debug, Clone)]
pub enum SessionRequest {
    Blackjack {
        wager: u64,
    },
    Crash {
        wager: u64,
    },
    Roulette {
        wager: u64,
        bet: RouletteBet,
    },
    Dice {
        wager: u64,
        called: u8,
    },
    Slots {
        wager: u64,
    },
    Coinflip {
        wager: u64,
        call: CoinSide,
    },
    Trivia {
        question: String,
        answer_raw: String,
        xp: Option<u64>,
        credits: Option<u64>,
        duration_ms: Option<u64>,
    },
    LifeSim,
}

impl SessionRequest {
    pub fn kind(&self) -> SessionKind {
        match self {
            SessionRequest::Blackjack { .. } => SessionKind::Blackjack,
            SessionRequest::Crash { .. } => SessionKind::Crash,
            SessionRequest::Roulette { .. } => SessionKind::Roulette,
            SessionRequest::Dice { .. } => SessionKind::Dice,
            SessionRequest::Slots { .. } => SessionKind::Slots,
            SessionRequest::Coinflip { .. } => SessionKind::Coinflip,
            SessionRequest::Trivia { .. } => SessionKind::Trivia,
            SessionRequest::LifeSim => SessionKind::LifeSim,
        }
    }

    pub fn wager(&self) -> u64 {
        match self {
            SessionRequest::Blackjack { wager }
            | SessionRequest::Crash { wager }
            | SessionRequest::Roulette { wager, .. }
            | SessionRequest::Dice { wager, .. }
            | SessionRequest::Slots { wager }
            | SessionRequest::Coinflip { wager, .. } => *wager,
            SessionRequest::Trivia { .. } | SessionRequest::LifeSim => 0,
        }
    }
}

/// User actions routed through `act`
#[derive(Debug, Clone)]
pub enum SessionAction {
    Hit,
    Stand,
    CashOut,
    Answer { text: String },
    Cancel,
    Step,
    Toggle { x: usize, y: usize },
    Randomize,
    Clear,
    Quit,
}

/// Outcome of opening a session
#[derive(Debug)]
pub enum StartOutcome {
    /// Session is live; the front end renders and waits for actions
    Opened {
        session_id: String,
        render: RenderState,
    },
    /// Instant kinds (and dealt naturals) settle inside the opening call
    Settled(ResolutionResult),
}

/// Outcome of a user action
#[derive(Debug)]
pub enum ActionOutcome {
    Updated(RenderState),
    Resolved(ResolutionResult),
    AnswerCorrect { credits: u64, xp: u64 },
    AnswerAlreadyCounted,
    AnswerIncorrect,
}

struct EngineInner {
    config: EngineConfig,
    ledger: Ledger,
    registry: SessionRegistry,
    scheduler: ExpiryScheduler,
    prompts: PendingPrompts,
    events: broadcast::Sender<EngineEvent>,
    metrics: EngineMetrics,
}

/// The resolution coordinator and front-end contract
#[derive(Clone)]
pub struct SessionEngine {
    inner: Arc<EngineInner>,
}

impl SessionEngine {
    /// Open the ledger store and stand up an empty engine
    pub fn open(config: EngineConfig) -> EngineResult<Self> {
        config
            .validate()
            .map_err(|e| EngineError::InvalidAction(e.to_string()))?;
        let ledger = Ledger::open(config.ledger.clone())?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            inner: Arc::new(EngineInner {
                config,
                ledger,
                registry: SessionRegistry::new(),
                scheduler: ExpiryScheduler::new(),
                prompts: PendingPrompts::new(),
                events,
                metrics: EngineMetrics::new(),
            }),
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.inner.events.subscribe()
    }

    pub fn ledger(&self) -> &Ledger {
        &self.inner.ledger
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.inner.metrics
    }

    pub fn active_sessions(&self) -> usize {
        self.inner.registry.active_count()
    }

    /// Open a session for a scope. Claims the scope first, then debits the
    /// wager (releasing the scope again if funds are short), deals the
    /// payload, arms the expiry timer, and announces `SessionStarted`.
    /// Instant kinds and dealt naturals come back already settled.
    pub fn open_session(
        &self,
        scope: &str,
        owner: &str,
        request: SessionRequest,
    ) -> EngineResult<StartOutcome> {
        self.validate_request(&request)?;
        let kind = request.kind();
        let wager = request.wager();
        let ttl = self.deadline_for(&request);
        let payload = self.build_payload(owner, &request)?;

        let session = match self
            .inner
            .registry
            .create(Session::new(scope, owner, kind, wager, payload))
        {
            Ok(session) => session,
            Err(e) => {
                self.inner.metrics.record_busy_rejection();
                return Err(e);
            }
        };

        if wager > 0 {
            if let Err(e) = self.inner.ledger.debit(owner, wager) {
                self.inner.registry.remove(scope);
                if matches!(e, EngineError::InsufficientFunds { .. }) {
                    self.inner.metrics.record_insufficient_rejection();
                }
                return Err(e);
            }
        }

        session.activate();
        self.inner.metrics.record_session_started(wager);
        info!(scope, owner, %kind, wager, "session opened");

        if kind.is_instant() {
            let result = self.resolve_session(&session, ResolveTrigger::Action)?;
            return Ok(StartOutcome::Settled(result));
        }

        // dealt natural settles before any timer is armed
        if kind == SessionKind::Blackjack {
            let natural = match &*session.payload.lock().unwrap() {
                GamePayload::Blackjack(table) => table.player_has_natural(),
                _ => false,
            };
            if natural {
                let result = self.resolve_session(&session, ResolveTrigger::Action)?;
                return Ok(StartOutcome::Settled(result));
            }
        }

        let engine = self.clone();
        let expire_scope = scope.to_string();
        let handle = self.inner.scheduler.arm(ttl, move || async move {
            engine.expire(&expire_scope);
        });
        session.arm(handle);

        match kind {
            SessionKind::Crash => self.spawn_crash_driver(scope.to_string()),
            SessionKind::LifeSim => self.spawn_life_driver(scope.to_string()),
            _ => {}
        }

        let render = self.render(&session, false);
        let _ = self.inner.events.send(EngineEvent::SessionStarted {
            scope: scope.to_string(),
            render: render.clone(),
        });
        Ok(StartOutcome::Opened {
            session_id: session.id.clone(),
            render,
        })
    }

    /// Route a user action into the session holding this scope
    pub fn act(&self, scope: &str, actor: &str, action: SessionAction) -> EngineResult<ActionOutcome> {
        let session = self
            .inner
            .registry
            .get(scope)
            .ok_or(EngineError::NoActiveSession)?;
        if !session.is_active() {
            return Err(EngineError::NoActiveSession);
        }

        match (session.kind, action) {
            (SessionKind::Blackjack, SessionAction::Hit) => {
                self.require_owner(&session, actor)?;
                let terminal = {
                    let mut payload = session.payload.lock().unwrap();
                    match &mut *payload {
                        GamePayload::Blackjack(table) => {
                            if table.hit().is_none() {
                                return Err(EngineError::InvalidAction(
                                    "deck exhausted".to_string(),
                                ));
                            }
                            // bust resolves as a loss; 21 auto-stands
                            table.player_busted() || table.player_value() == 21
                        }
                        _ => return Err(EngineError::InvalidAction("not a blackjack table".to_string())),
                    }
                };
                if terminal {
                    self.resolve_session(&session, ResolveTrigger::Action)
                        .map(ActionOutcome::Resolved)
                } else {
                    let render = self.render(&session, false);
                    self.emit_updated(scope, render.clone());
                    Ok(ActionOutcome::Updated(render))
                }
            }
            (SessionKind::Blackjack, SessionAction::Stand)
            | (SessionKind::Crash, SessionAction::CashOut)
            | (SessionKind::LifeSim, SessionAction::Quit) => {
                self.require_owner(&session, actor)?;
                self.resolve_session(&session, ResolveTrigger::Action)
                    .map(ActionOutcome::Resolved)
            }
            (SessionKind::Trivia, SessionAction::Answer { text }) => {
                self.submit_answer(&session, actor, &text)
            }
            (SessionKind::Blackjack, SessionAction::Cancel)
            | (SessionKind::Trivia, SessionAction::Cancel)
            | (SessionKind::LifeSim, SessionAction::Cancel) => {
                self.require_owner(&session, actor)?;
                self.resolve_session(&session, ResolveTrigger::Cancel)
                    .map(ActionOutcome::Resolved)
            }
            (SessionKind::LifeSim, action) => {
                self.require_owner(&session, actor)?;
                {
                    let mut payload = session.payload.lock().unwrap();
                    match &mut *payload {
                        GamePayload::Life(grid) => match action {
                            SessionAction::Step => grid.step(),
                            SessionAction::Toggle { x, y } => grid.toggle(x, y),
                            SessionAction::Randomize => grid.randomize(&mut rand::thread_rng()),
                            SessionAction::Clear => grid.clear(),
                            other => {
                                return Err(EngineError::InvalidAction(format!(
                                    "{:?} does not apply to a simulation",
                                    other
                                )))
                            }
                        },
                        _ => return Err(EngineError::InvalidAction("not a simulation".to_string())),
                    }
                }
                let render = self.render(&session, false);
                self.emit_updated(scope, render.clone());
                Ok(ActionOutcome::Updated(render))
            }
            (kind, action) => Err(EngineError::InvalidAction(format!(
                "{:?} does not apply to {}",
                action, kind
            ))),
        }
    }

    /// Privileged cancel for the boundary (after its own permission checks)
    pub fn cancel_session(&self, scope: &str) -> EngineResult<ResolutionResult> {
        self.resolve_scope(scope, ResolveTrigger::Cancel)
    }

    /// Park a question that arrived without an answer
    pub fn open_prompt(&self, asker: &str, scope: &str, question: &str) {
        self.inner.prompts.open(asker, scope, question);
        debug!(asker, scope, "pending prompt opened");
    }

    /// Complete a parked question with its answer and post the session.
    /// The prompt is consumed either way; a busy scope drops the question.
    pub fn fulfill_prompt(&self, asker: &str, answer_raw: &str) -> EngineResult<StartOutcome> {
        let prompt = self
            .inner
            .prompts
            .take(asker)
            .ok_or_else(|| EngineError::InvalidAction("no pending prompt".to_string()))?;
        self.open_session(
            &prompt.scope,
            asker,
            SessionRequest::Trivia {
                question: prompt.question,
                answer_raw: answer_raw.to_string(),
                xp: None,
                credits: None,
                duration_ms: None,
            },
        )
    }

    pub fn abandon_prompt(&self, asker: &str) -> bool {
        self.inner.prompts.abandon(asker)
    }

    fn validate_request(&self, request: &SessionRequest) -> EngineResult<()> {
        match request {
            SessionRequest::Trivia { .. } | SessionRequest::LifeSim => Ok(()),
            SessionRequest::Dice { wager, called } => {
                self.validate_wager(*wager)?;
                if !(1..=6).contains(called) {
                    return Err(EngineError::InvalidAction(format!(
                        "die face must be 1-6, got {}",
                        called
                    )));
                }
                Ok(())
            }
            other => self.validate_wager(other.wager()),
        }
    }

    fn validate_wager(&self, wager: u64) -> EngineResult<()> {
        if wager == 0 {
            return Err(EngineError::InvalidWager(0));
        }
        let cap = self.inner.config.sessions.max_wager;
        if cap > 0 && wager > cap {
            return Err(EngineError::InvalidWager(wager));
        }
        Ok(())
    }

    fn deadline_for(&self, request: &SessionRequest) -> Duration {
        let config = &self.inner.config;
        match request {
            SessionRequest::Blackjack { .. } => config.blackjack_timeout(),
            SessionRequest::Crash { .. } => config.crash_max_duration(),
            SessionRequest::Trivia { duration_ms, .. } => duration_ms
                .map(Duration::from_millis)
                .unwrap_or_else(|| config.trivia_default_duration()),
            SessionRequest::LifeSim => config.life_timeout(),
            // instant kinds settle inside the opening call
            _ => Duration::from_millis(0),
        }
    }

    fn build_payload(&self, owner: &str, request: &SessionRequest) -> EngineResult<GamePayload> {
        let mut rng = rand::thread_rng();
        let config = &self.inner.config;
        Ok(match request {
            SessionRequest::Blackjack { .. } => {
                GamePayload::Blackjack(BlackjackTable::deal(&mut rng))
            }
            SessionRequest::Crash { .. } => {
                GamePayload::Crash(CrashRound::start(&config.crash, &mut rng))
            }
            SessionRequest::Roulette { bet, .. } => GamePayload::Roulette {
                bet: *bet,
                spun: odds::spin_wheel(&mut rng),
            },
            SessionRequest::Dice { called, .. } => GamePayload::Dice {
                called: *called,
                rolled: odds::roll_die(&mut rng),
            },
            SessionRequest::Slots { .. } => GamePayload::Slots {
                reels: odds::spin_reels(&mut rng),
            },
            SessionRequest::Coinflip { call, .. } => GamePayload::Coinflip {
                call: *call,
                landed: odds::flip_coin(&mut rng),
            },
            SessionRequest::Trivia {
                question,
                answer_raw,
                xp,
                credits,
                ..
            } => {
                let round = TriviaRound::new(
                    owner,
                    question,
                    answer_raw,
                    xp.unwrap_or(config.trivia.default_xp),
                    credits.unwrap_or(config.trivia.default_credits),
                )
                .ok_or_else(|| {
                    EngineError::InvalidAction("provide at least one valid answer".to_string())
                })?;
                GamePayload::Trivia(round)
            }
            SessionRequest::LifeSim => GamePayload::Life(LifeGrid::randomized(
                life::DEFAULT_WIDTH,
                life::DEFAULT_HEIGHT,
                &mut rng,
            )),
        })
    }

    fn require_owner(&self, session: &Session, actor: &str) -> EngineResult<()> {
        if session.owner != actor {
            return Err(EngineError::Ineligible(
                "this session belongs to someone else".to_string(),
            ));
        }
        Ok(())
    }

    /// Judge a trivia submission; distinct correct respondents are paid once
    fn submit_answer(
        &self,
        session: &Arc<Session>,
        respondent: &str,
        text: &str,
    ) -> EngineResult<ActionOutcome> {
        let threshold = self.inner.config.trivia.match_threshold;
        let mut payload = session.payload.lock().unwrap();
        let round = match &mut *payload {
            GamePayload::Trivia(round) => round,
            _ => return Err(EngineError::InvalidAction("not a trivia session".to_string())),
        };

        match round.submit(respondent, text, threshold) {
            AnswerVerdict::Correct => {
                let credits = round.credits;
                let xp = round.xp;
                if let Err(e) = self.inner.ledger.credit(respondent, credits) {
                    // unpaid answers don't count
                    round.correct.pop();
                    warn!(respondent, error = %e, "trivia reward credit failed");
                    return Err(e);
                }
                self.inner.metrics.record_trivia_reward(credits);
                info!(respondent, credits, xp, "trivia answer rewarded");
                drop(payload);
                let render = self.render(session, false);
                self.emit_updated(&session.scope, render);
                Ok(ActionOutcome::AnswerCorrect { credits, xp })
            }
            AnswerVerdict::AlreadyCounted => Ok(ActionOutcome::AnswerAlreadyCounted),
            AnswerVerdict::AskerIneligible => Err(EngineError::Ineligible(
                "the asker cannot answer their own question".to_string(),
            )),
            AnswerVerdict::Incorrect => Ok(ActionOutcome::AnswerIncorrect),
        }
    }

    fn resolve_scope(&self, scope: &str, trigger: ResolveTrigger) -> EngineResult<ResolutionResult> {
        let session = self
            .inner
            .registry
            .get(scope)
            .ok_or(EngineError::NoActiveSession)?;
        self.resolve_session(&session, trigger)
    }

    /// The exactly-once gate. Whoever wins Active -> Resolving settles the
    /// payload, credits any payout, removes the session, and reports; the
    /// loser gets `NoActiveSession` and must not mutate anything.
    fn resolve_session(
        &self,
        session: &Arc<Session>,
        trigger: ResolveTrigger,
    ) -> EngineResult<ResolutionResult> {
        if !session.begin_resolution() {
            debug!(scope = %session.scope, ?trigger, "resolution lost the race");
            return Err(EngineError::NoActiveSession);
        }
        session.disarm();

        let outcome = {
            let mut payload = session.payload.lock().unwrap();
            rule_for(session.kind).settle(&mut payload, trigger, session.wager)
        };

        if outcome.payout > 0 {
            if let Err(e) = self.inner.ledger.credit(&session.owner, outcome.payout) {
                error!(
                    scope = %session.scope,
                    owner = %session.owner,
                    payout = outcome.payout,
                    error = %e,
                    "payout credit failed, attempting wager refund"
                );
                if session.wager > 0 {
                    if let Err(refund_err) = self.inner.ledger.credit(&session.owner, session.wager)
                    {
                        error!(
                            scope = %session.scope,
                            error = %refund_err,
                            "wager refund failed"
                        );
                    }
                }
            }
        }

        session.finish_resolution();
        self.inner.registry.remove(&session.scope);
        self.inner.metrics.record_resolution(trigger, outcome.payout);
        info!(
            scope = %session.scope,
            kind = %session.kind,
            ?trigger,
            tag = ?outcome.tag,
            payout = outcome.payout,
            "session resolved"
        );

        let result = ResolutionResult {
            session_id: session.id.clone(),
            scope: session.scope.clone(),
            kind: session.kind,
            trigger,
            wager: session.wager,
            payout: outcome.payout,
            tag: outcome.tag,
            detail: outcome.detail,
        };
        let _ = self.inner.events.send(EngineEvent::SessionResolved {
            scope: session.scope.clone(),
            result: result.clone(),
        });
        Ok(result)
    }

    /// Timer callback; losing the race to a user action is expected
    fn expire(&self, scope: &str) {
        match self.resolve_scope(scope, ResolveTrigger::Expiry) {
            Ok(result) => debug!(scope, tag = ?result.tag, "session expired"),
            Err(EngineError::NoActiveSession) => {
                debug!(scope, "expiry found no active session")
            }
            Err(e) => warn!(scope, error = %e, "expiry resolution failed"),
        }
    }

    fn render(&self, session: &Session, reveal: bool) -> RenderState {
        let view = render_view(&session.payload.lock().unwrap(), reveal);
        RenderState {
            kind: session.kind,
            wager: session.wager,
            view,
        }
    }

    fn emit_updated(&self, scope: &str, render: RenderState) {
        let _ = self.inner.events.send(EngineEvent::SessionUpdated {
            scope: scope.to_string(),
            render,
        });
    }

    /// Advance the crash curve until detonation, cash-out, or expiry
    fn spawn_crash_driver(&self, scope: String) {
        let engine = self.clone();
        tokio::spawn(async move {
            let tick = engine.inner.config.crash_tick();
            loop {
                tokio::time::sleep(tick).await;
                let session = match engine.inner.registry.get(&scope) {
                    Some(session) => session,
                    None => break,
                };
                if !session.is_active() {
                    break;
                }
                let detonated = {
                    let mut payload = session.payload.lock().unwrap();
                    match &mut *payload {
                        GamePayload::Crash(round) => {
                            round.advance(&engine.inner.config.crash, &mut rand::thread_rng())
                        }
                        _ => break,
                    }
                };
                if detonated {
                    if let Err(e) = engine.resolve_session(&session, ResolveTrigger::Expiry) {
                        debug!(scope = %scope, error = %e, "crash detonation lost the race");
                    }
                    break;
                }
                let render = engine.render(&session, false);
                engine.emit_updated(&scope, render);
            }
        });
    }

    /// Auto-advance the simulation between user edits
    fn spawn_life_driver(&self, scope: String) {
        let engine = self.clone();
        tokio::spawn(async move {
            let tick = engine.inner.config.life_tick();
            loop {
                tokio::time::sleep(tick).await;
                let session = match engine.inner.registry.get(&scope) {
                    Some(session) => session,
                    None => break,
                };
                if !session.is_active() {
                    break;
                }
                {
                    let mut payload = session.payload.lock().unwrap();
                    match &mut *payload {
                        GamePayload::Life(grid) => grid.step(),
                        _ => break,
                    }
                }
                let render = engine.render(&session, false);
                engine.emit_updated(&scope, render);
            }
        });
    }
}
