//! Configuration management with validation and defaults
//!
//! Centralized configuration for the session engine: ledger persistence,
//! session deadlines, and per-game tunables.

use crate::errors::EngineResult;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level engine configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    pub ledger: LedgerConfig,
    pub sessions: SessionConfig,
    pub crash: CrashConfig,
    pub trivia: TriviaConfig,
    pub monitoring: MonitoringConfig,
}

/// Ledger persistence and economy settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub data_directory: String,
    pub write_buffer_size_mb: usize,
    /// Flat bonus paid by `claim_daily`
    pub daily_reward: u64,
    pub daily_cooldown_secs: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            data_directory: "./data/ledger".to_string(),
            write_buffer_size_mb: 16,
            daily_reward: 100,
            daily_cooldown_secs: 86_400,
        }
    }
}

/// Session deadlines and tick cadence, in milliseconds
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Abandoned blackjack games refund after this long
    pub blackjack_timeout_ms: u64,
    /// Hard cap on a crash round regardless of the drawn crash point
    pub crash_max_duration_ms: u64,
    pub crash_tick_ms: u64,
    pub life_timeout_ms: u64,
    pub life_tick_ms: u64,
    /// Used when a trivia request does not carry its own duration
    pub trivia_default_duration_ms: u64,
    /// Upper bound on any single wager; 0 disables the cap
    pub max_wager: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            blackjack_timeout_ms: 120_000,
            crash_max_duration_ms: 60_000,
            crash_tick_ms: 500,
            life_timeout_ms: 300_000,
            life_tick_ms: 800,
            trivia_default_duration_ms: 600_000,
            max_wager: 0,
        }
    }
}

/// Crash curve tunables
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CrashConfig {
    /// Ceiling for the drawn crash point
    pub max_multiplier: f64,
    /// Probability the crash point lands in the early band
    pub early_crash_probability: f64,
    /// Upper edge of the early band (crash points in [1.0, this))
    pub early_crash_ceiling: f64,
    /// Largest per-tick multiplier increment
    pub tick_increment_max: f64,
}

impl Default for CrashConfig {
    fn default() -> Self {
        Self {
            max_multiplier: 10.0,
            early_crash_probability: 0.33,
            early_crash_ceiling: 1.5,
            tick_increment_max: 0.25,
        }
    }
}

/// Trivia reward and matching settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TriviaConfig {
    pub default_xp: u64,
    pub default_credits: u64,
    /// Fuzzy-ratio threshold for answer acceptance
    pub match_threshold: f64,
}

impl Default for TriviaConfig {
    fn default() -> Self {
        Self {
            default_xp: 50,
            default_credits: 50,
            match_threshold: 0.78,
        }
    }
}

/// Monitoring and logging configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enable_metrics: bool,
    pub log_level: LogLevel,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enable_metrics: true,
            log_level: LogLevel::Info,
        }
    }
}

/// Configuration validation and factory methods
impl EngineConfig {
    /// Configuration with aggressive timings for tests
    pub fn fast_resolution(data_directory: &str) -> Self {
        Self {
            ledger: LedgerConfig {
                data_directory: data_directory.to_string(),
                ..Default::default()
            },
            sessions: SessionConfig {
                blackjack_timeout_ms: 50,
                crash_max_duration_ms: 500,
                crash_tick_ms: 10,
                life_timeout_ms: 500,
                life_tick_ms: 10,
                trivia_default_duration_ms: 200,
                max_wager: 0,
            },
            ..Default::default()
        }
    }

    /// Validate configuration for logical consistency
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.sessions.blackjack_timeout_ms == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "blackjack_timeout_ms must be > 0".to_string(),
            ));
        }

        if self.sessions.crash_tick_ms == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "crash_tick_ms must be > 0".to_string(),
            ));
        }

        if self.sessions.crash_tick_ms >= self.sessions.crash_max_duration_ms {
            return Err(ConfigValidationError::LogicalInconsistency(
                "crash_tick_ms must be shorter than crash_max_duration_ms".to_string(),
            ));
        }

        if self.crash.max_multiplier <= 1.0 {
            return Err(ConfigValidationError::InvalidValue(
                "max_multiplier must be > 1.0".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.crash.early_crash_probability) {
            return Err(ConfigValidationError::InvalidValue(
                "early_crash_probability must be within [0, 1]".to_string(),
            ));
        }

        if self.crash.early_crash_ceiling <= 1.0
            || self.crash.early_crash_ceiling > self.crash.max_multiplier
        {
            return Err(ConfigValidationError::LogicalInconsistency(
                "early_crash_ceiling must sit between 1.0 and max_multiplier".to_string(),
            ));
        }

        if self.crash.tick_increment_max <= 0.0 {
            return Err(ConfigValidationError::InvalidValue(
                "tick_increment_max must be > 0".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.trivia.match_threshold) {
            return Err(ConfigValidationError::InvalidValue(
                "match_threshold must be within [0, 1]".to_string(),
            ));
        }

        Ok(())
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)
            .map_err(|e| crate::errors::EngineError::Persistence(e.to_string()))?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> EngineResult<()> {
        let raw = toml::to_string_pretty(self)
            .map_err(|e| crate::errors::EngineError::Persistence(e.to_string()))?;
        std::fs::write(path, raw)?;
        Ok(())
    }

    /// Convert to duration types for internal use
    pub fn blackjack_timeout(&self) -> Duration {
        Duration::from_millis(self.sessions.blackjack_timeout_ms)
    }

    pub fn crash_max_duration(&self) -> Duration {
        Duration::from_millis(self.sessions.crash_max_duration_ms)
    }

    pub fn crash_tick(&self) -> Duration {
        Duration::from_millis(self.sessions.crash_tick_ms)
    }

    pub fn life_timeout(&self) -> Duration {
        Duration::from_millis(self.sessions.life_timeout_ms)
    }

    pub fn life_tick(&self) -> Duration {
        Duration::from_millis(self.sessions.life_tick_ms)
    }

    pub fn trivia_default_duration(&self) -> Duration {
        Duration::from_millis(self.sessions.trivia_default_duration_ms)
    }

    pub fn daily_cooldown(&self) -> Duration {
        Duration::from_secs(self.ledger.daily_cooldown_secs)
    }
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ConfigValidationError {
    InvalidValue(String),
    LogicalInconsistency(String),
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigValidationError::InvalidValue(msg) => {
                write!(f, "Invalid configuration value: {}", msg)
            }
            ConfigValidationError::LogicalInconsistency(msg) => {
                write!(f, "Configuration logical inconsistency: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigValidationError {}
