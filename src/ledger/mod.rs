//! Shared credit ledger
//!
//! Maps account ids to balances and lifetime-earned counters. Mutations are
//! serialized per account (the map entry guard is held across the persist)
//! and hit the store before acking, so a crash right after a successful
//! debit never silently loses the deduction. No whole-ledger lock exists;
//! unrelated accounts mutate concurrently.

mod store;

pub use store::{AccountRecord, LedgerStore};

use crate::config::LedgerConfig;
use crate::errors::{EngineError, EngineResult};
use dashmap::DashMap;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

pub struct Ledger {
    accounts: DashMap<String, AccountRecord>,
    store: LedgerStore,
    /// account id -> unix seconds of last daily claim; in-memory only
    daily_claims: DashMap<String, u64>,
    config: LedgerConfig,
}

impl Ledger {
    /// Open the backing store and hydrate all known accounts
    pub fn open(config: LedgerConfig) -> EngineResult<Self> {
        let store = LedgerStore::open(&config.data_directory, config.write_buffer_size_mb)?;
        let accounts = DashMap::new();
        for (account, record) in store.load_all()? {
            accounts.insert(account, record);
        }
        debug!(accounts = accounts.len(), "ledger hydrated");
        Ok(Self {
            accounts,
            store,
            daily_claims: DashMap::new(),
            config,
        })
    }

    /// Create a zero-balance record if absent
    pub fn ensure(&self, account: &str) {
        self.accounts.entry(account.to_string()).or_default();
    }

    /// Read-only balance snapshot
    pub fn balance(&self, account: &str) -> u64 {
        self.accounts
            .get(account)
            .map(|r| r.balance)
            .unwrap_or(0)
    }

    /// Read-only lifetime-earned snapshot
    pub fn lifetime_earned(&self, account: &str) -> u64 {
        self.accounts
            .get(account)
            .map(|r| r.lifetime_earned)
            .unwrap_or(0)
    }

    /// Add to balance and lifetime-earned; persists before returning
    pub fn credit(&self, account: &str, amount: u64) -> EngineResult<()> {
        let mut entry = self.accounts.entry(account.to_string()).or_default();
        let updated = AccountRecord {
            balance: entry.balance.saturating_add(amount),
            lifetime_earned: entry.lifetime_earned.saturating_add(amount),
        };
        self.store.put(account, &updated)?;
        *entry = updated;
        Ok(())
    }

    /// Remove from balance; fails without mutation when funds are short
    pub fn debit(&self, account: &str, amount: u64) -> EngineResult<()> {
        if amount == 0 {
            return Err(EngineError::InvalidWager(0));
        }
        let mut entry = self.accounts.entry(account.to_string()).or_default();
        if entry.balance < amount {
            return Err(EngineError::InsufficientFunds {
                needed: amount,
                available: entry.balance,
            });
        }
        let updated = AccountRecord {
            balance: entry.balance - amount,
            lifetime_earned: entry.lifetime_earned,
        };
        self.store.put(account, &updated)?;
        *entry = updated;
        Ok(())
    }

    /// Move credits between accounts; a failure leaves both sides unchanged
    /// apart from a logged best-effort refund when the receiving write fails
    pub fn transfer(&self, from: &str, to: &str, amount: u64) -> EngineResult<()> {
        if from == to {
            return Err(EngineError::InvalidAction(
                "cannot transfer to the same account".to_string(),
            ));
        }
        self.debit(from, amount)?;
        if let Err(e) = self.credit(to, amount) {
            warn!(from, to, amount, error = %e, "transfer credit failed, refunding sender");
            if let Err(refund_err) = self.credit(from, amount) {
                warn!(from, amount, error = %refund_err, "transfer refund also failed");
            }
            return Err(e);
        }
        Ok(())
    }

    /// Claim the flat daily bonus; once per cooldown window
    pub fn claim_daily(&self, account: &str) -> EngineResult<u64> {
        let now = unix_now();
        let cooldown = self.config.daily_cooldown_secs;
        if let Some(last) = self.daily_claims.get(account) {
            let elapsed = now.saturating_sub(*last);
            if elapsed < cooldown {
                return Err(EngineError::CooldownActive {
                    remaining_secs: cooldown - elapsed,
                });
            }
        }
        self.credit(account, self.config.daily_reward)?;
        self.daily_claims.insert(account.to_string(), now);
        Ok(self.config.daily_reward)
    }

    /// Top-n accounts by balance
    pub fn leaderboard(&self, n: usize) -> Vec<(String, u64)> {
        let mut rows: Vec<(String, u64)> = self
            .accounts
            .iter()
            .map(|r| (r.key().clone(), r.balance))
            .collect();
        rows.sort_by(|a, b| b.1.cmp(&a.1));
        rows.truncate(n);
        rows
    }

    /// Zero an account's balance; lifetime-earned is kept
    pub fn reset(&self, account: &str) -> EngineResult<()> {
        let mut entry = self.accounts.entry(account.to_string()).or_default();
        let updated = AccountRecord {
            balance: 0,
            lifetime_earned: entry.lifetime_earned,
        };
        self.store.put(account, &updated)?;
        *entry = updated;
        Ok(())
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_ledger(dir: &tempfile::TempDir) -> Ledger {
        let config = LedgerConfig {
            data_directory: dir.path().to_string_lossy().into_owned(),
            ..Default::default()
        };
        Ledger::open(config).unwrap()
    }

    #[test]
    fn test_ensure_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = open_ledger(&dir);
        ledger.ensure("alice");
        ledger.ensure("alice");
        assert_eq!(ledger.balance("alice"), 0);
    }

    #[test]
    fn test_credit_updates_both_counters() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = open_ledger(&dir);
        ledger.credit("alice", 100).unwrap();
        ledger.credit("alice", 50).unwrap();
        assert_eq!(ledger.balance("alice"), 150);
        assert_eq!(ledger.lifetime_earned("alice"), 150);
    }

    #[test]
    fn test_debit_rejects_overdraft_without_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = open_ledger(&dir);
        ledger.credit("alice", 30).unwrap();

        match ledger.debit("alice", 31) {
            Err(EngineError::InsufficientFunds { needed, available }) => {
                assert_eq!(needed, 31);
                assert_eq!(available, 30);
            }
            other => panic!("expected InsufficientFunds, got {:?}", other.map(|_| ())),
        }
        assert_eq!(ledger.balance("alice"), 30);
    }

    #[test]
    fn test_debit_zero_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = open_ledger(&dir);
        assert!(matches!(
            ledger.debit("alice", 0),
            Err(EngineError::InvalidWager(0))
        ));
    }

    #[test]
    fn test_balance_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let ledger = open_ledger(&dir);
            ledger.credit("bob", 500).unwrap();
            ledger.debit("bob", 120).unwrap();
        }
        let ledger = open_ledger(&dir);
        assert_eq!(ledger.balance("bob"), 380);
        assert_eq!(ledger.lifetime_earned("bob"), 500);
    }

    #[test]
    fn test_transfer_moves_funds() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = open_ledger(&dir);
        ledger.credit("alice", 200).unwrap();
        ledger.transfer("alice", "bob", 75).unwrap();
        assert_eq!(ledger.balance("alice"), 125);
        assert_eq!(ledger.balance("bob"), 75);
    }

    #[test]
    fn test_transfer_insufficient_leaves_both_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = open_ledger(&dir);
        ledger.credit("alice", 10).unwrap();
        assert!(ledger.transfer("alice", "bob", 100).is_err());
        assert_eq!(ledger.balance("alice"), 10);
        assert_eq!(ledger.balance("bob"), 0);
    }

    #[test]
    fn test_daily_claim_once_per_window() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = open_ledger(&dir);
        let reward = ledger.claim_daily("alice").unwrap();
        assert_eq!(ledger.balance("alice"), reward);

        match ledger.claim_daily("alice") {
            Err(EngineError::CooldownActive { remaining_secs }) => {
                assert!(remaining_secs > 0);
            }
            other => panic!("expected cooldown, got {:?}", other),
        }
        assert_eq!(ledger.balance("alice"), reward);
    }

    #[test]
    fn test_reset_zeroes_balance_only() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = open_ledger(&dir);
        ledger.credit("alice", 300).unwrap();
        ledger.reset("alice").unwrap();
        assert_eq!(ledger.balance("alice"), 0);
        assert_eq!(ledger.lifetime_earned("alice"), 300);
    }

    #[test]
    fn test_leaderboard_orders_by_balance() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = open_ledger(&dir);
        ledger.credit("small", 10).unwrap();
        ledger.credit("large", 1_000).unwrap();
        ledger.credit("medium", 100).unwrap();

        let top = ledger.leaderboard(2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].0, "large");
        assert_eq!(top[1].0, "medium");
    }

    #[test]
    fn test_concurrent_debits_never_go_negative() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = std::sync::Arc::new(open_ledger(&dir));
        ledger.credit("alice", 50).unwrap();

        let mut handles = Vec::new();
        for _ in 0..100 {
            let ledger = ledger.clone();
            handles.push(std::thread::spawn(move || {
                ledger.debit("alice", 1).is_ok()
            }));
        }
        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap_or(false))
            .filter(|ok| *ok)
            .count();

        assert_eq!(successes, 50);
        assert_eq!(ledger.balance("alice"), 0);
    }
}
