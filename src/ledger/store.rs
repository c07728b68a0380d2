//! Durable account store backed by RocksDB

use crate::errors::EngineResult;
use rocksdb::{IteratorMode, Options, DB};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// One persisted ledger record per account
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub balance: u64,
    pub lifetime_earned: u64,
}

/// Key-value store for account records; writes are flushed before acking
#[derive(Clone)]
pub struct LedgerStore {
    db: Arc<DB>,
}

impl LedgerStore {
    pub fn open<P: AsRef<Path>>(path: P, write_buffer_size_mb: usize) -> EngineResult<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_write_buffer_size(write_buffer_size_mb * 1024 * 1024);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);

        let db = DB::open(&opts, path)?;
        Ok(Self { db: Arc::new(db) })
    }

    pub fn get(&self, account: &str) -> EngineResult<Option<AccountRecord>> {
        match self.db.get(account.as_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Persist a record; returns only after the write is durable
    pub fn put(&self, account: &str, record: &AccountRecord) -> EngineResult<()> {
        let bytes = bincode::serialize(record)?;
        self.db.put(account.as_bytes(), bytes)?;
        self.db.flush()?;
        Ok(())
    }

    /// Scan every persisted account, used to hydrate the in-memory ledger
    pub fn load_all(&self) -> EngineResult<Vec<(String, AccountRecord)>> {
        let mut records = Vec::new();
        for entry in self.db.iterator(IteratorMode::Start) {
            let (key, value) = entry?;
            let account = String::from_utf8_lossy(&key).into_owned();
            let record: AccountRecord = bincode::deserialize(&value)?;
            records.push((account, record));
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_account_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = LedgerStore::open(dir.path(), 4).unwrap();
        assert_eq!(store.get("nobody").unwrap(), None);
    }

    #[test]
    fn test_put_get_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = LedgerStore::open(dir.path(), 4).unwrap();

        let record = AccountRecord {
            balance: 250,
            lifetime_earned: 1_000,
        };
        store.put("alice", &record).unwrap();
        assert_eq!(store.get("alice").unwrap(), Some(record));
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = LedgerStore::open(dir.path(), 4).unwrap();
            store
                .put(
                    "bob",
                    &AccountRecord {
                        balance: 77,
                        lifetime_earned: 77,
                    },
                )
                .unwrap();
        }

        let reopened = LedgerStore::open(dir.path(), 4).unwrap();
        let record = reopened.get("bob").unwrap().unwrap();
        assert_eq!(record.balance, 77);
    }

    #[test]
    fn test_load_all_sees_every_account() {
        let dir = tempfile::tempdir().unwrap();
        let store = LedgerStore::open(dir.path(), 4).unwrap();
        for (i, name) in ["a", "b", "c"].iter().enumerate() {
            store
                .put(
                    name,
                    &AccountRecord {
                        balance: i as u64,
                        lifetime_earned: i as u64,
                    },
                )
                .unwrap();
        }

        let mut all = store.load_all().unwrap();
        all.sort_by(|x, y| x.0.cmp(&y.0));
        assert_eq!(all.len(), 3);
        assert_eq!(all[2].0, "c");
        assert_eq!(all[2].1.balance, 2);
    }
}
