use std::{
    collections::{HashMap, HashSet},
    sync::RwLock,
};

use chrono::{DateTime, Utc};
use ledgerwise_domain::{LedgerEntry, LedgerTable, UserAggregate, UserId};

use crate::CoreError;

/// Abstraction over persistence backends holding raw ledger rows and the
/// per-user aggregate row.
pub trait LedgerStore: Send + Sync {
    /// Appends an immutable entry to its table.
    fn insert_entry(&self, entry: &LedgerEntry) -> Result<(), CoreError>;

    /// All of the user's entries stored in `tables`.
    fn entries(
        &self,
        user: &UserId,
        tables: &[LedgerTable],
    ) -> Result<Vec<LedgerEntry>, CoreError>;

    /// The stored aggregate, or an empty one at version 0 when the user has none.
    fn load_aggregate(&self, user: &UserId) -> Result<UserAggregate, CoreError>;

    /// Stores `aggregate` if the persisted row is still at `expected_version`,
    /// returning the new version. Fails with [`CoreError::VersionConflict`]
    /// otherwise.
    fn store_aggregate(
        &self,
        user: &UserId,
        aggregate: &UserAggregate,
        expected_version: u64,
    ) -> Result<u64, CoreError>;

    fn list_users(&self) -> Result<Vec<UserId>, CoreError>;

    /// Earlier aggregate rows kept by the backend, newest first.
    fn aggregate_backups(&self, _user: &UserId) -> Result<Vec<AggregateBackup>, CoreError> {
        Ok(Vec::new())
    }

    /// Puts backup `id` back in place as the next version of the user's
    /// aggregate and returns it.
    fn restore_aggregate_backup(
        &self,
        _user: &UserId,
        id: &str,
    ) -> Result<UserAggregate, CoreError> {
        Err(CoreError::BackupNotFound(id.to_string()))
    }
}

/// A stored copy of a previous aggregate row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateBackup {
    pub id: String,
    pub created_at: Option<DateTime<Utc>>,
    pub size_bytes: u64,
}

#[derive(Default)]
struct MemoryState {
    entries: HashMap<UserId, Vec<LedgerEntry>>,
    aggregates: HashMap<UserId, UserAggregate>,
    failing_tables: HashSet<LedgerTable>,
}

/// Process-local store used by tests and script sessions.
#[derive(Default)]
pub struct InMemoryLedgerStore {
    state: RwLock<MemoryState>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent insert into `table` fail.
    pub fn fail_inserts_into(&self, table: LedgerTable) {
        if let Ok(mut state) = self.state.write() {
            state.failing_tables.insert(table);
        }
    }

    /// Overwrites the stored aggregate without a version check.
    pub fn put_aggregate(&self, user: &UserId, aggregate: UserAggregate) -> Result<(), CoreError> {
        let mut state = self.write()?;
        state.aggregates.insert(user.clone(), aggregate);
        Ok(())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, MemoryState>, CoreError> {
        self.state
            .read()
            .map_err(|_| CoreError::Storage("in-memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, MemoryState>, CoreError> {
        self.state
            .write()
            .map_err(|_| CoreError::Storage("in-memory store lock poisoned".into()))
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn insert_entry(&self, entry: &LedgerEntry) -> Result<(), CoreError> {
        let mut state = self.write()?;
        if state.failing_tables.contains(&entry.table()) {
            return Err(CoreError::Storage(format!(
                "table `{}` rejected the row",
                entry.table()
            )));
        }
        state
            .entries
            .entry(entry.user.clone())
            .or_default()
            .push(entry.clone());
        Ok(())
    }

    fn entries(
        &self,
        user: &UserId,
        tables: &[LedgerTable],
    ) -> Result<Vec<LedgerEntry>, CoreError> {
        let state = self.read()?;
        Ok(state
            .entries
            .get(user)
            .map(|rows| {
                rows.iter()
                    .filter(|entry| tables.contains(&entry.table()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn load_aggregate(&self, user: &UserId) -> Result<UserAggregate, CoreError> {
        let state = self.read()?;
        Ok(state.aggregates.get(user).cloned().unwrap_or_default())
    }

    fn store_aggregate(
        &self,
        user: &UserId,
        aggregate: &UserAggregate,
        expected_version: u64,
    ) -> Result<u64, CoreError> {
        let mut state = self.write()?;
        let found = state.aggregates.get(user).map(|a| a.version).unwrap_or(0);
        if found != expected_version {
            return Err(CoreError::VersionConflict {
                user: user.clone(),
                expected: expected_version,
                found,
            });
        }
        let mut stored = aggregate.clone();
        stored.version = expected_version + 1;
        let version = stored.version;
        state.aggregates.insert(user.clone(), stored);
        Ok(version)
    }

    fn list_users(&self) -> Result<Vec<UserId>, CoreError> {
        let state = self.read()?;
        let mut users: Vec<UserId> = state
            .entries
            .keys()
            .chain(state.aggregates.keys())
            .cloned()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        users.sort();
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_aggregate_rejects_stale_versions() {
        let store = InMemoryLedgerStore::new();
        let user = UserId::new("u1");
        let aggregate = UserAggregate::default();

        assert_eq!(store.store_aggregate(&user, &aggregate, 0).unwrap(), 1);
        let err = store.store_aggregate(&user, &aggregate, 0).unwrap_err();
        assert!(matches!(
            err,
            CoreError::VersionConflict {
                expected: 0,
                found: 1,
                ..
            }
        ));
        assert_eq!(store.load_aggregate(&user).unwrap().version, 1);
    }

    #[test]
    fn missing_aggregate_loads_as_default() {
        let store = InMemoryLedgerStore::new();
        let aggregate = store.load_aggregate(&UserId::new("nobody")).unwrap();
        assert_eq!(aggregate, UserAggregate::default());
        assert!(store.list_users().unwrap().is_empty());
    }
}
