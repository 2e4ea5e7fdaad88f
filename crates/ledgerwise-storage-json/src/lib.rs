use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
    sync::Mutex,
};

use chrono::{DateTime, NaiveDateTime, Utc};
use ledgerwise_core::{
    storage::{AggregateBackup, LedgerStore},
    CoreError,
};
use ledgerwise_domain::{LedgerEntry, LedgerTable, UserAggregate, UserId};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info};

const JSON_EXTENSION: &str = "json";
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S%3f";
const TMP_SUFFIX: &str = "tmp";
const DEFAULT_RETENTION: usize = 5;
const USERS_DIR: &str = "users";
const ENTRIES_DIR: &str = "entries";
const BACKUPS_DIR: &str = "backups";
const AGGREGATE_FILE: &str = "aggregate.json";
const PROFILE_FILE: &str = "user.json";
const AGGREGATE_BACKUP_PREFIX: &str = "aggregate";
const MAX_SLUG_LEN: usize = 24;

/// Filesystem-backed JSON persistence: one directory per user holding the
/// raw tables, the aggregate row and timestamped aggregate backups.
///
/// User directories are named `<slug>-<hex of the exact id>`, so ids that
/// differ only in case or punctuation never share a directory.
pub struct JsonLedgerStore {
    root: PathBuf,
    retention: usize,
    write_lock: Mutex<()>,
}

#[derive(Serialize, Deserialize)]
struct UserProfile {
    id: UserId,
}

impl JsonLedgerStore {
    pub fn new(root: PathBuf) -> Result<Self, CoreError> {
        Self::with_retention(root, DEFAULT_RETENTION)
    }

    pub fn with_retention(root: PathBuf, retention: usize) -> Result<Self, CoreError> {
        fs::create_dir_all(root.join(USERS_DIR))?;
        Ok(Self {
            root,
            retention: retention.max(1),
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn user_dir(&self, user: &UserId) -> PathBuf {
        self.root.join(USERS_DIR).join(user_dir_name(user.as_str()))
    }

    pub fn table_path(&self, user: &UserId, table: LedgerTable) -> PathBuf {
        self.user_dir(user)
            .join(ENTRIES_DIR)
            .join(format!("{}.{}", table.name(), JSON_EXTENSION))
    }

    pub fn aggregate_path(&self, user: &UserId) -> PathBuf {
        self.user_dir(user).join(AGGREGATE_FILE)
    }

    fn backup_dir(&self, user: &UserId) -> PathBuf {
        self.user_dir(user).join(BACKUPS_DIR)
    }

    fn backup_files(&self, user: &UserId) -> Result<Vec<(AggregateBackup, PathBuf)>, CoreError> {
        let dir = self.backup_dir(user);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut backups = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            if !is_backup_file_name(file_name) {
                continue;
            }
            let backup = AggregateBackup {
                id: file_name.to_string(),
                created_at: parse_backup_timestamp(file_name),
                size_bytes: fs::metadata(&path).map(|meta| meta.len()).unwrap_or(0),
            };
            backups.push((backup, path));
        }
        backups.sort_by(|(a, _), (b, _)| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(backups)
    }

    fn read_aggregate(&self, user: &UserId) -> Result<UserAggregate, CoreError> {
        let path = self.aggregate_path(user);
        if !path.exists() {
            return Ok(UserAggregate::default());
        }
        read_json(&path)
    }

    fn write_aggregate(&self, user: &UserId, aggregate: &UserAggregate) -> Result<(), CoreError> {
        let path = self.aggregate_path(user);
        self.backup_existing_aggregate(user, &path)?;
        self.ensure_profile(user)?;
        save_json(&path, aggregate)
    }

    fn backup_existing_aggregate(&self, user: &UserId, path: &Path) -> Result<(), CoreError> {
        if !path.exists() {
            return Ok(());
        }
        let dir = self.backup_dir(user);
        fs::create_dir_all(&dir)?;
        let timestamp = Utc::now().format(BACKUP_TIMESTAMP_FORMAT).to_string();
        let backup_path = dir.join(format!(
            "{}_{}.{}",
            AGGREGATE_BACKUP_PREFIX, timestamp, JSON_EXTENSION
        ));
        fs::copy(path, &backup_path)?;
        self.prune_backups(user)
    }

    fn prune_backups(&self, user: &UserId) -> Result<(), CoreError> {
        for (_, stale) in self.backup_files(user)?.into_iter().skip(self.retention) {
            let _ = fs::remove_file(stale);
        }
        Ok(())
    }

    fn ensure_profile(&self, user: &UserId) -> Result<(), CoreError> {
        let path = self.user_dir(user).join(PROFILE_FILE);
        if path.exists() {
            return Ok(());
        }
        save_json(&path, &UserProfile { id: user.clone() })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>, CoreError> {
        self.write_lock
            .lock()
            .map_err(|_| CoreError::Storage("json store lock poisoned".into()))
    }
}

impl LedgerStore for JsonLedgerStore {
    fn insert_entry(&self, entry: &LedgerEntry) -> Result<(), CoreError> {
        let _guard = self.lock()?;
        let path = self.table_path(&entry.user, entry.table());
        let mut rows: Vec<LedgerEntry> = if path.exists() {
            read_json(&path)?
        } else {
            Vec::new()
        };
        rows.push(entry.clone());
        self.ensure_profile(&entry.user)?;
        save_json(&path, &rows)?;
        debug!(user = %entry.user, table = %entry.table(), rows = rows.len(), "appended entry");
        Ok(())
    }

    fn entries(
        &self,
        user: &UserId,
        tables: &[LedgerTable],
    ) -> Result<Vec<LedgerEntry>, CoreError> {
        let mut entries = Vec::new();
        for table in tables {
            let path = self.table_path(user, *table);
            if path.exists() {
                let rows: Vec<LedgerEntry> = read_json(&path)?;
                entries.extend(rows.into_iter().filter(|entry| entry.user == *user));
            }
        }
        Ok(entries)
    }

    fn load_aggregate(&self, user: &UserId) -> Result<UserAggregate, CoreError> {
        self.read_aggregate(user)
    }

    fn store_aggregate(
        &self,
        user: &UserId,
        aggregate: &UserAggregate,
        expected_version: u64,
    ) -> Result<u64, CoreError> {
        let _guard = self.lock()?;
        let found = self.read_aggregate(user)?.version;
        if found != expected_version {
            return Err(CoreError::VersionConflict {
                user: user.clone(),
                expected: expected_version,
                found,
            });
        }
        let mut stored = aggregate.clone();
        stored.version = expected_version + 1;
        self.write_aggregate(user, &stored)?;
        Ok(stored.version)
    }

    fn list_users(&self) -> Result<Vec<UserId>, CoreError> {
        let users_dir = self.root.join(USERS_DIR);
        if !users_dir.exists() {
            return Ok(Vec::new());
        }
        let mut users = Vec::new();
        for entry in fs::read_dir(users_dir)? {
            let profile = entry?.path().join(PROFILE_FILE);
            if profile.is_file() {
                let profile: UserProfile = read_json(&profile)?;
                users.push(profile.id);
            }
        }
        users.sort();
        Ok(users)
    }

    fn aggregate_backups(&self, user: &UserId) -> Result<Vec<AggregateBackup>, CoreError> {
        Ok(self
            .backup_files(user)?
            .into_iter()
            .map(|(backup, _)| backup)
            .collect())
    }

    fn restore_aggregate_backup(
        &self,
        user: &UserId,
        id: &str,
    ) -> Result<UserAggregate, CoreError> {
        let path = self.backup_dir(user).join(id);
        if !is_backup_file_name(id) || !path.is_file() {
            return Err(CoreError::BackupNotFound(id.to_string()));
        }
        let _guard = self.lock()?;
        let mut restored: UserAggregate = read_json(&path)?;
        let current = self.read_aggregate(user)?;
        restored.version = current.version + 1;
        self.write_aggregate(user, &restored)?;
        info!(user = %user, backup = id, version = restored.version, "restored aggregate backup");
        Ok(restored)
    }
}

/// Readable prefix plus the hex bytes of the exact id.
fn user_dir_name(id: &str) -> String {
    let slug: String = id
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '-' => c,
            _ => '_',
        })
        .take(MAX_SLUG_LEN)
        .collect();
    let slug = if slug.trim_matches('_').is_empty() {
        "user"
    } else {
        slug.as_str()
    };
    let hex: String = id.bytes().map(|byte| format!("{byte:02x}")).collect();
    format!("{slug}-{hex}")
}

fn is_backup_file_name(name: &str) -> bool {
    !name.contains(['/', '\\'])
        && name.starts_with(&format!("{}_", AGGREGATE_BACKUP_PREFIX))
        && name.ends_with(&format!(".{}", JSON_EXTENSION))
}

fn parse_backup_timestamp(name: &str) -> Option<DateTime<Utc>> {
    let trimmed = name.strip_suffix(&format!(".{}", JSON_EXTENSION))?;
    let stamp = trimmed.strip_prefix(&format!("{}_", AGGREGATE_BACKUP_PREFIX))?;
    NaiveDateTime::parse_from_str(stamp, BACKUP_TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CoreError> {
    let data = fs::read_to_string(path)?;
    serde_json::from_str(&data)
        .map_err(|err| CoreError::Serde(format!("{}: {}", path.display(), err)))
}

/// Writes pretty JSON to a sibling temp file and renames it into place.
fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let data = serde_json::to_string_pretty(value)?;
    let tmp = tmp_path(path);
    let mut file = File::create(&tmp)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    fs::rename(&tmp, path)?;
    Ok(())
}
