use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

use crate::{Config, ConfigError};

const CONFIG_FILE: &str = "config.json";
const BACKUP_PREFIX: &str = "config_";
const AUTO_NOTE: &str = "auto";
const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S%3f";
/// Length of a rendered `STAMP_FORMAT`.
const STAMP_LEN: usize = 18;

/// One saved copy of the config under the backups directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigBackup {
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl ConfigBackup {
    fn from_name(name: String) -> Self {
        let created_at = parse_stamp(&name);
        Self { name, created_at }
    }

    /// Written by [`ConfigManager::save`] rather than on request.
    pub fn is_automatic(&self) -> bool {
        self.name.ends_with(&format!("_{AUTO_NOTE}.json"))
    }
}

/// Loads and saves [`Config`] atomically and keeps timestamped backups.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_path: PathBuf,
    backups_dir: PathBuf,
}

impl ConfigManager {
    pub fn new(config_path: PathBuf, backups_dir: PathBuf) -> Self {
        Self {
            config_path,
            backups_dir,
        }
    }

    /// Lays out `<base>/config/config.json` and `<base>/config/backups`.
    pub fn with_base_dir(base: PathBuf) -> Result<Self, ConfigError> {
        let config_dir = base.join("config");
        let backups_dir = config_dir.join("backups");
        fs::create_dir_all(&backups_dir)?;
        Ok(Self::new(config_dir.join(CONFIG_FILE), backups_dir))
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn backups_dir(&self) -> &Path {
        &self.backups_dir
    }

    /// The stored config, or the defaults when nothing has been saved yet.
    pub fn load(&self) -> Result<Config, ConfigError> {
        match read_config(&self.config_path) {
            Err(ConfigError::Io(err)) if err.kind() == io::ErrorKind::NotFound => {
                Ok(Config::default())
            }
            other => other,
        }
    }

    /// Validates and writes `config`. The file being replaced is kept as an
    /// automatic backup; at most `backup_retention` of those survive.
    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        config.validate()?;
        if config.backup_retention > 0 && self.config_path.exists() {
            let name = backup_name(Utc::now(), Some(AUTO_NOTE));
            fs::create_dir_all(&self.backups_dir)?;
            fs::copy(&self.config_path, self.backups_dir.join(name))?;
            self.prune_automatic(config.backup_retention)?;
        }
        write_json(&self.config_path, config)
    }

    /// Writes a copy of `config` into the backups directory.
    pub fn backup(
        &self,
        config: &Config,
        note: Option<&str>,
    ) -> Result<ConfigBackup, ConfigError> {
        let name = backup_name(Utc::now(), note);
        write_json(&self.backups_dir.join(&name), config)?;
        Ok(ConfigBackup::from_name(name))
    }

    /// Makes the named backup the current config and returns it.
    pub fn restore(&self, name: &str) -> Result<Config, ConfigError> {
        let path = self.backups_dir.join(name);
        if !name.starts_with(BACKUP_PREFIX) || name.contains(['/', '\\']) || !path.is_file() {
            return Err(ConfigError::BackupNotFound(name.to_string()));
        }
        let config = read_config(&path)?;
        self.save(&config)?;
        Ok(config)
    }

    /// Backups, newest first.
    pub fn list_backups(&self) -> Result<Vec<ConfigBackup>, ConfigError> {
        let entries = match fs::read_dir(&self.backups_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut backups = Vec::new();
        for entry in entries {
            let name = entry?.file_name().to_string_lossy().into_owned();
            if name.starts_with(BACKUP_PREFIX) && name.ends_with(".json") {
                backups.push(ConfigBackup::from_name(name));
            }
        }
        backups.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.name.cmp(&a.name))
        });
        Ok(backups)
    }

    fn prune_automatic(&self, keep: usize) -> Result<(), ConfigError> {
        let stale = self
            .list_backups()?
            .into_iter()
            .filter(ConfigBackup::is_automatic)
            .skip(keep);
        for backup in stale {
            fs::remove_file(self.backups_dir.join(&backup.name))?;
        }
        Ok(())
    }
}

fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let raw = fs::read_to_string(path)?;
    let config: Config =
        serde_json::from_str(&raw).map_err(|err| ConfigError::Serde(err.to_string()))?;
    config.validate()?;
    Ok(config)
}

/// Pretty JSON to `<path>.tmp`, then renamed over `path`.
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    {
        let mut writer = BufWriter::new(File::create(&tmp)?);
        serde_json::to_writer_pretty(&mut writer, value)
            .map_err(|err| ConfigError::Serde(err.to_string()))?;
        writer.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

fn backup_name(at: DateTime<Utc>, note: Option<&str>) -> String {
    let stamp = at.format(STAMP_FORMAT);
    match note.and_then(slug) {
        Some(label) => format!("{BACKUP_PREFIX}{stamp}_{label}.json"),
        None => format!("{BACKUP_PREFIX}{stamp}.json"),
    }
}

/// Lowercase ASCII words joined by single dashes.
fn slug(note: &str) -> Option<String> {
    let words: Vec<String> = note
        .split(|ch: char| !ch.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_ascii_lowercase)
        .collect();
    (!words.is_empty()).then(|| words.join("-"))
}

fn parse_stamp(name: &str) -> Option<DateTime<Utc>> {
    let stamp = name.strip_prefix(BACKUP_PREFIX)?.get(..STAMP_LEN)?;
    NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn notes_become_slugs() {
        assert_eq!(slug("  Before Upgrade! "), Some("before-upgrade".into()));
        assert_eq!(slug("***"), None);
    }

    #[test]
    fn names_round_trip_their_timestamp() {
        let at = Utc.with_ymd_and_hms(2024, 6, 15, 9, 30, 0).unwrap();
        let name = backup_name(at, Some("pre move"));
        assert_eq!(name, "config_20240615_093000000_pre-move.json");
        assert_eq!(parse_stamp(&name), Some(at));
        assert!(parse_stamp("notes.json").is_none());
        assert!(ConfigBackup::from_name(backup_name(at, Some(AUTO_NOTE))).is_automatic());
    }
}
