//! Application facade: wires configuration, the JSON store, the chat
//! extractor and the metric services behind one per-user handle.

use std::{path::PathBuf, sync::Arc, time::Duration};

use chrono::NaiveDate;
use ledgerwise_ai::{ChatExtractor, ChatExtractorConfig};
use ledgerwise_config::{Config, ConfigBackup, ConfigManager};
use ledgerwise_core::{
    AggregateBackup, AggregateWriter, Clock, Dashboard, DashboardService, DashboardSettings,
    ExtractionService, FallbackCause, LedgerStore, RecordedTransaction, SystemClock, TableData,
    TransactionExtractor, TransactionRecorder, WageService, WriteOutcome,
};
use ledgerwise_domain::{LedgerTable, MoneyFormat, Month, Session, UserAggregate, UserId};
use ledgerwise_storage_json::JsonLedgerStore;
use serde_json::Value;
use tracing::info;

use crate::errors::AppError;

/// Overrides the base directory for config and data.
pub const HOME_ENV: &str = "LEDGERWISE_HOME";
pub const DEFAULT_USER: &str = "default";

/// What a free-text `record` call did.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordOutcome {
    pub recorded: RecordedTransaction,
    pub assumptions: Vec<String>,
    /// Set when the extractor failed or answered with something unusable and
    /// the generic record was saved instead.
    pub fallback: Option<FallbackCause>,
}

impl RecordOutcome {
    pub fn tables(&self) -> Vec<&'static str> {
        self.recorded
            .entries
            .iter()
            .map(|entry| entry.table().name())
            .collect()
    }

    pub fn summary(&self) -> String {
        format!("Successfully saved to {}", self.tables().join(", "))
    }
}

pub struct LedgerApp {
    config_manager: ConfigManager,
    config: Config,
    writer: AggregateWriter<dyn LedgerStore>,
    extractor: Box<dyn TransactionExtractor>,
    clock: Arc<dyn Clock>,
    user: UserId,
}

impl LedgerApp {
    /// Opens the app under `$LEDGERWISE_HOME`, or the platform config and
    /// data directories when it is unset.
    pub fn open() -> Result<Self, AppError> {
        if let Some(home) = std::env::var_os(HOME_ENV) {
            return Self::with_base_dir(PathBuf::from(home));
        }
        let base = dirs::config_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ledgerwise");
        let manager = ConfigManager::with_base_dir(base)?;
        let config = manager.load()?;
        let data_root = config.resolve_data_root();
        Self::from_config(manager, config, data_root)
    }

    /// Keeps config under `<base>/config` and ledgers under `<base>/data`
    /// unless the config names another data root.
    pub fn with_base_dir(base: PathBuf) -> Result<Self, AppError> {
        let manager = ConfigManager::with_base_dir(base.clone())?;
        let config = manager.load()?;
        let data_root = config
            .data_root
            .clone()
            .unwrap_or_else(|| base.join("data"));
        Self::from_config(manager, config, data_root)
    }

    fn from_config(
        config_manager: ConfigManager,
        config: Config,
        data_root: PathBuf,
    ) -> Result<Self, AppError> {
        let store = JsonLedgerStore::with_retention(data_root, config.backup_retention)?;
        let settings = &config.extractor;
        let extractor = ChatExtractor::new(
            ChatExtractorConfig {
                endpoint: settings.endpoint.clone(),
                model: settings.model.clone(),
                api_key: None,
                temperature: settings.temperature,
                max_tokens: settings.max_tokens,
                timeout: Duration::from_secs(settings.timeout_secs),
            }
            .with_key_from_env(&settings.api_key_env),
        )
        .map_err(|err| AppError::Extractor(format!("{err:#}")))?;

        Ok(Self::with_components(
            config_manager,
            config,
            Arc::new(store),
            Box::new(extractor),
            Arc::new(SystemClock),
        ))
    }

    pub fn with_components(
        config_manager: ConfigManager,
        config: Config,
        store: Arc<dyn LedgerStore>,
        extractor: Box<dyn TransactionExtractor>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let user = config
            .default_user
            .as_deref()
            .map(UserId::new)
            .unwrap_or_else(|| UserId::new(DEFAULT_USER));
        Self {
            config_manager,
            config,
            writer: AggregateWriter::new(store),
            extractor,
            clock,
            user,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn user(&self) -> &UserId {
        &self.user
    }

    pub fn session(&self) -> Session {
        Session::new(self.user.clone(), self.clock.now())
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Amount formatting for the configured currency and locale.
    pub fn money_format(&self) -> MoneyFormat {
        MoneyFormat::new(&self.config.currency, &self.config.locale)
    }

    pub fn users(&self) -> Result<Vec<UserId>, AppError> {
        Ok(self.writer.store().list_users()?)
    }

    /// Makes `name` the active user and remembers it as the default.
    pub fn switch_user(&mut self, name: &str) -> Result<(), AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Invalid("user name must not be empty".into()));
        }
        self.user = UserId::new(name);
        self.config.default_user = Some(name.to_string());
        self.config_manager.save(&self.config)?;
        info!(user = %self.user, "switched user");
        Ok(())
    }

    /// Structures free text with the extractor and saves every proposed
    /// table write for the active user.
    pub fn record(&self, text: &str) -> Result<RecordOutcome, AppError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::Invalid("describe the transaction to record".into()));
        }
        let session = self.session();
        let outcome =
            ExtractionService::process(self.extractor.as_ref(), text, self.clock.as_ref());
        let recorded = TransactionRecorder::new(&self.writer).save(
            &session,
            &outcome.response.tables,
            session.issued_at,
        )?;
        Ok(RecordOutcome {
            recorded,
            assumptions: outcome.response.assumptions,
            fallback: outcome.fallback,
        })
    }

    /// Saves one row without going through the extractor.
    pub fn add(&self, table: &str, data: Value) -> Result<RecordedTransaction, AppError> {
        if LedgerTable::from_name(table).is_none() {
            let known: Vec<_> = LedgerTable::ALL.iter().map(|table| table.name()).collect();
            return Err(AppError::Invalid(format!(
                "unknown table `{table}` (expected one of: {})",
                known.join(", ")
            )));
        }
        let session = self.session();
        let tables = [TableData {
            name: table.to_string(),
            data,
        }];
        Ok(TransactionRecorder::new(&self.writer).save(&session, &tables, session.issued_at)?)
    }

    pub fn aggregate(&self) -> Result<UserAggregate, AppError> {
        Ok(self.writer.load(&self.session())?)
    }

    pub fn dashboard_settings(&self, month: Option<Month>) -> DashboardSettings {
        let metrics = &self.config.metrics;
        DashboardSettings {
            forecast_lookback_months: metrics.forecast_lookback_months,
            savings_history_months: metrics.savings_history_months,
            trend_months: metrics.trend_months,
            net_worth_granularity: metrics.net_worth_granularity,
            extra_debt_payment: metrics.extra_debt_payment,
            month,
            money: self.money_format(),
        }
    }

    pub fn dashboard(&self, month: Option<Month>) -> Result<Dashboard, AppError> {
        let aggregate = self.aggregate()?;
        let settings = self.dashboard_settings(month);
        Ok(DashboardService::build(&aggregate, self.clock.today(), &settings))
    }

    pub fn rebuild(&self) -> Result<WriteOutcome, AppError> {
        Ok(self.writer.rebuild(&self.session())?)
    }

    /// Aggregate snapshots kept for the active user, newest first.
    pub fn aggregate_backups(&self) -> Result<Vec<AggregateBackup>, AppError> {
        Ok(self.writer.backups(&self.session())?)
    }

    pub fn restore_aggregate(&self, id: &str) -> Result<UserAggregate, AppError> {
        let session = self.session();
        let restored = self.writer.restore_backup(&session, id.trim())?;
        Ok(restored)
    }

    pub fn backup_config(&self, note: Option<&str>) -> Result<ConfigBackup, AppError> {
        let backup = self.config_manager.backup(&self.config, note)?;
        info!(backup = %backup.name, "backed up config");
        Ok(backup)
    }

    pub fn config_backups(&self) -> Result<Vec<ConfigBackup>, AppError> {
        Ok(self.config_manager.list_backups()?)
    }

    /// Replaces the current config with the named backup. The active user
    /// follows the restored default user when it names one.
    pub fn restore_config(&mut self, name: &str) -> Result<&Config, AppError> {
        self.config = self.config_manager.restore(name.trim())?;
        if let Some(user) = self.config.default_user.as_deref() {
            self.user = UserId::new(user);
        }
        info!(backup = name, user = %self.user, "restored config");
        Ok(&self.config)
    }

    pub fn set_wage(&self, wage: Option<f64>) -> Result<WriteOutcome, AppError> {
        Ok(self.writer.set_true_hourly_wage(&self.session(), wage)?)
    }

    /// Derives the wage from monthly net pay, work-related costs and hours
    /// worked, then stores it.
    pub fn derive_wage(
        &self,
        net_income: f64,
        work_costs: f64,
        hours: f64,
    ) -> Result<WriteOutcome, AppError> {
        let wage = WageService::true_hourly_wage(net_income, work_costs, hours).ok_or_else(|| {
            AppError::Invalid("net income must exceed work costs and hours must be positive".into())
        })?;
        self.set_wage(Some(wage))
    }
}
