use std::path::PathBuf;

use ledgerwise_domain::Granularity;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Stores user-configurable preferences for the ledger service and CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub locale: String,
    pub currency: String,
    #[serde(default = "Config::default_ui_color_enabled")]
    pub ui_color_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_user: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Optional custom directory for ledger data. Defaults to `<data dir>/ledgerwise`.
    pub data_root: Option<PathBuf>,

    #[serde(default = "Config::default_backup_retention")]
    pub backup_retention: usize,
    #[serde(default)]
    pub extractor: ExtractorSettings,
    #[serde(default)]
    pub metrics: MetricSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            locale: "en-US".into(),
            currency: "USD".into(),
            ui_color_enabled: Self::default_ui_color_enabled(),
            default_user: None,
            data_root: None,
            backup_retention: Self::default_backup_retention(),
            extractor: ExtractorSettings::default(),
            metrics: MetricSettings::default(),
        }
    }
}

impl Config {
    pub fn default_ui_color_enabled() -> bool {
        true
    }

    pub fn default_backup_retention() -> usize {
        5
    }

    /// Directory holding user ledgers when `data_root` is unset.
    pub fn resolve_data_root(&self) -> PathBuf {
        if let Some(path) = &self.data_root {
            return path.clone();
        }

        let base = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        base.join("ledgerwise")
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: &str| ConfigError::Invalid {
            key: key.to_string(),
            message: message.to_string(),
        };
        if self.currency.trim().is_empty() {
            return Err(invalid("currency", "must not be empty"));
        }
        if !(0.0..=2.0).contains(&self.extractor.temperature) {
            return Err(invalid("extractor.temperature", "must be between 0 and 2"));
        }
        if self.extractor.max_tokens == 0 {
            return Err(invalid("extractor.max_tokens", "must be positive"));
        }
        if self.extractor.timeout_secs == 0 {
            return Err(invalid("extractor.timeout_secs", "must be positive"));
        }
        if self.metrics.forecast_lookback_months == 0 {
            return Err(invalid("metrics.forecast_lookback_months", "must be at least 1"));
        }
        if self.metrics.trend_months == 0 {
            return Err(invalid("metrics.trend_months", "must be at least 1"));
        }
        if !self.metrics.extra_debt_payment.is_finite() || self.metrics.extra_debt_payment < 0.0 {
            return Err(invalid("metrics.extra_debt_payment", "must be a non-negative amount"));
        }
        Ok(())
    }
}

/// Connection settings for the chat-completions extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorSettings {
    pub endpoint: String,
    pub model: String,
    /// Name of the environment variable holding the bearer key.
    pub api_key_env: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".into(),
            model: "gpt-3.5-turbo".into(),
            api_key_env: "OPENAI_API_KEY".into(),
            temperature: 0.3,
            max_tokens: 500,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricSettings {
    pub forecast_lookback_months: usize,
    pub savings_history_months: usize,
    pub trend_months: usize,
    pub net_worth_granularity: Granularity,
    pub extra_debt_payment: f64,
}

impl Default for MetricSettings {
    fn default() -> Self {
        Self {
            forecast_lookback_months: 3,
            savings_history_months: 6,
            trend_months: 6,
            net_worth_granularity: Granularity::Yearly,
            extra_debt_payment: 0.0,
        }
    }
}
