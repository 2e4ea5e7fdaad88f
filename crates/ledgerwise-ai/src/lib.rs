//! Chat-completions client that turns free-text transactions into table writes.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use ledgerwise_core::{CoreError, TransactionExtractor};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// System prompt describing the ledger tables and the expected JSON reply.
pub const TRANSACTION_PROMPT: &str = r#"You are a transaction processor for a personal finance database. Given a short transaction description:

1. Decide which table(s) should receive a new row. Options: expenses, income, liabilities, savings, savings_stock, long_term_assets.
2. For each table, give the complete row to insert.
3. Reply with a single valid JSON object and nothing else.

Tables:
- expenses: amount, category, payment_method, timestamp, recurring
- income: amount, source, timestamp, recurring
- liabilities: amount, name, interest_rate, minimum_payment, outstanding_balance, start_date, due_date, interest_type, payment_frequency, status, timestamp, recurring
- savings: goal, target_amount, current_amount, target_date, timestamp, recurring
- savings_stock: stock_symbol, amount_invested, current_value, timestamp, recurring
- long_term_assets: amount, description, timestamp

Example for "Paid $45.99 for groceries using my credit card":
{
  "tables": [
    {
      "name": "expenses",
      "data": {
        "amount": 45.99,
        "category": "groceries",
        "payment_method": "credit card",
        "timestamp": "[current_timestamp]",
        "recurring": false
      }
    }
  ],
  "assumptions": [
    "Used current timestamp for the transaction",
    "Assumed this is not a recurring expense"
  ]
}

List any assumptions you made about missing information in "assumptions"."#;

/// Connection settings for an OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct ChatExtractorConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl ChatExtractorConfig {
    /// Reads the bearer key from the environment variable `api_key_env`.
    pub fn with_key_from_env(mut self, api_key_env: &str) -> Self {
        self.api_key = std::env::var(api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty());
        self
    }
}

impl Default for ChatExtractorConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            api_key: None,
            temperature: 0.3,
            max_tokens: 500,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Blocking chat-completions client implementing [`TransactionExtractor`].
#[derive(Debug, Clone)]
pub struct ChatExtractor {
    http: Client,
    endpoint: Url,
    config: ChatExtractorConfig,
}

impl ChatExtractor {
    pub fn new(config: ChatExtractorConfig) -> Result<Self> {
        let endpoint = validate_endpoint(&config.endpoint)?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            endpoint,
            config,
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Single-turn chat call returning the trimmed assistant content.
    pub fn chat(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("No API key configured for the transaction extractor"))?;

        let request = self.request(system_prompt, user_prompt);
        let response = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .with_context(|| format!("POST {} failed", self.endpoint))?;
        let status = response.status();
        let body = response
            .text()
            .with_context(|| format!("Failed to read response body from {}", self.endpoint))?;
        debug!(%status, bytes = body.len(), "chat completion returned");

        let content = parse_completion(&body)?;
        if !status.is_success() {
            return Err(anyhow!("{} returned status {status}", self.endpoint));
        }
        Ok(content)
    }

    fn request(&self, system_prompt: &str, user_prompt: &str) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: user_prompt.to_string(),
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        }
    }
}

impl TransactionExtractor for ChatExtractor {
    fn extract(&self, input: &str) -> Result<String, CoreError> {
        self.chat(TRANSACTION_PROMPT, input)
            .map_err(|err| CoreError::Extraction(format!("{err:#}")))
    }
}

/// Pulls the first choice's content out of a chat-completions body, surfacing
/// API error messages.
pub fn parse_completion(body: &str) -> Result<String> {
    let response: ChatResponse =
        serde_json::from_str(body).context("Failed to parse chat completion response")?;
    if let Some(error) = response.error {
        return Err(anyhow!(error
            .message
            .unwrap_or_else(|| "Error processing transaction".to_string())));
    }
    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content.trim().to_string())
        .ok_or_else(|| anyhow!("Chat completion had no choices"))
}

fn validate_endpoint(endpoint: &str) -> Result<Url> {
    let url = Url::parse(endpoint)
        .with_context(|| format!("Invalid extractor endpoint: {endpoint}"))?;
    match url.scheme() {
        "https" | "http" => Ok(url),
        other => Err(anyhow!(
            "Unsupported scheme '{other}' for extractor endpoint {endpoint}"
        )),
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: Option<String>,
}
