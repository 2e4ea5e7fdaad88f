//! Turning language-model output into typed ledger entries.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use ledgerwise_domain::{
    AssetDetails, EntryKind, ExpenseCategory, LedgerEntry, LedgerTable, LiabilityDetails,
    PaymentMethod, Session,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{time::Clock, CoreError};

pub const FALLBACK_ASSUMPTION: &str = "Failed to parse transaction, using generic data";

/// One table write proposed by the extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableData {
    pub name: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResponse {
    pub tables: Vec<TableData>,
    #[serde(default)]
    pub assumptions: Vec<String>,
}

/// Text-to-structured-data collaborator. Returns the raw model content.
pub trait TransactionExtractor: Send + Sync {
    fn extract(&self, input: &str) -> Result<String, CoreError>;
}

/// Why the generic fallback record was used instead of the model's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackCause {
    ModelError(String),
    Unparseable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionOutcome {
    pub response: ExtractionResponse,
    pub fallback: Option<FallbackCause>,
}

pub struct ExtractionService;

impl ExtractionService {
    /// Asks the extractor to structure `input`. Never fails: model errors and
    /// unparseable answers both yield the fallback response.
    pub fn process(
        extractor: &dyn TransactionExtractor,
        input: &str,
        clock: &dyn Clock,
    ) -> ExtractionOutcome {
        let now = clock.now();
        match extractor.extract(input) {
            Ok(content) => match Self::try_parse(&content) {
                Some(response) => {
                    debug!(tables = response.tables.len(), "extracted transaction");
                    ExtractionOutcome {
                        response,
                        fallback: None,
                    }
                }
                None => {
                    warn!(content = %content, "could not parse extractor response; using fallback");
                    ExtractionOutcome {
                        response: Self::fallback(input, now),
                        fallback: Some(FallbackCause::Unparseable),
                    }
                }
            },
            Err(err) => {
                warn!(error = %err, "extractor call failed; using fallback");
                ExtractionOutcome {
                    response: Self::fallback(input, now),
                    fallback: Some(FallbackCause::ModelError(err.to_string())),
                }
            }
        }
    }

    /// Parses model content, substituting the fallback response when it is not
    /// usable.
    pub fn parse(content: &str, input: &str, now: DateTime<Utc>) -> ExtractionResponse {
        Self::try_parse(content).unwrap_or_else(|| Self::fallback(input, now))
    }

    /// Accepts bare JSON, JSON inside a markdown code fence, or JSON embedded
    /// in surrounding prose. Responses without tables are rejected.
    pub fn try_parse(content: &str) -> Option<ExtractionResponse> {
        let trimmed = content.trim();
        let candidates = [
            Some(trimmed),
            Self::fenced_block(trimmed),
            Self::braced_slice(trimmed),
        ];
        candidates
            .into_iter()
            .flatten()
            .find_map(|candidate| serde_json::from_str::<ExtractionResponse>(candidate).ok())
            .filter(|response| !response.tables.is_empty())
    }

    /// Generic zero-amount expense used whenever extraction is unusable.
    pub fn fallback(input: &str, now: DateTime<Utc>) -> ExtractionResponse {
        ExtractionResponse {
            tables: vec![TableData {
                name: LedgerTable::Expenses.name().to_string(),
                data: serde_json::json!({
                    "amount": 0,
                    "category": ExpenseCategory::Miscellaneous.label(),
                    "payment_method": "Debit",
                    "timestamp": now.to_rfc3339(),
                    "recurring": false,
                }),
            }],
            assumptions: vec![
                FALLBACK_ASSUMPTION.to_string(),
                format!("Original input: {input}"),
            ],
        }
    }

    /// Maps one proposed table write onto a typed entry owned by the session user.
    pub fn normalize(
        table: &TableData,
        session: &Session,
        now: DateTime<Utc>,
    ) -> Result<LedgerEntry, CoreError> {
        let kind = LedgerTable::from_name(&table.name).ok_or_else(|| {
            CoreError::Validation(format!("unsupported table `{}`", table.name.trim()))
        })?;
        let invalid = |message: String| CoreError::InvalidRecord {
            table: kind.name().to_string(),
            message,
        };

        let entry = match kind {
            LedgerTable::Expenses => {
                let raw: RawExpense = Self::decode(kind, &table.data)?;
                let amount = Self::amount(raw.amount).map_err(invalid)?;
                let kind = EntryKind::Expense {
                    category: raw
                        .category
                        .as_deref()
                        .map(ExpenseCategory::from_free_text)
                        .unwrap_or_default(),
                    payment_method: raw
                        .payment_method
                        .as_deref()
                        .map(PaymentMethod::from_free_text)
                        .unwrap_or_default(),
                };
                Self::entry(session, amount, raw.timestamp, now, kind)
                    .recurring(raw.recurring.unwrap_or(false))
            }
            LedgerTable::Income => {
                let raw: RawIncome = Self::decode(kind, &table.data)?;
                let amount = Self::amount(raw.amount).map_err(invalid)?;
                let kind = EntryKind::Income {
                    source: raw.source.unwrap_or_else(|| "Other".to_string()),
                };
                Self::entry(session, amount, raw.timestamp, now, kind)
                    .recurring(raw.recurring.unwrap_or(false))
            }
            LedgerTable::Liabilities => {
                let raw: RawLiability = Self::decode(kind, &table.data)?;
                let amount = Self::amount(raw.amount).map_err(invalid)?;
                let outstanding = match raw.outstanding_balance {
                    Some(value) => Self::amount(Some(value)).map_err(invalid)?,
                    None => amount,
                };
                let minimum_payment = match raw.minimum_payment {
                    Some(value) => Self::amount(Some(value)).map_err(invalid)?,
                    None => 0.0,
                };
                let interest_rate = match raw.interest_rate {
                    Some(value) => Self::amount(Some(value)).map_err(invalid)?,
                    None => 0.0,
                };
                let timestamp = Self::timestamp(raw.timestamp.as_ref(), now);
                let details = LiabilityDetails {
                    name: raw
                        .name
                        .or(raw.description)
                        .or(raw.category)
                        .unwrap_or_else(|| "Liability".to_string()),
                    interest_rate,
                    minimum_payment,
                    outstanding_balance: outstanding,
                    start_date: Self::date(raw.start_date.as_ref())
                        .unwrap_or_else(|| timestamp.date_naive()),
                    due_date: Self::date(raw.due_date.as_ref()),
                    interest_type: raw.interest_type,
                    payment_frequency: raw.payment_frequency,
                    status: raw.status,
                };
                LedgerEntry::new(
                    session.user.clone(),
                    amount,
                    timestamp,
                    EntryKind::Liability(details),
                )
                .recurring(raw.recurring.unwrap_or(false))
            }
            LedgerTable::Savings => {
                let raw: RawSavings = Self::decode(kind, &table.data)?;
                let amount = Self::amount(raw.current_amount.or(raw.amount)).map_err(invalid)?;
                let target_amount = match raw.target_amount {
                    Some(value) => Self::amount(Some(value)).map_err(invalid)?,
                    None => 0.0,
                };
                let kind = EntryKind::Asset(AssetDetails::Savings {
                    goal: raw.goal.unwrap_or_else(|| "General savings".to_string()),
                    target_amount,
                    target_date: Self::date(raw.target_date.as_ref()),
                });
                Self::entry(session, amount, raw.timestamp, now, kind)
                    .recurring(raw.recurring.unwrap_or(false))
            }
            LedgerTable::SavingsStock => {
                let raw: RawStock = Self::decode(kind, &table.data)?;
                let invested = Self::amount(raw.amount_invested.or_else(|| raw.amount.clone()))
                    .map_err(invalid)?;
                let value = match raw.current_value.or(raw.amount) {
                    Some(value) => Self::amount(Some(value)).map_err(invalid)?,
                    None => invested,
                };
                let kind = EntryKind::Asset(AssetDetails::Stock {
                    stock_symbol: raw
                        .stock_symbol
                        .map(|symbol| symbol.trim().to_uppercase())
                        .unwrap_or_else(|| "UNKNOWN".to_string()),
                    amount_invested: invested,
                });
                Self::entry(session, value, raw.timestamp, now, kind)
                    .recurring(raw.recurring.unwrap_or(false))
            }
            LedgerTable::LongTermAssets => {
                let raw: RawLongTerm = Self::decode(kind, &table.data)?;
                let amount = Self::amount(raw.amount).map_err(invalid)?;
                let kind = EntryKind::Asset(AssetDetails::LongTerm {
                    description: raw.description,
                });
                Self::entry(session, amount, raw.timestamp, now, kind)
            }
        };
        Ok(entry)
    }

    fn entry(
        session: &Session,
        amount: f64,
        timestamp: Option<Value>,
        now: DateTime<Utc>,
        kind: EntryKind,
    ) -> LedgerEntry {
        LedgerEntry::new(
            session.user.clone(),
            amount,
            Self::timestamp(timestamp.as_ref(), now),
            kind,
        )
    }

    fn decode<T: DeserializeOwned>(table: LedgerTable, data: &Value) -> Result<T, CoreError> {
        serde_json::from_value(data.clone()).map_err(|err| CoreError::InvalidRecord {
            table: table.name().to_string(),
            message: err.to_string(),
        })
    }

    /// Numbers or numeric strings such as `"$1,234.50"`.
    fn amount(raw: Option<Value>) -> Result<f64, String> {
        let value = match raw {
            None | Some(Value::Null) => return Err("missing amount".to_string()),
            Some(Value::Number(number)) => number
                .as_f64()
                .ok_or_else(|| format!("amount {number} is out of range"))?,
            Some(Value::String(text)) => {
                let cleaned: String = text
                    .chars()
                    .filter(|c| !matches!(c, '$' | ',' | ' ' | '%'))
                    .collect();
                cleaned
                    .parse::<f64>()
                    .map_err(|_| format!("amount `{text}` is not a number"))?
            }
            Some(other) => return Err(format!("amount {other} is not a number")),
        };
        if !value.is_finite() || value < 0.0 {
            return Err(format!("amount {value} must be a non-negative number"));
        }
        Ok(value)
    }

    /// RFC 3339, naive date-time or plain date; anything else is replaced by `now`.
    fn timestamp(raw: Option<&Value>, now: DateTime<Utc>) -> DateTime<Utc> {
        let Some(Value::String(text)) = raw else {
            return now;
        };
        let text = text.trim();
        if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
            return parsed.with_timezone(&Utc);
        }
        for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
            if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
                return parsed.and_utc();
            }
        }
        Self::date(raw)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
            .unwrap_or(now)
    }

    fn date(raw: Option<&Value>) -> Option<NaiveDate> {
        let Some(Value::String(text)) = raw else {
            return None;
        };
        let text = text.trim();
        let day = text.get(..10).unwrap_or(text);
        NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
    }

    fn fenced_block(content: &str) -> Option<&str> {
        let start = content.find("```")?;
        let after_ticks = &content[start + 3..];
        let body_start = after_ticks.find('\n').map(|idx| idx + 1).unwrap_or(0);
        let body = &after_ticks[body_start..];
        let end = body.find("```")?;
        Some(body[..end].trim())
    }

    fn braced_slice(content: &str) -> Option<&str> {
        let start = content.find('{')?;
        let end = content.rfind('}')?;
        (end > start).then(|| &content[start..=end])
    }
}

#[derive(Debug, Deserialize)]
struct RawExpense {
    amount: Option<Value>,
    category: Option<String>,
    payment_method: Option<String>,
    timestamp: Option<Value>,
    recurring: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawIncome {
    amount: Option<Value>,
    source: Option<String>,
    timestamp: Option<Value>,
    recurring: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawLiability {
    amount: Option<Value>,
    name: Option<String>,
    description: Option<String>,
    category: Option<String>,
    interest_rate: Option<Value>,
    minimum_payment: Option<Value>,
    outstanding_balance: Option<Value>,
    start_date: Option<Value>,
    due_date: Option<Value>,
    interest_type: Option<String>,
    payment_frequency: Option<String>,
    status: Option<String>,
    timestamp: Option<Value>,
    recurring: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawSavings {
    amount: Option<Value>,
    current_amount: Option<Value>,
    goal: Option<String>,
    target_amount: Option<Value>,
    target_date: Option<Value>,
    timestamp: Option<Value>,
    recurring: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawStock {
    amount: Option<Value>,
    stock_symbol: Option<String>,
    amount_invested: Option<Value>,
    current_value: Option<Value>,
    timestamp: Option<Value>,
    recurring: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawLongTerm {
    amount: Option<Value>,
    description: Option<String>,
    timestamp: Option<Value>,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;
    use crate::time::FixedClock;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 9, 30, 0).unwrap()
    }

    fn session() -> Session {
        Session::new("user-42", now())
    }

    struct Scripted(Result<String, String>);

    impl TransactionExtractor for Scripted {
        fn extract(&self, _input: &str) -> Result<String, CoreError> {
            self.0.clone().map_err(CoreError::Extraction)
        }
    }

    #[test]
    fn parses_plain_and_fenced_json() {
        let body = r#"{"tables":[{"name":"expenses","data":{"amount":45.99}}],"assumptions":[]}"#;
        assert!(ExtractionService::try_parse(body).is_some());
        let fenced = format!("Here you go:\n```json\n{body}\n```");
        let parsed = ExtractionService::try_parse(&fenced).expect("fenced json");
        assert_eq!(parsed.tables[0].name, "expenses");
    }

    #[test]
    fn unparseable_content_yields_generic_expense() {
        let response = ExtractionService::parse("I could not do that", "coffee 4", now());
        assert_eq!(response.tables.len(), 1);
        assert_eq!(response.tables[0].name, "expenses");
        assert_eq!(response.tables[0].data["amount"], json!(0));
        assert_eq!(response.tables[0].data["category"], json!("Miscellaneous"));
        assert_eq!(
            response.assumptions,
            vec![
                FALLBACK_ASSUMPTION.to_string(),
                "Original input: coffee 4".to_string()
            ]
        );
    }

    #[test]
    fn model_failure_is_reported_as_fallback() {
        let outcome = ExtractionService::process(
            &Scripted(Err("timeout".into())),
            "rent 1200",
            &FixedClock(now()),
        );
        assert!(matches!(outcome.fallback, Some(FallbackCause::ModelError(_))));
        assert_eq!(outcome.response.assumptions[0], FALLBACK_ASSUMPTION);

        let outcome = ExtractionService::process(
            &Scripted(Ok(r#"{"tables":[],"assumptions":[]}"#.into())),
            "rent 1200",
            &FixedClock(now()),
        );
        assert_eq!(outcome.fallback, Some(FallbackCause::Unparseable));
    }

    #[test]
    fn normalize_maps_free_text_and_forces_session_user() {
        let table = TableData {
            name: "expenses".into(),
            data: json!({
                "user_id": "someone-else",
                "amount": "$1,045.99",
                "category": "groceries",
                "payment_method": "credit card",
                "timestamp": "2024-06-01T18:00:00Z",
                "recurring": false
            }),
        };
        let entry = ExtractionService::normalize(&table, &session(), now()).unwrap();
        assert_eq!(entry.user.as_str(), "user-42");
        assert_eq!(entry.amount, 1045.99);
        assert_eq!(
            entry.kind,
            EntryKind::Expense {
                category: ExpenseCategory::Food,
                payment_method: PaymentMethod::Credit
            }
        );
        assert_eq!(entry.timestamp, Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap());
    }

    #[test]
    fn normalize_defaults_missing_timestamp_and_liability_fields() {
        let table = TableData {
            name: "liabilities".into(),
            data: json!({
                "amount": 12000,
                "description": "Car Loan",
                "interest_rate": 5.2,
                "minimum_payment": 350,
            }),
        };
        let entry = ExtractionService::normalize(&table, &session(), now()).unwrap();
        assert_eq!(entry.timestamp, now());
        let EntryKind::Liability(details) = entry.kind else {
            panic!("expected liability");
        };
        assert_eq!(details.name, "Car Loan");
        assert_eq!(details.outstanding_balance, 12000.0);
        assert_eq!(details.start_date, now().date_naive());
    }

    #[test]
    fn normalize_rejects_users_table_and_bad_amounts() {
        let users = TableData {
            name: "users".into(),
            data: json!({"TrueWage": 20}),
        };
        assert!(matches!(
            ExtractionService::normalize(&users, &session(), now()),
            Err(CoreError::Validation(_))
        ));
        let negative = TableData {
            name: "income".into(),
            data: json!({"amount": -5, "source": "Salary"}),
        };
        assert!(matches!(
            ExtractionService::normalize(&negative, &session(), now()),
            Err(CoreError::InvalidRecord { .. })
        ));
    }
}
