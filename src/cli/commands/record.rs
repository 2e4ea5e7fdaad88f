use ledgerwise_core::FallbackCause;
use serde_json::{Map, Number, Value};

use crate::cli::core::{invalid, CommandError, CommandResult, ShellContext};
use crate::cli::output;
use crate::cli::registry::CommandEntry;

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "record",
            "Describe a transaction in plain words and save it",
            "record <description>",
            cmd_record,
        ),
        CommandEntry::new(
            "add",
            "Save one row directly into a ledger table",
            "add <table> field=value [field=value...]",
            cmd_add,
        ),
    ]
}

fn cmd_record(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    if args.is_empty() {
        return Err(invalid("usage: record <description>"));
    }
    let outcome = context.app.record(&args.join(" "))?;

    match &outcome.fallback {
        Some(FallbackCause::ModelError(_)) => output::warning(
            "The transaction extractor could not be reached; saved a generic record instead.",
        ),
        Some(FallbackCause::Unparseable) => output::warning(
            "The extractor's answer could not be understood; saved a generic record instead.",
        ),
        None => {}
    }
    output::success(outcome.summary());

    if !outcome.assumptions.is_empty() {
        output::section("Assumptions");
        output::lines(outcome.assumptions.iter().map(|note| format!("  - {note}")));
    }
    Ok(())
}

fn cmd_add(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let Some((table, fields)) = args.split_first() else {
        return Err(invalid("usage: add <table> field=value [field=value...]"));
    };
    if fields.is_empty() {
        return Err(invalid("add needs at least one field=value pair"));
    }
    let data = parse_fields(fields)?;
    let recorded = context.app.add(table, data)?;
    let money = context.app.money_format();
    let amount = recorded
        .entries
        .first()
        .map(|entry| money.format(entry.amount))
        .unwrap_or_default();
    output::success(format!("Saved {amount} to {}", table.to_lowercase()));
    Ok(())
}

/// `key=value` pairs into a JSON object. Numbers and booleans are typed,
/// everything else stays a string.
pub(crate) fn parse_fields(fields: &[&str]) -> Result<Value, CommandError> {
    let mut map = Map::new();
    for field in fields {
        let (key, raw) = field
            .split_once('=')
            .ok_or_else(|| invalid(format!("expected field=value, got `{field}`")))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(invalid(format!("missing field name in `{field}`")));
        }
        map.insert(key.to_string(), typed_value(raw.trim()));
    }
    Ok(Value::Object(map))
}

fn typed_value(raw: &str) -> Value {
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => raw
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_are_typed() {
        let value = parse_fields(&[
            "amount=45.5",
            "category=eating out",
            "recurring=true",
            "timestamp=2024-06-01",
        ])
        .unwrap();
        assert_eq!(value["amount"], 45.5);
        assert_eq!(value["category"], "eating out");
        assert_eq!(value["recurring"], true);
        assert_eq!(value["timestamp"], "2024-06-01");
    }

    #[test]
    fn malformed_fields_are_rejected() {
        assert!(parse_fields(&["amount"]).is_err());
        assert!(parse_fields(&["=12"]).is_err());
    }
}
