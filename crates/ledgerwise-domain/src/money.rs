//! Currency-aware rendering of amounts.

use serde::{Deserialize, Serialize};

/// How amounts are written for one currency and locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoneyFormat {
    /// ISO 4217 code, uppercase.
    pub currency: String,
    pub symbol: String,
    pub minor_units: u8,
    pub decimal_separator: char,
    pub grouping_separator: char,
}

impl Default for MoneyFormat {
    fn default() -> Self {
        Self::new("USD", "en-US")
    }
}

impl MoneyFormat {
    pub fn new(currency: &str, locale: &str) -> Self {
        let currency = currency.trim().to_uppercase();
        let (decimal_separator, grouping_separator) = separators_for(locale);
        Self {
            symbol: symbol_for(&currency),
            minor_units: minor_units_for(&currency),
            currency,
            decimal_separator,
            grouping_separator,
        }
    }

    /// `$1,234.56` for USD in `en-US`, `1.234,56` grouping for `de-DE`.
    pub fn format(&self, amount: f64) -> String {
        self.render(amount, self.minor_units as usize)
    }

    /// Rounded to whole units, for estimates in prose.
    pub fn format_whole(&self, amount: f64) -> String {
        self.render(amount, 0)
    }

    fn render(&self, amount: f64, precision: usize) -> String {
        let digits = format!("{:.*}", precision, amount.abs());
        let (whole, fraction) = match digits.split_once('.') {
            Some((whole, fraction)) => (whole, Some(fraction)),
            None => (digits.as_str(), None),
        };
        let mut body = group_digits(whole, self.grouping_separator);
        if let Some(fraction) = fraction {
            body.push(self.decimal_separator);
            body.push_str(fraction);
        }
        let rounds_to_zero = digits.chars().all(|ch| ch == '0' || ch == '.');
        let sign = if amount < 0.0 && !rounds_to_zero { "-" } else { "" };
        format!("{sign}{}{body}", self.symbol)
    }
}

fn symbol_for(code: &str) -> String {
    match code {
        "USD" => "$".into(),
        "EUR" => "€".into(),
        "GBP" => "£".into(),
        "JPY" => "¥".into(),
        "AUD" => "A$".into(),
        "CAD" => "C$".into(),
        "INR" => "₹".into(),
        other => format!("{other} "),
    }
}

fn minor_units_for(code: &str) -> u8 {
    match code {
        "JPY" | "KRW" => 0,
        "KWD" | "BHD" => 3,
        _ => 2,
    }
}

/// Decimal and grouping separators keyed by the language part of a tag.
fn separators_for(locale: &str) -> (char, char) {
    let language = locale
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    match language.as_str() {
        "de" | "es" | "it" | "pt" | "nl" | "da" | "id" | "tr" => (',', '.'),
        "fr" | "sv" | "nb" | "no" | "fi" | "pl" | "cs" | "ru" | "uk" => (',', ' '),
        _ => ('.', ','),
    }
}

fn group_digits(digits: &str, separator: char) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, digit) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(separator);
        }
        grouped.push(digit);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dollars_group_thousands() {
        let usd = MoneyFormat::default();
        assert_eq!(usd.format(0.0), "$0.00");
        assert_eq!(usd.format(999.5), "$999.50");
        assert_eq!(usd.format(24600.0), "$24,600.00");
        assert_eq!(usd.format(-1234567.891), "-$1,234,567.89");
        assert_eq!(usd.format(-0.001), "$0.00");
        assert_eq!(usd.format_whole(449.6), "$450");
    }

    #[test]
    fn currency_and_locale_change_symbol_and_separators() {
        assert_eq!(MoneyFormat::new("eur", "de-DE").format(1234.5), "€1.234,50");
        assert_eq!(MoneyFormat::new("JPY", "ja-JP").format(1234.4), "¥1,234");
        assert_eq!(MoneyFormat::new("CHF", "fr_CH").format(1000.0), "CHF 1 000,00");
    }
}
