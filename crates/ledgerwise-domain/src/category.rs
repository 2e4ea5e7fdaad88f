//! Fixed expense-category and payment-method vocabularies.

use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Supported expense categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ExpenseCategory {
    Housing,
    Transportation,
    Food,
    Healthcare,
    #[serde(rename = "Debt Payments")]
    DebtPayments,
    Savings,
    Entertainment,
    Clothing,
    Education,
    Miscellaneous,
}

impl ExpenseCategory {
    pub const ALL: [ExpenseCategory; 10] = [
        ExpenseCategory::Housing,
        ExpenseCategory::Transportation,
        ExpenseCategory::Food,
        ExpenseCategory::Healthcare,
        ExpenseCategory::DebtPayments,
        ExpenseCategory::Savings,
        ExpenseCategory::Entertainment,
        ExpenseCategory::Clothing,
        ExpenseCategory::Education,
        ExpenseCategory::Miscellaneous,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ExpenseCategory::Housing => "Housing",
            ExpenseCategory::Transportation => "Transportation",
            ExpenseCategory::Food => "Food",
            ExpenseCategory::Healthcare => "Healthcare",
            ExpenseCategory::DebtPayments => "Debt Payments",
            ExpenseCategory::Savings => "Savings",
            ExpenseCategory::Entertainment => "Entertainment",
            ExpenseCategory::Clothing => "Clothing",
            ExpenseCategory::Education => "Education",
            ExpenseCategory::Miscellaneous => "Miscellaneous",
        }
    }

    /// Maps free-text category strings from the extractor into the vocabulary.
    pub fn from_free_text(raw: &str) -> Self {
        let lowered = raw.trim().to_lowercase();
        if let Some(exact) = Self::ALL
            .iter()
            .find(|category| category.label().eq_ignore_ascii_case(&lowered))
        {
            return *exact;
        }
        KEYWORDS
            .iter()
            .find(|(keyword, _)| lowered.contains(keyword))
            .map(|(_, category)| *category)
            .unwrap_or(ExpenseCategory::Miscellaneous)
    }
}

impl fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Default for ExpenseCategory {
    fn default() -> Self {
        ExpenseCategory::Miscellaneous
    }
}

/// Keyword table sorted longest first so multi-word keys ("credit card") win
/// over keys they contain ("car").
static KEYWORDS: Lazy<Vec<(&'static str, ExpenseCategory)>> = Lazy::new(|| {
    use ExpenseCategory::*;
    let mut table = vec![
        ("housing", Housing),
        ("rent", Housing),
        ("mortgage", Housing),
        ("transportation", Transportation),
        ("car", Transportation),
        ("gas", Transportation),
        ("food", Food),
        ("groceries", Food),
        ("restaurant", Food),
        ("healthcare", Healthcare),
        ("medical", Healthcare),
        ("doctor", Healthcare),
        ("debt", DebtPayments),
        ("loan", DebtPayments),
        ("credit card", DebtPayments),
        ("savings", Savings),
        ("investment", Savings),
        ("entertainment", Entertainment),
        ("movies", Entertainment),
        ("games", Entertainment),
        ("clothing", Clothing),
        ("clothes", Clothing),
        ("education", Education),
        ("school", Education),
        ("books", Education),
    ];
    table.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    table
});

/// Payment instruments recognised on expense rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentMethod {
    Credit,
    #[default]
    Debit,
}

impl PaymentMethod {
    pub fn from_free_text(raw: &str) -> Self {
        if raw.to_lowercase().contains("credit") {
            PaymentMethod::Credit
        } else {
            PaymentMethod::Debit
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PaymentMethod::Credit => "Credit",
            PaymentMethod::Debit => "Debit",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_text_categories_map_by_substring() {
        assert_eq!(
            ExpenseCategory::from_free_text("Weekly groceries"),
            ExpenseCategory::Food
        );
        assert_eq!(
            ExpenseCategory::from_free_text("monthly RENT"),
            ExpenseCategory::Housing
        );
        assert_eq!(
            ExpenseCategory::from_free_text("credit card payment"),
            ExpenseCategory::DebtPayments
        );
        assert_eq!(
            ExpenseCategory::from_free_text("Debt Payments"),
            ExpenseCategory::DebtPayments
        );
        assert_eq!(
            ExpenseCategory::from_free_text("gift for a friend"),
            ExpenseCategory::Miscellaneous
        );
    }

    #[test]
    fn payment_method_defaults_to_debit() {
        assert_eq!(
            PaymentMethod::from_free_text("credit card"),
            PaymentMethod::Credit
        );
        assert_eq!(PaymentMethod::from_free_text("cash"), PaymentMethod::Debit);
        assert_eq!(PaymentMethod::from_free_text(""), PaymentMethod::Debit);
    }

    #[test]
    fn debt_payments_serializes_with_display_label() {
        let json = serde_json::to_string(&ExpenseCategory::DebtPayments).unwrap();
        assert_eq!(json, "\"Debt Payments\"");
    }
}
