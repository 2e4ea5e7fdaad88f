//! Ledger entries: the raw, append-only per-user rows.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    category::{ExpenseCategory, PaymentMethod},
    common::UserId,
};

/// Raw tables a transaction can be written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerTable {
    Expenses,
    Income,
    Liabilities,
    Savings,
    SavingsStock,
    LongTermAssets,
}

impl LedgerTable {
    pub const ALL: [LedgerTable; 6] = [
        LedgerTable::Expenses,
        LedgerTable::Income,
        LedgerTable::Liabilities,
        LedgerTable::Savings,
        LedgerTable::SavingsStock,
        LedgerTable::LongTermAssets,
    ];

    pub fn name(self) -> &'static str {
        match self {
            LedgerTable::Expenses => "expenses",
            LedgerTable::Income => "income",
            LedgerTable::Liabilities => "liabilities",
            LedgerTable::Savings => "savings",
            LedgerTable::SavingsStock => "savings_stock",
            LedgerTable::LongTermAssets => "long_term_assets",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let trimmed = name.trim();
        Self::ALL
            .into_iter()
            .find(|table| table.name().eq_ignore_ascii_case(trimmed))
    }

    /// The aggregate section recomputed after a row lands in this table.
    pub fn section(self) -> AggregateSection {
        match self {
            LedgerTable::Expenses => AggregateSection::Expenses,
            LedgerTable::Income => AggregateSection::Income,
            LedgerTable::Liabilities => AggregateSection::Liabilities,
            LedgerTable::Savings | LedgerTable::SavingsStock | LedgerTable::LongTermAssets => {
                AggregateSection::Assets
            }
        }
    }
}

impl fmt::Display for LedgerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sections of the cached user aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregateSection {
    Income,
    Expenses,
    Liabilities,
    Assets,
}

impl AggregateSection {
    pub const ALL: [AggregateSection; 4] = [
        AggregateSection::Income,
        AggregateSection::Expenses,
        AggregateSection::Liabilities,
        AggregateSection::Assets,
    ];

    /// Raw tables folded into this section.
    pub fn tables(self) -> &'static [LedgerTable] {
        match self {
            AggregateSection::Income => &[LedgerTable::Income],
            AggregateSection::Expenses => &[LedgerTable::Expenses],
            AggregateSection::Liabilities => &[LedgerTable::Liabilities],
            AggregateSection::Assets => &[
                LedgerTable::Savings,
                LedgerTable::SavingsStock,
                LedgerTable::LongTermAssets,
            ],
        }
    }
}

impl fmt::Display for AggregateSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AggregateSection::Income => "Income",
            AggregateSection::Expenses => "Expenses",
            AggregateSection::Liabilities => "Liabilities",
            AggregateSection::Assets => "Assets",
        };
        f.write_str(label)
    }
}

/// A single immutable ledger row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub user: UserId,
    pub amount: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub recurring: bool,
    pub kind: EntryKind,
}

impl LedgerEntry {
    pub fn new(user: UserId, amount: f64, timestamp: DateTime<Utc>, kind: EntryKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            user,
            amount,
            timestamp,
            recurring: false,
            kind,
        }
    }

    pub fn recurring(mut self, recurring: bool) -> Self {
        self.recurring = recurring;
        self
    }

    pub fn table(&self) -> LedgerTable {
        self.kind.table()
    }
}

/// Kind-specific payload of a ledger row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntryKind {
    Income {
        source: String,
    },
    Expense {
        category: ExpenseCategory,
        payment_method: PaymentMethod,
    },
    Liability(LiabilityDetails),
    Asset(AssetDetails),
}

impl EntryKind {
    pub fn table(&self) -> LedgerTable {
        match self {
            EntryKind::Income { .. } => LedgerTable::Income,
            EntryKind::Expense { .. } => LedgerTable::Expenses,
            EntryKind::Liability(_) => LedgerTable::Liabilities,
            EntryKind::Asset(AssetDetails::Savings { .. }) => LedgerTable::Savings,
            EntryKind::Asset(AssetDetails::Stock { .. }) => LedgerTable::SavingsStock,
            EntryKind::Asset(AssetDetails::LongTerm { .. }) => LedgerTable::LongTermAssets,
        }
    }
}

/// Loan or card terms captured on a liability row. The entry amount is the
/// original principal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiabilityDetails {
    pub name: String,
    /// Annual percentage rate.
    pub interest_rate: f64,
    pub minimum_payment: f64,
    pub outstanding_balance: f64,
    pub start_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interest_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_frequency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Asset payloads. The entry amount is the current value (savings balance,
/// market value or appraised value).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "asset", rename_all = "snake_case")]
pub enum AssetDetails {
    Savings {
        goal: String,
        target_amount: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_date: Option<NaiveDate>,
    },
    Stock {
        stock_symbol: String,
        amount_invested: f64,
    },
    LongTerm {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
}
