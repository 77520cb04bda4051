use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::PocketbookError;

/// Text-backed enum: lowercase names in SQLite, in JSON, and on the command line.
macro_rules! text_enum {
    ($name:ident, $label:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = PocketbookError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    other => Err(PocketbookError::validation(format!(
                        "invalid {}: '{other}' (expected one of: {})",
                        $label,
                        [$($text),+].join(", ")
                    ))),
                }
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: PocketbookError| FromSqlError::Other(Box::new(e)))
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Income,
    Expense,
    Transfer,
}

text_enum!(TransactionType, "transaction type" {
    Income => "income",
    Expense => "expense",
    Transfer => "transfer",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    CreditCard,
    DebitCard,
    BankTransfer,
    DigitalWallet,
    Other,
}

text_enum!(PaymentMethod, "payment method" {
    Cash => "cash",
    CreditCard => "credit_card",
    DebitCard => "debit_card",
    BankTransfer => "bank_transfer",
    DigitalWallet => "digital_wallet",
    Other => "other",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Bank,
    CreditCard,
    Cash,
    General,
}

text_enum!(AccountType, "account type" {
    Bank => "bank",
    CreditCard => "credit_card",
    Cash => "cash",
    General => "general",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodType {
    Monthly,
    Yearly,
}

text_enum!(PeriodType, "period type" {
    Monthly => "monthly",
    Yearly => "yearly",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestmentType {
    Stock,
    Bond,
    Fund,
    Crypto,
    RealEstate,
    Other,
}

text_enum!(InvestmentType, "investment type" {
    Stock => "stock",
    Bond => "bond",
    Fund => "fund",
    Crypto => "crypto",
    RealEstate => "real_estate",
    Other => "other",
});

#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    pub icon: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub account_type: AccountType,
    pub balance: Decimal,
    pub credit_limit: Option<Decimal>,
    pub closing_day: Option<u32>,
    pub due_day: Option<u32>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Transaction {
    pub id: i64,
    pub amount: Decimal,
    pub description: String,
    pub transaction_type: TransactionType,
    pub payment_method: PaymentMethod,
    pub date: NaiveDate,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub account_id: Option<i64>,
    pub account_name: Option<String>,
    /// Display order is insertion order.
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct Budget {
    pub id: i64,
    pub name: String,
    pub period_type: PeriodType,
    pub year: i32,
    /// Set only for monthly budgets.
    pub month: Option<u32>,
    pub description: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BudgetCategory {
    pub id: i64,
    pub budget_id: i64,
    pub category_id: i64,
    pub category_name: String,
    pub allocated_amount: Decimal,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Investment {
    pub id: i64,
    pub name: String,
    pub investment_type: InvestmentType,
    pub initial_amount: Decimal,
    pub current_value: Decimal,
    pub shares: Option<Decimal>,
    pub purchase_price: Option<Decimal>,
    pub purchase_date: NaiveDate,
    pub description: Option<String>,
    pub last_updated: Option<NaiveDateTime>,
    pub is_active: bool,
}

impl Investment {
    pub fn return_amount(&self) -> Decimal {
        self.current_value - self.initial_amount
    }

    /// Gain relative to the initial amount, in percent. Zero when nothing was invested.
    pub fn return_percentage(&self) -> Decimal {
        percent_of(self.return_amount(), self.initial_amount)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Dividend {
    pub id: i64,
    pub investment_id: i64,
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Goal {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub target_amount: Decimal,
    pub current_amount: Decimal,
    pub target_date: Option<NaiveDate>,
    /// 1 = high, 2 = medium, 3 = low.
    pub priority: u8,
    pub is_active: bool,
}

impl Goal {
    pub fn progress_percentage(&self) -> Decimal {
        percent_of(self.current_amount, self.target_amount)
    }

    pub fn remaining(&self) -> Decimal {
        (self.target_amount - self.current_amount).max(Decimal::ZERO)
    }
}

/// `part / whole * 100`, or zero when `whole` is not positive.
pub fn percent_of(part: Decimal, whole: Decimal) -> Decimal {
    if whole > Decimal::ZERO {
        part / whole * Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    }
}
