//! Cross-field consistency checks over normalized values.
//!
//! Inputs are read by exact normalized field name. A field that is missing
//! or unresolved counts as `0.0`; a present but non-finite value makes the
//! check fail. Checks never error.

use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use strum::{EnumIter, IntoEnumIterator};

use crate::normalize::ValueMap;

pub const TOTAL_ASSETS: &str = "Total Assets";
pub const TOTAL_LIABILITIES: &str = "Total Liabilities";
pub const EQUITY: &str = "Equity";
pub const REVENUE: &str = "Revenue";
pub const NET_INCOME: &str = "Net Income";
pub const OPERATING_CASH_FLOW: &str = "Operating Cash Flow";
pub const INVESTING_CASH_FLOW: &str = "Investing Cash Flow";
pub const FINANCING_CASH_FLOW: &str = "Financing Cash Flow";
pub const CASH_AND_EQUIVALENTS: &str = "Cash and Cash Equivalents";

const BALANCE_TOLERANCE: f64 = 1e-2;
const CASH_LOWER_RATIO: f64 = 0.5;
const CASH_UPPER_RATIO: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum QaCheck {
    BalanceEquation,
    IncomeStatement,
    CashFlow,
}

impl QaCheck {
    /// Maps a mapping file's `qa_group` label onto a check.
    pub fn from_declaration(label: &str) -> Option<Self> {
        match label {
            "BalanceSheet" => Some(QaCheck::BalanceEquation),
            "IncomeStatement" => Some(QaCheck::IncomeStatement),
            "CashFlowStatement" => Some(QaCheck::CashFlow),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            QaCheck::BalanceEquation => "Balance Equation",
            QaCheck::IncomeStatement => "Income Statement",
            QaCheck::CashFlow => "Cash Flow",
        }
    }

    pub fn evaluate(&self, values: &ValueMap) -> bool {
        let outcome = match self {
            QaCheck::BalanceEquation => check_balance_equation(values),
            QaCheck::IncomeStatement => check_income_consistency(values),
            QaCheck::CashFlow => check_cash_flow(values),
        };
        outcome.unwrap_or_else(|field| {
            log::debug!("{} failed: '{}' is not a finite number", self, field);
            false
        })
    }
}

impl fmt::Display for QaCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for QaCheck {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Reads a field, returning the offending field name if it is unusable.
fn input<'a>(values: &ValueMap, field: &'a str) -> Result<f64, &'a str> {
    match values.get(field).copied().flatten() {
        None => Ok(0.0),
        Some(v) if v.is_finite() => Ok(v),
        Some(_) => Err(field),
    }
}

fn check_balance_equation(values: &ValueMap) -> Result<bool, &'static str> {
    let assets = input(values, TOTAL_ASSETS)?;
    let liabilities = input(values, TOTAL_LIABILITIES)?;
    let equity = input(values, EQUITY)?;
    Ok((assets - (liabilities + equity)).abs() < BALANCE_TOLERANCE)
}

// Only a sanity ordering, not a full income statement validation
fn check_income_consistency(values: &ValueMap) -> Result<bool, &'static str> {
    let revenue = input(values, REVENUE)?;
    let net_income = input(values, NET_INCOME)?;
    Ok(revenue >= net_income)
}

// Loose bound: ending cash within [0.5x, 1.5x] of the summed flows, inclusive
fn check_cash_flow(values: &ValueMap) -> Result<bool, &'static str> {
    let operating = input(values, OPERATING_CASH_FLOW)?;
    let investing = input(values, INVESTING_CASH_FLOW)?;
    let financing = input(values, FINANCING_CASH_FLOW)?;
    let ending_cash = input(values, CASH_AND_EQUIVALENTS)?;

    let total_flow = operating + investing + financing;
    let lower_bound = total_flow * CASH_LOWER_RATIO;
    let upper_bound = total_flow * CASH_UPPER_RATIO;

    Ok(lower_bound <= ending_cash && ending_cash <= upper_bound)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QaOutcome {
    pub check: QaCheck,
    pub passed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QaReport {
    pub outcomes: Vec<QaOutcome>,
}

impl QaReport {
    pub fn get(&self, check: QaCheck) -> Option<bool> {
        self.outcomes
            .iter()
            .find(|o| o.check == check)
            .map(|o| o.passed)
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn all_passed(&self) -> bool {
        self.outcomes.iter().all(|o| o.passed)
    }
}

/// Runs every check declared by at least one label, in fixed check order.
pub fn run_all_checks<'a>(
    values: &ValueMap,
    declared_groups: impl IntoIterator<Item = &'a str>,
) -> QaReport {
    let mut applicable = HashSet::new();
    for label in declared_groups {
        match QaCheck::from_declaration(label) {
            Some(check) => {
                applicable.insert(check);
            }
            None => log::debug!("No QA check for group '{}'", label),
        }
    }

    let outcomes = QaCheck::iter()
        .filter(|check| applicable.contains(check))
        .map(|check| QaOutcome {
            check,
            passed: check.evaluate(values),
        })
        .collect();

    QaReport { outcomes }
}
