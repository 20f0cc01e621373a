//! Shared domain enums

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;

// ---------------------------------------------------------------------------
// TransactionStatus
// ---------------------------------------------------------------------------

/// Status of a borrow transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Borrowed,
    Overdue,
    Returned,
    Canceled,
}

/// What a status change does to the book's available copies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InventoryEffect {
    /// Copy count untouched
    None,
    /// Copies come back to the shelf
    Restock,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Borrowed => "borrowed",
            TransactionStatus::Overdue => "overdue",
            TransactionStatus::Returned => "returned",
            TransactionStatus::Canceled => "canceled",
        }
    }

    /// Copies are still out of the library
    pub fn is_open(&self) -> bool {
        matches!(self, TransactionStatus::Borrowed | TransactionStatus::Overdue)
    }

    /// Checks a status change and tells which inventory effect it carries.
    ///
    /// `borrowed` and `overdue` form one open superstate: moving between them,
    /// or re-applying the current status, never touches inventory. Leaving the
    /// open superstate for `returned`/`canceled` restocks exactly once. A
    /// terminal transaction may only be re-saved with its own status.
    pub fn transition_to(self, next: TransactionStatus) -> Result<InventoryEffect, AppError> {
        if self == next {
            return Ok(InventoryEffect::None);
        }
        match (self.is_open(), next.is_open()) {
            (true, true) => Ok(InventoryEffect::None),
            (true, false) => Ok(InventoryEffect::Restock),
            (false, _) => Err(AppError::InvalidTransition {
                from: self,
                to: next,
            }),
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "borrowed" => Ok(TransactionStatus::Borrowed),
            "overdue" => Ok(TransactionStatus::Overdue),
            "returned" => Ok(TransactionStatus::Returned),
            "canceled" => Ok(TransactionStatus::Canceled),
            other => Err(AppError::Validation(format!(
                "Unknown transaction status '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// FeeInterval
// ---------------------------------------------------------------------------

/// Unit in which lateness is measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FeeInterval {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl FeeInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeeInterval::Second => "second",
            FeeInterval::Minute => "minute",
            FeeInterval::Hour => "hour",
            FeeInterval::Day => "day",
            FeeInterval::Week => "week",
            FeeInterval::Month => "month",
            FeeInterval::Year => "year",
        }
    }
}

impl FromStr for FeeInterval {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "second" => Ok(FeeInterval::Second),
            "minute" => Ok(FeeInterval::Minute),
            "hour" => Ok(FeeInterval::Hour),
            "day" => Ok(FeeInterval::Day),
            "week" => Ok(FeeInterval::Week),
            "month" => Ok(FeeInterval::Month),
            "year" => Ok(FeeInterval::Year),
            other => Err(AppError::InvalidConfig(format!(
                "Unknown fee interval '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for FeeInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// BookStatus
// ---------------------------------------------------------------------------

/// Shelf status of a book, always derived from copy count and archival flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BookStatus {
    Available,
    Unavailable,
    Archived,
}
