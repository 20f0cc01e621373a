//! Transaction (borrow record) model and related types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::enums::{InventoryEffect, TransactionStatus};
use super::fee::{Fee, FeeConfig};
use crate::error::{AppError, AppResult};
use crate::services::fees::calculate_late_fee;

/// Width of the numeric part of a reference code
pub const REFERENCE_DIGITS: usize = 6;

/// Transaction model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub reference: String,
    pub book_id: i64,
    pub borrower_id: i64,
    pub quantity: i32,
    pub date_borrowed: DateTime<Utc>,
    pub expected_return_date: DateTime<Utc>,
    pub date_returned: Option<DateTime<Utc>>,
    pub date_canceled: Option<DateTime<Utc>>,
    pub fee: Fee,
    pub status: TransactionStatus,
    pub is_lost: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Raw `transactions` row
#[derive(Debug, Clone, FromRow)]
pub struct TransactionRow {
    pub id: i64,
    pub reference: String,
    pub book_id: i64,
    pub borrower_id: i64,
    pub quantity: i32,
    pub date_borrowed: DateTime<Utc>,
    pub expected_return_date: DateTime<Utc>,
    pub date_returned: Option<DateTime<Utc>>,
    pub date_canceled: Option<DateTime<Utc>>,
    pub fee_mode: String,
    pub fee_amount: Option<Decimal>,
    pub status: String,
    pub is_lost: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = AppError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            fee: Fee::from_columns(&row.fee_mode, row.fee_amount)?,
            status: row
                .status
                .parse()
                .map_err(|_| AppError::Internal(format!("Corrupt status on {}", row.reference)))?,
            id: row.id,
            reference: row.reference,
            book_id: row.book_id,
            borrower_id: row.borrower_id,
            quantity: row.quantity,
            date_borrowed: row.date_borrowed,
            expected_return_date: row.expected_return_date,
            date_returned: row.date_returned,
            date_canceled: row.date_canceled,
            is_lost: row.is_lost,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl Transaction {
    /// Past due while copies are still out
    pub fn is_overdue_at(&self, now: DateTime<Utc>) -> bool {
        self.status.is_open() && now > self.expected_return_date
    }

    /// Apply an edit in memory and report the inventory effect the caller
    /// must persist alongside it. Nothing changes when the edit is rejected.
    ///
    /// A returned transaction still on the automatic fee gets its fee frozen
    /// with `fee_config`, as of the return date, in the same step.
    pub fn apply(
        &mut self,
        changes: &TransactionChanges,
        at: DateTime<Utc>,
        fee_config: &FeeConfig,
    ) -> AppResult<InventoryEffect> {
        if let Some(fee) = &changes.fee {
            fee.validate()?;
        }

        let effect = match changes.status {
            Some(next) => self.status.transition_to(next)?,
            None => InventoryEffect::None,
        };

        if let Some(expected) = changes.expected_return_date {
            self.expected_return_date = expected;
        }
        if let Some(fee) = changes.fee {
            self.fee = fee;
        }
        if let Some(is_lost) = changes.is_lost {
            self.is_lost = is_lost;
        }
        if let Some(next) = changes.status {
            if self.status != next {
                match next {
                    TransactionStatus::Returned => self.date_returned = Some(at),
                    TransactionStatus::Canceled => self.date_canceled = Some(at),
                    TransactionStatus::Borrowed | TransactionStatus::Overdue => {}
                }
                self.status = next;
            }
        }
        if let (TransactionStatus::Returned, Fee::Auto, Some(returned)) =
            (self.status, self.fee, self.date_returned)
        {
            self.fee = Fee::Frozen {
                amount: calculate_late_fee(fee_config, self.expected_return_date, returned),
            };
        }
        self.updated_at = at;

        Ok(effect)
    }
}

/// Transaction with its live fee, for display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransactionDetails {
    pub id: i64,
    /// Human-readable reference (`TRX-000042`)
    pub reference: String,
    pub book_id: i64,
    pub borrower_id: i64,
    pub quantity: i32,
    pub date_borrowed: DateTime<Utc>,
    pub expected_return_date: DateTime<Utc>,
    pub date_returned: Option<DateTime<Utc>>,
    pub date_canceled: Option<DateTime<Utc>>,
    pub status: TransactionStatus,
    pub is_lost: bool,
    pub fee: Fee,
    /// Fee owed as of now (frozen once returned)
    #[schema(value_type = String, example = "35.00")]
    pub current_fee: Decimal,
    pub is_overdue: bool,
}

impl TransactionDetails {
    pub fn new(transaction: Transaction, current_fee: Decimal, now: DateTime<Utc>) -> Self {
        let is_overdue = transaction.is_overdue_at(now);
        Self {
            id: transaction.id,
            reference: transaction.reference,
            book_id: transaction.book_id,
            borrower_id: transaction.borrower_id,
            quantity: transaction.quantity,
            date_borrowed: transaction.date_borrowed,
            expected_return_date: transaction.expected_return_date,
            date_returned: transaction.date_returned,
            date_canceled: transaction.date_canceled,
            status: transaction.status,
            is_lost: transaction.is_lost,
            fee: transaction.fee,
            current_fee,
            is_overdue,
        }
    }
}

/// Borrow request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateTransaction {
    pub book_id: i64,
    pub borrower_id: i64,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    /// Defaults to now
    pub date_borrowed: Option<DateTime<Utc>>,
    /// Defaults to the configured loan period after `date_borrowed`
    pub expected_return_date: Option<DateTime<Utc>>,
}

/// Borrow ready to be persisted, all dates resolved
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub book_id: i64,
    pub borrower_id: i64,
    pub quantity: i32,
    pub date_borrowed: DateTime<Utc>,
    pub expected_return_date: DateTime<Utc>,
}

/// Edit request, every field optional
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct TransactionChanges {
    pub status: Option<TransactionStatus>,
    pub expected_return_date: Option<DateTime<Utc>>,
    pub fee: Option<Fee>,
    pub is_lost: Option<bool>,
}

impl TransactionChanges {
    pub fn status(status: TransactionStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

/// Transaction list filters
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct TransactionQuery {
    pub status: Option<TransactionStatus>,
    pub book_id: Option<i64>,
    pub borrower_id: Option<i64>,
}

impl TransactionQuery {
    pub fn matches(&self, transaction: &Transaction) -> bool {
        self.status.map_or(true, |s| s == transaction.status)
            && self.book_id.map_or(true, |b| b == transaction.book_id)
            && self.borrower_id.map_or(true, |b| b == transaction.borrower_id)
    }
}

/// Format `PREFIX-NNNNNN`
pub fn format_reference(prefix: &str, number: u64) -> String {
    format!("{}-{:0width$}", prefix, number, width = REFERENCE_DIGITS)
}

/// Numeric suffix of a reference carrying `prefix`
pub fn reference_number(prefix: &str, reference: &str) -> Option<u64> {
    let digits = reference.strip_prefix(prefix)?.strip_prefix('-')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// First candidate after the highest reference in use
pub fn next_reference_number(prefix: &str, highest: Option<&str>) -> u64 {
    highest
        .and_then(|r| reference_number(prefix, r))
        .map_or(1, |n| n + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn transaction(status: TransactionStatus) -> Transaction {
        let borrowed = Utc.with_ymd_and_hms(2026, 2, 2, 9, 0, 0).unwrap();
        Transaction {
            id: 7,
            reference: "TRX-000007".to_string(),
            book_id: 1,
            borrower_id: 3,
            quantity: 2,
            date_borrowed: borrowed,
            expected_return_date: borrowed + Duration::days(14),
            date_returned: None,
            date_canceled: None,
            fee: Fee::Auto,
            status,
            is_lost: false,
            created_at: borrowed,
            updated_at: borrowed,
        }
    }

    #[test]
    fn test_reference_format() {
        assert_eq!(format_reference("TRX", 42), "TRX-000042");
        assert_eq!(format_reference("LIB", 1_234_567), "LIB-1234567");
    }

    #[test]
    fn test_reference_number() {
        assert_eq!(reference_number("TRX", "TRX-000042"), Some(42));
        assert_eq!(reference_number("TRX", "LIB-000042"), None);
        assert_eq!(reference_number("TRX", "TRX000042"), None);
        assert_eq!(reference_number("TRX", "TRX-abc"), None);
        assert_eq!(reference_number("TRX", "TRX-+42"), None);
        assert_eq!(reference_number("TRX", "TRX-"), None);
    }

    #[test]
    fn test_next_reference_number() {
        assert_eq!(next_reference_number("TRX", None), 1);
        assert_eq!(next_reference_number("TRX", Some("TRX-000041")), 42);
        assert_eq!(next_reference_number("TRX", Some("garbage")), 1);
    }

    #[test]
    fn test_return_stamps_date_and_restocks() {
        let mut t = transaction(TransactionStatus::Borrowed);
        let at = Utc.with_ymd_and_hms(2026, 2, 20, 12, 0, 0).unwrap();
        let effect = t
            .apply(&TransactionChanges::status(TransactionStatus::Returned), at, &FeeConfig::default())
            .unwrap();
        assert_eq!(effect, InventoryEffect::Restock);
        assert_eq!(t.status, TransactionStatus::Returned);
        assert_eq!(t.date_returned, Some(at));
        assert_eq!(t.date_canceled, None);
    }

    #[test]
    fn test_resave_returned_keeps_first_date() {
        let mut t = transaction(TransactionStatus::Borrowed);
        let first = Utc.with_ymd_and_hms(2026, 2, 20, 12, 0, 0).unwrap();
        t.apply(&TransactionChanges::status(TransactionStatus::Returned), first, &FeeConfig::default())
            .unwrap();
        let effect = t
            .apply(
                &TransactionChanges::status(TransactionStatus::Returned),
                first + Duration::days(3),
                &FeeConfig::default(),
            )
            .unwrap();
        assert_eq!(effect, InventoryEffect::None);
        assert_eq!(t.date_returned, Some(first));
    }

    #[test]
    fn test_rejected_edit_changes_nothing() {
        let mut t = transaction(TransactionStatus::Canceled);
        let before = t.clone();
        let changes = TransactionChanges {
            status: Some(TransactionStatus::Borrowed),
            is_lost: Some(true),
            ..Default::default()
        };
        assert!(t.apply(&changes, Utc::now(), &FeeConfig::default()).is_err());
        assert_eq!(t, before);
    }

    #[test]
    fn test_negative_manual_fee_rejected() {
        let mut t = transaction(TransactionStatus::Borrowed);
        let changes = TransactionChanges {
            fee: Some(Fee::Manual { amount: Decimal::new(-5, 0) }),
            ..Default::default()
        };
        assert!(matches!(
            t.apply(&changes, Utc::now(), &FeeConfig::default()),
            Err(AppError::Validation(_))
        ));
        assert_eq!(t.fee, Fee::Auto);
    }

    fn daily(rate: i64) -> FeeConfig {
        FeeConfig {
            enabled: true,
            rate: Decimal::from(rate),
            interval: crate::models::enums::FeeInterval::Day,
        }
    }

    #[test]
    fn test_return_freezes_fee() {
        let mut t = transaction(TransactionStatus::Overdue);
        let at = t.expected_return_date + Duration::days(7);
        t.apply(&TransactionChanges::status(TransactionStatus::Returned), at, &daily(5))
            .unwrap();
        assert_eq!(t.fee, Fee::Frozen { amount: Decimal::from(35) });

        // Later edits on the closed record leave the settled fee alone
        let changes = TransactionChanges {
            expected_return_date: Some(at),
            is_lost: Some(true),
            ..Default::default()
        };
        t.apply(&changes, at + Duration::days(30), &daily(10)).unwrap();
        assert_eq!(t.fee, Fee::Frozen { amount: Decimal::from(35) });
    }

    #[test]
    fn test_return_with_fees_disabled_freezes_zero() {
        let mut t = transaction(TransactionStatus::Borrowed);
        let at = t.expected_return_date + Duration::days(7);
        let mut config = daily(5);
        config.enabled = false;
        t.apply(&TransactionChanges::status(TransactionStatus::Returned), at, &config)
            .unwrap();
        assert_eq!(t.fee, Fee::Frozen { amount: Decimal::ZERO });
    }

    #[test]
    fn test_return_keeps_manual_fee() {
        let mut t = transaction(TransactionStatus::Borrowed);
        t.fee = Fee::Manual { amount: Decimal::from(2) };
        let at = t.expected_return_date + Duration::days(7);
        t.apply(&TransactionChanges::status(TransactionStatus::Returned), at, &daily(5))
            .unwrap();
        assert_eq!(t.fee, Fee::Manual { amount: Decimal::from(2) });
    }

    #[test]
    fn test_cancel_does_not_freeze() {
        let mut t = transaction(TransactionStatus::Borrowed);
        let at = t.expected_return_date + Duration::days(7);
        t.apply(&TransactionChanges::status(TransactionStatus::Canceled), at, &daily(5))
            .unwrap();
        assert_eq!(t.fee, Fee::Auto);
    }

    #[test]
    fn test_is_overdue_only_while_open() {
        let mut t = transaction(TransactionStatus::Borrowed);
        let late = t.expected_return_date + Duration::seconds(1);
        assert!(!t.is_overdue_at(t.expected_return_date));
        assert!(t.is_overdue_at(late));
        t.status = TransactionStatus::Returned;
        assert!(!t.is_overdue_at(late));
    }
}
