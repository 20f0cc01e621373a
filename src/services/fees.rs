//! Late-fee calculation
//!
//! Pure functions over an explicitly passed [`FeeConfig`]. Sub-day units
//! (second, minute, hour) count any started unit as a full one, while calendar
//! units (day, month, year) only count completed units. Weeks are 7-day
//! buckets over the completed day count, rounded up.

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::{
    enums::FeeInterval,
    fee::{Fee, FeeConfig},
    transaction::Transaction,
};

/// Fee owed for a loan due at `expected_return_date`, as of `as_of`
pub fn calculate_late_fee(
    config: &FeeConfig,
    expected_return_date: DateTime<Utc>,
    as_of: DateTime<Utc>,
) -> Decimal {
    if !config.is_charging() || as_of <= expected_return_date {
        return Decimal::ZERO;
    }

    let units = units_late(config.interval, expected_return_date, as_of);
    // Saturates at the largest storable amount
    Decimal::from(units)
        .checked_mul(config.rate)
        .map(|fee| fee.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
        .map_or(Fee::MAX_AMOUNT, |fee| fee.min(Fee::MAX_AMOUNT))
}

/// Number of `interval` units between the due date and `as_of`
pub fn units_late(interval: FeeInterval, expected: DateTime<Utc>, as_of: DateTime<Utc>) -> i64 {
    if as_of <= expected {
        return 0;
    }

    let elapsed = as_of - expected;
    // Overdue by a fraction of a second still counts as one second
    let seconds = elapsed.num_seconds().max(1);

    match interval {
        FeeInterval::Second => seconds,
        FeeInterval::Minute => div_ceil(seconds, 60),
        FeeInterval::Hour => div_ceil(seconds, 3_600),
        FeeInterval::Day => elapsed.num_days(),
        FeeInterval::Week => div_ceil(elapsed.num_days(), 7),
        FeeInterval::Month => whole_months(expected, as_of),
        FeeInterval::Year => whole_months(expected, as_of) / 12,
    }
}

/// Fee currently owed on a transaction.
///
/// A manual fee always wins, and a fee frozen at return is final. Otherwise
/// the fee is computed from the config: live while the loan is open and past
/// due, zero in every other case. Never mutates the transaction.
pub fn current_fee(transaction: &Transaction, config: &FeeConfig, now: DateTime<Utc>) -> Decimal {
    match transaction.fee {
        Fee::Manual { amount } | Fee::Frozen { amount } => amount,
        Fee::Auto if !config.enabled => Decimal::ZERO,
        Fee::Auto => match transaction.date_returned {
            Some(returned) => calculate_late_fee(config, transaction.expected_return_date, returned),
            None if transaction.is_overdue_at(now) => {
                calculate_late_fee(config, transaction.expected_return_date, now)
            }
            None => Decimal::ZERO,
        },
    }
}

fn div_ceil(value: i64, unit: i64) -> i64 {
    (value + unit - 1) / unit
}

/// Completed calendar months, ignoring leftover days
fn whole_months(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    let mut months =
        i64::from(to.year() - from.year()) * 12 + i64::from(to.month()) - i64::from(from.month());
    if (to.day(), to.time()) < (from.day(), from.time()) {
        months -= 1;
    }
    months.max(0)
}
