//! Late-fee configuration and per-transaction fee mode

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::enums::FeeInterval;
use crate::error::{AppError, AppResult};

/// Settings key under which the active fee configuration is stored
pub const LATE_FEE_SETTING_KEY: &str = "late_fee";

/// Global late-fee configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FeeConfig {
    /// Master switch, no fee is ever charged when off
    pub enabled: bool,
    /// Amount charged per unit of lateness
    #[schema(value_type = String, example = "0.50")]
    pub rate: Decimal,
    /// Unit in which lateness is measured
    pub interval: FeeInterval,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            rate: Decimal::ZERO,
            interval: FeeInterval::Day,
        }
    }
}

impl FeeConfig {
    pub fn validate(&self) -> AppResult<()> {
        if self.rate < Decimal::ZERO {
            return Err(AppError::InvalidConfig(format!(
                "Rate must be zero or positive, got {}",
                self.rate
            )));
        }
        Ok(())
    }

    /// Whether computing a fee can yield anything but zero
    pub fn is_charging(&self) -> bool {
        self.enabled && self.rate > Decimal::ZERO
    }
}

/// Update fee configuration request
///
/// `interval` stays a free string so unknown units surface as a configuration
/// error instead of a body rejection.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateFeeConfig {
    pub enabled: bool,
    #[schema(value_type = String, example = "0.50")]
    pub rate: Decimal,
    #[schema(example = "day")]
    pub interval: String,
}

impl TryFrom<UpdateFeeConfig> for FeeConfig {
    type Error = AppError;

    fn try_from(request: UpdateFeeConfig) -> Result<Self, Self::Error> {
        let config = FeeConfig {
            enabled: request.enabled,
            rate: request.rate,
            interval: request.interval.parse()?,
        };
        config.validate()?;
        Ok(config)
    }
}

/// How a transaction's fee is determined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Fee {
    /// Computed from the fee configuration and the loan dates
    #[default]
    Auto,
    /// Fixed by staff, disables computation for good
    Manual {
        #[schema(value_type = String, example = "10.00")]
        amount: Decimal,
    },
    /// Settled when the copies came back, never recomputed
    Frozen {
        #[schema(value_type = String, example = "35.00")]
        amount: Decimal,
    },
}

impl Fee {
    pub const AUTO_MODE: &'static str = "auto";
    pub const MANUAL_MODE: &'static str = "manual";
    pub const FROZEN_MODE: &'static str = "frozen";

    /// Largest amount a `NUMERIC(14, 2)` fee column holds: 999 999 999 999.99
    pub const MAX_AMOUNT: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, 2);

    /// Rebuild from the `fee_mode` / `fee_amount` columns
    pub fn from_columns(mode: &str, amount: Option<Decimal>) -> AppResult<Self> {
        match (mode, amount) {
            (Self::AUTO_MODE, _) => Ok(Fee::Auto),
            (Self::MANUAL_MODE, Some(amount)) => Ok(Fee::Manual { amount }),
            (Self::FROZEN_MODE, Some(amount)) => Ok(Fee::Frozen { amount }),
            (mode @ (Self::MANUAL_MODE | Self::FROZEN_MODE), None) => Err(AppError::Internal(
                format!("Fee mode '{}' stored without an amount", mode),
            )),
            (other, _) => Err(AppError::Internal(format!("Unknown fee mode '{}'", other))),
        }
    }

    pub fn mode(&self) -> &'static str {
        match self {
            Fee::Auto => Self::AUTO_MODE,
            Fee::Manual { .. } => Self::MANUAL_MODE,
            Fee::Frozen { .. } => Self::FROZEN_MODE,
        }
    }

    /// Stored amount, `None` while the fee is still computed
    pub fn amount(&self) -> Option<Decimal> {
        match self {
            Fee::Auto => None,
            Fee::Manual { amount } | Fee::Frozen { amount } => Some(*amount),
        }
    }

    /// Check a fee sent by staff. Frozen fees only come from a return.
    pub fn validate(&self) -> AppResult<()> {
        match self {
            Fee::Auto => Ok(()),
            Fee::Frozen { .. } => Err(AppError::Validation(
                "Frozen fees are set when the copies are returned".to_string(),
            )),
            Fee::Manual { amount } if *amount < Decimal::ZERO => Err(AppError::Validation(
                "Manual fee must be zero or positive".to_string(),
            )),
            Fee::Manual { amount } if amount.normalize().scale() > 2 => Err(AppError::Validation(
                "Manual fee cannot have more than 2 decimal places".to_string(),
            )),
            Fee::Manual { amount } if *amount > Self::MAX_AMOUNT => Err(AppError::Validation(
                format!("Manual fee cannot exceed {}", Self::MAX_AMOUNT),
            )),
            Fee::Manual { .. } => Ok(()),
        }
    }
}
