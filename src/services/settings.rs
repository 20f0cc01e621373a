//! Settings service

use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::fee::{FeeConfig, LATE_FEE_SETTING_KEY},
    repository::SettingsStore,
};

#[derive(Clone)]
pub struct SettingsService {
    store: Arc<dyn SettingsStore>,
}

impl SettingsService {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self { store }
    }

    /// Active late-fee configuration for display and live fees.
    ///
    /// Never fails: an unreadable store logs and yields the disabled default.
    pub async fn get_fee_config(&self) -> FeeConfig {
        match self.load_fee_config().await {
            Ok(config) => config,
            Err(e) => {
                tracing::error!("Cannot read late-fee configuration, using defaults: {}", e);
                FeeConfig::default()
            }
        }
    }

    /// Active late-fee configuration, or the disabled default when none is
    /// stored. Storage errors propagate, so settling a fee never runs on a
    /// configuration that could not be read.
    pub async fn load_fee_config(&self) -> AppResult<FeeConfig> {
        let Some(value) = self.store.get_setting(LATE_FEE_SETTING_KEY).await? else {
            return Ok(FeeConfig::default());
        };

        match serde_json::from_value::<FeeConfig>(value) {
            Ok(config) if config.validate().is_ok() => Ok(config),
            Ok(_) | Err(_) => {
                tracing::warn!("Stored late-fee configuration is invalid, using defaults");
                Ok(FeeConfig::default())
            }
        }
    }

    /// Replace the late-fee configuration
    pub async fn set_fee_config(&self, config: FeeConfig) -> AppResult<FeeConfig> {
        config.validate()?;

        let value = serde_json::to_value(&config)
            .map_err(|e| AppError::Internal(format!("Cannot encode fee configuration: {}", e)))?;
        self.store.put_setting(LATE_FEE_SETTING_KEY, value).await?;

        tracing::info!(
            "Late-fee configuration updated: enabled={}, rate={}, interval={}",
            config.enabled,
            config.rate,
            config.interval
        );
        Ok(config)
    }
}
