//! Settings domain methods on Repository

use chrono::Utc;

use super::Repository;
use crate::error::AppResult;

impl Repository {
    /// Get the JSON value stored under `key`
    pub async fn settings_get(&self, key: &str) -> AppResult<Option<serde_json::Value>> {
        let value = sqlx::query_scalar::<_, serde_json::Value>("SELECT value FROM settings WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    /// Upsert the JSON value stored under `key`
    pub async fn settings_put(&self, key: &str, value: &serde_json::Value) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
