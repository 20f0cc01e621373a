//! Settings endpoints

use axum::{extract::State, Json};

use crate::{
    error::AppResult,
    models::fee::{FeeConfig, UpdateFeeConfig},
};

use super::AuthenticatedUser;

/// Get the late-fee configuration
#[utoipa::path(
    get,
    path = "/settings/late-fee",
    tag = "settings",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Active late-fee configuration", body = FeeConfig)
    )
)]
pub async fn get_fee_config(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<FeeConfig>> {
    claims.require_read_circulation()?;
    Ok(Json(state.services.settings.get_fee_config().await))
}

/// Replace the late-fee configuration
#[utoipa::path(
    put,
    path = "/settings/late-fee",
    tag = "settings",
    security(("bearer_auth" = [])),
    request_body = UpdateFeeConfig,
    responses(
        (status = 200, description = "Configuration updated", body = FeeConfig),
        (status = 400, description = "Negative rate or unknown interval"),
        (status = 403, description = "Insufficient permissions")
    )
)]
pub async fn update_fee_config(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<UpdateFeeConfig>,
) -> AppResult<Json<FeeConfig>> {
    claims.require_admin()?;
    let config = FeeConfig::try_from(request)?;
    Ok(Json(state.services.settings.set_fee_config(config).await?))
}
