//! Borrow transaction endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::transaction::{CreateTransaction, TransactionChanges, TransactionDetails, TransactionQuery},
};

use super::AuthenticatedUser;

/// Overdue sweep result
#[derive(Serialize, ToSchema)]
pub struct OverdueRefreshResponse {
    /// Number of transactions reclassified as overdue
    pub updated: u64,
}

/// List transactions
#[utoipa::path(
    get,
    path = "/transactions",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(TransactionQuery),
    responses(
        (status = 200, description = "Transactions, newest first", body = Vec<TransactionDetails>)
    )
)]
pub async fn list_transactions(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<TransactionQuery>,
) -> AppResult<Json<Vec<TransactionDetails>>> {
    claims.require_read_circulation()?;
    Ok(Json(state.services.circulation.list(&query).await?))
}

/// Get transaction by ID, with its current fee
#[utoipa::path(
    get,
    path = "/transactions/{id}",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Transaction ID")),
    responses(
        (status = 200, description = "Transaction details", body = TransactionDetails),
        (status = 404, description = "Transaction not found")
    )
)]
pub async fn get_transaction(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<TransactionDetails>> {
    claims.require_read_circulation()?;
    Ok(Json(state.services.circulation.get(id).await?))
}

/// Borrow copies of a book
#[utoipa::path(
    post,
    path = "/transactions",
    tag = "transactions",
    security(("bearer_auth" = [])),
    request_body = CreateTransaction,
    responses(
        (status = 201, description = "Transaction created", body = TransactionDetails),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Not enough copies available")
    )
)]
pub async fn create_transaction(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateTransaction>,
) -> AppResult<(StatusCode, Json<TransactionDetails>)> {
    claims.require_write_circulation()?;
    let transaction = state.services.circulation.borrow(request).await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

/// Edit a transaction
#[utoipa::path(
    put,
    path = "/transactions/{id}",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Transaction ID")),
    request_body = TransactionChanges,
    responses(
        (status = 200, description = "Transaction updated", body = TransactionDetails),
        (status = 404, description = "Transaction not found"),
        (status = 422, description = "Status change not allowed")
    )
)]
pub async fn update_transaction(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(changes): Json<TransactionChanges>,
) -> AppResult<Json<TransactionDetails>> {
    claims.require_write_circulation()?;
    Ok(Json(state.services.circulation.update(id, changes).await?))
}

/// Return borrowed copies
#[utoipa::path(
    post,
    path = "/transactions/{id}/return",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Transaction ID")),
    responses(
        (status = 200, description = "Copies returned", body = TransactionDetails),
        (status = 404, description = "Transaction not found"),
        (status = 422, description = "Transaction already canceled")
    )
)]
pub async fn return_transaction(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<TransactionDetails>> {
    claims.require_write_circulation()?;
    Ok(Json(state.services.circulation.return_transaction(id).await?))
}

/// Cancel a borrow
#[utoipa::path(
    post,
    path = "/transactions/{id}/cancel",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Transaction ID")),
    responses(
        (status = 200, description = "Transaction canceled", body = TransactionDetails),
        (status = 404, description = "Transaction not found"),
        (status = 422, description = "Transaction already returned")
    )
)]
pub async fn cancel_transaction(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<TransactionDetails>> {
    claims.require_write_circulation()?;
    Ok(Json(state.services.circulation.cancel(id).await?))
}

/// Delete a transaction
#[utoipa::path(
    delete,
    path = "/transactions/{id}",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Transaction ID")),
    responses(
        (status = 204, description = "Transaction deleted"),
        (status = 404, description = "Transaction not found")
    )
)]
pub async fn delete_transaction(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;
    state.services.circulation.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Mark past-due borrows as overdue
#[utoipa::path(
    post,
    path = "/circulation/overdue",
    tag = "transactions",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Sweep done", body = OverdueRefreshResponse)
    )
)]
pub async fn refresh_overdue(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<OverdueRefreshResponse>> {
    claims.require_write_circulation()?;
    let updated = state.services.circulation.refresh_overdue().await?;
    Ok(Json(OverdueRefreshResponse { updated }))
}
