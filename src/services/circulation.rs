//! Circulation service: borrow, return, cancel and delete transactions
//!
//! Copy counts only move through the store's atomic operations: one checkout
//! when a borrow is created, one restock when it leaves the open
//! (`borrowed`/`overdue`) state, whether by status change or deletion.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use validator::Validate;

use super::{fees, settings::SettingsService};
use crate::{
    config::CirculationConfig,
    error::{AppError, AppResult},
    models::{
        enums::TransactionStatus,
        fee::FeeConfig,
        transaction::{
            CreateTransaction, NewTransaction, Transaction, TransactionChanges,
            TransactionDetails, TransactionQuery,
        },
    },
    repository::{CirculationStore, ReferencePolicy},
};

#[derive(Clone)]
pub struct CirculationService {
    store: Arc<dyn CirculationStore>,
    settings: SettingsService,
    references: ReferencePolicy,
    default_loan_days: i64,
}

impl CirculationService {
    pub fn new(
        store: Arc<dyn CirculationStore>,
        settings: SettingsService,
        config: &CirculationConfig,
    ) -> Self {
        Self {
            store,
            settings,
            references: ReferencePolicy::from(config),
            default_loan_days: config.default_loan_days,
        }
    }

    /// List transactions with their live fee
    pub async fn list(&self, query: &TransactionQuery) -> AppResult<Vec<TransactionDetails>> {
        let config = self.settings.get_fee_config().await;
        let now = Utc::now();
        Ok(self
            .store
            .list_transactions(query)
            .await?
            .into_iter()
            .map(|t| details(t, &config, now))
            .collect())
    }

    /// Get a transaction with its live fee
    pub async fn get(&self, id: i64) -> AppResult<TransactionDetails> {
        let transaction = self.store.get_transaction(id).await?;
        Ok(self.with_fee(transaction).await)
    }

    /// Borrow copies of a book
    pub async fn borrow(&self, request: CreateTransaction) -> AppResult<TransactionDetails> {
        request
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let date_borrowed = request.date_borrowed.unwrap_or_else(Utc::now);
        let expected_return_date = match request.expected_return_date {
            Some(date) => date,
            None => Duration::try_days(self.default_loan_days)
                .and_then(|loan| date_borrowed.checked_add_signed(loan))
                .ok_or_else(|| {
                    AppError::Validation("Borrow date is too far in the future".to_string())
                })?,
        };
        if expected_return_date < date_borrowed {
            return Err(AppError::Validation(
                "Expected return date precedes the borrow date".to_string(),
            ));
        }

        let new = NewTransaction {
            book_id: request.book_id,
            borrower_id: request.borrower_id,
            quantity: request.quantity,
            date_borrowed,
            expected_return_date,
        };
        let transaction = self.store.create_transaction(&new, &self.references).await?;

        tracing::info!(
            "Transaction {} created: book {} x{} for borrower {}",
            transaction.reference,
            transaction.book_id,
            transaction.quantity,
            transaction.borrower_id
        );
        Ok(self.with_fee(transaction).await)
    }

    /// Edit a transaction; status changes go through the lifecycle guard
    pub async fn update(&self, id: i64, changes: TransactionChanges) -> AppResult<TransactionDetails> {
        self.update_at(id, changes, Utc::now()).await
    }

    pub async fn update_at(
        &self,
        id: i64,
        changes: TransactionChanges,
        at: DateTime<Utc>,
    ) -> AppResult<TransactionDetails> {
        let config = self.settings.load_fee_config().await?;
        let transaction = self
            .store
            .update_transaction(id, &changes, at, &config)
            .await?;
        if let Some(status) = changes.status {
            tracing::info!("Transaction {} is now {}", transaction.reference, status);
        }
        Ok(details(transaction, &config, Utc::now()))
    }

    /// Return borrowed copies
    pub async fn return_transaction(&self, id: i64) -> AppResult<TransactionDetails> {
        self.update(id, TransactionChanges::status(TransactionStatus::Returned))
            .await
    }

    /// Cancel a borrow
    pub async fn cancel(&self, id: i64) -> AppResult<TransactionDetails> {
        self.update(id, TransactionChanges::status(TransactionStatus::Canceled))
            .await
    }

    /// Delete a transaction; an open one is treated as returned for inventory
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let transaction = self.store.delete_transaction(id).await?;
        tracing::info!(
            "Transaction {} deleted while {}",
            transaction.reference,
            transaction.status
        );
        Ok(())
    }

    /// Reclassify past-due borrows as overdue
    pub async fn refresh_overdue(&self) -> AppResult<u64> {
        let count = self.store.mark_overdue(Utc::now()).await?;
        if count > 0 {
            tracing::info!("{} transactions marked overdue", count);
        }
        Ok(count)
    }

    async fn with_fee(&self, transaction: Transaction) -> TransactionDetails {
        let config = self.settings.get_fee_config().await;
        details(transaction, &config, Utc::now())
    }
}

fn details(transaction: Transaction, config: &FeeConfig, now: DateTime<Utc>) -> TransactionDetails {
    let fee = fees::current_fee(&transaction, config, now);
    TransactionDetails::new(transaction, fee, now)
}
