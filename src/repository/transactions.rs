//! Transactions domain methods on Repository

use chrono::{DateTime, Utc};
use sqlx::Postgres;

use super::{ReferencePolicy, Repository};
use crate::{
    error::{AppError, AppResult},
    models::{
        book::Book,
        enums::{InventoryEffect, TransactionStatus},
        fee::FeeConfig,
        transaction::{
            format_reference, next_reference_number, NewTransaction, Transaction,
            TransactionChanges, TransactionQuery, TransactionRow,
        },
    },
};

const REFERENCE_CONSTRAINT: &str = "transactions_reference_key";

type PgTx<'c> = sqlx::Transaction<'c, Postgres>;

impl Repository {
    /// List transactions, newest first
    pub async fn transactions_list(&self, query: &TransactionQuery) -> AppResult<Vec<Transaction>> {
        let mut conditions = Vec::new();
        let mut idx = 1;

        if query.status.is_some() {
            conditions.push(format!("status = ${}", idx));
            idx += 1;
        }
        if query.book_id.is_some() {
            conditions.push(format!("book_id = ${}", idx));
            idx += 1;
        }
        if query.borrower_id.is_some() {
            conditions.push(format!("borrower_id = ${}", idx));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let select_q = format!(
            "SELECT * FROM transactions {} ORDER BY date_borrowed DESC, id DESC",
            where_clause
        );
        let mut builder = sqlx::query_as::<_, TransactionRow>(&select_q);
        if let Some(status) = query.status {
            builder = builder.bind(status.as_str());
        }
        if let Some(book_id) = query.book_id {
            builder = builder.bind(book_id);
        }
        if let Some(borrower_id) = query.borrower_id {
            builder = builder.bind(borrower_id);
        }

        builder
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Transaction::try_from)
            .collect()
    }

    /// Get transaction by ID
    pub async fn transactions_get_by_id(&self, id: i64) -> AppResult<Transaction> {
        sqlx::query_as::<_, TransactionRow>("SELECT * FROM transactions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Transaction {} not found", id)))?
            .try_into()
    }

    /// Create a borrow, retrying when another request grabbed the same reference
    pub async fn transactions_create(
        &self,
        data: &NewTransaction,
        policy: &ReferencePolicy,
    ) -> AppResult<Transaction> {
        for attempt in 1..=policy.max_attempts {
            match self.try_create_transaction(data, policy).await {
                Err(AppError::Database(e)) if is_reference_conflict(&e) => {
                    tracing::warn!("Reference collision on attempt {}/{}, retrying", attempt, policy.max_attempts);
                }
                other => return other,
            }
        }
        Err(AppError::ReferenceExhausted(policy.max_attempts))
    }

    async fn try_create_transaction(
        &self,
        data: &NewTransaction,
        policy: &ReferencePolicy,
    ) -> AppResult<Transaction> {
        let mut tx = self.pool.begin().await?;

        let mut book = lock_book(&mut tx, data.book_id).await?;
        if book.is_archived {
            return Err(AppError::BusinessRule(format!(
                "Book {} is archived and cannot be borrowed",
                book.id
            )));
        }
        book.checkout(data.quantity)?;

        let reference = allocate_reference(&mut tx, policy).await?;

        let row = sqlx::query_as::<_, TransactionRow>(
            r#"
            INSERT INTO transactions (
                reference, book_id, borrower_id, quantity, date_borrowed,
                expected_return_date, fee_mode, status, is_lost, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, 'auto', $7, FALSE, $8, $8)
            RETURNING *
            "#,
        )
        .bind(&reference)
        .bind(data.book_id)
        .bind(data.borrower_id)
        .bind(data.quantity)
        .bind(data.date_borrowed)
        .bind(data.expected_return_date)
        .bind(TransactionStatus::Borrowed.as_str())
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        store_available_copies(&mut tx, &book).await?;
        tx.commit().await?;

        row.try_into()
    }

    /// Edit a transaction and its book's copy count in one database transaction
    pub async fn transactions_update(
        &self,
        id: i64,
        changes: &TransactionChanges,
        at: DateTime<Utc>,
        fee_config: &FeeConfig,
    ) -> AppResult<Transaction> {
        let mut tx = self.pool.begin().await?;

        let mut transaction = lock_transaction(&mut tx, id).await?;
        let effect = transaction.apply(changes, at, fee_config)?;

        if effect == InventoryEffect::Restock {
            let mut book = lock_book(&mut tx, transaction.book_id).await?;
            book.restock(transaction.quantity);
            store_available_copies(&mut tx, &book).await?;
        }

        let row = sqlx::query_as::<_, TransactionRow>(
            r#"
            UPDATE transactions SET
                status = $2, expected_return_date = $3, date_returned = $4, date_canceled = $5,
                fee_mode = $6, fee_amount = $7, is_lost = $8, updated_at = $9
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(transaction.status.as_str())
        .bind(transaction.expected_return_date)
        .bind(transaction.date_returned)
        .bind(transaction.date_canceled)
        .bind(transaction.fee.mode())
        .bind(transaction.fee.amount())
        .bind(transaction.is_lost)
        .bind(transaction.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        row.try_into()
    }

    /// Delete a transaction; an open one gives its copies back first
    pub async fn transactions_delete(&self, id: i64) -> AppResult<Transaction> {
        let mut tx = self.pool.begin().await?;

        let transaction = lock_transaction(&mut tx, id).await?;
        if transaction.status.is_open() {
            let mut book = lock_book(&mut tx, transaction.book_id).await?;
            book.restock(transaction.quantity);
            store_available_copies(&mut tx, &book).await?;
        }

        sqlx::query("DELETE FROM transactions WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(transaction)
    }

    /// Reclassify past-due borrows as overdue
    pub async fn transactions_mark_overdue(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE transactions SET status = $1, updated_at = $3
            WHERE status = $2 AND expected_return_date < $3
            "#,
        )
        .bind(TransactionStatus::Overdue.as_str())
        .bind(TransactionStatus::Borrowed.as_str())
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

async fn lock_book(tx: &mut PgTx<'_>, id: i64) -> AppResult<Book> {
    sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))
}

async fn lock_transaction(tx: &mut PgTx<'_>, id: i64) -> AppResult<Transaction> {
    sqlx::query_as::<_, TransactionRow>("SELECT * FROM transactions WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Transaction {} not found", id)))?
        .try_into()
}

async fn store_available_copies(tx: &mut PgTx<'_>, book: &Book) -> AppResult<()> {
    sqlx::query("UPDATE books SET available_copies = $2, updated_at = $3 WHERE id = $1")
        .bind(book.id)
        .bind(book.available_copies)
        .bind(Utc::now())
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Next free `PREFIX-NNNNNN`, skipping references already taken
async fn allocate_reference(tx: &mut PgTx<'_>, policy: &ReferencePolicy) -> AppResult<String> {
    let prefix = &policy.prefix;
    // Digits start right after `PREFIX-`; SQL strings are 1-based
    let digits_from = i32::try_from(prefix.chars().count() + 2)
        .map_err(|_| AppError::Internal("Reference prefix too long".to_string()))?;
    let highest: Option<String> = sqlx::query_scalar(
        r#"
        SELECT reference FROM transactions
        WHERE starts_with(reference, $1)
          AND substr(reference, $2) ~ '^[0-9]+$'
        ORDER BY substr(reference, $2)::NUMERIC DESC
        LIMIT 1
        "#,
    )
    .bind(format!("{}-", prefix))
    .bind(digits_from)
    .fetch_optional(&mut **tx)
    .await?;

    let mut number = next_reference_number(prefix, highest.as_deref());
    for _ in 0..policy.max_attempts {
        let candidate = format_reference(prefix, number);
        let taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM transactions WHERE reference = $1)")
                .bind(&candidate)
                .fetch_one(&mut **tx)
                .await?;
        if !taken {
            return Ok(candidate);
        }
        number += 1;
    }

    Err(AppError::ReferenceExhausted(policy.max_attempts))
}

fn is_reference_conflict(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .map(|db| db.is_unique_violation() && db.constraint() == Some(REFERENCE_CONSTRAINT))
        .unwrap_or(false)
}
