//! Repository layer for persistence
//!
//! Services talk to the stores through [`CirculationStore`] and
//! [`SettingsStore`]. [`Repository`] is the Postgres implementation,
//! [`memory::MemoryRepository`] the in-process one.

pub mod books;
pub mod memory;
pub mod settings;
pub mod transactions;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    config::CirculationConfig,
    error::AppResult,
    models::{
        book::{Book, CreateBook, UpdateBook},
        fee::FeeConfig,
        transaction::{NewTransaction, Transaction, TransactionChanges, TransactionQuery},
    },
};

/// How transaction references are allocated
#[derive(Debug, Clone)]
pub struct ReferencePolicy {
    pub prefix: String,
    pub max_attempts: u32,
}

impl From<&CirculationConfig> for ReferencePolicy {
    fn from(config: &CirculationConfig) -> Self {
        Self {
            prefix: config.reference_prefix.clone(),
            max_attempts: config.reference_max_attempts.max(1),
        }
    }
}

/// Books and the transactions that move their copies.
///
/// Every method that changes `available_copies` writes the transaction row and
/// the copy count as one atomic unit: either both are stored or neither is.
#[async_trait]
pub trait CirculationStore: Send + Sync {
    /// Check the store is reachable
    async fn ping(&self) -> AppResult<()>;

    async fn list_books(&self) -> AppResult<Vec<Book>>;
    async fn get_book(&self, id: i64) -> AppResult<Book>;
    async fn create_book(&self, data: &CreateBook) -> AppResult<Book>;
    /// Descriptive fields, plus a copy count change that keeps loans out
    async fn update_book(&self, id: i64, data: &UpdateBook) -> AppResult<Book>;
    async fn set_book_archived(&self, id: i64, archived: bool) -> AppResult<Book>;
    /// Refused while any transaction references the book
    async fn delete_book(&self, id: i64) -> AppResult<()>;

    async fn list_transactions(&self, query: &TransactionQuery) -> AppResult<Vec<Transaction>>;
    async fn get_transaction(&self, id: i64) -> AppResult<Transaction>;
    /// Take copies off the shelf and record the borrow under a fresh reference
    async fn create_transaction(
        &self,
        data: &NewTransaction,
        references: &ReferencePolicy,
    ) -> AppResult<Transaction>;
    /// Apply an edit, restocking when it closes an open transaction and
    /// freezing the fee of a return with `fee_config`
    async fn update_transaction(
        &self,
        id: i64,
        changes: &TransactionChanges,
        at: DateTime<Utc>,
        fee_config: &FeeConfig,
    ) -> AppResult<Transaction>;
    /// Remove a transaction, restocking first if it was still open
    async fn delete_transaction(&self, id: i64) -> AppResult<Transaction>;
    /// Reclassify past-due `borrowed` transactions as `overdue`
    async fn mark_overdue(&self, now: DateTime<Utc>) -> AppResult<u64>;
}

/// Keyed JSON settings
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get_setting(&self, key: &str) -> AppResult<Option<serde_json::Value>>;
    /// Insert or replace the value stored under `key`
    async fn put_setting(&self, key: &str, value: serde_json::Value) -> AppResult<()>;
}

/// Postgres repository holding the connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CirculationStore for Repository {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn list_books(&self) -> AppResult<Vec<Book>> {
        self.books_list().await
    }

    async fn get_book(&self, id: i64) -> AppResult<Book> {
        self.books_get_by_id(id).await
    }

    async fn create_book(&self, data: &CreateBook) -> AppResult<Book> {
        self.books_create(data).await
    }

    async fn update_book(&self, id: i64, data: &UpdateBook) -> AppResult<Book> {
        self.books_update(id, data).await
    }

    async fn set_book_archived(&self, id: i64, archived: bool) -> AppResult<Book> {
        self.books_set_archived(id, archived).await
    }

    async fn delete_book(&self, id: i64) -> AppResult<()> {
        self.books_delete(id).await
    }

    async fn list_transactions(&self, query: &TransactionQuery) -> AppResult<Vec<Transaction>> {
        self.transactions_list(query).await
    }

    async fn get_transaction(&self, id: i64) -> AppResult<Transaction> {
        self.transactions_get_by_id(id).await
    }

    async fn create_transaction(
        &self,
        data: &NewTransaction,
        references: &ReferencePolicy,
    ) -> AppResult<Transaction> {
        self.transactions_create(data, references).await
    }

    async fn update_transaction(
        &self,
        id: i64,
        changes: &TransactionChanges,
        at: DateTime<Utc>,
        fee_config: &FeeConfig,
    ) -> AppResult<Transaction> {
        self.transactions_update(id, changes, at, fee_config).await
    }

    async fn delete_transaction(&self, id: i64) -> AppResult<Transaction> {
        self.transactions_delete(id).await
    }

    async fn mark_overdue(&self, now: DateTime<Utc>) -> AppResult<u64> {
        self.transactions_mark_overdue(now).await
    }
}

#[async_trait]
impl SettingsStore for Repository {
    async fn get_setting(&self, key: &str) -> AppResult<Option<serde_json::Value>> {
        self.settings_get(key).await
    }

    async fn put_setting(&self, key: &str, value: serde_json::Value) -> AppResult<()> {
        self.settings_put(key, &value).await
    }
}
