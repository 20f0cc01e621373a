//! In-process store
//!
//! Keeps everything behind a single mutex, so each method runs as one atomic
//! unit the same way a Postgres transaction does. Backs the test suites and
//! `storage.backend = "memory"` development runs.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::{CirculationStore, ReferencePolicy, SettingsStore};
use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, CreateBook, UpdateBook},
        enums::{InventoryEffect, TransactionStatus},
        fee::{Fee, FeeConfig},
        transaction::{
            format_reference, reference_number, NewTransaction, Transaction, TransactionChanges,
            TransactionQuery,
        },
    },
};

#[derive(Default)]
struct MemoryState {
    books: BTreeMap<i64, Book>,
    transactions: BTreeMap<i64, Transaction>,
    settings: HashMap<String, serde_json::Value>,
    last_book_id: i64,
    last_transaction_id: i64,
}

impl MemoryState {
    fn book(&self, id: i64) -> AppResult<&Book> {
        self.books
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))
    }

    fn book_mut(&mut self, id: i64) -> AppResult<&mut Book> {
        self.books
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))
    }

    fn transaction(&self, id: i64) -> AppResult<&Transaction> {
        self.transactions
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Transaction {} not found", id)))
    }

    fn allocate_reference(&self, policy: &ReferencePolicy) -> AppResult<String> {
        let mut number = self
            .transactions
            .values()
            .filter_map(|t| reference_number(&policy.prefix, &t.reference))
            .max()
            .map_or(1, |n| n + 1);

        for _ in 0..policy.max_attempts {
            let candidate = format_reference(&policy.prefix, number);
            if !self.transactions.values().any(|t| t.reference == candidate) {
                return Ok(candidate);
            }
            number += 1;
        }

        Err(AppError::ReferenceExhausted(policy.max_attempts))
    }
}

/// Store kept in process memory
#[derive(Clone, Default)]
pub struct MemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CirculationStore for MemoryRepository {
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn list_books(&self) -> AppResult<Vec<Book>> {
        let state = self.state.lock().await;
        let mut books: Vec<Book> = state.books.values().cloned().collect();
        books.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(books)
    }

    async fn get_book(&self, id: i64) -> AppResult<Book> {
        let state = self.state.lock().await;
        state.book(id).cloned()
    }

    async fn create_book(&self, data: &CreateBook) -> AppResult<Book> {
        let mut state = self.state.lock().await;
        state.last_book_id += 1;
        let now = Utc::now();
        let book = Book {
            id: state.last_book_id,
            title: data.title.clone(),
            author: data.author.clone(),
            isbn: data.isbn.clone(),
            total_copies: data.total_copies,
            available_copies: data.total_copies,
            is_archived: false,
            created_at: now,
            updated_at: now,
        };
        state.books.insert(book.id, book.clone());
        Ok(book)
    }

    async fn update_book(&self, id: i64, data: &UpdateBook) -> AppResult<Book> {
        let mut state = self.state.lock().await;
        let mut book = state.book(id)?.clone();

        if let Some(title) = &data.title {
            book.title = title.clone();
        }
        if data.author.is_some() {
            book.author = data.author.clone();
        }
        if data.isbn.is_some() {
            book.isbn = data.isbn.clone();
        }
        if let Some(total) = data.total_copies {
            book.resize(total)?;
        }
        book.updated_at = Utc::now();

        state.books.insert(id, book.clone());
        Ok(book)
    }

    async fn set_book_archived(&self, id: i64, archived: bool) -> AppResult<Book> {
        let mut state = self.state.lock().await;
        let book = state.book_mut(id)?;
        book.is_archived = archived;
        book.updated_at = Utc::now();
        Ok(book.clone())
    }

    async fn delete_book(&self, id: i64) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.book(id)?;
        if state.transactions.values().any(|t| t.book_id == id) {
            return Err(AppError::Conflict(format!(
                "Book {} has transactions, archive it instead",
                id
            )));
        }
        state.books.remove(&id);
        Ok(())
    }

    async fn list_transactions(&self, query: &TransactionQuery) -> AppResult<Vec<Transaction>> {
        let state = self.state.lock().await;
        let mut rows: Vec<Transaction> = state
            .transactions
            .values()
            .filter(|t| query.matches(t))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.date_borrowed.cmp(&a.date_borrowed).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn get_transaction(&self, id: i64) -> AppResult<Transaction> {
        let state = self.state.lock().await;
        state.transaction(id).cloned()
    }

    async fn create_transaction(
        &self,
        data: &NewTransaction,
        references: &ReferencePolicy,
    ) -> AppResult<Transaction> {
        let mut state = self.state.lock().await;

        let mut book = state.book(data.book_id)?.clone();
        if book.is_archived {
            return Err(AppError::BusinessRule(format!(
                "Book {} is archived and cannot be borrowed",
                book.id
            )));
        }
        book.checkout(data.quantity)?;
        let reference = state.allocate_reference(references)?;

        // Nothing below can fail, the book and the record land together
        let now = Utc::now();
        state.last_transaction_id += 1;
        let transaction = Transaction {
            id: state.last_transaction_id,
            reference,
            book_id: data.book_id,
            borrower_id: data.borrower_id,
            quantity: data.quantity,
            date_borrowed: data.date_borrowed,
            expected_return_date: data.expected_return_date,
            date_returned: None,
            date_canceled: None,
            fee: Fee::Auto,
            status: TransactionStatus::Borrowed,
            is_lost: false,
            created_at: now,
            updated_at: now,
        };
        book.updated_at = now;
        state.books.insert(book.id, book);
        state.transactions.insert(transaction.id, transaction.clone());
        Ok(transaction)
    }

    async fn update_transaction(
        &self,
        id: i64,
        changes: &TransactionChanges,
        at: DateTime<Utc>,
        fee_config: &FeeConfig,
    ) -> AppResult<Transaction> {
        let mut state = self.state.lock().await;

        let mut transaction = state.transaction(id)?.clone();
        let effect = transaction.apply(changes, at, fee_config)?;

        if effect == InventoryEffect::Restock {
            let book = state.book_mut(transaction.book_id)?;
            book.restock(transaction.quantity);
            book.updated_at = at;
        }
        state.transactions.insert(id, transaction.clone());
        Ok(transaction)
    }

    async fn delete_transaction(&self, id: i64) -> AppResult<Transaction> {
        let mut state = self.state.lock().await;

        let transaction = state.transaction(id)?.clone();
        if transaction.status.is_open() {
            let book = state.book_mut(transaction.book_id)?;
            book.restock(transaction.quantity);
            book.updated_at = Utc::now();
        }
        state.transactions.remove(&id);
        Ok(transaction)
    }

    async fn mark_overdue(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let mut state = self.state.lock().await;
        let mut count = 0;
        for transaction in state.transactions.values_mut() {
            if transaction.status == TransactionStatus::Borrowed && transaction.expected_return_date < now {
                transaction.status = TransactionStatus::Overdue;
                transaction.updated_at = now;
                count += 1;
            }
        }
        Ok(count)
    }
}

#[async_trait]
impl SettingsStore for MemoryRepository {
    async fn get_setting(&self, key: &str) -> AppResult<Option<serde_json::Value>> {
        let state = self.state.lock().await;
        Ok(state.settings.get(key).cloned())
    }

    async fn put_setting(&self, key: &str, value: serde_json::Value) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.settings.insert(key.to_string(), value);
        Ok(())
    }
}
