//! Book (inventory unit) model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::enums::BookStatus;
use crate::error::{AppError, AppResult};

/// Book model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub total_copies: i32,
    pub available_copies: i32,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// Shelf status, computed on read
    pub fn status(&self) -> BookStatus {
        if self.is_archived {
            BookStatus::Archived
        } else if self.available_copies > 0 {
            BookStatus::Available
        } else {
            BookStatus::Unavailable
        }
    }

    /// Take `quantity` copies off the shelf
    pub fn checkout(&mut self, quantity: i32) -> AppResult<()> {
        if quantity < 1 {
            return Err(AppError::Validation("Quantity must be at least 1".to_string()));
        }
        if self.available_copies < quantity {
            return Err(AppError::InsufficientInventory {
                requested: quantity,
                available: self.available_copies.max(0),
            });
        }
        self.available_copies -= quantity;
        Ok(())
    }

    /// Put `quantity` copies back on the shelf
    pub fn restock(&mut self, quantity: i32) {
        self.available_copies = (self.available_copies + quantity).min(self.total_copies);
    }

    /// Change the owned copy count, shifting available copies by the same delta
    pub fn resize(&mut self, total_copies: i32) -> AppResult<()> {
        let delta = total_copies - self.total_copies;
        let available = self.available_copies + delta;
        if total_copies < 0 || available < 0 {
            return Err(AppError::BusinessRule(format!(
                "Cannot reduce to {} copies, {} are currently on loan",
                total_copies,
                self.total_copies - self.available_copies
            )));
        }
        self.total_copies = total_copies;
        self.available_copies = available;
        Ok(())
    }
}

/// Book as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookDetails {
    pub id: i64,
    pub title: String,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub total_copies: i32,
    pub available_copies: i32,
    pub status: BookStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Book> for BookDetails {
    fn from(book: Book) -> Self {
        let status = book.status();
        Self {
            id: book.id,
            title: book.title,
            author: book.author,
            isbn: book.isbn,
            total_copies: book.total_copies,
            available_copies: book.available_copies,
            status,
            created_at: book.created_at,
            updated_at: book.updated_at,
        }
    }
}

/// Create book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    pub author: Option<String>,
    pub isbn: Option<String>,
    #[validate(range(min = 0, message = "Copy count cannot be negative"))]
    pub total_copies: i32,
}

/// Update book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, message = "Title cannot be empty"))]
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    #[validate(range(min = 0, message = "Copy count cannot be negative"))]
    pub total_copies: Option<i32>,
}
