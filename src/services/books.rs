//! Book inventory service

use std::sync::Arc;

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::book::{BookDetails, CreateBook, UpdateBook},
    repository::CirculationStore,
};

#[derive(Clone)]
pub struct BooksService {
    store: Arc<dyn CirculationStore>,
}

impl BooksService {
    pub fn new(store: Arc<dyn CirculationStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> AppResult<Vec<BookDetails>> {
        Ok(self
            .store
            .list_books()
            .await?
            .into_iter()
            .map(BookDetails::from)
            .collect())
    }

    pub async fn get_by_id(&self, id: i64) -> AppResult<BookDetails> {
        Ok(self.store.get_book(id).await?.into())
    }

    pub async fn create(&self, data: &CreateBook) -> AppResult<BookDetails> {
        data.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        let book = self.store.create_book(data).await?;
        tracing::info!("Book {} created with {} copies", book.id, book.total_copies);
        Ok(book.into())
    }

    pub async fn update(&self, id: i64, data: &UpdateBook) -> AppResult<BookDetails> {
        data.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        Ok(self.store.update_book(id, data).await?.into())
    }

    pub async fn archive(&self, id: i64) -> AppResult<BookDetails> {
        Ok(self.store.set_book_archived(id, true).await?.into())
    }

    pub async fn unarchive(&self, id: i64) -> AppResult<BookDetails> {
        Ok(self.store.set_book_archived(id, false).await?.into())
    }

    pub async fn delete(&self, id: i64) -> AppResult<()> {
        self.store.delete_book(id).await
    }
}
