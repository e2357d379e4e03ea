//! Catalog management service

use chrono::Utc;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookChanges, BookStatus, CreateBook, Isbn, UpdateBook},
    repository::Repository,
};

fn book_not_found() -> AppError {
    AppError::NotFound("book not found".to_string())
}

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn add_book(&self, request: CreateBook) -> AppResult<Book> {
        request
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        let isbn = Isbn::parse(&request.isbn)?;

        let book = Book::new(isbn, request.title, request.author, request.quantity, Utc::now());
        self.repository.books.insert(&book).await?;

        tracing::info!(isbn = %book.isbn, quantity = book.quantity, "book added");
        Ok(book)
    }

    pub async fn list_books(&self) -> AppResult<Vec<Book>> {
        self.repository.books.list().await
    }

    pub async fn get_book(&self, isbn: &str) -> AppResult<Book> {
        let isbn = Isbn::parse(isbn)?;
        self.repository
            .books
            .find_by_isbn(isbn.as_str())
            .await?
            .ok_or_else(book_not_found)
    }

    /// Partial update. A new quantity always brings its derived status along.
    pub async fn update_book(&self, isbn: &str, request: UpdateBook) -> AppResult<Book> {
        request
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        let isbn = Isbn::parse(isbn)?;

        let new_isbn = match request.isbn {
            Some(ref raw) => Some(Isbn::parse(raw)?.as_str().to_string()),
            None => None,
        };

        let changes = BookChanges {
            isbn: new_isbn,
            title: request.title,
            author: request.author,
            quantity: request.quantity,
            status: request.quantity.map(BookStatus::for_quantity),
        };

        let book = self
            .repository
            .books
            .update(isbn.as_str(), &changes, Utc::now())
            .await?
            .ok_or_else(book_not_found)?;

        tracing::info!(isbn = %book.isbn, "book updated");
        Ok(book)
    }

    /// Remove a title nobody currently holds
    pub async fn delete_book(&self, isbn: &str) -> AppResult<()> {
        let isbn = Isbn::parse(isbn)?;
        let mut tx = self.repository.circulation.begin().await?;

        let book = tx
            .find_book(isbn.as_str())
            .await?
            .ok_or_else(book_not_found)?;

        if tx.count_open_borrows_for_book(book.id).await? > 0 {
            return Err(AppError::Conflict(
                "book is currently borrowed and cannot be deleted".to_string(),
            ));
        }

        tx.delete_book(book.id).await?;
        tx.commit().await?;

        tracing::info!(isbn = %isbn, "book deleted");
        Ok(())
    }
}
