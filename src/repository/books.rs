//! Books repository for database operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{unique_violation, AppResult},
    models::book::{Book, BookChanges},
};

/// Catalogue reads and librarian edits. Circulation writes go through
/// [`super::circulation::CirculationTx`] instead.
#[async_trait]
pub trait BookStore: Send + Sync {
    async fn list(&self) -> AppResult<Vec<Book>>;

    async fn find_by_isbn(&self, isbn: &str) -> AppResult<Option<Book>>;

    async fn find_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Book>>;

    /// Fails with a conflict when the ISBN is already catalogued
    async fn insert(&self, book: &Book) -> AppResult<()>;

    async fn update(
        &self,
        isbn: &str,
        changes: &BookChanges,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Book>>;
}

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookStore for BooksRepository {
    async fn list(&self) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>("SELECT * FROM books ORDER BY title, isbn")
            .fetch_all(&self.pool)
            .await?;
        Ok(books)
    }

    async fn find_by_isbn(&self, isbn: &str) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE isbn = $1")
            .bind(isbn)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Book>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let books = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(books)
    }

    async fn insert(&self, book: &Book) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO books (id, isbn, title, author, status, quantity, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(book.id)
        .bind(&book.isbn)
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.status)
        .bind(book.quantity)
        .bind(book.created_at)
        .bind(book.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| unique_violation(e, "book already exists"))?;

        Ok(())
    }

    async fn update(
        &self,
        isbn: &str,
        changes: &BookChanges,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books SET
                isbn = COALESCE($2, isbn),
                title = COALESCE($3, title),
                author = COALESCE($4, author),
                quantity = COALESCE($5, quantity),
                status = COALESCE($6, status),
                updated_at = $7
            WHERE isbn = $1
            RETURNING *
            "#,
        )
        .bind(isbn)
        .bind(&changes.isbn)
        .bind(&changes.title)
        .bind(&changes.author)
        .bind(changes.quantity)
        .bind(changes.status)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| unique_violation(e, "book already exists"))?;

        Ok(book)
    }
}
