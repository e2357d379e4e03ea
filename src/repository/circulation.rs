//! Unit of work for every write gated on the borrow ledger
//!
//! Borrow, return, member deactivation/removal and book removal each run
//! inside one [`CirculationTx`]. Nothing is visible to other callers until
//! [`CirculationTx::commit`] succeeds; dropping an uncommitted unit discards
//! every write made through it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Pool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookStatus},
        borrow::BorrowRecord,
        user::User,
    },
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CirculationStore: Send + Sync {
    async fn begin(&self) -> AppResult<Box<dyn CirculationTx>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CirculationTx: Send {
    /// Find a book and hold it until the unit ends
    async fn find_book(&mut self, isbn: &str) -> AppResult<Option<Book>>;

    /// Add `delta` to the quantity only if the result stays non-negative.
    /// Returns the new quantity, or `None` when the guard refused the change.
    async fn adjust_quantity(&mut self, book_id: Uuid, delta: i32) -> AppResult<Option<i32>>;

    async fn set_book_status(
        &mut self,
        book_id: Uuid,
        status: BookStatus,
        now: DateTime<Utc>,
    ) -> AppResult<()>;

    async fn delete_book(&mut self, book_id: Uuid) -> AppResult<()>;

    async fn count_open_borrows_for_book(&mut self, book_id: Uuid) -> AppResult<i64>;

    async fn insert_borrow_record(&mut self, record: &BorrowRecord) -> AppResult<()>;

    /// Most recent open record for the pair
    async fn find_open_borrow_record(
        &mut self,
        book_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<BorrowRecord>>;

    /// Mark a record returned. `false` when it was no longer open.
    async fn close_borrow_record(
        &mut self,
        record_id: Uuid,
        returned_at: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// Find a user and hold it until the unit ends
    async fn find_user(&mut self, user_id: Uuid) -> AppResult<Option<User>>;

    /// `false` when the user does not exist
    async fn set_user_active(
        &mut self,
        user_id: Uuid,
        active: bool,
        now: DateTime<Utc>,
    ) -> AppResult<bool>;

    async fn count_open_borrows_for_user(&mut self, user_id: Uuid) -> AppResult<i64>;

    /// `false` when the user does not exist
    async fn delete_user(&mut self, user_id: Uuid) -> AppResult<bool>;

    async fn commit(&mut self) -> AppResult<()>;
}

#[derive(Clone)]
pub struct CirculationRepository {
    pool: Pool<Postgres>,
}

impl CirculationRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CirculationStore for CirculationRepository {
    async fn begin(&self) -> AppResult<Box<dyn CirculationTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgCirculationTx { tx: Some(tx) }))
    }
}

/// Postgres unit of work; rows read through it are locked `FOR UPDATE`
pub struct PgCirculationTx {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgCirculationTx {
    fn conn(&mut self) -> AppResult<&mut PgConnection> {
        match self.tx.as_mut() {
            Some(tx) => Ok(&mut **tx),
            None => Err(AppError::Internal("circulation transaction already committed".to_string())),
        }
    }
}

#[async_trait]
impl CirculationTx for PgCirculationTx {
    async fn find_book(&mut self, isbn: &str) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE isbn = $1 FOR UPDATE")
            .bind(isbn)
            .fetch_optional(self.conn()?)
            .await?;
        Ok(book)
    }

    async fn adjust_quantity(&mut self, book_id: Uuid, delta: i32) -> AppResult<Option<i32>> {
        let quantity = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE books SET quantity = quantity + $2
            WHERE id = $1 AND quantity + $2 >= 0
            RETURNING quantity
            "#,
        )
        .bind(book_id)
        .bind(delta)
        .fetch_optional(self.conn()?)
        .await?;
        Ok(quantity)
    }

    async fn set_book_status(
        &mut self,
        book_id: Uuid,
        status: BookStatus,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query("UPDATE books SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(book_id)
            .bind(status)
            .bind(now)
            .execute(self.conn()?)
            .await?;
        Ok(())
    }

    async fn delete_book(&mut self, book_id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(book_id)
            .execute(self.conn()?)
            .await?;
        Ok(())
    }

    async fn count_open_borrows_for_book(&mut self, book_id: Uuid) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrow_records WHERE book_id = $1 AND status = 'BORROWED'",
        )
        .bind(book_id)
        .fetch_one(self.conn()?)
        .await?;
        Ok(count)
    }

    async fn insert_borrow_record(&mut self, record: &BorrowRecord) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO borrow_records (id, user_id, book_id, borrowed_at, returned_at, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(record.id)
        .bind(record.user_id)
        .bind(record.book_id)
        .bind(record.borrowed_at)
        .bind(record.returned_at)
        .bind(record.status)
        .execute(self.conn()?)
        .await?;
        Ok(())
    }

    async fn find_open_borrow_record(
        &mut self,
        book_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<BorrowRecord>> {
        let record = sqlx::query_as::<_, BorrowRecord>(
            r#"
            SELECT * FROM borrow_records
            WHERE book_id = $1 AND user_id = $2 AND status = 'BORROWED'
            ORDER BY borrowed_at DESC
            LIMIT 1
            "#,
        )
        .bind(book_id)
        .bind(user_id)
        .fetch_optional(self.conn()?)
        .await?;
        Ok(record)
    }

    async fn close_borrow_record(
        &mut self,
        record_id: Uuid,
        returned_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE borrow_records SET status = 'RETURNED', returned_at = $2
            WHERE id = $1 AND status = 'BORROWED'
            "#,
        )
        .bind(record_id)
        .bind(returned_at)
        .execute(self.conn()?)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_user(&mut self, user_id: Uuid) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(self.conn()?)
            .await?;
        Ok(user)
    }

    async fn set_user_active(
        &mut self,
        user_id: Uuid,
        active: bool,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = sqlx::query("UPDATE users SET is_active = $2, updated_at = $3 WHERE id = $1")
            .bind(user_id)
            .bind(active)
            .bind(now)
            .execute(self.conn()?)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_open_borrows_for_user(&mut self, user_id: Uuid) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrow_records WHERE user_id = $1 AND status = 'BORROWED'",
        )
        .bind(user_id)
        .fetch_one(self.conn()?)
        .await?;
        Ok(count)
    }

    async fn delete_user(&mut self, user_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(self.conn()?)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn commit(&mut self) -> AppResult<()> {
        match self.tx.take() {
            Some(tx) => {
                tx.commit().await?;
                Ok(())
            }
            None => Err(AppError::Internal("circulation transaction already committed".to_string())),
        }
    }
}
