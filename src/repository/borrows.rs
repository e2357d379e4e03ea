//! Borrow ledger reads

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{error::AppResult, models::borrow::BorrowRecord};

#[async_trait]
pub trait BorrowStore: Send + Sync {
    /// Every record of a user, oldest first
    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<BorrowRecord>>;

    /// Open records of a user, oldest first
    async fn list_open_for_user(&self, user_id: Uuid) -> AppResult<Vec<BorrowRecord>>;
}

#[derive(Clone)]
pub struct BorrowsRepository {
    pool: Pool<Postgres>,
}

impl BorrowsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BorrowStore for BorrowsRepository {
    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<BorrowRecord>> {
        let records = sqlx::query_as::<_, BorrowRecord>(
            "SELECT * FROM borrow_records WHERE user_id = $1 ORDER BY borrowed_at, id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    async fn list_open_for_user(&self, user_id: Uuid) -> AppResult<Vec<BorrowRecord>> {
        let records = sqlx::query_as::<_, BorrowRecord>(
            r#"
            SELECT * FROM borrow_records
            WHERE user_id = $1 AND status = 'BORROWED'
            ORDER BY borrowed_at, id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }
}
