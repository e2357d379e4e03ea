//! Borrow/return transitions and member standing
//!
//! Every write here runs inside one [`CirculationTx`]: book stock, book
//! status, the borrow ledger and the user's active flag change together or
//! not at all. Stock is only ever decremented through the conditional
//! update of [`CirculationTx::adjust_quantity`], so concurrent borrows of
//! the last copy cannot both succeed.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookStatus, Isbn},
        borrow::BorrowRecord,
        user::Role,
    },
    repository::{CirculationTx, Repository},
};

fn book_not_found() -> AppError {
    AppError::NotFound("book not found".to_string())
}

fn out_of_stock() -> AppError {
    AppError::Conflict("book is out of stock".to_string())
}

fn history_not_found() -> AppError {
    AppError::NotFound("borrow history not found".to_string())
}

fn user_not_found() -> AppError {
    AppError::NotFound("user not found".to_string())
}

/// Move stock by `delta` and re-derive the status from the new quantity.
/// `None` when the quantity would drop below zero.
async fn apply_stock_change(
    tx: &mut dyn CirculationTx,
    book_id: Uuid,
    delta: i32,
    now: DateTime<Utc>,
) -> AppResult<Option<i32>> {
    let Some(quantity) = tx.adjust_quantity(book_id, delta).await? else {
        return Ok(None);
    };
    tx.set_book_status(book_id, BookStatus::for_quantity(quantity), now)
        .await?;
    Ok(Some(quantity))
}

#[derive(Clone)]
pub struct CirculationService {
    repository: Repository,
}

impl CirculationService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Lend one copy of `isbn` to `member_id`
    pub async fn borrow_book(&self, isbn: &str, member_id: Uuid) -> AppResult<BorrowRecord> {
        let isbn = Isbn::parse(isbn)?;
        let mut tx = self.repository.circulation.begin().await?;

        let book = tx
            .find_book(isbn.as_str())
            .await?
            .ok_or_else(book_not_found)?;
        if book.status == BookStatus::OutOfStock {
            return Err(out_of_stock());
        }

        let now = Utc::now();
        let remaining = apply_stock_change(&mut *tx, book.id, -1, now)
            .await?
            .ok_or_else(out_of_stock)?;

        let record = BorrowRecord::open(member_id, book.id, now);
        tx.insert_borrow_record(&record).await?;

        // Borrowing restores standing
        if !tx.set_user_active(member_id, true, now).await? {
            return Err(user_not_found());
        }

        tx.commit().await?;

        tracing::info!(
            isbn = %isbn,
            member_id = %member_id,
            remaining,
            "book borrowed"
        );
        Ok(record)
    }

    /// Close the member's most recent open borrow of `isbn`
    pub async fn return_book(&self, isbn: &str, member_id: Uuid) -> AppResult<BorrowRecord> {
        let isbn = Isbn::parse(isbn)?;
        let mut tx = self.repository.circulation.begin().await?;

        let book = tx
            .find_book(isbn.as_str())
            .await?
            .ok_or_else(book_not_found)?;

        // Nothing is written before the open record is known to exist
        let mut record = tx
            .find_open_borrow_record(book.id, member_id)
            .await?
            .ok_or_else(history_not_found)?;

        let now = Utc::now();
        if !tx.close_borrow_record(record.id, now).await? {
            return Err(history_not_found());
        }

        let remaining = apply_stock_change(&mut *tx, book.id, 1, now)
            .await?
            .ok_or_else(book_not_found)?;

        tx.commit().await?;
        record.close(now);

        tracing::info!(
            isbn = %isbn,
            member_id = %member_id,
            remaining,
            "book returned"
        );
        Ok(record)
    }

    /// Books currently held by the member, one entry per open borrow, in
    /// borrow order
    pub async fn borrowed_books(&self, member_id: Uuid) -> AppResult<Vec<Book>> {
        let records = self.repository.borrows.list_open_for_user(member_id).await?;
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let mut ids: Vec<Uuid> = records.iter().map(|r| r.book_id).collect();
        ids.sort();
        ids.dedup();

        let books: HashMap<Uuid, Book> = self
            .repository
            .books
            .find_by_ids(&ids)
            .await?
            .into_iter()
            .map(|b| (b.id, b))
            .collect();

        Ok(records
            .iter()
            .filter_map(|r| books.get(&r.book_id).cloned())
            .collect())
    }

    /// Soft-delete a member once everything is returned. Idempotent.
    pub async fn deactivate_member(&self, user_id: Uuid) -> AppResult<()> {
        let mut tx = self.repository.circulation.begin().await?;

        let user = tx.find_user(user_id).await?.ok_or_else(user_not_found)?;
        if user.role == Role::Librarian {
            return Err(AppError::Authorization("Cannot deactivate a librarian".to_string()));
        }

        if tx.count_open_borrows_for_user(user_id).await? > 0 {
            return Err(AppError::Conflict(
                "return all borrowed books before deactivating".to_string(),
            ));
        }

        if user.is_active {
            tx.set_user_active(user_id, false, Utc::now()).await?;
        }
        tx.commit().await?;

        tracing::info!(user_id = %user_id, "member deactivated");
        Ok(())
    }

    /// Hard-delete a member with no open borrows. The ledger keeps its records.
    pub async fn remove_member(&self, user_id: Uuid) -> AppResult<()> {
        let mut tx = self.repository.circulation.begin().await?;

        let user = tx.find_user(user_id).await?.ok_or_else(user_not_found)?;
        if user.role == Role::Librarian {
            return Err(AppError::Authorization("Cannot delete a librarian".to_string()));
        }

        if tx.count_open_borrows_for_user(user_id).await? > 0 {
            return Err(AppError::Conflict(
                "return all borrowed books before deleting".to_string(),
            ));
        }

        if !tx.delete_user(user_id).await? {
            return Err(user_not_found());
        }
        tx.commit().await?;

        tracing::info!(user_id = %user_id, "member removed");
        Ok(())
    }

    /// Storage accepts a unit of work
    pub async fn ready(&self) -> AppResult<()> {
        let _tx = self.repository.circulation.begin().await?;
        Ok(())
    }
}
