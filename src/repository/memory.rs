//! In-memory storage backend
//!
//! Implements every store trait over one shared state. A circulation unit
//! holds the state lock for its whole lifetime and works on a copy that
//! replaces the shared state on commit, so units are serialized and
//! all-or-nothing. Used by the test suites and for running the server
//! logic without Postgres.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookChanges, BookStatus},
        borrow::BorrowRecord,
        user::{User, UserChanges},
    },
};

use super::{
    books::BookStore,
    borrows::BorrowStore,
    circulation::{CirculationStore, CirculationTx},
    users::UserStore,
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    books: HashMap<Uuid, Book>,
    users: HashMap<Uuid, User>,
    borrows: Vec<BorrowRecord>,
}

impl MemoryState {
    fn book_by_isbn(&self, isbn: &str) -> Option<&Book> {
        self.books.values().find(|b| b.isbn == isbn)
    }

    fn count_open(&self, matches: impl Fn(&BorrowRecord) -> bool) -> i64 {
        self.borrows.iter().filter(|r| r.is_open() && matches(r)).count() as i64
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a book, bypassing any pending unit
    pub async fn book(&self, isbn: &str) -> Option<Book> {
        self.state.lock().await.book_by_isbn(isbn).cloned()
    }

    /// Snapshot of a user
    pub async fn user(&self, id: Uuid) -> Option<User> {
        self.state.lock().await.users.get(&id).cloned()
    }

    /// Snapshot of the whole ledger in insertion order
    pub async fn ledger(&self) -> Vec<BorrowRecord> {
        self.state.lock().await.borrows.clone()
    }
}

#[async_trait]
impl BookStore for MemoryStore {
    async fn list(&self) -> AppResult<Vec<Book>> {
        let state = self.state.lock().await;
        let mut books: Vec<Book> = state.books.values().cloned().collect();
        books.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.isbn.cmp(&b.isbn)));
        Ok(books)
    }

    async fn find_by_isbn(&self, isbn: &str) -> AppResult<Option<Book>> {
        Ok(self.state.lock().await.book_by_isbn(isbn).cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Book>> {
        let state = self.state.lock().await;
        Ok(ids.iter().filter_map(|id| state.books.get(id).cloned()).collect())
    }

    async fn insert(&self, book: &Book) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if state.book_by_isbn(&book.isbn).is_some() {
            return Err(AppError::Conflict("book already exists".to_string()));
        }
        state.books.insert(book.id, book.clone());
        Ok(())
    }

    async fn update(
        &self,
        isbn: &str,
        changes: &BookChanges,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Book>> {
        let mut state = self.state.lock().await;
        let Some(id) = state.book_by_isbn(isbn).map(|b| b.id) else {
            return Ok(None);
        };

        if let Some(ref new_isbn) = changes.isbn {
            if state.books.values().any(|b| b.id != id && &b.isbn == new_isbn) {
                return Err(AppError::Conflict("book already exists".to_string()));
            }
        }

        Ok(state.books.get_mut(&id).map(|book| {
            changes.apply(book, now);
            book.clone()
        }))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn list(&self, active: Option<bool>) -> AppResult<Vec<User>> {
        let state = self.state.lock().await;
        let mut users: Vec<User> = state
            .users
            .values()
            .filter(|u| active.map_or(true, |a| u.is_active == a))
            .cloned()
            .collect();
        users.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.username.cmp(&b.username))
        });
        Ok(users)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let state = self.state.lock().await;
        Ok(state.users.values().find(|u| u.username == username).cloned())
    }

    async fn insert(&self, user: &User) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if state.users.values().any(|u| u.username == user.username) {
            return Err(AppError::Conflict("this user already exists".to_string()));
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update(
        &self,
        id: Uuid,
        changes: &UserChanges,
        now: DateTime<Utc>,
    ) -> AppResult<Option<User>> {
        let mut state = self.state.lock().await;
        if let Some(ref username) = changes.username {
            if state.users.values().any(|u| u.id != id && &u.username == username) {
                return Err(AppError::Conflict("this user already exists".to_string()));
            }
        }

        Ok(state.users.get_mut(&id).map(|user| {
            changes.apply(user, now);
            user.clone()
        }))
    }
}

#[async_trait]
impl BorrowStore for MemoryStore {
    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<BorrowRecord>> {
        let state = self.state.lock().await;
        let mut records: Vec<BorrowRecord> = state
            .borrows
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.borrowed_at);
        Ok(records)
    }

    async fn list_open_for_user(&self, user_id: Uuid) -> AppResult<Vec<BorrowRecord>> {
        let mut records = BorrowStore::list_for_user(self, user_id).await?;
        records.retain(|r| r.is_open());
        Ok(records)
    }
}

#[async_trait]
impl CirculationStore for MemoryStore {
    async fn begin(&self) -> AppResult<Box<dyn CirculationTx>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx {
            guard: Some(guard),
            working,
        }))
    }
}

struct MemoryTx {
    guard: Option<OwnedMutexGuard<MemoryState>>,
    working: MemoryState,
}

#[async_trait]
impl CirculationTx for MemoryTx {
    async fn find_book(&mut self, isbn: &str) -> AppResult<Option<Book>> {
        Ok(self.working.book_by_isbn(isbn).cloned())
    }

    async fn adjust_quantity(&mut self, book_id: Uuid, delta: i32) -> AppResult<Option<i32>> {
        let Some(book) = self.working.books.get_mut(&book_id) else {
            return Ok(None);
        };
        match book.quantity.checked_add(delta) {
            Some(quantity) if quantity >= 0 => {
                book.quantity = quantity;
                Ok(Some(quantity))
            }
            _ => Ok(None),
        }
    }

    async fn set_book_status(
        &mut self,
        book_id: Uuid,
        status: BookStatus,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        if let Some(book) = self.working.books.get_mut(&book_id) {
            book.status = status;
            book.updated_at = now;
        }
        Ok(())
    }

    async fn delete_book(&mut self, book_id: Uuid) -> AppResult<()> {
        self.working.books.remove(&book_id);
        Ok(())
    }

    async fn count_open_borrows_for_book(&mut self, book_id: Uuid) -> AppResult<i64> {
        Ok(self.working.count_open(|r| r.book_id == book_id))
    }

    async fn insert_borrow_record(&mut self, record: &BorrowRecord) -> AppResult<()> {
        self.working.borrows.push(record.clone());
        Ok(())
    }

    async fn find_open_borrow_record(
        &mut self,
        book_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<BorrowRecord>> {
        Ok(self
            .working
            .borrows
            .iter()
            .filter(|r| r.is_open() && r.book_id == book_id && r.user_id == user_id)
            .max_by_key(|r| r.borrowed_at)
            .cloned())
    }

    async fn close_borrow_record(
        &mut self,
        record_id: Uuid,
        returned_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        match self
            .working
            .borrows
            .iter_mut()
            .find(|r| r.id == record_id && r.is_open())
        {
            Some(record) => {
                record.close(returned_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_user(&mut self, user_id: Uuid) -> AppResult<Option<User>> {
        Ok(self.working.users.get(&user_id).cloned())
    }

    async fn set_user_active(
        &mut self,
        user_id: Uuid,
        active: bool,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        match self.working.users.get_mut(&user_id) {
            Some(user) => {
                user.is_active = active;
                user.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count_open_borrows_for_user(&mut self, user_id: Uuid) -> AppResult<i64> {
        Ok(self.working.count_open(|r| r.user_id == user_id))
    }

    async fn delete_user(&mut self, user_id: Uuid) -> AppResult<bool> {
        Ok(self.working.users.remove(&user_id).is_some())
    }

    async fn commit(&mut self) -> AppResult<()> {
        match self.guard.take() {
            Some(mut guard) => {
                *guard = std::mem::take(&mut self.working);
                Ok(())
            }
            None => Err(AppError::Internal("circulation transaction already committed".to_string())),
        }
    }
}
