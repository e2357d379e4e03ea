//! Repository layer for storage operations

pub mod books;
pub mod borrows;
pub mod circulation;
pub mod memory;
pub mod users;

use std::sync::Arc;

use sqlx::{Pool, Postgres};

pub use books::BookStore;
pub use borrows::BorrowStore;
pub use circulation::{CirculationStore, CirculationTx};
pub use memory::MemoryStore;
pub use users::UserStore;

/// Storage handles shared by every service
#[derive(Clone)]
pub struct Repository {
    pub books: Arc<dyn BookStore>,
    pub users: Arc<dyn UserStore>,
    pub borrows: Arc<dyn BorrowStore>,
    pub circulation: Arc<dyn CirculationStore>,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: Arc::new(books::BooksRepository::new(pool.clone())),
            users: Arc::new(users::UsersRepository::new(pool.clone())),
            borrows: Arc::new(borrows::BorrowsRepository::new(pool.clone())),
            circulation: Arc::new(circulation::CirculationRepository::new(pool)),
        }
    }

    /// Every store backed by the same in-memory state
    pub fn from_memory(store: MemoryStore) -> Self {
        Self {
            books: Arc::new(store.clone()),
            users: Arc::new(store.clone()),
            borrows: Arc::new(store.clone()),
            circulation: Arc::new(store),
        }
    }

    pub fn in_memory() -> Self {
        Self::from_memory(MemoryStore::new())
    }
}
