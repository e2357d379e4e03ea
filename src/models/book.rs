//! Book model, ISBN handling and the stock/status rule

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Availability of a title, always derived from its quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookStatus {
    Available,
    OutOfStock,
}

impl BookStatus {
    /// The only place where status is computed from stock.
    pub fn for_quantity(quantity: i32) -> Self {
        if quantity <= 0 {
            BookStatus::OutOfStock
        } else {
            BookStatus::Available
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookStatus::Available => "AVAILABLE",
            BookStatus::OutOfStock => "OUT_OF_STOCK",
        }
    }
}

impl std::str::FromStr for BookStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AVAILABLE" => Ok(BookStatus::Available),
            "OUT_OF_STOCK" => Ok(BookStatus::OutOfStock),
            _ => Err(format!("Invalid book status: {}", s)),
        }
    }
}

text_column!(BookStatus);

/// Normalised ISBN-10 or ISBN-13 (hyphens and spaces removed, `x` upper-cased)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Isbn(String);

impl Isbn {
    pub fn parse(raw: &str) -> AppResult<Self> {
        let compact: String = raw
            .chars()
            .filter(|c| *c != '-' && !c.is_whitespace())
            .map(|c| c.to_ascii_uppercase())
            .collect();

        let len = compact.chars().count();
        let well_formed = match len {
            10 => compact
                .chars()
                .enumerate()
                .all(|(i, c)| c.is_ascii_digit() || (i == 9 && c == 'X')),
            13 => compact.chars().all(|c| c.is_ascii_digit()),
            _ => false,
        };

        if !well_formed {
            return Err(AppError::Validation(format!("Invalid ISBN: {}", raw)));
        }

        Ok(Isbn(compact))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Isbn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Book as stored in the catalogue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: Uuid,
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub status: BookStatus,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    pub fn new(isbn: Isbn, title: String, author: String, quantity: i32, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            isbn: isbn.0,
            title,
            author,
            status: BookStatus::for_quantity(quantity),
            quantity,
            created_at: now,
            updated_at: now,
        }
    }

    /// Status and quantity agree
    pub fn is_consistent(&self) -> bool {
        self.status == BookStatus::for_quantity(self.quantity)
    }
}

/// Add book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    pub isbn: String,
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Author is required"))]
    pub author: String,
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity: i32,
}

/// Partial book update; status is never accepted, it follows quantity
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    pub isbn: Option<String>,
    #[validate(length(min = 1, message = "Title cannot be empty"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "Author cannot be empty"))]
    pub author: Option<String>,
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity: Option<i32>,
}

/// Field set written by the books store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookChanges {
    pub isbn: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub quantity: Option<i32>,
    pub status: Option<BookStatus>,
}

impl BookChanges {
    pub fn apply(&self, book: &mut Book, now: DateTime<Utc>) {
        if let Some(ref isbn) = self.isbn {
            book.isbn = isbn.clone();
        }
        if let Some(ref title) = self.title {
            book.title = title.clone();
        }
        if let Some(ref author) = self.author {
            book.author = author.clone();
        }
        if let Some(quantity) = self.quantity {
            book.quantity = quantity;
        }
        if let Some(status) = self.status {
            book.status = status;
        }
        book.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_follows_quantity() {
        assert_eq!(BookStatus::for_quantity(0), BookStatus::OutOfStock);
        assert_eq!(BookStatus::for_quantity(-1), BookStatus::OutOfStock);
        assert_eq!(BookStatus::for_quantity(1), BookStatus::Available);
        assert_eq!(BookStatus::for_quantity(42), BookStatus::Available);
    }

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_string(&BookStatus::OutOfStock).unwrap();
        assert_eq!(json, "\"OUT_OF_STOCK\"");
        assert_eq!("AVAILABLE".parse::<BookStatus>(), Ok(BookStatus::Available));
        assert!("BORROWED".parse::<BookStatus>().is_err());
    }

    #[test]
    fn test_isbn_normalization() {
        assert_eq!(Isbn::parse("978-0-596-52068-7").unwrap().as_str(), "9780596520687");
        assert_eq!(Isbn::parse("0 8044 2957 x").unwrap().as_str(), "080442957X");
    }

    #[test]
    fn test_isbn_rejects_malformed() {
        assert!(Isbn::parse("").is_err());
        assert!(Isbn::parse("12345").is_err());
        assert!(Isbn::parse("97805965206X7").is_err());
        assert!(Isbn::parse("X804429575").is_err());
        assert!(Isbn::parse("978059652068é").is_err());
    }

    #[test]
    fn test_new_book_is_consistent() {
        let now = Utc::now();
        let empty = Book::new(Isbn::parse("9780596520687").unwrap(), "T".into(), "A".into(), 0, now);
        assert_eq!(empty.status, BookStatus::OutOfStock);
        assert!(empty.is_consistent());

        let stocked = Book::new(Isbn::parse("9780596520687").unwrap(), "T".into(), "A".into(), 3, now);
        assert_eq!(stocked.status, BookStatus::Available);
        assert!(stocked.is_consistent());
    }
}
