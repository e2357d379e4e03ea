//! Member borrow/return endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{book::Book, borrow::BorrowRecord},
    AppState,
};

use super::{AuthenticatedUser, MessageResponse};

#[derive(Serialize, ToSchema)]
pub struct BorrowResponse {
    pub message: String,
    pub record: BorrowRecord,
}

/// Borrow one copy of a book
#[utoipa::path(
    post,
    path = "/member/books/borrow/{isbn}",
    tag = "circulation",
    security(("bearer_auth" = [])),
    params(("isbn" = String, Path, description = "ISBN-10 or ISBN-13")),
    responses(
        (status = 200, description = "Book borrowed", body = BorrowResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Book is out of stock", body = crate::error::ErrorResponse)
    )
)]
pub async fn borrow_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(isbn): Path<String>,
) -> AppResult<Json<BorrowResponse>> {
    claims.require_member()?;

    let record = state
        .services
        .circulation
        .borrow_book(&isbn, claims.user_id)
        .await?;

    Ok(Json(BorrowResponse {
        message: "book borrowed successfully".to_string(),
        record,
    }))
}

/// Return a borrowed book
#[utoipa::path(
    put,
    path = "/member/books/return/{isbn}",
    tag = "circulation",
    security(("bearer_auth" = [])),
    params(("isbn" = String, Path, description = "ISBN-10 or ISBN-13")),
    responses(
        (status = 200, description = "Book returned", body = BorrowResponse),
        (status = 404, description = "Book or open borrow not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(isbn): Path<String>,
) -> AppResult<Json<BorrowResponse>> {
    claims.require_member()?;

    let record = state
        .services
        .circulation
        .return_book(&isbn, claims.user_id)
        .await?;

    Ok(Json(BorrowResponse {
        message: "book returned successfully".to_string(),
        record,
    }))
}

/// Books the caller currently holds
#[utoipa::path(
    get,
    path = "/member/books/borrowed",
    tag = "circulation",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Borrowed books, in borrow order", body = Vec<Book>)
    )
)]
pub async fn borrowed_books(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<Book>>> {
    claims.require_member()?;
    Ok(Json(
        state.services.circulation.borrowed_books(claims.user_id).await?,
    ))
}

/// Deactivate the caller's own account
#[utoipa::path(
    delete,
    path = "/member/account",
    tag = "circulation",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Account deactivated", body = MessageResponse),
        (status = 409, description = "Books still borrowed", body = crate::error::ErrorResponse)
    )
)]
pub async fn deactivate_account(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<MessageResponse>> {
    claims.require_member()?;

    state
        .services
        .circulation
        .deactivate_member(claims.user_id)
        .await?;
    Ok(Json(MessageResponse::new("account deactivated successfully")))
}
