//! Catalogue endpoints for librarians and members

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::book::{Book, CreateBook, UpdateBook},
    AppState,
};

use super::{AppJson, AuthenticatedUser, MessageResponse};

/// Add a title to the catalogue
#[utoipa::path(
    post,
    path = "/librarian/books",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book added", body = Book),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 409, description = "ISBN already catalogued", body = crate::error::ErrorResponse)
    )
)]
pub async fn add_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    AppJson(request): AppJson<CreateBook>,
) -> AppResult<(StatusCode, Json<Book>)> {
    claims.require_librarian()?;

    let book = state.services.catalog.add_book(request).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// List the catalogue
#[utoipa::path(
    get,
    path = "/librarian/books",
    tag = "books",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All books", body = Vec<Book>),
        (status = 403, description = "Not a librarian", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<Book>>> {
    claims.require_librarian()?;
    Ok(Json(state.services.catalog.list_books().await?))
}

/// Get a book by ISBN
#[utoipa::path(
    get,
    path = "/librarian/books/{isbn}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("isbn" = String, Path, description = "ISBN-10 or ISBN-13")),
    responses(
        (status = 200, description = "Book details", body = Book),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(isbn): Path<String>,
) -> AppResult<Json<Book>> {
    claims.require_librarian()?;
    Ok(Json(state.services.catalog.get_book(&isbn).await?))
}

/// Update a book; status follows the quantity
#[utoipa::path(
    put,
    path = "/librarian/books/{isbn}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("isbn" = String, Path, description = "ISBN-10 or ISBN-13")),
    request_body = UpdateBook,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse),
        (status = 409, description = "New ISBN already catalogued", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(isbn): Path<String>,
    AppJson(request): AppJson<UpdateBook>,
) -> AppResult<Json<Book>> {
    claims.require_librarian()?;
    Ok(Json(state.services.catalog.update_book(&isbn, request).await?))
}

/// Remove a book nobody currently holds
#[utoipa::path(
    delete,
    path = "/librarian/books/{isbn}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("isbn" = String, Path, description = "ISBN-10 or ISBN-13")),
    responses(
        (status = 200, description = "Book deleted", body = MessageResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Book is borrowed", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(isbn): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    claims.require_librarian()?;

    state.services.catalog.delete_book(&isbn).await?;
    Ok(Json(MessageResponse::new("book deleted successfully")))
}

/// Browse the catalogue as a member
#[utoipa::path(
    get,
    path = "/member/books",
    tag = "circulation",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All books", body = Vec<Book>),
        (status = 403, description = "Not a member", body = crate::error::ErrorResponse)
    )
)]
pub async fn member_list_books(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<Book>>> {
    claims.require_member()?;
    Ok(Json(state.services.catalog.list_books().await?))
}

#[utoipa::path(
    get,
    path = "/member/books/{isbn}",
    tag = "circulation",
    security(("bearer_auth" = [])),
    params(("isbn" = String, Path, description = "ISBN-10 or ISBN-13")),
    responses(
        (status = 200, description = "Book details", body = Book),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn member_get_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(isbn): Path<String>,
) -> AppResult<Json<Book>> {
    claims.require_member()?;
    Ok(Json(state.services.catalog.get_book(&isbn).await?))
}
