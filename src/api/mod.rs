//! API handlers for the circulation REST endpoints

pub mod auth;
pub mod books;
pub mod circulation;
pub mod health;
pub mod openapi;
pub mod users;

use std::time::Duration;

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
    routing::{delete, get, post, put},
    Router,
};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::user::UserClaims,
    AppState,
};

/// Extractor for authenticated user from JWT token
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

        let claims = UserClaims::from_token(token, &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(AuthenticatedUser(claims))
    }
}

/// `Json` whose rejections answer with the regular error body
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Plain acknowledgement body
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// User ids arrive as path segments; reject anything that is not a UUID
pub(crate) fn parse_user_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::Validation("Invalid user id".to_string()))
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    let routes = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Authentication
        .route("/users/signup", post(auth::signup))
        .route("/users/login", post(auth::login))
        // Librarian: books
        .route("/librarian/books", post(books::add_book).get(books::list_books))
        .route(
            "/librarian/books/:isbn",
            get(books::get_book)
                .put(books::update_book)
                .delete(books::delete_book),
        )
        // Librarian: users
        .route("/librarian/users", get(users::list_users).post(users::add_user))
        .route("/librarian/users/active", get(users::list_active_users))
        .route("/librarian/users/deleted", get(users::list_inactive_users))
        .route(
            "/librarian/users/:user_id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::deactivate_user),
        )
        .route(
            "/librarian/users/:user_id/force",
            delete(users::delete_user),
        )
        .route("/librarian/users/:user_id/history", get(users::user_history))
        // Member
        .route("/member/books", get(books::member_list_books))
        .route("/member/books/borrowed", get(circulation::borrowed_books))
        .route("/member/books/:isbn", get(books::member_get_book))
        .route("/member/books/borrow/:isbn", post(circulation::borrow_book))
        .route("/member/books/return/:isbn", put(circulation::return_book))
        .route("/member/account", delete(circulation::deactivate_account))
        .with_state(state);

    Router::new()
        .merge(routes)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(timeout))
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_user_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_user_id(&id.to_string()).unwrap(), id);
        assert!(matches!(parse_user_id("42"), Err(AppError::Validation(_))));
    }
}
