//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, books, circulation, health, users};

/// Registers the bearer JWT scheme referenced by `security(("bearer_auth" = []))`
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Circulation API",
        version = "0.1.0",
        description = "Library circulation REST API: catalogue, members and the borrow ledger"
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::signup,
        auth::login,
        // Books
        books::add_book,
        books::list_books,
        books::get_book,
        books::update_book,
        books::delete_book,
        books::member_list_books,
        books::member_get_book,
        // Users
        users::list_users,
        users::list_active_users,
        users::list_inactive_users,
        users::get_user,
        users::add_user,
        users::update_user,
        users::deactivate_user,
        users::delete_user,
        users::user_history,
        // Circulation
        circulation::borrow_book,
        circulation::return_book,
        circulation::borrowed_books,
        circulation::deactivate_account,
    ),
    components(
        schemas(
            auth::LoginRequest,
            auth::LoginResponse,
            crate::models::book::Book,
            crate::models::book::BookStatus,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            crate::models::user::User,
            crate::models::user::Role,
            crate::models::user::SignUp,
            crate::models::user::CreateUser,
            crate::models::user::UpdateUser,
            crate::models::borrow::BorrowRecord,
            crate::models::borrow::BorrowStatus,
            circulation::BorrowResponse,
            super::MessageResponse,
            health::HealthResponse,
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Sign-up and login"),
        (name = "books", description = "Catalogue management"),
        (name = "users", description = "Member management"),
        (name = "circulation", description = "Borrowing and returning books")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_circulation_paths() {
        let doc = ApiDoc::openapi();
        for path in [
            "/member/books/borrow/{isbn}",
            "/member/books/return/{isbn}",
            "/member/books/borrowed",
            "/member/account",
            "/librarian/users/{user_id}/force",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
        assert!(doc
            .components
            .as_ref()
            .map_or(false, |c| c.security_schemes.contains_key("bearer_auth")));
    }
}
