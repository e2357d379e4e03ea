//! Router-level tests over the in-memory store

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use circulation_server::{
    api::create_router, config::AppConfig, repository::Repository, AppState,
};

const ISBN: &str = "9780596520687";

struct TestApp {
    router: Router,
}

impl TestApp {
    fn new() -> Self {
        let state = AppState::new(AppConfig::default(), Repository::in_memory());
        Self {
            router: create_router(state),
        }
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    /// Sign up and log in; returns (token, user id)
    async fn account(&self, username: &str, role: &str) -> (String, String) {
        let (status, user) = self
            .send(
                Method::POST,
                "/users/signup",
                None,
                Some(json!({ "username": username, "password": "secret", "role": role })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", user);

        let (status, login) = self
            .send(
                Method::POST,
                "/users/login",
                None,
                Some(json!({ "username": username, "password": "secret" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", login);
        assert_eq!(login["token_type"], "Bearer");

        (
            login["token"].as_str().unwrap().to_string(),
            user["id"].as_str().unwrap().to_string(),
        )
    }

    async fn add_book(&self, token: &str, quantity: i32) {
        let (status, book) = self
            .send(
                Method::POST,
                "/librarian/books",
                Some(token),
                Some(json!({
                    "isbn": "978-0-596-52068-7",
                    "title": "Programming Rust",
                    "author": "Blandy",
                    "quantity": quantity
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", book);
    }
}

#[tokio::test]
async fn test_health_and_readiness() {
    let app = TestApp::new();

    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = app.send(Method::GET, "/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_borrow_and_return_scenario() {
    let app = TestApp::new();
    let (librarian, _) = app.account("librarian", "LIBRARIAN").await;
    let (alice, alice_id) = app.account("alice", "MEMBER").await;
    let (bob, _) = app.account("bob", "MEMBER").await;
    app.add_book(&librarian, 1).await;

    let uri = format!("/member/books/borrow/{}", ISBN);
    let (status, body) = app.send(Method::POST, &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["message"], "book borrowed successfully");
    assert_eq!(body["record"]["status"], "BORROWED");

    let (_, book) = app
        .send(Method::GET, &format!("/member/books/{}", ISBN), Some(&bob), None)
        .await;
    assert_eq!(book["quantity"], 0);
    assert_eq!(book["status"], "OUT_OF_STOCK");

    let (status, body) = app.send(Method::POST, &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 5);
    assert_eq!(body["error"], "book is out of stock");

    let (status, held) = app
        .send(Method::GET, "/member/books/borrowed", Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(held.as_array().unwrap().len(), 1);
    assert_eq!(held[0]["isbn"], ISBN);

    let (status, body) = app
        .send(Method::GET, "/member/books/borrowed", Some(&bob), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let uri = format!("/member/books/return/{}", ISBN);
    let (status, body) = app.send(Method::PUT, &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["record"]["status"], "RETURNED");
    assert!(body["record"]["returned_at"].is_string());

    let (status, body) = app.send(Method::PUT, &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "borrow history not found");

    let (_, book) = app
        .send(Method::GET, &format!("/librarian/books/{}", ISBN), Some(&librarian), None)
        .await;
    assert_eq!(book["quantity"], 1);
    assert_eq!(book["status"], "AVAILABLE");

    let (status, history) = app
        .send(
            Method::GET,
            &format!("/librarian/users/{}/history", alice_id),
            Some(&librarian),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["status"], "RETURNED");
}

#[tokio::test]
async fn test_role_guards() {
    let app = TestApp::new();
    let (librarian, _) = app.account("librarian", "LIBRARIAN").await;
    let (member, _) = app.account("member", "MEMBER").await;

    let (status, body) = app.send(Method::GET, "/librarian/books", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 2);

    let (status, _) = app
        .send(Method::GET, "/librarian/books", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send(Method::GET, "/librarian/books", Some(&member), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(Method::GET, "/member/books", Some(&librarian), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, books) = app
        .send(Method::GET, "/librarian/books", Some(&librarian), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(books, json!([]));
}

#[tokio::test]
async fn test_malformed_identifiers() {
    let app = TestApp::new();
    let (librarian, _) = app.account("librarian", "LIBRARIAN").await;
    let (member, _) = app.account("member", "MEMBER").await;

    let (status, body) = app
        .send(Method::GET, "/librarian/users/42", Some(&librarian), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid user id");

    let (status, body) = app
        .send(Method::POST, "/member/books/borrow/12345", Some(&member), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 6);

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/member/books/borrow/{}", ISBN),
            Some(&member),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "book not found");
}

#[tokio::test]
async fn test_account_deactivation_rules() {
    let app = TestApp::new();
    let (librarian, librarian_id) = app.account("librarian", "LIBRARIAN").await;
    let (alice, alice_id) = app.account("alice", "MEMBER").await;
    app.add_book(&librarian, 2).await;

    app.send(
        Method::POST,
        &format!("/member/books/borrow/{}", ISBN),
        Some(&alice),
        None,
    )
    .await;

    let (_, active) = app
        .send(Method::GET, "/librarian/users/active", Some(&librarian), None)
        .await;
    assert_eq!(active.as_array().unwrap().len(), 1);
    assert_eq!(active[0]["id"], alice_id.as_str());

    let (status, _) = app
        .send(Method::DELETE, "/member/account", Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/librarian/users/{}/force", alice_id),
            Some(&librarian),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    app.send(
        Method::PUT,
        &format!("/member/books/return/{}", ISBN),
        Some(&alice),
        None,
    )
    .await;

    for _ in 0..2 {
        let (status, body) = app
            .send(Method::DELETE, "/member/account", Some(&alice), None)
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
    }

    let (_, inactive) = app
        .send(Method::GET, "/librarian/users/deleted", Some(&librarian), None)
        .await;
    let usernames: Vec<&str> = inactive
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|u| u["username"].as_str())
        .collect();
    assert!(usernames.contains(&"alice"));

    let (status, body) = app
        .send(
            Method::DELETE,
            &format!("/librarian/users/{}", librarian_id),
            Some(&librarian),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Cannot deactivate a librarian");

    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/librarian/users/{}/force", alice_id),
            Some(&librarian),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send(
            Method::GET,
            &format!("/librarian/users/{}", alice_id),
            Some(&librarian),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_password_hash_never_leaves_the_server() {
    let app = TestApp::new();
    let (librarian, _) = app.account("librarian", "LIBRARIAN").await;
    app.account("alice", "MEMBER").await;

    let (_, users) = app
        .send(Method::GET, "/librarian/users", Some(&librarian), None)
        .await;
    for user in users.as_array().unwrap() {
        assert!(user.get("password_hash").is_none());
    }
}

#[tokio::test]
async fn test_unreadable_bodies_use_the_error_envelope() {
    let app = TestApp::new();

    let (status, body) = app
        .send(
            Method::POST,
            "/users/signup",
            None,
            Some(json!({ "username": "alice" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string(), "{}", body);
    assert_eq!(body["code"], 6);
    assert_eq!(body["kind"], "BadValue");

    let (librarian, _) = app.account("librarian", "LIBRARIAN").await;
    let (status, body) = app
        .send(
            Method::POST,
            "/librarian/books",
            Some(&librarian),
            Some(json!({
                "isbn": ISBN,
                "title": "Programming Rust",
                "author": "Blandy",
                "quantity": "three"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string(), "{}", body);
}

#[tokio::test]
async fn test_user_update_respects_circulation_rules() {
    let app = TestApp::new();
    let (librarian, librarian_id) = app.account("librarian", "LIBRARIAN").await;
    let (alice, alice_id) = app.account("alice", "MEMBER").await;
    app.add_book(&librarian, 1).await;

    app.send(
        Method::POST,
        &format!("/member/books/borrow/{}", ISBN),
        Some(&alice),
        None,
    )
    .await;

    let (status, _) = app
        .send(
            Method::PUT,
            &format!("/librarian/users/{}", alice_id),
            Some(&librarian),
            Some(json!({ "is_active": false })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .send(
            Method::PUT,
            &format!("/librarian/users/{}", librarian_id),
            Some(&librarian),
            Some(json!({ "role": "MEMBER" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/librarian/users/{}/force", librarian_id),
            Some(&librarian),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
