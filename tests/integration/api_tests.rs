//! Live API tests against a running server backed by Postgres

use reqwest::Client;
use serde_json::{json, Value};
use uuid::Uuid;

const BASE_URL: &str = "http://localhost:8080";

fn unique(prefix: &str) -> String {
    format!("{}_{}", prefix, &Uuid::new_v4().simple().to_string()[..8])
}

/// 13 random digits, enough to avoid clashing with earlier runs
fn unique_isbn() -> String {
    format!("{:013}", Uuid::new_v4().as_u128() % 10_000_000_000_000)
}

/// Sign up a fresh account and return (token, user id)
async fn account(client: &Client, role: &str) -> (String, String) {
    let username = unique(&role.to_lowercase());

    let response = client
        .post(format!("{}/users/signup", BASE_URL))
        .json(&json!({ "username": username, "password": "secret", "role": role }))
        .send()
        .await
        .expect("Failed to send signup request");
    assert_eq!(response.status(), 201);
    let user: Value = response.json().await.expect("Failed to parse signup response");

    let response = client
        .post(format!("{}/users/login", BASE_URL))
        .json(&json!({ "username": username, "password": "secret" }))
        .send()
        .await
        .expect("Failed to send login request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse login response");

    (
        body["token"].as_str().expect("No token in response").to_string(),
        user["id"].as_str().expect("No user id").to_string(),
    )
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_readiness_reaches_database() {
    let client = Client::new();

    let response = client
        .get(format!("{}/ready", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/users/login", BASE_URL))
        .json(&json!({
            "username": unique("nobody"),
            "password": "wrong"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "username or password is incorrect");
}

#[tokio::test]
#[ignore]
async fn test_borrow_return_cycle() {
    let client = Client::new();
    let (librarian, _) = account(&client, "LIBRARIAN").await;
    let (member, member_id) = account(&client, "MEMBER").await;
    let isbn = unique_isbn();

    let response = client
        .post(format!("{}/librarian/books", BASE_URL))
        .bearer_auth(&librarian)
        .json(&json!({
            "isbn": isbn,
            "title": "Live Test Book",
            "author": "Tester",
            "quantity": 1
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);

    let response = client
        .post(format!("{}/member/books/borrow/{}", BASE_URL, isbn))
        .bearer_auth(&member)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let response = client
        .post(format!("{}/member/books/borrow/{}", BASE_URL, isbn))
        .bearer_auth(&member)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);

    let response = client
        .put(format!("{}/member/books/return/{}", BASE_URL, isbn))
        .bearer_auth(&member)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let history: Value = client
        .get(format!("{}/librarian/users/{}/history", BASE_URL, member_id))
        .bearer_auth(&librarian)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(history.as_array().map(Vec::len), Some(1));

    // Cleanup
    let response = client
        .delete(format!("{}/librarian/books/{}", BASE_URL, isbn))
        .bearer_auth(&librarian)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
}

#[tokio::test]
#[ignore]
async fn test_concurrent_borrows_of_last_copy() {
    let client = Client::new();
    let (librarian, _) = account(&client, "LIBRARIAN").await;
    let isbn = unique_isbn();

    client
        .post(format!("{}/librarian/books", BASE_URL))
        .bearer_auth(&librarian)
        .json(&json!({ "isbn": isbn, "title": "Race", "author": "Tester", "quantity": 1 }))
        .send()
        .await
        .expect("Failed to send request");

    let mut handles = Vec::new();
    for _ in 0..8 {
        let client = client.clone();
        let isbn = isbn.clone();
        handles.push(tokio::spawn(async move {
            let (member, _) = account(&client, "MEMBER").await;
            client
                .post(format!("{}/member/books/borrow/{}", BASE_URL, isbn))
                .bearer_auth(&member)
                .send()
                .await
                .expect("Failed to send request")
                .status()
        }));
    }

    let mut successes = 0;
    for handle in handles {
        let status = handle.await.expect("task panicked");
        if status.is_success() {
            successes += 1;
        } else {
            assert_eq!(status, 409);
        }
    }
    assert_eq!(successes, 1);

    let book: Value = client
        .get(format!("{}/librarian/books/{}", BASE_URL, isbn))
        .bearer_auth(&librarian)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(book["quantity"], 0);
    assert_eq!(book["status"], "OUT_OF_STOCK");
}
