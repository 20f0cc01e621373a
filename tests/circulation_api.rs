//! In-process API tests against the memory store

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use libris_server::{
    api,
    config::AppConfig,
    models::user::{Role, UserClaims},
    repository::memory::MemoryRepository,
    services::Services,
    AppState,
};

struct TestApp {
    router: Router,
    secret: String,
}

impl TestApp {
    fn new() -> Self {
        let config = AppConfig::default();
        let repository = Arc::new(MemoryRepository::new());
        let services = Services::new(repository.clone(), repository, &config.circulation);
        let secret = config.auth.jwt_secret.clone();
        let state = AppState {
            config: Arc::new(config),
            services: Arc::new(services),
        };
        Self {
            router: api::router(state),
            secret,
        }
    }

    fn token(&self, role: Role) -> String {
        UserClaims::new(1, "staff", role, 1)
            .create_token(&self.secret)
            .expect("Failed to sign token")
    }

    async fn call(&self, method: Method, uri: &str, role: Role, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token(role)));
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("Failed to parse response")
        };
        (status, value)
    }

    async fn create_book(&self, copies: i32) -> i64 {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/v1/books",
                Role::Librarian,
                Some(json!({"title": "Structure and Interpretation", "total_copies": copies})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_i64().expect("No book id")
    }

    async fn borrow(&self, book_id: i64, quantity: i32, extra: Value) -> (StatusCode, Value) {
        let mut body = json!({"book_id": book_id, "borrower_id": 77, "quantity": quantity});
        if let (Some(target), Some(source)) = (body.as_object_mut(), extra.as_object()) {
            target.extend(source.clone());
        }
        self.call(Method::POST, "/api/v1/transactions", Role::Librarian, Some(body))
            .await
    }

    async fn available(&self, book_id: i64) -> i64 {
        let (_, body) = self
            .call(Method::GET, &format!("/api/v1/books/{}", book_id), Role::Librarian, None)
            .await;
        body["available_copies"].as_i64().expect("No copy count")
    }

    async fn set_fee(&self, rate: &str, interval: &str) {
        let (status, _) = self
            .call(
                Method::PUT,
                "/api/v1/settings/late-fee",
                Role::Admin,
                Some(json!({"enabled": true, "rate": rate, "interval": interval})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }
}

#[tokio::test]
async fn test_health_needs_no_token() {
    let app = TestApp::new();
    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/api/v1/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_missing_token_rejected() {
    let app = TestApp::new();
    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/api/v1/books").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_fee_config_defaults_then_updates() {
    let app = TestApp::new();
    let (status, body) = app
        .call(Method::GET, "/api/v1/settings/late-fee", Role::Librarian, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["enabled"], false);
    assert_eq!(body["interval"], "day");

    app.set_fee("2.5", "week").await;
    let (_, body) = app
        .call(Method::GET, "/api/v1/settings/late-fee", Role::Librarian, None)
        .await;
    assert_eq!(body["enabled"], true);
    assert_eq!(body["interval"], "week");
}

#[tokio::test]
async fn test_fee_config_validation() {
    let app = TestApp::new();
    for payload in [
        json!({"enabled": true, "rate": "-1", "interval": "day"}),
        json!({"enabled": true, "rate": "1", "interval": "fortnight"}),
    ] {
        let (status, body) = app
            .call(Method::PUT, "/api/v1/settings/late-fee", Role::Admin, Some(payload))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "InvalidConfig");
    }
}

#[tokio::test]
async fn test_fee_config_requires_admin() {
    let app = TestApp::new();
    let (status, _) = app
        .call(
            Method::PUT,
            "/api/v1/settings/late-fee",
            Role::Librarian,
            Some(json!({"enabled": true, "rate": "1", "interval": "day"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_returned_seven_days_late_owes_35() {
    let app = TestApp::new();
    app.set_fee("5", "day").await;
    let book_id = app.create_book(1).await;

    let due = chrono::Utc::now() - chrono::Duration::days(7);
    let (status, created) = app
        .borrow(
            book_id,
            1,
            json!({
                "date_borrowed": (due - chrono::Duration::days(14)).to_rfc3339(),
                "expected_return_date": due.to_rfc3339()
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["reference"], "TRX-000001");
    assert_eq!(created["is_overdue"], true);

    let (status, returned) = app
        .call(
            Method::POST,
            &format!("/api/v1/transactions/{}/return", created["id"]),
            Role::Librarian,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(returned["current_fee"], "35");
    assert_eq!(returned["is_overdue"], false);
    assert_eq!(app.available(book_id).await, 1);

    let (_, later) = app
        .call(
            Method::GET,
            &format!("/api/v1/transactions/{}", created["id"]),
            Role::Librarian,
            None,
        )
        .await;
    assert_eq!(later["current_fee"], "35");
    assert_eq!(later["date_returned"], returned["date_returned"]);

    app.set_fee("10", "hour").await;
    let (_, after_change) = app
        .call(
            Method::GET,
            &format!("/api/v1/transactions/{}", created["id"]),
            Role::Librarian,
            None,
        )
        .await;
    assert_eq!(after_change["current_fee"], "35");
    assert_eq!(after_change["fee"]["mode"], "frozen");
}

#[tokio::test]
async fn test_member_cannot_borrow() {
    let app = TestApp::new();
    let book_id = app.create_book(1).await;
    let (status, _) = app
        .call(
            Method::POST,
            "/api/v1/transactions",
            Role::Member,
            Some(json!({"book_id": book_id, "borrower_id": 1, "quantity": 1})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(app.available(book_id).await, 1);
}

#[tokio::test]
async fn test_manual_fee_wins_over_config() {
    let app = TestApp::new();
    app.set_fee("5", "day").await;
    let book_id = app.create_book(1).await;

    let due = chrono::Utc::now() - chrono::Duration::days(30);
    let (_, created) = app
        .borrow(
            book_id,
            1,
            json!({
                "date_borrowed": (due - chrono::Duration::days(14)).to_rfc3339(),
                "expected_return_date": due.to_rfc3339()
            }),
        )
        .await;
    let id = created["id"].as_i64().unwrap();
    assert_eq!(created["current_fee"], "150");

    let (status, edited) = app
        .call(
            Method::PUT,
            &format!("/api/v1/transactions/{}", id),
            Role::Librarian,
            Some(json!({"fee": {"mode": "manual", "amount": "10.00"}})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edited["current_fee"], "10.00");

    for amount in ["10.005", "1000000000000"] {
        let (status, _) = app
            .call(
                Method::PUT,
                &format!("/api/v1/transactions/{}", id),
                Role::Librarian,
                Some(json!({"fee": {"mode": "manual", "amount": amount}})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_over_borrow_reports_available_copies() {
    let app = TestApp::new();
    let book_id = app.create_book(3).await;
    let (status, _) = app.borrow(book_id, 2, json!({})).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(app.available(book_id).await, 1);

    let (status, body) = app.borrow(book_id, 2, json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "InsufficientInventory");
    assert_eq!(body["message"], "Only 1 copies available");
    assert_eq!(app.available(book_id).await, 1);
}

#[tokio::test]
async fn test_deleting_open_loan_restocks() {
    let app = TestApp::new();
    let book_id = app.create_book(2).await;
    let (_, created) = app.borrow(book_id, 2, json!({})).await;
    assert_eq!(app.available(book_id).await, 0);

    let (status, _) = app
        .call(
            Method::DELETE,
            &format!("/api/v1/transactions/{}", created["id"]),
            Role::Admin,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(app.available(book_id).await, 2);
}

#[tokio::test]
async fn test_return_twice_restocks_once() {
    let app = TestApp::new();
    let book_id = app.create_book(3).await;
    let (_, created) = app.borrow(book_id, 2, json!({})).await;
    let uri = format!("/api/v1/transactions/{}/return", created["id"]);

    let (status, body) = app.call(Method::POST, &uri, Role::Librarian, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "returned");
    let (status, _) = app.call(Method::POST, &uri, Role::Librarian, None).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(app.available(book_id).await, 3);

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/api/v1/transactions/{}/cancel", created["id"]),
            Role::Librarian,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "InvalidTransition");
    assert_eq!(app.available(book_id).await, 3);
}

#[tokio::test]
async fn test_overdue_sweep_and_filter() {
    let app = TestApp::new();
    let book_id = app.create_book(2).await;
    let now = chrono::Utc::now();
    app.borrow(
        book_id,
        1,
        json!({
            "date_borrowed": (now - chrono::Duration::days(20)).to_rfc3339(),
            "expected_return_date": (now - chrono::Duration::days(6)).to_rfc3339()
        }),
    )
    .await;
    app.borrow(book_id, 1, json!({})).await;

    let (status, body) = app
        .call(Method::POST, "/api/v1/circulation/overdue", Role::Librarian, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], 1);

    let (_, overdue) = app
        .call(Method::GET, "/api/v1/transactions?status=overdue", Role::Librarian, None)
        .await;
    assert_eq!(overdue.as_array().map(Vec::len), Some(1));
    assert_eq!(app.available(book_id).await, 0);
}

#[tokio::test]
async fn test_book_status_is_computed() {
    let app = TestApp::new();
    let book_id = app.create_book(1).await;
    app.borrow(book_id, 1, json!({})).await;

    let uri = format!("/api/v1/books/{}", book_id);
    let (_, book) = app.call(Method::GET, &uri, Role::Librarian, None).await;
    assert_eq!(book["status"], "unavailable");

    let (_, book) = app
        .call(Method::POST, &format!("{}/archive", uri), Role::Librarian, None)
        .await;
    assert_eq!(book["status"], "archived");

    let (status, _) = app.call(Method::DELETE, &uri, Role::Admin, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}
