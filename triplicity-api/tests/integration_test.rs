use axum::{
    body::{Body, Bytes},
    http::{header, Method, Request, StatusCode},
    Router,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use triplicity_accounts::{AccountService, AccountsConfig, InMemoryUserRepository, UserRepository};
use triplicity_api::metrics::Metrics;
use triplicity_api::state::{AppState, AuthConfig, PaymentSettings};
use triplicity_api::webhooks::{compute_signature, SIGNATURE_HEADER};
use triplicity_api::app;
use triplicity_booking::{BookingConfig, BookingFlow, InMemoryBookingRepository};
use triplicity_catalog::{CatalogRepository, CatalogService, InMemoryCatalogRepository, PackageDraft};
use triplicity_core::notify::{DispatcherConfig, NotificationDispatcher, RecordingNotifier};
use triplicity_core::payment::{MockPaymentAdapter, PaymentStatus};

const WEBHOOK_SECRET: &str = "whsec_integration";
const ADMIN_EMAIL: &str = "ops@triplicity.test";
const PASSWORD: &str = "wanderlust42";
const PACKAGE: &str = "goa-beach-escape";

struct TestApp {
    router: Router,
    state: AppState,
    payments: Arc<MockPaymentAdapter>,
    notifier: Arc<RecordingNotifier>,
}

async fn spawn_app() -> TestApp {
    spawn_app_with(Some(WEBHOOK_SECRET)).await
}

async fn spawn_app_with(webhook_secret: Option<&str>) -> TestApp {
    let notifier = Arc::new(RecordingNotifier::new());
    let notifications =
        NotificationDispatcher::start(notifier.clone(), DispatcherConfig::default());
    let users: Arc<dyn UserRepository> = Arc::new(InMemoryUserRepository::new());
    let catalog_repo: Arc<dyn CatalogRepository> = Arc::new(InMemoryCatalogRepository::new());
    let payments = Arc::new(MockPaymentAdapter::new());

    let catalog = CatalogService::new(catalog_repo.clone());
    catalog
        .create_package(PackageDraft {
            title: "Goa Beach Escape".to_string(),
            price: dec!(1000),
            duration: "4 Days / 3 Nights".to_string(),
            include_hotels: true,
            include_sightseeing: true,
            ..Default::default()
        })
        .await
        .unwrap();

    let state = AppState {
        accounts: Arc::new(AccountService::new(
            users.clone(),
            notifications.clone(),
            AccountsConfig::default(),
        )),
        catalog,
        bookings: Arc::new(BookingFlow::new(
            catalog_repo,
            Arc::new(InMemoryBookingRepository::new()),
            users,
            payments.clone(),
            notifications.clone(),
            BookingConfig::default(),
        )),
        notifications,
        redis: None,
        rate_limit_per_minute: 120,
        metrics: Arc::new(Metrics::new().unwrap()),
        auth: AuthConfig {
            secret: "integration-signing-key".into(),
            expiration: 3600,
            admin_emails: vec![ADMIN_EMAIL.to_string()],
        },
        payment: PaymentSettings {
            publishable_key: Some("pk_test_integration".to_string()),
            webhook_secret: webhook_secret.map(Into::into),
            webhook_tolerance_seconds: 300,
        },
    };

    TestApp {
        router: app(state.clone()),
        state,
        payments,
        notifier,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Bytes) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body)
    }

    async fn call(
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
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let (status, bytes) = self.send(builder.body(body).unwrap()).await;
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn register(&self, email: &str) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/v1/accounts/register",
                None,
                Some(json!({
                    "email": email,
                    "first_name": "Anita",
                    "last_name": "Desai",
                    "password": PASSWORD,
                    "password_confirm": PASSWORD,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["token"].as_str().unwrap().to_string()
    }

    async fn book(&self, token: &str, person_count: i64) -> (StatusCode, Value) {
        self.call(
            Method::POST,
            &format!("/v1/packages/{}/bookings", PACKAGE),
            Some(token),
            Some(json!({ "person_count": person_count })),
        )
        .await
    }

    async fn complete(&self, booking_id: i64, intent_id: &str) -> (StatusCode, Value) {
        self.call(
            Method::POST,
            "/v1/bookings/complete",
            None,
            Some(json!({ "booking_id": booking_id, "payment_intent_id": intent_id })),
        )
        .await
    }

    async fn booking(&self, token: &str, booking_id: i64) -> Value {
        let (status, body) = self
            .call(Method::GET, &format!("/v1/bookings/{}", booking_id), Some(token), None)
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body
    }

    async fn confirmations(&self) -> usize {
        self.notifier
            .sent()
            .await
            .iter()
            .filter(|email| email.subject.ends_with("is Confirmed!"))
            .count()
    }

    async fn post_webhook(&self, payload: &str, signature: Option<String>) -> StatusCode {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/v1/webhooks/payments/stripe")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(signature) = signature {
            builder = builder.header(SIGNATURE_HEADER, signature);
        }
        let (status, _) = self
            .send(builder.body(Body::from(payload.to_string())).unwrap())
            .await;
        status
    }
}

fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().unwrap(),
        other => other.to_string().parse().unwrap(),
    }
}

fn signed(payload: &str, secret: &str) -> String {
    let now = chrono::Utc::now().timestamp();
    format!(
        "t={},v1={}",
        now,
        compute_signature(secret, now, payload.as_bytes()).unwrap()
    )
}

fn intent_event(event_type: &str, intent_id: &str) -> String {
    json!({
        "id": "evt_integration",
        "type": event_type,
        "data": { "object": { "id": intent_id, "status": "succeeded" } }
    })
    .to_string()
}

#[tokio::test]
async fn test_health() {
    let app = spawn_app().await;
    let (status, body) = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_registration_and_login() {
    let app = spawn_app().await;
    app.register("anita@example.com").await;

    // Same address in a different case is still a duplicate
    let (status, body) = app
        .call(
            Method::POST,
            "/v1/accounts/register",
            None,
            Some(json!({
                "email": " Anita@Example.com ",
                "first_name": "Anita",
                "last_name": "Desai",
                "password": PASSWORD,
                "password_confirm": PASSWORD,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].is_string());

    let (status, _) = app
        .call(
            Method::POST,
            "/v1/accounts/register",
            None,
            Some(json!({
                "email": "ravi@example.com",
                "first_name": "Ravi",
                "last_name": "Kumar",
                "password": "12345678",
                "password_confirm": "12345678",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(
            Method::POST,
            "/v1/accounts/register",
            None,
            Some(json!({
                "email": "ravi@example.com",
                "first_name": "Ravi",
                "last_name": "Kumar",
                "password": PASSWORD,
                "password_confirm": "wanderlust43",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(
            Method::POST,
            "/v1/accounts/login",
            None,
            Some(json!({ "email": "anita@example.com", "password": "not-the-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .call(
            Method::POST,
            "/v1/accounts/login",
            None,
            Some(json!({ "email": "anita@example.com", "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "CUSTOMER");
    assert_eq!(body["user"]["is_email_verified"], false);
    assert!(body["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_profile_requires_token() {
    let app = spawn_app().await;
    let token = app.register("anita@example.com").await;

    let (status, _) = app.call(Method::GET, "/v1/accounts/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .call(Method::GET, "/v1/accounts/me", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .call(
            Method::PATCH,
            "/v1/accounts/me",
            Some(&token),
            Some(json!({ "city": "Pune", "travel_interests": ["beaches", "forts"] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["city"], "Pune");
    assert_eq!(body["email"], "anita@example.com");

    let (_, body) = app.call(Method::GET, "/v1/accounts/me", Some(&token), None).await;
    assert_eq!(body["travel_interests"], json!(["beaches", "forts"]));
}

#[tokio::test]
async fn test_email_verification() {
    let app = spawn_app().await;
    let token = app.register("anita@example.com").await;
    assert!(app.notifier.wait_for(1, Duration::from_secs(1)).await);

    let welcome = app.notifier.sent().await.remove(0);
    let marker = "verification code is ";
    let start = welcome.body.find(marker).unwrap() + marker.len();
    let code = welcome.body[start..start + 6].to_string();

    let wrong = if code == "000000" { "111111" } else { "000000" };
    let (status, _) = app
        .call(
            Method::POST,
            "/v1/accounts/verification/confirm",
            Some(&token),
            Some(json!({ "code": wrong })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .call(
            Method::POST,
            "/v1/accounts/verification/confirm",
            Some(&token),
            Some(json!({ "code": code })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["is_email_verified"], true);

    // Nothing left to verify
    let (status, _) = app
        .call(Method::POST, "/v1/accounts/verification", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_catalog_browsing() {
    let app = spawn_app().await;

    let (status, body) = app.call(Method::GET, "/v1/packages", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = app
        .call(Method::GET, &format!("/v1/packages/{}", PACKAGE), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Goa Beach Escape");
    assert_eq!(body["inclusions"], json!(["Hotels", "Sightseeing"]));

    let (status, _) = app
        .call(Method::GET, "/v1/packages/no-such-trip", None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .call(Method::GET, "/v1/packages?category=no-such-category", None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.call(Method::GET, "/v1/categories", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_booking_flow_paid_once() {
    let app = spawn_app().await;
    let token = app.register("anita@example.com").await;

    let (status, body) = app.book(&token, 3).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let booking_id = body["booking"]["id"].as_i64().unwrap();
    let intent_id = body["booking"]["payment_intent_id"].as_str().unwrap().to_string();
    assert_eq!(decimal(&body["booking"]["total_amount"]), dec!(3000));
    assert_eq!(body["booking"]["status"], "pending");
    assert_eq!(body["booking"]["payment_verified"], false);
    assert_eq!(body["client_secret"], format!("{}_secret_mock", intent_id));
    assert_eq!(body["publishable_key"], "pk_test_integration");

    app.payments.set_status(&intent_id, PaymentStatus::Succeeded).await;
    let (status, body) = app.complete(booking_id, &intent_id).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["status"], "paid");

    // Welcome + confirmation
    assert!(app.notifier.wait_for(2, Duration::from_secs(1)).await);
    assert_eq!(app.confirmations().await, 1);

    let (status, body) = app.complete(booking_id, &intent_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "paid");
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(app.confirmations().await, 1);
}

#[tokio::test]
async fn test_unpaid_intent_fails_booking() {
    let app = spawn_app().await;
    let token = app.register("anita@example.com").await;

    let (_, body) = app.book(&token, 2).await;
    let booking_id = body["booking"]["id"].as_i64().unwrap();
    let intent_id = body["booking"]["payment_intent_id"].as_str().unwrap().to_string();

    let (status, body) = app.complete(booking_id, &intent_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "failed");

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(app.confirmations().await, 0);
}

#[tokio::test]
async fn test_mismatched_completion_leaves_booking_pending() {
    let app = spawn_app().await;
    let token = app.register("anita@example.com").await;

    let (_, body) = app.book(&token, 1).await;
    let booking_id = body["booking"]["id"].as_i64().unwrap();

    let (status, _) = app.complete(booking_id, "pi_someone_else").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(app.booking(&token, booking_id).await["status"], "pending");
}

#[tokio::test]
async fn test_booking_input_validation() {
    let app = spawn_app().await;
    let token = app.register("anita@example.com").await;

    let (status, _) = app.book(&token, 0).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(
            Method::POST,
            &format!("/v1/packages/{}/bookings", PACKAGE),
            Some(&token),
            Some(json!({ "person_count": "three" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(
            Method::POST,
            "/v1/packages/no-such-trip/bookings",
            Some(&token),
            Some(json!({ "person_count": 2 })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .call(
            Method::POST,
            &format!("/v1/packages/{}/bookings", PACKAGE),
            None,
            Some(json!({ "person_count": 2 })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_provider_outage_leaves_orphan_for_reconciliation() {
    let app = spawn_app().await;
    let token = app.register("anita@example.com").await;

    app.payments.fail_creates(true);
    let (status, _) = app.book(&token, 2).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let (_, body) = app.call(Method::GET, "/v1/bookings", Some(&token), None).await;
    let orphan = &body.as_array().unwrap()[0];
    let booking_id = orphan["id"].as_i64().unwrap();
    assert_eq!(orphan["status"], "pending");
    assert_eq!(orphan["intent_state"], "creation_failed");
    assert!(orphan["payment_intent_id"].is_null());

    let (status, _) = app
        .call(Method::POST, &format!("/v1/bookings/{}/payment", booking_id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.payments.fail_creates(false);
    assert_eq!(app.state.bookings.reconcile_orphans(10).await.unwrap(), 1);

    let booking = app.booking(&token, booking_id).await;
    assert_eq!(booking["intent_state"], "created");
    assert_eq!(decimal(&booking["total_amount"]), dec!(2000));

    let (status, body) = app
        .call(Method::POST, &format!("/v1/bookings/{}/payment", booking_id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert!(body["client_secret"].as_str().unwrap().ends_with("_secret_mock"));
}

#[tokio::test]
async fn test_bookings_are_private() {
    let app = spawn_app().await;
    let anita = app.register("anita@example.com").await;
    let ravi = app.register("ravi@example.com").await;

    let (_, body) = app.book(&anita, 1).await;
    let booking_id = body["booking"]["id"].as_i64().unwrap();

    let (status, _) = app
        .call(Method::GET, &format!("/v1/bookings/{}", booking_id), Some(&ravi), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = app.call(Method::GET, "/v1/bookings", Some(&ravi), None).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_signed_webhook_verifies_payment() {
    let app = spawn_app().await;
    let token = app.register("anita@example.com").await;

    let (_, body) = app.book(&token, 3).await;
    let booking_id = body["booking"]["id"].as_i64().unwrap();
    let intent_id = body["booking"]["payment_intent_id"].as_str().unwrap().to_string();
    let payload = intent_event("payment_intent.succeeded", &intent_id);

    let status = app
        .post_webhook(&payload, Some(signed(&payload, "whsec_wrong")))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let status = app.post_webhook(&payload, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.booking(&token, booking_id).await["status"], "pending");

    let status = app
        .post_webhook(&payload, Some(signed(&payload, WEBHOOK_SECRET)))
        .await;
    assert_eq!(status, StatusCode::OK);

    let booking = app.booking(&token, booking_id).await;
    assert_eq!(booking["status"], "paid");
    assert_eq!(booking["payment_verified"], true);
    assert!(app.notifier.wait_for(2, Duration::from_secs(1)).await);
    assert_eq!(app.confirmations().await, 1);

    // Unknown intents and unrelated event types are acknowledged
    let other = intent_event("payment_intent.succeeded", "pi_unknown");
    assert_eq!(
        app.post_webhook(&other, Some(signed(&other, WEBHOOK_SECRET))).await,
        StatusCode::OK
    );
    let other = intent_event("charge.refunded", &intent_id);
    assert_eq!(
        app.post_webhook(&other, Some(signed(&other, WEBHOOK_SECRET))).await,
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_webhook_requires_configured_secret() {
    let app = spawn_app_with(None).await;
    let payload = intent_event("payment_intent.succeeded", "pi_any");
    let status = app
        .post_webhook(&payload, Some(signed(&payload, WEBHOOK_SECRET)))
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_admin_catalog_management() {
    let app = spawn_app().await;
    let customer = app.register("anita@example.com").await;
    let admin = app.register(ADMIN_EMAIL).await;

    let (status, _) = app
        .call(
            Method::POST,
            "/v1/admin/categories",
            Some(&customer),
            Some(json!({ "name": "Hill Stations" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .call(
            Method::POST,
            "/v1/admin/categories",
            Some(&admin),
            Some(json!({ "name": "Hill Stations" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["slug"], "hill-stations");

    let (status, body) = app
        .call(
            Method::POST,
            "/v1/admin/packages",
            Some(&admin),
            Some(json!({
                "title": "Manali Snow Trek",
                "category": "hill-stations",
                "price": "2500.00",
                "rating": "4.5",
                "include_meals": true,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["slug"], "manali-snow-trek");

    let (status, _) = app
        .call(
            Method::POST,
            "/v1/admin/packages",
            Some(&admin),
            Some(json!({ "title": "Manali Snow Trek", "price": "10" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = app
        .call(Method::GET, "/v1/packages?category=hill-stations", None, None)
        .await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["inclusions"], json!(["Meals"]));
}

#[tokio::test]
async fn test_price_change_keeps_booked_total() {
    let app = spawn_app().await;
    let customer = app.register("anita@example.com").await;
    let admin = app.register(ADMIN_EMAIL).await;

    let (_, body) = app.book(&customer, 3).await;
    let booking_id = body["booking"]["id"].as_i64().unwrap();

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/v1/admin/packages/{}", PACKAGE),
            Some(&admin),
            Some(json!({ "price": "1500" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(decimal(&body["price"]), dec!(1500));

    let booking = app.booking(&customer, booking_id).await;
    assert_eq!(decimal(&booking["total_amount"]), dec!(3000));
}

#[tokio::test]
async fn test_metrics_exposed() {
    let app = spawn_app().await;
    let token = app.register("anita@example.com").await;
    app.book(&token, 1).await;

    let request = Request::builder()
        .uri("/metrics")
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);

    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("triplicity_bookings_initiated_total 1"));
    assert!(text.contains("triplicity_notifications{state=\"accepted\"}"));
}
