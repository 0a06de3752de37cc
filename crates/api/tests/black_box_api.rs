use std::sync::Arc;

use chrono::{TimeZone, Utc};
use laundry_api::app::{self, AppServices};
use laundry_catalog::{PackageInclude, ServiceType};
use laundry_core::{Money, ServiceId};
use laundry_infra::{FixedClock, InMemoryStore, LaundryService, WorkflowSettings};
use laundry_inventory::StockPolicy;
use reqwest::StatusCode;
use serde_json::{json, Value};

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
    detergent: ServiceId,
}

impl TestServer {
    async fn spawn() -> Self {
        Self::spawn_with(StockPolicy::AllowNegative, 20).await
    }

    async fn spawn_with(policy: StockPolicy, detergent_on_hand: i64) -> Self {
        let store = InMemoryStore::new();
        store.seed_service("Wash", Money::from_minor(15000), ServiceType::MainService).await;
        store.seed_service("Dry", Money::from_minor(10000), ServiceType::MainService).await;
        let detergent = store
            .seed_service("Detergent", Money::from_minor(2000), ServiceType::AddOnSupply)
            .await;
        let bundle = store
            .seed_service("Family Bundle", Money::from_minor(50000), ServiceType::BundlePackage)
            .await;
        let retired = store.seed_service("Starch", Money::from_minor(500), ServiceType::AddOnSupply).await;
        store.deactivate_service(retired).await;
        let detergent_stock = store
            .seed_inventory_item("Detergent sachet", detergent_on_hand, Some(detergent))
            .await;
        store
            .seed_package_include(PackageInclude {
                bundle_service_id: bundle,
                inventory_item_id: detergent_stock,
                quantity_used: 1,
            })
            .await;

        let settings = WorkflowSettings {
            stock_policy: policy,
            ..WorkflowSettings::default()
        };
        // 10:00 shop time (UTC+8) on 2024-03-05.
        let clock = Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 3, 5, 2, 0, 0).unwrap()));
        let services = AppServices::InMemory(LaundryService::with_clock(store, settings, clock));

        // Same router as prod, bound to an ephemeral port.
        let app = app::router_with(Arc::new(services));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            handle,
            detergent,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn create_walk_in(client: &reqwest::Client, srv: &TestServer, body: Value) -> (StatusCode, Value) {
    let res = client.post(srv.url("/orders/create")).json(&body).send().await.unwrap();
    let status = res.status();
    (status, res.json().await.unwrap())
}

async fn set_status(client: &reqwest::Client, srv: &TestServer, id: i64, status: &str) -> (StatusCode, Value) {
    let res = client
        .patch(srv.url(&format!("/orders/{id}/status")))
        .json(&json!({"status": status}))
        .send()
        .await
        .unwrap();
    let code = res.status();
    (code, res.json().await.unwrap())
}

async fn get_order(client: &reqwest::Client, srv: &TestServer, id: i64) -> Value {
    let res = client.get(srv.url(&format!("/orders/{id}"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    res.json().await.unwrap()
}

fn booking_body(phone: &str) -> Value {
    json!({
        "name": "Maria Santos",
        "phone_number": phone,
        "address": "Quezon City",
        "pickup_date": "2024-03-07",
        "load": 2,
        "main_services": ["Wash", "Dry"],
        "supplies": [{"name": "Detergent", "quantity": 1}]
    })
}

#[tokio::test]
async fn health_is_public_and_ok() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn active_services_hide_deactivated_entries() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/services/active")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let services: Vec<Value> = res.json().await.unwrap();
    let names: Vec<&str> = services.iter().filter_map(|s| s["service_name"].as_str()).collect();
    assert_eq!(names.len(), 4);
    assert!(!names.contains(&"Starch"));
}

#[tokio::test]
async fn booking_is_accepted_once_into_a_coded_order() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/bookings/add"))
        .json(&booking_body("0917 123 4567"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let added: Value = res.json().await.unwrap();
    let booking_id = added["bookingId"].as_i64().unwrap();

    let res = client
        .post(srv.url(&format!("/bookings/accept/{booking_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let accepted: Value = res.json().await.unwrap();
    assert_eq!(accepted["orderCode"], "ORD030524001");
    // 2 × (150.00 + 100.00) + 20.00
    assert_eq!(accepted["total_amount"], 52000);

    let res = client
        .post(srv.url(&format!("/bookings/accept/{booking_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "conflict");

    let order = get_order(&client, &srv, accepted["orderId"].as_i64().unwrap()).await;
    assert_eq!(order["source"], "Booking");
    assert_eq!(order["status"], "Stand By");
    assert_eq!(order["customer_phone"], "09171234567");
    assert_eq!(order["details"].as_array().unwrap().len(), 3);

    let res = client.get(srv.url("/bookings?status=Accepted")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let page: Value = res.json().await.unwrap();
    assert_eq!(page["total"], 1);
    assert_eq!(page["data"][0]["status"], "Accepted");
}

#[tokio::test]
async fn declined_booking_cannot_be_accepted() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let added: Value = client
        .post(srv.url("/bookings/add"))
        .json(&booking_body("09170000001"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let booking_id = added["bookingId"].as_i64().unwrap();

    let res = client
        .post(srv.url(&format!("/bookings/decline/{booking_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .post(srv.url(&format!("/bookings/accept/{booking_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn booking_without_phone_is_rejected() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/bookings/add"))
        .json(&booking_body("   "))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["message"], "phone_number is required");
}

#[tokio::test]
async fn walk_in_partial_without_amount_is_rejected() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let (status, body) = create_walk_in(
        &client,
        &srv,
        json!({"guest_name": "Ana", "main_services": ["Wash"], "payment_status": "Partial"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "paid_amount is required and must be greater than 0 when payment_status is Partial"
    );
}

#[tokio::test]
async fn malformed_body_is_a_bad_request() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/orders/create"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_body");
}

#[tokio::test]
async fn order_lifecycle_requires_payment_before_completion() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let (status, created) = create_walk_in(
        &client,
        &srv,
        json!({"guest_name": "Ana", "guest_phone_number": "0918 555 0000", "main_services": ["Wash"]}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["orderId"].as_i64().unwrap();

    let (status, body) = set_status(&client, &srv, id, "Completed").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let res = client
        .patch(srv.url(&format!("/orders/{id}/payment")))
        .json(&json!({"payment_status": "Paid"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let paid: Value = res.json().await.unwrap();
    assert_eq!(paid["paid_amount"], 15000);

    assert_eq!(set_status(&client, &srv, id, "Processing").await.0, StatusCode::OK);
    assert_eq!(set_status(&client, &srv, id, "Stand By").await.0, StatusCode::BAD_REQUEST);
    assert_eq!(set_status(&client, &srv, id, "Completed").await.0, StatusCode::OK);

    let order = get_order(&client, &srv, id).await;
    assert_eq!(order["status"], "Completed");
    assert!(!order["completion_date"].is_null());
    assert_eq!(order["guest_phone"], "09185550000");
}

#[tokio::test]
async fn cancelling_is_only_allowed_from_stand_by() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let (_, refunded) = create_walk_in(
        &client,
        &srv,
        json!({"guest_name": "Ben", "main_services": ["Wash"], "payment_status": "Partially Paid", "paid_amount": 5000}),
    )
    .await;
    let refunded_id = refunded["orderId"].as_i64().unwrap();
    let (status, body) = set_status(&client, &srv, refunded_id, "Cancelled").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["payment_status"], "Refunded");

    let (_, processing) = create_walk_in(&client, &srv, json!({"guest_name": "Cy", "main_services": ["Dry"]})).await;
    let processing_id = processing["orderId"].as_i64().unwrap();
    assert_eq!(set_status(&client, &srv, processing_id, "Processing").await.0, StatusCode::OK);
    assert_eq!(
        set_status(&client, &srv, processing_id, "Cancelled").await.0,
        StatusCode::BAD_REQUEST
    );
}

#[tokio::test]
async fn rejecting_stock_policy_blocks_processing() {
    let srv = TestServer::spawn_with(StockPolicy::Reject, 0).await;
    let client = reqwest::Client::new();

    let (_, created) = create_walk_in(
        &client,
        &srv,
        json!({"guest_name": "Dee", "promo": "Family Bundle"}),
    )
    .await;
    let id = created["orderId"].as_i64().unwrap();

    let (status, body) = set_status(&client, &srv, id, "Processing").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "invariant_violation");

    let order = get_order(&client, &srv, id).await;
    assert_eq!(order["status"], "Stand By");
}

#[tokio::test]
async fn editing_recomputes_the_total() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let (_, created) = create_walk_in(
        &client,
        &srv,
        json!({
            "guest_name": "Eve",
            "main_services": ["Wash"],
            "supplies": [{"name": "Detergent", "quantity": 2}]
        }),
    )
    .await;
    assert_eq!(created["total_amount"], 19000);
    let id = created["orderId"].as_i64().unwrap();

    let res = client
        .put(srv.url(&format!("/orders/{id}/edit")))
        .json(&json!({"updatedDetails": [
            {"service_id": srv.detergent.get(), "quantity": 5, "unit_price": 2000}
        ]}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let edited: Value = res.json().await.unwrap();
    assert_eq!(edited["total_amount"], 25000);

    let order = get_order(&client, &srv, id).await;
    assert_eq!(order["total_amount"], 25000);
    assert_eq!(order["calculated_total"], 25000);
}

#[tokio::test]
async fn missing_and_malformed_order_ids() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/orders/999")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client.get(srv.url("/orders/abc")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_id");
}

#[tokio::test]
async fn order_listing_filters_and_paginates() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    for name in ["Ana", "Ben", "Cy"] {
        create_walk_in(&client, &srv, json!({"guest_name": name, "main_services": ["Wash"]})).await;
    }
    let (_, done) = create_walk_in(&client, &srv, json!({"guest_name": "Dee", "main_services": ["Dry"]})).await;
    set_status(&client, &srv, done["orderId"].as_i64().unwrap(), "Processing").await;

    let res = client
        .get(srv.url("/orders?status=Stand%20By&source=walk-in&limit=2&page=1"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let page: Value = res.json().await.unwrap();
    assert_eq!(page["total"], 3);
    assert_eq!(page["totalPages"], 2);
    assert_eq!(page["data"].as_array().unwrap().len(), 2);

    let res = client.get(srv.url("/orders?search=dee")).send().await.unwrap();
    let page: Value = res.json().await.unwrap();
    assert_eq!(page["total"], 1);
    assert_eq!(page["data"][0]["status"], "Processing");

    let res = client.get(srv.url("/orders?status=Lost")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
