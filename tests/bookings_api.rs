#[macro_use]
mod common;

use std::sync::Arc;
use std::time::Duration;

use actix_web::test;
use async_trait::async_trait;
use common::{bearer, TestContext};
use serde_json::{json, Value};
use travel_listings::error::QueueError;
use travel_listings::tasks::{Task, TaskEnvelope, TaskQueue};
use travel_listings::{AppState, MemoryStore, Repository, Settings};
use uuid::Uuid;

#[actix_web::test]
async fn test_booking_with_end_before_start_is_rejected() {
    let ctx = TestContext::new();
    let (host, _) = ctx.login("host@example.com").await;
    let (_, token) = ctx.login("guest@example.com").await;
    let listing = ctx.listing(&host, 100.0).await;
    let app = test_app!(ctx);

    let resp = test::TestRequest::post()
        .uri("/api/bookings")
        .insert_header(bearer(&token))
        .set_json(json!({
            "listing": listing.listing_id,
            "start_date": "2025-06-10",
            "end_date": "2025-06-08"
        }))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
        body["error"]["fields"]["end_date"][0],
        "End date must be after start date."
    );
    assert!(ctx.queue.is_empty());
}

#[actix_web::test]
async fn test_booking_creation_enqueues_one_confirmation() {
    let ctx = TestContext::new();
    let (host, _) = ctx.login("host@example.com").await;
    let (guest, token) = ctx.login("guest@example.com").await;
    let listing = ctx.listing(&host, 120.0).await;
    let app = test_app!(ctx);

    let resp = test::TestRequest::post()
        .uri("/api/bookings")
        .insert_header(bearer(&token))
        .set_json(json!({
            "listing": listing.listing_id,
            "start_date": "2025-06-01",
            "end_date": "2025-06-04",
            "status": "confirmed"
        }))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 201);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["user"], guest.id.to_string());
    assert_eq!(body["status"], "pending");
    assert_eq!(body["total_price"], 360.0);

    let booking_id: Uuid = body["booking_id"].as_str().unwrap().parse().unwrap();
    let pending = ctx.queue.pending();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].task, Task::SendBookingConfirmation { booking_id });
    assert_eq!(pending[0].attempts, 0);
}

#[actix_web::test]
async fn test_unknown_listing_is_a_field_error() {
    let ctx = TestContext::new();
    let (_, token) = ctx.login("guest@example.com").await;
    let app = test_app!(ctx);

    let resp = test::TestRequest::post()
        .uri("/api/bookings")
        .insert_header(bearer(&token))
        .set_json(json!({
            "listing": Uuid::new_v4(),
            "start_date": "2025-06-01",
            "end_date": "2025-06-04"
        }))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"]["fields"]["listing"].is_array());
}

#[actix_web::test]
async fn test_bookings_require_authentication() {
    let ctx = TestContext::new();
    let app = test_app!(ctx);

    let resp = test::TestRequest::get().uri("/api/bookings").send_request(&app).await;
    assert_eq!(resp.status(), 401);
}

#[actix_web::test]
async fn test_users_only_see_their_own_bookings() {
    let ctx = TestContext::new();
    let (host, _) = ctx.login("host@example.com").await;
    let (_, alice) = ctx.login("alice@example.com").await;
    let (_, bob) = ctx.login("bob@example.com").await;
    let (_, staff) = ctx.login_staff("staff@example.com").await;
    let listing = ctx.listing(&host, 50.0).await;
    let app = test_app!(ctx);

    let resp = test::TestRequest::post()
        .uri("/api/bookings")
        .insert_header(bearer(&alice))
        .set_json(json!({
            "listing": listing.listing_id,
            "start_date": "2025-08-01",
            "end_date": "2025-08-02"
        }))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 201);
    let body: Value = test::read_body_json(resp).await;
    let uri = format!("/api/bookings/{}", body["booking_id"].as_str().unwrap());

    let resp = test::TestRequest::get()
        .uri("/api/bookings")
        .insert_header(bearer(&bob))
        .send_request(&app)
        .await;
    let listed: Value = test::read_body_json(resp).await;
    assert_eq!(listed.as_array().map(Vec::len), Some(0));

    let resp = test::TestRequest::get()
        .uri(&uri)
        .insert_header(bearer(&bob))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 404);

    let resp = test::TestRequest::delete()
        .uri(&uri)
        .insert_header(bearer(&bob))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 404);

    let resp = test::TestRequest::get()
        .uri("/api/bookings")
        .insert_header(bearer(&staff))
        .send_request(&app)
        .await;
    let listed: Value = test::read_body_json(resp).await;
    assert_eq!(listed.as_array().map(Vec::len), Some(1));

    let resp = test::TestRequest::delete()
        .uri(&uri)
        .insert_header(bearer(&alice))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 204);
}

#[actix_web::test]
async fn test_patch_booking_reprices_and_revalidates() {
    let ctx = TestContext::new();
    let (host, _) = ctx.login("host@example.com").await;
    let (_, token) = ctx.login("guest@example.com").await;
    let listing = ctx.listing(&host, 100.0).await;
    let app = test_app!(ctx);

    let resp = test::TestRequest::post()
        .uri("/api/bookings")
        .insert_header(bearer(&token))
        .set_json(json!({
            "listing": listing.listing_id,
            "start_date": "2025-06-01",
            "end_date": "2025-06-03"
        }))
        .send_request(&app)
        .await;
    let body: Value = test::read_body_json(resp).await;
    let uri = format!("/api/bookings/{}", body["booking_id"].as_str().unwrap());

    let resp = test::TestRequest::patch()
        .uri(&uri)
        .insert_header(bearer(&token))
        .set_json(json!({"end_date": "2025-06-05"}))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["total_price"], 400.0);

    let resp = test::TestRequest::patch()
        .uri(&uri)
        .insert_header(bearer(&token))
        .set_json(json!({"end_date": "2025-05-30"}))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn test_guest_cannot_confirm_own_booking() {
    let ctx = TestContext::new();
    let (host, _) = ctx.login("host@example.com").await;
    let (_, token) = ctx.login("guest@example.com").await;
    let (_, staff) = ctx.login_staff("staff@example.com").await;
    let listing = ctx.listing(&host, 100.0).await;
    let app = test_app!(ctx);

    let resp = test::TestRequest::post()
        .uri("/api/bookings")
        .insert_header(bearer(&token))
        .set_json(json!({
            "listing": listing.listing_id,
            "start_date": "2025-06-01",
            "end_date": "2025-06-03"
        }))
        .send_request(&app)
        .await;
    let body: Value = test::read_body_json(resp).await;
    let uri = format!("/api/bookings/{}", body["booking_id"].as_str().unwrap());

    let resp = test::TestRequest::patch()
        .uri(&uri)
        .insert_header(bearer(&token))
        .set_json(json!({"status": "confirmed"}))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"]["fields"]["status"].is_array());

    let resp = test::TestRequest::get()
        .uri(&uri)
        .insert_header(bearer(&token))
        .send_request(&app)
        .await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "pending");

    let resp = test::TestRequest::patch()
        .uri(&uri)
        .insert_header(bearer(&staff))
        .set_json(json!({"status": "confirmed"}))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "confirmed");

    let resp = test::TestRequest::patch()
        .uri(&uri)
        .insert_header(bearer(&token))
        .set_json(json!({"status": "canceled"}))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "canceled");
}

struct BrokenQueue;

#[async_trait]
impl TaskQueue for BrokenQueue {
    async fn push(&self, _envelope: TaskEnvelope) -> Result<(), QueueError> {
        Err(QueueError::Connection("broker unavailable".into()))
    }

    async fn pop(&self, _timeout: Duration) -> Result<Option<TaskEnvelope>, QueueError> {
        Ok(None)
    }
}

#[actix_web::test]
async fn test_broker_failure_does_not_fail_booking() {
    let store = Arc::new(MemoryStore::new());
    let state = AppState::from_parts(
        Settings::new_for_test().unwrap(),
        store.clone(),
        Arc::new(BrokenQueue),
    )
    .unwrap();
    let ctx = TestContext {
        state,
        store,
        queue: Arc::new(travel_listings::MemoryQueue::new()),
    };
    let (host, _) = ctx.login("host@example.com").await;
    let (_, token) = ctx.login("guest@example.com").await;
    let listing = ctx.listing(&host, 100.0).await;
    let app = test_app!(ctx);

    let resp = test::TestRequest::post()
        .uri("/api/bookings")
        .insert_header(bearer(&token))
        .set_json(json!({
            "listing": listing.listing_id,
            "start_date": "2025-06-01",
            "end_date": "2025-06-02"
        }))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 201);
    assert_eq!(ctx.store.list_bookings(None).await.unwrap().len(), 1);
}
