use actix_web::test::TestRequest;
use actix_web::{test, web, App};
use chrono::Duration;
use rust_decimal::Decimal;
use serde_json::json;
use sqlx::Row;

use fixedpronos_api::api;
use fixedpronos_api::api::auth::{sign_token, AdminGuard, JwtMiddleware};

mod support;

fn bearer(user_id: i32, role: &str) -> String {
    let token = sign_token(
        user_id,
        role.to_string(),
        "test_jwt_secret_0123456789",
        Duration::minutes(15),
    )
    .expect("sign token");
    format!("Bearer {token}")
}

#[actix_web::test]
async fn manual_subscription_rejects_inverted_period_before_writing() {
    let test_db = support::init_test_db().await;
    let pool = &test_db.pool;

    let user = support::insert_user(pool, "subscriber", Decimal::ZERO).await;
    let admin = support::insert_admin(pool, "sub_admin").await;

    let state = web::Data::new(support::build_state(test_db.pool.clone()));
    let app = test::init_service(
        App::new().app_data(state.clone()).service(
            web::scope("/admin")
                .wrap(AdminGuard)
                .wrap(JwtMiddleware)
                .service(api::subscriptions::create_subscription),
        ),
    )
    .await;

    let req = TestRequest::post()
        .uri("/admin/subscriptions")
        .insert_header(("Authorization", bearer(admin, "ADMIN")))
        .set_json(json!({
            "userId": user,
            "plan": "monthly",
            "currentPeriodStart": "2026-08-01T00:00:00Z",
            "currentPeriodEnd": "2026-08-01T00:00:00Z"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let count: i64 = sqlx::query("SELECT COUNT(*) AS n FROM subscriptions")
        .fetch_one(pool)
        .await
        .expect("count subscriptions")
        .get("n");
    assert_eq!(count, 0);
}

#[actix_web::test]
async fn manual_subscription_lifecycle_drives_the_status_endpoint() {
    let test_db = support::init_test_db().await;
    let pool = &test_db.pool;

    let user = support::insert_user(pool, "status_subscriber", Decimal::ZERO).await;
    let admin = support::insert_admin(pool, "status_admin").await;

    let state = web::Data::new(support::build_state(test_db.pool.clone()));
    let app = test::init_service(
        App::new()
            .app_data(state.clone())
            .service(
                web::scope("/admin")
                    .wrap(AdminGuard)
                    .wrap(JwtMiddleware)
                    .service(api::subscriptions::create_subscription)
                    .service(api::subscriptions::update_subscription)
                    .service(api::subscriptions::delete_subscription),
            )
            .service(
                web::scope("")
                    .wrap(JwtMiddleware)
                    .service(api::subscriptions::subscription_status),
            ),
    )
    .await;

    // No subscription yet.
    let req = TestRequest::get()
        .uri("/subscription/status")
        .insert_header(("Authorization", bearer(user, "USER")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["active"], false);

    // Admin creates an active subscription covering today.
    let req = TestRequest::post()
        .uri("/admin/subscriptions")
        .insert_header(("Authorization", bearer(admin, "ADMIN")))
        .set_json(json!({
            "userId": user,
            "plan": "monthly",
            "currentPeriodStart": "2026-01-01T00:00:00Z",
            "currentPeriodEnd": "2100-01-01T00:00:00Z"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let body: serde_json::Value = test::read_body_json(resp).await;
    let subscription_id = body["subscription"]["id"].as_i64().expect("id");
    assert!(body["subscription"]["reference"]
        .as_str()
        .expect("reference")
        .starts_with("manual_"));

    let req = TestRequest::get()
        .uri("/subscription/status")
        .insert_header(("Authorization", bearer(user, "USER")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["active"], true);

    // Pausing the subscription turns the status off.
    let req = TestRequest::put()
        .uri(&format!("/admin/subscriptions/{subscription_id}"))
        .insert_header(("Authorization", bearer(admin, "ADMIN")))
        .set_json(json!({ "status": "paused" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let req = TestRequest::get()
        .uri("/subscription/status")
        .insert_header(("Authorization", bearer(user, "USER")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["active"], false);

    // An update that would invert the period is rejected.
    let req = TestRequest::put()
        .uri(&format!("/admin/subscriptions/{subscription_id}"))
        .insert_header(("Authorization", bearer(admin, "ADMIN")))
        .set_json(json!({ "currentPeriodEnd": "2025-01-01T00:00:00Z" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    // Delete, then the row is gone.
    let req = TestRequest::delete()
        .uri(&format!("/admin/subscriptions/{subscription_id}"))
        .insert_header(("Authorization", bearer(admin, "ADMIN")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 204);

    let req = TestRequest::delete()
        .uri(&format!("/admin/subscriptions/{subscription_id}"))
        .insert_header(("Authorization", bearer(admin, "ADMIN")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}
