use actix_web::test::TestRequest;
use actix_web::{test, web, App};
use chrono::Duration;
use rust_decimal::Decimal;
use serde_json::json;
use sqlx::Row;

use fixedpronos_api::api;
use fixedpronos_api::api::auth::{sign_token, AdminGuard, JwtMiddleware};

mod support;

use support::dec;

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
async fn withdraw_endpoint_enforces_available_balance() {
    let test_db = support::init_test_db().await;
    let pool = &test_db.pool;

    let user = support::insert_user(pool, "http_withdrawer", dec("100.00")).await;
    support::insert_pending_payout(pool, user, dec("60.00")).await;

    let state = web::Data::new(support::build_state(test_db.pool.clone()));
    let app = test::init_service(
        App::new().app_data(state.clone()).service(
            web::scope("")
                .wrap(JwtMiddleware)
                .service(api::referrals::referral_stats)
                .service(api::referrals::withdraw),
        ),
    )
    .await;

    let req = TestRequest::post()
        .uri("/referral/withdraw")
        .insert_header(("Authorization", bearer(user, "USER")))
        .set_json(json!({ "amount": 41 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Insufficient commission balance");

    let req = TestRequest::post()
        .uri("/referral/withdraw")
        .insert_header(("Authorization", bearer(user, "USER")))
        .set_json(json!({ "amount": 40 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["transaction"]["status"], "pending");
    assert_eq!(body["transaction"]["type"], "payout");
    assert_eq!(body["transaction"]["currency"], "EUR");

    // Stats reflect the new pending payout.
    let req = TestRequest::get()
        .uri("/referral/stats")
        .insert_header(("Authorization", bearer(user, "USER")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["pendingWithdrawals"], "100.00");
    assert_eq!(body["availableBalance"], "0.00");
}

#[actix_web::test]
async fn withdraw_endpoint_requires_authentication() {
    let test_db = support::init_test_db().await;

    let state = web::Data::new(support::build_state(test_db.pool.clone()));
    let app = test::init_service(
        App::new().app_data(state.clone()).service(
            web::scope("")
                .wrap(JwtMiddleware)
                .service(api::referrals::withdraw),
        ),
    )
    .await;

    let req = TestRequest::post()
        .uri("/referral/withdraw")
        .set_json(json!({ "amount": 10 }))
        .to_request();
    let resp = test::try_call_service(&app, req).await;
    let err = resp.expect_err("missing token must be rejected");
    assert_eq!(err.as_response_error().status_code(), 401);
}

#[actix_web::test]
async fn approve_endpoint_is_admin_only_and_settles_the_payout() {
    let test_db = support::init_test_db().await;
    let pool = &test_db.pool;

    let user = support::insert_user(pool, "http_payee", dec("100.00")).await;
    let payout = support::insert_pending_payout(pool, user, dec("30.00")).await;
    let admin = support::insert_admin(pool, "http_admin").await;

    let state = web::Data::new(support::build_state(test_db.pool.clone()));
    let app = test::init_service(
        App::new().app_data(state.clone()).service(
            web::scope("/admin")
                .wrap(AdminGuard)
                .wrap(JwtMiddleware)
                .service(api::transactions::approve_payout),
        ),
    )
    .await;

    // A plain user is rejected by the admin guard.
    let req = TestRequest::post()
        .uri(&format!("/admin/transactions/{payout}/approve"))
        .insert_header(("Authorization", bearer(user, "USER")))
        .to_request();
    let resp = test::try_call_service(&app, req).await;
    let err = resp.expect_err("non-admin must be rejected");
    assert_eq!(err.as_response_error().status_code(), 403);

    // The admin approves; the balance is debited.
    let req = TestRequest::post()
        .uri(&format!("/admin/transactions/{payout}/approve"))
        .insert_header(("Authorization", bearer(admin, "ADMIN")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let balance: Decimal = sqlx::query("SELECT balance_commission FROM users WHERE id = $1")
        .bind(user)
        .fetch_one(pool)
        .await
        .expect("select balance")
        .get("balance_commission");
    assert_eq!(balance, dec("70.00"));

    // Unknown transaction id is a 404.
    let req = TestRequest::post()
        .uri("/admin/transactions/999999/approve")
        .insert_header(("Authorization", bearer(admin, "ADMIN")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}

#[actix_web::test]
async fn admin_award_endpoint_applies_the_commission_rate() {
    let test_db = support::init_test_db().await;
    let pool = &test_db.pool;

    let referrer = support::insert_user(pool, "award_referrer", Decimal::ZERO).await;
    let referee = support::insert_user(pool, "award_referee", Decimal::ZERO).await;
    sqlx::query("UPDATE users SET referred_by_id = $1 WHERE id = $2")
        .bind(referrer)
        .bind(referee)
        .execute(pool)
        .await
        .expect("link referrer");
    let admin = support::insert_admin(pool, "award_admin").await;

    let state = web::Data::new(support::build_state(test_db.pool.clone()));
    let app = test::init_service(
        App::new().app_data(state.clone()).service(
            web::scope("/admin")
                .wrap(AdminGuard)
                .wrap(JwtMiddleware)
                .service(api::referrals::award_commission),
        ),
    )
    .await;

    // 30% of 50.00, rounded to cents.
    let req = TestRequest::post()
        .uri("/admin/referrals/award")
        .insert_header(("Authorization", bearer(admin, "ADMIN")))
        .set_json(json!({ "refereeId": referee, "paymentAmount": 50 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["commissionAmount"], "15.00");

    let balance: Decimal = sqlx::query("SELECT balance_commission FROM users WHERE id = $1")
        .bind(referrer)
        .fetch_one(pool)
        .await
        .expect("select balance")
        .get("balance_commission");
    assert_eq!(balance, dec("15.00"));

    // A referee without a referrer is an invalid award target.
    let loner = support::insert_user(pool, "award_loner", Decimal::ZERO).await;
    let req = TestRequest::post()
        .uri("/admin/referrals/award")
        .insert_header(("Authorization", bearer(admin, "ADMIN")))
        .set_json(json!({ "refereeId": loner, "paymentAmount": 50 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}
