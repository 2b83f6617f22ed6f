// src/api/transactions.rs

use actix_web::{get, post, web, HttpResponse};

use crate::api::auth::AuthUser;
use crate::db;
use crate::error::ApiError;
use crate::referral;
use crate::AppState;

#[get("/transactions")]
pub async fn my_transactions(
    state: web::Data<AppState>,
    user: web::ReqData<AuthUser>,
) -> Result<HttpResponse, ApiError> {
    let transactions = db::list_user_transactions(&state.pool, user.id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "transactions": transactions })))
}

#[get("/transactions")]
pub async fn all_transactions(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let transactions = db::list_all_transactions(&state.pool).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "transactions": transactions })))
}

#[utoipa::path(
    post,
    path = "/admin/transactions/{id}/approve",
    params(("id" = i32, Path, description = "Payout transaction id")),
    responses(
        (status = 200, description = "Payout approved and balance debited"),
        (status = 400, description = "Transaction is not a pending payout"),
        (status = 404, description = "Transaction not found")
    ),
    tag = "admin"
)]
#[post("/transactions/{id}/approve")]
pub async fn approve_payout(
    state: web::Data<AppState>,
    path: web::Path<i32>,
    admin: web::ReqData<AuthUser>,
) -> Result<HttpResponse, ApiError> {
    let transaction_id = path.into_inner();
    referral::approve_withdrawal(&state.pool, transaction_id, admin.id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Payout approved" })))
}
