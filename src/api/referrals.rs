// src/api/referrals.rs

use actix_web::{get, post, web, HttpResponse};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::Row;
use utoipa::ToSchema;

use crate::api::auth::AuthUser;
use crate::error::ApiError;
use crate::referral;
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct WithdrawRequest {
    pub amount: Decimal,
    pub currency: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AwardCommissionRequest {
    pub referee_id: i32,
    pub payment_amount: Decimal,
    pub currency: Option<String>,
    pub provider_id: Option<String>,
}

fn normalize_currency(currency: Option<String>) -> Result<String, ApiError> {
    let currency = currency.unwrap_or_else(|| "EUR".to_string());
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ApiError::Validation(
            "Currency must be a 3-letter code".to_string(),
        ));
    }
    Ok(currency.to_uppercase())
}

#[utoipa::path(
    get,
    path = "/referral/stats",
    responses(
        (status = 200, description = "Referral earnings and withdrawal state", body = referral::ReferralStats),
        (status = 401, description = "Not authenticated")
    ),
    tag = "referrals"
)]
#[get("/referral/stats")]
pub async fn referral_stats(
    state: web::Data<AppState>,
    user: web::ReqData<AuthUser>,
) -> Result<HttpResponse, ApiError> {
    let stats = referral::get_referral_stats(&state.pool, user.id).await?;
    Ok(HttpResponse::Ok().json(stats))
}

#[utoipa::path(
    post,
    path = "/referral/withdraw",
    request_body = WithdrawRequest,
    responses(
        (status = 201, description = "Pending payout created", body = crate::models::Transaction),
        (status = 400, description = "Insufficient commission balance")
    ),
    tag = "referrals"
)]
#[post("/referral/withdraw")]
pub async fn withdraw(
    state: web::Data<AppState>,
    user: web::ReqData<AuthUser>,
    payload: web::Json<WithdrawRequest>,
) -> Result<HttpResponse, ApiError> {
    let payload = payload.into_inner();
    let currency = normalize_currency(payload.currency)?;

    let transaction =
        referral::request_withdrawal(&state.pool, user.id, payload.amount, &currency).await?;

    Ok(HttpResponse::Created().json(serde_json::json!({ "transaction": transaction })))
}

/// Records externally-collected revenue for a referred user and credits the
/// referrer with `payment_amount * REFERRAL_COMMISSION_RATE`.
#[post("/referrals/award")]
pub async fn award_commission(
    state: web::Data<AppState>,
    payload: web::Json<AwardCommissionRequest>,
) -> Result<HttpResponse, ApiError> {
    let payload = payload.into_inner();
    let currency = normalize_currency(payload.currency)?;

    if payload.payment_amount <= Decimal::ZERO {
        return Err(ApiError::Validation(
            "Payment amount must be greater than zero".to_string(),
        ));
    }

    let referee = sqlx::query("SELECT id, referred_by_id FROM users WHERE id = $1")
        .bind(payload.referee_id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let referrer_id: Option<i32> = referee.get("referred_by_id");
    let referrer_id = referrer_id
        .ok_or_else(|| ApiError::InvalidState("User has no referrer".to_string()))?;

    let commission = (payload.payment_amount * state.config.commission_rate).round_dp(2);

    referral::award_commission(
        &state.pool,
        referrer_id,
        payload.referee_id,
        commission,
        &currency,
        payload.provider_id,
    )
    .await?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "Commission awarded",
        "commissionAmount": commission
    })))
}
