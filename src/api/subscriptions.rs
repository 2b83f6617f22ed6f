// src/api/subscriptions.rs

use actix_web::{delete, get, post, put, web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::api::auth::AuthUser;
use crate::db;
use crate::error::ApiError;
use crate::AppState;

const SUBSCRIPTION_STATUSES: [&str; 4] = ["active", "paused", "canceled", "expired"];

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscriptionRequest {
    pub user_id: i32,
    pub plan: String,
    pub status: Option<String>,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubscriptionRequest {
    pub plan: Option<String>,
    pub status: Option<String>,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
}

fn validate_status(status: &str) -> Result<(), ApiError> {
    if !SUBSCRIPTION_STATUSES.contains(&status) {
        return Err(ApiError::Validation(format!(
            "Invalid subscription status {status:?}"
        )));
    }
    Ok(())
}

fn validate_period(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), ApiError> {
    if end <= start {
        return Err(ApiError::Validation(
            "currentPeriodEnd must be after currentPeriodStart".to_string(),
        ));
    }
    Ok(())
}

/// `active` means an "active" row whose paid period has not ended yet.
#[get("/subscription/status")]
pub async fn subscription_status(
    state: web::Data<AppState>,
    user: web::ReqData<AuthUser>,
) -> Result<HttpResponse, ApiError> {
    let subscription = db::latest_subscription(&state.pool, user.id).await?;

    let active = subscription
        .as_ref()
        .map(|s| s.status == "active" && s.current_period_end > Utc::now())
        .unwrap_or(false);

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "active": active,
        "subscription": subscription
    })))
}

#[get("/subscriptions")]
pub async fn list_subscriptions(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let subscriptions = db::list_all_subscriptions(&state.pool).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "subscriptions": subscriptions })))
}

#[post("/subscriptions")]
pub async fn create_subscription(
    state: web::Data<AppState>,
    payload: web::Json<CreateSubscriptionRequest>,
) -> Result<HttpResponse, ApiError> {
    let payload = payload.into_inner();
    let status = payload.status.unwrap_or_else(|| "active".to_string());

    validate_status(&status)?;
    if payload.plan.trim().is_empty() {
        return Err(ApiError::Validation("Plan is required".to_string()));
    }
    // Period order is checked before anything is written.
    validate_period(payload.current_period_start, payload.current_period_end)?;

    let user = db::get_user_by_id(&state.pool, payload.user_id).await?;
    if user.is_none() {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    let subscription = db::create_manual_subscription(
        &state.pool,
        payload.user_id,
        payload.plan.trim(),
        &status,
        payload.current_period_start,
        payload.current_period_end,
    )
    .await?;

    Ok(HttpResponse::Created().json(serde_json::json!({ "subscription": subscription })))
}

#[put("/subscriptions/{id}")]
pub async fn update_subscription(
    state: web::Data<AppState>,
    path: web::Path<i32>,
    payload: web::Json<UpdateSubscriptionRequest>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let payload = payload.into_inner();

    if payload.plan.is_none()
        && payload.status.is_none()
        && payload.current_period_start.is_none()
        && payload.current_period_end.is_none()
    {
        return Err(ApiError::Validation(
            "Provide at least one field to update".to_string(),
        ));
    }

    if let Some(status) = payload.status.as_deref() {
        validate_status(status)?;
    }
    if let Some(plan) = payload.plan.as_deref() {
        if plan.trim().is_empty() {
            return Err(ApiError::Validation("Plan is required".to_string()));
        }
    }

    let existing = db::get_subscription(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Subscription not found".to_string()))?;

    let next_start = payload
        .current_period_start
        .unwrap_or(existing.current_period_start);
    let next_end = payload
        .current_period_end
        .unwrap_or(existing.current_period_end);
    validate_period(next_start, next_end)?;

    let subscription = db::update_manual_subscription(
        &state.pool,
        id,
        payload.plan.as_deref().map(str::trim),
        payload.status.as_deref(),
        payload.current_period_start,
        payload.current_period_end,
    )
    .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "subscription": subscription })))
}

#[delete("/subscriptions/{id}")]
pub async fn delete_subscription(
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();

    let deleted = db::delete_subscription(&state.pool, id).await?;
    if deleted == 0 {
        return Err(ApiError::NotFound("Subscription not found".to_string()));
    }

    Ok(HttpResponse::NoContent().finish())
}
