// src/api/pronos.rs

use actix_web::{delete, get, post, put, web, HttpResponse};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::db;
use crate::error::ApiError;
use crate::models::Prono;
use crate::AppState;

const RESULTS: [&str; 3] = ["won", "lost", "pending"];
const STATUSES: [&str; 2] = ["draft", "published"];

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PronoRequest {
    pub title: String,
    pub sport: String,
    pub competition: String,
    pub match_time: DateTime<Utc>,
    pub tip: String,
    pub odd: Decimal,
    pub confidence: i32,
    pub content: String,
    pub result: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PronoUpdateRequest {
    pub title: Option<String>,
    pub sport: Option<String>,
    pub competition: Option<String>,
    pub match_time: Option<DateTime<Utc>>,
    pub tip: Option<String>,
    pub odd: Option<Decimal>,
    pub confidence: Option<i32>,
    pub content: Option<String>,
    pub result: Option<String>,
    pub status: Option<String>,
}

fn validate_prono(payload: &PronoRequest) -> Result<(), ApiError> {
    if payload.title.trim().len() < 3 {
        return Err(ApiError::Validation(
            "Title must be at least 3 characters".to_string(),
        ));
    }
    if payload.sport.trim().len() < 2 || payload.competition.trim().len() < 2 {
        return Err(ApiError::Validation(
            "Sport and competition must be at least 2 characters".to_string(),
        ));
    }
    if payload.tip.trim().is_empty() {
        return Err(ApiError::Validation("Tip is required".to_string()));
    }
    if payload.odd <= Decimal::ZERO {
        return Err(ApiError::Validation("Odd must be positive".to_string()));
    }
    if !(1..=100).contains(&payload.confidence) {
        return Err(ApiError::Validation(
            "Confidence must be between 1 and 100".to_string(),
        ));
    }
    if payload.content.trim().len() < 5 {
        return Err(ApiError::Validation(
            "Content must be at least 5 characters".to_string(),
        ));
    }
    if let Some(result) = payload.result.as_deref() {
        validate_enum(result, &RESULTS, "result")?;
    }
    if let Some(status) = payload.status.as_deref() {
        validate_enum(status, &STATUSES, "status")?;
    }
    Ok(())
}

fn validate_enum(value: &str, allowed: &[&str], field: &str) -> Result<(), ApiError> {
    if !allowed.contains(&value) {
        return Err(ApiError::Validation(format!("Invalid {field} {value:?}")));
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/pronos/today",
    responses((status = 200, description = "Published pronos for today", body = [Prono])),
    tag = "pronos"
)]
#[get("/today")]
pub async fn today(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let pronos = db::list_pronos_by_day_offset(&state.pool, 0).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "pronos": pronos })))
}

#[get("/yesterday")]
pub async fn yesterday(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let pronos = db::list_pronos_by_day_offset(&state.pool, -1).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "pronos": pronos })))
}

#[get("/before-yesterday")]
pub async fn before_yesterday(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let pronos = db::list_pronos_by_day_offset(&state.pool, -2).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "pronos": pronos })))
}

#[get("/{id}")]
pub async fn get_prono(
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let prono = db::get_prono(&state.pool, path.into_inner())
        .await?
        .ok_or_else(|| ApiError::NotFound("Prono not found".to_string()))?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "prono": prono })))
}

#[post("/pronos")]
pub async fn create_prono(
    state: web::Data<AppState>,
    payload: web::Json<PronoRequest>,
) -> Result<HttpResponse, ApiError> {
    let payload = payload.into_inner();
    validate_prono(&payload)?;

    let prono = sqlx::query_as::<_, Prono>(
        r#"INSERT INTO pronos (title, sport, competition, match_time, tip, odd, confidence,
                               content, result, status)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
           RETURNING id, title, sport, competition, match_time, tip, odd, confidence, content,
                     result, status, created_at, updated_at"#,
    )
    .bind(payload.title.trim())
    .bind(payload.sport.trim())
    .bind(payload.competition.trim())
    .bind(payload.match_time)
    .bind(payload.tip.trim())
    .bind(payload.odd)
    .bind(payload.confidence)
    .bind(payload.content.trim())
    .bind(payload.result.as_deref().unwrap_or("pending"))
    .bind(payload.status.as_deref().unwrap_or("draft"))
    .fetch_one(&state.pool)
    .await?;

    Ok(HttpResponse::Created().json(serde_json::json!({ "prono": prono })))
}

#[put("/pronos/{id}")]
pub async fn update_prono(
    state: web::Data<AppState>,
    path: web::Path<i32>,
    payload: web::Json<PronoUpdateRequest>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let payload = payload.into_inner();

    if let Some(odd) = payload.odd {
        if odd <= Decimal::ZERO {
            return Err(ApiError::Validation("Odd must be positive".to_string()));
        }
    }
    if let Some(confidence) = payload.confidence {
        if !(1..=100).contains(&confidence) {
            return Err(ApiError::Validation(
                "Confidence must be between 1 and 100".to_string(),
            ));
        }
    }
    if let Some(result) = payload.result.as_deref() {
        validate_enum(result, &RESULTS, "result")?;
    }
    if let Some(status) = payload.status.as_deref() {
        validate_enum(status, &STATUSES, "status")?;
    }

    if db::get_prono(&state.pool, id).await?.is_none() {
        return Err(ApiError::NotFound("Prono not found".to_string()));
    }

    let prono = sqlx::query_as::<_, Prono>(
        r#"UPDATE pronos
           SET title = COALESCE($2, title),
               sport = COALESCE($3, sport),
               competition = COALESCE($4, competition),
               match_time = COALESCE($5, match_time),
               tip = COALESCE($6, tip),
               odd = COALESCE($7, odd),
               confidence = COALESCE($8, confidence),
               content = COALESCE($9, content),
               result = COALESCE($10, result),
               status = COALESCE($11, status),
               updated_at = NOW()
           WHERE id = $1
           RETURNING id, title, sport, competition, match_time, tip, odd, confidence, content,
                     result, status, created_at, updated_at"#,
    )
    .bind(id)
    .bind(payload.title.as_deref().map(str::trim))
    .bind(payload.sport.as_deref().map(str::trim))
    .bind(payload.competition.as_deref().map(str::trim))
    .bind(payload.match_time)
    .bind(payload.tip.as_deref().map(str::trim))
    .bind(payload.odd)
    .bind(payload.confidence)
    .bind(payload.content.as_deref().map(str::trim))
    .bind(payload.result.as_deref())
    .bind(payload.status.as_deref())
    .fetch_one(&state.pool)
    .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "prono": prono })))
}

#[delete("/pronos/{id}")]
pub async fn delete_prono(
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();

    if db::get_prono(&state.pool, id).await?.is_none() {
        return Err(ApiError::NotFound("Prono not found".to_string()));
    }

    sqlx::query("DELETE FROM pronos WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?;

    Ok(HttpResponse::NoContent().finish())
}
