// src/api/admin.rs

use actix_web::{get, web, HttpResponse};

use crate::db;
use crate::error::ApiError;
use crate::AppState;

#[get("/users")]
pub async fn list_users(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let users = db::list_users(&state.pool).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "users": users })))
}

#[get("/stats")]
pub async fn stats(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let stats = db::admin_stats(&state.pool).await?;
    Ok(HttpResponse::Ok().json(stats))
}
