// src/api/users.rs

use actix_web::{get, put, web, HttpResponse};
use bcrypt::{hash, verify, DEFAULT_COST};
use serde::Deserialize;
use sqlx::Row;
use utoipa::ToSchema;

use crate::api::auth::AuthUser;
use crate::db;
use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub password: Option<String>,
    pub current_password: Option<String>,
}

#[get("/me")]
pub async fn get_profile(
    state: web::Data<AppState>,
    user: web::ReqData<AuthUser>,
) -> Result<HttpResponse, ApiError> {
    let profile = db::get_user_by_id(&state.pool, user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "user": profile })))
}

#[put("/me/update")]
pub async fn update_profile(
    state: web::Data<AppState>,
    user: web::ReqData<AuthUser>,
    payload: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse, ApiError> {
    let payload = payload.into_inner();

    let name = match payload.name.as_deref().map(str::trim) {
        Some(name) if name.len() < 2 || name.len() > 120 => {
            return Err(ApiError::Validation(
                "Name must be between 2 and 120 characters".to_string(),
            ));
        }
        other => other,
    };

    let mut password_hash: Option<String> = None;
    if let Some(password) = payload.password.as_deref() {
        if password.len() < 8 {
            return Err(ApiError::Validation(
                "Password must be at least 8 characters".to_string(),
            ));
        }
        let current = payload.current_password.as_deref().ok_or_else(|| {
            ApiError::Validation(
                "Current password is required to set a new password".to_string(),
            )
        })?;

        let row = sqlx::query("SELECT password_hash FROM users WHERE id = $1")
            .bind(user.id)
            .fetch_optional(&state.pool)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        let stored: String = row.get("password_hash");
        if !verify(current, &stored)? {
            return Err(ApiError::Validation(
                "Current password is invalid".to_string(),
            ));
        }

        password_hash = Some(hash(password, DEFAULT_COST)?);
    }

    if name.is_none() && password_hash.is_none() {
        return Err(ApiError::Validation(
            "Provide at least one field to update".to_string(),
        ));
    }

    sqlx::query(
        r#"UPDATE users
           SET name = COALESCE($1, name),
               password_hash = COALESCE($2, password_hash),
               updated_at = NOW()
           WHERE id = $3"#,
    )
    .bind(name)
    .bind(password_hash)
    .bind(user.id)
    .execute(&state.pool)
    .await?;

    let updated = db::get_user_by_id(&state.pool, user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "user": updated })))
}
