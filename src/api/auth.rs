// src/api/auth.rs

use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{post, web, Error, HttpMessage, HttpResponse};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use futures_util::future::{ready, LocalBoxFuture, Ready};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use std::task::{Context, Poll};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::USER_COLUMNS;
use crate::email::send_password_reset_email;
use crate::error::ApiError;
use crate::models::User;
use crate::AppState;

const ACCESS_TOKEN_TTL_MINUTES: i64 = 15;
const REFRESH_TOKEN_TTL_DAYS: i64 = 30;
const RESET_TOKEN_TTL_HOURS: i64 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i32,
    pub role: String,
    pub exp: usize,
}

/// Authenticated principal placed into request extensions by `JwtMiddleware`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i32,
    pub role: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub referral_code: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Email in use or invalid referral code")
    ),
    tag = "auth"
)]
#[post("/register")]
pub async fn register(
    state: web::Data<AppState>,
    payload: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ApiError> {
    let email = payload.email.trim().to_lowercase();
    if !email.contains('@') || !email.contains('.') {
        return Err(ApiError::Validation("Invalid email address".to_string()));
    }
    if payload.password.len() < 8 {
        return Err(ApiError::Validation(
            "Password must be at least 8 characters".to_string(),
        ));
    }
    let name = payload.name.trim();
    if name.len() < 2 || name.len() > 100 {
        return Err(ApiError::Validation(
            "Name must be between 2 and 100 characters".to_string(),
        ));
    }

    let existing = sqlx::query("SELECT id FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&state.pool)
        .await?;
    if existing.is_some() {
        return Err(ApiError::Validation("Email already in use".to_string()));
    }

    let referred_by_id = match payload.referral_code.as_deref() {
        Some(code) => {
            let referrer = sqlx::query("SELECT id FROM users WHERE referral_code = $1")
                .bind(code)
                .fetch_optional(&state.pool)
                .await?;
            match referrer {
                Some(row) => Some(row.get::<i32, _>("id")),
                None => {
                    return Err(ApiError::Validation("Invalid referral code".to_string()));
                }
            }
        }
        None => None,
    };

    let password_hash = hash(&payload.password, DEFAULT_COST)?;
    let referral_code = generate_referral_code(&state.pool).await?;

    // The user row and its referral row must appear together or not at all.
    let mut tx = state.pool.begin().await?;

    let user = sqlx::query_as::<_, User>(&format!(
        r#"INSERT INTO users (email, password_hash, name, referral_code, referred_by_id)
           VALUES ($1, $2, $3, $4, $5)
           RETURNING {USER_COLUMNS}"#
    ))
    .bind(&email)
    .bind(&password_hash)
    .bind(name)
    .bind(&referral_code)
    .bind(referred_by_id)
    .fetch_one(&mut *tx)
    .await?;

    if let Some(referrer_id) = referred_by_id {
        sqlx::query(
            r#"INSERT INTO referrals (referrer_id, referee_id, commission_amount, paid)
               VALUES ($1, $2, 0, FALSE)"#,
        )
        .bind(referrer_id)
        .bind(user.id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    let user = ensure_admin_role(&state, user).await?;
    let (access_token, refresh_token) = create_tokens(&user)?;

    Ok(HttpResponse::Created().json(AuthResponse {
        user,
        access_token,
        refresh_token,
    }))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "auth"
)]
#[post("/login")]
pub async fn login(
    state: web::Data<AppState>,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let email = payload.email.trim().to_lowercase();

    let row = sqlx::query("SELECT id, password_hash FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".to_string()))?;

    let password_hash: String = row.get("password_hash");
    if !verify(&payload.password, &password_hash)? {
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }

    let user_id: i32 = row.get("id");
    let user = crate::db::get_user_by_id(&state.pool, user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".to_string()))?;

    let user = ensure_admin_role(&state, user).await?;
    let (access_token, refresh_token) = create_tokens(&user)?;

    Ok(HttpResponse::Ok().json(AuthResponse {
        user,
        access_token,
        refresh_token,
    }))
}

#[post("/refresh")]
pub async fn refresh(
    state: web::Data<AppState>,
    payload: web::Json<RefreshRequest>,
) -> Result<HttpResponse, ApiError> {
    let claims = verify_token(&payload.refresh_token, &refresh_secret()?)?;

    let user = crate::db::get_user_by_id(&state.pool, claims.sub)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let user = ensure_admin_role(&state, user).await?;
    let (access_token, refresh_token) = create_tokens(&user)?;

    Ok(HttpResponse::Ok().json(AuthResponse {
        user,
        access_token,
        refresh_token,
    }))
}

#[post("/forgot-password")]
pub async fn forgot_password(
    state: web::Data<AppState>,
    payload: web::Json<ForgotPasswordRequest>,
) -> Result<HttpResponse, ApiError> {
    let email = payload.email.trim().to_lowercase();

    let row = sqlx::query("SELECT id, role FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&state.pool)
        .await?;

    // Same response whether or not the account exists.
    if let Some(row) = row {
        let token = sign_token(
            row.get("id"),
            row.get("role"),
            &jwt_secret()?,
            Duration::hours(RESET_TOKEN_TTL_HOURS),
        )?;
        send_password_reset_email(&state.config, &email, &token).await?;
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "If the email exists, a reset link has been sent."
    })))
}

#[post("/reset-password")]
pub async fn reset_password(
    state: web::Data<AppState>,
    payload: web::Json<ResetPasswordRequest>,
) -> Result<HttpResponse, ApiError> {
    if payload.password.len() < 8 {
        return Err(ApiError::Validation(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    let claims = verify_token(&payload.token, &jwt_secret()?)?;

    let password_hash = hash(&payload.password, DEFAULT_COST)?;
    let updated = sqlx::query(
        "UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2",
    )
    .bind(&password_hash)
    .bind(claims.sub)
    .execute(&state.pool)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Password updated successfully"
    })))
}

/// Emails on the `ADMIN_EMAILS` allowlist are promoted on login/register.
async fn ensure_admin_role(state: &AppState, user: User) -> Result<User, ApiError> {
    if user.role != "ADMIN" && state.config.is_admin_email(&user.email) {
        let promoted = sqlx::query_as::<_, User>(&format!(
            r#"UPDATE users SET role = 'ADMIN', updated_at = NOW()
               WHERE id = $1
               RETURNING {USER_COLUMNS}"#
        ))
        .bind(user.id)
        .fetch_one(&state.pool)
        .await?;
        return Ok(promoted);
    }
    Ok(user)
}

async fn generate_referral_code(pool: &PgPool) -> Result<String, ApiError> {
    loop {
        let candidate = Uuid::new_v4().simple().to_string()[..10].to_uppercase();
        let taken = sqlx::query("SELECT id FROM users WHERE referral_code = $1")
            .bind(&candidate)
            .fetch_optional(pool)
            .await?;
        if taken.is_none() {
            return Ok(candidate);
        }
    }
}

fn jwt_secret() -> Result<String, ApiError> {
    std::env::var("JWT_SECRET").map_err(|_| ApiError::Internal("JWT_SECRET not set".to_string()))
}

fn refresh_secret() -> Result<String, ApiError> {
    std::env::var("REFRESH_SECRET")
        .map_err(|_| ApiError::Internal("REFRESH_SECRET not set".to_string()))
}

fn create_tokens(user: &User) -> Result<(String, String), ApiError> {
    let access = sign_token(
        user.id,
        user.role.clone(),
        &jwt_secret()?,
        Duration::minutes(ACCESS_TOKEN_TTL_MINUTES),
    )?;
    let refresh_tok = sign_token(
        user.id,
        user.role.clone(),
        &refresh_secret()?,
        Duration::days(REFRESH_TOKEN_TTL_DAYS),
    )?;
    Ok((access, refresh_tok))
}

pub fn sign_token(
    user_id: i32,
    role: String,
    secret: &str,
    ttl: Duration,
) -> Result<String, ApiError> {
    let exp = Utc::now()
        .checked_add_signed(ttl)
        .expect("valid timestamp")
        .timestamp() as usize;

    let claims = Claims {
        sub: user_id,
        role,
        exp,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
    .map_err(|e| ApiError::Internal(format!("jwt encode error: {e}")))
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, ApiError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| ApiError::Unauthorized("Invalid or expired token".to_string()))
}

/// Middleware that:
/// - takes `Authorization: Bearer <jwt>`
/// - validates the access token
/// - puts an `AuthUser` into `req.extensions_mut()`
pub struct JwtMiddleware;

impl<S, B> Transform<S, ServiceRequest> for JwtMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = JwtMiddlewareInner<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtMiddlewareInner { service }))
    }
}

pub struct JwtMiddlewareInner<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareInner<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let secret = match std::env::var("JWT_SECRET") {
            Ok(s) => s,
            Err(_) => {
                return Box::pin(async move {
                    Err(ApiError::Internal("JWT_SECRET not set".to_string()).into())
                })
            }
        };

        let auth_header = req
            .headers()
            .get(actix_web::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .unwrap_or("");

        if let Some(token) = auth_header.strip_prefix("Bearer ") {
            match verify_token(token, &secret) {
                Ok(claims) => {
                    req.extensions_mut().insert(AuthUser {
                        id: claims.sub,
                        role: claims.role,
                    });
                    let fut = self.service.call(req);
                    return Box::pin(async move { fut.await });
                }
                Err(e) => return Box::pin(async move { Err(e.into()) }),
            }
        }

        Box::pin(async move {
            Err(ApiError::Unauthorized("Authentication required".to_string()).into())
        })
    }
}

/// Rejects requests whose `AuthUser` (set by `JwtMiddleware`) is not ADMIN.
pub struct AdminGuard;

impl<S, B> Transform<S, ServiceRequest> for AdminGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AdminGuardInner<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AdminGuardInner { service }))
    }
}

pub struct AdminGuardInner<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for AdminGuardInner<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let is_admin = req
            .extensions()
            .get::<AuthUser>()
            .map(|user| user.role == "ADMIN")
            .unwrap_or(false);

        if is_admin {
            let fut = self.service.call(req);
            return Box::pin(async move { fut.await });
        }

        Box::pin(async move {
            Err(ApiError::Forbidden("Admin privileges required".to_string()).into())
        })
    }
}
