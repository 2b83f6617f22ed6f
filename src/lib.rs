pub mod api;
pub mod config;
pub mod db;
pub mod docs;
pub mod email;
pub mod error;
pub mod models;
pub mod referral;

use sqlx::PgPool;

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: AppConfig,
}
