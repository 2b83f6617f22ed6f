// Promotes an existing user to the ADMIN role.
//
// Usage: promote-admin <email>

use dotenvy::dotenv;
use sqlx::PgPool;
use std::env;

use fixedpronos_api::config::AppConfig;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let email = env::args()
        .nth(1)
        .expect("usage: promote-admin <email>")
        .trim()
        .to_lowercase();

    let config = AppConfig::from_env();
    let pool = PgPool::connect(&config.database_url)
        .await
        .expect("Failed to connect to DB");

    let result = sqlx::query("UPDATE users SET role = 'ADMIN', updated_at = NOW() WHERE email = $1")
        .bind(&email)
        .execute(&pool)
        .await
        .expect("promote query failed");

    if result.rows_affected() == 0 {
        log::error!("no user found with email {email}");
        std::process::exit(1);
    }

    log::info!("{email} promoted to ADMIN");
    Ok(())
}
