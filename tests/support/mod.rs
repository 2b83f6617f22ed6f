use rust_decimal::Decimal;
use sqlx::{PgPool, Row};
use std::env;
use std::str::FromStr;
use std::sync::OnceLock;
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use fixedpronos_api::config::AppConfig;
use fixedpronos_api::AppState;

fn split_db_url(url: &str) -> Result<(String, String), String> {
    let (base, query) = match url.split_once('?') {
        Some((base, query)) => (base.to_string(), Some(query)),
        None => (url.to_string(), None),
    };

    let db_start = base
        .rfind('/')
        .ok_or_else(|| "invalid database url".to_string())?;
    if db_start + 1 >= base.len() {
        return Err("database name is empty".to_string());
    }

    let db_name = base[db_start + 1..].to_string();
    let mut admin_url = format!("{}postgres", &base[..db_start + 1]);
    if let Some(query) = query {
        admin_url = format!("{admin_url}?{query}");
    }

    Ok((admin_url, db_name))
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

static TEST_DB_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

pub struct TestDb {
    pub pool: PgPool,
    _guard: MutexGuard<'static, ()>,
}

pub async fn init_test_db() -> TestDb {
    dotenvy::dotenv().ok();
    env::set_var("JWT_SECRET", "test_jwt_secret_0123456789");
    env::set_var("REFRESH_SECRET", "test_refresh_secret_0123456789");

    let test_url = env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");
    let (admin_url, db_name) = split_db_url(&test_url).expect("invalid TEST_DATABASE_URL format");

    let lock = TEST_DB_LOCK.get_or_init(|| Mutex::new(()));
    let guard = lock.lock().await;

    let admin_pool = PgPool::connect(&admin_url).await.expect("connect admin db");

    let _ = sqlx::query("SELECT pg_advisory_lock(424242)")
        .execute(&admin_pool)
        .await;

    let quoted_name = quote_identifier(&db_name);
    let drop_sql = format!("DROP DATABASE IF EXISTS {quoted_name} WITH (FORCE)");
    let create_sql = format!("CREATE DATABASE {quoted_name}");

    let _ = sqlx::query(&drop_sql).execute(&admin_pool).await;
    let create_result = sqlx::query(&create_sql).execute(&admin_pool).await;
    if let Err(e) = create_result {
        eprintln!("create test db error: {e}");
        let _ = sqlx::query(&drop_sql).execute(&admin_pool).await;
        sqlx::query(&create_sql)
            .execute(&admin_pool)
            .await
            .expect("create test db retry");
    }

    let _ = sqlx::query("SELECT pg_advisory_unlock(424242)")
        .execute(&admin_pool)
        .await;

    admin_pool.close().await;

    let pool = PgPool::connect(&test_url).await.expect("connect test db");
    sqlx::migrate!().run(&pool).await.expect("migrations");
    TestDb {
        pool,
        _guard: guard,
    }
}

pub fn build_state(pool: PgPool) -> AppState {
    AppState {
        pool,
        config: AppConfig {
            port: 0,
            database_url: String::new(),
            app_url: "http://localhost:5173".to_string(),
            admin_emails: vec![],
            commission_rate: Decimal::from_str("0.30").expect("rate"),
            smtp_host: "smtp.test".to_string(),
            smtp_user: "user".to_string(),
            smtp_pass: "pass".to_string(),
            email_from: "no-reply@fixedpronos.test".to_string(),
        },
    }
}

/// Inserts a user with a unique email/referral code and the given balance.
pub async fn insert_user(pool: &PgPool, name: &str, balance: Decimal) -> i32 {
    let suffix = Uuid::new_v4().simple().to_string();
    insert_user_with_email(pool, &format!("{name}_{suffix}@fixedpronos.test"), name, balance).await
}

pub async fn insert_user_with_email(
    pool: &PgPool,
    email: &str,
    name: &str,
    balance: Decimal,
) -> i32 {
    let code = Uuid::new_v4().simple().to_string()[..10].to_uppercase();

    sqlx::query(
        r#"INSERT INTO users (email, password_hash, name, referral_code, balance_commission)
           VALUES ($1, 'test-hash', $2, $3, $4)
           RETURNING id"#,
    )
    .bind(email)
    .bind(name)
    .bind(code)
    .bind(balance)
    .fetch_one(pool)
    .await
    .expect("insert user")
    .get("id")
}

pub async fn insert_admin(pool: &PgPool, name: &str) -> i32 {
    let id = insert_user(pool, name, Decimal::ZERO).await;
    sqlx::query("UPDATE users SET role = 'ADMIN' WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .expect("promote admin");
    id
}

/// Inserts a pending payout directly, bypassing the balance check.
pub async fn insert_pending_payout(pool: &PgPool, user_id: i32, amount: Decimal) -> i32 {
    sqlx::query(
        r#"INSERT INTO transactions (user_id, type, amount, currency, provider, status)
           VALUES ($1, 'payout', $2, 'EUR', 'internal', 'pending')
           RETURNING id"#,
    )
    .bind(user_id)
    .bind(amount)
    .fetch_one(pool)
    .await
    .expect("insert payout")
    .get("id")
}

pub fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).expect("decimal literal")
}
