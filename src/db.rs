// src/db.rs

use chrono::{DateTime, Duration, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{
    AdminStats, Prono, Subscription, SubscriptionWithUser, Transaction, TransactionWithUser, User,
    UserRef,
};

pub(crate) const USER_COLUMNS: &str = "id, email, name, role, referral_code, referred_by_id, \
                                       balance_commission, created_at, updated_at";

pub async fn get_user_by_id(pool: &PgPool, id: i32) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list_users(pool: &PgPool) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
    ))
    .fetch_all(pool)
    .await
}

pub async fn admin_stats(pool: &PgPool) -> Result<AdminStats, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT
               (SELECT COUNT(*) FROM users) AS total_users,
               (SELECT COUNT(*) FROM subscriptions
                WHERE status = 'active' AND current_period_end > NOW()) AS active_subscriptions,
               (SELECT COALESCE(SUM(amount), 0) FROM transactions
                WHERE type = 'payment' AND status = 'succeeded') AS total_revenue,
               (SELECT COALESCE(SUM(amount), 0) FROM transactions
                WHERE type = 'commission' AND status = 'succeeded') AS total_commissions"#,
    )
    .fetch_one(pool)
    .await?;

    Ok(AdminStats {
        total_users: row.get("total_users"),
        active_subscriptions: row.get("active_subscriptions"),
        total_revenue: row.get("total_revenue"),
        total_commissions: row.get("total_commissions"),
    })
}

/// Most recent subscription for the user, by period end.
pub async fn latest_subscription(
    pool: &PgPool,
    user_id: i32,
) -> Result<Option<Subscription>, sqlx::Error> {
    sqlx::query_as::<_, Subscription>(
        r#"SELECT id, user_id, plan, status, current_period_start, current_period_end,
                  reference, created_at, updated_at
           FROM subscriptions
           WHERE user_id = $1
           ORDER BY current_period_end DESC
           LIMIT 1"#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub async fn get_subscription(
    pool: &PgPool,
    id: i32,
) -> Result<Option<Subscription>, sqlx::Error> {
    sqlx::query_as::<_, Subscription>(
        r#"SELECT id, user_id, plan, status, current_period_start, current_period_end,
                  reference, created_at, updated_at
           FROM subscriptions
           WHERE id = $1"#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn list_all_subscriptions(pool: &PgPool) -> Result<Vec<SubscriptionWithUser>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT s.id, s.user_id, s.plan, s.status, s.current_period_start,
                  s.current_period_end, s.reference, s.created_at, s.updated_at,
                  u.email, u.name
           FROM subscriptions s
           JOIN users u ON u.id = s.user_id
           ORDER BY s.current_period_end DESC"#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| SubscriptionWithUser {
            subscription: Subscription {
                id: r.get("id"),
                user_id: r.get("user_id"),
                plan: r.get("plan"),
                status: r.get("status"),
                current_period_start: r.get("current_period_start"),
                current_period_end: r.get("current_period_end"),
                reference: r.get("reference"),
                created_at: r.get("created_at"),
                updated_at: r.get("updated_at"),
            },
            user: UserRef {
                id: r.get("user_id"),
                email: r.get("email"),
                name: r.get("name"),
            },
        })
        .collect())
}

pub async fn create_manual_subscription(
    pool: &PgPool,
    user_id: i32,
    plan: &str,
    status: &str,
    current_period_start: DateTime<Utc>,
    current_period_end: DateTime<Utc>,
) -> Result<Subscription, sqlx::Error> {
    let reference = format!("manual_{}", Uuid::new_v4().simple());

    sqlx::query_as::<_, Subscription>(
        r#"INSERT INTO subscriptions (user_id, plan, status, current_period_start, current_period_end, reference)
           VALUES ($1, $2, $3, $4, $5, $6)
           RETURNING id, user_id, plan, status, current_period_start, current_period_end,
                     reference, created_at, updated_at"#,
    )
    .bind(user_id)
    .bind(plan)
    .bind(status)
    .bind(current_period_start)
    .bind(current_period_end)
    .bind(reference)
    .fetch_one(pool)
    .await
}

pub async fn update_manual_subscription(
    pool: &PgPool,
    id: i32,
    plan: Option<&str>,
    status: Option<&str>,
    current_period_start: Option<DateTime<Utc>>,
    current_period_end: Option<DateTime<Utc>>,
) -> Result<Subscription, sqlx::Error> {
    sqlx::query_as::<_, Subscription>(
        r#"UPDATE subscriptions
           SET plan = COALESCE($2, plan),
               status = COALESCE($3, status),
               current_period_start = COALESCE($4, current_period_start),
               current_period_end = COALESCE($5, current_period_end),
               updated_at = NOW()
           WHERE id = $1
           RETURNING id, user_id, plan, status, current_period_start, current_period_end,
                     reference, created_at, updated_at"#,
    )
    .bind(id)
    .bind(plan)
    .bind(status)
    .bind(current_period_start)
    .bind(current_period_end)
    .fetch_one(pool)
    .await
}

pub async fn delete_subscription(pool: &PgPool, id: i32) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM subscriptions WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn list_user_transactions(
    pool: &PgPool,
    user_id: i32,
) -> Result<Vec<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(
        r#"SELECT id, user_id, type, amount, currency, provider, provider_id, status,
                  created_at, updated_at
           FROM transactions
           WHERE user_id = $1
           ORDER BY created_at DESC"#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn list_all_transactions(pool: &PgPool) -> Result<Vec<TransactionWithUser>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT t.id, t.user_id, t.type, t.amount, t.currency, t.provider, t.provider_id,
                  t.status, t.created_at, t.updated_at,
                  u.email, u.name
           FROM transactions t
           JOIN users u ON u.id = t.user_id
           ORDER BY t.created_at DESC"#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| TransactionWithUser {
            transaction: Transaction {
                id: r.get("id"),
                user_id: r.get("user_id"),
                tx_type: r.get("type"),
                amount: r.get("amount"),
                currency: r.get("currency"),
                provider: r.get("provider"),
                provider_id: r.get("provider_id"),
                status: r.get("status"),
                created_at: r.get("created_at"),
                updated_at: r.get("updated_at"),
            },
            user: UserRef {
                id: r.get("user_id"),
                email: r.get("email"),
                name: r.get("name"),
            },
        })
        .collect())
}

/// Published pronos whose match falls on the day `offset` days from today
/// (0 = today, -1 = yesterday), ordered by kick-off.
pub async fn list_pronos_by_day_offset(
    pool: &PgPool,
    offset: i64,
) -> Result<Vec<Prono>, sqlx::Error> {
    let date = (Utc::now() + Duration::days(offset)).date_naive();
    let start = date.and_hms_opt(0, 0, 0).expect("valid time").and_utc();
    let end = date
        .and_hms_micro_opt(23, 59, 59, 999_999)
        .expect("valid time")
        .and_utc();

    sqlx::query_as::<_, Prono>(
        r#"SELECT id, title, sport, competition, match_time, tip, odd, confidence, content,
                  result, status, created_at, updated_at
           FROM pronos
           WHERE match_time >= $1 AND match_time <= $2 AND status = 'published'
           ORDER BY match_time ASC"#,
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await
}

pub async fn get_prono(pool: &PgPool, id: i32) -> Result<Option<Prono>, sqlx::Error> {
    sqlx::query_as::<_, Prono>(
        r#"SELECT id, title, sport, competition, match_time, tip, odd, confidence, content,
                  result, status, created_at, updated_at
           FROM pronos
           WHERE id = $1"#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}
