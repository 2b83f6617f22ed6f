// src/referral.rs
//
// Commission ledger: awards referral commissions and tracks withdrawable
// balances. All multi-row mutations run inside a single database
// transaction; Postgres row locks are the only serialization mechanism.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgPool, Row};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::models::Transaction;

/// One referral row joined with the referee's identity, as returned by
/// `get_referral_stats`.
#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReferralEntry {
    pub id: i32,
    pub referee_email: String,
    pub referee_name: String,
    pub commission_amount: Decimal,
    pub paid: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReferralStats {
    pub total_earned: Decimal,
    pub available_balance: Decimal,
    pub pending_withdrawals: Decimal,
    pub referrals: Vec<ReferralEntry>,
}

/// Balance a user may still withdraw: current ledger balance minus the
/// payouts already requested but not yet approved, floored at zero.
pub fn available_balance(balance: Decimal, pending_withdrawals: Decimal) -> Decimal {
    (balance - pending_withdrawals).max(Decimal::ZERO)
}

/// Credits `amount` to `referrer_id` for revenue generated by `referee_id`.
///
/// Runs as one transaction: the referral row is upserted (created with the
/// amount, or incremented, with `paid` reset to false), the referrer's
/// balance is incremented, and a succeeded commission transaction is
/// recorded. Either all three writes commit or none do.
pub async fn award_commission(
    pool: &PgPool,
    referrer_id: i32,
    referee_id: i32,
    amount: Decimal,
    currency: &str,
    provider_id: Option<String>,
) -> Result<(), ApiError> {
    if amount <= Decimal::ZERO {
        return Err(ApiError::Validation(
            "Commission amount must be greater than zero".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;

    for (user_id, label) in [(referrer_id, "Referrer"), (referee_id, "Referee")] {
        let exists = sqlx::query("SELECT id FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(ApiError::NotFound(format!("{label} not found")));
        }
    }

    sqlx::query(
        r#"INSERT INTO referrals (referrer_id, referee_id, commission_amount, paid)
           VALUES ($1, $2, $3, FALSE)
           ON CONFLICT (referee_id)
           DO UPDATE SET commission_amount = referrals.commission_amount + EXCLUDED.commission_amount,
                         paid = FALSE"#,
    )
    .bind(referrer_id)
    .bind(referee_id)
    .bind(amount)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"UPDATE users
           SET balance_commission = balance_commission + $1, updated_at = NOW()
           WHERE id = $2"#,
    )
    .bind(amount)
    .bind(referrer_id)
    .execute(&mut *tx)
    .await?;

    let provider_id = provider_id.unwrap_or_else(|| format!("commission-{referee_id}"));

    sqlx::query(
        r#"INSERT INTO transactions (user_id, type, amount, currency, provider, provider_id, status)
           VALUES ($1, 'commission', $2, $3, 'system', $4, 'succeeded')"#,
    )
    .bind(referrer_id)
    .bind(amount)
    .bind(currency.to_uppercase())
    .bind(&provider_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

/// Lifetime earnings, pending withdrawals and the current referral list
/// for `user_id`. `total_earned` is the sum over all referral rows and is
/// independent of payouts.
pub async fn get_referral_stats(pool: &PgPool, user_id: i32) -> Result<ReferralStats, ApiError> {
    let balance: Decimal = sqlx::query("SELECT balance_commission FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?
        .get("balance_commission");

    let referrals = sqlx::query_as::<_, ReferralEntry>(
        r#"SELECT r.id, u.email AS referee_email, u.name AS referee_name,
                  r.commission_amount, r.paid, r.created_at
           FROM referrals r
           JOIN users u ON u.id = r.referee_id
           WHERE r.referrer_id = $1
           ORDER BY r.created_at DESC"#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let pending_withdrawals = pending_payout_total(pool, user_id).await?;
    let total_earned: Decimal = referrals.iter().map(|r| r.commission_amount).sum();

    Ok(ReferralStats {
        total_earned,
        available_balance: available_balance(balance, pending_withdrawals),
        pending_withdrawals,
        referrals,
    })
}

/// Creates a pending payout transaction for `amount` if the user's balance
/// minus already-pending payouts covers it.
///
/// The balance check and the insert are two round trips, not one
/// transaction; two concurrent requests can both pass the check, so the
/// pending total may transiently exceed the balance. No money moves here:
/// `approve_withdrawal` re-checks the balance before debiting.
pub async fn request_withdrawal(
    pool: &PgPool,
    user_id: i32,
    amount: Decimal,
    currency: &str,
) -> Result<Transaction, ApiError> {
    if amount <= Decimal::ZERO {
        return Err(ApiError::Validation(
            "Withdrawal amount must be greater than zero".to_string(),
        ));
    }

    let balance: Decimal = sqlx::query("SELECT balance_commission FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?
        .get("balance_commission");

    let pending = pending_payout_total(pool, user_id).await?;

    if balance - pending < amount {
        return Err(ApiError::InsufficientBalance);
    }

    let transaction = sqlx::query_as::<_, Transaction>(
        r#"INSERT INTO transactions (user_id, type, amount, currency, provider, status)
           VALUES ($1, 'payout', $2, $3, 'internal', 'pending')
           RETURNING id, user_id, type, amount, currency, provider, provider_id, status,
                     created_at, updated_at"#,
    )
    .bind(user_id)
    .bind(amount)
    .bind(currency.to_uppercase())
    .fetch_one(pool)
    .await?;

    Ok(transaction)
}

/// Settles a pending payout: debits the owner's balance and flips the
/// transaction to succeeded, stamping the approving admin's id into
/// `provider_id`. This is the only path that debits the ledger.
pub async fn approve_withdrawal(
    pool: &PgPool,
    transaction_id: i32,
    admin_id: i32,
) -> Result<(), ApiError> {
    let payout = sqlx::query(
        r#"SELECT user_id, type, amount, status FROM transactions WHERE id = $1"#,
    )
    .bind(transaction_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::NotFound("Transaction not found".to_string()))?;

    let tx_type: String = payout.get("type");
    let status: String = payout.get("status");
    if tx_type != "payout" || status != "pending" {
        return Err(ApiError::InvalidState(
            "Only pending payout transactions can be approved".to_string(),
        ));
    }

    let user_id: i32 = payout.get("user_id");
    let amount: Decimal = payout.get("amount");

    let mut tx = pool.begin().await?;

    // Row lock so a concurrent approval of another payout for the same user
    // sees the debited balance, not a stale read.
    let balance: Decimal =
        sqlx::query("SELECT balance_commission FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found for payout".to_string()))?
            .get("balance_commission");

    if balance < amount {
        return Err(ApiError::InsufficientBalance);
    }

    sqlx::query(
        r#"UPDATE users
           SET balance_commission = balance_commission - $1, updated_at = NOW()
           WHERE id = $2"#,
    )
    .bind(amount)
    .bind(user_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"UPDATE transactions
           SET status = 'succeeded', provider_id = $1, updated_at = NOW()
           WHERE id = $2"#,
    )
    .bind(admin_id.to_string())
    .bind(transaction_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

async fn pending_payout_total(pool: &PgPool, user_id: i32) -> Result<Decimal, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT COALESCE(SUM(amount), 0) AS total
           FROM transactions
           WHERE user_id = $1 AND type = 'payout' AND status = 'pending'"#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(row.get("total"))
}
