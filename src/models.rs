// src/models.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

/// A user as exposed through the API. The password hash never leaves the
/// auth queries, so it is not part of this struct.
#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i32,
    pub email: String,
    pub name: String,
    pub role: String, // USER | ADMIN
    pub referral_code: String,
    pub referred_by_id: Option<i32>,
    pub balance_commission: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Referral {
    pub id: i32,
    pub referrer_id: i32,
    pub referee_id: i32,
    pub commission_amount: Decimal,
    pub paid: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: i32,
    pub user_id: i32,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub tx_type: String, // payment | refund | commission | payout
    pub amount: Decimal,
    pub currency: String,
    pub provider: String,
    pub provider_id: Option<String>,
    pub status: String, // pending | succeeded | failed
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: i32,
    pub user_id: i32,
    pub plan: String,
    pub status: String, // active | paused | canceled | expired
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    pub reference: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Prono {
    pub id: i32,
    pub title: String,
    pub sport: String,
    pub competition: String,
    pub match_time: DateTime<Utc>,
    pub tip: String,
    pub odd: Decimal,
    pub confidence: i32,
    pub content: String,
    pub result: String, // won | lost | pending
    pub status: String, // draft | published
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Short user identity attached to admin listings.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserRef {
    pub id: i32,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionWithUser {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub user: UserRef,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubscriptionWithUser {
    #[serde(flatten)]
    pub subscription: Subscription,
    pub user: UserRef,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub total_users: i64,
    pub active_subscriptions: i64,
    pub total_revenue: Decimal,
    pub total_commissions: Decimal,
}
