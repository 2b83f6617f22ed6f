use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::auth::register,
        crate::api::auth::login,
        crate::api::referrals::referral_stats,
        crate::api::referrals::withdraw,
        crate::api::transactions::approve_payout,
        crate::api::pronos::today
    ),
    components(
        schemas(
            crate::api::auth::RegisterRequest,
            crate::api::auth::LoginRequest,
            crate::api::auth::AuthResponse,
            crate::api::referrals::WithdrawRequest,
            crate::api::referrals::AwardCommissionRequest,
            crate::referral::ReferralStats,
            crate::referral::ReferralEntry,
            crate::models::User,
            crate::models::Transaction,
            crate::models::Subscription,
            crate::models::Prono
        )
    ),
    tags(
        (name = "auth", description = "Authentication"),
        (name = "pronos", description = "Published sports tips"),
        (name = "referrals", description = "Referral commissions and withdrawals"),
        (name = "admin", description = "Admin operations")
    )
)]
pub struct ApiDoc;
