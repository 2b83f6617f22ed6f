pub mod admin;
pub mod auth;
pub mod pronos;
pub mod referrals;
pub mod subscriptions;
pub mod transactions;
pub mod users;
