// src/main.rs
use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use dotenvy::dotenv;
use sqlx::PgPool;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use fixedpronos_api::api::auth::{AdminGuard, JwtMiddleware};
use fixedpronos_api::config::AppConfig;
use fixedpronos_api::{api, docs, AppState};

async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = AppConfig::from_env();

    let pool = PgPool::connect(&config.database_url)
        .await
        .expect("Failed to connect to DB");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let port = config.port;
    let state = web::Data::new(AppState { pool, config });

    log::info!("FixedPronos API ready on port {port}");

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .route("/health", web::get().to(health))
            .service(
                SwaggerUi::new("/docs/{_:.*}")
                    .url("/api-docs/openapi.json", docs::ApiDoc::openapi()),
            )
            // Public auth routes
            .service(
                web::scope("/auth")
                    .service(api::auth::register)
                    .service(api::auth::login)
                    .service(api::auth::refresh)
                    .service(api::auth::forgot_password)
                    .service(api::auth::reset_password),
            )
            // Published tips are public
            .service(
                web::scope("/pronos")
                    .service(api::pronos::today)
                    .service(api::pronos::yesterday)
                    .service(api::pronos::before_yesterday)
                    .service(api::pronos::get_prono),
            )
            // Admin surface
            .service(
                web::scope("/admin")
                    .wrap(AdminGuard)
                    .wrap(JwtMiddleware)
                    .service(api::admin::list_users)
                    .service(api::admin::stats)
                    .service(api::transactions::all_transactions)
                    .service(api::transactions::approve_payout)
                    .service(api::subscriptions::list_subscriptions)
                    .service(api::subscriptions::create_subscription)
                    .service(api::subscriptions::update_subscription)
                    .service(api::subscriptions::delete_subscription)
                    .service(api::referrals::award_commission)
                    .service(api::pronos::create_prono)
                    .service(api::pronos::update_prono)
                    .service(api::pronos::delete_prono),
            )
            // Authenticated user routes
            .service(
                web::scope("")
                    .wrap(JwtMiddleware)
                    .service(api::users::get_profile)
                    .service(api::users::update_profile)
                    .service(api::subscriptions::subscription_status)
                    .service(api::referrals::referral_stats)
                    .service(api::referrals::withdraw)
                    .service(api::transactions::my_transactions),
            )
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
