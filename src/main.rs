// src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, patch, post},
    Router,
};
use tokio::net::TcpListener;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::AppState;
use crate::middleware::{auth::auth_guard, rate_limit::rate_limit_guard};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_target(false).compact().init();

    // If configuration or the database is broken, refuse to start.
    let app_state = AppState::new()
        .await
        .expect("failed to initialize application state");

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("failed to run database migrations");

    tracing::info!("database migrations applied");

    app_state
        .bootstrap_admin()
        .await
        .expect("failed to bootstrap the initial superadmin");

    // Public: lead submission (rate limited) and the payment webhook.
    let public_routes = Router::new()
        .route("/leads", post(handlers::leads::submit_lead))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            rate_limit_guard,
        ))
        .route("/webhooks/payment", post(handlers::payments::payment_webhook));

    // Login is public; /me requires a resolved operator.
    let auth_routes = Router::new()
        .route("/login", post(handlers::auth::login))
        .merge(
            Router::new()
                .route("/me", get(handlers::auth::get_me))
                .layer(axum_middleware::from_fn_with_state(
                    app_state.clone(),
                    auth_guard,
                )),
        );

    // Everything past this guard has a resolved, active operator attached.
    let crm_routes = Router::new()
        .route("/leads", get(handlers::leads::list_leads))
        .route("/leads/{id}", get(handlers::leads::get_lead))
        .route("/leads/{id}/status", patch(handlers::leads::update_status))
        .route("/leads/{id}/assignment", patch(handlers::leads::assign_lead))
        .route("/leads/{id}/events", get(handlers::leads::list_lead_events))
        .route("/leads/{id}/amount", patch(handlers::payments::set_amount))
        .route("/leads/{id}/checkout", post(handlers::payments::create_checkout))
        .route("/admins", get(handlers::admins::list_admins))
        .route("/admins/{id}/active", patch(handlers::admins::set_admin_active))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api", public_routes)
        .nest("/api/auth", auth_routes)
        .nest("/api/crm", crm_routes)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", docs::ApiDoc::openapi()))
        .with_state(app_state.clone());

    let addr = format!("0.0.0.0:{}", app_state.port);
    let listener = TcpListener::bind(&addr)
        .await
        .expect("failed to bind TCP listener");
    tracing::info!("server listening on {}", addr);
    axum::serve(listener, app).await.expect("axum server error");
}
