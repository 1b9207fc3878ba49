//! # Tasktweet
//!
//! HTTP service that posts completed Notion tasks to X as a tweet or thread.
//!
//! ## Environment Variables
//!
//! See [`tasktweet::Settings::from_env`] for the full list. The most important are:
//! - `NOTION_API_KEY`, `NOTION_PAGE_ID`: Notion integration token and default page
//! - `xapi_access_token`, `xapi_refresh_token`, `xapi_client_id`, `xapi_client_secret`
//! - `GEMINI_API_KEY`: Gemini API key
//! - `EMAIL_API_KEY`, `EMAIL_FROM`, `ERROR_NOTIFICATION_EMAIL`: operator mail
//! - `PORT`: Server port (defaults to 3000)

use axum::{
    http::{header, HeaderValue},
    routing::get,
    Router,
};
use log::{error, info};
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use tasktweet::{
    get_server_port, handle_automate_get, handle_automate_post, handle_health, handle_root,
    handle_status, start_automation_cronjob, AppState, Settings,
};

/// Main entry point for the tasktweet web service.
///
/// Initializes logging, loads the configuration, optionally starts the cron
/// scheduler and the startup notification, then serves HTTP until Ctrl+C.
///
/// # Example Usage
///
/// ```bash
/// # Run with default port 3000
/// cargo run
///
/// # Run with debug logging
/// RUST_LOG=debug cargo run
/// ```
///
/// # Panics
///
/// This function will panic if the server port cannot be bound.
#[tokio::main]
async fn main() {
    env_logger::init();

    let settings = Settings::from_env();
    let schedule = settings.automation_schedule.clone();
    let send_startup = settings.send_startup_notification;
    let state = AppState::new(settings);

    if send_startup {
        let state = state.clone();
        tokio::spawn(async move {
            match state.automation().await {
                Ok(automation) => automation.notifier().send_startup_notification().await,
                Err(e) => error!("Skipping startup notification: {}", e),
            }
        });
    }

    let mut scheduler = None;
    if let Some(schedule) = schedule {
        match start_automation_cronjob(state.clone(), &schedule).await {
            Ok(sched) => match sched.start().await {
                Ok(()) => {
                    info!("Automation cronjob started");
                    scheduler = Some(sched);
                }
                Err(e) => error!("Failed to start cronjob scheduler: {}", e),
            },
            Err(e) => error!("Failed to create cronjob scheduler: {}", e),
        }
    }

    let app = Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/automate", get(handle_automate_get).post(handle_automate_post))
        .route("/status", get(handle_status))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(SetResponseHeaderLayer::overriding(
                    header::X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                )),
        )
        .with_state(state);

    let port = get_server_port();
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    info!("Starting tasktweet server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("HTTP server error: {}", e);
    }

    if let Some(mut sched) = scheduler {
        if let Err(e) = sched.shutdown().await {
            error!("Failed to stop cronjob scheduler: {}", e);
        }
    }
    info!("Server stopped");
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }
}
