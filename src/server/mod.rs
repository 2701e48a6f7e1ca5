//! Contact backend: HTTP routes over the flat-file message store.

mod error;
mod handlers;
mod rate_limit;

pub use error::AppError;
pub use rate_limit::{client_ip, ClientIp, RateDecision, RateLimiter, RATE_LIMIT_REMAINING_HEADER};

use crate::config::Config;
use crate::contact::{CaptchaStore, MessageStore};
use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::warn;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub messages: Arc<MessageStore>,
    pub captchas: CaptchaStore,
    pub limiter: Arc<RateLimiter>,
}

pub fn create_app_state(config: Config) -> AppState {
    AppState {
        messages: Arc::new(MessageStore::new(&config.messages_file)),
        captchas: CaptchaStore::new(config.captcha_ttl),
        limiter: Arc::new(RateLimiter::new(
            config.rate_limit_max,
            config.rate_limit_window,
        )),
        config: Arc::new(config),
    }
}

pub fn create_router(state: AppState) -> Router {
    // Only submissions are limited
    let contact = Router::new()
        .route("/api/contact", post(handlers::submit_contact))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::rate_limit,
        ));

    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/captcha", get(handlers::issue_captcha))
        .route(
            "/api/admin/messages",
            get(handlers::list_messages).delete(handlers::clear_messages),
        )
        .route("/api/admin/messages/:id/read", post(handlers::mark_read))
        .merge(contact)
        .nest_service("/assets", ServeDir::new(&state.config.assets_dir))
        .layer(cors_layer(&state.config.site_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(site_origin: &str) -> CorsLayer {
    let origin = match HeaderValue::from_str(site_origin) {
        Ok(origin) => AllowOrigin::exact(origin),
        Err(_) => {
            warn!("SITE_ORIGIN {:?} is not a valid header value, allowing any origin", site_origin);
            AllowOrigin::any()
        }
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
}
