mod handlers;
mod models;
mod rate_limit;
mod sessions;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use booking_wizard::alerts::AlertLayer;
use booking_wizard::{ApiClient, ApiConfig, CodeSender, DemoCodeSender};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use rate_limit::{rate_limit, RateLimiter, Tier};
use sessions::SessionStore;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub sessions: SessionStore,
    /// Guest client; handlers derive per-user clients from it.
    pub api: ApiClient,
    pub codes: Arc<dyn CodeSender>,
    pub started_at: Instant,
}

const RATE_LIMIT_CLEANUP_SECS: u64 = 300;
const SESSION_SWEEP_SECS: u64 = 60;
const DEFAULT_SESSION_IDLE_SECS: u64 = 7200;
const VITE_DEV_ORIGIN: &str = "http://localhost:5173";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // ── Tracing: console + optional operator alerts ──
    let env_filter = EnvFilter::from_default_env().add_directive("info".parse()?);
    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer());
    match AlertLayer::from_env("wizard-server") {
        Some(alerts) => registry.with(alerts).init(),
        None => registry.init(),
    }

    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".into());
    let webapp_url = std::env::var("WEBAPP_URL").ok().filter(|u| !u.is_empty());
    let session_idle = Duration::from_secs(
        std::env::var("SESSION_IDLE_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_SESSION_IDLE_SECS),
    );

    let config = ApiConfig::from_env();
    let api = ApiClient::new(&config)?;
    let codes: Arc<dyn CodeSender> = Arc::new(DemoCodeSender::new(
        config.demo_code.clone(),
        config.demo_code_delay,
    ));
    tracing::info!("Booking backend: {}", config.base_url);

    let state = Arc::new(AppState {
        sessions: SessionStore::new(),
        api,
        codes,
        started_at: Instant::now(),
    });

    // ── Background task: drop abandoned sessions ──
    let sweep_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(SESSION_SWEEP_SECS));
        loop {
            interval.tick().await;
            let dropped = sweep_state.sessions.sweep(session_idle, Instant::now());
            if dropped > 0 {
                tracing::info!("Dropped {} idle wizard session(s)", dropped);
            }
        }
    });

    // ── Rate limiter ──
    let rate_limiter = RateLimiter::new();
    let cleanup_limiter = rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(RATE_LIMIT_CLEANUP_SECS));
        loop {
            interval.tick().await;
            cleanup_limiter.cleanup();
        }
    });

    // ── CORS: whitelist WEBAPP_URL when configured, otherwise allow any ──
    let cors = match &webapp_url {
        Some(url) => {
            let origins = [url.as_str(), VITE_DEV_ORIGIN]
                .into_iter()
                .map(|o| o.parse::<axum::http::HeaderValue>())
                .collect::<Result<Vec<_>, _>>()?;
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        }
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    };

    let app = router(state, rate_limiter)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr = format!("{}:{}", host, port);
    tracing::info!("Booking wizard server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

fn router(state: Arc<AppState>, rate_limiter: RateLimiter) -> Router {
    let no_limit_routes = Router::new().route("/api/health", get(handlers::health::health));

    let session_routes = Router::new()
        .route("/api/wizard", post(handlers::wizard::open_session))
        .route(
            "/api/wizard/{id}",
            axum::routing::delete(handlers::wizard::close_session),
        )
        .layer(from_fn_with_state(
            (rate_limiter.clone(), Tier::Sessions),
            rate_limit,
        ));

    let action_routes = Router::new()
        .route("/api/wizard/{id}", get(handlers::wizard::get_session))
        .route(
            "/api/wizard/{id}/actions",
            post(handlers::wizard::post_action),
        )
        .layer(from_fn_with_state(
            (rate_limiter, Tier::Actions),
            rate_limit,
        ));

    Router::new()
        .merge(no_limit_routes)
        .merge(session_routes)
        .merge(action_routes)
        .with_state(state)
}
