use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use dashmap::DashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::models::ApiResponse;

// ── Tiers ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Opening and closing sessions.
    Sessions,
    /// Reading views and posting actions.
    Actions,
}

impl Tier {
    pub fn config(self) -> RateLimitConfig {
        match self {
            Tier::Sessions => RateLimitConfig {
                max_requests: 20,
                window: Duration::from_secs(60),
            },
            Tier::Actions => RateLimitConfig {
                max_requests: 240,
                window: Duration::from_secs(60),
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
}

// ── Limiter ──

type Hits = DashMap<(Tier, IpAddr), Vec<Instant>>;

/// Sliding-window request counter per (tier, client IP).
#[derive(Debug, Clone, Default)]
pub struct RateLimiter {
    hits: Arc<Hits>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Err(retry_after_secs)` when `ip` has used up `tier`.
    pub fn check(&self, tier: Tier, ip: IpAddr) -> Result<(), u64> {
        self.check_with(tier, tier.config(), ip)
    }

    fn check_with(&self, tier: Tier, config: RateLimitConfig, ip: IpAddr) -> Result<(), u64> {
        let now = Instant::now();
        let mut stamps = self.hits.entry((tier, ip)).or_default();
        stamps.retain(|t| now.saturating_duration_since(*t) < config.window);

        if stamps.len() >= config.max_requests as usize {
            let retry_after = stamps
                .first()
                .map(|oldest| (*oldest + config.window).saturating_duration_since(now))
                .unwrap_or(config.window)
                .as_secs()
                .max(1);
            return Err(retry_after);
        }

        stamps.push(now);
        Ok(())
    }

    /// Drop entries with nothing inside twice their tier's window.
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.hits.retain(|(tier, _), stamps| {
            let cutoff = tier.config().window * 2;
            stamps.retain(|t| now.saturating_duration_since(*t) < cutoff);
            !stamps.is_empty()
        });
    }
}

// ── IP extraction ──

/// First hop of `X-Forwarded-For` when behind a proxy, else the socket peer.
pub fn extract_client_ip(req: &Request) -> IpAddr {
    let forwarded = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|ip| ip.trim().parse::<IpAddr>().ok());
    if let Some(ip) = forwarded {
        return ip;
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

fn too_many_requests(retry_after: u64) -> Response {
    let body = ApiResponse::<()>::error(format!(
        "Too many requests. Try again in {} seconds",
        retry_after
    ));
    (
        StatusCode::TOO_MANY_REQUESTS,
        [("Retry-After", retry_after.to_string())],
        Json(body),
    )
        .into_response()
}

// ── Middleware ──

pub async fn rate_limit(
    State((limiter, tier)): State<(RateLimiter, Tier)>,
    req: Request,
    next: Next,
) -> Result<Response, Response> {
    let ip = extract_client_ip(&req);
    limiter.check(tier, ip).map_err(|retry_after| {
        tracing::warn!("Rate limit hit: {:?} tier, ip {}", tier, ip);
        too_many_requests(retry_after)
    })?;
    Ok(next.run(req).await)
}
