/*
 * Responsibility
 * - Config 読み込み → 依存生成 (Authenticator / PermissionChecker) → Router 組み立て
 * - tracing / panic hook の初期化
 * - axum::serve() で起動
 */
use std::{panic, process};

use anyhow::Result;
use axum::{Router, routing::get};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::api::v1::handlers::health::health;
use crate::config::Config;
use crate::middleware::http::{self, HttpLimits};
use crate::services::auth::factory::build_authenticator;
use crate::services::policy::factory::build_permission_checker;
use crate::state::AppState;

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,keygate=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // Surface panics via tracing; stderr can be hidden depending on how the process runs.
        tracing::error!(?info, "panic");

        // Development: crash the whole process so we notice immediately.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;

    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        issuer = %config.auth_domain,
        policy_engine = %config.permify_endpoint,
        "starting keygate in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let state = build_state(&config).await?;
    let limits = HttpLimits {
        body_limit_bytes: config.body_limit_bytes,
        request_timeout: config.request_timeout,
    };
    let app = build_router(state, limits);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub async fn build_state(config: &Config) -> Result<AppState> {
    let authenticator = build_authenticator(config).await?;
    let permissions = build_permission_checker(config)?;

    Ok(AppState::new(authenticator, permissions))
}

pub fn build_router(state: AppState, limits: HttpLimits) -> Router {
    let router = Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api::v1::routes(&state));

    http::apply(router, limits)
}
