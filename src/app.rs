/*
 * Responsibility
 * - Config読み込み → 依存生成 (registry / JWKS / AuthGate) → Router 組み立て
 * - Middleware の適用 (security headers / CORS / request-id, trace, timeout)
 * - axum::serve() で起動
 */
use std::{panic, process, sync::Arc};

use anyhow::{Context, Result};
use axum::Router;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    api,
    config::Config,
    middleware,
    repos::PgUserRegistry,
    services::auth::build_auth_gate,
    state::{AppState, ServiceInfo},
};

const SERVICE_NAME: &str = "broker";

fn init_tracing() {
    // RUST_LOG wins when set, e.g.
    // RUST_LOG=info,release_broker=debug,tower_http=debug cargo run
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
        tracing::error!(?info, "panic");

        // development: crash so it gets noticed. production: default hook, keep serving.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env().context("load configuration")?;
    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting {} in {:?} mode on {} (project {})",
        SERVICE_NAME,
        config.app_env,
        config.addr,
        config.auth_project
    );

    let state = build_state(&config)?;
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("bind {}", config.addr))?;
    axum::serve(listener, app).await.context("serve")?;
    Ok(())
}

fn build_state(config: &Config) -> Result<AppState> {
    let registry =
        PgUserRegistry::connect_lazy(&config.database_url, config.registry_max_connections)
            .context("user registry pool")?;
    let gate = build_auth_gate(config, Arc::new(registry)).context("auth gate")?;

    Ok(AppState::new(
        gate,
        ServiceInfo {
            name: SERVICE_NAME,
            env: config.deploy_env.clone(),
            version: config.version.clone(),
        },
    ))
}

fn build_router(state: AppState, config: &Config) -> Router {
    let router = api::router(&state).with_state(state);

    // 内側から: security headers → CORS → request-id / trace / limit / timeout
    let router = middleware::security_headers::apply(router);
    let router = middleware::cors::apply(router, config);
    middleware::http::apply(router, config)
}
