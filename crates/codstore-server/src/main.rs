mod api;
mod middleware;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, AppState},
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(codstore_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = codstore_db::PoolConfig::from_app_config(&config);
    let pool = codstore_db::connect_pool(&config.database_url, pool_config).await?;
    codstore_db::run_migrations(&pool).await?;

    let auth = AuthState::from_config(&config);
    let state = build_state(pool, Arc::clone(&config))?;
    let app = build_app(state, auth, &config);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Wires the optional outbound adapters from config. Missing credentials
/// disable the corresponding feature with a startup warning rather than
/// failing the whole server.
fn build_state(
    pool: sqlx::PgPool,
    config: Arc<codstore_core::AppConfig>,
) -> anyhow::Result<AppState> {
    let notifier = match &config.telegram_token {
        Some(token) if !config.telegram_chat_ids.is_empty() => Some(Arc::new(
            codstore_notify::TelegramNotifier::new(token, config.telegram_chat_ids.clone())?,
        )),
        _ => {
            tracing::warn!("TG_TOKEN/TG_CHAT_IDS not set; telegram notifications disabled");
            None
        }
    };

    let capi = match (&config.meta_pixel_id, &config.meta_access_token) {
        (Some(pixel_id), Some(access_token)) => Some(Arc::new(codstore_notify::MetaCapi::new(
            pixel_id,
            access_token,
            config.meta_test_event_code.clone(),
        )?)),
        _ => {
            tracing::warn!("META_PIXEL_ID/META_ACCESS_TOKEN not set; conversion events disabled");
            None
        }
    };

    let cloudflare = match (&config.cloudflare_api_token, &config.cloudflare_zone_id) {
        (Some(token), Some(zone_id)) => Some(Arc::new(
            codstore_cloudflare::CloudflareClient::new(token, zone_id)?,
        )),
        _ => {
            tracing::warn!(
                "CLOUDFLARE_API_TOKEN/CLOUDFLARE_ZONE_ID not set; analytics mirror disabled"
            );
            None
        }
    };

    let storage = match &config.storage {
        Some(storage_config) => Some(Arc::new(codstore_storage::ObjectStore::new(storage_config))),
        None => {
            tracing::warn!("R2_* variables not set; image uploads disabled");
            None
        }
    };

    Ok(AppState {
        pool,
        config,
        notifier,
        capi,
        cloudflare,
        storage,
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
