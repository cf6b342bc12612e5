#![forbid(unsafe_code)]

use std::error::Error;

use revenue_api::catalog::OptionsCatalog;
use revenue_api::{create_router, AppState, Config, ModelManager, Validator};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(log_json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = sigint.recv() => {}
                }
            }
            _ => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = Config::from_env();
    init_tracing(config.log_json);

    info!(model_dir = %config.model_dir.display(), model_name = %config.model_name, "starting server");

    let model = match ModelManager::load(&config.model_dir, &config.model_name) {
        Ok(model) => Some(model),
        Err(e) if config.require_model => {
            error!(error = %e, "failed to load model");
            return Err(e.into());
        }
        Err(e) => {
            warn!(error = %e, "failed to load model, serving in degraded mode");
            None
        }
    };

    let validator = if config.strict_categories {
        let catalog = OptionsCatalog::load(&config.options_path)?;
        info!(path = %config.options_path.display(), "validating categories against options catalog");
        Validator::strict(catalog)
    } else {
        Validator::lenient()
    };

    let state = AppState::new(model, validator, config.max_batch_size);
    let app = create_router(state, &config);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown_signal())
        .await?;

    info!("shutdown complete");
    Ok(())
}
