use anyhow::Context;
use listings_api::config::Config;
use listings_api::router::create_router;
use listings_api::state::AppState;
use listings_api::SERVICE_VERSION;
use rust_decimal::Decimal;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use types::ids::ListingId;
use types::listing::Listing;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    // Initialize tracing
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(version = SERVICE_VERSION, "Starting listings service");

    let config = Config::from_env().context("invalid configuration")?;
    tracing::info!(?config, "Loaded configuration");

    let state = AppState::new(&config).context("failed to build notification sink")?;

    if config.seed_example {
        state
            .store
            .seed(example_listing())
            .context("failed to seed example listing")?;
        tracing::info!("Seeded example listing");
    }

    let app = create_router(state);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("Listening on {}", config.bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Demo record shown to the first visitors; bypasses id assignment.
fn example_listing() -> Listing {
    Listing {
        id: ListingId::new(0),
        title: "Luxury seaside villa".to_string(),
        description: "Panoramic ocean view, private pool.".to_string(),
        price: Decimal::from(550_000),
        image_url: "https://via.placeholder.com/400x250.png/007BFF/FFFFFF?text=Villa".to_string(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::warn!("Shutdown signal received");
}
