use receipt_validator::{routes::create_router, AppState, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,receipt_validator=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting receipt validator");

    // Load configuration
    let config = Config::load()?;

    tracing::info!(
        bundle_id = %config.app.bundle_id,
        production_url = %config.verification.production_url,
        sandbox_url = %config.verification.sandbox_url,
        "Loaded configuration"
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);

    let state = AppState::new(&config);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
