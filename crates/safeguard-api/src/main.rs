use std::sync::Arc;

use safeguard_api::config::AppConfig;
use safeguard_api::routes::{app_router, AppState};
use safeguard_core::db::Database;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Only load .env in development; production uses platform-native env injection.
    #[cfg(debug_assertions)]
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("safeguard_api=info".parse().expect("valid directive"))
                .add_directive("safeguard_core=info".parse().expect("valid directive")),
        )
        .init();

    let config = Arc::new(AppConfig::from_env()?);
    tracing::info!("Starting safeguard-api with config: {:?}", config);

    let database = Arc::new(Database::open(&config.database_path).await?);

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(config, database);
    let router = app_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("safeguard-api listening on {}", bind_addr);
    axum::serve(listener, router).await?;
    Ok(())
}
