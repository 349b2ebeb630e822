use std::net::SocketAddr;
use std::sync::Arc;
use tapgame_core::InitDataVerifier;
use tapgame_server::{config::Config, db, routes, state::AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 0. Load .env file immediately
    // Silently ignores a missing .env; real deployments set the variables directly.
    dotenvy::dotenv().ok();

    // 1. Initialize Sentry (if configured)
    // This guard must be kept in scope for Sentry to work
    let _guard = sentry::init((std::env::var("SENTRY_DSN").ok(), sentry::ClientOptions {
        release: sentry::release_name!(),
        traces_sample_rate: 1.0,
        ..Default::default()
    }));

    // 2. Install rustls crypto provider
    // This needs to happen before the database connection negotiates TLS.
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    // 3. Initialize logging
    // Respects RUST_LOG, defaults to debug for the server and tower_http.
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "tapgame_server=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    tracing::info!("Starting tap game server...");

    // 4. Read configuration
    // A missing BOT_TOKEN stops us here. Serving without it would mean trusting anyone.
    let config = Config::from_env()?;
    let verifier = InitDataVerifier::new(&config.bot_token)?;
    tracing::info!(?config, "Configuration loaded");

    // 5. Connect to database
    // Creates the user_progress table if this is a fresh database.
    let db = db::connect(&config).await?;
    tracing::info!("Connected to PostgreSQL successfully!");

    // 6. Build the app state
    let state = AppState {
        store: Arc::new(db::PgProgressStore::new(db)),
        verifier: Arc::new(verifier),
        policy: config.progress_policy,
    };
    let app = routes::create_routes(state, config.static_dir.clone());

    // 7. Start the server
    // 0.0.0.0 so it binds to all interfaces (necessary in Docker).
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
