use crate::handlers::{
    health::health_check,
    progress::{get_progress, save_progress},
};
use crate::middleware::rate_limit;
use crate::state::AppState;
use axum::{Router, routing::get};
use std::path::PathBuf;
use tower_governor::GovernorLayer;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

pub fn create_routes(state: AppState, static_dir: Option<PathBuf>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // GET and POST share one bucket per client IP.
    let progress_conf = rate_limit::create_progress_config();

    let api_routes = Router::new().route(
        "/progress",
        get(get_progress)
            .post(save_progress)
            .layer(GovernorLayer::new(progress_conf)),
    );

    let mut router = Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes);

    // Anything that isn't an API route is looked up in the web client's directory.
    if let Some(dir) = static_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
