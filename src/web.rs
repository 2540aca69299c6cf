use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::api;
use crate::openweather::OpenWeatherClient;

/// Assemble the full application router.
pub fn app() -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", api::router(OpenWeatherClient::new()))
        .layer(cors)
}

pub async fn run(port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Weather service running at http://localhost:{}", port);
    axum::serve(listener, app()).await?;
    Ok(())
}
