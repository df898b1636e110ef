//! Axum server setup and startup

use std::net::SocketAddr;

use tower_http::cors::{Any, CorsLayer};

use super::routes::create_router;
use super::shared::AppContextHandle;

/// Run the API server until `shutdown` resolves
///
/// Binds to the host and port from the context's settings.
pub async fn run_server<F>(ctx: AppContextHandle, shutdown: F) -> Result<(), std::io::Error>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    // Browser clients are served from another origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let bind = format!("{}:{}", ctx.settings().host, ctx.settings().port);
    let app = create_router(ctx).layer(cors);

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    let addr: SocketAddr = listener.local_addr()?;
    tracing::info!("API server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            tracing::info!("API server shutting down gracefully");
        })
        .await
}
