use color_eyre::eyre::WrapErr;
use std::net::SocketAddr;
use tokio::net::TcpListener;

pub mod trace;

/// Wraps `routes` in the request tracing layer and serves it on `$PORT` (default 3000)
/// until the process receives Ctrl-C.
pub async fn run_server(routes: axum::Router) -> color_eyre::Result<()> {
    let tracer = trace::Tracer;
    let trace_layer = tower_http::trace::TraceLayer::new_for_http()
        .make_span_with(tracer)
        .on_response(tracer);

    let app = routes.layer(trace_layer);

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let port: u16 = port.parse().wrap_err("PORT must be a valid port number")?;
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!("Starting server on port {}", port);
    let listener = TcpListener::bind(&addr)
        .await
        .wrap_err("Failed to open port")?;

    let addr = listener.local_addr()?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .wrap_err("Failed to run server")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }

    tracing::info!("Shutdown signal received");
}
