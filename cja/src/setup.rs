use std::time::Duration;

use color_eyre::eyre::WrapErr;
use opentelemetry_otlp::WithExportConfig;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{prelude::*, EnvFilter, Registry};
use tracing_tree::HierarchicalLayer;

/// Initialises Sentry when `SENTRY_DSN` is set. The guard must be held for the
/// life of the process so buffered events are flushed on exit.
pub fn setup_sentry() -> Option<sentry::ClientInitGuard> {
    let Ok(sentry_dsn) = std::env::var("SENTRY_DSN") else {
        println!("Sentry not configured in this environment");

        return None;
    };

    println!("Sentry enabled");

    Some(sentry::init((
        sentry_dsn,
        sentry::ClientOptions {
            traces_sample_rate: 0.5,
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

pub fn setup_tracing(crate_name: &str) -> crate::Result<()> {
    color_eyre::install()?;

    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        format!("warn,{crate_name}=info,db=info,cja=info,tower_http=debug")
    });

    let env_filter = EnvFilter::builder()
        .parse(&rust_log)
        .wrap_err_with(|| format!("Couldn't create env filter from {rust_log}"))?;

    let opentelemetry_layer = if let Ok(endpoint) = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") {
        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(
                opentelemetry_otlp::new_exporter()
                    .http()
                    .with_endpoint(endpoint)
                    .with_timeout(Duration::from_secs(3)),
            )
            .install_batch(opentelemetry_sdk::runtime::Tokio)
            .wrap_err("Failed to install the OTLP trace pipeline")?;

        println!("OpenTelemetry layer configured");

        Some(OpenTelemetryLayer::new(tracer))
    } else {
        println!("Skipping OpenTelemetry layer");

        None
    };

    let hierarchical = HierarchicalLayer::default()
        .with_writer(std::io::stdout)
        .with_indent_lines(true)
        .with_indent_amount(2)
        .with_thread_names(true)
        .with_thread_ids(true)
        .with_verbose_exit(true)
        .with_verbose_entry(true)
        .with_targets(true);

    Registry::default()
        .with(hierarchical)
        .with(opentelemetry_layer)
        .with(sentry_tracing::layer())
        .with(env_filter)
        .try_init()?;

    Ok(())
}
