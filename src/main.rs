//! This file defines the plotserve binary entry point.

use plotserve::app;
use plotserve::cli;
use plotserve::metrics;
use plotserve::server;
use plotserve::tracing;

/// Application entry point
#[tokio::main]
async fn main() {
    let args = cli::parse();
    tracing::init_tracing();
    metrics::register_metrics();
    let service = app::service(&args);
    server::serve(&args, service).await;
}
