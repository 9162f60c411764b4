//! Scene pipeline binary.

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use expo_pipeline::metrics::init_metrics;
use expo_pipeline::{Collaborators, Pipeline, PipelineConfig};
use expo_scenery::SceneryDocument;

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("expo=info".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting expo-pipeline");

    let config = PipelineConfig::from_env();
    info!("Pipeline config: {:?}", config);

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    if let Some(addr) = config.runtime.metrics_addr {
        if let Err(e) = init_metrics(addr) {
            error!("Failed to start metrics exporter: {}", e);
            std::process::exit(1);
        }
        info!("Metrics exporter listening on {}", addr);
    }

    if !config.depth.simulate {
        error!("Physical depth sensors are not available in this build; set SIMULATE_SENSORS=true");
        std::process::exit(1);
    }

    let document = match SceneryDocument::load(&config.sequence.scenery_path) {
        Ok(d) => d,
        Err(e) => {
            error!(
                "Failed to load scenery document {}: {}",
                config.sequence.scenery_path.display(),
                e
            );
            std::process::exit(1);
        }
    };

    let cursor = match config.sequence.build_cursor() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to build scene sequence: {}", e);
            std::process::exit(1);
        }
    };

    let collaborators = Collaborators::simulated(&config, document.nodes().cloned().collect());
    let pipeline = match Pipeline::new(config, cursor, collaborators) {
        Ok(p) => p,
        Err(e) => {
            error!("Failed to create pipeline: {}", e);
            std::process::exit(1);
        }
    };

    // Setup signal handlers
    let shutdown = pipeline.shutdown_handle();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        shutdown.shutdown();
    });

    if let Err(e) = pipeline.run().await {
        error!("Pipeline error: {}", e);
        std::process::exit(1);
    }

    info!("Pipeline shutdown complete");
}
