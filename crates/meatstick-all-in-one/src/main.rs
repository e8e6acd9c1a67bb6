mod config;
mod ingest;

use anyhow::{Context, Result};
use crate::config::ServiceConfig;
use crate::ingest::{LogStateSink, ingest};
use meatstick_ble::{CallbackHandle, CallbackRegistry, TemperatureSensor};
use meatstick_payload::TemperatureDecoder;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() {
    let config = match ServiceConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    info!(
        probes = config.probes.len(),
        input = %config.input,
        "Starting meatstick-all-in-one service"
    );
    debug!("Configuration: {:?}", config);

    if let Err(e) = run_service(config).await {
        error!("Service failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run_service(config: ServiceConfig) -> Result<()> {
    let decoder: Arc<dyn TemperatureDecoder> = Arc::new(
        config
            .decoder
            .build_decoder()
            .context("invalid decoder configuration")?,
    );

    if config.probes.is_empty() {
        warn!("No probes configured, broadcasts will be parsed but not reported");
    }

    let registry = CallbackRegistry::new();
    let sink = Arc::new(LogStateSink);
    let mut sensors: Vec<(Arc<TemperatureSensor>, CallbackHandle)> = Vec::new();

    for probe in &config.probes {
        let sensor = Arc::new(TemperatureSensor::new(
            probe.clone(),
            decoder.clone(),
            sink.clone(),
        ));
        let handle = sensor.attach(&registry);
        info!(
            address = %sensor.address(),
            name = %sensor.name(),
            unique_id = %sensor.unique_id(),
            "Tracking probe"
        );
        sensors.push((sensor, handle));
    }

    let ctx = CancellationToken::new();
    spawn_signal_handlers(ctx.clone());

    let reader = open_input(&config).await?;
    let stats = ingest(reader, &registry, ctx).await?;
    info!(
        lines = stats.lines,
        malformed = stats.malformed,
        delivered = stats.delivered,
        "Ingestion finished"
    );

    for (sensor, handle) in sensors {
        handle.cancel();
        match sensor.native_value() {
            Some(celsius) => info!(address = %sensor.address(), celsius, "Final reading"),
            None => info!(address = %sensor.address(), "No reading received"),
        }
    }

    info!("Service stopped gracefully");
    Ok(())
}

async fn open_input(config: &ServiceConfig) -> Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    if config.reads_stdin() {
        return Ok(Box::new(BufReader::new(tokio::io::stdin())));
    }

    let file = tokio::fs::File::open(&config.input)
        .await
        .with_context(|| format!("failed to open broadcast input {}", config.input))?;
    Ok(Box::new(BufReader::new(file)))
}

/// Cancel `token` on Ctrl-C, and on SIGTERM where supported.
fn spawn_signal_handlers(token: CancellationToken) {
    let signal_token = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received shutdown signal");
                signal_token.cancel();
            }
            Err(err) => {
                error!("Error setting up signal handler: {}", err);
            }
        }
    });

    #[cfg(unix)]
    tokio::spawn(async move {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received SIGTERM signal");
                token.cancel();
            }
            Err(err) => {
                error!("Error setting up SIGTERM handler: {}", err);
            }
        }
    });
}
