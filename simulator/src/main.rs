mod config;
mod errors;
mod playback;
mod pool;
mod reading;

use chrono::Utc;
use clap::Parser;
use config::Config;
use errors::Result;
use playback::{Playback, PlaybackSettings, VirtualAxis};
use pool::{ClientPool, MqttConnector};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::time::Instant;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let config = Config::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting sensor mock");
    info!(
        "Broker: {}:{}, Clients: {}, Topic: {}, Step: {}ms, Await: {}ms",
        config.host, config.port, config.clients, config.topic, config.step_ms, config.await_ms
    );

    if let Err(e) = run(config).await {
        error!("Sensor mock failed: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<()> {
    let now = Utc::now();
    let started = Instant::now();

    let connector = MqttConnector::new(&config);
    let pool = ClientPool::connect(&connector, config.clients, &config.client_prefix).await?;
    info!("Connected {} clients to {}:{}", pool.len(), config.host, config.port);

    let rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let settings = PlaybackSettings {
        topic: config.topic.clone(),
        device_name: config.device_name.clone(),
        base_ts: config.base_ts,
        delay: config.delay(),
    };
    let axis = VirtualAxis::ending_at(now, config.window(), config.step());

    let mut playback = Playback::new(settings, rng);
    let summary = playback.run(&pool, axis).await?;

    info!(
        "Done, use {:.3}s, published {} over {} steps ({} dropped)",
        started.elapsed().as_secs_f64(),
        summary.published,
        summary.steps,
        summary.dropped
    );

    pool.close().await;
    Ok(())
}
