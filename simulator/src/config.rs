use clap::builder::RangedU64ValueParser;
use clap::Parser;
use rumqttc::QoS;
use std::time::Duration;

/// Largest accepted `--base-ts`; leaves the publish counter room to grow.
pub const MAX_BASE_TS: u64 = i64::MAX as u64;

/// Replays a day of synthetic sensor telemetry through a fleet of MQTT clients.
#[derive(Debug, Clone, Parser)]
#[command(name = "sensor-mock", version)]
pub struct Config {
    /// Broker host
    #[arg(long, env = "MQTT_BROKER", default_value = "localhost")]
    pub host: String,

    /// Broker port
    #[arg(long, env = "MQTT_PORT", default_value_t = 1883)]
    pub port: u16,

    /// Number of virtual clients
    #[arg(
        long,
        env = "CLIENTS",
        default_value_t = 10_000,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub clients: usize,

    /// Client id prefix; the client index is appended
    #[arg(long, env = "CLIENT_PREFIX", default_value = "mock_client_")]
    pub client_prefix: String,

    #[arg(long, env = "TOPIC", default_value = "application/sensor_data")]
    pub topic: String,

    /// Constant `name` label in every reading
    #[arg(long = "name", env = "DEVICE_NAME", default_value = "D01")]
    pub device_name: String,

    /// Simulated interval between steps, in milliseconds
    #[arg(
        long,
        env = "STEP_MS",
        default_value_t = 5000,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub step_ms: u64,

    /// Wall-clock pause after each batch, in milliseconds
    #[arg(long, env = "AWAIT_MS", default_value_t = 5000)]
    pub await_ms: u64,

    /// Length of the replayed window, in seconds
    #[arg(long, env = "WINDOW_SECS", default_value_t = 24 * 3600)]
    pub window_secs: u64,

    /// First payload timestamp, in milliseconds
    #[arg(
        long,
        env = "BASE_TIMESTAMP",
        default_value_t = 1_519_833_600_000,
        value_parser = clap::value_parser!(u64).range(..=MAX_BASE_TS)
    )]
    pub base_ts: u64,

    #[arg(
        long,
        env = "QOS",
        default_value_t = 0,
        value_parser = clap::value_parser!(u8).range(0..=2)
    )]
    pub qos: u8,

    #[arg(long, env = "KEEP_ALIVE_SECS", default_value_t = 30)]
    pub keep_alive_secs: u64,

    /// Seed for reproducible readings
    #[arg(long, env = "SEED")]
    pub seed: Option<u64>,
}

impl Config {
    pub fn step(&self) -> Duration {
        Duration::from_millis(self.step_ms)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.await_ms)
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    pub fn qos(&self) -> QoS {
        match self.qos {
            0 => QoS::AtMostOnce,
            1 => QoS::AtLeastOnce,
            _ => QoS::ExactlyOnce,
        }
    }
}
