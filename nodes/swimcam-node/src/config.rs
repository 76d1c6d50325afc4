//! Configuration parsing and validation for the swimcam processes.

use eyre::{Result, WrapErr, ensure};
use serde::Deserialize;
use std::{
    fs,
    net::{IpAddr, Ipv4Addr},
    path::Path,
    time::Duration,
};
use swimcam_core::{CameraConfig, START_TOPIC, discovery::DEFAULT_ADVERTISE_INTERVAL};

/// Environment variable holding the configuration file path.
pub const CONFIG_ENV: &str = "SWIMCAM_CONFIG";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Camera identity, lanes and the ports of the authority.
    #[serde(default)]
    pub camera: CameraConfig,

    /// Broker session settings.
    #[serde(default)]
    pub broker: BrokerConfig,

    /// Test-pattern video source.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Clock synchronization wait.
    #[serde(default)]
    pub clock: ClockConfig,

    /// Authority-side starter console.
    #[serde(default)]
    pub starter: StarterConfig,
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_yaml::from_str(&contents)
            .wrap_err_with(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load from `$SWIMCAM_CONFIG` or the first argument, falling back to
    /// the defaults when neither is given.
    pub fn from_env() -> Result<Self> {
        let path = std::env::var_os(CONFIG_ENV).or_else(|| std::env::args_os().nth(1));

        match path {
            Some(path) => Self::load(path),
            None => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        self.camera
            .validate()
            .wrap_err("Invalid camera configuration")?;

        ensure!(!self.broker.topic.is_empty(), "broker.topic cannot be empty");

        ensure!(
            self.broker.keep_alive.is_zero() || self.broker.keep_alive >= Duration::from_secs(5),
            "broker.keep_alive must be zero or at least 5s"
        );

        ensure!(
            self.broker.queue_depth > 0,
            "broker.queue_depth must be greater than zero"
        );

        ensure!(
            !self.pipeline.frame_interval.is_zero(),
            "pipeline.frame_interval must be greater than zero"
        );

        ensure!(
            !self.clock.sync_poll.is_zero(),
            "clock.sync_poll must be greater than zero"
        );

        ensure!(
            !self.starter.advertise_interval.is_zero(),
            "starter.advertise_interval must be greater than zero"
        );

        Ok(())
    }
}

/// Broker session settings.
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    /// Topic carrying start/reset messages.
    #[serde(default = "default_topic")]
    pub topic: String,

    #[serde(default = "default_username")]
    pub username: String,

    #[serde(default = "default_password")]
    pub password: String,

    #[serde(default = "default_keep_alive", with = "humantime_serde")]
    pub keep_alive: Duration,

    /// Control messages queued between the broker and the race state.
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            topic: default_topic(),
            username: default_username(),
            password: default_password(),
            keep_alive: default_keep_alive(),
            queue_depth: default_queue_depth(),
        }
    }
}

fn default_topic() -> String {
    START_TOPIC.to_string()
}

fn default_username() -> String {
    "swimcam".to_string()
}

fn default_password() -> String {
    "swimming".to_string()
}

fn default_keep_alive() -> Duration {
    Duration::from_secs(60)
}

fn default_queue_depth() -> usize {
    64
}

/// Test-pattern video source.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Time between two frames.
    #[serde(default = "default_frame_interval", with = "humantime_serde")]
    pub frame_interval: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            frame_interval: default_frame_interval(),
        }
    }
}

fn default_frame_interval() -> Duration {
    Duration::from_nanos(1_000_000_000 / 30)
}

/// Clock synchronization wait.
#[derive(Debug, Clone, Deserialize)]
pub struct ClockConfig {
    #[serde(default = "default_sync_poll", with = "humantime_serde")]
    pub sync_poll: Duration,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            sync_poll: default_sync_poll(),
        }
    }
}

fn default_sync_poll() -> Duration {
    Duration::from_millis(100)
}

/// Authority-side starter console.
#[derive(Debug, Clone, Deserialize)]
pub struct StarterConfig {
    /// Where advertisements are sent.
    #[serde(default = "default_advertise_address")]
    pub advertise_address: IpAddr,

    #[serde(default = "default_advertise_interval", with = "humantime_serde")]
    pub advertise_interval: Duration,

    /// The broker runs next to the starter.
    #[serde(default = "default_broker_host")]
    pub broker_host: IpAddr,

    #[serde(default = "default_starter_client_id")]
    pub client_id: String,
}

impl Default for StarterConfig {
    fn default() -> Self {
        Self {
            advertise_address: default_advertise_address(),
            advertise_interval: default_advertise_interval(),
            broker_host: default_broker_host(),
            client_id: default_starter_client_id(),
        }
    }
}

fn default_advertise_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::BROADCAST)
}

fn default_advertise_interval() -> Duration {
    DEFAULT_ADVERTISE_INTERVAL
}

fn default_broker_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn default_starter_client_id() -> String {
    "swimcam-starter-simulator".to_string()
}
