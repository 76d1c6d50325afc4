//! swimcam-node - camera and starter processes for a SwimCam venue.
//!
//! The camera process finds the authority, subscribes to start/reset
//! messages on its broker, and renders the race overlay for every frame
//! of its video source using [swimcam-core](../swimcam_core/index.html).
//! The starter process runs on the authority: it advertises the
//! authority on the discovery port and publishes start/reset messages
//! typed at its console.
//!
//! # Configuration
//!
//! Both processes read one YAML file, given by the `SWIMCAM_CONFIG`
//! environment variable or as the first argument. Every section is
//! optional. See `config/example.yaml` for a complete example.

pub mod broker;
pub mod config;
pub mod pipeline;
pub mod starter;

pub use config::Config;

use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber, filtered by `RUST_LOG` (default `info`).
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

/// This host's name, used in the broker client id.
pub fn hostname() -> String {
    rustix::system::uname()
        .nodename()
        .to_string_lossy()
        .into_owned()
}
