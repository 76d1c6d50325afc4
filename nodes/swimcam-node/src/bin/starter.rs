//! swimcam-starter entry point.

use eyre::{Result, WrapErr};
use std::{net::SocketAddr, time::Duration};
use swimcam_core::{Advertiser, ControlMessage, SyncClock, SystemClock};
use swimcam_node::{
    Config,
    broker::{StarterLink, drive_event_loop, mqtt_options},
    init_tracing,
    starter::{Command, StarterConsole, format_clock_time},
};
use tokio::io::{AsyncBufReadExt, BufReader, stdin};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = Config::from_env()?;

    let target = SocketAddr::new(
        config.starter.advertise_address,
        config.camera.discovery_port,
    );
    let advertiser = Advertiser::bind(target, config.starter.advertise_interval)
        .await
        .wrap_err("Failed to create advertisement socket")?;
    tokio::spawn(advertiser.run());

    let options = mqtt_options(
        &config.broker,
        config.starter.client_id.clone(),
        config.starter.broker_host,
        config.camera.broker_port,
    );
    let (link, eventloop) = StarterLink::new(options, config.broker.topic.clone());
    let connection = tokio::spawn(drive_event_loop(eventloop));

    let clock = SystemClock;
    let mut console = StarterConsole::default();
    let mut lines = BufReader::new(stdin()).lines();

    println!("Starter Simulator\n");
    println!("Press (s)tart or (r)eset, <Enter> to exit simulator\n");

    while let Some(line) = lines.next_line().await.wrap_err("Failed to read console")? {
        let now = clock.now();
        match console.command(&line, now) {
            Command::Publish(message) => {
                link.publish(&message).await?;
                match &message {
                    ControlMessage::Start { .. } => {
                        info!(clock_time = %format_clock_time(now), "Clock time");
                        info!(payload = %message.to_payload(), "Start sent");
                    }
                    _ => info!("Reset sent"),
                }
            }
            Command::Quit => break,
            Command::Unknown(input) => warn!(input = %input, "Unknown command"),
        }
    }

    link.disconnect().await?;
    // The broker may be gone already; do not wait on it forever.
    let _ = tokio::time::timeout(Duration::from_secs(2), connection).await;
    info!(races = console.current_race(), "Starter shutting down");
    Ok(())
}
