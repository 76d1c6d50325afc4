//! swimcam-camera entry point.

use eyre::{Result, WrapErr};
use std::{net::IpAddr, sync::Arc};
use swimcam_core::{
    OverlayStyle, SharedRace, SystemClock, control_feed, resolve_authority, wait_for_sync,
};
use swimcam_node::{
    Config,
    broker::{mqtt_options, run_control_subscriber},
    hostname, init_tracing,
    pipeline::{LogSink, TestPattern},
};
use tracing::{error, info};

fn main() -> Result<()> {
    init_tracing();

    let config = Config::from_env()?;
    let race = SharedRace::new(config.camera.race_state()?)
        .with_lock_budget(config.camera.render_lock_budget);

    info!(
        instance = config.camera.instance,
        left_lane = config.camera.left_lane,
        right_lane = config.camera.right_lane,
        test_mode = config.camera.test_mode,
        "Configuration loaded"
    );

    let core_ip = resolve_authority(&config.camera).map_err(|err| {
        error!(error = %err, port = config.camera.discovery_port, "Authority discovery failed");
        eyre::Report::new(err)
    })?;
    info!(core_ip = %core_ip, "Authority located");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .wrap_err("Failed to create tokio runtime")?;

    runtime.block_on(run(config, race, core_ip))
}

async fn run(config: Config, race: SharedRace, core_ip: IpAddr) -> Result<()> {
    let client_id = config.camera.client_id(&hostname());
    info!(client_id = %client_id, "Broker client id");

    let (feed_tx, feed) = control_feed(race.clone(), config.broker.queue_depth);
    tokio::spawn(feed.run());

    let options = mqtt_options(&config.broker, client_id, core_ip, config.camera.broker_port);
    let mut subscriber = tokio::spawn(run_control_subscriber(
        options,
        config.broker.topic.clone(),
        feed_tx,
    ));

    // The host clock is assumed to be disciplined to the authority.
    let clock = Arc::new(SystemClock);
    info!(
        authority = %core_ip,
        clock_port = config.camera.clock_port,
        "Using host clock as synchronized time base"
    );
    wait_for_sync(clock.as_ref(), config.clock.sync_poll).await;

    let style = OverlayStyle::default();
    info!(style = ?style, "Overlay configured");

    let pattern = TestPattern::new(clock, config.pipeline.frame_interval);
    let mut sink = LogSink::default();

    tokio::select! {
        _ = pattern.run(race, config.camera.tz_offset_hours, &mut sink) => {}
        result = &mut subscriber => {
            result
                .wrap_err("Broker task panicked")?
                .wrap_err("Lost the control message subscription")?;
        }
        result = tokio::signal::ctrl_c() => {
            result.wrap_err("Failed to listen for shutdown signal")?;
        }
    }

    info!(frames = sink.updates(), "Shutting down");
    Ok(())
}
