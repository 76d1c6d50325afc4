//! Bridge between the publish/subscribe broker and the race state.

use crate::config::BrokerConfig;
use eyre::{Result, WrapErr, ensure};
use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Packet, QoS};
use std::{net::IpAddr, time::Duration};
use swimcam_core::ControlMessage;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Requests buffered between a client handle and its event loop.
const REQUEST_CAPACITY: usize = 10;

const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Session options for a broker at `host:port`.
pub fn mqtt_options(
    config: &BrokerConfig,
    client_id: impl Into<String>,
    host: IpAddr,
    port: u16,
) -> MqttOptions {
    let mut options = MqttOptions::new(client_id, host.to_string(), port);
    options.set_keep_alive(config.keep_alive);
    options.set_credentials(config.username.clone(), config.password.clone());
    options
}

/// Subscribe to `topic` and forward every payload into `feed`.
///
/// Failing to reach the broker, or having the session refused, before the
/// first successful connection is an error. Later disconnects are retried.
/// Returns once the receiving end of `feed` is gone.
pub async fn run_control_subscriber(
    options: MqttOptions,
    topic: String,
    feed: flume::Sender<Vec<u8>>,
) -> Result<()> {
    let client_id = options.client_id();
    let (client, mut eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);
    let mut connected = false;

    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                ensure!(
                    ack.code == ConnectReturnCode::Success,
                    "Connection to broker refused: {:?}",
                    ack.code
                );

                // Subscriptions do not survive a clean reconnect.
                client
                    .try_subscribe(topic.as_str(), QoS::AtMostOnce)
                    .wrap_err("Unable to subscribe to starter messages")?;

                connected = true;
                info!(client_id = %client_id, topic = %topic, "connected to broker");
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                debug!(
                    topic = %publish.topic,
                    bytes = publish.payload.len(),
                    "received control message"
                );
                if feed.send_async(publish.payload.to_vec()).await.is_err() {
                    debug!("control feed closed, leaving broker");
                    return Ok(());
                }
            }
            Ok(_) => {}
            Err(err) if connected => {
                warn!(error = %err, "broker connection lost, reconnecting");
                sleep(RECONNECT_DELAY).await;
            }
            Err(err) => {
                return Err(err).wrap_err("Connection to broker failed");
            }
        }
    }
}

/// Publishes control messages for the starter.
#[derive(Clone)]
pub struct StarterLink {
    client: AsyncClient,
    topic: String,
}

impl StarterLink {
    /// Create the link. The returned event loop must be driven, see
    /// [drive_event_loop].
    pub fn new(options: MqttOptions, topic: String) -> (Self, EventLoop) {
        let (client, eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);
        (Self { client, topic }, eventloop)
    }

    /// Publish `message` as the retained state of the topic, so cameras
    /// joining later see the current race.
    pub async fn publish(&self, message: &ControlMessage) -> Result<()> {
        self.client
            .publish(
                self.topic.as_str(),
                QoS::AtMostOnce,
                true,
                message.to_payload().into_bytes(),
            )
            .await
            .wrap_err("Failed to publish control message")
    }

    pub async fn disconnect(&self) -> Result<()> {
        self.client
            .disconnect()
            .await
            .wrap_err("Failed to disconnect from broker")
    }
}

/// Poll `eventloop` until the session is closed by a disconnect.
pub async fn drive_event_loop(mut eventloop: EventLoop) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => info!("connected to broker"),
            Ok(Event::Outgoing(rumqttc::Outgoing::Disconnect)) => {
                debug!("disconnected from broker");
                return;
            }
            Ok(_) => {}
            Err(err) => {
                warn!(error = %err, "broker connection error, retrying");
                sleep(RECONNECT_DELAY).await;
            }
        }
    }
}
