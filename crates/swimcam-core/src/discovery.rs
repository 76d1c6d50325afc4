//! One-shot rendezvous with the time/config authority.
//!
//! The authority periodically sends a small datagram to the discovery
//! port. A camera binds that port, waits for the first datagram from
//! anyone, and takes the sender's address as the authority. The payload
//! is never inspected.

use crate::config::CameraConfig;
use rustix::net::{AddressFamily, SocketType, bind_v4, socket, sockopt};
use std::{
    io,
    net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket},
    time::Duration,
};
use tracing::{debug, info, warn};

/// Size of the receive buffer. Longer datagrams are truncated.
pub const RECV_BUFFER_SIZE: usize = 2048;

/// Payload the authority advertises with.
pub const HELLO_PAYLOAD: &[u8] = b"Hello";

/// Default period between two advertisements.
pub const DEFAULT_ADVERTISE_INTERVAL: Duration = Duration::from_secs(5);

fn step_error(step: &'static str) -> impl FnOnce(rustix::io::Errno) -> io::Error {
    move |errno| {
        let err = io::Error::from(errno);
        io::Error::new(err.kind(), format!("{step}: {err}"))
    }
}

/// Bind the discovery socket on all IPv4 interfaces.
///
/// Address and port reuse are enabled so a restarted camera can bind
/// again right away.
pub fn bind_listener(port: u16) -> io::Result<UdpSocket> {
    let fd = socket(AddressFamily::INET, SocketType::DGRAM, None)
        .map_err(step_error("socket failed"))?;
    sockopt::set_socket_reuseaddr(&fd, true).map_err(step_error("setsockopt"))?;
    sockopt::set_socket_reuseport(&fd, true).map_err(step_error("setsockopt"))?;
    bind_v4(&fd, &SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port))
        .map_err(step_error("bind failed"))?;

    Ok(UdpSocket::from(fd))
}

/// Block until one datagram arrives on `socket` and return its sender.
pub fn wait_for_authority(socket: &UdpSocket) -> io::Result<IpAddr> {
    let mut buf = [0u8; RECV_BUFFER_SIZE];
    let (len, from) = socket
        .recv_from(&mut buf)
        .map_err(|err| io::Error::new(err.kind(), format!("recvfrom: {err}")))?;

    debug!(bytes = len, from = %from, "received authority advertisement");
    Ok(from.ip())
}

/// Bind the discovery port and wait, without timeout, for the authority.
pub fn discover_authority(port: u16) -> io::Result<IpAddr> {
    let socket = bind_listener(port)?;
    info!(port, "waiting for authority advertisement");
    wait_for_authority(&socket)
}

/// The authority address for this camera: loopback when running on the
/// authority host, otherwise whatever [discover_authority] finds.
pub fn resolve_authority(config: &CameraConfig) -> io::Result<IpAddr> {
    if config.local_override {
        return Ok(IpAddr::V4(Ipv4Addr::LOCALHOST));
    }
    discover_authority(config.discovery_port)
}

/// Periodically announces the authority to cameras on the network.
#[derive(Debug)]
pub struct Advertiser {
    socket: tokio::net::UdpSocket,
    target: SocketAddr,
    interval: Duration,
}

impl Advertiser {
    /// Advertise to `target` every `interval`.
    pub async fn bind(target: SocketAddr, interval: Duration) -> io::Result<Self> {
        let socket = tokio::net::UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
        socket.set_broadcast(true)?;
        Ok(Self {
            socket,
            target,
            interval,
        })
    }

    /// Advertise on the IPv4 broadcast address.
    pub async fn broadcast(port: u16, interval: Duration) -> io::Result<Self> {
        Self::bind(SocketAddr::from((Ipv4Addr::BROADCAST, port)), interval).await
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Send [HELLO_PAYLOAD] forever. Failed sends are logged and retried
    /// on the next tick.
    pub async fn run(self) {
        info!(target = %self.target, interval = ?self.interval, "advertising authority");
        let mut ticker = tokio::time::interval(self.interval);

        loop {
            ticker.tick().await;
            match self.socket.send_to(HELLO_PAYLOAD, self.target).await {
                Ok(_) => debug!(target = %self.target, "sent advertisement"),
                Err(err) => warn!(target = %self.target, error = %err, "advertisement failed"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_port(socket: &UdpSocket) -> u16 {
        socket.local_addr().unwrap().port()
    }

    #[test]
    fn test_sender_address_is_returned() {
        let listener = bind_listener(0).unwrap();
        let port = local_port(&listener);

        let sender = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        sender.send_to(b"anything at all", (Ipv4Addr::LOCALHOST, port)).unwrap();

        let authority = wait_for_authority(&listener).unwrap();
        assert_eq!(authority, IpAddr::V4(Ipv4Addr::LOCALHOST));
    }

    #[test]
    fn test_oversized_datagram_is_accepted() {
        let listener = bind_listener(0).unwrap();
        let port = local_port(&listener);

        let sender = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        sender
            .send_to(&[0xAB; RECV_BUFFER_SIZE * 2], (Ipv4Addr::LOCALHOST, port))
            .unwrap();

        assert!(wait_for_authority(&listener).unwrap().is_loopback());
    }

    #[test]
    fn test_rebind_same_port() {
        let first = bind_listener(0).unwrap();
        let port = local_port(&first);
        let second = bind_listener(port).unwrap();
        assert_eq!(local_port(&second), port);
    }

    #[test]
    fn test_local_override_skips_discovery() {
        let config = CameraConfig {
            local_override: true,
            ..CameraConfig::default()
        };
        assert_eq!(
            resolve_authority(&config).unwrap(),
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        );
    }
}
