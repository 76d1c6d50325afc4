use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    time::Duration,
};
use swimcam_core::{
    Advertiser,
    discovery::{bind_listener, wait_for_authority},
};
use tokio::{task, time::timeout};

#[tokio::test]
async fn test_advertiser_is_discovered() {
    let listener = bind_listener(0).unwrap();
    let port = listener.local_addr().unwrap().port();

    let advertiser = Advertiser::bind(
        SocketAddr::from((Ipv4Addr::LOCALHOST, port)),
        Duration::from_millis(10),
    )
    .await
    .unwrap();
    assert_eq!(advertiser.target().port(), port);
    let advertising = tokio::spawn(advertiser.run());

    let authority = timeout(
        Duration::from_secs(5),
        task::spawn_blocking(move || wait_for_authority(&listener)),
    )
    .await
    .expect("no advertisement received")
    .unwrap()
    .unwrap();

    assert_eq!(authority, IpAddr::V4(Ipv4Addr::LOCALHOST));
    advertising.abort();
}

#[tokio::test]
async fn test_repeated_advertisements() {
    let listener = bind_listener(0).unwrap();
    let port = listener.local_addr().unwrap().port();

    let advertiser = Advertiser::bind(
        SocketAddr::from((Ipv4Addr::LOCALHOST, port)),
        Duration::from_millis(5),
    )
    .await
    .unwrap();
    let advertising = tokio::spawn(advertiser.run());

    // A camera restarting later still finds the authority.
    let listener = task::spawn_blocking(move || {
        for _ in 0..3 {
            wait_for_authority(&listener).unwrap();
        }
    });
    timeout(Duration::from_secs(5), listener)
        .await
        .expect("advertisements stopped")
        .unwrap();

    advertising.abort();
}
