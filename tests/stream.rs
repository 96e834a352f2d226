//! End-to-end tests over a local TCP stream
//!
//! A throwaway listener plays the GPS source; the relay connects to it,
//! decodes what it sends and feeds the subscription machinery.

use gps_relay::{GpsRelay, StreamSource};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::timeout;

const GGA_LINE: &[u8] =
    b"$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47\r\n";
const RMC_LINE: &[u8] =
    b"$GPRMC,123520,A,4807.100,N,01131.200,E,022.4,084.4,230394,003.1,W,A*6A\r\n";

#[tokio::test]
async fn relay_publishes_views_from_a_tcp_stream() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let feeder = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        for _ in 0..40 {
            if socket.write_all(GGA_LINE).await.is_err()
                || socket.write_all(RMC_LINE).await.is_err()
            {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    });

    let relay = GpsRelay::new();
    relay
        .start(StreamSource::Tcp {
            host: addr.ip().to_string(),
            port: addr.port(),
        })
        .await
        .unwrap();

    let mut sub = relay.subscribe(Some("WGS84"), Some(100)).unwrap();
    let view = timeout(Duration::from_secs(5), sub.receiver.recv())
        .await
        .expect("no view within five seconds")
        .unwrap();
    assert_eq!(view["type"], "WGS84");
    assert!((view["latitude"].as_f64().unwrap() - 48.1173).abs() < 1e-2);

    // polling works alongside the subscription
    let polled = relay.get(Some("DMS.kn")).unwrap();
    assert_eq!(polled["type"], "DMS.kn");
    assert!(polled["latitude"].as_str().unwrap().ends_with("\"N"));

    let status = relay.status();
    assert!(status.connected);
    assert!(status.fixes >= 1);
    assert_eq!(status.subscriptions, 1);

    // unsubscribing closes the channel once it drains
    relay.unsubscribe(Some(sub.id)).unwrap();
    let closed = loop {
        match sub.receiver.recv().await {
            Ok(_) | Err(RecvError::Lagged(_)) => continue,
            Err(e) => break e,
        }
    };
    assert!(matches!(closed, RecvError::Closed));

    relay.stop();
    feeder.abort();
}

#[tokio::test]
async fn malformed_lines_do_not_stop_the_relay() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        // noise, a bad hemisphere letter and an oversized line first
        socket.write_all(b"!!noise!!\r\n").await.unwrap();
        socket
            .write_all(b"$GPGGA,123519,4807.038,X,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47\r\n")
            .await
            .unwrap();
        socket.write_all(&vec![b'x'; 500]).await.unwrap();
        socket.write_all(b"\r\n").await.unwrap();
        loop {
            if socket.write_all(GGA_LINE).await.is_err() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    });

    let relay = GpsRelay::new();
    relay
        .start(StreamSource::Tcp {
            host: addr.ip().to_string(),
            port: addr.port(),
        })
        .await
        .unwrap();

    let mut sub = relay.subscribe(None, Some(100)).unwrap();
    let view = timeout(Duration::from_secs(5), sub.receiver.recv())
        .await
        .expect("no view within five seconds")
        .unwrap();
    assert_eq!(view["type"], "WGS84");
    assert_eq!(view["altitude"], 545.4);

    relay.stop();
}

#[tokio::test]
async fn relay_reconnects_after_the_stream_ends() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        // the first connection dies right after one fix
        let (mut socket, _) = listener.accept().await.unwrap();
        socket.write_all(GGA_LINE).await.unwrap();
        drop(socket);

        // the relay comes back on its own; only this connection sends RMC
        let (mut socket, _) = listener.accept().await.unwrap();
        loop {
            if socket.write_all(RMC_LINE).await.is_err() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    });

    let relay = GpsRelay::new();
    relay
        .start(StreamSource::Tcp {
            host: addr.ip().to_string(),
            port: addr.port(),
        })
        .await
        .unwrap();

    let mut sub = relay.subscribe(Some("WGS84"), Some(100)).unwrap();
    let with_speed = loop {
        let view = timeout(Duration::from_secs(10), sub.receiver.recv())
            .await
            .expect("no view from the reconnected stream")
            .unwrap();
        if view.get("speed").is_some() {
            break view;
        }
    };
    assert!((with_speed["speed"].as_f64().unwrap() - 11.5235).abs() < 1e-3);

    relay.stop();
}

#[tokio::test]
async fn start_fails_when_nothing_listens() {
    let relay = GpsRelay::new();
    let result = relay
        .start(StreamSource::Tcp {
            host: "127.0.0.1".to_string(),
            port: 1,
        })
        .await;
    assert!(result.is_err());
}
