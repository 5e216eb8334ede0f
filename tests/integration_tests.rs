use air_sentinel::relay::{serve, RelayState, SimulatedSource};
use air_sentinel::{
    AirQualityReading, ConnectionState, FeedClient, FeedConfig, FeedError, RelayConfig, StaticToken,
};
use axum::extract::ws::{Message, WebSocketUpgrade};
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::{sleep, timeout};

type Log<T> = Arc<Mutex<Vec<T>>>;

async fn start_relay(config: RelayConfig) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Should bind loopback listener");
    let addr = listener.local_addr().expect("Should have local address");
    let state = RelayState::new(config, Arc::new(SimulatedSource::new()));
    tokio::spawn(async move {
        let _ = serve(listener, state).await;
    });
    addr
}

fn feed_config(addr: SocketAddr) -> FeedConfig {
    FeedConfig::new(format!("ws://{}/api/v1/ws/air-quality", addr)).with_reconnect_base_delay_ms(10)
}

fn record_readings(client: &FeedClient) -> Log<AirQualityReading> {
    let log: Log<AirQualityReading> = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    client.subscribe(move |r| sink.lock().unwrap().push(r.clone()));
    log
}

fn record_errors(client: &FeedClient) -> Log<FeedError> {
    let log: Log<FeedError> = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    client.on_error(move |e| sink.lock().unwrap().push(e.clone()));
    log
}

async fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    timeout(Duration::from_secs(5), async {
        while !condition() {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .is_ok()
}

#[tokio::test]
async fn test_client_receives_update_for_location() {
    let addr = start_relay(RelayConfig::default()).await;
    let client = FeedClient::new(feed_config(addr), StaticToken::new("token"));
    let readings = record_readings(&client);
    let errors = record_errors(&client);

    client.connect();
    assert!(wait_for(|| client.state() == ConnectionState::Open).await);

    client.update_location(-1.2921, 36.8219);
    assert!(wait_for(|| !readings.lock().unwrap().is_empty()).await);

    let reading = readings.lock().unwrap()[0].clone();
    let location = reading.location.expect("Relay should tag the location");
    assert_eq!(location.lat, -1.2921);
    assert_eq!(location.lon, 36.8219);
    assert_eq!(reading.aqi, f64::from(reading.components.composite_aqi()));
    assert!(errors.lock().unwrap().is_empty());

    client.disconnect();
}

#[tokio::test]
async fn test_fan_out_over_live_connection() {
    let addr = start_relay(RelayConfig::default()).await;
    let client = FeedClient::new(feed_config(addr), StaticToken::new("token"));

    let order: Log<&'static str> = Arc::new(Mutex::new(Vec::new()));
    let o = order.clone();
    let first = client.subscribe(move |_| o.lock().unwrap().push("first"));
    let o = order.clone();
    client.subscribe(move |_| o.lock().unwrap().push("second"));

    client.connect();
    assert!(wait_for(|| client.state() == ConnectionState::Open).await);

    client.update_location(48.8566, 2.3522);
    assert!(wait_for(|| order.lock().unwrap().len() == 2).await);
    assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);

    first.unsubscribe();
    client.update_location(40.7128, -74.0060);
    assert!(wait_for(|| order.lock().unwrap().len() == 3).await);
    assert_eq!(*order.lock().unwrap(), vec!["first", "second", "second"]);

    client.disconnect();
}

#[tokio::test]
async fn test_invalid_coordinates_reported_by_relay() {
    let addr = start_relay(RelayConfig::default()).await;
    let client = FeedClient::new(feed_config(addr), StaticToken::new("token"));
    let errors = record_errors(&client);

    client.connect();
    assert!(wait_for(|| client.state() == ConnectionState::Open).await);

    client.update_location(95.0, 0.0);
    assert!(wait_for(|| !errors.lock().unwrap().is_empty()).await);

    assert_eq!(
        errors.lock().unwrap()[0],
        FeedError::Remote("Invalid coordinates".to_string())
    );
    assert_eq!(client.state(), ConnectionState::Open);

    client.disconnect();
}

#[tokio::test]
async fn test_rejected_token_exhausts_retries() {
    let addr = start_relay(RelayConfig::default().with_tokens(vec!["good".to_string()])).await;
    let client = FeedClient::new(
        feed_config(addr).with_max_reconnect_attempts(2),
        StaticToken::new("bad"),
    );
    let errors = record_errors(&client);

    client.connect();
    assert!(wait_for(|| matches!(
        errors.lock().unwrap().last(),
        Some(FeedError::ReconnectExhausted { .. })
    ))
    .await);
    assert_eq!(client.state(), ConnectionState::Failed);

    let errors = errors.lock().unwrap().clone();
    let connection_errors = errors
        .iter()
        .filter(|e| matches!(e, FeedError::Connection(_)))
        .count();
    assert_eq!(connection_errors, 3);
    assert_eq!(errors.last(), Some(&FeedError::ReconnectExhausted { attempts: 2 }));
}

#[tokio::test]
async fn test_unreachable_source_reports_exhaustion_once() {
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Should bind loopback listener");
        listener.local_addr().expect("Should have local address")
    };

    let client = FeedClient::new(
        FeedConfig::new(format!("ws://{}/api/v1/ws/air-quality", addr)).with_reconnect_base_delay_ms(5),
        StaticToken::new("token"),
    );
    let errors = record_errors(&client);

    client.connect();
    assert!(wait_for(|| client.state() == ConnectionState::Failed).await);

    // Nothing further happens once failed
    sleep(Duration::from_millis(100)).await;
    let errors = errors.lock().unwrap().clone();
    let exhausted: Vec<_> = errors
        .iter()
        .filter(|e| matches!(e, FeedError::ReconnectExhausted { .. }))
        .collect();
    assert_eq!(exhausted, vec![&FeedError::ReconnectExhausted { attempts: 5 }]);
    assert_eq!(errors.len(), 7);
}

#[tokio::test]
async fn test_disconnect_does_not_reconnect() {
    let addr = start_relay(RelayConfig::default()).await;
    let client = FeedClient::new(feed_config(addr), StaticToken::new("token"));
    let errors = record_errors(&client);

    client.connect();
    assert!(wait_for(|| client.state() == ConnectionState::Open).await);

    client.disconnect();
    client.disconnect();
    sleep(Duration::from_millis(100)).await;

    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert!(errors.lock().unwrap().is_empty());

    client.update_location(0.0, 0.0);
    assert_eq!(*errors.lock().unwrap(), vec![FeedError::NotConnected]);
}

#[tokio::test]
async fn test_reconnect_after_disconnect() {
    let addr = start_relay(RelayConfig::default()).await;
    let client = FeedClient::new(feed_config(addr), StaticToken::new("token"));

    client.connect();
    assert!(wait_for(|| client.state() == ConnectionState::Open).await);
    client.disconnect();

    // The previous driver may still be finishing its close handshake
    assert!(
        wait_for(|| {
            client.connect();
            client.state() == ConnectionState::Open
        })
        .await
    );
    client.disconnect();
}

/// A bare feed server that sends a garbage frame, then a valid update, then
/// holds the connection open.
async fn start_garbage_server() -> SocketAddr {
    let app = Router::new().route(
        "/feed",
        get(|ws: WebSocketUpgrade| async move {
            ws.on_upgrade(|mut socket| async move {
                let update = serde_json::json!({
                    "type": "air_quality_update",
                    "data": {
                        "aqi": 12,
                        "components": {
                            "co": 200.0, "no": 0.1, "no2": 4.0, "o3": 30.0,
                            "so2": 1.0, "pm2_5": 2.9, "pm10": 6.0
                        },
                        "timestamp": "2024-05-01T08:00:00Z"
                    }
                });
                if socket.send(Message::Text("{{{".to_string())).await.is_err() {
                    return;
                }
                if socket.send(Message::Text(update.to_string())).await.is_err() {
                    return;
                }
                while let Some(Ok(_)) = socket.recv().await {}
            })
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Should bind loopback listener");
    let addr = listener.local_addr().expect("Should have local address");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

#[tokio::test]
async fn test_malformed_frame_keeps_connection_open() {
    let addr = start_garbage_server().await;
    let client = FeedClient::new(
        FeedConfig::new(format!("ws://{}/feed", addr)),
        StaticToken::new("token"),
    );
    let readings = record_readings(&client);
    let errors = record_errors(&client);

    client.connect();
    assert!(wait_for(|| !readings.lock().unwrap().is_empty()).await);

    assert_eq!(*errors.lock().unwrap(), vec![FeedError::InvalidMessage]);
    assert_eq!(client.state(), ConnectionState::Open);
    assert_eq!(client.reconnect_attempts(), 0);
    assert_eq!(readings.lock().unwrap()[0].aqi, 12.0);

    client.disconnect();
}
