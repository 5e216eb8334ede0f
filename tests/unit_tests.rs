use air_sentinel::{
    aqi::{breakpoints::PM25_BREAKPOINTS, pollutant_sub_index, AQI_CEILING},
    calculate_aqi,
    feed::{CloseAction, ConnectionTracker, ReconnectPolicy},
    get_aqi_category, AirQualityReading, ConnectionState, FeedClient, FeedConfig, FeedError,
    StaticToken,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn update_frame(aqi: u32) -> String {
    serde_json::json!({
        "type": "air_quality_update",
        "data": {
            "aqi": aqi,
            "components": {
                "co": 230.3, "no": 0.1, "no2": 12.0, "o3": 40.0,
                "so2": 2.0, "pm2_5": 8.0, "pm10": 15.0, "nh3": 1.2
            },
            "timestamp": "2024-05-01T08:00:00Z"
        }
    })
    .to_string()
}

fn offline_client() -> FeedClient {
    FeedClient::new(FeedConfig::new("ws://127.0.0.1:9/unused"), StaticToken::new("token"))
}

/// Test every PM2.5 segment maps its bounds exactly to its index bounds
#[test]
fn test_pm25_boundary_exactness() {
    for segment in PM25_BREAKPOINTS.iter() {
        assert_eq!(
            pollutant_sub_index(segment.concentration_min, &PM25_BREAKPOINTS),
            segment.index_min
        );
        assert_eq!(
            pollutant_sub_index(segment.concentration_max, &PM25_BREAKPOINTS),
            segment.index_max
        );
    }
}

/// Test the composite saturates only when some pollutant is off the table
#[test]
fn test_saturation() {
    assert_eq!(calculate_aqi(600.0, 0.0, 0.0), AQI_CEILING);
    assert_eq!(calculate_aqi(0.0, 700.0, 0.0), AQI_CEILING);
    assert_eq!(calculate_aqi(0.0, 0.0, 3000.0), AQI_CEILING);
    assert!(calculate_aqi(500.4, 604.0, 2049.0) <= AQI_CEILING);
    assert!(calculate_aqi(250.0, 400.0, 1000.0) < AQI_CEILING);
}

/// Test reference composite values
#[test]
fn test_reference_composites() {
    assert_eq!(calculate_aqi(12.0, 54.0, 53.0), 50);
    assert_eq!(calculate_aqi(35.4, 154.0, 100.0), 100);
    assert_eq!(calculate_aqi(-5.0, -5.0, -5.0), 0);
}

/// Test category classification at band edges
#[test]
fn test_category_boundaries() {
    let categories: Vec<&str> = [0.0, 50.0, 51.0, 150.0, 151.0, 301.0]
        .into_iter()
        .map(|aqi| get_aqi_category(aqi).category)
        .collect();
    assert_eq!(
        categories,
        vec![
            "Good",
            "Good",
            "Moderate",
            "Unhealthy for Sensitive Groups",
            "Unhealthy",
            "Hazardous"
        ]
    );
}

/// Test fan-out order and mid-stream unsubscribe
#[test]
fn test_fan_out_and_unsubscribe() {
    let client = offline_client();
    let log: Arc<Mutex<Vec<(&'static str, f64)>>> = Arc::new(Mutex::new(Vec::new()));

    let l = log.clone();
    let first = client.subscribe(move |r: &AirQualityReading| l.lock().unwrap().push(("first", r.aqi)));
    let l = log.clone();
    let _second = client.subscribe(move |r: &AirQualityReading| l.lock().unwrap().push(("second", r.aqi)));
    let l = log.clone();
    let _third = client.subscribe(move |r: &AirQualityReading| l.lock().unwrap().push(("third", r.aqi)));

    client.dispatch_frame(&update_frame(10));
    client.dispatch_frame(&update_frame(20));
    assert!(first.unsubscribe());
    client.dispatch_frame(&update_frame(30));

    assert_eq!(
        *log.lock().unwrap(),
        vec![
            ("first", 10.0),
            ("second", 10.0),
            ("third", 10.0),
            ("first", 20.0),
            ("second", 20.0),
            ("third", 20.0),
            ("second", 30.0),
            ("third", 30.0),
        ]
    );
}

/// Test a panicking listener does not block later listeners
#[test]
fn test_listener_failure_isolation() {
    let client = offline_client();
    let received = Arc::new(Mutex::new(0));

    client.subscribe(|_| panic!("broken widget"));
    let r = received.clone();
    client.subscribe(move |_| *r.lock().unwrap() += 1);

    client.dispatch_frame(&update_frame(42));
    assert_eq!(*received.lock().unwrap(), 1);
}

/// Test error handler registration and removal
#[test]
fn test_error_handler_removal() {
    let client = offline_client();
    let errors = Arc::new(Mutex::new(Vec::new()));

    let e = errors.clone();
    let handle = client.on_error(move |err: &FeedError| e.lock().unwrap().push(err.clone()));

    client.dispatch_frame("definitely not json");
    assert!(handle.unsubscribe());
    client.dispatch_frame("still not json");

    assert_eq!(*errors.lock().unwrap(), vec![FeedError::InvalidMessage]);
}

/// Test update_location while disconnected reports exactly one error
#[test]
fn test_update_location_disconnected() {
    let client = offline_client();
    let errors = Arc::new(Mutex::new(Vec::new()));
    let e = errors.clone();
    client.on_error(move |err| e.lock().unwrap().push(err.clone()));

    client.update_location(51.5, -0.12);

    assert_eq!(*errors.lock().unwrap(), vec![FeedError::NotConnected]);
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

/// Test five closes schedule doubling delays, then one terminal failure
#[test]
fn test_reconnect_schedule() {
    let mut tracker = ConnectionTracker::new(ReconnectPolicy {
        base_delay: Duration::from_secs(1),
        max_attempts: 5,
    });
    tracker.on_open();

    let mut delays = Vec::new();
    let mut exhausted = 0;
    for _ in 0..7 {
        match tracker.on_close() {
            CloseAction::Reconnect { delay, .. } => delays.push(delay),
            CloseAction::Exhausted { .. } => exhausted += 1,
            CloseAction::Ignore => {}
        }
    }

    assert_eq!(
        delays,
        [1, 2, 4, 8, 16].map(Duration::from_secs).to_vec()
    );
    assert_eq!(exhausted, 1);
    assert_eq!(tracker.state(), ConnectionState::Failed);
}
