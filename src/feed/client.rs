//! The live-feed client.

use crate::error::FeedError;
use crate::feed::backoff::{CloseAction, ConnectionState, ConnectionTracker};
use crate::feed::config::FeedConfig;
use crate::feed::credentials::CredentialSource;
use crate::feed::listeners::{ListenerList, Subscription};
use crate::feed::message::{AirQualityReading, FeedMessage, LocationRequest};
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

type FeedSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Client for a push feed of air-quality readings.
///
/// Cloning yields another handle to the same connection and listener lists.
/// No public method returns an error or panics: every failure is delivered to
/// the listeners registered with [`FeedClient::on_error`].
///
/// ```rust,no_run
/// use air_sentinel::{FeedClient, FeedConfig, StaticToken};
///
/// # async fn run() {
/// let client = FeedClient::new(FeedConfig::default(), StaticToken::new("token"));
/// let _errors = client.on_error(|e| eprintln!("feed error: {}", e));
/// let readings = client.subscribe(|r| println!("AQI {}", r.aqi));
/// client.connect();
/// client.update_location(-1.2921, 36.8219);
/// // ...
/// readings.unsubscribe();
/// client.disconnect();
/// # }
/// ```
#[derive(Clone)]
pub struct FeedClient {
    inner: Arc<Inner>,
}

struct Inner {
    config: FeedConfig,
    credentials: Box<dyn CredentialSource>,
    data_listeners: Arc<ListenerList<AirQualityReading>>,
    error_listeners: Arc<ListenerList<FeedError>>,
    tracker: Mutex<ConnectionTracker>,
    /// Publishes every state the tracker moves into
    states: watch::Sender<ConnectionState>,
    /// Outbound half of the open socket; `None` unless the state is `Open`
    connection: Mutex<Option<mpsc::UnboundedSender<Message>>>,
    driver: Mutex<Option<Driver>>,
    /// Bumped on every connect and disconnect; a driver whose generation is
    /// stale must not touch shared state
    generation: AtomicU64,
}

struct Driver {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl FeedClient {
    /// Create a client. Nothing is dialled until [`FeedClient::connect`].
    pub fn new(config: FeedConfig, credentials: impl CredentialSource + 'static) -> Self {
        let policy = config.reconnect_policy();
        let (states, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            inner: Arc::new(Inner {
                config,
                credentials: Box::new(credentials),
                data_listeners: ListenerList::new("data"),
                error_listeners: ListenerList::new("error"),
                tracker: Mutex::new(ConnectionTracker::idle(policy)),
                states,
                connection: Mutex::new(None),
                driver: Mutex::new(None),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Register a listener for readings.
    pub fn subscribe<F>(&self, on_data: F) -> Subscription
    where
        F: Fn(&AirQualityReading) + Send + Sync + 'static,
    {
        self.inner.data_listeners.add(on_data)
    }

    /// Register a listener for errors.
    pub fn on_error<F>(&self, on_error: F) -> Subscription
    where
        F: Fn(&FeedError) + Send + Sync + 'static,
    {
        self.inner.error_listeners.add(on_error)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        lock(&self.inner.tracker).state()
    }

    /// Receiver that observes every lifecycle transition.
    ///
    /// A change to [`ConnectionState::Open`] means a fresh socket: the data
    /// source has no location for it yet.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.inner.states.subscribe()
    }

    /// Reconnects scheduled since the connection was last open.
    pub fn reconnect_attempts(&self) -> u32 {
        lock(&self.inner.tracker).attempts()
    }

    pub fn config(&self) -> &FeedConfig {
        &self.inner.config
    }

    /// Start the connection driver on the current tokio runtime.
    ///
    /// Does nothing if a driver is already running. After the client has
    /// failed or been disconnected this starts over with a fresh retry budget.
    pub fn connect(&self) {
        let mut driver = lock(&self.inner.driver);
        if let Some(existing) = driver.as_ref() {
            if !existing.task.is_finished() {
                debug!("Feed driver already running");
                return;
            }
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                drop(driver);
                error!("Cannot start feed client: {}", e);
                self.inner
                    .report(FeedError::Connection("no async runtime available".to_string()));
                return;
            }
        };

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner
            .transition(|tracker| *tracker = ConnectionTracker::new(self.inner.config.reconnect_policy()));

        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = runtime.spawn(run(self.inner.clone(), generation, shutdown_rx));
        *driver = Some(Driver { shutdown, task });
    }

    /// Ask the data source to stream readings for a new location.
    ///
    /// If the socket is not open this reports [`FeedError::NotConnected`].
    pub fn update_location(&self, latitude: f64, longitude: f64) {
        let sender = {
            let open = self.state() == ConnectionState::Open;
            let connection = lock(&self.inner.connection);
            if open {
                connection.clone()
            } else {
                None
            }
        };

        let Some(sender) = sender else {
            warn!("Location update requested while disconnected");
            self.inner.report(FeedError::NotConnected);
            return;
        };

        let payload = match serde_json::to_string(&LocationRequest { latitude, longitude }) {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to encode location update: {}", e);
                self.inner.report(FeedError::SendFailed);
                return;
            }
        };

        if sender.send(Message::Text(payload)).is_err() {
            self.inner.report(FeedError::SendFailed);
        } else {
            debug!("Queued location update ({}, {})", latitude, longitude);
        }
    }

    /// Close the connection. Safe to call in any state, any number of times.
    pub fn disconnect(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.inner.transition(ConnectionTracker::on_disconnect);
        lock(&self.inner.connection).take();

        if let Some(driver) = lock(&self.inner.driver).take() {
            // The driver may already have exited on its own
            let _ = driver.shutdown.send(true);
            info!("Feed client disconnected");
        }
    }

    /// Process one inbound text frame as if it had arrived on the socket.
    #[doc(hidden)]
    pub fn dispatch_frame(&self, text: &str) {
        self.inner.dispatch_frame(text);
    }
}

impl Inner {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Apply `change` to the tracker and publish the resulting state.
    fn transition<R>(&self, change: impl FnOnce(&mut ConnectionTracker) -> R) -> R {
        let mut tracker = lock(&self.tracker);
        let result = change(&mut tracker);
        let state = tracker.state();
        self.states.send_if_modified(|current| {
            let modified = *current != state;
            *current = state;
            modified
        });
        result
    }

    fn report(&self, err: FeedError) {
        self.error_listeners.notify(&err);
    }

    fn dispatch_frame(&self, text: &str) {
        match FeedMessage::parse(text) {
            Ok(FeedMessage::AirQualityUpdate { data }) => {
                let delivered = self.data_listeners.notify(&data);
                debug!("Delivered reading (aqi {}) to {} listeners", data.aqi, delivered);
            }
            Ok(FeedMessage::Error { message }) => {
                warn!("Data source reported an error: {}", message);
                self.report(FeedError::Remote(message));
            }
            Ok(FeedMessage::Unknown) => {
                warn!("Unknown message type: {}", text);
            }
            Err(e) => {
                error!("Error parsing WebSocket message: {}", e);
                self.report(FeedError::InvalidMessage);
            }
        }
    }
}

/// Connection driver: dial, pump messages, and reconnect until told to stop
/// or the retry budget runs out.
async fn run(inner: Arc<Inner>, generation: u64, mut shutdown: watch::Receiver<bool>) {
    loop {
        let Some(token) = read_token(&inner).await else {
            if inner.is_current(generation) {
                error!("No authentication token found; feed client not connected");
                inner.transition(ConnectionTracker::on_disconnect);
                inner.report(FeedError::MissingCredential);
            }
            return;
        };

        let url = inner.config.endpoint_with_token(&token);
        debug!("Connecting to {}", inner.config.url);

        let attempt = tokio::select! {
            result = tokio_tungstenite::connect_async(url) => result,
            _ = shutdown.changed() => return,
        };

        match attempt {
            Ok((socket, _response)) => {
                let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
                let opened = inner.transition(|tracker| {
                    if !inner.is_current(generation) || tracker.state() != ConnectionState::Connecting {
                        return false;
                    }
                    *lock(&inner.connection) = Some(outbound_tx.clone());
                    tracker.on_open();
                    true
                });
                if !opened {
                    return;
                }
                info!("WebSocket connected to {}", inner.config.url);

                let stopped = pump(&inner, socket, outbound_rx, &mut shutdown).await;
                {
                    let mut connection = lock(&inner.connection);
                    if connection.as_ref().is_some_and(|tx| tx.same_channel(&outbound_tx)) {
                        connection.take();
                    }
                }
                if stopped {
                    return;
                }
                info!("WebSocket connection closed");
            }
            Err(e) => {
                if !inner.is_current(generation) {
                    return;
                }
                warn!("WebSocket connection failed: {}", e);
                inner.report(FeedError::Connection(e.to_string()));
            }
        }

        if !inner.is_current(generation) {
            return;
        }
        let action = inner.transition(ConnectionTracker::on_close);
        match action {
            CloseAction::Reconnect { attempt, delay } => {
                info!(
                    "Reconnecting in {:?}... Attempt {}/{}",
                    delay, attempt, inner.config.max_reconnect_attempts
                );
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = shutdown.changed() => return,
                }
            }
            CloseAction::Exhausted { attempts } => {
                error!("WebSocket connection failed after {} attempts", attempts);
                inner.report(FeedError::ReconnectExhausted { attempts });
                return;
            }
            CloseAction::Ignore => return,
        }
    }
}

/// Credential sources may touch the filesystem, so they run off the runtime.
async fn read_token(inner: &Arc<Inner>) -> Option<String> {
    let source = inner.clone();
    match tokio::task::spawn_blocking(move || source.credentials.token()).await {
        Ok(token) => token.filter(|t| !t.is_empty()),
        Err(e) => {
            error!("Credential source failed: {}", e);
            None
        }
    }
}

/// Move frames in both directions until the socket closes (`false`) or the
/// caller disconnects (`true`).
async fn pump(
    inner: &Inner,
    socket: FeedSocket,
    mut outbound: mpsc::UnboundedReceiver<Message>,
    shutdown: &mut watch::Receiver<bool>,
) -> bool {
    let (mut sink, mut stream) = socket.split();
    let mut outbound_open = true;

    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => inner.dispatch_frame(&text),
                Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                    Ok(text) => inner.dispatch_frame(text),
                    Err(_) => inner.report(FeedError::InvalidMessage),
                },
                Some(Ok(Message::Close(frame))) => {
                    debug!("Server closed the connection: {:?}", frame);
                    return false;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("WebSocket error: {}", e);
                    inner.report(FeedError::Connection(e.to_string()));
                    return false;
                }
                None => return false,
            },
            message = outbound.recv(), if outbound_open => match message {
                Some(message) => {
                    if let Err(e) = sink.send(message).await {
                        warn!("Failed to send on WebSocket: {}", e);
                        inner.report(FeedError::SendFailed);
                    }
                }
                None => outbound_open = false,
            },
            _ = shutdown.changed() => {
                if let Err(e) = sink.send(Message::Close(None)).await {
                    debug!("Close frame not sent: {}", e);
                }
                return true;
            }
        }
    }
}
