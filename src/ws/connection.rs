#![expect(
    clippy::module_name_repetitions,
    reason = "Connection types expose their domain in the name for clarity"
)]

use std::pin::Pin;
use std::sync::Arc;

use futures::future::{self, BoxFuture};
use secrecy::ExposeSecret as _;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::time::{Sleep, sleep};
use url::Url;

use super::config::Config;
use super::error::WsError;
use super::transport::{Connector, Transport, WsConnector};
use crate::Result;
use crate::error::Error;
use crate::session::TokenStore;

/// Connection state tracking.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected
    Disconnected,
    /// Attempting to connect
    Connecting,
    /// Successfully connected
    Connected,
    /// The last connection attempt failed, or the live transport faulted
    Error,
}

impl ConnectionState {
    /// Check if the connection is currently active.
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

type OpenHandler = Box<dyn Fn() + Send + 'static>;
type CloseHandler = Box<dyn Fn() + Send + 'static>;
type MessageHandler = Box<dyn Fn(&str) + Send + 'static>;
type ErrorHandler = Box<dyn Fn(&WsError) + Send + 'static>;

/// Caller-supplied handler slots, one per transport event kind.
///
/// This is a closed set rather than a listener registry: at most one handler
/// per event, supplied up front. Every slot is optional; the polled
/// [`ConnectionManager::connection_state`] and
/// [`ConnectionManager::last_message`] accessors work without any handlers.
#[derive(Default)]
pub struct EventHandlers {
    on_open: Option<OpenHandler>,
    on_close: Option<CloseHandler>,
    on_message: Option<MessageHandler>,
    on_error: Option<ErrorHandler>,
}

impl EventHandlers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Invoked when a connection is established.
    #[must_use]
    pub fn on_open<F: Fn() + Send + 'static>(mut self, handler: F) -> Self {
        self.on_open = Some(Box::new(handler));
        self
    }

    /// Invoked when the connection closes, for any reason.
    #[must_use]
    pub fn on_close<F: Fn() + Send + 'static>(mut self, handler: F) -> Self {
        self.on_close = Some(Box::new(handler));
        self
    }

    /// Invoked for every inbound text frame, with the unparsed payload.
    #[must_use]
    pub fn on_message<F: Fn(&str) + Send + 'static>(mut self, handler: F) -> Self {
        self.on_message = Some(Box::new(handler));
        self
    }

    /// Invoked on connection-establishment failures and transport faults.
    #[must_use]
    pub fn on_error<F: Fn(&WsError) + Send + 'static>(mut self, handler: F) -> Self {
        self.on_error = Some(Box::new(handler));
        self
    }
}

enum Command {
    Connect,
    Send(String),
    Disconnect,
    Reconnect,
    Configure(Option<String>, Config),
}

/// Manages the lifecycle of one logical WebSocket connection.
///
/// The manager owns at most one live transport at a time and survives
/// transient failures through bounded automatic reconnection with a fixed
/// (linear) retry interval. Callers observe it through the [`EventHandlers`]
/// slots and the polled state accessors; they drive it with
/// [`connect`](Self::connect) / [`send`](Self::send) /
/// [`disconnect`](Self::disconnect) / [`reconnect`](Self::reconnect).
///
/// All transitions happen on a single driver task; the command methods
/// enqueue work and return immediately, and ordinary transport failures are
/// never returned from them. Dropping the last clone of the handle tears the
/// driver down, closing any live connection and cancelling any pending retry.
///
/// # Example
///
/// ```ignore
/// let handlers = EventHandlers::new()
///     .on_message(|text| println!("received: {text}"));
/// let manager = ConnectionManager::new(
///     Some("wss://api.safeface.io/ws/live".to_owned()),
///     Config::default(),
///     handlers,
///     Some(store),
/// )?;
/// manager.connect();
/// ```
#[derive(Clone, Debug)]
pub struct ConnectionManager {
    command_tx: mpsc::UnboundedSender<Command>,
    state_rx: watch::Receiver<ConnectionState>,
    last_message_rx: watch::Receiver<Option<String>>,
}

impl ConnectionManager {
    /// Create a new connection manager over the production WebSocket
    /// transport.
    ///
    /// `endpoint` of `None` means "no connection requested":
    /// [`connect`](Self::connect) is a logged no-op until an endpoint is
    /// supplied via [`configure`](Self::configure). The token store, when
    /// present, is read fresh on every connect attempt and the token appended
    /// to the endpoint as a `token` query parameter.
    ///
    /// No connection is attempted until [`connect`](Self::connect) is called.
    pub fn new(
        endpoint: Option<String>,
        config: Config,
        handlers: EventHandlers,
        token_store: Option<Arc<dyn TokenStore>>,
    ) -> Result<Self> {
        Self::with_connector(WsConnector, endpoint, config, handlers, token_store)
    }

    /// Create a connection manager over a custom [`Connector`].
    pub fn with_connector<C: Connector>(
        connector: C,
        endpoint: Option<String>,
        config: Config,
        handlers: EventHandlers,
        token_store: Option<Arc<dyn TokenStore>>,
    ) -> Result<Self> {
        if let Some(endpoint) = endpoint.as_deref() {
            validate_endpoint(endpoint)?;
        }

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (last_message_tx, last_message_rx) = watch::channel(None);

        let driver = Driver {
            connector: Arc::new(connector),
            endpoint,
            config,
            handlers,
            token_store,
            state_tx,
            last_message_tx,
            transport: None,
            pending_connect: None,
            reconnect_timer: None,
            attempts: 0,
            auto_reconnect: false,
            generation: 0,
        };
        tokio::spawn(driver.run(command_rx));

        Ok(Self {
            command_tx,
            state_rx,
            last_message_rx,
        })
    }

    /// Retarget the manager and replace its policy configuration.
    ///
    /// Passing `None` tears down any existing connection and suppresses
    /// reconnection. A new non-`None` endpoint takes effect on the next
    /// [`connect`](Self::connect); it does not restart a live connection.
    pub fn configure(&self, endpoint: Option<String>, config: Config) -> Result<()> {
        if let Some(endpoint) = endpoint.as_deref() {
            validate_endpoint(endpoint)?;
        }
        _ = self.command_tx.send(Command::Configure(endpoint, config));
        Ok(())
    }

    /// (Re)establish the connection.
    ///
    /// Idempotent: any in-flight attempt or live connection is abandoned
    /// first, then a fresh attempt starts. The state transitions to
    /// [`ConnectionState::Connecting`], then to `Connected` or `Error`
    /// depending on the outcome.
    pub fn connect(&self) {
        _ = self.command_tx.send(Command::Connect);
    }

    /// Serialize `message` to JSON and deliver it if currently connected.
    ///
    /// While not connected the message is dropped with a logged warning; it
    /// is never queued. The only error returned from this method is a
    /// serialization failure; transport failures surface through the
    /// [`EventHandlers::on_error`] slot instead.
    pub fn send<R: Serialize>(&self, message: &R) -> Result<()> {
        let json = serde_json::to_string(message).map_err(WsError::MessageSerialize)?;
        _ = self.command_tx.send(Command::Send(json));
        Ok(())
    }

    /// Deliver a raw text frame if currently connected.
    ///
    /// The payload passes through unmodified. Same no-queueing semantics as
    /// [`send`](Self::send).
    pub fn send_text<S: Into<String>>(&self, message: S) {
        _ = self.command_tx.send(Command::Send(message.into()));
    }

    /// Explicit manual teardown.
    ///
    /// Cancels any pending reconnect timer, disables automatic reconnection,
    /// closes the live transport if present, and transitions to
    /// [`ConnectionState::Disconnected`]. Terminal until
    /// [`connect`](Self::connect) or [`reconnect`](Self::reconnect).
    pub fn disconnect(&self) {
        _ = self.command_tx.send(Command::Disconnect);
    }

    /// Manual reconnect: disconnect, reset the attempt counter, re-enable
    /// automatic reconnection, then connect.
    pub fn reconnect(&self) {
        _ = self.command_tx.send(Command::Reconnect);
    }

    /// Get the current connection state.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Whether the connection is currently active.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection_state().is_connected()
    }

    /// The most recently received inbound payload, if any.
    ///
    /// Retained for observers that poll rather than subscribe through
    /// [`EventHandlers::on_message`].
    #[must_use]
    pub fn last_message(&self) -> Option<String> {
        self.last_message_rx.borrow().clone()
    }

    /// Subscribe to connection state changes.
    ///
    /// Returns a receiver that notifies when the connection state changes.
    /// This is useful for awaiting reconnections without busy-polling.
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }
}

fn validate_endpoint(endpoint: &str) -> Result<()> {
    let url = Url::parse(endpoint)
        .map_err(|_| Error::validation(format!("not a URL: {endpoint}")))?;
    match url.scheme() {
        "ws" | "wss" => Ok(()),
        other => Err(Error::validation(format!(
            "endpoint scheme must be ws or wss, got {other}: {endpoint}"
        ))),
    }
}

struct Driver<C: Connector> {
    connector: Arc<C>,
    endpoint: Option<String>,
    config: Config,
    handlers: EventHandlers,
    token_store: Option<Arc<dyn TokenStore>>,
    state_tx: watch::Sender<ConnectionState>,
    last_message_tx: watch::Sender<Option<String>>,
    /// The current transport. At most one is owned at a time.
    transport: Option<C::Transport>,
    /// In-flight connection attempt, if any.
    pending_connect: Option<BoxFuture<'static, std::result::Result<C::Transport, WsError>>>,
    /// Armed retry timer. Cancelled synchronously by disconnect/re-connect.
    reconnect_timer: Option<Pin<Box<Sleep>>>,
    /// Consecutive automatic attempts since the last success or manual
    /// reconnect.
    attempts: u32,
    /// Cleared by a manual disconnect until the next connect/reconnect.
    auto_reconnect: bool,
    /// Connection generation, for log correlation.
    generation: u64,
}

enum Event<T> {
    RetryElapsed,
    ConnectResolved(std::result::Result<T, WsError>),
    Frame(Option<std::result::Result<String, WsError>>),
}

enum Step<T> {
    Command(Option<Command>),
    Event(Event<T>),
}

impl<C: Connector> Driver<C> {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        loop {
            let step = tokio::select! {
                command = commands.recv() => Step::Command(command),
                event = self.next_event() => Step::Event(event),
            };
            match step {
                Step::Command(Some(command)) => self.handle_command(command).await,
                // All handles dropped: tear down like an explicit disconnect.
                Step::Command(None) => break,
                Step::Event(event) => self.handle_event(event).await,
            }
        }

        if let Some(mut transport) = self.transport.take() {
            transport.close().await;
        }
    }

    /// Wait for the next transport event, connect resolution, or retry tick.
    ///
    /// Pends forever when nothing is armed; the command channel in `run` is
    /// the only wakeup in that case.
    async fn next_event(&mut self) -> Event<C::Transport> {
        tokio::select! {
            () = wait_timer(&mut self.reconnect_timer) => Event::RetryElapsed,
            result = wait_connect(&mut self.pending_connect) => Event::ConnectResolved(result),
            frame = wait_frame(&mut self.transport) => Event::Frame(frame),
        }
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect => self.start_connect().await,
            Command::Send(text) => self.send_frame(text).await,
            Command::Disconnect => self.teardown().await,
            Command::Reconnect => {
                self.teardown().await;
                self.attempts = 0;
                self.start_connect().await;
            }
            Command::Configure(endpoint, config) => {
                self.config = config;
                self.endpoint = endpoint;
                if self.endpoint.is_none() {
                    self.teardown().await;
                }
            }
        }
    }

    async fn handle_event(&mut self, event: Event<C::Transport>) {
        match event {
            Event::RetryElapsed => {
                self.reconnect_timer = None;
                self.attempts = self.attempts.saturating_add(1);
                #[cfg(feature = "tracing")]
                tracing::debug!(attempt = self.attempts, "automatic reconnect");
                self.start_connect().await;
            }
            Event::ConnectResolved(Ok(transport)) => {
                self.attempts = 0;
                self.transport = Some(transport);
                self.set_state(ConnectionState::Connected);
                #[cfg(feature = "tracing")]
                tracing::debug!(generation = self.generation, "connection established");
                if let Some(on_open) = &self.handlers.on_open {
                    on_open();
                }
            }
            Event::ConnectResolved(Err(e)) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(generation = self.generation, error = %e, "unable to connect");
                self.set_state(ConnectionState::Error);
                if let Some(on_error) = &self.handlers.on_error {
                    on_error(&e);
                }
                // An establishment failure is not a close; the retry policy
                // is driven by close events only.
            }
            Event::Frame(Some(Ok(text))) => {
                #[cfg(feature = "tracing")]
                tracing::trace!(len = text.len(), "received text frame");
                _ = self.last_message_tx.send(Some(text.clone()));
                if let Some(on_message) = &self.handlers.on_message {
                    on_message(&text);
                }
            }
            Event::Frame(Some(Err(e))) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(generation = self.generation, error = %e, "transport fault");
                self.set_state(ConnectionState::Error);
                if let Some(on_error) = &self.handlers.on_error {
                    on_error(&e);
                }
                // Keep polling: the close, if one follows, drives the retry.
            }
            Event::Frame(None) => {
                self.transport = None;
                self.set_state(ConnectionState::Disconnected);
                if let Some(on_close) = &self.handlers.on_close {
                    on_close();
                }
                self.schedule_retry();
            }
        }
    }

    /// Abandon whatever connection exists and begin a fresh attempt.
    async fn start_connect(&mut self) {
        let Some(endpoint) = self.endpoint.clone() else {
            #[cfg(feature = "tracing")]
            tracing::warn!("connect requested without a configured endpoint");
            return;
        };

        self.reconnect_timer = None;
        self.pending_connect = None;
        if let Some(mut transport) = self.transport.take() {
            // Superseded handle: closed without firing on_close so its events
            // cannot masquerade as the new connection's.
            transport.close().await;
        }
        self.auto_reconnect = true;

        let url = match self.connect_url(&endpoint) {
            Ok(url) => url,
            Err(e) => {
                self.set_state(ConnectionState::Error);
                if let Some(on_error) = &self.handlers.on_error {
                    on_error(&e);
                }
                return;
            }
        };

        self.generation = self.generation.saturating_add(1);
        self.set_state(ConnectionState::Connecting);
        #[cfg(feature = "tracing")]
        tracing::debug!(generation = self.generation, "starting connection attempt");

        let connector = Arc::clone(&self.connector);
        self.pending_connect = Some(Box::pin(async move { connector.connect(&url).await }));
    }

    /// The auth token is read fresh on every attempt; its absence is not an
    /// error.
    fn connect_url(&self, endpoint: &str) -> std::result::Result<String, WsError> {
        let mut url = Url::parse(endpoint)
            .map_err(|_| WsError::InvalidEndpoint(endpoint.to_owned()))?;
        if let Some(token) = self.token_store.as_ref().and_then(|store| store.token()) {
            url.query_pairs_mut()
                .append_pair("token", token.expose_secret());
        }
        Ok(url.into())
    }

    async fn send_frame(&mut self, text: String) {
        if !self.state().is_connected() {
            #[cfg(feature = "tracing")]
            tracing::warn!("dropping outbound message while not connected");
            return;
        }
        let Some(transport) = self.transport.as_mut() else {
            return;
        };
        if let Err(e) = transport.send(text).await {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %e, "failed to send message");
            if let Some(on_error) = &self.handlers.on_error {
                on_error(&e);
            }
        }
    }

    async fn teardown(&mut self) {
        self.reconnect_timer = None;
        self.auto_reconnect = false;
        self.pending_connect = None;
        if let Some(mut transport) = self.transport.take() {
            transport.close().await;
            if let Some(on_close) = &self.handlers.on_close {
                on_close();
            }
        }
        self.set_state(ConnectionState::Disconnected);
    }

    fn schedule_retry(&mut self) {
        if !self.auto_reconnect || !self.config.should_reconnect {
            return;
        }
        if self.attempts >= self.config.max_reconnect_attempts {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                attempts = self.attempts,
                "reconnect attempts exhausted, staying disconnected"
            );
            return;
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(delay = ?self.config.reconnect_interval, "arming reconnect timer");
        self.reconnect_timer = Some(Box::pin(sleep(self.config.reconnect_interval)));
    }

    fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    fn set_state(&self, state: ConnectionState) {
        _ = self.state_tx.send(state);
    }
}

async fn wait_timer(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer.as_mut() {
        Some(timer) => timer.as_mut().await,
        None => future::pending().await,
    }
}

async fn wait_connect<T>(
    pending: &mut Option<BoxFuture<'static, std::result::Result<T, WsError>>>,
) -> std::result::Result<T, WsError> {
    match pending.as_mut() {
        Some(attempt) => attempt.as_mut().await,
        None => future::pending().await,
    }
}

async fn wait_frame<T: Transport>(
    transport: &mut Option<T>,
) -> Option<std::result::Result<String, WsError>> {
    match transport.as_mut() {
        Some(transport) => transport.next_frame().await,
        None => future::pending().await,
    }
}
