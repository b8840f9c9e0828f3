//! WebSocket transport to the generation service.
//!
//! [`GenerationClient`] owns at most one connection at a time. Starting a run
//! always closes the previous connection first, and every connection carries an
//! id so that frames still in flight from a superseded socket never reach the
//! session state.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use futures::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use shared::protocol::{decode_frame, ClientCommand, ServerEvent};
use tokio::{
    net::TcpStream,
    sync::{broadcast, watch, Mutex},
    task::JoinHandle,
};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::{
    error::GenerationError,
    session::{apply_event, SessionState},
    validation::GenerationRequest,
};

pub const GENERATE_PATH: &str = "/ws/generate";
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsReader = SplitStream<WsStream>;

struct ActiveConnection {
    id: u64,
    sink: WsSink,
    reader_task: JoinHandle<()>,
}

impl ActiveConnection {
    /// Closes a connection that is being replaced or shut down by the owner.
    async fn supersede(self) {
        self.reader_task.abort();
        close_sink(self.id, self.sink).await;
    }
}

async fn close_sink(id: u64, mut sink: WsSink) {
    match tokio::time::timeout(CLOSE_TIMEOUT, sink.close()).await {
        Ok(Ok(())) => debug!(connection_id = id, "generation socket closed"),
        Ok(Err(err)) => debug!(connection_id = id, "generation socket close failed: {err}"),
        Err(_) => warn!(connection_id = id, "timed out closing generation socket"),
    }
}

/// Maps the service base URL (`http(s)://host[:port]`) to the generation socket URL.
pub fn generation_ws_url(server_url: &str) -> Result<String, GenerationError> {
    let trimmed = server_url.trim().trim_end_matches('/');
    let ws_base = if let Some(rest) = trimmed.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = trimmed.strip_prefix("http://") {
        format!("ws://{rest}")
    } else if trimmed.starts_with("ws://") || trimmed.starts_with("wss://") {
        trimmed.to_string()
    } else {
        return Err(GenerationError::InvalidServerUrl(server_url.to_string()));
    };
    Ok(format!("{ws_base}{GENERATE_PATH}"))
}

#[async_trait]
pub trait GenerationHandle: Send + Sync {
    async fn start_generation(&self, request: GenerationRequest) -> Result<(), GenerationError>;
    async fn cancel_generation(&self) -> Result<bool, GenerationError>;
    async fn reset(&self);
    async fn shutdown(&self);
    fn snapshot(&self) -> Arc<SessionState>;
    fn subscribe_state(&self) -> watch::Receiver<Arc<SessionState>>;
    fn subscribe_events(&self) -> broadcast::Receiver<ServerEvent>;
}

pub struct GenerationClient {
    server_url: String,
    connection: Mutex<Option<ActiveConnection>>,
    next_connection_id: AtomicU64,
    current_connection_id: AtomicU64,
    state: watch::Sender<Arc<SessionState>>,
    events: broadcast::Sender<ServerEvent>,
}

impl GenerationClient {
    pub fn new(server_url: impl Into<String>) -> Arc<Self> {
        let (state, _) = watch::channel(Arc::new(SessionState::idle()));
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            server_url: server_url.into(),
            connection: Mutex::new(None),
            next_connection_id: AtomicU64::new(0),
            current_connection_id: AtomicU64::new(0),
            state,
            events,
        })
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub fn snapshot(&self) -> Arc<SessionState> {
        Arc::clone(&self.state.borrow())
    }

    pub fn subscribe_state(&self) -> watch::Receiver<Arc<SessionState>> {
        self.state.subscribe()
    }

    /// Events from the live connection, up to and including the terminal one.
    pub fn subscribe_events(&self) -> broadcast::Receiver<ServerEvent> {
        self.events.subscribe()
    }

    pub async fn has_connection(&self) -> bool {
        self.connection.lock().await.is_some()
    }

    pub async fn start_generation(
        self: &Arc<Self>,
        request: &GenerationRequest,
    ) -> Result<(), GenerationError> {
        let ws_url = generation_ws_url(&self.server_url)?;

        let mut slot = self.connection.lock().await;
        if let Some(previous) = slot.take() {
            info!(
                connection_id = previous.id,
                "closing previous generation connection"
            );
            previous.supersede().await;
        }

        let id = self.next_connection_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|state| {
            self.current_connection_id.store(id, Ordering::SeqCst);
            *state = Arc::new(SessionState::connecting());
        });

        let stream = match connect_async(ws_url.as_str()).await {
            Ok((stream, _)) => stream,
            Err(err) => {
                warn!(connection_id = id, url = %ws_url, "generation connect failed: {err}");
                self.update(id, SessionState::fail_transport);
                return Err(GenerationError::Connect {
                    url: ws_url,
                    reason: err.to_string(),
                });
            }
        };
        let (mut sink, reader) = stream.split();

        let command = ClientCommand::Generate {
            topic: request.topic.clone(),
            provider: request.provider,
            api_key: request.api_key.clone(),
        };
        if let Err(reason) = send_command(&mut sink, &command).await {
            warn!(connection_id = id, "failed to send generate command: {reason}");
            self.update(id, SessionState::fail_transport);
            close_sink(id, sink).await;
            return Err(GenerationError::Send {
                command: "generate",
                reason,
            });
        }

        info!(
            connection_id = id,
            provider = request.provider.as_str(),
            "generation started"
        );
        self.update(id, SessionState::start_planning);

        let reader_task = self.spawn_reader(id, reader);
        *slot = Some(ActiveConnection {
            id,
            sink,
            reader_task,
        });
        Ok(())
    }

    /// Asks the service to stop. Returns `false` when no connection is held.
    /// The session only ends once the service answers or the socket closes.
    pub async fn cancel_generation(&self) -> Result<bool, GenerationError> {
        let mut slot = self.connection.lock().await;
        let Some(active) = slot.as_mut() else {
            debug!("cancel requested without an open generation connection");
            return Ok(false);
        };
        send_command(&mut active.sink, &ClientCommand::Cancel)
            .await
            .map_err(|reason| GenerationError::Send {
                command: "cancel",
                reason,
            })?;
        info!(connection_id = active.id, "cancel requested");
        Ok(true)
    }

    /// Closes any connection and returns the session to idle.
    pub async fn reset(&self) {
        self.shutdown().await;
        let id = self.next_connection_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|state| {
            self.current_connection_id.store(id, Ordering::SeqCst);
            *state = Arc::new(SessionState::idle());
        });
    }

    /// Closes any held connection without touching the session state.
    pub async fn shutdown(&self) {
        let active = self.connection.lock().await.take();
        if let Some(active) = active {
            active.supersede().await;
        }
    }

    fn spawn_reader(self: &Arc<Self>, id: u64, mut reader: WsReader) -> JoinHandle<()> {
        let client = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(msg) = reader.next().await {
                match msg {
                    Ok(Message::Text(text)) => match decode_frame(&text) {
                        Ok(Some(event)) => client.route(id, event),
                        Ok(None) => debug!(connection_id = id, "ignoring unknown event"),
                        Err(err) => {
                            warn!(connection_id = id, "malformed generation frame: {err}");
                            client.update(id, SessionState::fail_transport);
                            break;
                        }
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(err) => {
                        warn!(connection_id = id, "generation socket error: {err}");
                        client.update(id, SessionState::fail_transport);
                        break;
                    }
                }
            }
            client.release(id).await;
        })
    }

    fn route(&self, id: u64, event: ServerEvent) {
        if self.current_connection_id.load(Ordering::SeqCst) != id {
            debug!(connection_id = id, "dropping event from superseded connection");
            return;
        }
        if self.state.borrow().phase.is_terminal() {
            debug!(connection_id = id, event = event.name(), "ignoring event after terminal phase");
            return;
        }
        debug!(connection_id = id, event = event.name(), "generation event");
        let _ = self.events.send(event.clone());
        self.update(id, |state| apply_event(state, event));
    }

    /// Publishes `transition(current)` unless `id` is no longer the live
    /// connection or the transition changed nothing.
    fn update<F>(&self, id: u64, transition: F)
    where
        F: FnOnce(&SessionState) -> SessionState,
    {
        self.state.send_if_modified(|state| {
            if self.current_connection_id.load(Ordering::SeqCst) != id {
                return false;
            }
            let next = transition(&**state);
            if next == **state {
                return false;
            }
            *state = Arc::new(next);
            true
        });
    }

    /// Drops the handle once the reader of connection `id` has finished.
    async fn release(&self, id: u64) {
        let mut slot = self.connection.lock().await;
        if slot.as_ref().map(|active| active.id) != Some(id) {
            return;
        }
        if let Some(active) = slot.take() {
            info!(connection_id = id, "generation connection closed");
            close_sink(id, active.sink).await;
        }
    }
}

async fn send_command(sink: &mut WsSink, command: &ClientCommand) -> Result<(), String> {
    let frame = command.to_frame().map_err(|err| err.to_string())?;
    sink.send(Message::Text(frame))
        .await
        .map_err(|err| err.to_string())
}

#[async_trait]
impl GenerationHandle for Arc<GenerationClient> {
    async fn start_generation(&self, request: GenerationRequest) -> Result<(), GenerationError> {
        GenerationClient::start_generation(self, &request).await
    }

    async fn cancel_generation(&self) -> Result<bool, GenerationError> {
        GenerationClient::cancel_generation(self).await
    }

    async fn reset(&self) {
        GenerationClient::reset(self).await
    }

    async fn shutdown(&self) {
        GenerationClient::shutdown(self).await
    }

    fn snapshot(&self) -> Arc<SessionState> {
        GenerationClient::snapshot(self)
    }

    fn subscribe_state(&self) -> watch::Receiver<Arc<SessionState>> {
        GenerationClient::subscribe_state(self)
    }

    fn subscribe_events(&self) -> broadcast::Receiver<ServerEvent> {
        GenerationClient::subscribe_events(self)
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
