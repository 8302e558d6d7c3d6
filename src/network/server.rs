//! WebSocket Grid Server
//!
//! Async WebSocket server for viewers and the admin.
//! Every connection gets the current grid on connect, then every committed
//! update. Admin commands on the same socket go through the hub.

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, instrument, warn};

use crate::core::digest::token_fingerprint;
use crate::error::GridError;
use crate::network::hub::GridHub;
use crate::network::protocol::{
    ClientMessage, ErrorCode, LoginResult, MutationRequest, ServerError, ServerMessage,
};

/// How long a closing connection may take to flush its queue.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Outgoing messages queued per connection.
    pub outbound_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 3000),
            max_connections: 1000,
            outbound_buffer: 64,
        }
    }
}

impl ServerConfig {
    /// Create config from environment variables (`BIND_ADDR`, `PORT`,
    /// `MAX_CONNECTIONS`). Unparseable values fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let ip = env_parse::<IpAddr>("BIND_ADDR").unwrap_or(defaults.bind_addr.ip());
        let port = env_parse::<u16>("PORT").unwrap_or(defaults.bind_addr.port());

        Self {
            bind_addr: SocketAddr::new(ip, port),
            max_connections: env_parse("MAX_CONNECTIONS").unwrap_or(defaults.max_connections),
            ..defaults
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring unparseable {}={:?}", key, raw);
            None
        }
    }
}

/// Grid server errors.
#[derive(Debug, thiserror::Error)]
pub enum GridServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Connected client state.
#[derive(Default)]
struct ConnectedClient {
    /// Admin token attached by login or authenticate.
    token: Option<String>,
}

type ClientMap = Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>;

/// The grid server.
pub struct GridServer {
    /// Server configuration.
    config: ServerConfig,
    /// Shared state, auth and broadcast.
    hub: Arc<GridHub>,
    /// Connected clients.
    clients: ClientMap,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl GridServer {
    /// Create a new grid server.
    pub fn new(config: ServerConfig, hub: Arc<GridHub>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            hub,
            clients: Arc::new(RwLock::new(BTreeMap::new())),
            shutdown_tx,
        }
    }

    /// Bind the configured address and run until shutdown.
    pub async fn run(&self) -> Result<(), GridServerError> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Accept connections on an already bound listener until shutdown.
    #[instrument(skip(self, listener))]
    pub async fn serve(&self, listener: TcpListener) -> Result<(), GridServerError> {
        info!("Grid server listening on {}", listener.local_addr()?);

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let clients_count = self.clients.read().await.len();
                            if clients_count >= self.config.max_connections {
                                warn!("Connection limit reached, rejecting {}", addr);
                                continue;
                            }

                            info!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let clients = self.clients.clone();
        let hub = self.hub.clone();
        let outbound_buffer = self.config.outbound_buffer;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(outbound_buffer);

            // Register client
            {
                let mut clients = clients.write().await;
                clients.insert(addr, ConnectedClient::default());
            }

            // Spawn message sender task
            let mut sender_task = tokio::spawn(async move {
                while let Some(msg) = msg_rx.recv().await {
                    let text = match msg.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize message: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                let _ = ws_sender.close().await;
            });

            // Subscribe before the first snapshot so no update falls in between
            let mut updates = hub.subscribe();
            let _ = msg_tx.send(ServerMessage::State(hub.snapshot().await)).await;

            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                let client_msg = match ClientMessage::from_json(&text) {
                                    Ok(m) => m,
                                    Err(e) => {
                                        debug!("Invalid message from {}: {}", addr, e);
                                        let _ = msg_tx.send(ServerMessage::Error(ServerError {
                                            code: ErrorCode::InvalidMessage,
                                            message: "Invalid message format".to_string(),
                                        })).await;
                                        continue;
                                    }
                                };

                                Self::handle_client_message(addr, client_msg, &clients, &hub, &msg_tx).await;
                            }
                            Some(Ok(Message::Binary(_))) => {
                                let _ = msg_tx.send(ServerMessage::Error(ServerError {
                                    code: ErrorCode::InvalidMessage,
                                    message: "Binary frames are not supported".to_string(),
                                })).await;
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Client {} disconnected", addr);
                                break;
                            }
                            Some(Err(e)) => {
                                error!("WebSocket error for {}: {}", addr, e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    update = updates.recv() => {
                        let state = match update {
                            Ok(state) => (*state).clone(),
                            Err(RecvError::Lagged(skipped)) => {
                                debug!("Client {} lagged", addr);
                                hub.resync(&mut updates, skipped).await
                            }
                            Err(RecvError::Closed) => break,
                        };
                        if msg_tx.send(ServerMessage::StateUpdated(state)).await.is_err() {
                            break;
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        let _ = msg_tx.send(ServerMessage::Shutdown {
                            reason: "Server shutting down".to_string(),
                        }).await;
                        break;
                    }
                }
            }

            // Let queued messages drain, then stop the writer
            drop(msg_tx);
            if tokio::time::timeout(FLUSH_TIMEOUT, &mut sender_task).await.is_err() {
                sender_task.abort();
            }

            // Remove client
            clients.write().await.remove(&addr);

            info!("Client {} cleaned up", addr);
        });
    }

    /// Handle a client message.
    async fn handle_client_message(
        addr: SocketAddr,
        msg: ClientMessage,
        clients: &ClientMap,
        hub: &Arc<GridHub>,
        sender: &mpsc::Sender<ServerMessage>,
    ) {
        let msg = match msg.into_mutation() {
            Ok(request) => {
                Self::handle_mutation(addr, request, clients, hub, sender).await;
                return;
            }
            Err(other) => other,
        };

        match msg {
            ClientMessage::GetState => {
                let _ = sender.send(ServerMessage::State(hub.snapshot().await)).await;
            }
            ClientMessage::Login(req) => {
                let reply = match hub.login(&req.identity, &req.secret) {
                    Ok(issued) => {
                        Self::set_token(addr, clients, Some(issued.token.clone())).await;
                        info!(
                            "Admin {} logged in from {} (token {})",
                            issued.claims.sub,
                            addr,
                            token_fingerprint(&issued.token)
                        );
                        ServerMessage::LoginResult(LoginResult {
                            identity: issued.claims.sub,
                            token: issued.token,
                            expires_at: issued.claims.exp,
                        })
                    }
                    Err(e) => ServerMessage::error(&e),
                };
                let _ = sender.send(reply).await;
            }
            ClientMessage::Authenticate { token } => {
                let reply = match hub.verify(&token) {
                    Ok(claims) => {
                        debug!("Client {} attached token {}", addr, token_fingerprint(&token));
                        Self::set_token(addr, clients, Some(token)).await;
                        ServerMessage::Authenticated {
                            identity: claims.sub,
                            expires_at: claims.exp,
                        }
                    }
                    Err(e) => ServerMessage::error(&e),
                };
                let _ = sender.send(reply).await;
            }
            ClientMessage::Logout => {
                Self::set_token(addr, clients, None).await;
                let _ = sender.send(ServerMessage::LoggedOut).await;
            }
            ClientMessage::Ping { timestamp } => {
                let _ = sender.send(ServerMessage::Pong {
                    timestamp,
                    server_time: u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0),
                }).await;
            }
            other => {
                debug!("Unhandled message type from {}: {:?}", addr, other);
            }
        }
    }

    /// Run an admin mutation with the connection's token.
    async fn handle_mutation(
        addr: SocketAddr,
        request: MutationRequest,
        clients: &ClientMap,
        hub: &Arc<GridHub>,
        sender: &mpsc::Sender<ServerMessage>,
    ) {
        let token = {
            let clients = clients.read().await;
            clients.get(&addr).and_then(|c| c.token.clone())
        };
        let operation = request.operation();

        let reply = match hub.execute(token.as_deref(), request).await {
            Ok(committed) => ServerMessage::MutationApplied {
                operation: committed.event.operation().to_string(),
                state: committed.state,
            },
            Err(e) => {
                match &e {
                    GridError::StorageFailure(_) => warn!("{} from {} failed: {}", operation, addr, e),
                    _ => debug!("{} from {} rejected: {}", operation, addr, e),
                }
                // Drop a token that no longer verifies
                if e.is_unauthorized() && token.is_some() {
                    Self::set_token(addr, clients, None).await;
                }
                ServerMessage::error(&e)
            }
        };
        let _ = sender.send(reply).await;
    }

    async fn set_token(addr: SocketAddr, clients: &ClientMap, token: Option<String>) {
        let mut clients = clients.write().await;
        if let Some(client) = clients.get_mut(&addr) {
            client.token = token;
        }
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get active connection count.
    pub async fn connection_count(&self) -> usize {
        self.clients.read().await.len()
    }
}
