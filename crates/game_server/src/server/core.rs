//! Core game server implementation.
//!
//! `GameServer` owns the connection manager and the room registry, binds the
//! listening socket, runs the accept loop and the idle reaper, and drains
//! everything when shutdown is signalled.

use crate::collaborators::Collaborators;
use crate::config::ServerConfig;
use crate::connection::ConnectionManager;
use crate::error::ServerError;
use crate::reaper::spawn_reaper;
use crate::registry::RoomRegistry;
use crate::server::handlers::handle_connection;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::TcpListener as StdTcpListener;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{debug, error, info};

pub struct GameServer {
    /// Server configuration settings
    config: ServerConfig,

    /// Live websocket connections keyed by connection and player
    connections: Arc<ConnectionManager>,

    /// Every lobby, session and draft
    registry: Arc<RoomRegistry>,

    /// Channel for coordinating server shutdown
    shutdown_sender: broadcast::Sender<()>,
}

impl GameServer {
    pub fn new(config: ServerConfig, collaborators: Collaborators) -> Self {
        let connections = Arc::new(ConnectionManager::new());
        let registry = Arc::new(RoomRegistry::new(config.clone(), connections.clone(), collaborators));
        let (shutdown_sender, _) = broadcast::channel(1);
        Self { config, connections, registry, shutdown_sender }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn registry(&self) -> Arc<RoomRegistry> {
        self.registry.clone()
    }

    pub fn connections(&self) -> Arc<ConnectionManager> {
        self.connections.clone()
    }

    /// A sender other tasks can use to stop the server.
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_sender.clone()
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_sender.send(());
    }

    /// Creates the listening socket with address reuse enabled.
    pub fn bind(&self) -> Result<TcpListener, ServerError> {
        let address = self.config.bind_address;
        let socket = Socket::new(Domain::for_address(address), Type::STREAM, Some(Protocol::TCP))
            .map_err(|e| ServerError::Network(format!("Socket creation failed: {e}")))?;
        socket.set_reuse_address(true).ok();

        socket
            .bind(&address.into())
            .map_err(|e| ServerError::Network(format!("Bind failed: {e}")))?;
        socket
            .listen(1024)
            .map_err(|e| ServerError::Network(format!("Listen failed: {e}")))?;

        let std_listener: StdTcpListener = socket.into();
        std_listener
            .set_nonblocking(true)
            .map_err(|e| ServerError::Network(format!("Failed to set non-blocking: {e}")))?;
        TcpListener::from_std(std_listener)
            .map_err(|e| ServerError::Network(format!("Tokio listener creation failed: {e}")))
    }

    /// Binds and serves until shutdown.
    pub async fn start(&self) -> Result<(), ServerError> {
        let listener = self.bind()?;
        self.serve(listener).await
    }

    /// Accepts connections on `listener` until shutdown is signalled, then
    /// drains the registry.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        let local = listener
            .local_addr()
            .map_err(|e| ServerError::Network(format!("Listener has no local address: {e}")))?;
        info!("🚀 Starting game server on {}", local);

        let mut shutdown_receiver = self.shutdown_sender.subscribe();
        let reaper = spawn_reaper(
            self.registry.clone(),
            self.config.reap_interval(),
            self.shutdown_sender.subscribe(),
        );

        let accept_loop = async {
            loop {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        stream.set_nodelay(true).ok();
                        let connections = self.connections.clone();
                        let registry = self.registry.clone();
                        let max_connections = self.config.max_connections;
                        tokio::spawn(async move {
                            if let Err(e) =
                                handle_connection(stream, addr, connections, registry, max_connections).await
                            {
                                debug!("Connection error: {}", e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                        break;
                    }
                }
            }
        };

        tokio::select! {
            _ = accept_loop => {}
            _ = shutdown_receiver.recv() => {
                info!("🛑 Shutdown signal received");
            }
        }

        info!("🧹 Performing server cleanup...");
        self.registry.shutdown().await;
        if let Some(reaper) = reaper {
            reaper.abort();
        }
        info!("✅ Server stopped");
        Ok(())
    }
}
