//! Per-connection websocket handling.

use crate::connection::{ConnectionManager, Outbound};
use crate::error::ServerError;
use crate::messaging::route_client_message;
use crate::registry::RoomRegistry;
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tabletop_types::PlayerId;
use tokio::net::TcpStream;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Reads `player=<uuid>` from a handshake query string.
pub fn player_from_query(query: Option<&str>) -> Option<PlayerId> {
    query?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "player")
        .and_then(|(_, value)| Uuid::parse_str(value).ok())
        .map(PlayerId)
}

/// Drives one websocket from handshake to close.
///
/// The identity frame is always queued first, followed by the player's
/// current room state. Inbound text frames are applied strictly in order.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    connections: Arc<ConnectionManager>,
    registry: Arc<RoomRegistry>,
    max_connections: usize,
) -> Result<(), ServerError> {
    let mut requested = None;
    let ws_stream = accept_hdr_async(stream, |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        requested = player_from_query(request.uri().query());
        Ok(response)
    })
    .await
    .map_err(|e| ServerError::Network(format!("WebSocket handshake failed for {addr}: {e}")))?;

    let (mut sink, mut stream) = ws_stream.split();

    if connections.connection_count() >= max_connections {
        warn!("Refusing connection from {}: limit of {} reached", addr, max_connections);
        let frame = CloseFrame { code: CloseCode::Again, reason: "server full".into() };
        let _ = sink.send(Message::Close(Some(frame))).await;
        return Ok(());
    }

    let player = requested.unwrap_or_default();
    let (connection_id, mut outbound) = connections.add_connection(player, Some(addr));
    info!("👋 Player {} connected from {}", player, addr);

    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            match frame {
                Outbound::Message(message) => {
                    let text = match serde_json::to_string(&message) {
                        Ok(text) => text,
                        Err(e) => {
                            error!("Failed to serialize outbound message: {}", e);
                            continue;
                        }
                    };
                    if let Err(e) = sink.send(Message::text(text)).await {
                        debug!("Send failed, stopping writer: {}", e);
                        break;
                    }
                }
                Outbound::Close { reason } => {
                    let frame = CloseFrame { code: CloseCode::Normal, reason: reason.into() };
                    let _ = sink.send(Message::Close(Some(frame))).await;
                    break;
                }
            }
        }
        let _ = sink.close().await;
    });

    registry.on_connect(player).await;

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                connections.touch(connection_id);
                match route_client_message(text.as_str(), player, &registry).await {
                    Ok(()) => {}
                    Err(ServerError::Protocol(e)) => {
                        debug!("Dropping malformed message from {}: {}", player, e);
                    }
                    Err(e) => warn!("Action from {} failed: {}", player, e),
                }
            }
            Ok(Message::Close(_)) => {
                debug!("Player {} requested close", player);
                break;
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => connections.touch(connection_id),
            Ok(_) => warn!("Received unsupported message type from {}", player),
            Err(e) => {
                debug!("WebSocket error for player {}: {}", player, e);
                break;
            }
        }
    }

    connections.remove_connection(connection_id);
    if let Err(e) = writer.await {
        error!("Writer task for player {} failed: {}", player, e);
    }
    info!("👋 Player {} disconnected", player);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_from_query() {
        let id = Uuid::new_v4();
        assert_eq!(player_from_query(Some(&format!("player={id}"))), Some(PlayerId(id)));
        assert_eq!(player_from_query(Some(&format!("room=abc&player={id}"))), Some(PlayerId(id)));
        assert_eq!(player_from_query(Some("player=not-a-uuid")), None);
        assert_eq!(player_from_query(None), None);
    }
}
