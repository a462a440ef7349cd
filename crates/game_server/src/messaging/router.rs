//! Message routing logic for dispatching client frames to the registry.

use crate::error::ServerError;
use crate::registry::RoomRegistry;
use std::sync::Arc;
use tabletop_types::{ClientMessage, PlayerId};
use tracing::debug;

/// Parses one text frame from `player` and runs it against the registry.
///
/// The action runs on its own task and this function waits for it, so
/// frames from one connection are applied in order, while a connection that
/// drops mid-action never cancels the room mutation it started.
pub async fn route_client_message(
    text: &str,
    player: PlayerId,
    registry: &Arc<RoomRegistry>,
) -> Result<(), ServerError> {
    let message = ClientMessage::parse(text)?;
    debug!(player = %player, kind = message.kind(), "routing client message");

    let registry = registry.clone();
    tokio::spawn(async move { registry.dispatch(player, message).await })
        .await
        .map_err(|e| ServerError::Internal(format!("Action task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::Collaborators;
    use crate::config::ServerConfig;
    use crate::connection::ConnectionManager;

    fn registry() -> Arc<RoomRegistry> {
        Arc::new(RoomRegistry::new(
            ServerConfig::default(),
            Arc::new(ConnectionManager::new()),
            Collaborators::in_memory(),
        ))
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_malformed_frame_is_protocol_error() {
        let registry = registry();
        let result = route_client_message("{\"type\":\"warp\"}", PlayerId::new(), &registry).await;
        assert!(matches!(result, Err(ServerError::Protocol(_))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_lobby_frame_reaches_registry() {
        let registry = registry();
        let player = PlayerId::new();
        let frame = r#"{"type":"create_lobby","name":"table","settings":{"kind":"game","seats":2}}"#;
        route_client_message(frame, player, &registry).await.unwrap();
        assert_eq!(registry.lobby_count(), 1);
        assert!(registry.room_of(player).is_some());
    }
}
