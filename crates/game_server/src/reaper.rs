//! Periodic idle sweep.

use crate::registry::RoomRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

/// Spawns the reaper. Returns `None` when `period` is `None` (reaping
/// disabled); otherwise the task sweeps every `period` until `shutdown`
/// fires.
pub fn spawn_reaper(
    registry: Arc<RoomRegistry>,
    period: Option<Duration>,
    mut shutdown: broadcast::Receiver<()>,
) -> Option<JoinHandle<()>> {
    let Some(period) = period else {
        info!("⏸️ Idle reaping disabled");
        return None;
    };
    info!("🕒 Idle reaper running every {}s", period.as_secs());

    Some(tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = registry.reap().await;
                    debug!("Reaper sweep evicted {} room(s)", report.rooms.len());
                }
                _ = shutdown.recv() => {
                    debug!("Reaper stopping");
                    break;
                }
            }
        }
    }))
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
    async fn test_disabled_reaper_does_not_spawn() {
        let (sender, _) = broadcast::channel(1);
        assert!(spawn_reaper(registry(), None, sender.subscribe()).is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_reaper_stops_on_shutdown() {
        let (sender, _) = broadcast::channel(1);
        let handle = spawn_reaper(registry(), Some(Duration::from_millis(10)), sender.subscribe()).unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        sender.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
    }
}
