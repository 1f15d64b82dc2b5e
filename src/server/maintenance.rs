//! Periodic defensive sweep. The disconnect-grace and post-game TTL
//! timers are the primary cleanup mechanism (§4.4); this loop only catches
//! rooms that somehow ended up finished without a cleanup timer armed, and
//! reports room-count gauges.

use std::sync::Arc;
use std::time::Duration;

use super::room::RoomStatus;
use super::GameServer;

impl GameServer {
    pub async fn run_maintenance_loop(self: Arc<Self>) {
        let mut interval =
            tokio::time::interval(Duration::from_secs(self.config.server.room_cleanup_interval_secs));

        loop {
            interval.tick().await;
            self.sweep_finished_rooms_without_cleanup_timer().await;
            tracing::debug!(rooms = self.room_count(), "maintenance sweep");
        }
    }

    async fn sweep_finished_rooms_without_cleanup_timer(self: &Arc<Self>) {
        let stale: Vec<_> = self
            .rooms
            .iter()
            .filter_map(|entry| {
                let handle = Arc::clone(entry.value());
                let room_id = entry.key().clone();
                Some((room_id, handle))
            })
            .collect();

        for (room_id, handle) in stale {
            let needs_arming = {
                let room = handle.lock().await;
                room.status == RoomStatus::Finished && room.cleanup_timer.is_none()
            };
            if needs_arming {
                tracing::warn!(%room_id, "finished room missing cleanup timer, arming defensively");
                self.arm_room_cleanup(room_id);
            }
        }
    }
}
