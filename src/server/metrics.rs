//! Process-wide counters rendered as Prometheus text at `/metrics`. Every
//! counter is updated from the call sites that already decide the event
//! happened — no separate collection pass, matching how the teacher's
//! `ServerMetrics` is threaded through the connection/room lifecycle rather
//! than sampled after the fact.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct ServerMetrics {
    connections_total: AtomicU64,
    connections_active: AtomicU64,
    rooms_created_total: AtomicU64,
    rooms_finished_total: AtomicU64,
    moves_total: AtomicU64,
    matches_total: AtomicU64,
    errors_total: AtomicU64,
}

impl ServerMetrics {
    pub fn connection_opened(&self) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
        self.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.connections_active.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn room_created(&self) {
        self.rooms_created_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn room_finished(&self) {
        self.rooms_finished_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn move_played(&self) {
        self.moves_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn match_made(&self) {
        self.matches_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn error_sent(&self) {
        self.errors_total.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn render_prometheus(&self, rooms_active: usize) -> String {
        let mut buf = String::new();
        counter(
            &mut buf,
            "chess_room_connections_total",
            "Total WebSocket connections accepted since startup",
            self.connections_total.load(Ordering::Relaxed),
        );
        gauge(
            &mut buf,
            "chess_room_connections_active",
            "WebSocket connections currently open",
            self.connections_active.load(Ordering::Relaxed),
        );
        gauge(
            &mut buf,
            "chess_room_rooms_active",
            "Rooms currently tracked (waiting, playing, or awaiting cleanup)",
            rooms_active as u64,
        );
        counter(
            &mut buf,
            "chess_room_rooms_created_total",
            "Total rooms created since startup",
            self.rooms_created_total.load(Ordering::Relaxed),
        );
        counter(
            &mut buf,
            "chess_room_rooms_finished_total",
            "Total rooms that reached a terminal outcome since startup",
            self.rooms_finished_total.load(Ordering::Relaxed),
        );
        counter(
            &mut buf,
            "chess_room_moves_total",
            "Total moves successfully applied since startup",
            self.moves_total.load(Ordering::Relaxed),
        );
        counter(
            &mut buf,
            "chess_room_matchmaker_matches_total",
            "Total matchmaker pairings made since startup",
            self.matches_total.load(Ordering::Relaxed),
        );
        counter(
            &mut buf,
            "chess_room_errors_total",
            "Total error frames sent to clients since startup",
            self.errors_total.load(Ordering::Relaxed),
        );
        buf
    }
}

fn counter(buf: &mut String, name: &str, help: &str, value: u64) {
    let _ = writeln!(buf, "# HELP {name} {help}");
    let _ = writeln!(buf, "# TYPE {name} counter");
    let _ = writeln!(buf, "{name} {value}");
}

fn gauge(buf: &mut String, name: &str, help: &str, value: u64) {
    let _ = writeln!(buf, "# HELP {name} {help}");
    let _ = writeln!(buf, "# TYPE {name} gauge");
    let _ = writeln!(buf, "{name} {value}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_seeded_counters() {
        let metrics = ServerMetrics::default();
        metrics.connection_opened();
        metrics.connection_opened();
        metrics.connection_closed();
        metrics.room_created();
        metrics.move_played();
        metrics.match_made();
        metrics.error_sent();

        let rendered = metrics.render_prometheus(1);
        assert!(rendered.contains("chess_room_connections_total 2"));
        assert!(rendered.contains("chess_room_connections_active 1"));
        assert!(rendered.contains("chess_room_rooms_active 1"));
        assert!(rendered.contains("chess_room_rooms_created_total 1"));
        assert!(rendered.contains("chess_room_moves_total 1"));
        assert!(rendered.contains("chess_room_matchmaker_matches_total 1"));
        assert!(rendered.contains("chess_room_errors_total 1"));
    }

    #[test]
    fn active_connections_can_return_to_zero() {
        let metrics = ServerMetrics::default();
        metrics.connection_opened();
        metrics.connection_closed();
        assert!(metrics.render_prometheus(0).contains("chess_room_connections_active 0"));
    }
}
