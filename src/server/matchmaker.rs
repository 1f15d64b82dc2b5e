//! Quick-match matchmaker (§4.3): one FIFO queue per time-control tag, plus
//! a wildcard `any` queue. Pairing is decided under a single lock so a
//! pop-and-pair never interleaves with another join or cancel.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;

use crate::protocol::{SessionId, TimeControl, TimeControlTag};

#[derive(Debug, thiserror::Error)]
pub enum MatchmakerError {
    #[error("Already in queue")]
    AlreadyInQueue,
}

pub struct QueueEntry {
    pub session_id: SessionId,
    pub name: String,
}

pub enum JoinOutcome {
    Matched {
        opponent: QueueEntry,
        time_control: TimeControl,
    },
    Queued {
        position: usize,
    },
}

/// Queue key: the wildcard sorts before any concrete control so a wildcard
/// scan has a stable, deterministic order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum QueueKey {
    Any,
    Control(String),
}

impl QueueKey {
    fn from_tag(tag: &TimeControlTag) -> Self {
        match tag {
            TimeControlTag::Any => QueueKey::Any,
            TimeControlTag::Control(tc) => QueueKey::Control(tc.to_string()),
        }
    }
}

struct State {
    queues: BTreeMap<QueueKey, VecDeque<QueueEntry>>,
    session_key: HashMap<SessionId, QueueKey>,
}

pub struct Matchmaker {
    state: Mutex<State>,
}

impl Matchmaker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                queues: BTreeMap::new(),
                session_key: HashMap::new(),
            }),
        }
    }

    /// Attempt to pair `entry` against the queue(s) implied by `tag`,
    /// filtering out opponents `is_live` reports as no longer connected.
    /// Enqueues `entry` itself if no live opponent is found.
    pub fn join(
        &self,
        entry: QueueEntry,
        tag: TimeControlTag,
        is_live: impl Fn(&SessionId) -> bool,
    ) -> Result<JoinOutcome, MatchmakerError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        if state.session_key.contains_key(&entry.session_id) {
            return Err(MatchmakerError::AlreadyInQueue);
        }

        let candidate_keys: Vec<QueueKey> = match &tag {
            TimeControlTag::Any => state.queues.keys().cloned().collect(),
            TimeControlTag::Control(tc) => {
                vec![QueueKey::Control(tc.to_string()), QueueKey::Any]
            }
        };

        for key in &candidate_keys {
            loop {
                let popped = state.queues.get_mut(key).and_then(VecDeque::pop_front);
                let Some(opponent) = popped else { break };
                if !is_live(&opponent.session_id) {
                    state.session_key.remove(&opponent.session_id);
                    continue;
                }
                state.session_key.remove(&opponent.session_id);
                let resolved = resolve_time_control(&tag, key);
                return Ok(JoinOutcome::Matched {
                    opponent,
                    time_control: resolved,
                });
            }
        }

        let key = QueueKey::from_tag(&tag);
        let queue = state.queues.entry(key.clone()).or_default();
        queue.push_back(entry.clone_for_queue());
        state.session_key.insert(entry.session_id, key);
        let position = queue.len();
        Ok(JoinOutcome::Queued { position })
    }

    /// Removes a session from whichever queue it's waiting in, if any.
    /// Returns `true` if it was actually queued.
    pub fn leave(&self, session_id: &SessionId) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let Some(key) = state.session_key.remove(session_id) else {
            return false;
        };
        if let Some(queue) = state.queues.get_mut(&key) {
            queue.retain(|e| &e.session_id != session_id);
        }
        true
    }
}

impl Default for Matchmaker {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueEntry {
    fn clone_for_queue(&self) -> Self {
        Self {
            session_id: self.session_id.clone(),
            name: self.name.clone(),
        }
    }
}

fn resolve_time_control(joiner_tag: &TimeControlTag, opponent_key: &QueueKey) -> TimeControl {
    match (joiner_tag, opponent_key) {
        (TimeControlTag::Control(tc), _) => *tc,
        (TimeControlTag::Any, QueueKey::Control(raw)) => {
            raw.parse().unwrap_or(TimeControl::DEFAULT)
        }
        (TimeControlTag::Any, QueueKey::Any) => TimeControl::DEFAULT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str) -> QueueEntry {
        QueueEntry {
            session_id: SessionId(id.to_string()),
            name: id.to_string(),
        }
    }

    #[test]
    fn first_joiner_queues_second_joiner_matches() {
        let mm = Matchmaker::new();
        let outcome = mm
            .join(entry("a"), TimeControlTag::Control(TimeControl::DEFAULT), |_| true)
            .unwrap();
        assert!(matches!(outcome, JoinOutcome::Queued { position: 1 }));

        let outcome = mm
            .join(entry("b"), TimeControlTag::Control(TimeControl::DEFAULT), |_| true)
            .unwrap();
        match outcome {
            JoinOutcome::Matched { opponent, .. } => assert_eq!(opponent.session_id.0, "a"),
            JoinOutcome::Queued { .. } => panic!("expected a match"),
        }
    }

    #[test]
    fn duplicate_join_is_rejected() {
        let mm = Matchmaker::new();
        mm.join(entry("a"), TimeControlTag::Any, |_| true).unwrap();
        let err = mm.join(entry("a"), TimeControlTag::Any, |_| true).unwrap_err();
        assert!(matches!(err, MatchmakerError::AlreadyInQueue));
    }

    #[test]
    fn dead_opponent_is_skipped_and_dropped_from_queue() {
        let mm = Matchmaker::new();
        mm.join(entry("a"), TimeControlTag::Any, |_| true).unwrap();

        let outcome = mm
            .join(entry("b"), TimeControlTag::Any, |id| id.0 != "a")
            .unwrap();
        assert!(matches!(outcome, JoinOutcome::Queued { .. }));

        // "a" was discarded as dead, so "b" is now alone in the queue and a
        // fresh joiner matches "b", not a resurrected "a".
        let outcome = mm.join(entry("c"), TimeControlTag::Any, |_| true).unwrap();
        match outcome {
            JoinOutcome::Matched { opponent, .. } => assert_eq!(opponent.session_id.0, "b"),
            JoinOutcome::Queued { .. } => panic!("expected a match"),
        }
    }

    #[test]
    fn wildcard_matches_concrete_queue() {
        let mm = Matchmaker::new();
        mm.join(entry("a"), TimeControlTag::Control(TimeControl::DEFAULT), |_| true)
            .unwrap();
        let outcome = mm.join(entry("b"), TimeControlTag::Any, |_| true).unwrap();
        match outcome {
            JoinOutcome::Matched {
                opponent,
                time_control,
            } => {
                assert_eq!(opponent.session_id.0, "a");
                assert_eq!(time_control, TimeControl::DEFAULT);
            }
            JoinOutcome::Queued { .. } => panic!("expected a match"),
        }
    }

    #[test]
    fn leave_removes_from_queue() {
        let mm = Matchmaker::new();
        mm.join(entry("a"), TimeControlTag::Any, |_| true).unwrap();
        assert!(mm.leave(&SessionId("a".to_string())));
        let outcome = mm.join(entry("b"), TimeControlTag::Any, |_| true).unwrap();
        assert!(matches!(outcome, JoinOutcome::Queued { .. }));
    }
}
