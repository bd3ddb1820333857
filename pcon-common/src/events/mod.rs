//! Event types and EventBus for the project constructor
//!
//! Provides the event definitions a wizard session publishes as it arbitrates
//! candidates, plus the EventBus that distributes them to subscribers.

mod step_types;

pub use step_types::{AdmissionReason, ReconcileRule, RejectionReason};

use crate::tier::SourceTier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Constructor event types
///
/// Events are broadcast via EventBus and can be serialized for whatever
/// transport the host uses. Every event carries the wizard session id for
/// correlation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConstructorEvent {
    /// A candidate overwrote a step
    CandidateAdmitted {
        session_id: Uuid,
        step: u8,
        tier: SourceTier,
        /// Tier the step held before the write (None = first fill)
        previous_tier: Option<SourceTier>,
        reason: AdmissionReason,
        timestamp: DateTime<Utc>,
    },

    /// A candidate lost arbitration (step unchanged)
    CandidateRejected {
        session_id: Uuid,
        step: u8,
        tier: SourceTier,
        current_tier: Option<SourceTier>,
        reason: RejectionReason,
        timestamp: DateTime<Utc>,
    },

    /// A step was edited by the user and is now immune to automated candidates
    StepLocked {
        session_id: Uuid,
        step: u8,
        timestamp: DateTime<Utc>,
    },

    /// A coupled step was rewritten to restore consistency
    StepReconciled {
        session_id: Uuid,
        step: u8,
        /// Tier preserved from the step's previous write
        tier: Option<SourceTier>,
        rule: ReconcileRule,
        timestamp: DateTime<Utc>,
    },

    /// A coupled step needed a rewrite but is user-locked
    SyncBlocked {
        session_id: Uuid,
        step: u8,
        rule: ReconcileRule,
        timestamp: DateTime<Utc>,
    },
}

impl ConstructorEvent {
    /// Step the event refers to
    pub fn step(&self) -> u8 {
        match self {
            Self::CandidateAdmitted { step, .. }
            | Self::CandidateRejected { step, .. }
            | Self::StepLocked { step, .. }
            | Self::StepReconciled { step, .. }
            | Self::SyncBlocked { step, .. } => *step,
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Event distribution bus for one wizard session
///
/// Wraps a tokio broadcast channel. A subscriber that falls more than
/// `capacity` events behind sees `Lagged` and skips ahead; the engine is
/// never held up by a slow listener.
///
/// Publishing never awaits, so the synchronous engine can emit without a
/// runtime. Subscribers may be sync (`try_recv`) or async (`recv().await`).
///
/// # Examples
///
/// ```
/// use pcon_common::events::{ConstructorEvent, EventBus};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(ConstructorEvent::StepLocked {
///     session_id: uuid::Uuid::new_v4(),
///     step: 4,
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert_eq!(rx.try_recv().unwrap().step(), 4);
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ConstructorEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before dropping old events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<ConstructorEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: ConstructorEvent,
    ) -> Result<usize, broadcast::error::SendError<ConstructorEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// Arbitration events are observability only; the engine never depends
    /// on anyone receiving them.
    pub fn emit_lossy(&self, event: ConstructorEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locked(step: u8) -> ConstructorEvent {
        ConstructorEvent::StepLocked {
            session_id: Uuid::new_v4(),
            step,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_emit_without_subscribers_errors() {
        let bus = EventBus::new(10);
        assert!(bus.emit(locked(1)).is_err());
        // Lossy variant must not panic
        bus.emit_lossy(locked(1));
    }

    #[test]
    fn test_subscribers_receive_in_order() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        bus.emit_lossy(locked(1));
        bus.emit_lossy(locked(2));

        assert_eq!(rx.try_recv().unwrap().step(), 1);
        assert_eq!(rx.try_recv().unwrap().step(), 2);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_dropped_subscriber_is_cleaned_up() {
        let bus = EventBus::new(10);
        let rx = bus.subscribe();
        drop(rx);
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.capacity(), 10);
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = ConstructorEvent::CandidateRejected {
            session_id: Uuid::nil(),
            step: 4,
            tier: SourceTier::EchoHistory,
            current_tier: Some(SourceTier::Template),
            reason: RejectionReason::NotHigher,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "candidate_rejected");
        assert_eq!(json["tier"], "echo_history");
        assert_eq!(json["reason"], "not_higher");
    }
}
