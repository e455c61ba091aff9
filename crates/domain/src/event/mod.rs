use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod publisher;
#[cfg(test)]
pub use publisher::MockEventPublisher;
pub use publisher::EventPublisher;

use crate::plug::StateSnapshot;

/// Domain events emitted by plugs toward the gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DomainEvent {
    /// Plug acquired its hardware interface and started its session
    PlugStarted {
        device_id: String,
        snapshot: StateSnapshot,
        timestamp: DateTime<Utc>,
    },

    /// Plug power state changed
    PlugStateChanged {
        device_id: String,
        snapshot: StateSnapshot,
        timestamp: DateTime<Utc>,
    },

    /// Plug stopped (shutdown requested or gateway gave up)
    PlugStopped {
        device_id: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

impl DomainEvent {
    /// Create a PlugStarted event
    pub fn plug_started(device_id: impl Into<String>, snapshot: StateSnapshot) -> Self {
        Self::PlugStarted {
            device_id: device_id.into(),
            snapshot,
            timestamp: Utc::now(),
        }
    }

    /// Create a PlugStateChanged event
    pub fn plug_state_changed(device_id: impl Into<String>, snapshot: StateSnapshot) -> Self {
        Self::PlugStateChanged {
            device_id: device_id.into(),
            snapshot,
            timestamp: Utc::now(),
        }
    }

    /// Create a PlugStopped event
    pub fn plug_stopped(device_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PlugStopped {
            device_id: device_id.into(),
            reason: reason.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn device_id(&self) -> &str {
        match self {
            Self::PlugStarted { device_id, .. } => device_id,
            Self::PlugStateChanged { device_id, .. } => device_id,
            Self::PlugStopped { device_id, .. } => device_id,
        }
    }

    /// State carried by the event, if any
    pub fn snapshot(&self) -> Option<&StateSnapshot> {
        match self {
            Self::PlugStarted { snapshot, .. } => Some(snapshot),
            Self::PlugStateChanged { snapshot, .. } => Some(snapshot),
            Self::PlugStopped { .. } => None,
        }
    }

    /// Get the event type as string
    pub fn event_type(&self) -> &str {
        match self {
            Self::PlugStarted { .. } => "PlugStarted",
            Self::PlugStateChanged { .. } => "PlugStateChanged",
            Self::PlugStopped { .. } => "PlugStopped",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plug::PowerState;

    fn snapshot(power_state: PowerState) -> StateSnapshot {
        StateSnapshot {
            power_state,
            lock_duration: 100,
        }
    }

    #[test]
    fn test_plug_state_changed_event() {
        let event = DomainEvent::plug_state_changed("plug-1", snapshot(PowerState::OnLocked));

        assert_eq!(event.event_type(), "PlugStateChanged");
        assert_eq!(event.device_id(), "plug-1");
        assert_eq!(
            event.snapshot().map(|s| s.power_state),
            Some(PowerState::OnLocked)
        );
    }

    #[test]
    fn test_plug_stopped_has_no_snapshot() {
        let event = DomainEvent::plug_stopped("plug-1", "shutdown requested");

        assert_eq!(event.event_type(), "PlugStopped");
        assert!(event.snapshot().is_none());
        match event {
            DomainEvent::PlugStopped { reason, .. } => assert_eq!(reason, "shutdown requested"),
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn test_event_serialization() {
        let event = DomainEvent::plug_started("plug-1", snapshot(PowerState::Off));

        let json_str = serde_json::to_string(&event).unwrap();
        let deserialized: DomainEvent = serde_json::from_str(&json_str).unwrap();

        assert_eq!(deserialized.event_type(), "PlugStarted");
        assert_eq!(deserialized.snapshot(), Some(&snapshot(PowerState::Off)));
    }
}
