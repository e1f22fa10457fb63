//! Snapshot records for the beta counters and lists surface.
//!
//! These are plain data: capacity bounds are enforced by the sidecar, not
//! locally.

use serde::{Deserialize, Serialize};

use crate::proto::beta;

/// A point-in-time view of a named list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ListSnapshot {
    /// List name.
    pub name: String,
    /// Maximum number of values the list may hold.
    pub capacity: i64,
    /// Values in list order.
    pub values: Vec<String>,
}

impl ListSnapshot {
    /// Create a snapshot.
    pub fn new(name: impl Into<String>, capacity: i64, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            capacity,
            values,
        }
    }

    /// Convert the wire message.
    #[must_use]
    pub fn from_wire(list: beta::List) -> Self {
        Self::from(list)
    }

    /// Whether `value` is present.
    #[must_use]
    pub fn contains(&self, value: &str) -> bool {
        self.values.iter().any(|v| v == value)
    }

    /// The wire message for this snapshot.
    #[must_use]
    pub fn to_wire(&self) -> beta::List {
        beta::List {
            name: self.name.clone(),
            capacity: self.capacity,
            values: self.values.clone(),
        }
    }
}

impl From<beta::List> for ListSnapshot {
    fn from(list: beta::List) -> Self {
        Self {
            name: list.name,
            capacity: list.capacity,
            values: list.values,
        }
    }
}

impl From<ListSnapshot> for beta::List {
    fn from(snapshot: ListSnapshot) -> Self {
        Self {
            name: snapshot.name,
            capacity: snapshot.capacity,
            values: snapshot.values,
        }
    }
}

/// A point-in-time view of a named counter.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CounterSnapshot {
    /// Counter name.
    pub name: String,
    /// Upper bound for `count`.
    pub capacity: i64,
    /// Current value.
    pub count: i64,
}

impl CounterSnapshot {
    /// Create a snapshot.
    pub fn new(name: impl Into<String>, capacity: i64, count: i64) -> Self {
        Self {
            name: name.into(),
            capacity,
            count,
        }
    }

    /// Convert the wire message.
    #[must_use]
    pub fn from_wire(counter: beta::Counter) -> Self {
        Self::from(counter)
    }

    /// Room left before the counter reaches capacity.
    #[must_use]
    pub const fn remaining(&self) -> i64 {
        self.capacity.saturating_sub(self.count)
    }
}

impl From<beta::Counter> for CounterSnapshot {
    fn from(counter: beta::Counter) -> Self {
        Self {
            name: counter.name,
            capacity: counter.capacity,
            count: counter.count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_list_from_wire_keeps_order() {
        let wire = beta::List {
            name: "rooms".to_string(),
            capacity: 3,
            values: vec!["b".to_string(), "a".to_string()],
        };
        let snapshot = ListSnapshot::from(wire.clone());
        assert_eq!(snapshot.values, vec!["b".to_string(), "a".to_string()]);
        assert!(snapshot.contains("a"));
        assert!(!snapshot.contains("c"));
        assert_eq!(snapshot.to_wire(), wire);
    }

    #[test]
    fn test_counter_from_wire() {
        let snapshot = CounterSnapshot::from(beta::Counter {
            name: "sessions".to_string(),
            count: 4,
            capacity: 10,
        });
        assert_eq!(snapshot, CounterSnapshot::new("sessions", 10, 4));
        assert_eq!(snapshot.remaining(), 6);
    }

    #[test]
    fn test_snapshot_serializes() {
        let snapshot = ListSnapshot::new("players", 2, vec!["p1".to_string()]);
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"name": "players", "capacity": 2, "values": ["p1"]})
        );
    }
}
