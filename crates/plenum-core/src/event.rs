//! Events emitted by the change synchronizer.
//!
//! A cycle (initial fill or incremental update) is materialized as an ordered
//! stream of events. Within one cycle a given fqid appears at most once; the
//! synchronizer coalesces the change-log to the latest operation per entity
//! before emitting.

use crate::fqid;
use crate::value::RowMap;

/// One observed change to a source entity.
#[derive(Debug, Clone)]
pub enum Event {
    /// The entity is new (initial fill, or an `insert` log entry).
    Added {
        /// Collection name.
        collection: String,
        /// Row id.
        id: i32,
        /// Current row content.
        row: RowMap,
    },
    /// The entity changed (an `update` log entry).
    Changed {
        /// Collection name.
        collection: String,
        /// Row id.
        id: i32,
        /// Current row content.
        row: RowMap,
    },
    /// The entity was deleted.
    Removed {
        /// Collection name.
        collection: String,
        /// Row id.
        id: i32,
    },
}

impl Event {
    /// Collection the event belongs to.
    pub fn collection(&self) -> &str {
        match self {
            Event::Added { collection, .. }
            | Event::Changed { collection, .. }
            | Event::Removed { collection, .. } => collection,
        }
    }

    /// Row id the event belongs to.
    pub fn id(&self) -> i32 {
        match self {
            Event::Added { id, .. } | Event::Changed { id, .. } | Event::Removed { id, .. } => *id,
        }
    }

    /// FQID of the affected entity.
    pub fn fqid(&self) -> String {
        fqid::join(self.collection(), self.id())
    }

    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Event::Added { .. } => "added",
            Event::Changed { .. } => "changed",
            Event::Removed { .. } => "removed",
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_fqid() {
        let event = Event::Removed {
            collection: "topic".to_string(),
            id: 2,
        };
        assert_eq!(event.fqid(), "topic/2");
        assert_eq!(event.collection(), "topic");
        assert_eq!(event.id(), 2);
        assert_eq!(event.label(), "removed");
    }
}
