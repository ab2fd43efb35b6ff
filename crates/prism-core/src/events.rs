//! Events emitted during a refinement run.
//!
//! One bounded stream per request; the transport serializes these records
//! for clients. Ordering guarantees: classification first, every specialist
//! result before moderation starts, `final_answer` before the terminal
//! event. Specialist results arrive in completion order.

use prism_memory::{ConversationEntry, QueryKind, RouteDecision, SpecialistRole};
use serde::Serialize;

/// Events emitted during orchestrator execution.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RefineEvent {
    /// Classifier verdict
    Classification {
        /// Detected query kind
        query_kind: QueryKind,
        /// Whether the thread already had entries
        is_followup: bool,
    },
    /// Execution plan selected by the supervisor (full pipeline only)
    SupervisorPlan {
        /// Chosen route
        route: RouteDecision,
        /// Specialists about to run
        roles: Vec<SpecialistRole>,
    },
    /// A specialist was dispatched
    SpecialistStart {
        /// Role being dispatched
        role: SpecialistRole,
    },
    /// A specialist finished; emitted in completion order
    SpecialistResult {
        /// Role that finished
        role: SpecialistRole,
        /// Analysis text
        content: String,
    },
    /// The moderation pass started
    ModeratorStart,
    /// The moderation pass finished
    ModeratorResult {
        /// Consolidated text
        content: String,
    },
    /// The user-visible answer is ready
    FinalAnswer {
        /// Consolidated answer text
        content: String,
    },
    /// The entry was persisted; terminal
    Complete {
        /// Persisted conversation entry
        entry: ConversationEntry,
    },
    /// The run was cancelled; terminal, nothing persisted
    Cancelled,
    /// The run failed; terminal
    Error {
        /// Stable error kind (`invalid_input`, `timeout`, ...)
        kind: String,
        /// Human-readable message
        message: String,
    },
}

impl RefineEvent {
    /// Whether this event terminates the stream.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RefineEvent::Complete { .. } | RefineEvent::Cancelled | RefineEvent::Error { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_serialize_with_type_tag() {
        let json = serde_json::to_value(RefineEvent::Classification {
            query_kind: QueryKind::Revenue,
            is_followup: true,
        })
        .unwrap();
        assert_eq!(json["type"], "classification");
        assert_eq!(json["query_kind"], "revenue");
        assert_eq!(json["is_followup"], true);

        let json = serde_json::to_value(RefineEvent::ModeratorStart).unwrap();
        assert_eq!(json["type"], "moderator_start");

        let json = serde_json::to_value(RefineEvent::SpecialistResult {
            role: SpecialistRole::UxUi,
            content: "text".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "specialist_result");
        assert_eq!(json["role"], "ux_ui");
    }

    #[test]
    fn test_terminal_events() {
        assert!(RefineEvent::Cancelled.is_terminal());
        assert!(RefineEvent::Error {
            kind: "timeout".to_string(),
            message: "m".to_string()
        }
        .is_terminal());
        assert!(!RefineEvent::ModeratorStart.is_terminal());
    }
}
