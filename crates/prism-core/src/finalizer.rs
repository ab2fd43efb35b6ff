//! Finalizer
//!
//! Assembles the `ConversationEntry` for a finished run and commits it. The
//! commit is the only write path into memory; it is atomic per entry and
//! never runs for cancelled or failed requests.

use crate::classifier::Classification;
use crate::error::Result;
use chrono::Utc;
use prism_memory::{ConversationEntry, MemoryStore, RouteDecision, SpecialistRole};
use std::collections::BTreeMap;
use tracing::debug;
use uuid::Uuid;

/// Output of a completed execution plan, before persistence.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Outputs of the roles that succeeded
    pub specialist_outputs: BTreeMap<SpecialistRole, String>,
    /// Moderator text, when a moderation pass ran
    pub moderator_output: Option<String>,
    /// Extracted user-visible answer
    pub final_answer: String,
}

/// Build the entry to persist.
#[must_use]
pub fn build_entry(
    thread_id: &str,
    user_query: &str,
    classification: &Classification,
    route: RouteDecision,
    outcome: RunOutcome,
    processing_time_ms: u64,
) -> ConversationEntry {
    ConversationEntry {
        entry_id: Uuid::new_v4().to_string(),
        thread_id: thread_id.to_string(),
        timestamp: Utc::now(),
        user_query: user_query.to_string(),
        query_kind: classification.query_kind,
        is_followup: classification.is_followup,
        processing_time_ms,
        specialist_outputs: outcome.specialist_outputs,
        moderator_output: outcome.moderator_output,
        final_answer: outcome.final_answer,
        route_decision: route,
        duplicate: false,
    }
}

/// Commit one entry. Returns the stored entry, duplicate tag applied.
pub async fn commit(
    store: &dyn MemoryStore,
    entry: ConversationEntry,
) -> Result<ConversationEntry> {
    let stored = store.append(entry).await?;
    debug!(
        entry_id = %stored.entry_id,
        thread_id = %stored.thread_id,
        route = %stored.route_decision,
        duplicate = stored.duplicate,
        "Conversation entry committed"
    );
    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_memory::{InMemoryStore, QueryKind, ShortcutTarget};

    #[tokio::test]
    async fn test_build_and_commit_shortcut_entry() {
        let store = InMemoryStore::new();
        let classification = Classification {
            query_kind: QueryKind::Revenue,
            is_followup: true,
            shortcut_target: Some(ShortcutTarget::Specialist(SpecialistRole::Revenue)),
        };
        let mut outputs = BTreeMap::new();
        outputs.insert(SpecialistRole::Revenue, "revenue text".to_string());

        let entry = build_entry(
            "t1",
            "pricing?",
            &classification,
            RouteDecision::Shortcut(ShortcutTarget::Specialist(SpecialistRole::Revenue)),
            RunOutcome {
                specialist_outputs: outputs,
                moderator_output: None,
                final_answer: "revenue text".to_string(),
            },
            120,
        );

        assert!(!entry.final_answer.is_empty());
        assert_eq!(entry.specialist_outputs.len(), 1);
        assert!(entry.moderator_output.is_none());

        let stored = commit(&store, entry).await.unwrap();
        let listed = store.list("t1", 1).await.unwrap();
        assert_eq!(listed[0].entry_id, stored.entry_id);
    }
}
