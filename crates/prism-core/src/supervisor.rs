//! Supervisor
//!
//! Translates a classifier verdict into an execution plan. Stateless; reads
//! no memory.

use crate::classifier::Classification;
use prism_memory::{RouteDecision, ShortcutTarget, SpecialistRole};

/// Execution plan for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    /// Route recorded on the persisted entry
    pub route: RouteDecision,
    /// Specialists to invoke concurrently (empty for moderator shortcut)
    pub specialists: Vec<SpecialistRole>,
    /// Whether a moderation pass runs after the specialists
    pub moderated: bool,
}

/// Build the execution plan for a classified query.
#[must_use]
pub fn plan(classification: &Classification) -> ExecutionPlan {
    match classification.shortcut_target {
        Some(ShortcutTarget::Specialist(role)) => ExecutionPlan {
            route: RouteDecision::Shortcut(ShortcutTarget::Specialist(role)),
            specialists: vec![role],
            moderated: false,
        },
        Some(ShortcutTarget::Moderator) => ExecutionPlan {
            route: RouteDecision::Shortcut(ShortcutTarget::Moderator),
            specialists: Vec::new(),
            moderated: true,
        },
        None => ExecutionPlan {
            route: RouteDecision::FullPipeline,
            specialists: SpecialistRole::ALL.to_vec(),
            moderated: true,
        },
    }
}
