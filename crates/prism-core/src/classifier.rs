//! Query classifier
//!
//! Deterministic keyword routing — no analyzer call. Inspects the query and
//! the thread history and decides the query kind, the follow-up flag and,
//! for follow-ups, the short-circuit target.

use crate::error::{Error, Result};
use prism_memory::{ConversationEntry, QueryKind, ShortcutTarget, SpecialistRole};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Keyword sets per target, in tie-break order: a query matching several sets
/// routes to the earliest one here.
const KEYWORD_SETS: [(SpecialistRole, &[&str]); 4] = [
    (
        SpecialistRole::Revenue,
        &[
            "revenue",
            "money",
            "income",
            "pricing",
            "monetization",
            "profit",
            "earnings",
        ],
    ),
    (
        SpecialistRole::UxUi,
        &[
            "ui",
            "ux",
            "design",
            "user experience",
            "interface",
            "usability",
            "accessibility",
        ],
    ),
    (
        SpecialistRole::Technical,
        &[
            "technical",
            "architecture",
            "code",
            "database",
            "api",
            "infrastructure",
            "scalability",
        ],
    ),
    (
        SpecialistRole::Domain,
        &[
            "business",
            "domain",
            "market",
            "industry",
            "compliance",
            "regulation",
        ],
    ),
];

/// Dispute signals. They do not route to a specialist; the moderator's
/// contradiction-resolution rules absorb them.
const DEBATE_KEYWORDS: &[&str] = &[
    "debate",
    "conflict",
    "disagreement",
    "argument",
    "dispute",
    "controversy",
];

/// Optional caller-supplied focus that overrides keyword routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusHint {
    /// No specific focus
    General,
    /// Force domain analysis
    Domain,
    /// Force UX/UI analysis
    UxUi,
    /// Force technical analysis
    Technical,
    /// Force revenue analysis
    Revenue,
}

impl FocusHint {
    /// The specialist role this hint forces, if any.
    #[must_use]
    pub fn role(&self) -> Option<SpecialistRole> {
        match self {
            FocusHint::General => None,
            FocusHint::Domain => Some(SpecialistRole::Domain),
            FocusHint::UxUi => Some(SpecialistRole::UxUi),
            FocusHint::Technical => Some(SpecialistRole::Technical),
            FocusHint::Revenue => Some(SpecialistRole::Revenue),
        }
    }
}

impl FromStr for FocusHint {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "general" => Ok(FocusHint::General),
            "domain" => Ok(FocusHint::Domain),
            "ux_ui" => Ok(FocusHint::UxUi),
            "technical" => Ok(FocusHint::Technical),
            "revenue" => Ok(FocusHint::Revenue),
            other => Err(format!("unknown focus hint: {other}")),
        }
    }
}

impl fmt::Display for FocusHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FocusHint::General => "general",
            FocusHint::Domain => "domain",
            FocusHint::UxUi => "ux_ui",
            FocusHint::Technical => "technical",
            FocusHint::Revenue => "revenue",
        };
        f.write_str(s)
    }
}

/// Classifier verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// Detected query kind
    pub query_kind: QueryKind,
    /// Whether the thread already had entries at dispatch time
    pub is_followup: bool,
    /// Short-circuit target; unset means full pipeline
    pub shortcut_target: Option<ShortcutTarget>,
}

/// Whether any keyword of the set occurs in the query. Single words match
/// whole tokens only; multi-word phrases match on the normalized text.
fn matches_set(lower_query: &str, tokens: &[&str], keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| {
        if keyword.contains(' ') {
            lower_query.contains(keyword)
        } else {
            tokens.contains(keyword)
        }
    })
}

fn kind_for_role(role: SpecialistRole) -> QueryKind {
    match role {
        SpecialistRole::Domain => QueryKind::Domain,
        SpecialistRole::UxUi => QueryKind::UxUi,
        SpecialistRole::Technical => QueryKind::Technical,
        SpecialistRole::Revenue => QueryKind::Revenue,
    }
}

/// Classify a query against its thread history.
///
/// # Errors
/// `InvalidInput` when the query is empty after trimming.
pub fn classify(
    user_query: &str,
    thread_history: &[ConversationEntry],
    focus_hint: Option<FocusHint>,
) -> Result<Classification> {
    if user_query.trim().is_empty() {
        return Err(Error::InvalidInput("query must not be empty".to_string()));
    }

    let is_followup = !thread_history.is_empty();
    let lower = user_query.to_lowercase();
    let tokens: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();

    let scanned = KEYWORD_SETS
        .iter()
        .find(|(_, keywords)| matches_set(&lower, &tokens, keywords))
        .map(|(role, _)| *role);

    // An explicit focus hint overrides the keyword scan
    let target = focus_hint.and_then(|hint| hint.role()).or(scanned);

    let query_kind = match target {
        Some(role) => kind_for_role(role),
        None if matches_set(&lower, &tokens, DEBATE_KEYWORDS) => QueryKind::Debate,
        None => QueryKind::General,
    };

    let shortcut_target = if is_followup {
        Some(
            target
                .map(ShortcutTarget::Specialist)
                .unwrap_or(ShortcutTarget::Moderator),
        )
    } else {
        None
    };

    Ok(Classification {
        query_kind,
        is_followup,
        shortcut_target,
    })
}
