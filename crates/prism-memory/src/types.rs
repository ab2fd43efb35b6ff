//! Core record types shared by the memory backends and the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One of the four specialist analyzer roles.
///
/// Declaration order doubles as the fixed fallback order when a deterministic
/// ranking over roles is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialistRole {
    /// Business logic, market, industry and compliance analysis
    Domain,
    /// User experience, interface design, accessibility and usability
    UxUi,
    /// Architecture, implementation and scalability analysis
    Technical,
    /// Revenue models, monetization and pricing analysis
    Revenue,
}

impl SpecialistRole {
    /// All roles, in fixed order.
    pub const ALL: [SpecialistRole; 4] = [
        SpecialistRole::Domain,
        SpecialistRole::UxUi,
        SpecialistRole::Technical,
        SpecialistRole::Revenue,
    ];

    /// Wire name of the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SpecialistRole::Domain => "domain",
            SpecialistRole::UxUi => "ux_ui",
            SpecialistRole::Technical => "technical",
            SpecialistRole::Revenue => "revenue",
        }
    }
}

impl fmt::Display for SpecialistRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpecialistRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "domain" => Ok(SpecialistRole::Domain),
            "ux_ui" => Ok(SpecialistRole::UxUi),
            "technical" => Ok(SpecialistRole::Technical),
            "revenue" => Ok(SpecialistRole::Revenue),
            other => Err(format!("unknown specialist role: {other}")),
        }
    }
}

/// Classifier verdict over a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    /// No specialist signal
    General,
    /// Business/domain signal
    Domain,
    /// UX/UI signal
    UxUi,
    /// Technical signal
    Technical,
    /// Revenue/pricing signal
    Revenue,
    /// Contradiction/dispute signal, absorbed by the moderator
    Debate,
}

impl QueryKind {
    /// Wire name of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::General => "general",
            QueryKind::Domain => "domain",
            QueryKind::UxUi => "ux_ui",
            QueryKind::Technical => "technical",
            QueryKind::Revenue => "revenue",
            QueryKind::Debate => "debate",
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target of a follow-up short-circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutTarget {
    /// Run a single specialist
    Specialist(SpecialistRole),
    /// Run a single aggregation over prior thread state
    Moderator,
}

impl fmt::Display for ShortcutTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShortcutTarget::Specialist(role) => f.write_str(role.as_str()),
            ShortcutTarget::Moderator => f.write_str("moderator"),
        }
    }
}

impl FromStr for ShortcutTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "moderator" {
            return Ok(ShortcutTarget::Moderator);
        }
        s.parse::<SpecialistRole>().map(ShortcutTarget::Specialist)
    }
}

/// How a request was executed. Serialized as `full_pipeline` or
/// `shortcut:<target>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// Four-specialist fan-out followed by moderation
    FullPipeline,
    /// Single-agent short-circuit
    Shortcut(ShortcutTarget),
}

impl fmt::Display for RouteDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteDecision::FullPipeline => f.write_str("full_pipeline"),
            RouteDecision::Shortcut(target) => write!(f, "shortcut:{target}"),
        }
    }
}

impl FromStr for RouteDecision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "full_pipeline" {
            return Ok(RouteDecision::FullPipeline);
        }
        match s.strip_prefix("shortcut:") {
            Some(target) => target.parse::<ShortcutTarget>().map(RouteDecision::Shortcut),
            None => Err(format!("unknown route decision: {s}")),
        }
    }
}

impl Serialize for RouteDecision {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RouteDecision {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// The immutable record committed per completed query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationEntry {
    /// Unique entry identifier
    pub entry_id: String,
    /// Thread this entry belongs to
    pub thread_id: String,
    /// Commit wall-clock time
    pub timestamp: DateTime<Utc>,
    /// Verbatim input text
    pub user_query: String,
    /// Classifier verdict
    pub query_kind: QueryKind,
    /// Whether the thread already had entries at dispatch time
    pub is_followup: bool,
    /// End-to-end processing time
    pub processing_time_ms: u64,
    /// Outputs per invoked specialist role
    #[serde(default)]
    pub specialist_outputs: BTreeMap<SpecialistRole, String>,
    /// Consolidated moderator text, when a moderation pass ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moderator_output: Option<String>,
    /// User-visible consolidated answer
    pub final_answer: String,
    /// Execution route
    pub route_decision: RouteDecision,
    /// Set by the store when the normalized answer repeats a recent one
    #[serde(default)]
    pub duplicate: bool,
}

impl ConversationEntry {
    /// Fingerprint of this entry's final answer.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        response_fingerprint(&self.final_answer)
    }

    /// Rebuild an entry from the storage shape
    /// `{thread_id, entry_id, user_query, response, context, timestamp}`.
    #[must_use]
    pub fn from_storage(
        entry_id: String,
        thread_id: String,
        timestamp: DateTime<Utc>,
        user_query: String,
        response: String,
        context: EntryContext,
        duplicate: bool,
    ) -> Self {
        Self {
            entry_id,
            thread_id,
            timestamp,
            user_query,
            query_kind: context.query_kind,
            is_followup: context.is_followup,
            processing_time_ms: context.processing_time_ms,
            specialist_outputs: context.specialist_outputs,
            moderator_output: context.moderator_output,
            final_answer: response,
            route_decision: context.route_decision,
            duplicate,
        }
    }
}

/// Structured attribute bag persisted alongside the response text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryContext {
    /// Classifier verdict
    pub query_kind: QueryKind,
    /// Follow-up flag at dispatch time
    pub is_followup: bool,
    /// End-to-end processing time
    pub processing_time_ms: u64,
    /// Execution route
    pub route_decision: RouteDecision,
    /// Outputs per invoked specialist role
    #[serde(default)]
    pub specialist_outputs: BTreeMap<SpecialistRole, String>,
    /// Consolidated moderator text, when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moderator_output: Option<String>,
}

impl From<&ConversationEntry> for EntryContext {
    fn from(entry: &ConversationEntry) -> Self {
        Self {
            query_kind: entry.query_kind,
            is_followup: entry.is_followup,
            processing_time_ms: entry.processing_time_ms,
            route_decision: entry.route_decision,
            specialist_outputs: entry.specialist_outputs.clone(),
            moderator_output: entry.moderator_output.clone(),
        }
    }
}

/// Aggregate store statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStats {
    /// Total entries across all threads
    pub total_entries: u64,
    /// Number of distinct threads
    pub thread_count: u64,
    /// Timestamp of the most recent entry, if any
    pub last_updated: Option<DateTime<Utc>>,
}

/// Fingerprint of a response: sha-256 over the lowercased text with runs of
/// whitespace collapsed to single spaces.
#[must_use]
pub fn response_fingerprint(text: &str) -> String {
    let normalized = text
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let digest = Sha256::digest(normalized.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
