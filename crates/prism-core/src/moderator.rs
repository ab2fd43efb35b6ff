//! Moderator adapter
//!
//! Consolidates specialist outputs into one consensus text and extracts the
//! `Final Answer:` segment the finalizer persists.

use crate::prompts::{moderator_followup_prompt, moderator_prompt};
use crate::retry::RetryConfig;
use crate::specialist::analyze_with_retry;
use prism_llm::{AnalysisRequest, Analyzer};
use prism_memory::SpecialistRole;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::debug;

/// The moderator's agent label.
pub const MODERATOR_AGENT: &str = "moderator";

fn final_answer_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Literal label through the next bold header on its own line, or EOS
    RE.get_or_init(|| {
        Regex::new(r"(?s)Final Answer:\s*(.*?)(?:\n\*\*[^\n]+\*\*|\z)")
            .expect("final answer pattern is valid")
    })
}

/// Extract the `Final Answer:` segment from a moderator text. Falls back to
/// the full text when the label is absent or the segment is empty.
#[must_use]
pub fn extract_final_answer(moderator_text: &str) -> String {
    if let Some(captures) = final_answer_re().captures(moderator_text) {
        let segment = captures
            .get(1)
            .map(|m| m.as_str().trim())
            .unwrap_or_default();
        if !segment.is_empty() {
            return segment.to_string();
        }
    }
    moderator_text.trim().to_string()
}

/// Run the moderation pass over the successful specialist outputs.
pub async fn run_moderator(
    analyzer: &dyn Analyzer,
    retry: &RetryConfig,
    call_timeout: Duration,
    user_query: &str,
    outputs: &BTreeMap<SpecialistRole, String>,
) -> prism_llm::Result<String> {
    let request = AnalysisRequest::new(MODERATOR_AGENT, moderator_prompt(user_query, outputs))
        .with_temperature(0.5);
    debug!(roles = outputs.len(), "Dispatching moderator aggregation");
    analyze_with_retry(analyzer, retry, call_timeout, request).await
}

/// Run a follow-up moderation over prior thread state.
pub async fn run_moderator_followup(
    analyzer: &dyn Analyzer,
    retry: &RetryConfig,
    call_timeout: Duration,
    user_query: &str,
    history: &str,
) -> prism_llm::Result<String> {
    let request = AnalysisRequest::new(
        MODERATOR_AGENT,
        moderator_followup_prompt(user_query, history),
    )
    .with_temperature(0.5);
    debug!("Dispatching follow-up moderation");
    analyze_with_retry(analyzer, retry, call_timeout, request).await
}
