//! Prompt templates for the specialist and moderator analyzers
//!
//! Templates are rendered server-side; analyzers receive one finished prompt.

use prism_memory::{ConversationEntry, SpecialistRole};
use std::collections::BTreeMap;

const DOMAIN_EXPERT_INSTRUCTIONS: &str = "\
You are a domain expert analyzing product requirements. Examine the query \
through the lens of business logic, industry standards, compliance and \
market dynamics.

Structure your analysis as:
Domain Analysis: <overall assessment>
Domain Requirements: <bulleted requirements>
Domain Concerns: <bulleted risks and open issues>
Priority Level: <high | medium | low>";

const UX_UI_SPECIALIST_INSTRUCTIONS: &str = "\
You are a UX/UI specialist analyzing product requirements. Examine the query \
through the lens of user experience, interface design, usability and \
accessibility.

Structure your analysis as:
UX Analysis: <overall assessment>
UI Requirements: <bulleted requirements>
User Experience Concerns: <bulleted risks>
Accessibility Requirements: <bulleted requirements>";

const TECHNICAL_ARCHITECT_INSTRUCTIONS: &str = "\
You are a technical architect analyzing product requirements. Examine the \
query through the lens of system architecture, implementation effort, \
infrastructure and scalability.

Structure your analysis as:
Technical Analysis: <overall assessment>
Technical Requirements: <bulleted requirements>
Technical Concerns: <bulleted risks>
Scalability Considerations: <bulleted considerations>";

const REVENUE_ANALYST_INSTRUCTIONS: &str = "\
You are a revenue model analyst analyzing product requirements. Examine the \
query through the lens of revenue models, monetization strategies, pricing \
and financial sustainability.

Structure your analysis as:
Revenue Analysis: <overall assessment>
Revenue Requirements: <bulleted requirements>
Revenue Concerns: <bulleted risks>
Monetization Strategies: <bulleted strategies>
Pricing Considerations: <bulleted considerations>";

const MODERATOR_INSTRUCTIONS: &str = "\
You are the moderator consolidating specialist analyses of a product \
requirement into one consensus. Summarize each specialist's key claims, then \
resolve contradictions explicitly: on feasibility questions the precedence is \
technical > domain > ux_ui > revenue; on market or positioning questions the \
precedence is domain > revenue > ux_ui > technical; otherwise merge the \
views without ranking. Produce a single narrative and end it with a section \
that starts with the literal label 'Final Answer:'.";

const MODERATOR_FOLLOWUP_INSTRUCTIONS: &str = "\
You are the moderator answering a follow-up question using only the prior \
conversation below. Aggregate what has already been established, resolve any \
contradictions between earlier answers, and end with a section that starts \
with the literal label 'Final Answer:'.";

/// Agent label used for analyzer requests and logs.
#[must_use]
pub fn agent_label(role: SpecialistRole) -> &'static str {
    match role {
        SpecialistRole::Domain => "domain_expert",
        SpecialistRole::UxUi => "ux_ui_specialist",
        SpecialistRole::Technical => "technical_architect",
        SpecialistRole::Revenue => "revenue_model_analyst",
    }
}

fn role_instructions(role: SpecialistRole) -> &'static str {
    match role {
        SpecialistRole::Domain => DOMAIN_EXPERT_INSTRUCTIONS,
        SpecialistRole::UxUi => UX_UI_SPECIALIST_INSTRUCTIONS,
        SpecialistRole::Technical => TECHNICAL_ARCHITECT_INSTRUCTIONS,
        SpecialistRole::Revenue => REVENUE_ANALYST_INSTRUCTIONS,
    }
}

/// Render thread history for prompt context: the last `limit` entries,
/// chronological, one `[timestamp] Q: ... / A: ...` block per entry joined
/// by blank lines.
#[must_use]
pub fn render_history(entries: &[ConversationEntry], limit: usize) -> String {
    // `entries` arrives most recent first from the store
    let mut recent: Vec<&ConversationEntry> = entries.iter().take(limit).collect();
    recent.reverse();
    recent
        .iter()
        .map(|e| {
            format!(
                "[{}] Q: {} / A: {}",
                e.timestamp.to_rfc3339(),
                e.user_query,
                e.final_answer
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Full prompt for a specialist invocation.
#[must_use]
pub fn specialist_prompt(role: SpecialistRole, user_query: &str, history: &str) -> String {
    let mut prompt = format!("{}\n\nQuery: {user_query}", role_instructions(role));
    if !history.is_empty() {
        prompt.push_str("\n\nPrevious conversation context:\n");
        prompt.push_str(history);
    }
    prompt
}

/// Full prompt for the moderation pass over specialist outputs.
#[must_use]
pub fn moderator_prompt(
    user_query: &str,
    outputs: &BTreeMap<SpecialistRole, String>,
) -> String {
    let mut prompt = format!("{MODERATOR_INSTRUCTIONS}\n\nQuery: {user_query}\n");
    for role in SpecialistRole::ALL {
        let analysis = outputs
            .get(&role)
            .map(String::as_str)
            .unwrap_or("Not available");
        prompt.push_str(&format!("\n{} analysis:\n{analysis}\n", role.as_str()));
    }
    prompt
}

/// Full prompt for a follow-up moderation over prior thread state.
#[must_use]
pub fn moderator_followup_prompt(user_query: &str, history: &str) -> String {
    format!(
        "{MODERATOR_FOLLOWUP_INSTRUCTIONS}\n\nFollow-up query: {user_query}\n\n\
         Previous conversation:\n{history}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use prism_memory::{QueryKind, RouteDecision};

    fn entry(ts_offset: i64, query: &str, answer: &str) -> ConversationEntry {
        ConversationEntry {
            entry_id: format!("e{ts_offset}"),
            thread_id: "t".to_string(),
            timestamp: Utc::now() + Duration::seconds(ts_offset),
            user_query: query.to_string(),
            query_kind: QueryKind::General,
            is_followup: false,
            processing_time_ms: 1,
            specialist_outputs: BTreeMap::new(),
            moderator_output: None,
            final_answer: answer.to_string(),
            route_decision: RouteDecision::FullPipeline,
            duplicate: false,
        }
    }

    #[test]
    fn test_render_history_is_chronological_and_capped() {
        // Most recent first, as the store returns them
        let entries = vec![
            entry(3, "third", "a3"),
            entry(2, "second", "a2"),
            entry(1, "first", "a1"),
        ];
        let rendered = render_history(&entries, 2);

        // Cap drops the oldest; order flips to chronological
        assert!(!rendered.contains("first"));
        let second_pos = rendered.find("second").unwrap();
        let third_pos = rendered.find("third").unwrap();
        assert!(second_pos < third_pos);
        assert!(rendered.contains("Q: second / A: a2"));
        assert_eq!(rendered.matches("\n\n").count(), 1);
    }

    #[test]
    fn test_render_history_empty() {
        assert_eq!(render_history(&[], 10), "");
    }

    #[test]
    fn test_specialist_prompt_includes_query_and_history() {
        let prompt = specialist_prompt(SpecialistRole::Revenue, "price it", "[t] Q: q / A: a");
        assert!(prompt.contains("revenue model analyst"));
        assert!(prompt.contains("Query: price it"));
        assert!(prompt.contains("Previous conversation context:"));

        let bare = specialist_prompt(SpecialistRole::Domain, "price it", "");
        assert!(!bare.contains("Previous conversation context:"));
    }

    #[test]
    fn test_moderator_prompt_lists_all_roles() {
        let mut outputs = BTreeMap::new();
        outputs.insert(SpecialistRole::Domain, "domain view".to_string());
        let prompt = moderator_prompt("build it", &outputs);
        assert!(prompt.contains("domain view"));
        assert!(prompt.contains("ux_ui analysis:\nNot available"));
        assert!(prompt.contains("Final Answer:"));
    }

    #[test]
    fn test_agent_labels() {
        assert_eq!(agent_label(SpecialistRole::UxUi), "ux_ui_specialist");
        assert_eq!(agent_label(SpecialistRole::Technical), "technical_architect");
    }
}
