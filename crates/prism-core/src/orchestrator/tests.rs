use super::*;
use crate::config::OrchestratorConfig;
use crate::events::RefineEvent;
use crate::moderator::MODERATOR_AGENT;
use crate::retry::RetryConfig;
use prism_llm::{Analyzer, MockAnalyzer};
use prism_memory::{InMemoryStore, MemoryStore, QueryKind, RouteDecision, ShortcutTarget, SpecialistRole};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const SPECIALIST_AGENTS: [&str; 4] = [
    "domain_expert",
    "ux_ui_specialist",
    "technical_architect",
    "revenue_model_analyst",
];

fn fast_config() -> OrchestratorConfig {
    OrchestratorConfig::default().with_retry(
        RetryConfig::default()
            .with_base_delay(Duration::from_millis(1))
            .with_jitter(false),
    )
}

fn build(
    mock: Arc<MockAnalyzer>,
    store: Arc<InMemoryStore>,
    config: OrchestratorConfig,
) -> Orchestrator {
    let analyzer: Arc<dyn Analyzer> = mock;
    let store: Arc<dyn MemoryStore> = store;
    Orchestrator::new(analyzer, store).with_config(config)
}

async fn collect(mut handle: RunHandle) -> Vec<RefineEvent> {
    let mut events = Vec::new();
    while let Some(event) = handle.events.recv().await {
        events.push(event);
    }
    events
}

fn event_types(events: &[RefineEvent]) -> Vec<String> {
    events
        .iter()
        .map(|e| {
            serde_json::to_value(e).unwrap()["type"]
                .as_str()
                .unwrap()
                .to_string()
        })
        .collect()
}

fn completed_entry(events: &[RefineEvent]) -> Option<&prism_memory::ConversationEntry> {
    events.iter().find_map(|e| match e {
        RefineEvent::Complete { entry } => Some(entry),
        _ => None,
    })
}

#[tokio::test]
async fn test_full_pipeline_event_order_and_persistence() {
    let mock = Arc::new(MockAnalyzer::new());
    mock.add_response(
        MODERATOR_AGENT,
        "Consensus over all views.\nFinal Answer: build a food delivery MVP.",
    );
    let store = Arc::new(InMemoryStore::new());
    let orchestrator = build(mock.clone(), store.clone(), fast_config());

    let handle = orchestrator.run(
        RefineRequest::new("Build a food delivery app"),
        CancellationToken::new(),
    );
    let events = collect(handle).await;
    let types = event_types(&events);

    // classification → supervisor_plan → 4× start → 4× result →
    // moderator_start → moderator_result → final_answer → complete
    assert_eq!(types[0], "classification");
    assert_eq!(types[1], "supervisor_plan");
    assert_eq!(
        types.iter().filter(|t| *t == "specialist_start").count(),
        4
    );
    assert_eq!(
        types.iter().filter(|t| *t == "specialist_result").count(),
        4
    );
    let last_result = types.iter().rposition(|t| t == "specialist_result").unwrap();
    let moderator_start = types.iter().position(|t| t == "moderator_start").unwrap();
    assert!(last_result < moderator_start);
    assert_eq!(
        &types[types.len() - 3..],
        &["moderator_result", "final_answer", "complete"]
    );

    match &events[0] {
        RefineEvent::Classification {
            query_kind,
            is_followup,
        } => {
            assert_eq!(*query_kind, QueryKind::General);
            assert!(!is_followup);
        }
        other => panic!("unexpected first event: {other:?}"),
    }

    // Moderator invoked exactly once, with all four role outputs
    assert_eq!(mock.call_count(MODERATOR_AGENT), 1);
    for agent in SPECIALIST_AGENTS {
        assert_eq!(mock.call_count(agent), 1);
    }

    let entry = completed_entry(&events).expect("complete event");
    assert_eq!(entry.route_decision, RouteDecision::FullPipeline);
    assert_eq!(entry.specialist_outputs.len(), 4);
    assert!(entry.moderator_output.is_some());
    assert_eq!(entry.final_answer, "build a food delivery MVP.");
    assert!(!entry.final_answer.is_empty());

    // A fresh thread was allocated and the entry persisted under it
    let listed = store.list(&entry.thread_id, 10).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].entry_id, entry.entry_id);
}

#[tokio::test]
async fn test_followup_pricing_query_shortcuts_to_revenue() {
    let mock = Arc::new(MockAnalyzer::new());
    mock.add_response(
        MODERATOR_AGENT,
        "Consensus.\nFinal Answer: the first answer.",
    );
    mock.add_response("revenue_model_analyst", "charge a delivery fee");
    let store = Arc::new(InMemoryStore::new());
    let orchestrator = build(mock.clone(), store.clone(), fast_config());

    // Seed the thread with a full-pipeline run
    let events = collect(orchestrator.run(
        RefineRequest::new("Build a food delivery app"),
        CancellationToken::new(),
    ))
    .await;
    let thread_id = completed_entry(&events).unwrap().thread_id.clone();

    // Follow-up with a revenue keyword short-circuits
    let events = collect(orchestrator.run(
        RefineRequest::new("What pricing strategy should I use?").with_thread(&thread_id),
        CancellationToken::new(),
    ))
    .await;
    let types = event_types(&events);
    assert_eq!(
        types,
        vec![
            "classification",
            "specialist_start",
            "specialist_result",
            "final_answer",
            "complete"
        ]
    );

    let entry = completed_entry(&events).unwrap();
    assert!(entry.is_followup);
    assert_eq!(entry.query_kind, QueryKind::Revenue);
    assert_eq!(
        entry.route_decision,
        RouteDecision::Shortcut(ShortcutTarget::Specialist(SpecialistRole::Revenue))
    );
    assert_eq!(entry.specialist_outputs.len(), 1);
    assert_eq!(
        entry.specialist_outputs.get(&SpecialistRole::Revenue),
        Some(&"charge a delivery fee".to_string())
    );
    assert!(entry.moderator_output.is_none());
    // Shortcut answers are the specialist text verbatim
    assert_eq!(entry.final_answer, "charge a delivery fee");

    // The specialist prompt carried the thread history
    let calls = mock.calls();
    let revenue_call = calls
        .iter()
        .find(|c| c.agent == "revenue_model_analyst")
        .unwrap();
    assert!(revenue_call.prompt.contains("Previous conversation context:"));
    assert!(revenue_call
        .prompt
        .contains("Q: Build a food delivery app"));

    assert_eq!(store.list(&thread_id, 10).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_empty_query_is_invalid_input_and_not_persisted() {
    let mock = Arc::new(MockAnalyzer::new());
    let store = Arc::new(InMemoryStore::new());
    let orchestrator = build(mock.clone(), store.clone(), fast_config());

    let events = collect(orchestrator.run(
        RefineRequest::new("   "),
        CancellationToken::new(),
    ))
    .await;

    assert_eq!(events.len(), 1);
    match &events[0] {
        RefineEvent::Error { kind, .. } => assert_eq!(kind, "invalid_input"),
        other => panic!("unexpected event: {other:?}"),
    }
    assert_eq!(store.stats().await.unwrap().total_entries, 0);
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn test_all_specialists_failing_is_upstream_unavailable() {
    let mock = Arc::new(MockAnalyzer::new());
    for agent in SPECIALIST_AGENTS {
        mock.fail_always(agent);
    }
    let store = Arc::new(InMemoryStore::new());
    let orchestrator = build(mock.clone(), store.clone(), fast_config());

    let events = collect(orchestrator.run(
        RefineRequest::new("Build a food delivery app"),
        CancellationToken::new(),
    ))
    .await;

    match events.last().unwrap() {
        RefineEvent::Error { kind, .. } => assert_eq!(kind, "upstream_unavailable"),
        other => panic!("unexpected terminal event: {other:?}"),
    }
    // The moderator never ran and nothing was persisted
    assert_eq!(mock.call_count(MODERATOR_AGENT), 0);
    assert_eq!(store.stats().await.unwrap().total_entries, 0);
}

#[tokio::test]
async fn test_single_specialist_failure_is_recovered() {
    let mock = Arc::new(MockAnalyzer::new());
    mock.fail_always("technical_architect");
    mock.add_response(MODERATOR_AGENT, "Merged.\nFinal Answer: proceed without tech.");
    let store = Arc::new(InMemoryStore::new());
    let orchestrator = build(mock.clone(), store.clone(), fast_config());

    let events = collect(orchestrator.run(
        RefineRequest::new("Build a food delivery app"),
        CancellationToken::new(),
    ))
    .await;

    let entry = completed_entry(&events).expect("run should complete");
    assert_eq!(entry.specialist_outputs.len(), 3);
    assert!(!entry
        .specialist_outputs
        .contains_key(&SpecialistRole::Technical));
    assert!(entry.moderator_output.is_some());

    let types = event_types(&events);
    assert_eq!(
        types.iter().filter(|t| *t == "specialist_result").count(),
        3
    );
}

#[tokio::test]
async fn test_moderator_failure_falls_back_to_first_specialist() {
    let mock = Arc::new(MockAnalyzer::new());
    mock.fail_always(MODERATOR_AGENT);
    mock.add_response("domain_expert", "domain fallback answer");
    let store = Arc::new(InMemoryStore::new());
    let orchestrator = build(mock.clone(), store.clone(), fast_config());

    let events = collect(orchestrator.run(
        RefineRequest::new("Build a food delivery app"),
        CancellationToken::new(),
    ))
    .await;

    let entry = completed_entry(&events).expect("run should complete");
    // Fixed role order puts the domain expert first
    assert_eq!(entry.final_answer, "domain fallback answer");
    assert_eq!(entry.route_decision, RouteDecision::FullPipeline);
    assert!(entry.moderator_output.is_some());

    let types = event_types(&events);
    assert!(!types.contains(&"moderator_result".to_string()));
    assert!(types.contains(&"final_answer".to_string()));
}

#[tokio::test]
async fn test_followup_without_signal_routes_to_moderator() {
    let mock = Arc::new(MockAnalyzer::new());
    mock.add_response(MODERATOR_AGENT, "First.\nFinal Answer: initial plan.");
    mock.add_response(
        MODERATOR_AGENT,
        "Aggregated from history.\nFinal Answer: as established before.",
    );
    let store = Arc::new(InMemoryStore::new());
    let orchestrator = build(mock.clone(), store.clone(), fast_config());

    let events = collect(orchestrator.run(
        RefineRequest::new("Build a food delivery app"),
        CancellationToken::new(),
    ))
    .await;
    let thread_id = completed_entry(&events).unwrap().thread_id.clone();

    let events = collect(orchestrator.run(
        RefineRequest::new("can you elaborate on that?").with_thread(&thread_id),
        CancellationToken::new(),
    ))
    .await;
    let types = event_types(&events);
    assert_eq!(
        types,
        vec![
            "classification",
            "moderator_start",
            "moderator_result",
            "final_answer",
            "complete"
        ]
    );

    let entry = completed_entry(&events).unwrap();
    assert_eq!(
        entry.route_decision,
        RouteDecision::Shortcut(ShortcutTarget::Moderator)
    );
    assert!(entry.specialist_outputs.is_empty());
    assert!(entry.moderator_output.is_some());
    assert_eq!(entry.final_answer, "as established before.");
}

#[tokio::test]
async fn test_cancel_between_specialist_results_and_moderation_persists_nothing() {
    // Every call takes 50ms; cancel once the last specialist result arrives,
    // while the moderator call is still in flight.
    let mock = Arc::new(MockAnalyzer::new().with_delay(Duration::from_millis(50)));
    let store = Arc::new(InMemoryStore::new());
    let orchestrator = build(mock.clone(), store.clone(), fast_config());

    let cancel = CancellationToken::new();
    let mut handle = orchestrator.run(
        RefineRequest::new("Build a food delivery app"),
        cancel.clone(),
    );

    let mut results_seen = 0;
    let mut saw_complete = false;
    let mut saw_cancelled = false;
    while let Some(event) = handle.events.recv().await {
        match event {
            RefineEvent::SpecialistResult { .. } => {
                results_seen += 1;
                if results_seen == 4 {
                    cancel.cancel();
                }
            }
            RefineEvent::Complete { .. } => saw_complete = true,
            RefineEvent::Cancelled => saw_cancelled = true,
            _ => {}
        }
    }

    assert!(saw_cancelled);
    assert!(!saw_complete);
    assert_eq!(store.stats().await.unwrap().total_entries, 0);
}

#[tokio::test]
async fn test_request_deadline_emits_timeout_and_persists_nothing() {
    let mock = Arc::new(MockAnalyzer::new().with_delay(Duration::from_millis(200)));
    let store = Arc::new(InMemoryStore::new());
    let config = fast_config().with_request_timeout(Duration::from_millis(1));
    let orchestrator = build(mock.clone(), store.clone(), config);

    let events = collect(orchestrator.run(
        RefineRequest::new("Build a food delivery app"),
        CancellationToken::new(),
    ))
    .await;

    match events.last().unwrap() {
        RefineEvent::Error { kind, .. } => assert_eq!(kind, "timeout"),
        other => panic!("unexpected terminal event: {other:?}"),
    }
    assert_eq!(store.stats().await.unwrap().total_entries, 0);
}

#[tokio::test]
async fn test_identical_answers_tag_second_entry_duplicate() {
    let mock = Arc::new(MockAnalyzer::new());
    // Same moderator text for both runs
    mock.add_response(MODERATOR_AGENT, "Same.\nFinal Answer: identical answer.");
    mock.add_response(MODERATOR_AGENT, "Same.\nFinal Answer: identical answer.");
    let store = Arc::new(InMemoryStore::new());
    let orchestrator = build(mock.clone(), store.clone(), fast_config());

    let events = collect(orchestrator.run(
        RefineRequest::new("Build a food delivery app"),
        CancellationToken::new(),
    ))
    .await;
    let thread_id = completed_entry(&events).unwrap().thread_id.clone();

    let events = collect(orchestrator.run(
        RefineRequest::new("Build a food delivery app")
            .with_thread(&thread_id)
            .with_focus_hint(crate::classifier::FocusHint::General),
        CancellationToken::new(),
    ))
    .await;
    // Unmatched follow-up runs through the moderator shortcut; same text
    let entry = completed_entry(&events).unwrap();
    assert!(entry.duplicate);

    let listed = store.list(&thread_id, 10).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed[0].duplicate);
    assert!(!listed[1].duplicate);
}

#[tokio::test]
async fn test_focus_hint_forces_specialist_on_followup() {
    let mock = Arc::new(MockAnalyzer::new());
    mock.add_response(MODERATOR_AGENT, "Initial.\nFinal Answer: plan.");
    mock.add_response("technical_architect", "shard the database");
    let store = Arc::new(InMemoryStore::new());
    let orchestrator = build(mock.clone(), store.clone(), fast_config());

    let events = collect(orchestrator.run(
        RefineRequest::new("Build a food delivery app"),
        CancellationToken::new(),
    ))
    .await;
    let thread_id = completed_entry(&events).unwrap().thread_id.clone();

    let events = collect(orchestrator.run(
        RefineRequest::new("What pricing strategy should I use?")
            .with_thread(&thread_id)
            .with_focus_hint(crate::classifier::FocusHint::Technical),
        CancellationToken::new(),
    ))
    .await;

    let entry = completed_entry(&events).unwrap();
    assert_eq!(entry.query_kind, QueryKind::Technical);
    assert_eq!(
        entry.route_decision,
        RouteDecision::Shortcut(ShortcutTarget::Specialist(SpecialistRole::Technical))
    );
    assert_eq!(entry.final_answer, "shard the database");
}

#[tokio::test]
async fn test_cancel_run_via_registry() {
    let mock = Arc::new(MockAnalyzer::new().with_delay(Duration::from_millis(200)));
    let store = Arc::new(InMemoryStore::new());
    let orchestrator = build(mock.clone(), store.clone(), fast_config());

    let handle = orchestrator.run(
        RefineRequest::new("Build a food delivery app"),
        CancellationToken::new(),
    );
    let run_id = handle.run_id;
    assert_eq!(orchestrator.active_run_count(), 1);
    assert!(orchestrator.cancel_run(run_id));

    let events = collect(handle).await;
    assert!(matches!(events.last().unwrap(), RefineEvent::Cancelled));
    assert_eq!(store.stats().await.unwrap().total_entries, 0);

    // Unknown runs report false
    assert!(!orchestrator.cancel_run(uuid::Uuid::new_v4()));
}

#[tokio::test]
async fn test_history_search_clear_passthrough() {
    let mock = Arc::new(MockAnalyzer::new());
    mock.add_response(MODERATOR_AGENT, "Text.\nFinal Answer: searchable answer.");
    let store = Arc::new(InMemoryStore::new());
    let orchestrator = build(mock.clone(), store.clone(), fast_config());

    let events = collect(orchestrator.run(
        RefineRequest::new("Build a food delivery app"),
        CancellationToken::new(),
    ))
    .await;
    let thread_id = completed_entry(&events).unwrap().thread_id.clone();

    let history = orchestrator.history(&thread_id, 10).await.unwrap();
    assert_eq!(history.len(), 1);

    let results = orchestrator
        .search(&thread_id, "searchable", 10)
        .await
        .unwrap();
    assert_eq!(results.len(), 1);

    let stats = orchestrator.stats().await.unwrap();
    assert_eq!(stats.total_entries, 1);

    assert_eq!(orchestrator.clear(&thread_id).await.unwrap(), 1);
    assert!(orchestrator.history(&thread_id, 10).await.unwrap().is_empty());
}
