//! Execution driver
//!
//! One driver task per request. The driver walks the state machine, spawns
//! the specialist fan-out, gates the moderator on the completion barrier,
//! and commits the entry through the finalizer. Events flow through a
//! bounded channel; a slow consumer backpressures the driver, a dropped
//! consumer cancels the run.

use crate::classifier::{classify, FocusHint};
use crate::config::OrchestratorConfig;
use crate::error::{Error, Result};
use crate::events::RefineEvent;
use crate::finalizer::{self, RunOutcome};
use crate::moderator;
use crate::prompts;
use crate::specialist;
use crate::supervisor::{self, ExecutionPlan};

use super::core::Orchestrator;
use super::phase::{Phase, PhaseTracker};

use prism_llm::Analyzer;
use prism_memory::{MemoryStore, RouteDecision, ShortcutTarget, SpecialistRole};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Input of a refinement run.
#[derive(Debug, Clone)]
pub struct RefineRequest {
    /// Free-form query text
    pub query: String,
    /// Thread to continue; a fresh thread is allocated when absent
    pub thread_id: Option<String>,
    /// Optional focus override
    pub focus_hint: Option<FocusHint>,
}

impl RefineRequest {
    /// Create a request for a fresh thread.
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            thread_id: None,
            focus_hint: None,
        }
    }

    /// Continue an existing thread.
    #[must_use]
    pub fn with_thread(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    /// Set the focus hint.
    #[must_use]
    pub fn with_focus_hint(mut self, hint: FocusHint) -> Self {
        self.focus_hint = Some(hint);
        self
    }
}

/// Handle to a running request.
pub struct RunHandle {
    /// Identifier of the run (usable with `Orchestrator::cancel_run`)
    pub run_id: Uuid,
    /// Event stream; terminates with `complete`, `cancelled` or `error`
    pub events: mpsc::Receiver<RefineEvent>,
}

impl Orchestrator {
    /// Start a refinement run.
    ///
    /// The returned stream terminates with `complete{entry}` on success,
    /// `cancelled` when `cancel` fires, or `error{kind, message}` on fatal
    /// failure. Nothing is persisted on cancellation or failure.
    pub fn run(&self, request: RefineRequest, cancel: CancellationToken) -> RunHandle {
        let (tx, rx) = mpsc::channel(self.config.event_buffer);
        let run_id = Uuid::new_v4();
        let token = cancel.child_token();
        self.active_runs.insert(run_id, token.clone());

        let driver = RunDriver {
            analyzer: Arc::clone(&self.analyzer),
            store: Arc::clone(&self.store),
            config: self.config.clone(),
            token,
            tx,
            run_id,
        };

        let active_runs = Arc::clone(&self.active_runs);
        tokio::spawn(async move {
            driver.drive(request).await;
            active_runs.remove(&run_id);
        });

        RunHandle { run_id, events: rx }
    }
}

struct RunDriver {
    analyzer: Arc<dyn Analyzer>,
    store: Arc<dyn MemoryStore>,
    config: OrchestratorConfig,
    token: CancellationToken,
    tx: mpsc::Sender<RefineEvent>,
    run_id: Uuid,
}

impl RunDriver {
    /// Emit one event. A dropped receiver means the consumer is gone; the
    /// run is then treated as cancelled.
    async fn send(&self, event: RefineEvent) -> Result<()> {
        self.tx.send(event).await.map_err(|_| Error::Cancelled)
    }

    async fn drive(self, request: RefineRequest) {
        let token = self.token.clone();
        let request_timeout = self.config.request_timeout;

        tokio::select! {
            _ = token.cancelled() => {
                info!(run_id = %self.run_id, "Run cancelled");
                let _ = self.tx.send(RefineEvent::Cancelled).await;
            }
            _ = tokio::time::sleep(request_timeout) => {
                warn!(
                    run_id = %self.run_id,
                    timeout_ms = request_timeout.as_millis() as u64,
                    "Request deadline exceeded"
                );
                // Abandon in-flight analyzer calls like a cancellation
                token.cancel();
                let _ = self
                    .tx
                    .send(RefineEvent::Error {
                        kind: "timeout".to_string(),
                        message: format!(
                            "request deadline of {}ms exceeded",
                            request_timeout.as_millis()
                        ),
                    })
                    .await;
            }
            result = self.execute(&request) => match result {
                Ok(()) => {}
                Err(Error::Cancelled) => {
                    info!(run_id = %self.run_id, "Run cancelled");
                    let _ = self.tx.send(RefineEvent::Cancelled).await;
                }
                Err(e) => {
                    warn!(run_id = %self.run_id, error = %e, "Run failed");
                    let _ = self
                        .tx
                        .send(RefineEvent::Error {
                            kind: e.kind().to_string(),
                            message: e.to_string(),
                        })
                        .await;
                }
            }
        }
    }

    async fn execute(&self, request: &RefineRequest) -> Result<()> {
        let started = Instant::now();
        let mut phase = PhaseTracker::new();

        let thread_id = match request.thread_id.as_deref() {
            Some(id) if !id.trim().is_empty() => id.to_string(),
            _ => Uuid::new_v4().to_string(),
        };

        // The only memory read of a run happens here, at request entry
        let history = self
            .store
            .list(&thread_id, self.config.history_context_limit)
            .await?;
        let classification = classify(&request.query, &history, request.focus_hint)?;
        phase.advance(Phase::Classified)?;
        self.send(RefineEvent::Classification {
            query_kind: classification.query_kind,
            is_followup: classification.is_followup,
        })
        .await?;

        let plan = supervisor::plan(&classification);
        let rendered_history =
            prompts::render_history(&history, self.config.history_context_limit);

        let outcome = match plan.route {
            RouteDecision::Shortcut(target) => {
                phase.advance(Phase::ShortcutRunning)?;
                self.run_shortcut(target, &request.query, &rendered_history)
                    .await?
            }
            RouteDecision::FullPipeline => {
                phase.advance(Phase::FanoutRunning)?;
                self.run_full(&plan, &request.query, &rendered_history, &mut phase)
                    .await?
            }
        };

        phase.advance(Phase::Finalizing)?;
        self.send(RefineEvent::FinalAnswer {
            content: outcome.final_answer.clone(),
        })
        .await?;

        // Commit is suppressed when cancellation raced the pipeline
        if self.token.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let entry = finalizer::build_entry(
            &thread_id,
            &request.query,
            &classification,
            plan.route,
            outcome,
            started.elapsed().as_millis() as u64,
        );
        match finalizer::commit(self.store.as_ref(), entry).await {
            Ok(stored) => {
                phase.advance(Phase::Done)?;
                self.send(RefineEvent::Complete { entry: stored }).await?;
            }
            Err(e) => {
                error!(run_id = %self.run_id, error = %e, "Failed to persist entry");
                phase.advance(Phase::Failed)?;
                self.send(RefineEvent::Error {
                    kind: "storage".to_string(),
                    message: e.to_string(),
                })
                .await?;
            }
        }
        Ok(())
    }

    async fn run_shortcut(
        &self,
        target: ShortcutTarget,
        query: &str,
        history: &str,
    ) -> Result<RunOutcome> {
        match target {
            ShortcutTarget::Specialist(role) => {
                self.send(RefineEvent::SpecialistStart { role }).await?;
                let content = specialist::run_specialist(
                    self.analyzer.as_ref(),
                    &self.config.retry,
                    self.config.analyzer_timeout,
                    role,
                    query,
                    history,
                )
                .await
                .map_err(|e| {
                    Error::UpstreamUnavailable(format!("{role} specialist failed: {e}"))
                })?;
                self.send(RefineEvent::SpecialistResult {
                    role,
                    content: content.clone(),
                })
                .await?;

                let mut outputs = BTreeMap::new();
                outputs.insert(role, content.clone());
                Ok(RunOutcome {
                    specialist_outputs: outputs,
                    moderator_output: None,
                    final_answer: content,
                })
            }
            ShortcutTarget::Moderator => {
                self.send(RefineEvent::ModeratorStart).await?;
                let content = moderator::run_moderator_followup(
                    self.analyzer.as_ref(),
                    &self.config.retry,
                    self.config.analyzer_timeout,
                    query,
                    history,
                )
                .await
                .map_err(|e| Error::UpstreamUnavailable(format!("moderator failed: {e}")))?;
                self.send(RefineEvent::ModeratorResult {
                    content: content.clone(),
                })
                .await?;

                let final_answer = moderator::extract_final_answer(&content);
                Ok(RunOutcome {
                    specialist_outputs: BTreeMap::new(),
                    moderator_output: Some(content),
                    final_answer,
                })
            }
        }
    }

    async fn run_full(
        &self,
        plan: &ExecutionPlan,
        query: &str,
        history: &str,
        phase: &mut PhaseTracker,
    ) -> Result<RunOutcome> {
        self.send(RefineEvent::SupervisorPlan {
            route: plan.route,
            roles: plan.specialists.clone(),
        })
        .await?;

        let (result_tx, mut result_rx) =
            mpsc::channel::<(SpecialistRole, prism_llm::Result<String>)>(plan.specialists.len());

        for &role in &plan.specialists {
            self.send(RefineEvent::SpecialistStart { role }).await?;

            let analyzer = Arc::clone(&self.analyzer);
            let retry = self.config.retry.clone();
            let call_timeout = self.config.analyzer_timeout;
            let token = self.token.clone();
            let query = query.to_string();
            let history = history.to_string();
            let result_tx = result_tx.clone();

            tokio::spawn(async move {
                let result = tokio::select! {
                    // Abandon the in-flight call on cancellation; a late
                    // response dies with the task.
                    _ = token.cancelled() => return,
                    result = specialist::run_specialist(
                        analyzer.as_ref(),
                        &retry,
                        call_timeout,
                        role,
                        &query,
                        &history,
                    ) => result,
                };
                let _ = result_tx.send((role, result)).await;
            });
        }
        drop(result_tx);

        // Barrier: the moderator is gated on every specialist completing or
        // failing. Results are forwarded in completion order.
        let mut outputs = BTreeMap::new();
        while let Some((role, result)) = result_rx.recv().await {
            match result {
                Ok(content) => {
                    self.send(RefineEvent::SpecialistResult {
                        role,
                        content: content.clone(),
                    })
                    .await?;
                    outputs.insert(role, content);
                }
                Err(e) => {
                    warn!(role = %role, error = %e, "Specialist unavailable after retries");
                }
            }
        }
        phase.advance(Phase::FanoutComplete)?;

        if self.token.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if outputs.is_empty() {
            return Err(Error::UpstreamUnavailable(
                "all specialists failed".to_string(),
            ));
        }

        phase.advance(Phase::Moderating)?;
        self.send(RefineEvent::ModeratorStart).await?;
        match moderator::run_moderator(
            self.analyzer.as_ref(),
            &self.config.retry,
            self.config.analyzer_timeout,
            query,
            &outputs,
        )
        .await
        {
            Ok(content) => {
                self.send(RefineEvent::ModeratorResult {
                    content: content.clone(),
                })
                .await?;
                let final_answer = moderator::extract_final_answer(&content);
                Ok(RunOutcome {
                    specialist_outputs: outputs,
                    moderator_output: Some(content),
                    final_answer,
                })
            }
            Err(e) => {
                // Recovered: fall back to the first successful specialist in
                // fixed role order.
                warn!(error = %e, "Moderator failed, falling back to specialist output");
                let fallback = outputs
                    .values()
                    .next()
                    .cloned()
                    .ok_or_else(|| Error::Internal("no specialist output to fall back to".into()))?;
                Ok(RunOutcome {
                    specialist_outputs: outputs,
                    moderator_output: Some(fallback.clone()),
                    final_answer: fallback,
                })
            }
        }
    }
}
