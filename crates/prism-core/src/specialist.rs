//! Specialist adapter
//!
//! A specialist is a stateless analyzer invocation bound to a role prompt.
//! Transient failures are retried with exponential backoff; each attempt
//! carries its own deadline.

use crate::prompts::{agent_label, specialist_prompt};
use crate::retry::{retry_with_backoff, RetryConfig};
use prism_llm::{AnalysisRequest, Analyzer};
use prism_memory::SpecialistRole;
use std::time::Duration;
use tracing::debug;

/// Run one analyzer request with a per-attempt deadline and retry policy.
pub(crate) async fn analyze_with_retry(
    analyzer: &dyn Analyzer,
    retry: &RetryConfig,
    call_timeout: Duration,
    request: AnalysisRequest,
) -> prism_llm::Result<String> {
    let result = retry_with_backoff(
        retry,
        || {
            let request = request.clone();
            async move {
                match tokio::time::timeout(call_timeout, analyzer.analyze(request)).await {
                    Ok(result) => result,
                    Err(_) => Err(prism_llm::Error::Timeout(call_timeout.as_millis() as u64)),
                }
            }
        },
        prism_llm::Error::is_transient,
    )
    .await;

    match result {
        Ok(response) => Ok(response.content),
        Err(retry_error) => Err(retry_error.last_error),
    }
}

/// Run a single specialist over the query and rendered history.
pub async fn run_specialist(
    analyzer: &dyn Analyzer,
    retry: &RetryConfig,
    call_timeout: Duration,
    role: SpecialistRole,
    user_query: &str,
    history: &str,
) -> prism_llm::Result<String> {
    let request = AnalysisRequest::new(
        agent_label(role),
        specialist_prompt(role, user_query, history),
    )
    .with_temperature(0.7);

    debug!(role = %role, "Dispatching specialist analysis");
    analyze_with_retry(analyzer, retry, call_timeout, request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_llm::MockAnalyzer;

    fn fast_retry() -> RetryConfig {
        RetryConfig::default()
            .with_base_delay(Duration::from_millis(1))
            .with_jitter(false)
    }

    #[tokio::test]
    async fn test_specialist_returns_analysis() {
        let mock = MockAnalyzer::new();
        mock.add_response("revenue_model_analyst", "charge money");

        let text = run_specialist(
            &mock,
            &fast_retry(),
            Duration::from_secs(1),
            SpecialistRole::Revenue,
            "price the app",
            "",
        )
        .await
        .unwrap();

        assert_eq!(text, "charge money");
        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].prompt.contains("price the app"));
    }

    #[tokio::test]
    async fn test_specialist_recovers_from_transient_failures() {
        let mock = MockAnalyzer::new();
        mock.add_response("domain_expert", "recovered");
        mock.fail_next("domain_expert", 2);

        let text = run_specialist(
            &mock,
            &fast_retry(),
            Duration::from_secs(1),
            SpecialistRole::Domain,
            "q",
            "",
        )
        .await
        .unwrap();

        assert_eq!(text, "recovered");
        assert_eq!(mock.call_count("domain_expert"), 3);
    }

    #[tokio::test]
    async fn test_specialist_gives_up_after_retries() {
        let mock = MockAnalyzer::new();
        mock.fail_always("technical_architect");

        let result = run_specialist(
            &mock,
            &fast_retry(),
            Duration::from_secs(1),
            SpecialistRole::Technical,
            "q",
            "",
        )
        .await;

        assert!(result.is_err());
        assert_eq!(mock.call_count("technical_architect"), 3);
    }

    #[tokio::test]
    async fn test_per_call_deadline_is_retried_then_surfaced() {
        let mock = MockAnalyzer::new().with_delay(Duration::from_millis(50));

        let result = run_specialist(
            &mock,
            &fast_retry(),
            Duration::from_millis(5),
            SpecialistRole::UxUi,
            "q",
            "",
        )
        .await;

        assert!(matches!(result, Err(prism_llm::Error::Timeout(_))));
    }
}
