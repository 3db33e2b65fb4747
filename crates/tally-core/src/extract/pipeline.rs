//! Extraction orchestration: prompt, backend call, sanitize, parse

use std::collections::HashMap;

use tracing::{debug, info, warn};

use super::{parse, sanitize, ExtractionFailure, FailureReason};
use crate::ai::{AIBackend, AIClient};
use crate::config::ExtractionConfig;
use crate::error::{Error, Result};
use crate::models::{Category, ExpenseRecord, TextRequest};
use crate::prompts::{Prompt, PromptId, PromptLibrary};

/// Placeholders the extraction template has to carry
const REQUIRED_PLACEHOLDERS: &[&str] = &["{{text}}", "{{categories}}"];

/// Render the instruction prompt for one request.
///
/// Deterministic: the same request and template always give the same prompt.
pub fn build_prompt(prompt: &Prompt, request: &TextRequest) -> String {
    let categories = Category::prompt_list();
    let mut vars = HashMap::new();
    vars.insert("categories", categories.as_str());
    vars.insert("text", request.text().trim());

    let user = prompt.render_user(&vars);
    match prompt.system_section() {
        Some(system) => format!("{}\n\n{}", system, user),
        None => user,
    }
}

/// Stateless free-text to `ExpenseRecord` extractor
///
/// Holds only injected collaborators; every `extract` call is independent.
#[derive(Clone)]
pub struct ExtractionPipeline {
    backend: AIClient,
    config: ExtractionConfig,
    prompt: Prompt,
}

impl ExtractionPipeline {
    /// Build a pipeline, loading the extraction prompt from `prompts`
    pub fn new(
        backend: AIClient,
        config: ExtractionConfig,
        prompts: &mut PromptLibrary,
    ) -> Result<Self> {
        let prompt = prompts.get(PromptId::ExtractExpense)?.clone();
        let template = prompt.template();
        if let Some(missing) = REQUIRED_PLACEHOLDERS
            .iter()
            .find(|placeholder| !template.contains(**placeholder))
        {
            return Err(Error::Config(format!(
                "Extraction prompt must contain a {} placeholder",
                missing
            )));
        }
        Ok(Self {
            backend,
            config,
            prompt,
        })
    }

    pub fn backend(&self) -> &AIClient {
        &self.backend
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Turn free text into a validated record, or say which stage failed
    pub async fn extract(
        &self,
        request: &TextRequest,
    ) -> std::result::Result<ExpenseRecord, ExtractionFailure> {
        let prompt = build_prompt(&self.prompt, request);
        let raw = self.generate(&prompt).await?;

        let payload = sanitize(&raw);
        if payload.is_empty() {
            warn!(model = %self.backend.model(), "Backend returned nothing usable");
            return Err(ExtractionFailure::new(
                FailureReason::EmptyResponse,
                "Backend response was empty after sanitizing",
            ));
        }

        let fields = parse(&payload).map_err(|failure| {
            warn!(reason = failure.reason().as_str(), "Could not parse backend response: {}", failure);
            debug!("Unparseable payload: {}", payload);
            ExtractionFailure::from(failure)
        })?;

        let record = fields.into_record(request);
        info!(
            price = record.price,
            category = %record.category,
            "Extracted expense"
        );
        Ok(record)
    }

    /// Call the backend under the configured timeout, retrying transport
    /// failures up to `max_retries` times
    async fn generate(&self, prompt: &str) -> std::result::Result<String, ExtractionFailure> {
        let mut attempt = 0;
        loop {
            let outcome = tokio::time::timeout(self.config.timeout, self.backend.generate(prompt));
            let failure = match outcome.await {
                Ok(Ok(text)) => return Ok(text),
                Ok(Err(e)) => ExtractionFailure::new(FailureReason::BackendUnavailable, e.to_string()),
                Err(_) => ExtractionFailure::new(
                    FailureReason::BackendTimeout,
                    Error::Timeout(self.config.timeout).to_string(),
                ),
            };

            if !failure.reason.is_transient() || attempt >= self.config.max_retries {
                warn!(
                    host = %self.backend.host(),
                    attempts = attempt + 1,
                    reason = failure.reason.as_str(),
                    "Backend call failed: {}",
                    failure
                );
                return Err(failure);
            }

            attempt += 1;
            let delay = self.config.backoff_for(attempt);
            warn!(
                reason = failure.reason.as_str(),
                retry_in_ms = delay.as_millis() as u64,
                "Backend call failed, retrying: {}",
                failure
            );
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::ai::{MockBackend, MockReply};
    use crate::extract::RequiredField;

    fn fast_config(max_retries: u32) -> ExtractionConfig {
        ExtractionConfig {
            timeout: Duration::from_millis(100),
            max_retries,
            retry_backoff: Duration::from_millis(1),
        }
    }

    fn pipeline(mock: MockBackend, max_retries: u32) -> ExtractionPipeline {
        ExtractionPipeline::new(
            AIClient::Mock(mock),
            fast_config(max_retries),
            &mut PromptLibrary::embedded_only(),
        )
        .unwrap()
    }

    fn request(text: &str) -> TextRequest {
        TextRequest::new(text, Some("+911234567890".into())).unwrap()
    }

    #[test]
    fn test_prompt_embeds_text_and_every_category() {
        let mut library = PromptLibrary::embedded_only();
        let prompt = library.get(PromptId::ExtractExpense).unwrap();
        let rendered = build_prompt(prompt, &request("  panipuri 20  "));

        assert!(rendered.ends_with("Expense text: panipuri 20"));
        for category in Category::ALL {
            assert!(rendered.contains(category.as_str()), "missing {}", category);
        }
        assert!(rendered.contains("exactly two fields"));
        assert!(!rendered.contains("{{"));
        assert_eq!(rendered, build_prompt(prompt, &request("panipuri 20")));
    }

    fn override_library(body: &str) -> (tempfile::TempDir, PromptLibrary) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("extract_expense.md"),
            format!("---\nid: extract_expense\nversion: 2\n---\n{}", body),
        )
        .unwrap();
        let library = PromptLibrary::with_override_dir(dir.path().to_path_buf());
        (dir, library)
    }

    fn build_with(library: &mut PromptLibrary) -> Result<ExtractionPipeline> {
        ExtractionPipeline::new(AIClient::Mock(MockBackend::new()), fast_config(0), library)
    }

    #[test]
    fn test_override_user_section_without_placeholders_rejected() {
        let (_dir, mut library) =
            override_library("# System\nBe terse.\n\n# User\nReturn JSON please.");
        let err = build_with(&mut library).err().expect("override should be rejected");
        assert!(matches!(err, Error::Config(ref m) if m.contains("{{text}}")), "{}", err);
    }

    #[test]
    fn test_override_missing_categories_rejected() {
        let (_dir, mut library) = override_library("# User\nExpense text: {{text}}");
        let err = build_with(&mut library).err().expect("override should be rejected");
        assert!(matches!(err, Error::Config(ref m) if m.contains("{{categories}}")), "{}", err);
    }

    #[test]
    fn test_override_without_sections_checks_whole_body() {
        let (_dir, mut library) = override_library("Only a note, no placeholders.");
        assert!(matches!(build_with(&mut library), Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_valid_override_prompt_carries_text_and_categories() {
        let (_dir, mut library) = override_library(
            "# System\nBe terse.\n\n# User\nPick one of {{categories}}.\nText: {{text}}",
        );
        let mock = MockBackend::new();
        let pipeline = ExtractionPipeline::new(
            AIClient::Mock(mock.clone()),
            fast_config(0),
            &mut library,
        )
        .unwrap();
        pipeline.extract(&request("chai 15")).await.unwrap();

        let sent = &mock.prompts()[0];
        assert!(sent.contains("chai 15"));
        for category in Category::ALL {
            assert!(sent.contains(category.as_str()), "missing {}", category);
        }
    }

    #[tokio::test]
    async fn test_fenced_reply_becomes_record() {
        let mock = MockBackend::with_replies(vec![MockReply::text(
            "```json\n{\"price\": 20, \"category\": \"Food\"}\n```",
        )]);
        let record = pipeline(mock, 1).extract(&request("panipuri 20")).await.unwrap();

        assert_eq!(record.price, 20.0);
        assert_eq!(record.category, Category::Food);
        assert_eq!(record.description, "panipuri 20");
        assert_eq!(record.sender_id.as_deref(), Some("+911234567890"));
    }

    #[tokio::test]
    async fn test_transport_failure_retried_once() {
        let mock = MockBackend::with_replies(vec![
            MockReply::fail("connection reset"),
            MockReply::text(r#"{"price": 10, "category": "transport"}"#),
        ]);
        let record = pipeline(mock.clone(), 1).extract(&request("bus 10")).await.unwrap();

        assert_eq!(record.category, Category::Transport);
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let mock = MockBackend::with_replies(vec![
            MockReply::fail("down"),
            MockReply::fail("still down"),
            MockReply::text(r#"{"price": 1, "category": "Food"}"#),
        ]);
        let failure = pipeline(mock.clone(), 1).extract(&request("tea 1")).await.unwrap_err();

        assert_eq!(failure.reason, FailureReason::BackendUnavailable);
        assert!(failure.detail.contains("still down"));
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_hanging_backend_times_out() {
        let mock = MockBackend::with_replies(vec![MockReply::Hang]);
        let failure = pipeline(mock.clone(), 0).extract(&request("tea 1")).await.unwrap_err();

        assert_eq!(failure.reason, FailureReason::BackendTimeout);
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_reply_is_not_retried() {
        let mock = MockBackend::with_replies(vec![MockReply::text("```json\n\n```")]);
        let failure = pipeline(mock.clone(), 1).extract(&request("tea 1")).await.unwrap_err();

        assert_eq!(failure.reason, FailureReason::EmptyResponse);
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_parse_failures_surface_their_reason() {
        let mock = MockBackend::with_replies(vec![
            MockReply::text(r#"{"price": 50}"#),
            MockReply::text(r#"{"price": "free", "category": "Food"}"#),
            MockReply::text("I could not find an expense."),
        ]);
        let p = pipeline(mock.clone(), 1);

        let missing = p.extract(&request("a")).await.unwrap_err();
        assert_eq!(
            missing.reason,
            FailureReason::MissingField {
                field: RequiredField::Category
            }
        );
        let invalid = p.extract(&request("b")).await.unwrap_err();
        assert_eq!(invalid.reason, FailureReason::InvalidPrice);
        let malformed = p.extract(&request("c")).await.unwrap_err();
        assert_eq!(malformed.reason, FailureReason::MalformedPayload);

        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_unknown_category_falls_back() {
        let mock = MockBackend::with_replies(vec![MockReply::text(
            r#"{"price": 50, "category": "Snacks"}"#,
        )]);
        let record = pipeline(mock, 1).extract(&request("chips 50")).await.unwrap();
        assert_eq!(record.category, Category::Miscellaneous);
        assert_eq!(record.price, 50.0);
    }

    #[tokio::test]
    async fn test_heuristic_mock_end_to_end() {
        let record = pipeline(MockBackend::new(), 1)
            .extract(&request("uber to office 250"))
            .await
            .unwrap();
        assert_eq!(record.price, 250.0);
        assert_eq!(record.category, Category::Transport);
    }
}
