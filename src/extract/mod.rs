//! Extraction adapter: one LLM call per turn that turns a free-form
//! utterance into a partial JSON fragment for the merge engine.

pub mod parser;

use std::fmt::Write as _;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::config::LlmConfig;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider, complete_with_retry};
use crate::profile::schema::{SECTIONS, SectionKind};
use crate::profile::Profile;

/// Extraction instruction template. `{taxonomy}`, `{current}` and
/// `{user_input}` are substituted per call.
const EXTRACTION_PROMPT: &str = "\
You are the information-extraction module of a study-abroad intake assistant.
Analyze the user input and extract any applicant facts it states.

User input: {user_input}

Use exactly these sections and field names:
{taxonomy}

Current profile (for context, do not invent values):
{current}

Respond with a single JSON object containing only the sections you extracted
facts for. Use null for fields the input does not state. Do not add keys that
are not listed above.

Extracted information (JSON):";

/// Wraps the extraction model call behind a degrade-to-nothing interface.
pub struct Extractor {
    provider: Arc<dyn LlmProvider>,
    timeout: std::time::Duration,
    max_retries: u32,
}

impl Extractor {
    pub fn new(provider: Arc<dyn LlmProvider>, config: &LlmConfig) -> Self {
        Self {
            provider,
            timeout: config.request_timeout,
            max_retries: config.max_retries,
        }
    }

    /// Extract a profile fragment from one utterance.
    ///
    /// `None` means "the model supplied nothing usable this turn": call
    /// failure, timeout, exhausted retries, and unparsable output all land
    /// here. The conversation continues either way.
    pub async fn extract(&self, utterance: &str, profile: &Profile) -> Option<Map<String, Value>> {
        let prompt = build_extraction_prompt(utterance, profile);
        let request = CompletionRequest::new(vec![ChatMessage::user(prompt)])
            .with_temperature(0.1)
            .with_max_tokens(1024);

        let raw = match complete_with_retry(
            self.provider.as_ref(),
            request,
            self.timeout,
            self.max_retries,
        )
        .await
        {
            Ok(response) => response.content,
            Err(e) => {
                tracing::warn!("Extraction call failed, no extraction this turn: {}", e);
                return None;
            }
        };

        tracing::debug!(raw_len = raw.len(), "Extraction model responded");
        parser::extract_fragment(&raw)
    }
}

/// Render the extraction instruction for one utterance.
fn build_extraction_prompt(utterance: &str, profile: &Profile) -> String {
    EXTRACTION_PROMPT
        .replace("{user_input}", utterance)
        .replace("{taxonomy}", &field_taxonomy())
        .replace("{current}", &profile.to_json_pretty())
}

/// The schema's field taxonomy by name, rendered for the prompt.
fn field_taxonomy() -> String {
    let mut out = String::new();
    for spec in SECTIONS {
        let kind = match spec.kind {
            SectionKind::Scalar => "",
            SectionKind::Repeatable => " (list of entries)",
        };
        let _ = writeln!(out, "- {}{}: {}", spec.name, kind, spec.fields.join(", "));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use crate::llm::{CompletionResponse, FinishReason};
    use async_trait::async_trait;
    use std::time::Duration;

    struct CannedProvider {
        reply: String,
    }

    #[async_trait]
    impl LlmProvider for CannedProvider {
        fn model_name(&self) -> &str {
            "canned"
        }

        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            Ok(CompletionResponse {
                content: self.reply.clone(),
                finish_reason: FinishReason::Stop,
            })
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl LlmProvider for FailingProvider {
        fn model_name(&self) -> &str {
            "failing"
        }

        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            Err(LlmError::AuthFailed {
                provider: "failing".to_string(),
            })
        }
    }

    fn extractor(provider: Arc<dyn LlmProvider>) -> Extractor {
        Extractor {
            provider,
            timeout: Duration::from_secs(1),
            max_retries: 0,
        }
    }

    #[test]
    fn prompt_contains_taxonomy_and_current_profile() {
        let mut profile = Profile::new();
        crate::profile::merge(
            &mut profile,
            serde_json::json!({"personalInfo": {"gender": "female"}})
                .as_object()
                .unwrap(),
        );

        let prompt = build_extraction_prompt("My GPA is 3.8", &profile);
        assert!(prompt.contains("My GPA is 3.8"));
        assert!(prompt.contains("- personalInfo: gender, nationality"));
        assert!(prompt.contains("- professionalExperiences (list of entries): employer"));
        // The round-tripped profile is the synchronization mechanism between turns.
        assert!(prompt.contains("\"gender\": \"female\""));
    }

    #[tokio::test]
    async fn extracts_fragment_from_prose_wrapped_reply() {
        let provider = Arc::new(CannedProvider {
            reply: r#"Here is what I found: {"standardGrades": {"gpa": "3.8"}}"#.to_string(),
        });
        let fragment = extractor(provider)
            .extract("My GPA is 3.8", &Profile::new())
            .await
            .unwrap();
        assert_eq!(fragment["standardGrades"]["gpa"], "3.8");
    }

    #[tokio::test]
    async fn provider_failure_degrades_to_no_extraction() {
        let fragment = extractor(Arc::new(FailingProvider))
            .extract("anything", &Profile::new())
            .await;
        assert!(fragment.is_none());
    }

    #[tokio::test]
    async fn unusable_reply_degrades_to_no_extraction() {
        let provider = Arc::new(CannedProvider {
            reply: "I could not find any structured information.".to_string(),
        });
        let fragment = extractor(provider)
            .extract("hello", &Profile::new())
            .await;
        assert!(fragment.is_none());
    }
}
