//! End-to-end session flow against scripted providers: two turns of
//! accumulation, degraded turns, and the persisted artifacts.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use uuid::Uuid;

use abroadly::config::{Config, LlmConfig, SessionConfig};
use abroadly::error::LlmError;
use abroadly::llm::{CompletionRequest, CompletionResponse, FinishReason, LlmProvider};
use abroadly::session::persist::persist_session;
use abroadly::session::Session;

/// Provider that plays back a fixed script of responses, then errors.
struct ScriptedProvider {
    name: &'static str,
    script: Mutex<VecDeque<String>>,
}

impl ScriptedProvider {
    fn new(name: &'static str, responses: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            name,
            script: Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
        })
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn model_name(&self) -> &str {
        self.name
    }

    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(content) => Ok(CompletionResponse {
                content,
                finish_reason: FinishReason::Stop,
            }),
            None => Err(LlmError::RequestFailed {
                provider: self.name.to_string(),
                reason: "script exhausted".to_string(),
            }),
        }
    }
}

fn test_config(output_dir: PathBuf) -> Config {
    Config {
        llm: LlmConfig {
            base_url: "http://localhost:1".to_string(),
            api_key: None,
            chat_model: "scripted".to_string(),
            extract_model: "scripted".to_string(),
            request_timeout: Duration::from_secs(5),
            max_retries: 0,
        },
        session: SessionConfig { output_dir },
    }
}

#[tokio::test]
async fn two_turns_accumulate_profile_and_history() {
    let chat = ScriptedProvider::new(
        "chat",
        &["Nice to meet you!", "A 3.8 GPA is strong. Which schools interest you?"],
    );
    let extract = ScriptedProvider::new(
        "extract",
        &[
            r#"{"personalInfo": {"gender": "female", "nationality": "Canada"}}"#,
            r#"Extracted: {"standardGrades": {"gpa": "3.8", "gpaTotal": "4.0"}}"#,
        ],
    );

    let dir = tempfile::tempdir().unwrap();
    let mut session = Session::new(chat, extract, test_config(dir.path().to_path_buf()));

    let reply = session.process_turn("I'm a female student from Canada").await;
    assert_eq!(reply, "Nice to meet you!");

    let reply = session.process_turn("My GPA is 3.8 out of 4.0").await;
    assert_eq!(reply, "A 3.8 GPA is strong. Which schools interest you?");

    let profile = session.profile();
    assert_eq!(profile.scalar("personalInfo", "gender").unwrap(), "female");
    assert_eq!(
        profile.scalar("personalInfo", "nationality").unwrap(),
        "Canada"
    );
    assert_eq!(profile.scalar("standardGrades", "gpa").unwrap(), "3.8");
    assert_eq!(profile.scalar("standardGrades", "gpaTotal").unwrap(), "4.0");

    let history = session.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history.turns()[0].user, "I'm a female student from Canada");
    assert_eq!(history.turns()[0].bot, "Nice to meet you!");
}

#[tokio::test]
async fn failed_calls_degrade_without_losing_the_turn() {
    // Empty scripts: every call fails.
    let chat = ScriptedProvider::new("chat", &[]);
    let extract = ScriptedProvider::new("extract", &[]);

    let dir = tempfile::tempdir().unwrap();
    let mut session = Session::new(chat, extract, test_config(dir.path().to_path_buf()));

    let reply = session.process_turn("I went to McGill").await;
    // Apologetic fallback, turn still recorded, profile untouched.
    assert!(!reply.is_empty());
    assert_eq!(session.history().len(), 1);
    assert_eq!(session.profile(), &abroadly::profile::Profile::new());
}

#[tokio::test]
async fn unparsable_extraction_leaves_profile_unchanged() {
    let chat = ScriptedProvider::new("chat", &["Tell me more!"]);
    let extract = ScriptedProvider::new("extract", &["no structured data here"]);

    let dir = tempfile::tempdir().unwrap();
    let mut session = Session::new(chat, extract, test_config(dir.path().to_path_buf()));

    session.process_turn("hello").await;
    assert_eq!(session.profile(), &abroadly::profile::Profile::new());
    assert_eq!(session.history().len(), 1);
}

#[tokio::test]
async fn session_artifacts_round_trip() {
    let chat = ScriptedProvider::new("chat", &["Great!"]);
    let extract = ScriptedProvider::new(
        "extract",
        &[r#"{"appliedPrograms": [{"school": "ETH Zurich", "programLevel": "Master"}]}"#],
    );

    let dir = tempfile::tempdir().unwrap();
    let mut session = Session::new(chat, extract, test_config(dir.path().to_path_buf()));
    session.process_turn("I applied to ETH Zurich for a Master's").await;

    let paths = persist_session(
        dir.path(),
        Uuid::new_v4(),
        chrono::Local::now(),
        session.history(),
        session.profile(),
    )
    .unwrap();

    let history_doc: Value =
        serde_json::from_str(&std::fs::read_to_string(&paths.history).unwrap()).unwrap();
    assert_eq!(
        history_doc,
        json!([{"user": "I applied to ETH Zurich for a Master's", "bot": "Great!"}])
    );

    let profile_doc: Value =
        serde_json::from_str(&std::fs::read_to_string(&paths.profile).unwrap()).unwrap();
    assert_eq!(profile_doc["appliedPrograms"][0]["school"], "ETH Zurich");
    assert_eq!(profile_doc["appliedPrograms"][0]["result"], Value::Null);
    // The untouched sections persist with their full null shape.
    assert_eq!(profile_doc["personalInfo"]["gender"], Value::Null);
}
