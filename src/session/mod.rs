//! Conversation loop: one strictly sequential turn at a time.
//!
//! Per turn: read input → generate the consultant reply and run extraction
//! concurrently (they both read the *previous* turn's profile) → merge the
//! extraction fragment → append to history. The merged profile is round-
//! tripped into the next turn's prompts; it is the only synchronization
//! mechanism between turns.

pub mod history;
pub mod persist;

use std::sync::Arc;

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use uuid::Uuid;

use crate::config::Config;
use crate::error::Error;
use crate::extract::Extractor;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider, complete_with_retry};
use crate::profile::{Profile, merge};
use crate::session::history::{History, Turn};

/// Reply used when the conversational model call fails or times out.
/// The turn still completes and the profile carries forward unchanged.
const FALLBACK_REPLY: &str =
    "I'm sorry, I had trouble responding just now. Could you say that again?";

/// Consultant reply template. `{profile}`, `{history}` and `{user_input}`
/// are substituted per turn.
const REPLY_PROMPT: &str = "\
You are a professional study-abroad consultant. Guide the user, in a gentle
and friendly conversation, to share more about their study-abroad background
and help them understand their current standing. Ask about the information
below that is still unknown, one or two things at a time.

Known applicant profile so far:
{profile}

Conversation history:
{history}

User: {user_input}
Agent:";

/// One interactive intake session.
pub struct Session {
    chat_provider: Arc<dyn LlmProvider>,
    extractor: Extractor,
    config: Config,
    id: Uuid,
    history: History,
    profile: Profile,
}

impl Session {
    pub fn new(
        chat_provider: Arc<dyn LlmProvider>,
        extract_provider: Arc<dyn LlmProvider>,
        config: Config,
    ) -> Self {
        let extractor = Extractor::new(extract_provider, &config.llm);
        Self {
            chat_provider,
            extractor,
            config,
            id: Uuid::new_v4(),
            history: History::new(),
            profile: Profile::new(),
        }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Run the interactive loop until the user types `exit` (or EOF/ctrl-c),
    /// then persist the session artifacts.
    pub async fn run(&mut self) -> Result<(), Error> {
        let mut editor = DefaultEditor::new()?;

        tracing::info!(session_id = %self.id, "Session started");
        println!("Start chatting (type 'exit' to stop):");

        loop {
            match editor.readline("You: ") {
                Ok(line) => {
                    let input = line.trim();
                    if input.is_empty() {
                        continue;
                    }
                    if is_exit(input) {
                        break;
                    }
                    let _ = editor.add_history_entry(input);
                    let reply = self.process_turn(input).await;
                    println!("Bot: {reply}");
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(e) => return Err(e.into()),
            }
        }

        self.finish();
        Ok(())
    }

    /// Process one turn: reply + extraction concurrently, then merge, then
    /// append to history. Returns the reply to show the user.
    pub async fn process_turn(&mut self, input: &str) -> String {
        let reply_prompt = self.reply_prompt(input);

        let (reply, fragment) = tokio::join!(
            self.generate_reply(reply_prompt),
            self.extractor.extract(input, &self.profile),
        );

        // Only the merge writes the profile, and it completes before the
        // next turn reads it as prompt context.
        match fragment {
            Some(fragment) => {
                let report = merge(&mut self.profile, &fragment);
                tracing::info!(
                    session_id = %self.id,
                    fields_updated = report.fields_updated,
                    entries_appended = report.entries_appended,
                    duplicates_skipped = report.duplicates_skipped,
                    "Merged extraction fragment"
                );
                for anomaly in &report.anomalies {
                    tracing::warn!(session_id = %self.id, "Merge anomaly: {}", anomaly);
                }
            }
            None => {
                tracing::debug!(session_id = %self.id, "No extraction this turn");
            }
        }

        self.history.push(Turn {
            user: input.to_string(),
            bot: reply.clone(),
        });

        reply
    }

    async fn generate_reply(&self, prompt: String) -> String {
        let request = CompletionRequest::new(vec![ChatMessage::user(prompt)])
            .with_temperature(0.7)
            .with_max_tokens(512);

        match complete_with_retry(
            self.chat_provider.as_ref(),
            request,
            self.config.llm.request_timeout,
            0,
        )
        .await
        {
            Ok(response) => {
                let reply = response.content.trim().to_string();
                if reply.is_empty() {
                    FALLBACK_REPLY.to_string()
                } else {
                    reply
                }
            }
            Err(e) => {
                tracing::warn!("Reply generation failed, using fallback: {}", e);
                FALLBACK_REPLY.to_string()
            }
        }
    }

    fn reply_prompt(&self, input: &str) -> String {
        REPLY_PROMPT
            .replace("{profile}", &self.profile.to_json_pretty())
            .replace("{history}", &self.history.render_for_prompt())
            .replace("{user_input}", input)
    }

    /// Persist the session artifacts, echoing them to stdout if the write
    /// fails so the transcript is never silently discarded.
    fn finish(&self) {
        match persist::persist_session(
            &self.config.session.output_dir,
            self.id,
            chrono::Local::now(),
            &self.history,
            &self.profile,
        ) {
            Ok(paths) => {
                println!("Chat history saved to {}", paths.history.display());
                println!("Profile saved to {}", paths.profile.display());
                tracing::info!(session_id = %self.id, "Session persisted");
            }
            Err(e) => {
                tracing::error!(session_id = %self.id, "Failed to persist session: {}", e);
                eprintln!("Could not save the session ({e}); dumping it here instead:");
                println!(
                    "{}",
                    serde_json::to_string_pretty(&self.history)
                        .unwrap_or_else(|_| "[]".to_string())
                );
                println!("{}", self.profile.to_json_pretty());
            }
        }
    }
}

/// Termination signal: a case-insensitive exact match of the literal `exit`.
pub fn is_exit(input: &str) -> bool {
    input.trim().eq_ignore_ascii_case("exit")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_matching_is_case_insensitive_and_exact() {
        assert!(is_exit("exit"));
        assert!(is_exit("EXIT"));
        assert!(is_exit("  Exit "));
        assert!(!is_exit("exit now"));
        assert!(!is_exit("quit"));
    }
}
