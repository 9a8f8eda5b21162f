//! Abroadly: a conversational study-abroad intake assistant.
//!
//! Every user utterance is sent to an LLM twice — once to generate the
//! consultant reply, once to extract a partial JSON fragment of applicant
//! facts. The fragment is merged into a fixed-schema [`profile::Profile`]
//! without losing previously captured facts, and both the history and the
//! profile are persisted when the session ends.

pub mod config;
pub mod error;
pub mod extract;
pub mod llm;
pub mod profile;
pub mod session;

pub use config::Config;
pub use error::Error;
