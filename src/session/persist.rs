//! End-of-session persistence: the history and profile documents.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use uuid::Uuid;

use crate::error::PersistError;
use crate::profile::Profile;
use crate::session::history::History;

/// Paths of the two persisted documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedPaths {
    pub history: PathBuf,
    pub profile: PathBuf,
}

/// Write the session artifacts as pretty-printed JSON.
///
/// Filenames carry the session-end wall-clock timestamp plus a short session
/// id so two sessions ending within the same second cannot clobber each
/// other. The caller is responsible for echoing the in-memory documents if
/// this fails — the transcript must never be silently lost.
pub fn persist_session(
    dir: &Path,
    session_id: Uuid,
    ended_at: DateTime<Local>,
    history: &History,
    profile: &Profile,
) -> Result<PersistedPaths, PersistError> {
    std::fs::create_dir_all(dir).map_err(|e| PersistError::CreateDir {
        path: dir.display().to_string(),
        source: e,
    })?;

    let stamp = ended_at.format("%Y-%m-%d_%H-%M-%S");
    let short_id = &session_id.simple().to_string()[..8];

    let history_path = dir.join(format!("chat_history_{stamp}_{short_id}.json"));
    let profile_path = dir.join(format!("profile_{stamp}_{short_id}.json"));

    write_json(&history_path, &serde_json::to_string_pretty(history)?)?;
    write_json(&profile_path, &profile.to_json_pretty())?;

    Ok(PersistedPaths {
        history: history_path,
        profile: profile_path,
    })
}

fn write_json(path: &Path, contents: &str) -> Result<(), PersistError> {
    std::fs::write(path, contents).map_err(|e| PersistError::Write {
        path: path.display().to_string(),
        source: e,
    })
}
