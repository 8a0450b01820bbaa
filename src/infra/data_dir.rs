use std::path::{Path, PathBuf};
use thiserror::Error;

/// Root of the agent's data directory. Everything below it is read-only
/// from our side; another process keeps appending while we read.
///
/// Layout:
///   snapshot/<projectId>/                     one git tree store per project
///   storage/project/<projectId>.json
///   storage/session/<projectId>/<sessionId>.json
///   storage/session_diff/<sessionId>.json
///   storage/message/<sessionId>/<messageId>.json
///   storage/part/<messageId>/<partId>.json
#[derive(Clone, Debug)]
pub struct DataDir {
    root: PathBuf,
}

#[derive(Debug, Error)]
pub enum ResolveDataDirError {
    #[error("home directory not found")]
    HomeDirNotFound,
}

pub fn resolve_data_dir() -> Result<DataDir, ResolveDataDirError> {
    if let Some(override_dir) = std::env::var_os("OCSNAP_DATA_DIR") {
        return Ok(DataDir::new(PathBuf::from(override_dir)));
    }

    if let Some(xdg_data_home) = std::env::var_os("XDG_DATA_HOME") {
        return Ok(DataDir::new(PathBuf::from(xdg_data_home).join("opencode")));
    }

    let Some(home) = dirs::home_dir() else {
        return Err(ResolveDataDirError::HomeDirNotFound);
    };

    Ok(DataDir::new(
        home.join(".local").join("share").join("opencode"),
    ))
}

impl DataDir {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn snapshot_base(&self) -> PathBuf {
        self.root.join("snapshot")
    }

    pub fn project_store_dir(&self, project_id: &str) -> PathBuf {
        self.snapshot_base().join(project_id)
    }

    fn storage(&self) -> PathBuf {
        self.root.join("storage")
    }

    pub fn project_record(&self, project_id: &str) -> PathBuf {
        self.storage()
            .join("project")
            .join(format!("{project_id}.json"))
    }

    pub fn project_record_base(&self) -> PathBuf {
        self.storage().join("project")
    }

    pub fn session_base(&self) -> PathBuf {
        self.storage().join("session")
    }

    pub fn session_dir(&self, project_id: &str) -> PathBuf {
        self.session_base().join(project_id)
    }

    pub fn session_diff_record(&self, session_id: &str) -> PathBuf {
        self.storage()
            .join("session_diff")
            .join(format!("{session_id}.json"))
    }

    pub fn message_record(&self, session_id: &str, message_id: &str) -> PathBuf {
        self.storage()
            .join("message")
            .join(session_id)
            .join(format!("{message_id}.json"))
    }

    pub fn part_base(&self) -> PathBuf {
        self.storage().join("part")
    }

    pub fn part_dir(&self, message_id: &str) -> PathBuf {
        self.part_base().join(message_id)
    }
}
