use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One tracked worktree the agent has operated on. Reconstructed fresh on
/// every query; identity is the directory name under `snapshot/`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub worktree: String,
    pub created: Option<i64>,
    pub last_session: Option<Session>,
    pub session_count: usize,
    pub change_count: usize,
    pub git_dir: PathBuf,
}

/// One agent conversation within a project. `updated == 0` means the
/// timestamp is unknown and sorts last under recency ordering.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub title: String,
    pub created: i64,
    pub updated: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<DiffSummary>,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct DiffSummary {
    pub additions: u64,
    pub deletions: u64,
    pub files: u64,
}

/// A session joined with its diff record. Sessions without a diff record
/// (or with an empty diff array) have no `SessionChange` at all.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionChange {
    pub session_id: String,
    pub title: String,
    pub updated: i64,
    pub files: Vec<FileDiff>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<DiffSummary>,
}

/// Before/after contents of one file. An empty side signals creation or
/// deletion respectively.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct FileDiff {
    pub file: String,
    #[serde(default)]
    pub before: String,
    #[serde(default)]
    pub after: String,
}

/// One row of a tree store's recursive listing.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct FileEntry {
    pub mode: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub hash: String,
    pub path: String,
    pub name: String,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SnapshotPhase {
    StepStart,
    StepFinish,
}

impl SnapshotPhase {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "step-start" => Some(Self::StepStart),
            "step-finish" => Some(Self::StepFinish),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::StepStart => "step-start",
            Self::StepFinish => "step-finish",
        }
    }
}

/// A content-addressed tree captured before or after one agent step.
/// Identity is the tree hash; the catalog keeps one record per hash.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub hash: String,
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub phase: SnapshotPhase,
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_title: Option<String>,
    pub message_id: String,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    #[default]
    Assistant,
}

impl MessageRole {
    pub fn label(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub session_id: String,
    pub session_title: String,
    pub project_id: String,
    pub project_name: String,
    pub message_id: String,
    pub text: String,
    pub timestamp: i64,
    pub role: MessageRole,
    pub snapshot: Option<String>,
}
