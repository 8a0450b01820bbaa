use crate::domain::{MessageRole, SearchResult, extract_timestamp_from_id};
use crate::infra::{
    DataDir, dir_names, json_files, part_records_for_message, read_record, walk_part_records,
};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Clone, Copy, Debug, Serialize)]
pub struct SearchIndexStats {
    pub indexed: bool,
    pub count: usize,
}

#[derive(Clone, Debug)]
struct SessionRef {
    title: String,
    project_id: String,
}

#[derive(Debug)]
struct IndexEntry {
    session_id: String,
    project_id: String,
    message_id: String,
    text: String,
    timestamp: i64,
    role: MessageRole,
}

#[derive(Debug)]
struct IndexState {
    entries: Vec<IndexEntry>,
    sessions: HashMap<String, SessionRef>,
    project_names: HashMap<String, String>,
}

/// Flat in-memory index over every text part in the data directory.
///
/// Built at most once per `SearchIndex` and frozen until `invalidate`;
/// queries against it see the data directory as of the first search, not
/// as of now. The owner decides when staleness matters.
pub struct SearchIndex {
    data: DataDir,
    state: Mutex<Option<Arc<IndexState>>>,
}

impl SearchIndex {
    pub fn new(data: DataDir) -> Self {
        Self {
            data,
            state: Mutex::new(None),
        }
    }

    fn ensure_built(&self) -> Arc<IndexState> {
        let mut guard = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(state) = guard.as_ref() {
            return Arc::clone(state);
        }
        let built = Arc::new(build_state(&self.data));
        *guard = Some(Arc::clone(&built));
        built
    }

    /// Drop the built index; the next query rebuilds from disk.
    pub fn invalidate(&self) {
        let mut guard = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = None;
    }

    pub fn stats(&self) -> SearchIndexStats {
        let guard = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        SearchIndexStats {
            indexed: guard.is_some(),
            count: guard.as_ref().map(|state| state.entries.len()).unwrap_or(0),
        }
    }

    /// Case-insensitive substring match over the index, most recent first,
    /// stopping once `limit` results are collected. No ranking, no
    /// tokenization.
    pub fn search(&self, query: &str, limit: usize) -> Vec<SearchResult> {
        let state = self.ensure_built();
        let needle = query.to_lowercase();
        let mut results: Vec<SearchResult> = Vec::new();

        for entry in &state.entries {
            if !entry.text.to_lowercase().contains(&needle) {
                continue;
            }
            let Some(meta) = state.sessions.get(&entry.session_id) else {
                continue;
            };
            results.push(SearchResult {
                session_id: entry.session_id.clone(),
                session_title: meta.title.clone(),
                project_id: entry.project_id.clone(),
                project_name: state
                    .project_names
                    .get(&entry.project_id)
                    .cloned()
                    .unwrap_or_else(|| "Unknown".to_string()),
                message_id: entry.message_id.clone(),
                text: entry.text.clone(),
                timestamp: entry.timestamp,
                role: entry.role,
                snapshot: None,
            });
            if results.len() >= limit {
                break;
            }
        }

        results
    }

    /// First snapshot pointer among one message's own parts. Does not
    /// touch or build the index.
    pub fn snapshot_for_message(&self, session_id: &str, message_id: &str) -> Option<String> {
        part_records_for_message(&self.data, message_id)
            .into_iter()
            .find(|part| part.session_id.as_deref() == Some(session_id) && part.snapshot.is_some())
            .and_then(|part| part.snapshot)
    }
}

#[derive(Debug, Deserialize)]
struct SessionHeader {
    id: String,
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct ProjectHeader {
    worktree: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageHeader {
    role: Option<String>,
}

fn build_session_refs(data: &DataDir) -> HashMap<String, SessionRef> {
    let mut sessions = HashMap::new();
    for project_id in dir_names(&data.session_base()) {
        for path in json_files(&data.session_dir(&project_id)) {
            let Some(header) = read_record::<SessionHeader>(&path) else {
                continue;
            };
            sessions.insert(
                header.id,
                SessionRef {
                    title: header.title,
                    project_id: project_id.clone(),
                },
            );
        }
    }
    sessions
}

fn build_project_names(data: &DataDir) -> HashMap<String, String> {
    let mut names = HashMap::new();
    for path in json_files(&data.project_record_base()) {
        let Some(project_id) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        let Some(worktree) = read_record::<ProjectHeader>(&path).and_then(|h| h.worktree) else {
            continue;
        };
        let name = std::path::Path::new(&worktree)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(&worktree)
            .to_string();
        names.insert(project_id.to_string(), name);
    }
    names
}

fn build_state(data: &DataDir) -> IndexState {
    let sessions = build_session_refs(data);
    let project_names = build_project_names(data);
    let mut entries: Vec<IndexEntry> = Vec::new();

    for (_path, part) in walk_part_records(data) {
        if part.kind.as_deref() != Some("text") {
            continue;
        }
        let Some(text) = part.text.filter(|text| !text.is_empty()) else {
            continue;
        };
        let Some(session_id) = part.session_id else {
            continue;
        };
        let Some(meta) = sessions.get(&session_id) else {
            continue;
        };
        let message_id = part.message_id.unwrap_or_default();

        let mut timestamp = part
            .time
            .as_ref()
            .and_then(|time| time.start.or(time.end))
            .unwrap_or(0);
        if timestamp == 0 {
            timestamp = part
                .id
                .as_deref()
                .and_then(extract_timestamp_from_id)
                .unwrap_or(0);
        }

        let role = read_record::<MessageHeader>(&data.message_record(&session_id, &message_id))
            .and_then(|header| header.role)
            .map(|role| {
                if role == "user" {
                    MessageRole::User
                } else {
                    MessageRole::Assistant
                }
            })
            .unwrap_or_default();

        entries.push(IndexEntry {
            project_id: meta.project_id.clone(),
            session_id,
            message_id,
            text,
            timestamp,
            role,
        });
    }

    entries.sort_by_key(|entry| Reverse(entry.timestamp));
    IndexState {
        entries,
        sessions,
        project_names,
    }
}
