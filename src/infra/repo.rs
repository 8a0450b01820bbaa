use crate::domain::{DiffSummary, FileDiff, Project, Session, SessionChange};
use crate::infra::{DataDir, dir_names, json_files, read_record};
use serde::Deserialize;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::fs;

/// A diff record at or under this size is "diff file exists but says
/// nothing": an empty array plus whitespace. Counting changes goes by raw
/// byte size, the record is not parsed.
const DIFF_PRESENCE_MIN_BYTES: u64 = 10;

const UNKNOWN_WORKTREE: &str = "Unknown";

#[derive(Debug, Default, Deserialize)]
struct TimeRange {
    created: Option<i64>,
    updated: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ProjectRecord {
    worktree: Option<String>,
    time: Option<TimeRange>,
}

#[derive(Debug, Deserialize)]
struct RevertRecord {
    snapshot: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SessionRecord {
    id: String,
    #[serde(default)]
    title: String,
    time: Option<TimeRange>,
    revert: Option<RevertRecord>,
    summary: Option<DiffSummary>,
}

impl SessionRecord {
    fn into_session(self) -> Session {
        let time = self.time.unwrap_or_default();
        Session {
            id: self.id,
            title: self.title,
            created: time.created.unwrap_or(0),
            updated: time.updated.unwrap_or(0),
            snapshot: self.revert.and_then(|revert| revert.snapshot),
            summary: self.summary,
        }
    }
}

/// True iff a store directory for `id` exists under `snapshot/`. Cheap
/// guard used before the heavier loads; a project-info record is not
/// required.
pub fn project_exists(data: &DataDir, id: &str) -> bool {
    data.project_store_dir(id).is_dir()
}

fn load_sessions(data: &DataDir, project_id: &str) -> Vec<Session> {
    let mut sessions: Vec<Session> = json_files(&data.session_dir(project_id))
        .iter()
        .filter_map(|path| read_record::<SessionRecord>(path))
        .map(SessionRecord::into_session)
        .collect();
    sessions.sort_by_key(|session| Reverse(session.updated));
    sessions
}

fn has_meaningful_diff(data: &DataDir, session_id: &str) -> bool {
    fs::metadata(data.session_diff_record(session_id))
        .map(|meta| meta.len() > DIFF_PRESENCE_MIN_BYTES)
        .unwrap_or(false)
}

fn load_project(data: &DataDir, id: &str) -> Option<Project> {
    let git_dir = data.project_store_dir(id);
    if !git_dir.is_dir() {
        return None;
    }

    let info = read_record::<ProjectRecord>(&data.project_record(id));
    let sessions = load_sessions(data, id);
    let change_count = sessions
        .iter()
        .filter(|session| has_meaningful_diff(data, &session.id))
        .count();

    let worktree = info
        .as_ref()
        .and_then(|record| record.worktree.clone())
        .unwrap_or_else(|| UNKNOWN_WORKTREE.to_string());
    let name = if worktree == UNKNOWN_WORKTREE {
        UNKNOWN_WORKTREE.to_string()
    } else {
        std::path::Path::new(&worktree)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(UNKNOWN_WORKTREE)
            .to_string()
    };

    Some(Project {
        id: id.to_string(),
        name,
        worktree,
        created: info.and_then(|record| record.time).and_then(|t| t.created),
        session_count: sessions.len(),
        change_count,
        last_session: sessions.into_iter().next(),
        git_dir,
    })
}

/// Every project under the snapshot root, most recently active first.
/// Projects without sessions sort last; a missing snapshot root is an
/// empty listing.
pub fn list_projects(data: &DataDir) -> Vec<Project> {
    let mut projects: Vec<Project> = dir_names(&data.snapshot_base())
        .iter()
        .filter_map(|id| load_project(data, id))
        .collect();
    projects.sort_by_key(|project| {
        Reverse(
            project
                .last_session
                .as_ref()
                .map(|session| session.updated)
                .unwrap_or(0),
        )
    });
    projects
}

pub fn get_project(data: &DataDir, id: &str) -> Option<Project> {
    load_project(data, id)
}

/// Sessions of a project joined with their diff records. Sessions with no
/// diff record, or with an empty diff array, are absent from the result —
/// "no changes" is not an entry.
pub fn get_session_changes(data: &DataDir, project_id: &str) -> Vec<SessionChange> {
    let mut changes: Vec<SessionChange> = json_files(&data.session_dir(project_id))
        .iter()
        .filter_map(|path| read_record::<SessionRecord>(path))
        .filter_map(|record| {
            let files: Vec<FileDiff> = read_record(&data.session_diff_record(&record.id))?;
            if files.is_empty() {
                return None;
            }
            let session = record.into_session();
            Some(SessionChange {
                session_id: session.id,
                title: session.title,
                updated: session.updated,
                files,
                summary: session.summary,
            })
        })
        .collect();
    changes.sort_by_key(|change| Reverse(change.updated));
    changes
}

pub fn get_session_diff(data: &DataDir, session_id: &str) -> Vec<FileDiff> {
    read_record(&data.session_diff_record(session_id)).unwrap_or_default()
}

/// Reverse lookup: find the project owning a session by scanning the
/// per-project session directories for a matching filename.
pub fn get_session_info(data: &DataDir, session_id: &str) -> Option<(String, Session)> {
    for project_id in dir_names(&data.session_base()) {
        let path = data
            .session_dir(&project_id)
            .join(format!("{session_id}.json"));
        if let Some(record) = read_record::<SessionRecord>(&path) {
            return Some((project_id, record.into_session()));
        }
    }
    None
}

/// Session id → title map for one project, the membership set used by the
/// snapshot catalog.
pub fn session_titles(data: &DataDir, project_id: &str) -> BTreeMap<String, String> {
    json_files(&data.session_dir(project_id))
        .iter()
        .filter_map(|path| read_record::<SessionRecord>(path))
        .map(|record| (record.id, record.title))
        .collect()
}
