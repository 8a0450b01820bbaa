use crate::infra::{DataDir, json_files, read_record};
use serde::Deserialize;
use std::path::PathBuf;
use walkdir::WalkDir;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PartTime {
    pub created: Option<i64>,
    pub start: Option<i64>,
    pub end: Option<i64>,
}

/// Raw message-part record as stored under `storage/part/<messageId>/`.
/// Every field is optional; partial records are kept wherever the caller
/// only needs the fields that are present.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct PartRecord {
    pub id: Option<String>,
    #[serde(rename = "sessionID")]
    pub session_id: Option<String>,
    #[serde(rename = "messageID")]
    pub message_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub text: Option<String>,
    pub snapshot: Option<String>,
    pub time: Option<PartTime>,
}

/// Walk every part record in the data directory, in path order.
///
/// Parts live in a flat namespace keyed by message id, not by project, so
/// project-scoped queries have to scan everything and filter afterwards.
/// Callers treat this as the slow path it is.
pub fn walk_part_records(data: &DataDir) -> impl Iterator<Item = (PathBuf, PartRecord)> {
    WalkDir::new(data.part_base())
        .min_depth(2)
        .max_depth(2)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .flatten()
        .filter(|entry| {
            entry.file_type().is_file()
                && entry.path().extension().and_then(|ext| ext.to_str()) == Some("json")
        })
        .filter_map(|entry| {
            let record = read_record::<PartRecord>(entry.path())?;
            Some((entry.into_path(), record))
        })
}

/// Part records belonging to one message, the cheap project-independent
/// lookup.
pub fn part_records_for_message(data: &DataDir, message_id: &str) -> Vec<PartRecord> {
    json_files(&data.part_dir(message_id))
        .iter()
        .filter_map(|path| read_record::<PartRecord>(path))
        .collect()
}
