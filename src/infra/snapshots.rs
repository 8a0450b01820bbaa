use crate::domain::{Snapshot, SnapshotPhase, extract_timestamp_from_id, system_time_to_unix_ms};
use crate::infra::{DataDir, PartRecord, session_titles, walk_part_records};
use std::cmp::Reverse;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Deduplicated, time-ordered timeline of tree snapshots taken during any
/// session of one project.
///
/// Parts are stored in a flat namespace keyed by message id, so this is a
/// full scan of every part record with post-hoc membership filtering.
/// Callers treat it as a slow, cacheable operation.
pub fn get_snapshots(data: &DataDir, project_id: &str) -> Vec<Snapshot> {
    let titles = session_titles(data, project_id);
    let mut seen: HashSet<String> = HashSet::new();
    let mut snapshots: Vec<Snapshot> = Vec::new();

    for (path, part) in walk_part_records(data) {
        let Some(hash) = part.snapshot.clone() else {
            continue;
        };
        let Some(phase) = part
            .kind
            .as_deref()
            .and_then(SnapshotPhase::parse)
        else {
            continue;
        };
        let Some(session_id) = part.session_id.clone() else {
            continue;
        };
        if !titles.contains_key(&session_id) {
            continue;
        }
        // One hash = one canonical record. If two messages produced the
        // same tree, the first one scanned keeps the association.
        if !seen.insert(hash.clone()) {
            continue;
        }

        snapshots.push(Snapshot {
            hash,
            timestamp: resolve_part_timestamp(&part, &path),
            phase,
            session_title: titles.get(&session_id).cloned(),
            session_id,
            message_id: part.message_id.clone().unwrap_or_default(),
        });
    }

    snapshots.sort_by_key(|snapshot| Reverse(snapshot.timestamp));
    snapshots
}

/// Timestamp recovery in decreasing order of trust: the record's explicit
/// creation time, then a timestamp decoded from its own id, then the
/// backing file's mtime.
fn resolve_part_timestamp(part: &PartRecord, path: &Path) -> i64 {
    let explicit = part
        .time
        .as_ref()
        .and_then(|time| time.created)
        .unwrap_or(0);
    if explicit != 0 {
        return explicit;
    }

    if let Some(decoded) = part
        .id
        .as_deref()
        .and_then(extract_timestamp_from_id)
    {
        return decoded;
    }

    fs::metadata(path)
        .ok()
        .and_then(|meta| meta.modified().ok())
        .and_then(system_time_to_unix_ms)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn fixture() -> (tempfile::TempDir, DataDir) {
        let dir = tempdir().expect("tempdir");
        let data = DataDir::new(dir.path().to_path_buf());
        (dir, data)
    }

    fn add_session(data: &DataDir, project_id: &str, session_id: &str, title: &str) {
        let dir = data.session_dir(project_id);
        fs::create_dir_all(&dir).expect("session dir");
        fs::write(
            dir.join(format!("{session_id}.json")),
            format!(r#"{{"id": "{session_id}", "title": "{title}"}}"#),
        )
        .expect("session record");
    }

    fn add_part(data: &DataDir, message_id: &str, part_id: &str, body: &str) {
        let dir = data.part_dir(message_id);
        fs::create_dir_all(&dir).expect("part dir");
        fs::write(dir.join(format!("{part_id}.json")), body).expect("part record");
    }

    const HASH_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const HASH_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    fn snapshot_part(session_id: &str, message_id: &str, hash: &str, created: i64) -> String {
        format!(
            r#"{{"id": "prt_x", "sessionID": "{session_id}", "messageID": "{message_id}", "type": "step-finish", "snapshot": "{hash}", "time": {{"created": {created}}}}}"#
        )
    }

    #[test]
    fn filters_by_phase_membership_and_snapshot_presence() {
        let (_dir, data) = fixture();
        add_session(&data, "p1", "s1", "mine");
        add_session(&data, "p2", "s9", "other project");

        add_part(&data, "m1", "p1", &snapshot_part("s1", "m1", HASH_A, 100));
        // No snapshot pointer.
        add_part(
            &data,
            "m2",
            "p1",
            r#"{"sessionID": "s1", "messageID": "m2", "type": "step-finish"}"#,
        );
        // Wrong phase.
        add_part(
            &data,
            "m3",
            "p1",
            &format!(
                r#"{{"sessionID": "s1", "messageID": "m3", "type": "text", "snapshot": "{HASH_B}"}}"#
            ),
        );
        // Other project's session.
        add_part(&data, "m4", "p1", &snapshot_part("s9", "m4", HASH_B, 200));

        let snapshots = get_snapshots(&data, "p1");
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].hash, HASH_A);
        assert_eq!(snapshots[0].session_title.as_deref(), Some("mine"));
        assert_eq!(snapshots[0].phase, SnapshotPhase::StepFinish);
    }

    #[test]
    fn duplicate_hashes_keep_only_the_first_scanned_record() {
        let (_dir, data) = fixture();
        add_session(&data, "p1", "s1", "one");
        add_session(&data, "p1", "s2", "two");

        // Scan order is path order: m1 before m2.
        add_part(&data, "m1", "p1", &snapshot_part("s1", "m1", HASH_A, 100));
        add_part(&data, "m2", "p1", &snapshot_part("s2", "m2", HASH_A, 999));

        let snapshots = get_snapshots(&data, "p1");
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].message_id, "m1");
        assert_eq!(snapshots[0].session_id, "s1");
        assert_eq!(snapshots[0].timestamp, 100);
    }

    #[test]
    fn timeline_is_sorted_descending_by_timestamp() {
        let (_dir, data) = fixture();
        add_session(&data, "p1", "s1", "one");
        add_part(&data, "m1", "p1", &snapshot_part("s1", "m1", HASH_A, 100));
        add_part(&data, "m2", "p1", &snapshot_part("s1", "m2", HASH_B, 300));

        let snapshots = get_snapshots(&data, "p1");
        let timestamps: Vec<i64> = snapshots.iter().map(|s| s.timestamp).collect();
        assert_eq!(timestamps, vec![300, 100]);
    }

    #[test]
    fn timestamp_falls_back_to_the_id_then_the_file_mtime() {
        let (_dir, data) = fixture();
        add_session(&data, "p1", "s1", "one");

        let encoded = 1_700_000_000_000i64;
        add_part(
            &data,
            "m1",
            "p1",
            &format!(
                r#"{{"id": "prt_{encoded:011x}", "sessionID": "s1", "messageID": "m1", "type": "step-start", "snapshot": "{HASH_A}"}}"#
            ),
        );
        add_part(
            &data,
            "m2",
            "p2",
            &format!(
                r#"{{"id": "prt_zz", "sessionID": "s1", "messageID": "m2", "type": "step-start", "snapshot": "{HASH_B}"}}"#
            ),
        );

        let snapshots = get_snapshots(&data, "p1");
        assert_eq!(snapshots.len(), 2);
        let by_hash = |hash: &str| {
            snapshots
                .iter()
                .find(|s| s.hash == hash)
                .expect("snapshot")
                .timestamp
        };
        assert_eq!(by_hash(HASH_A), encoded);
        // No explicit time and a non-timestamp id: mtime of a file written
        // just now is well past the id-decode window's lower bound.
        assert!(by_hash(HASH_B) > 1_600_000_000_000);
    }
}
