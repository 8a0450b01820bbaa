use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

/// The one best-effort read primitive for on-disk JSON records.
///
/// The store is written incrementally by a live agent process, so a record
/// that is missing, unreadable, or mid-write is an expected state, not an
/// error. All of those collapse to `None` here; callers never see the
/// distinction.
pub fn read_record<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let raw = fs::read_to_string(path).ok()?;
    serde_json::from_str(&raw).ok()
}

/// `.json` files directly under `dir`, sorted by name. A missing or
/// unreadable directory is an empty listing.
pub fn json_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file() && path.extension().and_then(|ext| ext.to_str()) == Some("json")
        })
        .collect();
    files.sort();
    files
}

/// Names of subdirectories directly under `dir`, sorted.
pub fn dir_names(dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut names: Vec<String> = entries
        .flatten()
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::tempdir;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Probe {
        value: u32,
    }

    #[test]
    fn reads_a_well_formed_record() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("probe.json");
        fs::write(&path, r#"{"value": 7}"#).expect("write");
        assert_eq!(read_record::<Probe>(&path), Some(Probe { value: 7 }));
    }

    #[test]
    fn missing_and_malformed_records_collapse_to_none() {
        let dir = tempdir().expect("tempdir");
        assert_eq!(read_record::<Probe>(&dir.path().join("absent.json")), None);

        let path = dir.path().join("broken.json");
        fs::write(&path, r#"{"value": "#).expect("write");
        assert_eq!(read_record::<Probe>(&path), None);
    }

    #[test]
    fn listings_tolerate_missing_directories() {
        let dir = tempdir().expect("tempdir");
        assert!(json_files(&dir.path().join("nope")).is_empty());
        assert!(dir_names(&dir.path().join("nope")).is_empty());
    }

    #[test]
    fn listings_filter_by_kind() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("b.json"), "{}").expect("write");
        fs::write(dir.path().join("a.json"), "{}").expect("write");
        fs::write(dir.path().join("notes.txt"), "x").expect("write");
        fs::create_dir(dir.path().join("sub")).expect("mkdir");

        let files = json_files(dir.path());
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("a.json"));

        assert_eq!(dir_names(dir.path()), vec!["sub".to_string()]);
    }
}
