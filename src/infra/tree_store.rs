use crate::domain::FileEntry;
use crate::infra::{DataDir, project_exists};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Hard cap on archive output. Oversized trees fail the whole operation
/// rather than returning a truncated archive.
pub const ARCHIVE_MAX_BYTES: usize = 100 * 1024 * 1024;

/// Capability surface of a project's content-addressed tree store. Every
/// operation is independently fallible and collapses failure to an
/// empty/absent result; nothing propagates past this boundary.
pub trait TreeStore {
    fn list(&self, tree_hash: &str) -> Vec<FileEntry>;
    fn read_blob(&self, blob_hash: &str) -> String;
    fn archive(&self, tree_hash: &str) -> Option<Vec<u8>>;
    fn object_type(&self, hash: &str) -> Option<String>;
    fn diff_range(&self, from_hash: &str, to_hash: &str) -> String;
    fn write_tree(&self) -> Option<String>;
}

/// Tree store backed by a git directory, driven through the `git` binary.
pub struct GitTreeStore {
    git_dir: PathBuf,
}

impl GitTreeStore {
    pub fn new(git_dir: PathBuf) -> Self {
        Self { git_dir }
    }

    pub fn for_project(data: &DataDir, project_id: &str) -> Self {
        Self::new(data.project_store_dir(project_id))
    }

    fn git(&self, args: &[&str]) -> Option<Vec<u8>> {
        let output = Command::new("git")
            .arg("--git-dir")
            .arg(&self.git_dir)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .ok()?;
        if !output.status.success() {
            return None;
        }
        Some(output.stdout)
    }

    fn git_text(&self, args: &[&str]) -> Option<String> {
        let stdout = self.git(args)?;
        Some(String::from_utf8_lossy(&stdout).trim().to_string())
    }
}

impl TreeStore for GitTreeStore {
    fn list(&self, tree_hash: &str) -> Vec<FileEntry> {
        match self.git_text(&["ls-tree", "-r", tree_hash]) {
            Some(output) => parse_tree_listing(&output),
            None => Vec::new(),
        }
    }

    fn read_blob(&self, blob_hash: &str) -> String {
        // Binary blobs degrade to lossy text; accepted information loss.
        self.git_text(&["cat-file", "-p", blob_hash])
            .unwrap_or_default()
    }

    fn archive(&self, tree_hash: &str) -> Option<Vec<u8>> {
        let bytes = self.git(&["archive", "--format=zip", tree_hash])?;
        if bytes.len() > ARCHIVE_MAX_BYTES {
            return None;
        }
        Some(bytes)
    }

    fn object_type(&self, hash: &str) -> Option<String> {
        self.git_text(&["cat-file", "-t", hash])
    }

    fn diff_range(&self, from_hash: &str, to_hash: &str) -> String {
        self.git_text(&["diff", from_hash, to_hash])
            .unwrap_or_default()
    }

    fn write_tree(&self) -> Option<String> {
        let hash = self.git_text(&["write-tree"])?;
        if hash.is_empty() { None } else { Some(hash) }
    }
}

/// Syntactic half of hash validation: exactly 40 lowercase hex characters.
pub fn is_valid_hash_shape(hash: &str) -> bool {
    hash.len() == 40
        && hash
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}

/// Both validation stages: shape first, then the store must confirm the
/// object is a tree.
pub fn validate_tree_hash(store: &dyn TreeStore, hash: &str) -> bool {
    is_valid_hash_shape(hash) && store.object_type(hash).as_deref() == Some("tree")
}

/// One listing line is `<mode> <type> <hash>\t<path>`. Malformed lines are
/// dropped silently.
fn parse_tree_listing(output: &str) -> Vec<FileEntry> {
    output
        .lines()
        .filter_map(|line| {
            let (meta, path) = line.split_once('\t')?;
            let mut fields = meta.split_whitespace();
            let mode = fields.next()?;
            let kind = fields.next()?;
            let hash = fields.next()?;
            if path.is_empty() {
                return None;
            }
            let name = path.rsplit('/').next().unwrap_or(path);
            Some(FileEntry {
                mode: mode.to_string(),
                kind: kind.to_string(),
                hash: hash.to_string(),
                path: path.to_string(),
                name: name.to_string(),
            })
        })
        .collect()
}

// Query-surface wrappers that guard on project existence the way the API
// boundary expects.

pub fn get_snapshot_files(data: &DataDir, project_id: &str, tree_hash: &str) -> Vec<FileEntry> {
    if !project_exists(data, project_id) {
        return Vec::new();
    }
    GitTreeStore::for_project(data, project_id).list(tree_hash)
}

pub fn get_file_content(data: &DataDir, project_id: &str, blob_hash: &str) -> String {
    if !project_exists(data, project_id) {
        return String::new();
    }
    GitTreeStore::for_project(data, project_id).read_blob(blob_hash)
}

pub fn get_snapshot_archive(data: &DataDir, project_id: &str, tree_hash: &str) -> Option<Vec<u8>> {
    if !project_exists(data, project_id) {
        return None;
    }
    GitTreeStore::for_project(data, project_id).archive(tree_hash)
}

pub fn validate_snapshot_hash(data: &DataDir, project_id: &str, hash: &str) -> bool {
    if !project_exists(data, project_id) {
        return false;
    }
    validate_tree_hash(&GitTreeStore::for_project(data, project_id), hash)
}

pub fn get_latest_snapshot(data: &DataDir, project_id: &str) -> Option<String> {
    if !project_exists(data, project_id) {
        return None;
    }
    GitTreeStore::for_project(data, project_id).write_tree()
}

pub fn get_tree_diff(data: &DataDir, project_id: &str, from_hash: &str, to_hash: &str) -> String {
    if !project_exists(data, project_id) {
        return String::new();
    }
    GitTreeStore::for_project(data, project_id).diff_range(from_hash, to_hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Cursor;
    use tempfile::tempdir;

    #[test]
    fn parses_listing_lines_and_drops_malformed_ones() {
        let output = concat!(
            "100644 blob 2ef267e25bd6c6a300bb473e604b092b6a48523b\tsrc/lib.rs\n",
            "100755 blob 8ab686eafeb1f44702738c8b0f24f2567c36da6d\tbin/run\n",
            "garbage line without a tab\n",
            "100644 blob\tmissing-hash\n",
        );
        let entries = parse_tree_listing(output);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].path, "src/lib.rs");
        assert_eq!(entries[0].name, "lib.rs");
        assert_eq!(entries[0].mode, "100644");
        assert_eq!(entries[0].kind, "blob");
        assert_eq!(entries[1].name, "run");
    }

    #[test]
    fn hash_shape_check_requires_40_lowercase_hex() {
        assert!(is_valid_hash_shape(
            "2ef267e25bd6c6a300bb473e604b092b6a48523b"
        ));
        assert!(!is_valid_hash_shape("2ef267"));
        assert!(!is_valid_hash_shape(
            "2EF267E25BD6C6A300BB473E604B092B6A48523B"
        ));
        assert!(!is_valid_hash_shape(
            "zzf267e25bd6c6a300bb473e604b092b6a48523b"
        ));
        assert!(!is_valid_hash_shape(""));
    }

    struct FakeStore {
        tree_hash: String,
    }

    impl TreeStore for FakeStore {
        fn list(&self, _tree_hash: &str) -> Vec<FileEntry> {
            Vec::new()
        }
        fn read_blob(&self, _blob_hash: &str) -> String {
            String::new()
        }
        fn archive(&self, _tree_hash: &str) -> Option<Vec<u8>> {
            None
        }
        fn object_type(&self, hash: &str) -> Option<String> {
            if hash == self.tree_hash {
                Some("tree".to_string())
            } else {
                Some("blob".to_string())
            }
        }
        fn diff_range(&self, _from: &str, _to: &str) -> String {
            String::new()
        }
        fn write_tree(&self) -> Option<String> {
            None
        }
    }

    #[test]
    fn validation_needs_both_shape_and_tree_type() {
        let tree = "2ef267e25bd6c6a300bb473e604b092b6a48523b".to_string();
        let blob = "8ab686eafeb1f44702738c8b0f24f2567c36da6d";
        let store = FakeStore {
            tree_hash: tree.clone(),
        };
        assert!(validate_tree_hash(&store, &tree));
        assert!(!validate_tree_hash(&store, blob));
        assert!(!validate_tree_hash(&store, "short"));
    }

    fn git_available() -> bool {
        Command::new("git")
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    fn run_git(repo: &Path, args: &[&str]) -> String {
        let output = Command::new("git")
            .args(args)
            .current_dir(repo)
            .output()
            .expect("git");
        assert!(output.status.success(), "git {args:?} failed");
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    #[test]
    fn git_store_round_trips_list_blob_and_archive() {
        if !git_available() {
            return;
        }

        let dir = tempdir().expect("tempdir");
        let repo = dir.path();
        run_git(repo, &["init", "-q"]);
        fs::create_dir_all(repo.join("src")).expect("mkdir");
        fs::write(repo.join("src/main.rs"), "fn main() {}\n").expect("write");
        fs::write(repo.join("README.md"), "hello\n").expect("write");
        run_git(repo, &["add", "."]);
        let tree_hash = run_git(repo, &["write-tree"]);

        let store = GitTreeStore::new(repo.join(".git"));

        let entries = store.list(&tree_hash);
        let mut paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        paths.sort();
        assert_eq!(paths, vec!["README.md", "src/main.rs"]);

        let blob = entries
            .iter()
            .find(|e| e.path == "README.md")
            .expect("entry");
        assert_eq!(store.read_blob(&blob.hash), "hello");

        assert!(validate_tree_hash(&store, &tree_hash));
        assert!(!validate_tree_hash(&store, &blob.hash));

        let archive = store.archive(&tree_hash).expect("archive");
        let mut zip = zip::ZipArchive::new(Cursor::new(archive)).expect("zip");
        let mut archived: Vec<String> = (0..zip.len())
            .map(|i| zip.by_index(i).expect("entry").name().to_string())
            .filter(|name| !name.ends_with('/'))
            .collect();
        archived.sort();
        assert_eq!(archived, vec!["README.md", "src/main.rs"]);

        assert_eq!(store.write_tree().as_deref(), Some(tree_hash.as_str()));
    }

    #[test]
    fn store_operations_collapse_failure_to_empty() {
        let store = GitTreeStore::new(PathBuf::from("/nonexistent/.git"));
        assert!(store.list("0000000000000000000000000000000000000000").is_empty());
        assert_eq!(store.read_blob("0000000000000000000000000000000000000000"), "");
        assert!(store.archive("0000000000000000000000000000000000000000").is_none());
        assert!(store.diff_range("a", "b").is_empty());
    }
}
