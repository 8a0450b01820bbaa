use crate::domain::FileDiff;
use crate::infra::{
    DataDir, SearchIndex, get_file_content, get_latest_snapshot, get_project,
    get_session_changes, get_session_diff, get_session_info, get_snapshot_archive,
    get_snapshot_files, get_snapshots, get_tree_diff, list_projects, validate_snapshot_hash,
};
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use serde::Deserialize;
use serde_json::json;
use std::io::{Cursor, Write as _};
use std::sync::Arc;

pub const DEFAULT_SEARCH_LIMIT: usize = 50;

/// Queries shorter than this never touch the search index, so an idle
/// server does not pay for an index build on a one-character keystroke.
const MIN_QUERY_CHARS: usize = 2;

#[derive(Clone)]
pub struct AppState {
    pub data: DataDir,
    pub search: Arc<SearchIndex>,
}

impl AppState {
    pub fn new(data: DataDir) -> Self {
        let search = Arc::new(SearchIndex::new(data.clone()));
        Self { data, search }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/projects", get(projects))
        .route("/api/projects/{id}", get(project))
        .route("/api/projects/{id}/changes", get(project_changes))
        .route("/api/projects/{id}/snapshots", get(project_snapshots))
        .route("/api/snapshots/{project_id}/{hash}/files", get(snapshot_files))
        .route(
            "/api/snapshots/{project_id}/{hash}/download",
            get(snapshot_download),
        )
        .route("/api/snapshots/{project_id}/diff", get(snapshot_diff))
        .route("/api/sessions/{session_id}", get(session_info))
        .route("/api/sessions/{session_id}/download", get(session_download))
        .route("/api/search", get(search))
        .with_state(state)
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

async fn projects(State(state): State<AppState>) -> Response {
    Json(list_projects(&state.data)).into_response()
}

async fn project(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match get_project(&state.data, &id) {
        Some(project) => Json(project).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "Project not found"),
    }
}

async fn project_changes(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    Json(get_session_changes(&state.data, &id)).into_response()
}

async fn project_snapshots(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    if get_project(&state.data, &id).is_none() {
        return error_response(StatusCode::NOT_FOUND, "Project not found");
    }

    let snapshots = get_snapshots(&state.data, &id);
    let latest = get_latest_snapshot(&state.data, &id);
    Json(json!({
        "projectId": id,
        "latestSnapshot": latest,
        "snapshots": snapshots,
    }))
    .into_response()
}

#[derive(Debug, Deserialize)]
struct FilesParams {
    path: Option<String>,
}

async fn snapshot_files(
    State(state): State<AppState>,
    Path((project_id, hash)): Path<(String, String)>,
    Query(params): Query<FilesParams>,
) -> Response {
    if get_project(&state.data, &project_id).is_none() {
        return error_response(StatusCode::NOT_FOUND, "Project not found");
    }
    if !validate_snapshot_hash(&state.data, &project_id, &hash) {
        return error_response(StatusCode::BAD_REQUEST, "Invalid snapshot hash");
    }

    let files = get_snapshot_files(&state.data, &project_id, &hash);

    if let Some(path) = params.path {
        let Some(file) = files.iter().find(|file| file.path == path) else {
            return error_response(StatusCode::NOT_FOUND, "File not found");
        };
        let content = get_file_content(&state.data, &project_id, &file.hash);
        return Json(json!({ "path": path, "content": content })).into_response();
    }

    Json(json!({ "files": files })).into_response()
}

async fn snapshot_download(
    State(state): State<AppState>,
    Path((project_id, hash)): Path<(String, String)>,
) -> Response {
    let Some(project) = get_project(&state.data, &project_id) else {
        return error_response(StatusCode::NOT_FOUND, "Project not found");
    };
    if !validate_snapshot_hash(&state.data, &project_id, &hash) {
        return error_response(StatusCode::BAD_REQUEST, "Invalid snapshot hash");
    }

    let Some(archive) = get_snapshot_archive(&state.data, &project_id, &hash) else {
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create archive");
    };

    let filename = format!("{}-{}.zip", project.name, &hash[..8]);
    zip_response(&filename, archive)
}

#[derive(Debug, Deserialize)]
struct DiffParams {
    from: String,
    to: String,
}

async fn snapshot_diff(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Query(params): Query<DiffParams>,
) -> Response {
    if get_project(&state.data, &project_id).is_none() {
        return error_response(StatusCode::NOT_FOUND, "Project not found");
    }
    if !validate_snapshot_hash(&state.data, &project_id, &params.from)
        || !validate_snapshot_hash(&state.data, &project_id, &params.to)
    {
        return error_response(StatusCode::BAD_REQUEST, "Invalid snapshot hash");
    }

    let diff = get_tree_diff(&state.data, &project_id, &params.from, &params.to);
    Json(json!({ "from": params.from, "to": params.to, "diff": diff })).into_response()
}

async fn session_info(State(state): State<AppState>, Path(session_id): Path<String>) -> Response {
    match get_session_info(&state.data, &session_id) {
        Some((project_id, session)) => {
            Json(json!({ "projectId": project_id, "session": session })).into_response()
        }
        None => error_response(StatusCode::NOT_FOUND, "Session not found"),
    }
}

async fn session_download(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    let diffs = get_session_diff(&state.data, &session_id);
    if diffs.is_empty() {
        return error_response(StatusCode::NOT_FOUND, "No files found");
    }

    let Some(archive) = build_session_zip(&diffs) else {
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create archive");
    };

    zip_response(&format!("{session_id}.zip"), archive)
}

/// Zip of a session's after-states; files deleted by the session (empty
/// after side) are left out.
fn build_session_zip(diffs: &[FileDiff]) -> Option<Vec<u8>> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::FileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    for diff in diffs {
        if diff.after.is_empty() {
            continue;
        }
        writer.start_file(diff.file.as_str(), options).ok()?;
        writer.write_all(diff.after.as_bytes()).ok()?;
    }

    let cursor = writer.finish().ok()?;
    Some(cursor.into_inner())
}

fn zip_response(filename: &str, bytes: Vec<u8>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/zip"));
    let disposition = format!("attachment; filename=\"{filename}\"");
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition)
            .unwrap_or_else(|_| HeaderValue::from_static("attachment")),
    );
    (StatusCode::OK, headers, bytes).into_response()
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: Option<String>,
    limit: Option<usize>,
}

async fn search(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Response {
    let Some(query) = params.q.filter(|q| !q.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "Missing query parameter 'q'",
                "stats": state.search.stats(),
            })),
        )
            .into_response();
    };

    if query.chars().count() < MIN_QUERY_CHARS {
        return Json(json!({ "query": query, "count": 0, "results": [] })).into_response();
    }

    let limit = params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
    let mut results = state.search.search(&query, limit);
    for result in &mut results {
        result.snapshot = state
            .search
            .snapshot_for_message(&result.session_id, &result.message_id);
    }

    Json(json!({ "query": query, "count": results.len(), "results": results })).into_response()
}

pub async fn run_http_server(port: u16, data: DataDir) -> Result<(), String> {
    run_http_server_on(std::net::SocketAddr::from(([127, 0, 0, 1], port)), data).await
}

pub async fn run_http_server_on(
    addr: std::net::SocketAddr,
    data: DataDir,
) -> Result<(), String> {
    let app = build_router(AppState::new(data));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|error| error.to_string())?;

    axum::serve(listener, app)
        .await
        .map_err(|error| error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::fs;
    use std::net::SocketAddr;
    use tempfile::tempdir;

    fn add_project(data: &DataDir, id: &str, worktree: &str) {
        fs::create_dir_all(data.project_store_dir(id)).expect("store dir");
        fs::create_dir_all(data.project_record_base()).expect("project dir");
        fs::write(
            data.project_record(id),
            format!(r#"{{"worktree": "{worktree}"}}"#),
        )
        .expect("project record");
    }

    fn add_session(data: &DataDir, project_id: &str, session_id: &str, title: &str, updated: i64) {
        let dir = data.session_dir(project_id);
        fs::create_dir_all(&dir).expect("session dir");
        fs::write(
            dir.join(format!("{session_id}.json")),
            format!(
                r#"{{"id": "{session_id}", "title": "{title}", "time": {{"updated": {updated}}}}}"#
            ),
        )
        .expect("session record");
    }

    fn add_diff(data: &DataDir, session_id: &str, body: &str) {
        let path = data.session_diff_record(session_id);
        fs::create_dir_all(path.parent().expect("parent")).expect("diff dir");
        fs::write(path, body).expect("diff record");
    }

    async fn spawn_server(data: DataDir) -> (String, tokio::task::JoinHandle<()>) {
        let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let app = build_router(AppState::new(data));
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        (format!("http://{addr}"), task)
    }

    fn fetch(url: &str) -> (u16, Vec<u8>) {
        match ureq::get(url).call() {
            Ok(mut res) => {
                let status = res.status().as_u16();
                let body = res.body_mut().read_to_vec().expect("body");
                (status, body)
            }
            Err(ureq::Error::StatusCode(code)) => (code, Vec::new()),
            Err(error) => panic!("request failed: {error}"),
        }
    }

    fn fetch_json(url: &str) -> (u16, Value) {
        let (status, body) = fetch(url);
        let value = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).expect("json body")
        };
        (status, value)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn lists_projects_and_serves_changes() {
        let dir = tempdir().expect("tempdir");
        let data = DataDir::new(dir.path().to_path_buf());
        add_project(&data, "p1", "/home/u/webapp");
        add_session(&data, "p1", "s1", "first", 100);
        add_diff(
            &data,
            "s1",
            r#"[{"file": "a.rs", "before": "", "after": "fn a() {}"}]"#,
        );

        let (base, task) = spawn_server(data).await;
        let result = tokio::task::spawn_blocking(move || {
            let (status, projects) = fetch_json(&format!("{base}/api/projects"));
            assert_eq!(status, 200);
            assert_eq!(projects[0]["id"], "p1");
            assert_eq!(projects[0]["name"], "webapp");
            assert_eq!(projects[0]["changeCount"], 1);

            let (status, changes) = fetch_json(&format!("{base}/api/projects/p1/changes"));
            assert_eq!(status, 200);
            assert_eq!(changes[0]["sessionId"], "s1");
            assert_eq!(changes[0]["files"][0]["file"], "a.rs");

            let (status, _) = fetch_json(&format!("{base}/api/projects/missing"));
            assert_eq!(status, 404);
        })
        .await;
        task.abort();
        result.expect("assertions");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn snapshot_routes_enforce_the_status_taxonomy() {
        let dir = tempdir().expect("tempdir");
        let data = DataDir::new(dir.path().to_path_buf());
        add_project(&data, "p1", "/home/u/webapp");

        let (base, task) = spawn_server(data).await;
        let result = tokio::task::spawn_blocking(move || {
            // Unknown project: 404 before any hash validation.
            let (status, _) = fetch_json(&format!("{base}/api/projects/ghost/snapshots"));
            assert_eq!(status, 404);
            let (status, _) =
                fetch_json(&format!("{base}/api/snapshots/ghost/deadbeef/files"));
            assert_eq!(status, 404);

            // Malformed hash on an existing project: rejected as 400.
            let (status, _) = fetch_json(&format!("{base}/api/snapshots/p1/nothex/files"));
            assert_eq!(status, 400);
            let (status, _) =
                fetch_json(&format!("{base}/api/snapshots/p1/nothex/download"));
            assert_eq!(status, 400);
        })
        .await;
        task.abort();
        result.expect("assertions");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn session_download_zips_only_after_files() {
        let dir = tempdir().expect("tempdir");
        let data = DataDir::new(dir.path().to_path_buf());
        add_diff(
            &data,
            "s1",
            r#"[{"file": "kept.rs", "before": "", "after": "fn kept() {}"}, {"file": "deleted.rs", "before": "gone", "after": ""}]"#,
        );

        let (base, task) = spawn_server(data).await;
        let result = tokio::task::spawn_blocking(move || {
            let (status, body) = fetch(&format!("{base}/api/sessions/s1/download"));
            assert_eq!(status, 200);

            let mut archive = zip::ZipArchive::new(Cursor::new(body)).expect("zip");
            let names: Vec<String> =
                (0..archive.len())
                    .map(|i| archive.by_index(i).expect("entry").name().to_string())
                    .collect();
            assert_eq!(names, vec!["kept.rs".to_string()]);

            let (status, _) = fetch(&format!("{base}/api/sessions/empty/download"));
            assert_eq!(status, 404);
        })
        .await;
        task.abort();
        result.expect("assertions");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn session_info_resolves_the_owning_project() {
        let dir = tempdir().expect("tempdir");
        let data = DataDir::new(dir.path().to_path_buf());
        add_project(&data, "p1", "/home/u/webapp");
        add_session(&data, "p1", "s1", "first", 100);

        let (base, task) = spawn_server(data).await;
        let result = tokio::task::spawn_blocking(move || {
            let (status, body) = fetch_json(&format!("{base}/api/sessions/s1"));
            assert_eq!(status, 200);
            assert_eq!(body["projectId"], "p1");
            assert_eq!(body["session"]["title"], "first");

            let (status, _) = fetch_json(&format!("{base}/api/sessions/ghost"));
            assert_eq!(status, 404);

            // Diff between two malformed hashes is rejected up front.
            let (status, _) =
                fetch_json(&format!("{base}/api/snapshots/p1/diff?from=zz&to=yy"));
            assert_eq!(status, 400);
            let (status, _) =
                fetch_json(&format!("{base}/api/snapshots/ghost/diff?from=zz&to=yy"));
            assert_eq!(status, 404);
        })
        .await;
        task.abort();
        result.expect("assertions");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn search_gates_short_queries_and_resolves_names() {
        let dir = tempdir().expect("tempdir");
        let data = DataDir::new(dir.path().to_path_buf());
        add_project(&data, "p1", "/home/u/webapp");
        add_session(&data, "p1", "s1", "login work", 100);
        let message_path = data.message_record("s1", "m1");
        fs::create_dir_all(message_path.parent().expect("parent")).expect("message dir");
        fs::write(message_path, r#"{"role": "user"}"#).expect("message record");
        let part_dir = data.part_dir("m1");
        fs::create_dir_all(&part_dir).expect("part dir");
        fs::write(
            part_dir.join("prt_a.json"),
            r#"{"id": "prt_a", "sessionID": "s1", "messageID": "m1", "type": "text", "text": "fix login", "time": {"start": 100}}"#,
        )
        .expect("part");

        let (base, task) = spawn_server(data).await;
        let result = tokio::task::spawn_blocking(move || {
            let (status, _) = fetch_json(&format!("{base}/api/search"));
            assert_eq!(status, 400);

            let (status, body) = fetch_json(&format!("{base}/api/search?q=l"));
            assert_eq!(status, 200);
            assert_eq!(body["count"], 0);

            let (status, body) = fetch_json(&format!("{base}/api/search?q=LOGIN"));
            assert_eq!(status, 200);
            assert_eq!(body["count"], 1);
            assert_eq!(body["results"][0]["projectName"], "webapp");
            assert_eq!(body["results"][0]["sessionTitle"], "login work");
            assert_eq!(body["results"][0]["role"], "user");
        })
        .await;
        task.abort();
        result.expect("assertions");
    }
}
