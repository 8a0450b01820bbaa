use crate::domain::{Project, SearchResult, SessionChange, Snapshot};
use crate::infra::{
    DataDir, SearchIndex, get_project, get_session_changes, get_snapshots, list_projects,
};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("terminal I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    ResolveDataDir(#[from] crate::infra::ResolveDataDirError),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AppCommand {
    Quit,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DetailTab {
    Changes,
    Snapshots,
}

impl DetailTab {
    pub fn toggle(self) -> Self {
        match self {
            Self::Changes => Self::Snapshots,
            Self::Snapshots => Self::Changes,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Changes => "Changes",
            Self::Snapshots => "Snapshots",
        }
    }
}

#[derive(Clone, Debug)]
pub struct ProjectsView {
    pub selected: usize,
}

#[derive(Clone, Debug)]
pub struct DetailView {
    pub project: Project,
    pub tab: DetailTab,
    pub changes: Vec<SessionChange>,
    pub snapshots: Vec<Snapshot>,
    pub selected_change: usize,
    pub selected_snapshot: usize,
}

#[derive(Clone, Debug, Default)]
pub struct SearchView {
    pub input: String,
    pub results: Vec<SearchResult>,
    pub selected: usize,
}

#[derive(Clone, Debug)]
pub enum View {
    Projects(ProjectsView),
    Detail(Box<DetailView>),
    Search(SearchView),
}

/// Queries shorter than this never reach the index, so the first real
/// keystrokes of a search do not trigger a full index build.
const MIN_QUERY_CHARS: usize = 2;

const SEARCH_RESULT_LIMIT: usize = 50;

pub struct AppModel {
    pub data: DataDir,
    pub projects: Vec<Project>,
    pub view: View,
    pub notice: Option<String>,
    pub search: Arc<SearchIndex>,
}

impl AppModel {
    pub fn new(data: DataDir) -> Self {
        let projects = list_projects(&data);
        let search = Arc::new(SearchIndex::new(data.clone()));
        Self {
            data,
            projects,
            view: View::Projects(ProjectsView { selected: 0 }),
            notice: None,
            search,
        }
    }

    pub fn refresh(&mut self) {
        self.projects = list_projects(&self.data);
        self.search.invalidate();
        if let View::Projects(view) = &mut self.view {
            view.selected = view.selected.min(self.projects.len().saturating_sub(1));
        }
        self.notice = Some(format!("rescanned: {} projects", self.projects.len()));
    }

    fn open_project(&mut self, project: Project) {
        let changes = get_session_changes(&self.data, &project.id);
        let snapshots = get_snapshots(&self.data, &project.id);
        self.notice = Some(format!(
            "{}: {} changed sessions, {} snapshots",
            project.name,
            changes.len(),
            snapshots.len()
        ));
        self.view = View::Detail(Box::new(DetailView {
            project,
            tab: DetailTab::Changes,
            changes,
            snapshots,
            selected_change: 0,
            selected_snapshot: 0,
        }));
    }

    fn run_search(&mut self) {
        let View::Search(view) = &mut self.view else {
            return;
        };
        view.selected = 0;
        if view.input.chars().count() < MIN_QUERY_CHARS {
            view.results.clear();
            return;
        }
        view.results = self.search.search(&view.input, SEARCH_RESULT_LIMIT);
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<AppCommand> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Some(AppCommand::Quit);
        }

        match &mut self.view {
            View::Projects(view) => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Some(AppCommand::Quit),
                KeyCode::Up | KeyCode::Char('k') => {
                    view.selected = view.selected.saturating_sub(1);
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    if view.selected + 1 < self.projects.len() {
                        view.selected += 1;
                    }
                }
                KeyCode::Enter => {
                    if let Some(project) = self.projects.get(view.selected).cloned() {
                        self.open_project(project);
                    }
                }
                KeyCode::Char('/') => {
                    self.view = View::Search(SearchView::default());
                }
                KeyCode::Char('r') => self.refresh(),
                _ => {}
            },
            View::Detail(view) => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => {
                    let id = view.project.id.clone();
                    let selected = self
                        .projects
                        .iter()
                        .position(|project| project.id == id)
                        .unwrap_or(0);
                    self.view = View::Projects(ProjectsView { selected });
                }
                KeyCode::Tab | KeyCode::BackTab => view.tab = view.tab.toggle(),
                KeyCode::Up | KeyCode::Char('k') => match view.tab {
                    DetailTab::Changes => {
                        view.selected_change = view.selected_change.saturating_sub(1);
                    }
                    DetailTab::Snapshots => {
                        view.selected_snapshot = view.selected_snapshot.saturating_sub(1);
                    }
                },
                KeyCode::Down | KeyCode::Char('j') => match view.tab {
                    DetailTab::Changes => {
                        if view.selected_change + 1 < view.changes.len() {
                            view.selected_change += 1;
                        }
                    }
                    DetailTab::Snapshots => {
                        if view.selected_snapshot + 1 < view.snapshots.len() {
                            view.selected_snapshot += 1;
                        }
                    }
                },
                KeyCode::Char('r') => {
                    if let Some(project) = get_project(&self.data, &view.project.id) {
                        self.open_project(project);
                    } else {
                        self.notice = Some("project disappeared".to_string());
                        self.view = View::Projects(ProjectsView { selected: 0 });
                    }
                }
                _ => {}
            },
            View::Search(view) => match key.code {
                KeyCode::Esc => {
                    self.view = View::Projects(ProjectsView { selected: 0 });
                }
                KeyCode::Up => view.selected = view.selected.saturating_sub(1),
                KeyCode::Down => {
                    if view.selected + 1 < view.results.len() {
                        view.selected += 1;
                    }
                }
                KeyCode::Enter => {
                    if let Some(result) = view.results.get(view.selected) {
                        let project_id = result.project_id.clone();
                        match get_project(&self.data, &project_id) {
                            Some(project) => self.open_project(project),
                            None => {
                                self.notice =
                                    Some(format!("project not found: {project_id}"));
                            }
                        }
                    }
                }
                KeyCode::Backspace => {
                    view.input.pop();
                    self.run_search();
                }
                KeyCode::Char(c) => {
                    view.input.push(c);
                    self.run_search();
                }
                _ => {}
            },
        }

        None
    }
}
