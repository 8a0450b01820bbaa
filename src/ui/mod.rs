pub mod theme;

use crate::app::{AppModel, DetailTab, DetailView, ProjectsView, SearchView, View};
use crate::domain::{
    DiffSummary, FileDiff, SessionChange, Snapshot, format_relative, now_unix_ms,
    unix_ms_to_rfc3339,
};
use humansize::{DECIMAL, format_size};
use ratatui::prelude::*;
use ratatui::widgets::*;
use unicode_width::UnicodeWidthStr;

pub fn render(frame: &mut Frame, model: &AppModel) {
    let full_area = frame.area();
    if full_area.width == 0 || full_area.height == 0 {
        return;
    }

    frame.render_widget(
        Block::default().style(Style::default().bg(theme::BG).fg(theme::FG)),
        full_area,
    );

    render_title_bar(frame, full_area, model);

    let content_area = if full_area.height > 2 {
        Rect {
            x: full_area.x,
            y: full_area.y.saturating_add(1),
            width: full_area.width,
            height: full_area.height.saturating_sub(2),
        }
    } else {
        full_area
    };

    match &model.view {
        View::Projects(projects_view) => render_projects(frame, content_area, model, projects_view),
        View::Detail(detail_view) => render_detail(frame, content_area, detail_view),
        View::Search(search_view) => render_search(frame, content_area, search_view),
    }

    render_footer(frame, full_area, model);
}

fn render_title_bar(frame: &mut Frame, area: Rect, model: &AppModel) {
    let bar_area = Rect {
        x: area.x,
        y: area.y,
        width: area.width,
        height: 1,
    };

    let base_style = Style::default().fg(theme::MUTED).bg(theme::BAR_BG);
    let name_style = Style::default()
        .fg(theme::ACCENT)
        .bg(theme::BAR_BG)
        .add_modifier(Modifier::BOLD);

    let name = " ocsnap ";
    let root = model.data.root().display().to_string();
    let available = (bar_area.width as usize).saturating_sub(UnicodeWidthStr::width(name) + 1);
    let root = truncate_middle(&root, available);

    let spans = vec![
        Span::styled(name.to_string(), name_style),
        Span::styled(root, base_style),
    ];
    frame.render_widget(Paragraph::new(Line::from(spans)).style(base_style), bar_area);
}

fn render_footer(frame: &mut Frame, area: Rect, model: &AppModel) {
    if area.height < 2 {
        return;
    }
    let footer_area = Rect {
        x: area.x,
        y: area.y + area.height - 1,
        width: area.width,
        height: 1,
    };

    let keys = match &model.view {
        View::Projects(_) => "Enter=open  /=search  r=rescan  q=quit",
        View::Detail(_) => "Tab=switch  j/k=move  r=reload  Esc=back",
        View::Search(_) => "type to search  ↑/↓=move  Enter=open  Esc=back",
    };
    let mut text = format!(" {keys}");
    if let Some(notice) = &model.notice {
        text.push_str("  ·  ");
        text.push_str(notice);
    }

    frame.render_widget(
        Paragraph::new(truncate_end(&text, area.width as usize))
            .style(Style::default().fg(theme::DIM).bg(theme::BAR_BG)),
        footer_area,
    );
}

fn render_projects(frame: &mut Frame, area: Rect, model: &AppModel, projects_view: &ProjectsView) {
    let block = Block::default()
        .title(format!(" Projects ({}) ", model.projects.len()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme::BORDER))
        .padding(Padding::horizontal(1));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if model.projects.is_empty() {
        frame.render_widget(
            Paragraph::new("No projects found under this data directory.")
                .style(Style::default().fg(theme::DIM)),
            inner,
        );
        return;
    }

    let now = now_unix_ms();
    let width = inner.width as usize;
    let items: Vec<ListItem> = model
        .projects
        .iter()
        .map(|project| {
            let updated = project
                .last_session
                .as_ref()
                .map(|session| format_relative(session.updated, now))
                .unwrap_or_else(|| "-".to_string());
            let right = format!(
                "{} sessions  {} changed  {}",
                project.session_count,
                project.change_count,
                pad_left(&updated, 7)
            );
            let right_width = UnicodeWidthStr::width(right.as_str());
            let left_width = width.saturating_sub(right_width + 2);
            let left = truncate_end(&project.name, left_width);
            let gap = width
                .saturating_sub(UnicodeWidthStr::width(left.as_str()) + right_width);

            ListItem::new(Line::from(vec![
                Span::raw(left),
                Span::raw(" ".repeat(gap)),
                Span::styled(right, Style::default().fg(theme::MUTED)),
            ]))
        })
        .collect();

    let list = List::new(items).highlight_style(
        Style::default()
            .fg(theme::ACCENT)
            .bg(theme::ACCENT_BG)
            .add_modifier(Modifier::BOLD),
    );
    let mut state = ListState::default();
    state.select(Some(
        projects_view.selected.min(model.projects.len().saturating_sub(1)),
    ));
    frame.render_stateful_widget(list, inner, &mut state);
}

fn render_detail(frame: &mut Frame, area: Rect, detail_view: &DetailView) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(4), Constraint::Length(8)])
        .split(area);

    let tab_title = format!(
        " {} · {} ({}) | {} ({}) ",
        truncate_end(&detail_view.project.name, 32),
        DetailTab::Changes.label(),
        detail_view.changes.len(),
        DetailTab::Snapshots.label(),
        detail_view.snapshots.len(),
    );
    let block = Block::default()
        .title(tab_title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme::BORDER))
        .padding(Padding::horizontal(1));
    let inner = block.inner(chunks[0]);
    frame.render_widget(block, chunks[0]);

    match detail_view.tab {
        DetailTab::Changes => render_change_list(frame, inner, detail_view),
        DetailTab::Snapshots => render_snapshot_list(frame, inner, detail_view),
    }

    render_detail_pane(frame, chunks[1], detail_view);
}

fn render_change_list(frame: &mut Frame, area: Rect, detail_view: &DetailView) {
    if detail_view.changes.is_empty() {
        frame.render_widget(
            Paragraph::new("No sessions with file changes.").style(Style::default().fg(theme::DIM)),
            area,
        );
        return;
    }

    let now = now_unix_ms();
    let width = area.width as usize;
    let items: Vec<ListItem> = detail_view
        .changes
        .iter()
        .map(|change| change_list_item(change, width, now))
        .collect();

    let list = List::new(items).highlight_style(
        Style::default()
            .fg(theme::ACCENT)
            .bg(theme::ACCENT_BG)
            .add_modifier(Modifier::BOLD),
    );
    let mut state = ListState::default();
    state.select(Some(
        detail_view
            .selected_change
            .min(detail_view.changes.len().saturating_sub(1)),
    ));
    frame.render_stateful_widget(list, area, &mut state);
}

fn change_list_item(change: &SessionChange, width: usize, now: i64) -> ListItem<'static> {
    let summary = change.summary.unwrap_or(DiffSummary {
        additions: 0,
        deletions: 0,
        files: change.files.len() as u64,
    });
    let counters = format!(
        "+{} -{}  {} files  {}",
        summary.additions,
        summary.deletions,
        summary.files,
        pad_left(&format_relative(change.updated, now), 7)
    );
    let right_width = UnicodeWidthStr::width(counters.as_str());
    let left = truncate_end(&display_title(&change.title), width.saturating_sub(right_width + 2));
    let gap = width.saturating_sub(UnicodeWidthStr::width(left.as_str()) + right_width);

    ListItem::new(Line::from(vec![
        Span::raw(left),
        Span::raw(" ".repeat(gap)),
        Span::styled(counters, Style::default().fg(theme::MUTED)),
    ]))
}

fn render_snapshot_list(frame: &mut Frame, area: Rect, detail_view: &DetailView) {
    if detail_view.snapshots.is_empty() {
        frame.render_widget(
            Paragraph::new("No snapshots recorded for this project.")
                .style(Style::default().fg(theme::DIM)),
            area,
        );
        return;
    }

    let now = now_unix_ms();
    let width = area.width as usize;
    let items: Vec<ListItem> = detail_view
        .snapshots
        .iter()
        .map(|snapshot| snapshot_list_item(snapshot, width, now))
        .collect();

    let list = List::new(items).highlight_style(
        Style::default()
            .fg(theme::ACCENT)
            .bg(theme::ACCENT_BG)
            .add_modifier(Modifier::BOLD),
    );
    let mut state = ListState::default();
    state.select(Some(
        detail_view
            .selected_snapshot
            .min(detail_view.snapshots.len().saturating_sub(1)),
    ));
    frame.render_stateful_widget(list, area, &mut state);
}

fn snapshot_list_item(snapshot: &Snapshot, width: usize, now: i64) -> ListItem<'static> {
    let short_hash = snapshot.hash.chars().take(8).collect::<String>();
    let right = format!(
        "{}  {}",
        snapshot.phase.label(),
        pad_left(&format_relative(snapshot.timestamp, now), 7)
    );
    let right_width = UnicodeWidthStr::width(right.as_str());
    let title = snapshot
        .session_title
        .clone()
        .unwrap_or_else(|| snapshot.session_id.clone());
    let hash_width = UnicodeWidthStr::width(short_hash.as_str());
    let left = truncate_end(
        &display_title(&title),
        width.saturating_sub(right_width + hash_width + 4),
    );
    let gap = width
        .saturating_sub(hash_width + 2 + UnicodeWidthStr::width(left.as_str()) + right_width)
        .max(1);

    ListItem::new(Line::from(vec![
        Span::styled(short_hash, Style::default().fg(theme::ACCENT)),
        Span::raw("  "),
        Span::raw(left),
        Span::raw(" ".repeat(gap)),
        Span::styled(right, Style::default().fg(theme::MUTED)),
    ]))
}

fn render_detail_pane(frame: &mut Frame, area: Rect, detail_view: &DetailView) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme::BORDER))
        .padding(Padding::horizontal(1))
        .style(Style::default().bg(theme::SURFACE));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines = match detail_view.tab {
        DetailTab::Changes => detail_view
            .changes
            .get(detail_view.selected_change)
            .map(change_detail_lines)
            .unwrap_or_default(),
        DetailTab::Snapshots => detail_view
            .snapshots
            .get(detail_view.selected_snapshot)
            .map(snapshot_detail_lines)
            .unwrap_or_default(),
    };

    frame.render_widget(Paragraph::new(lines), inner);
}

fn change_detail_lines(change: &SessionChange) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(vec![
        Span::styled("session ", Style::default().fg(theme::DIM)),
        Span::raw(change.session_id.clone()),
    ])];
    for diff in &change.files {
        lines.push(file_diff_line(diff));
    }
    lines
}

fn file_diff_line(diff: &FileDiff) -> Line<'static> {
    let before = diff.before.lines().count();
    let after = diff.after.lines().count();
    let (added, removed) = (after.saturating_sub(before), before.saturating_sub(after));
    Line::from(vec![
        Span::raw(format!("{}  ", diff.file)),
        Span::styled(format!("+{added} "), Style::default().fg(theme::ADDED)),
        Span::styled(format!("-{removed}  "), Style::default().fg(theme::REMOVED)),
        Span::styled(
            format_size(diff.after.len() as u64, DECIMAL),
            Style::default().fg(theme::DIM),
        ),
    ])
}

fn snapshot_detail_lines(snapshot: &Snapshot) -> Vec<Line<'static>> {
    vec![
        Line::from(vec![
            Span::styled("tree    ", Style::default().fg(theme::DIM)),
            Span::styled(snapshot.hash.clone(), Style::default().fg(theme::ACCENT)),
        ]),
        Line::from(vec![
            Span::styled("taken   ", Style::default().fg(theme::DIM)),
            Span::raw(unix_ms_to_rfc3339(snapshot.timestamp).unwrap_or_else(|| "-".to_string())),
        ]),
        Line::from(vec![
            Span::styled("phase   ", Style::default().fg(theme::DIM)),
            Span::raw(snapshot.phase.label().to_string()),
        ]),
        Line::from(vec![
            Span::styled("session ", Style::default().fg(theme::DIM)),
            Span::raw(snapshot.session_id.clone()),
        ]),
        Line::from(vec![
            Span::styled("message ", Style::default().fg(theme::DIM)),
            Span::raw(snapshot.message_id.clone()),
        ]),
    ]
}

fn render_search(frame: &mut Frame, area: Rect, search_view: &SearchView) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(5),
        ])
        .split(area);

    let input_text = if search_view.input.is_empty() {
        Text::from(Line::from(Span::styled(
            "Type at least two characters to search prompts…",
            Style::default().fg(theme::DIM),
        )))
    } else {
        Text::from(search_view.input.as_str())
    };
    let input = Paragraph::new(input_text).block(
        Block::default()
            .title(" Search ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme::ACCENT))
            .padding(Padding::horizontal(1)),
    );
    frame.render_widget(input, chunks[0]);

    let results_block = Block::default()
        .title(format!(" Results ({}) ", search_view.results.len()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme::BORDER))
        .padding(Padding::horizontal(1));
    let results_inner = results_block.inner(chunks[1]);
    frame.render_widget(results_block, chunks[1]);

    if search_view.results.is_empty() {
        frame.render_widget(
            Paragraph::new("No matches.").style(Style::default().fg(theme::DIM)),
            results_inner,
        );
    } else {
        let now = now_unix_ms();
        let width = results_inner.width as usize;
        let items: Vec<ListItem> = search_view
            .results
            .iter()
            .map(|result| {
                let right = format!(
                    "{}  {}",
                    result.role.label(),
                    pad_left(&format_relative(result.timestamp, now), 7)
                );
                let right_width = UnicodeWidthStr::width(right.as_str());
                let left = truncate_end(
                    &format!(
                        "{} · {}",
                        result.project_name,
                        display_title(&result.session_title)
                    ),
                    width.saturating_sub(right_width + 2),
                );
                let gap =
                    width.saturating_sub(UnicodeWidthStr::width(left.as_str()) + right_width);
                ListItem::new(Line::from(vec![
                    Span::raw(left),
                    Span::raw(" ".repeat(gap)),
                    Span::styled(right, Style::default().fg(theme::MUTED)),
                ]))
            })
            .collect();

        let list = List::new(items).highlight_style(
            Style::default()
                .fg(theme::ACCENT)
                .bg(theme::ACCENT_BG)
                .add_modifier(Modifier::BOLD),
        );
        let mut state = ListState::default();
        state.select(Some(
            search_view
                .selected
                .min(search_view.results.len().saturating_sub(1)),
        ));
        frame.render_stateful_widget(list, results_inner, &mut state);
    }

    let preview_block = Block::default()
        .title(" Prompt ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme::BORDER))
        .padding(Padding::horizontal(1))
        .style(Style::default().bg(theme::SURFACE));
    let preview_inner = preview_block.inner(chunks[2]);
    frame.render_widget(preview_block, chunks[2]);

    if let Some(result) = search_view.results.get(search_view.selected) {
        frame.render_widget(
            Paragraph::new(result.text.as_str()).wrap(Wrap { trim: true }),
            preview_inner,
        );
    }
}

fn display_title(title: &str) -> String {
    if title.trim().is_empty() {
        "(untitled)".to_string()
    } else {
        title.to_string()
    }
}

fn pad_left(text: &str, width: usize) -> String {
    let text_width = UnicodeWidthStr::width(text);
    if text_width >= width {
        return text.to_string();
    }
    format!("{}{}", " ".repeat(width - text_width), text)
}

fn truncate_end(text: &str, max_width: usize) -> String {
    if max_width == 0 {
        return String::new();
    }
    if UnicodeWidthStr::width(text) <= max_width {
        return text.to_string();
    }
    let ellipsis = "…";
    let available = max_width.saturating_sub(UnicodeWidthStr::width(ellipsis));
    let mut out = String::new();
    for ch in text.chars() {
        let next = format!("{out}{ch}");
        if UnicodeWidthStr::width(next.as_str()) > available {
            break;
        }
        out.push(ch);
    }
    out.push_str(ellipsis);
    out
}

fn truncate_middle(text: &str, max_width: usize) -> String {
    if max_width == 0 {
        return String::new();
    }
    if UnicodeWidthStr::width(text) <= max_width {
        return text.to_string();
    }

    let ellipsis = "…";
    let available = max_width.saturating_sub(UnicodeWidthStr::width(ellipsis));
    if available <= 4 {
        return truncate_end(text, max_width);
    }

    let left_width = available / 2;
    let right_width = available - left_width;

    let mut left = String::new();
    for ch in text.chars() {
        let next = format!("{left}{ch}");
        if UnicodeWidthStr::width(next.as_str()) > left_width {
            break;
        }
        left.push(ch);
    }

    let mut right = String::new();
    for ch in text.chars().rev() {
        let next = format!("{ch}{right}");
        if UnicodeWidthStr::width(next.as_str()) > right_width {
            break;
        }
        right.insert(0, ch);
    }

    format!("{left}{ellipsis}{right}")
}
