use crate::domain::unix_ms_to_rfc3339;
use crate::infra::{DataDir, SearchIndex, get_session_changes, get_snapshots, list_projects};
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_SEARCH_LIMIT: usize = 50;
pub const DEFAULT_SERVE_PORT: u16 = 3000;

const MIN_QUERY_CHARS: usize = 2;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CliInvocation {
    PrintHelp,
    PrintVersion,
    Tui,
    Command(CliCommand),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CliCommand {
    Projects,
    Changes { project_id: String },
    Snapshots { project_id: String },
    Search { query: String, limit: usize },
    Serve { port: u16 },
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CliArgs {
    pub data_dir: Option<PathBuf>,
    pub invocation: CliInvocation,
}

#[derive(Debug, Error)]
pub enum CliParseError {
    #[error("unknown subcommand: {0}")]
    UnknownSubcommand(String),

    #[error("unknown flag: {0}")]
    UnknownFlag(String),

    #[error("missing value for flag: {0}")]
    MissingFlagValue(String),

    #[error("invalid value for {flag}: {value}")]
    InvalidFlagValue { flag: String, value: String },

    #[error("missing argument: {0}")]
    MissingArgument(&'static str),

    #[error("unexpected argument: {0}")]
    UnexpectedArgument(String),
}

pub fn parse_invocation(args: &[String]) -> Result<CliArgs, CliParseError> {
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        return Ok(CliArgs {
            data_dir: None,
            invocation: CliInvocation::PrintHelp,
        });
    }
    if args.iter().any(|arg| arg == "--version" || arg == "-V") {
        return Ok(CliArgs {
            data_dir: None,
            invocation: CliInvocation::PrintVersion,
        });
    }

    let mut iter = args.iter().skip(1).peekable();
    let mut data_dir: Option<PathBuf> = None;

    while let Some(arg) = iter.peek() {
        match arg.as_str() {
            "--data-dir" | "-d" => {
                let _ = iter.next();
                let value = iter
                    .next()
                    .ok_or_else(|| CliParseError::MissingFlagValue("--data-dir".to_string()))?;
                data_dir = Some(PathBuf::from(value));
            }
            _ => break,
        }
    }

    let Some(subcommand) = iter.next() else {
        return Ok(CliArgs {
            data_dir,
            invocation: CliInvocation::Tui,
        });
    };

    let invocation = match subcommand.as_str() {
        "projects" => {
            let mut args = iter.peekable();
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--data-dir" | "-d" => {
                        let value = args.next().ok_or_else(|| {
                            CliParseError::MissingFlagValue("--data-dir".to_string())
                        })?;
                        data_dir = Some(PathBuf::from(value));
                    }
                    _ if arg.starts_with('-') => {
                        return Err(CliParseError::UnknownFlag(arg.to_string()));
                    }
                    _ => return Err(CliParseError::UnexpectedArgument(arg.to_string())),
                }
            }
            CliInvocation::Command(CliCommand::Projects)
        }
        "changes" | "snapshots" => {
            let mut project_id: Option<String> = None;
            let mut args = iter.peekable();
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--data-dir" | "-d" => {
                        let value = args.next().ok_or_else(|| {
                            CliParseError::MissingFlagValue("--data-dir".to_string())
                        })?;
                        data_dir = Some(PathBuf::from(value));
                    }
                    _ if arg.starts_with('-') => {
                        return Err(CliParseError::UnknownFlag(arg.to_string()));
                    }
                    _ if project_id.is_none() => project_id = Some(arg.to_string()),
                    _ => return Err(CliParseError::UnexpectedArgument(arg.to_string())),
                }
            }
            let project_id = project_id.ok_or(CliParseError::MissingArgument("<projectId>"))?;
            if subcommand == "changes" {
                CliInvocation::Command(CliCommand::Changes { project_id })
            } else {
                CliInvocation::Command(CliCommand::Snapshots { project_id })
            }
        }
        "search" => {
            let mut query: Option<String> = None;
            let mut limit = DEFAULT_SEARCH_LIMIT;
            let mut args = iter.peekable();
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--limit" | "-l" => {
                        let value = args.next().ok_or_else(|| {
                            CliParseError::MissingFlagValue("--limit".to_string())
                        })?;
                        limit = value.parse().map_err(|_| CliParseError::InvalidFlagValue {
                            flag: "--limit".to_string(),
                            value: value.to_string(),
                        })?;
                    }
                    "--data-dir" | "-d" => {
                        let value = args.next().ok_or_else(|| {
                            CliParseError::MissingFlagValue("--data-dir".to_string())
                        })?;
                        data_dir = Some(PathBuf::from(value));
                    }
                    _ if arg.starts_with('-') => {
                        return Err(CliParseError::UnknownFlag(arg.to_string()));
                    }
                    _ if query.is_none() => query = Some(arg.to_string()),
                    _ => return Err(CliParseError::UnexpectedArgument(arg.to_string())),
                }
            }
            let query = query.ok_or(CliParseError::MissingArgument("<query>"))?;
            CliInvocation::Command(CliCommand::Search { query, limit })
        }
        "serve" => {
            let mut port = DEFAULT_SERVE_PORT;
            let mut args = iter.peekable();
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--port" | "-p" => {
                        let value = args.next().ok_or_else(|| {
                            CliParseError::MissingFlagValue("--port".to_string())
                        })?;
                        port = value.parse().map_err(|_| CliParseError::InvalidFlagValue {
                            flag: "--port".to_string(),
                            value: value.to_string(),
                        })?;
                    }
                    "--data-dir" | "-d" => {
                        let value = args.next().ok_or_else(|| {
                            CliParseError::MissingFlagValue("--data-dir".to_string())
                        })?;
                        data_dir = Some(PathBuf::from(value));
                    }
                    _ if arg.starts_with('-') => {
                        return Err(CliParseError::UnknownFlag(arg.to_string()));
                    }
                    _ => return Err(CliParseError::UnexpectedArgument(arg.to_string())),
                }
            }
            CliInvocation::Command(CliCommand::Serve { port })
        }
        other => return Err(CliParseError::UnknownSubcommand(other.to_string())),
    };

    Ok(CliArgs {
        data_dir,
        invocation,
    })
}

#[derive(Debug, Error)]
pub enum CliRunError {
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),

    #[error("search query must be at least 2 characters")]
    QueryTooShort,
}

pub fn run(command: CliCommand, data: &DataDir) -> Result<(), CliRunError> {
    let stdout = io::stdout().lock();
    let mut out = io::BufWriter::new(stdout);

    match command {
        CliCommand::Projects => {
            for project in list_projects(data) {
                let last = project
                    .last_session
                    .as_ref()
                    .and_then(|session| unix_ms_to_rfc3339(session.updated))
                    .unwrap_or_else(|| "-".to_string());
                writeln!(
                    out,
                    "{}  {}  sessions:{}  changes:{}  last:{}",
                    project.id, project.name, project.session_count, project.change_count, last
                )?;
            }
        }
        CliCommand::Changes { project_id } => {
            for change in get_session_changes(data, &project_id) {
                let updated = unix_ms_to_rfc3339(change.updated).unwrap_or_else(|| "-".to_string());
                writeln!(
                    out,
                    "{}  {}  files:{}  {}",
                    change.session_id,
                    updated,
                    change.files.len(),
                    display_title(&change.title),
                )?;
            }
        }
        CliCommand::Snapshots { project_id } => {
            for snapshot in get_snapshots(data, &project_id) {
                let taken = unix_ms_to_rfc3339(snapshot.timestamp).unwrap_or_else(|| "-".to_string());
                writeln!(
                    out,
                    "{}  {:<11}  {}  {}",
                    snapshot.hash,
                    snapshot.phase.label(),
                    taken,
                    display_title(snapshot.session_title.as_deref().unwrap_or("")),
                )?;
            }
        }
        CliCommand::Search { query, limit } => {
            if query.chars().count() < MIN_QUERY_CHARS {
                return Err(CliRunError::QueryTooShort);
            }
            let index = SearchIndex::new(data.clone());
            for result in index.search(&query, limit) {
                let when = unix_ms_to_rfc3339(result.timestamp).unwrap_or_else(|| "-".to_string());
                writeln!(
                    out,
                    "{}  [{}]  {}/{}: {}",
                    when,
                    result.role.label(),
                    result.project_name,
                    display_title(&result.session_title),
                    truncate_text(&result.text, 80),
                )?;
            }
        }
        // serve is dispatched in main, where the runtime lives
        CliCommand::Serve { .. } => {}
    }

    out.flush()?;
    Ok(())
}

fn display_title(title: &str) -> &str {
    if title.is_empty() { "(untitled)" } else { title }
}

fn truncate_text(text: &str, max_chars: usize) -> String {
    let flattened: String = text
        .chars()
        .map(|c| if c == '\n' { ' ' } else { c })
        .collect();
    if flattened.chars().count() <= max_chars {
        return flattened;
    }
    let clipped: String = flattened.chars().take(max_chars).collect();
    format!("{clipped}…")
}
