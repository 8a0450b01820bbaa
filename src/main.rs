mod app;
mod cli;
mod domain;
mod infra;
mod server;
mod ui;

use crate::app::{AppCommand, AppModel};
use crate::cli::{CliArgs, CliCommand, CliInvocation};
use crate::infra::{DataDir, resolve_data_dir};
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use crossterm::{ExecutableCommand, execute};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io::{self, Stdout, Write};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
enum MainError {
    #[error(transparent)]
    App(#[from] crate::app::AppError),

    #[error(transparent)]
    Cli(#[from] crate::cli::CliRunError),

    #[error("failed to start async runtime: {0}")]
    Runtime(io::Error),

    #[error("server error: {0}")]
    Server(String),
}

fn main() {
    if let Err(error) = run_main() {
        let mut err = io::stderr().lock();
        let _ = writeln!(err, "{error}");
        std::process::exit(1);
    }
}

fn run_main() -> Result<(), MainError> {
    let argv = std::env::args().collect::<Vec<_>>();
    let args = match crate::cli::parse_invocation(&argv) {
        Ok(args) => args,
        Err(error) => {
            let mut err = io::stderr().lock();
            let _ = writeln!(err, "{error}");
            let _ = writeln!(err);
            print_help();
            std::process::exit(2);
        }
    };

    let CliArgs {
        data_dir,
        invocation,
    } = args;

    match invocation {
        CliInvocation::PrintHelp => {
            print_help();
            Ok(())
        }
        CliInvocation::PrintVersion => {
            let mut out = io::stdout().lock();
            let _ = writeln!(out, "{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        CliInvocation::Tui => {
            let data = resolve(data_dir)?;
            run_tui(data)
        }
        CliInvocation::Command(CliCommand::Serve { port }) => {
            let data = resolve(data_dir)?;
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(MainError::Runtime)?;
            let mut out = io::stdout().lock();
            let _ = writeln!(out, "listening on http://127.0.0.1:{port}");
            drop(out);
            runtime
                .block_on(crate::server::run_http_server(port, data))
                .map_err(MainError::Server)
        }
        CliInvocation::Command(command) => {
            let data = resolve(data_dir)?;
            crate::cli::run(command, &data)?;
            Ok(())
        }
    }
}

fn resolve(data_dir: Option<PathBuf>) -> Result<DataDir, MainError> {
    match data_dir {
        Some(path) => Ok(DataDir::new(path)),
        None => Ok(resolve_data_dir().map_err(crate::app::AppError::from)?),
    }
}

fn print_help() {
    let text = format!(
        "{name} — browse OpenCode session history, file diffs, and snapshots\n\nUSAGE:\n  {name}                       Start the TUI\n  {name} projects              List tracked projects\n  {name} changes <projectId>   List sessions with file changes\n  {name} snapshots <projectId> List tree snapshots for a project\n  {name} search <query>        Search prompt text across all sessions\n  {name} serve                 Serve the local HTTP API\n  {name} --help | --version\n\nFLAGS:\n  -d, --data-dir PATH  Override the data directory (default: ~/.local/share/opencode)\n  -l, --limit N        Max search results (default: {limit})\n  -p, --port N         Port for serve (default: {port})\n\nENV:\n  OCSNAP_DATA_DIR      Override the data directory\n  XDG_DATA_HOME        Standard data home, checked before the default\n",
        name = env!("CARGO_PKG_NAME"),
        limit = crate::cli::DEFAULT_SEARCH_LIMIT,
        port = crate::cli::DEFAULT_SERVE_PORT,
    );
    let mut out = io::stdout().lock();
    let _ = write!(out, "{text}");
}

fn run_tui(data: DataDir) -> Result<(), MainError> {
    let mut model = AppModel::new(data);
    let mut terminal = setup_terminal().map_err(crate::app::AppError::from)?;
    let result = run_event_loop(&mut terminal, &mut model);
    restore_terminal(&mut terminal).map_err(crate::app::AppError::from)?;
    result.map_err(crate::app::AppError::from)?;
    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>, io::Error> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<(), io::Error> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    model: &mut AppModel,
) -> Result<(), io::Error> {
    loop {
        terminal.draw(|frame| ui::render(frame, model))?;

        if event::poll(Duration::from_millis(250))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Release {
                    continue;
                }
                if let Some(AppCommand::Quit) = model.handle_key(key) {
                    return Ok(());
                }
            }
        }
    }
}
