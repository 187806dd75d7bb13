use std::{
    io::Write,
    path::PathBuf,
    process::ExitCode,
    sync::Arc,
};

mod console;
mod render;
mod shell;

use anyhow::Result;
use clap::{Parser, Subcommand};
use client_core::{
    build_controller, load_settings, ClientError, FileSessionStorage, Intent, LaunchParams,
    Outcome, Settings, SyncController, ViewPhase,
};
use shared::{
    domain::{BoardId, ColumnId, Priority, TaskId},
    protocol::{ColumnPatch, TaskPatch},
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{
    console::{describe, ConsoleNotifier},
    render::{render_boards, render_outcome, render_view, Surface},
    shell::{parse_line, ShellCommand, HELP},
};

#[derive(Parser, Debug)]
#[command(name = "taskflow", version, about = "Terminal client for TaskFlow kanban boards")]
struct Cli {
    /// Settings file; `taskflow.toml` in the working directory is read when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true)]
    server_url: Option<String>,
    #[arg(long, global = true)]
    api_base: Option<String>,
    /// URL the client was opened with; its `token` and `apiBase` parameters are honoured.
    #[arg(long, global = true)]
    launch_url: Option<String>,
    #[arg(long, global = true)]
    session_file: Option<PathBuf>,
    /// Board to open before running the command (defaults to the first board).
    #[arg(long, global = true)]
    board: Option<BoardId>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        email: String,
        #[arg(long)]
        password: String,
    },
    Register {
        email: String,
        #[arg(long)]
        password: String,
    },
    Logout,
    /// List boards.
    Boards,
    /// Render a board with its columns and tasks.
    Show {
        board_id: Option<BoardId>,
    },
    CreateBoard {
        name: String,
    },
    RenameBoard {
        board_id: BoardId,
        name: String,
    },
    DeleteBoard {
        board_id: BoardId,
    },
    /// Add a column to the open board.
    CreateColumn {
        name: String,
        #[arg(long, default_value_t = 0)]
        position: i64,
    },
    UpdateColumn {
        column_id: ColumnId,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        position: Option<i64>,
    },
    DeleteColumn {
        column_id: ColumnId,
    },
    CreateTask {
        column_id: ColumnId,
        title: String,
        #[arg(long, default_value = "MEDIUM")]
        priority: Priority,
        #[arg(long)]
        description: Option<String>,
    },
    UpdateTask {
        task_id: TaskId,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        priority: Option<Priority>,
        #[arg(long)]
        column: Option<ColumnId>,
        #[arg(long)]
        position: Option<i64>,
    },
    DeleteTask {
        task_id: TaskId,
    },
    /// Move a task on the open board to another column.
    MoveTask {
        task_id: TaskId,
        column_id: ColumnId,
    },
    Search {
        query: String,
    },
    /// Interactive session.
    Shell,
}

impl Command {
    /// Intent for commands that map onto a single controller dispatch.
    fn into_intent(self) -> Option<Intent> {
        Some(match self {
            Self::Login { email, password } => Intent::Login { email, password },
            Self::Register { email, password } => Intent::Register { email, password },
            Self::Logout => Intent::Logout,
            Self::CreateBoard { name } => Intent::CreateBoard { name },
            Self::RenameBoard { board_id, name } => Intent::RenameBoard { board_id, name },
            Self::DeleteBoard { board_id } => Intent::DeleteBoard { board_id },
            Self::CreateColumn { name, position } => Intent::CreateColumn { name, position },
            Self::UpdateColumn {
                column_id,
                name,
                position,
            } => Intent::UpdateColumn {
                column_id,
                patch: ColumnPatch { name, position },
            },
            Self::DeleteColumn { column_id } => Intent::DeleteColumn { column_id },
            Self::CreateTask {
                column_id,
                title,
                priority,
                description,
            } => Intent::CreateTask {
                column_id,
                title,
                priority,
                description,
            },
            Self::UpdateTask {
                task_id,
                title,
                description,
                priority,
                column,
                position,
            } => Intent::UpdateTask {
                task_id,
                patch: TaskPatch {
                    title,
                    description,
                    priority,
                    column_id: column,
                    position,
                    ..TaskPatch::default()
                },
            },
            Self::DeleteTask { task_id } => Intent::DeleteTask { task_id },
            Self::MoveTask { task_id, column_id } => Intent::MoveTask { task_id, column_id },
            Self::Search { query } => Intent::SearchTasks { query },
            Self::Boards | Self::Show { .. } | Self::Shell => return None,
        })
    }

    fn needs_open_board(&self) -> bool {
        !matches!(
            self,
            Self::Login { .. } | Self::Register { .. } | Self::Logout | Self::Shell
        )
    }
}

fn apply_cli_overrides(settings: &mut Settings, cli: &Cli) {
    if let Some(url) = &cli.server_url {
        settings.server_url = url.clone();
    }
    if let Some(base) = &cli.api_base {
        settings.api_base = Some(base.clone());
    }
    if let Some(path) = &cli.session_file {
        settings.session_file = Some(path.clone());
    }
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Loads the board list and switches to `board` when one was requested.
async fn open_board(controller: &mut SyncController, board: Option<BoardId>) -> Result<()> {
    controller.dispatch(Intent::Initialize).await?;
    if controller.view().phase == ViewPhase::Unauthenticated {
        return Err(ClientError::Unauthenticated.into());
    }
    if let Some(board_id) = board {
        if controller.view().selected_board != Some(board_id) {
            controller.dispatch(Intent::SelectBoard { board_id }).await?;
        }
    }
    Ok(())
}

fn print_outcome(controller: &SyncController, outcome: &Outcome, surface: Surface) {
    if let Some(message) = render_outcome(outcome) {
        println!("{message}");
    }
    if !matches!(outcome, Outcome::SearchResults(_)) {
        println!("{}", render_view(controller.view(), surface));
    }
}

async fn run_shell(controller: &mut SyncController) -> Result<()> {
    if let Err(err) = controller.dispatch(Intent::Initialize).await {
        eprintln!("{}", describe(&err.into(), Surface::Shell));
    }
    println!("{}", render_view(controller.view(), Surface::Shell));
    println!("Type `help` for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("taskflow> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        match parse_line(&line) {
            Ok(ShellCommand::Empty) => {}
            Ok(ShellCommand::Help) => println!("{HELP}"),
            Ok(ShellCommand::Quit) => break,
            Ok(ShellCommand::Show) => {
                println!("{}", render_view(controller.view(), Surface::Shell))
            }
            Ok(ShellCommand::Run(intent)) => match controller.dispatch(intent).await {
                Ok(outcome) => print_outcome(controller, &outcome, Surface::Shell),
                Err(err) => eprintln!("{}", describe(&err.into(), Surface::Shell)),
            },
            Err(err) => eprintln!("{err:#}"),
        }
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let mut settings = load_settings(cli.config.as_deref())?;
    apply_cli_overrides(&mut settings, &cli);
    init_tracing(&settings.log_filter);

    let launch = match cli.launch_url.as_deref() {
        Some(raw) => LaunchParams::from_url(raw)?,
        None => LaunchParams::default(),
    };
    let storage = Arc::new(FileSessionStorage::new(settings.session_path()?));
    info!(session = %storage.path().display(), "taskflow: starting");
    let mut controller =
        build_controller(&settings, &launch, storage, Arc::new(ConsoleNotifier))?;

    if cli.command.needs_open_board() {
        open_board(&mut controller, cli.board).await?;
    }

    match cli.command {
        Command::Shell => run_shell(&mut controller).await,
        Command::Boards => {
            let view = controller.view();
            println!("{}", render_boards(&view.boards, view.selected_board));
            Ok(())
        }
        Command::Show { board_id } => {
            if let Some(board_id) = board_id {
                controller.dispatch(Intent::SelectBoard { board_id }).await?;
            }
            println!("{}", render_view(controller.view(), Surface::Cli));
            Ok(())
        }
        command => {
            let Some(intent) = command.into_intent() else {
                return Ok(());
            };
            let outcome = controller.dispatch(intent).await?;
            print_outcome(&controller, &outcome, Surface::Cli);
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", describe(&err, Surface::Cli));
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
