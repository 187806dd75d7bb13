//! Line-oriented commands for the interactive shell.

use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use client_core::Intent;
use shared::{
    domain::Priority,
    protocol::{ColumnPatch, TaskPatch},
};

pub const HELP: &str = "\
commands:
  show                              render the current board
  boards | refresh                  reload the board list
  select <board>                    switch board
  new-board <name>                  create a board
  rename-board <board> <name>       rename a board
  delete-board <board>              delete a board
  new-column <position> <name>      add a column to the current board
  rename-column <column> <name>     rename a column
  move-column <column> <position>   reposition a column
  delete-column <column>            delete a column
  new-task <column> <priority> <title>
  retitle <task> <title>            change a task title
  describe <task> <text>            change a task description
  priority <task> <priority>        change a task priority
  delete-task <task>                delete a task
  drag <task> | drop [column] | cancel
  move <task> <column>              drag and drop in one step
  search <text>                     search tasks by title
  login <email> <password> | register <email> <password> | logout
  help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Empty,
    Help,
    Quit,
    Show,
    Run(Intent),
}

pub fn parse_line(line: &str) -> Result<ShellCommand> {
    let line = line.trim();
    let (verb, rest) = line
        .split_once(char::is_whitespace)
        .map(|(verb, rest)| (verb, rest.trim()))
        .unwrap_or((line, ""));

    let intent = match verb {
        "" => return Ok(ShellCommand::Empty),
        "help" | "?" => return Ok(ShellCommand::Help),
        "quit" | "exit" => return Ok(ShellCommand::Quit),
        "show" => return Ok(ShellCommand::Show),
        "boards" | "refresh" => Intent::Refresh,
        "login" => {
            let (email, password) = two_words(rest, "login <email> <password>")?;
            Intent::Login { email, password }
        }
        "register" => {
            let (email, password) = two_words(rest, "register <email> <password>")?;
            Intent::Register { email, password }
        }
        "logout" => Intent::Logout,
        "select" => Intent::SelectBoard {
            board_id: parse_arg(rest, "board id")?,
        },
        "new-board" => Intent::CreateBoard {
            name: text(rest, "new-board <name>")?,
        },
        "rename-board" => {
            let (id, name) = id_and_text(rest, "rename-board <board> <name>")?;
            Intent::RenameBoard {
                board_id: parse_arg(id, "board id")?,
                name,
            }
        }
        "delete-board" => Intent::DeleteBoard {
            board_id: parse_arg(rest, "board id")?,
        },
        "new-column" => {
            let (position, name) = id_and_text(rest, "new-column <position> <name>")?;
            Intent::CreateColumn {
                name,
                position: parse_arg(position, "position")?,
            }
        }
        "rename-column" => {
            let (id, name) = id_and_text(rest, "rename-column <column> <name>")?;
            Intent::UpdateColumn {
                column_id: parse_arg(id, "column id")?,
                patch: ColumnPatch {
                    name: Some(name),
                    position: None,
                },
            }
        }
        "move-column" => {
            let (id, position) = two_words(rest, "move-column <column> <position>")?;
            Intent::UpdateColumn {
                column_id: parse_arg(&id, "column id")?,
                patch: ColumnPatch {
                    name: None,
                    position: Some(parse_arg(&position, "position")?),
                },
            }
        }
        "delete-column" => Intent::DeleteColumn {
            column_id: parse_arg(rest, "column id")?,
        },
        "new-task" => {
            let usage = "new-task <column> <priority> <title>";
            let (column, rest) = id_and_text(rest, usage)?;
            let (priority, title) = id_and_text(&rest, usage)?;
            Intent::CreateTask {
                column_id: parse_arg(column, "column id")?,
                title,
                priority: parse_arg::<Priority>(priority, "priority")?,
                description: None,
            }
        }
        "retitle" => {
            let (id, title) = id_and_text(rest, "retitle <task> <title>")?;
            Intent::UpdateTask {
                task_id: parse_arg(id, "task id")?,
                patch: TaskPatch {
                    title: Some(title),
                    ..TaskPatch::default()
                },
            }
        }
        "describe" => {
            let (id, description) = id_and_text(rest, "describe <task> <text>")?;
            Intent::UpdateTask {
                task_id: parse_arg(id, "task id")?,
                patch: TaskPatch {
                    description: Some(description),
                    ..TaskPatch::default()
                },
            }
        }
        "priority" => {
            let (id, priority) = two_words(rest, "priority <task> <priority>")?;
            Intent::UpdateTask {
                task_id: parse_arg(&id, "task id")?,
                patch: TaskPatch {
                    priority: Some(parse_arg(&priority, "priority")?),
                    ..TaskPatch::default()
                },
            }
        }
        "delete-task" => Intent::DeleteTask {
            task_id: parse_arg(rest, "task id")?,
        },
        "drag" => Intent::StartDrag {
            task_id: parse_arg(rest, "task id")?,
        },
        "drop" => Intent::DropOnColumn {
            column_id: if rest.is_empty() {
                None
            } else {
                Some(parse_arg(rest, "column id")?)
            },
        },
        "cancel" => Intent::CancelDrag,
        "move" => {
            let (task, column) = two_words(rest, "move <task> <column>")?;
            Intent::MoveTask {
                task_id: parse_arg(&task, "task id")?,
                column_id: parse_arg(&column, "column id")?,
            }
        }
        "search" => Intent::SearchTasks {
            query: text(rest, "search <text>")?,
        },
        other => bail!("unknown command '{other}' (try `help`)"),
    };
    Ok(ShellCommand::Run(intent))
}

fn parse_arg<T>(raw: &str, what: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    if raw.is_empty() {
        bail!("missing {what}");
    }
    raw.parse::<T>()
        .with_context(|| format!("invalid {what} '{raw}'"))
}

fn text(rest: &str, usage: &str) -> Result<String> {
    if rest.is_empty() {
        bail!("usage: {usage}");
    }
    Ok(rest.to_string())
}

fn id_and_text<'a>(rest: &'a str, usage: &str) -> Result<(&'a str, String)> {
    let (head, tail) = rest
        .split_once(char::is_whitespace)
        .ok_or_else(|| anyhow!("usage: {usage}"))?;
    let tail = tail.trim();
    if tail.is_empty() {
        bail!("usage: {usage}");
    }
    Ok((head, tail.to_string()))
}

fn two_words(rest: &str, usage: &str) -> Result<(String, String)> {
    let mut words = rest.split_whitespace();
    match (words.next(), words.next(), words.next()) {
        (Some(first), Some(second), None) => Ok((first.to_string(), second.to_string())),
        _ => bail!("usage: {usage}"),
    }
}

#[cfg(test)]
#[path = "tests/shell_tests.rs"]
mod tests;
