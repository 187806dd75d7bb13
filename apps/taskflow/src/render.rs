//! Plain-text rendering of the board view.

use std::fmt::Write;

use client_core::{BoardView, ColumnView, IgnoredDrop, MoveOutcome, Outcome, ViewPhase};
use shared::{
    domain::{Board, BoardId, Task, TaskId},
    protocol::Page,
};

/// Where output is shown; command hints differ between one-shot CLI use and
/// the interactive shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Cli,
    Shell,
}

impl Surface {
    pub fn sign_in_hint(self) -> &'static str {
        match self {
            Self::Cli => "`taskflow login <email> --password <password>`",
            Self::Shell => "`login <email> <password>`",
        }
    }

    fn new_board_hint(self) -> &'static str {
        match self {
            Self::Cli => "`taskflow create-board <name>`",
            Self::Shell => "`new-board <name>`",
        }
    }
}

pub fn render_view(view: &BoardView, surface: Surface) -> String {
    match view.phase {
        ViewPhase::Unauthenticated => {
            format!("Not signed in. Sign in with {}.", surface.sign_in_hint())
        }
        ViewPhase::ListLoading => "Loading boards...".to_string(),
        ViewPhase::Empty => format!(
            "No boards yet. Create one with {}.",
            surface.new_board_hint()
        ),
        ViewPhase::BoardLoading(board_id) => format!("Loading board #{board_id}..."),
        ViewPhase::Failed => format!(
            "Could not load the board: {}",
            view.last_error.as_deref().unwrap_or("unknown error")
        ),
        ViewPhase::Ready => render_ready(view),
    }
}

fn render_ready(view: &BoardView) -> String {
    let mut out = render_boards(&view.boards, view.selected_board);
    let Some(snapshot) = view.snapshot.as_ref() else {
        out.push_str("\nNo board selected.");
        return out;
    };
    let title = view
        .selected()
        .map(|board| board.name.as_str())
        .unwrap_or("(unnamed board)");
    let _ = write!(out, "\n== {title} (#{}) ==", snapshot.board_id);
    if snapshot.columns.is_empty() {
        out.push_str("\nThis board has no columns yet.");
    }
    for column in &snapshot.columns {
        out.push('\n');
        out.push_str(&render_column(column, view.drag.current()));
    }
    if let Some(err) = &view.last_error {
        let _ = write!(out, "\n! {err}");
    }
    out
}

/// Board list with the selected board marked.
pub fn render_boards(boards: &[Board], selected: Option<BoardId>) -> String {
    if boards.is_empty() {
        return "No boards.".to_string();
    }
    let mut out = String::from("Boards:");
    for board in boards {
        let marker = if Some(board.id) == selected { '>' } else { ' ' };
        let _ = write!(out, "\n {marker} #{:<5} {}", board.id.0, board.name);
    }
    out
}

pub fn render_column(column: &ColumnView, dragged: Option<TaskId>) -> String {
    let mut out = format!(
        "{} (#{}) [{}]",
        column.column.name,
        column.id(),
        column.task_count()
    );
    if column.tasks.is_empty() {
        out.push_str("\n    (empty)");
    }
    for task in &column.tasks {
        let marker = if Some(task.id) == dragged { '*' } else { ' ' };
        let _ = write!(out, "\n  {marker} {}", render_task(task));
    }
    out
}

pub fn render_task(task: &Task) -> String {
    let mut line = format!("#{} [{}] {}", task.id, task.priority, task.title);
    if let Some(description) = task.description.as_deref().filter(|d| !d.is_empty()) {
        let _ = write!(line, " - {description}");
    }
    line
}

pub fn render_search(page: &Page<Task>) -> String {
    let total = page.total.unwrap_or(page.items.len() as u64);
    let mut out = format!("{total} match(es)");
    for task in &page.items {
        let _ = write!(out, "\n  {} (column #{})", render_task(task), task.column_id);
    }
    out
}

/// Short confirmation for an outcome; `None` when re-rendering the view says
/// enough.
pub fn render_outcome(outcome: &Outcome) -> Option<String> {
    match outcome {
        Outcome::ViewUpdated | Outcome::Removed => None,
        Outcome::SignedOut => Some("Signed out.".to_string()),
        Outcome::Registered(user) => Some(format!("Registered {} (#{}).", user.email, user.id)),
        Outcome::BoardSaved(board) => Some(format!("Board #{} '{}'.", board.id, board.name)),
        Outcome::ColumnSaved(column) => {
            Some(format!("Column #{} '{}'.", column.id, column.name))
        }
        Outcome::TaskSaved(task) => Some(format!("Task {}.", render_task(task))),
        Outcome::DragStarted(task_id) => Some(format!(
            "Dragging task #{task_id}; `drop <column>` to move it."
        )),
        Outcome::DragCancelled => Some("Drag cancelled.".to_string()),
        Outcome::Move(MoveOutcome::Moved { task_id, from, to }) => Some(format!(
            "Moved task #{task_id} from column #{from} to #{to}."
        )),
        Outcome::Move(MoveOutcome::Ignored(reason)) => Some(
            match reason {
                IgnoredDrop::NothingDragged => "Nothing is being dragged.",
                IgnoredDrop::NoTarget => "Dropped outside any column; nothing moved.",
                IgnoredDrop::SameColumn => "Task is already in that column.",
            }
            .to_string(),
        ),
        Outcome::SearchResults(page) => Some(render_search(page)),
    }
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
