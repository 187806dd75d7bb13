//! Closed set of user intents consumed by the sync controller, and what
//! came of them.

use shared::{
    domain::{Board, BoardId, Column, ColumnId, Priority, Task, TaskId},
    protocol::{ColumnPatch, Page, RegisteredUser, TaskPatch},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Initialize,
    Login {
        email: String,
        password: String,
    },
    Register {
        email: String,
        password: String,
    },
    Logout,
    Refresh,
    SelectBoard {
        board_id: BoardId,
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
    CreateColumn {
        name: String,
        position: i64,
    },
    UpdateColumn {
        column_id: ColumnId,
        patch: ColumnPatch,
    },
    DeleteColumn {
        column_id: ColumnId,
    },
    CreateTask {
        column_id: ColumnId,
        title: String,
        priority: Priority,
        description: Option<String>,
    },
    UpdateTask {
        task_id: TaskId,
        patch: TaskPatch,
    },
    DeleteTask {
        task_id: TaskId,
    },
    StartDrag {
        task_id: TaskId,
    },
    DropOnColumn {
        column_id: Option<ColumnId>,
    },
    CancelDrag,
    /// Start and drop in one step.
    MoveTask {
        task_id: TaskId,
        column_id: ColumnId,
    },
    SearchTasks {
        query: String,
    },
}

impl Intent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::Login { .. } => "login",
            Self::Register { .. } => "register",
            Self::Logout => "logout",
            Self::Refresh => "refresh",
            Self::SelectBoard { .. } => "select_board",
            Self::CreateBoard { .. } => "create_board",
            Self::RenameBoard { .. } => "rename_board",
            Self::DeleteBoard { .. } => "delete_board",
            Self::CreateColumn { .. } => "create_column",
            Self::UpdateColumn { .. } => "update_column",
            Self::DeleteColumn { .. } => "delete_column",
            Self::CreateTask { .. } => "create_task",
            Self::UpdateTask { .. } => "update_task",
            Self::DeleteTask { .. } => "delete_task",
            Self::StartDrag { .. } => "start_drag",
            Self::DropOnColumn { .. } => "drop_on_column",
            Self::CancelDrag => "cancel_drag",
            Self::MoveTask { .. } => "move_task",
            Self::SearchTasks { .. } => "search_tasks",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoredDrop {
    NothingDragged,
    NoTarget,
    SameColumn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved {
        task_id: TaskId,
        from: ColumnId,
        to: ColumnId,
    },
    Ignored(IgnoredDrop),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    ViewUpdated,
    SignedOut,
    Registered(RegisteredUser),
    BoardSaved(Board),
    ColumnSaved(Column),
    TaskSaved(Task),
    Removed,
    DragStarted(TaskId),
    DragCancelled,
    Move(MoveOutcome),
    SearchResults(Page<Task>),
}
