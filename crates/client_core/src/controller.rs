use std::sync::Arc;

use futures::future::try_join_all;
use shared::{
    domain::{Board, BoardId, Column, ColumnId, Priority, Task, TaskId},
    protocol::{ColumnPatch, Page, RegisteredUser, TaskFilter, TaskPatch},
};
use tracing::{info, warn};

use crate::{
    board::BoardSnapshot,
    drag::DragContext,
    error::{ClientError, ClientResult},
    gateway::KanbanApi,
    intent::{IgnoredDrop, Intent, MoveOutcome, Outcome},
    notify::{NoticeKind, NoopNotifier, Notifier},
    session::SessionStore,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewPhase {
    #[default]
    Unauthenticated,
    ListLoading,
    Empty,
    BoardLoading(BoardId),
    Ready,
    Failed,
}

#[derive(Debug, Clone, Default)]
pub struct BoardView {
    pub phase: ViewPhase,
    pub boards: Vec<Board>,
    pub selected_board: Option<BoardId>,
    pub snapshot: Option<BoardSnapshot>,
    pub drag: DragContext,
    pub last_error: Option<String>,
}

impl BoardView {
    pub fn selected(&self) -> Option<&Board> {
        let id = self.selected_board?;
        self.boards.iter().find(|board| board.id == id)
    }

    fn has_rendered_board(&self) -> bool {
        self.snapshot.is_some()
    }
}

/// Owns the board view and keeps it consistent with the server.
///
/// Fetch failures never commit a partial snapshot: the previous render stays
/// (or the view moves to [`ViewPhase::Failed`] when there is nothing to show).
/// Task moves patch the snapshot in place; every other mutation re-fetches.
pub struct SyncController {
    api: Arc<dyn KanbanApi>,
    session: SessionStore,
    notifier: Arc<dyn Notifier>,
    view: BoardView,
}

impl SyncController {
    pub fn new(api: Arc<dyn KanbanApi>, session: SessionStore) -> Self {
        Self {
            api,
            session,
            notifier: Arc::new(NoopNotifier),
            view: BoardView::default(),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn view(&self) -> &BoardView {
        &self.view
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub async fn dispatch(&mut self, intent: Intent) -> ClientResult<Outcome> {
        info!(intent = intent.name(), "sync: dispatch");
        match intent {
            Intent::Initialize => self.initialize().await.map(|_| Outcome::ViewUpdated),
            Intent::Login { email, password } => self
                .login(&email, &password)
                .await
                .map(|_| Outcome::ViewUpdated),
            Intent::Register { email, password } => self
                .register(&email, &password)
                .await
                .map(Outcome::Registered),
            Intent::Logout => self.logout().map(|_| Outcome::SignedOut),
            Intent::Refresh => self.load_boards().await.map(|_| Outcome::ViewUpdated),
            Intent::SelectBoard { board_id } => self
                .select_board(board_id)
                .await
                .map(|_| Outcome::ViewUpdated),
            Intent::CreateBoard { name } => {
                self.create_board(&name).await.map(Outcome::BoardSaved)
            }
            Intent::RenameBoard { board_id, name } => self
                .rename_board(board_id, &name)
                .await
                .map(Outcome::BoardSaved),
            Intent::DeleteBoard { board_id } => {
                self.delete_board(board_id).await.map(|_| Outcome::Removed)
            }
            Intent::CreateColumn { name, position } => self
                .create_column(&name, position)
                .await
                .map(Outcome::ColumnSaved),
            Intent::UpdateColumn { column_id, patch } => self
                .update_column(column_id, &patch)
                .await
                .map(Outcome::ColumnSaved),
            Intent::DeleteColumn { column_id } => {
                self.delete_column(column_id).await.map(|_| Outcome::Removed)
            }
            Intent::CreateTask {
                column_id,
                title,
                priority,
                description,
            } => self
                .create_task(column_id, &title, priority, description.as_deref())
                .await
                .map(Outcome::TaskSaved),
            Intent::UpdateTask { task_id, patch } => self
                .update_task(task_id, &patch)
                .await
                .map(Outcome::TaskSaved),
            Intent::DeleteTask { task_id } => {
                self.delete_task(task_id).await.map(|_| Outcome::Removed)
            }
            Intent::StartDrag { task_id } => {
                self.start_drag(task_id).map(|_| Outcome::DragStarted(task_id))
            }
            Intent::DropOnColumn { column_id } => {
                self.drop_on_column(column_id).await.map(Outcome::Move)
            }
            Intent::CancelDrag => {
                self.cancel_drag();
                Ok(Outcome::DragCancelled)
            }
            Intent::MoveTask { task_id, column_id } => {
                self.move_task(task_id, column_id).await.map(Outcome::Move)
            }
            Intent::SearchTasks { query } => {
                self.search_tasks(&query).await.map(Outcome::SearchResults)
            }
        }
    }

    pub async fn initialize(&mut self) -> ClientResult<()> {
        if self.session.token().is_none() {
            self.view = BoardView::default();
            return Ok(());
        }
        self.load_boards().await
    }

    pub async fn login(&mut self, email: &str, password: &str) -> ClientResult<()> {
        if let Err(err) = self.session.login(email, password).await {
            return Err(self.fail("sign-in failed", err));
        }
        self.notifier.notify(NoticeKind::Success, "Signed in");
        self.view = BoardView::default();
        self.load_boards().await
    }

    pub async fn register(&mut self, email: &str, password: &str) -> ClientResult<RegisteredUser> {
        let user = match self.session.register(email, password).await {
            Ok(user) => user,
            Err(err) => return Err(self.fail("registration failed", err)),
        };
        self.notifier
            .notify(NoticeKind::Success, &format!("Registered {}", user.email));
        self.login(email, password).await?;
        Ok(user)
    }

    pub fn logout(&mut self) -> ClientResult<()> {
        if let Err(err) = self.session.logout() {
            return Err(self.fail("sign-out failed", err));
        }
        self.view = BoardView::default();
        self.notifier.notify(NoticeKind::Info, "Signed out");
        Ok(())
    }

    /// Fetches the board list and auto-selects a board: the current one if it
    /// is still listed, otherwise the first.
    pub async fn load_boards(&mut self) -> ClientResult<()> {
        self.load_boards_preferring(None).await
    }

    async fn load_boards_preferring(&mut self, preferred: Option<BoardId>) -> ClientResult<()> {
        let token = self.require_token()?;
        let previous = self.view.phase;
        self.view.phase = ViewPhase::ListLoading;
        info!("sync: loading boards");

        let page = match self.api.get_boards(&token).await {
            Ok(page) => page,
            Err(err) => {
                self.view.phase = match previous {
                    ViewPhase::Empty => ViewPhase::Empty,
                    _ if self.view.has_rendered_board() => ViewPhase::Ready,
                    _ => ViewPhase::Failed,
                };
                return Err(self.fail("failed to load boards", err));
            }
        };

        self.view.boards = page.items;
        if self.view.boards.is_empty() {
            info!("sync: no boards");
            self.view.selected_board = None;
            self.view.snapshot = None;
            self.view.drag.clear();
            self.view.last_error = None;
            self.view.phase = ViewPhase::Empty;
            return Ok(());
        }

        let boards = &self.view.boards;
        let listed = |id: &BoardId| boards.iter().any(|board| board.id == *id);
        let target = preferred
            .filter(listed)
            .or(self.view.selected_board.filter(listed))
            .unwrap_or(boards[0].id);
        self.load_board(target).await
    }

    pub async fn select_board(&mut self, board_id: BoardId) -> ClientResult<()> {
        self.load_board(board_id).await
    }

    /// Columns first, then every column's tasks concurrently. All of them
    /// must succeed before the snapshot replaces the current one.
    pub async fn load_board(&mut self, board_id: BoardId) -> ClientResult<()> {
        let token = self.require_token()?;
        if self.view.selected_board != Some(board_id) {
            self.view.snapshot = None;
            self.view.drag.clear();
        }
        self.view.selected_board = Some(board_id);
        self.view.phase = ViewPhase::BoardLoading(board_id);
        info!(board_id = board_id.0, "sync: loading board");

        match self.fetch_snapshot(board_id, &token).await {
            Ok(snapshot) => {
                info!(
                    board_id = board_id.0,
                    columns = snapshot.columns.len(),
                    tasks = snapshot.task_count(),
                    "sync: board loaded"
                );
                if let Some(dragged) = self.view.drag.current() {
                    if snapshot.find_task(dragged).is_none() {
                        self.view.drag.clear();
                    }
                }
                self.view.snapshot = Some(snapshot);
                self.view.last_error = None;
                self.view.phase = ViewPhase::Ready;
                Ok(())
            }
            Err(err) => {
                self.view.phase = if self.view.has_rendered_board() {
                    ViewPhase::Ready
                } else {
                    ViewPhase::Failed
                };
                Err(self.fail("failed to load board", err))
            }
        }
    }

    async fn fetch_snapshot(&self, board_id: BoardId, token: &str) -> ClientResult<BoardSnapshot> {
        let columns = self.api.get_board_columns(board_id, token).await?.items;
        let task_pages = try_join_all(columns.iter().map(|column| {
            self.api
                .get_tasks_by_column(column.id, TaskFilter::default(), token)
        }))
        .await?;

        let paired = columns
            .into_iter()
            .zip(task_pages.into_iter().map(|page| page.items))
            .collect();
        Ok(BoardSnapshot::assemble(board_id, paired))
    }

    async fn reload_current_board(&mut self) -> ClientResult<()> {
        match self.view.selected_board {
            Some(board_id) => self.load_board(board_id).await,
            None => self.load_boards().await,
        }
    }

    pub async fn create_board(&mut self, name: &str) -> ClientResult<Board> {
        let token = self.require_token()?;
        let board = match self.api.create_board(name, &token).await {
            Ok(board) => board,
            Err(err) => return Err(self.fail("failed to create board", err)),
        };
        self.notifier
            .notify(NoticeKind::Success, &format!("Board '{}' created", board.name));
        self.load_boards_preferring(Some(board.id)).await?;
        Ok(board)
    }

    pub async fn rename_board(&mut self, board_id: BoardId, name: &str) -> ClientResult<Board> {
        let token = self.require_token()?;
        let board = match self.api.rename_board(board_id, name, &token).await {
            Ok(board) => board,
            Err(err) => return Err(self.fail("failed to rename board", err)),
        };
        self.notifier
            .notify(NoticeKind::Success, &format!("Board renamed to '{}'", board.name));
        self.load_boards().await?;
        Ok(board)
    }

    pub async fn delete_board(&mut self, board_id: BoardId) -> ClientResult<()> {
        let token = self.require_token()?;
        if let Err(err) = self.api.delete_board(board_id, &token).await {
            return Err(self.fail("failed to delete board", err));
        }
        self.notifier.notify(NoticeKind::Success, "Board deleted");
        if self.view.selected_board == Some(board_id) {
            self.view.selected_board = None;
            self.view.snapshot = None;
            self.view.drag.clear();
        }
        self.load_boards().await
    }

    pub async fn create_column(&mut self, name: &str, position: i64) -> ClientResult<Column> {
        let token = self.require_token()?;
        let Some(board_id) = self.view.selected_board else {
            return Err(self.fail(
                "cannot create column",
                ClientError::validation("no board selected"),
            ));
        };
        let column = match self.api.create_column(board_id, name, position, &token).await {
            Ok(column) => column,
            Err(err) => return Err(self.fail("failed to create column", err)),
        };
        self.notifier
            .notify(NoticeKind::Success, &format!("Column '{}' created", column.name));
        self.load_board(board_id).await?;
        Ok(column)
    }

    pub async fn update_column(
        &mut self,
        column_id: ColumnId,
        patch: &ColumnPatch,
    ) -> ClientResult<Column> {
        let token = self.require_token()?;
        let column = match self.api.update_column(column_id, patch, &token).await {
            Ok(column) => column,
            Err(err) => return Err(self.fail("failed to update column", err)),
        };
        self.notifier
            .notify(NoticeKind::Success, &format!("Column '{}' updated", column.name));
        self.reload_current_board().await?;
        Ok(column)
    }

    pub async fn delete_column(&mut self, column_id: ColumnId) -> ClientResult<()> {
        let token = self.require_token()?;
        if let Err(err) = self.api.delete_column(column_id, &token).await {
            return Err(self.fail("failed to delete column", err));
        }
        self.notifier.notify(NoticeKind::Success, "Column deleted");
        self.reload_current_board().await
    }

    pub async fn create_task(
        &mut self,
        column_id: ColumnId,
        title: &str,
        priority: Priority,
        description: Option<&str>,
    ) -> ClientResult<Task> {
        let token = self.require_token()?;
        let task = match self
            .api
            .create_task(column_id, title, priority, &token, description)
            .await
        {
            Ok(task) => task,
            Err(err) => return Err(self.fail("failed to create task", err)),
        };
        self.notifier
            .notify(NoticeKind::Success, &format!("Task '{}' created", task.title));
        self.reload_current_board().await?;
        Ok(task)
    }

    pub async fn update_task(&mut self, task_id: TaskId, patch: &TaskPatch) -> ClientResult<Task> {
        let token = self.require_token()?;
        let task = match self.api.update_task(task_id, patch, &token).await {
            Ok(task) => task,
            Err(err) => return Err(self.fail("failed to update task", err)),
        };
        self.notifier
            .notify(NoticeKind::Success, &format!("Task '{}' updated", task.title));
        self.reload_current_board().await?;
        Ok(task)
    }

    pub async fn delete_task(&mut self, task_id: TaskId) -> ClientResult<()> {
        let token = self.require_token()?;
        if let Err(err) = self.api.delete_task(task_id, &token).await {
            return Err(self.fail("failed to delete task", err));
        }
        self.notifier.notify(NoticeKind::Success, "Task deleted");
        self.reload_current_board().await
    }

    pub fn start_drag(&mut self, task_id: TaskId) -> ClientResult<()> {
        let on_board = self
            .view
            .snapshot
            .as_ref()
            .is_some_and(|snapshot| snapshot.find_task(task_id).is_some());
        if !on_board {
            return Err(self.fail(
                "cannot drag task",
                ClientError::validation(format!("task {task_id} is not on the current board")),
            ));
        }
        self.view.drag.start(task_id);
        Ok(())
    }

    pub fn cancel_drag(&mut self) {
        self.view.drag.clear();
    }

    /// Ends the current drag over `target`. Moves are patched into the
    /// snapshot only after the server accepts them; nothing is re-fetched.
    pub async fn drop_on_column(&mut self, target: Option<ColumnId>) -> ClientResult<MoveOutcome> {
        let Some(task_id) = self.view.drag.take() else {
            return Ok(MoveOutcome::Ignored(IgnoredDrop::NothingDragged));
        };
        let Some(target) = target else {
            return Ok(MoveOutcome::Ignored(IgnoredDrop::NoTarget));
        };

        let (source, target_known) = match self.view.snapshot.as_ref() {
            Some(snapshot) => (
                snapshot.column_of(task_id),
                snapshot.contains_column(target),
            ),
            None => (None, false),
        };
        let Some(source) = source else {
            return Err(self.fail(
                "cannot move task",
                ClientError::validation(format!("task {task_id} is not on the current board")),
            ));
        };
        if source == target {
            return Ok(MoveOutcome::Ignored(IgnoredDrop::SameColumn));
        }
        if !target_known {
            return Err(self.fail(
                "cannot move task",
                ClientError::validation(format!("column {target} is not on the current board")),
            ));
        }

        let token = self.require_token()?;
        if let Err(err) = self
            .api
            .update_task(task_id, &TaskPatch::move_to(target), &token)
            .await
        {
            return Err(self.fail("failed to move task", err));
        }

        let relocated = match self.view.snapshot.as_mut() {
            Some(snapshot) => snapshot.relocate_task(task_id, target),
            None => Err(ClientError::validation("board was unloaded during the move")),
        };
        if let Err(err) = relocated {
            return Err(self.fail("failed to move task", err));
        }

        info!(
            task_id = task_id.0,
            from = source.0,
            to = target.0,
            "sync: task moved"
        );
        self.notifier.notify(NoticeKind::Success, "Task moved");
        Ok(MoveOutcome::Moved {
            task_id,
            from: source,
            to: target,
        })
    }

    pub async fn move_task(&mut self, task_id: TaskId, target: ColumnId) -> ClientResult<MoveOutcome> {
        self.start_drag(task_id)?;
        self.drop_on_column(Some(target)).await
    }

    pub async fn search_tasks(&mut self, query: &str) -> ClientResult<Page<Task>> {
        let token = self.require_token()?;
        match self.api.search_tasks(query, &token).await {
            Ok(page) => Ok(page),
            Err(err) => Err(self.fail("search failed", err)),
        }
    }

    fn require_token(&mut self) -> ClientResult<String> {
        match self.session.token() {
            Some(token) => Ok(token),
            None => {
                self.view = BoardView::default();
                Err(self.fail("sign in to continue", ClientError::Unauthenticated))
            }
        }
    }

    fn fail(&mut self, context: &str, err: ClientError) -> ClientError {
        let message = format!("{context}: {err}");
        warn!(status = err.status(), "sync: {message}");
        self.notifier.notify(NoticeKind::Error, &message);
        self.view.last_error = Some(message);
        err
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
