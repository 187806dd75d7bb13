use shared::domain::{BoardId, Column, ColumnId, Positioned, Task, TaskId};

use crate::error::{ClientError, ClientResult};

/// Stable ascending sort by `position`; entities without a position sort as
/// 0 and ties keep the order the server returned them in.
pub fn sort_by_position<T: Positioned>(items: &mut [T]) {
    items.sort_by_key(T::sort_position);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnView {
    pub column: Column,
    pub tasks: Vec<Task>,
}

impl ColumnView {
    pub fn id(&self) -> ColumnId {
        self.column.id
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardSnapshot {
    pub board_id: BoardId,
    pub columns: Vec<ColumnView>,
}

impl BoardSnapshot {
    pub fn assemble(board_id: BoardId, columns: Vec<(Column, Vec<Task>)>) -> Self {
        let mut columns: Vec<ColumnView> = columns
            .into_iter()
            .map(|(column, mut tasks)| {
                sort_by_position(&mut tasks);
                ColumnView { column, tasks }
            })
            .collect();
        columns.sort_by_key(|view| view.column.sort_position());
        Self { board_id, columns }
    }

    pub fn column(&self, column_id: ColumnId) -> Option<&ColumnView> {
        self.columns.iter().find(|view| view.id() == column_id)
    }

    pub fn contains_column(&self, column_id: ColumnId) -> bool {
        self.column(column_id).is_some()
    }

    pub fn find_task(&self, task_id: TaskId) -> Option<&Task> {
        self.columns
            .iter()
            .flat_map(|view| view.tasks.iter())
            .find(|task| task.id == task_id)
    }

    pub fn column_of(&self, task_id: TaskId) -> Option<ColumnId> {
        self.columns
            .iter()
            .find(|view| view.tasks.iter().any(|task| task.id == task_id))
            .map(ColumnView::id)
    }

    pub fn task_count(&self) -> usize {
        self.columns.iter().map(ColumnView::task_count).sum()
    }

    /// Moves a task to the end of `target`'s list and rewrites its
    /// `column_id`. Returns the column it came from.
    pub fn relocate_task(&mut self, task_id: TaskId, target: ColumnId) -> ClientResult<ColumnId> {
        let target_idx = self
            .columns
            .iter()
            .position(|view| view.id() == target)
            .ok_or_else(|| ClientError::validation(format!("column {target} is not on this board")))?;

        let (source_idx, task_idx) = self
            .columns
            .iter()
            .enumerate()
            .find_map(|(col_idx, view)| {
                view.tasks
                    .iter()
                    .position(|task| task.id == task_id)
                    .map(|task_idx| (col_idx, task_idx))
            })
            .ok_or_else(|| ClientError::validation(format!("task {task_id} is not on this board")))?;

        let source = self.columns[source_idx].id();
        if source_idx == target_idx {
            return Ok(source);
        }

        let mut task = self.columns[source_idx].tasks.remove(task_idx);
        task.column_id = target;
        self.columns[target_idx].tasks.push(task);
        Ok(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::domain::Priority;

    fn column(id: i64, position: Option<i64>) -> Column {
        Column {
            id: ColumnId(id),
            board_id: BoardId(1),
            name: format!("col-{id}"),
            position,
        }
    }

    fn task(id: i64, column_id: i64, position: Option<i64>) -> Task {
        Task {
            id: TaskId(id),
            column_id: ColumnId(column_id),
            title: format!("task-{id}"),
            description: None,
            priority: Priority::Medium,
            position,
            assignee_id: None,
            created_at: None,
        }
    }

    fn ids(view: &ColumnView) -> Vec<i64> {
        view.tasks.iter().map(|t| t.id.0).collect()
    }

    #[test]
    fn assemble_orders_columns_and_tasks_by_position() {
        let snapshot = BoardSnapshot::assemble(
            BoardId(1),
            vec![
                (column(10, Some(2)), vec![task(1, 10, Some(3)), task(2, 10, Some(1))]),
                (column(11, Some(0)), vec![]),
                (column(12, Some(1)), vec![task(3, 12, Some(0))]),
            ],
        );
        let order: Vec<i64> = snapshot.columns.iter().map(|c| c.id().0).collect();
        assert_eq!(order, vec![11, 12, 10]);
        assert_eq!(ids(&snapshot.columns[2]), vec![2, 1]);
    }

    #[test]
    fn ties_and_missing_positions_keep_server_order() {
        let snapshot = BoardSnapshot::assemble(
            BoardId(1),
            vec![
                (column(20, None), vec![]),
                (column(21, Some(0)), vec![]),
                (column(22, Some(-1)), vec![]),
                (
                    column(23, None),
                    vec![
                        task(7, 23, Some(1)),
                        task(5, 23, None),
                        task(6, 23, Some(0)),
                        task(4, 23, Some(1)),
                    ],
                ),
            ],
        );
        let order: Vec<i64> = snapshot.columns.iter().map(|c| c.id().0).collect();
        assert_eq!(order, vec![22, 20, 21, 23]);
        assert_eq!(ids(snapshot.column(ColumnId(23)).expect("col")), vec![5, 6, 7, 4]);
    }

    #[test]
    fn relocate_moves_task_to_end_of_target() {
        let mut snapshot = BoardSnapshot::assemble(
            BoardId(1),
            vec![
                (column(1, Some(0)), vec![task(1, 1, Some(0)), task(2, 1, Some(1))]),
                (column(2, Some(1)), vec![task(3, 2, Some(0))]),
            ],
        );

        let source = snapshot.relocate_task(TaskId(1), ColumnId(2)).expect("relocate");

        assert_eq!(source, ColumnId(1));
        assert_eq!(ids(&snapshot.columns[0]), vec![2]);
        assert_eq!(ids(&snapshot.columns[1]), vec![3, 1]);
        assert_eq!(
            snapshot.find_task(TaskId(1)).map(|t| t.column_id),
            Some(ColumnId(2))
        );
        assert_eq!(snapshot.column_of(TaskId(1)), Some(ColumnId(2)));
        assert_eq!(snapshot.task_count(), 3);
    }

    #[test]
    fn relocate_rejects_unknown_target_without_mutating() {
        let mut snapshot = BoardSnapshot::assemble(
            BoardId(1),
            vec![(column(1, Some(0)), vec![task(1, 1, None)])],
        );
        let before = snapshot.clone();

        let err = snapshot
            .relocate_task(TaskId(1), ColumnId(99))
            .expect_err("unknown column");

        assert!(err.is_validation());
        assert_eq!(snapshot, before);
    }
}
