use shared::domain::TaskId;
use tracing::warn;

/// The task currently being dragged, if any. One at a time: starting a new
/// drag replaces the pending one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DragContext {
    dragged: Option<TaskId>,
}

impl DragContext {
    pub fn start(&mut self, task_id: TaskId) -> Option<TaskId> {
        let previous = self.dragged.replace(task_id);
        if let Some(previous) = previous.filter(|p| *p != task_id) {
            warn!(
                previous = previous.0,
                task_id = task_id.0,
                "drag: replacing pending drag before drop"
            );
        }
        previous
    }

    pub fn current(&self) -> Option<TaskId> {
        self.dragged
    }

    pub fn take(&mut self) -> Option<TaskId> {
        self.dragged.take()
    }

    pub fn clear(&mut self) {
        self.dragged = None;
    }
}
