//! Drag gesture state: which card is held and which column is under it.

use crate::task::Status;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragState {
    pub task_id: String,
    pub origin: Status,
    /// Column under the pointer, if any.
    pub hover: Option<Status>,
}

/// What a finished gesture should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropIntent {
    pub task_id: String,
    pub target: Option<Status>,
}

impl DragState {
    pub fn pick_up(task_id: impl Into<String>, origin: Status) -> Self {
        Self {
            task_id: task_id.into(),
            origin,
            hover: Some(origin),
        }
    }

    pub fn hover(&mut self, target: Option<Status>) {
        self.hover = target;
    }

    /// Step the hover column left or right, staying on the board.
    pub fn step(&mut self, delta: isize) {
        let from = self.hover.unwrap_or(self.origin).index() as isize;
        let last = Status::ALL.len() as isize - 1;
        self.hover = Status::from_index((from + delta).clamp(0, last) as usize);
    }

    /// Release over whatever column is hovered.
    pub fn release(self) -> DropIntent {
        DropIntent {
            task_id: self.task_id,
            target: self.hover,
        }
    }

    /// Abandon the gesture; the drop carries no target.
    pub fn cancel(self) -> DropIntent {
        DropIntent {
            task_id: self.task_id,
            target: None,
        }
    }
}
