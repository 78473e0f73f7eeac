//! Pointer drag interaction over the board.
//!
//! The machine only tracks intent. Applying a drop (status change, local
//! reposition) is up to [`crate::kanban_board::KanbanBoard::apply_drop`].

use ratatui::layout::Rect;

use crate::task::TaskStatus;

/// Where a dragged card started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub status: TaskStatus,
    pub index: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        task_id: String,
        origin: Slot,
    },
    Hovering {
        task_id: String,
        origin: Slot,
        column: TaskStatus,
        insert_index: usize,
    },
}

/// Resolved target of a completed drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropOutcome {
    pub task_id: String,
    pub origin: Slot,
    pub target: TaskStatus,
    pub insert_index: usize,
}

impl DropOutcome {
    /// The status to send to the server, if the card changed columns.
    pub fn status_change(&self) -> Option<TaskStatus> {
        (self.target != self.origin.status).then_some(self.target)
    }
}

impl DragState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn task_id(&self) -> Option<&str> {
        match self {
            Self::Idle => None,
            Self::Dragging { task_id, .. } | Self::Hovering { task_id, .. } => Some(task_id),
        }
    }

    /// Column and insertion index currently targeted, for drawing the placeholder.
    pub fn target(&self) -> Option<(TaskStatus, usize)> {
        match self {
            Self::Hovering {
                column, insert_index, ..
            } => Some((*column, *insert_index)),
            _ => None,
        }
    }

    pub fn start(&mut self, task_id: impl Into<String>, origin: Slot) {
        let task_id = task_id.into();
        tracing::debug!(%task_id, status = %origin.status, index = origin.index, "drag start");
        *self = Self::Dragging { task_id, origin };
    }

    /// Pointer is over a column's empty area: insert at the end of it.
    pub fn over_column(&mut self, column: TaskStatus, column_len: usize) {
        self.hover(column, column_len);
    }

    /// Pointer is over the card at `index` in `column`, drawn at `rect`.
    ///
    /// Above the card's vertical midpoint inserts before it, otherwise after it.
    /// Hovering the dragged card itself keeps the previous target.
    pub fn over_task(
        &mut self,
        column: TaskStatus,
        index: usize,
        hovered_task_id: &str,
        rect: Rect,
        pointer_y: u16,
    ) {
        if self.task_id() == Some(hovered_task_id) {
            return;
        }
        self.hover(column, insertion_index(index, rect, pointer_y));
    }

    /// Pointer left every column: drop the target but keep dragging.
    pub fn leave(&mut self) {
        *self = match std::mem::take(self) {
            Self::Hovering { task_id, origin, .. } => Self::Dragging { task_id, origin },
            other => other,
        };
    }

    fn hover(&mut self, column: TaskStatus, insert_index: usize) {
        let (task_id, origin) = match std::mem::take(self) {
            Self::Idle => return,
            Self::Dragging { task_id, origin } | Self::Hovering { task_id, origin, .. } => {
                (task_id, origin)
            }
        };
        *self = Self::Hovering {
            task_id,
            origin,
            column,
            insert_index,
        };
    }

    /// Ends the drag on pointer release. Returns the resolved target when a
    /// column was hovered.
    pub fn release(&mut self) -> Option<DropOutcome> {
        match std::mem::take(self) {
            Self::Hovering {
                task_id,
                origin,
                column,
                insert_index,
            } => {
                tracing::debug!(%task_id, target = %column, insert_index, "drop");
                Some(DropOutcome {
                    task_id,
                    origin,
                    target: column,
                    insert_index,
                })
            }
            Self::Dragging { task_id, .. } => {
                tracing::debug!(%task_id, "drop outside any column");
                None
            }
            Self::Idle => None,
        }
    }

    pub fn cancel(&mut self) {
        if let Some(task_id) = self.task_id() {
            tracing::debug!(%task_id, "drag cancelled");
        }
        *self = Self::Idle;
    }
}

/// Midpoint rule. Compared in doubled units so odd heights stay exact.
pub fn insertion_index(index: usize, rect: Rect, pointer_y: u16) -> usize {
    let pointer = u32::from(pointer_y) * 2;
    let midpoint = u32::from(rect.y) * 2 + u32::from(rect.height);
    if pointer < midpoint {
        index
    } else {
        index + 1
    }
}
