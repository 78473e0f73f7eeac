use std::collections::HashMap;

use crate::columns::{derive_columns, Column};
use crate::drag::{DragState, DropOutcome, Slot};
use crate::error::ApiError;
use crate::store::{Listing, Source, TaskStore};
use crate::task::{NewTask, Task, TaskFilters, TaskStatus, TaskUpdate};

/// A status change applied locally and waiting for the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingChange {
    pub task_id: String,
    pub revision: u64,
    pub previous: TaskStatus,
    pub status: TaskStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InFlight {
    revision: u64,
    status: TaskStatus,
    rollback_to: TaskStatus,
}

/// The board's single source of truth: one task list, with columns derived
/// from it on demand.
#[derive(Debug)]
pub struct KanbanBoard {
    pub tasks: Vec<Task>,
    pub selected_status: usize, // Index into TaskStatus::ALL
    pub selected_task: usize,   // Index within the selected column
    pub drag: DragState,
    source: Source,
    in_flight: HashMap<String, InFlight>,
    next_revision: u64,
}

impl Default for KanbanBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl KanbanBoard {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            selected_status: 0,
            selected_task: 0,
            drag: DragState::Idle,
            source: Source::Remote,
            in_flight: HashMap::new(),
            next_revision: 1,
        }
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn columns(&self) -> Vec<Column<'_>> {
        derive_columns(&self.tasks, &TaskStatus::ALL)
    }

    pub fn tasks_by_status(&self, status: TaskStatus) -> Vec<&Task> {
        self.tasks.iter().filter(|t| t.status == status).collect()
    }

    pub fn find(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn has_pending(&self, id: &str) -> bool {
        self.in_flight.contains_key(id)
    }

    /// Replaces the list with a fresh fetch. Changes still in flight are
    /// re-applied on top so a refetch never visually reverts them.
    pub fn replace_tasks(&mut self, listing: Listing) {
        self.tasks = listing.tasks;
        self.source = listing.source;
        for task in &mut self.tasks {
            if let Some(flight) = self.in_flight.get(&task.id) {
                task.status = flight.status;
            }
        }
        self.clamp_selection();
        tracing::debug!(count = self.tasks.len(), source = ?self.source, "board refreshed");
    }

    pub fn refresh(&mut self, store: &TaskStore, filters: &TaskFilters) -> Result<(), ApiError> {
        let listing = store.list(filters)?;
        self.replace_tasks(listing);
        Ok(())
    }

    /// Inserts or replaces a task by id, e.g. from a realtime push.
    pub fn upsert(&mut self, mut task: Task) {
        if let Some(flight) = self.in_flight.get(&task.id) {
            task.status = flight.status;
        }
        match self.tasks.iter_mut().find(|t| t.id == task.id) {
            Some(slot) => *slot = task,
            None => self.tasks.push(task),
        }
    }

    /// Applies a status change locally. `None` when the task is unknown or
    /// already has that status.
    pub fn begin_status_change(&mut self, id: &str, status: TaskStatus) -> Option<PendingChange> {
        let task = self.tasks.iter_mut().find(|t| t.id == id)?;
        if task.status == status {
            return None;
        }
        let previous = task.status;
        task.status = status;

        let revision = self.next_revision;
        self.next_revision += 1;
        self.in_flight.insert(
            id.to_string(),
            InFlight {
                revision,
                status,
                rollback_to: previous,
            },
        );
        Some(PendingChange {
            task_id: id.to_string(),
            revision,
            previous,
            status,
        })
    }

    /// Reconciles a pending change with the server's answer.
    ///
    /// Only the newest change for a task may touch its local status. An older
    /// answer landing late is absorbed: a late success changes nothing, a late
    /// failure moves the newest change's rollback target back to what the
    /// server still holds. Answers for changes no longer tracked are left to
    /// the next refetch.
    pub fn settle(
        &mut self,
        pending: &PendingChange,
        result: Result<Option<Task>, ApiError>,
    ) -> Result<(), ApiError> {
        let Some(flight) = self.in_flight.get(&pending.task_id).copied() else {
            tracing::debug!(task_id = %pending.task_id, "settling a change that is no longer tracked");
            return result.map(|_| ());
        };
        let is_latest = flight.revision == pending.revision;

        match result {
            Ok(echo) if is_latest => {
                self.in_flight.remove(&pending.task_id);
                if let Some(task) = echo {
                    self.upsert(task);
                }
                Ok(())
            }
            Ok(_) => Ok(()),
            Err(err) if is_latest => {
                self.in_flight.remove(&pending.task_id);
                if let Some(task) = self.tasks.iter_mut().find(|t| t.id == pending.task_id) {
                    task.status = flight.rollback_to;
                }
                tracing::warn!(
                    task_id = %pending.task_id,
                    rollback_to = %flight.rollback_to,
                    "status change rolled back"
                );
                Err(err)
            }
            Err(err) => {
                if let Some(newest) = self.in_flight.get_mut(&pending.task_id) {
                    if newest.rollback_to == pending.status {
                        newest.rollback_to = pending.previous;
                    }
                }
                Err(err)
            }
        }
    }

    /// Optimistic status change against the store. Returns whether a call was made.
    pub fn change_status(
        &mut self,
        store: &TaskStore,
        id: &str,
        status: TaskStatus,
    ) -> Result<bool, ApiError> {
        let Some(pending) = self.begin_status_change(id, status) else {
            return Ok(false);
        };
        let result = store.update_status(id, status);
        self.settle(&pending, result)?;
        Ok(true)
    }

    /// Completes a drag: at most one status call, then the local reposition.
    /// The order within a column is session-local and never sent to the server.
    pub fn apply_drop(&mut self, store: &TaskStore, outcome: &DropOutcome) -> Result<(), ApiError> {
        if let Some(status) = outcome.status_change() {
            self.change_status(store, &outcome.task_id, status)?;
        }
        let mut index = outcome.insert_index;
        if outcome.target == outcome.origin.status && outcome.origin.index < index {
            index -= 1;
        }
        self.reposition(&outcome.task_id, index);
        Ok(())
    }

    /// Moves a task so it sits at `index` within its own column.
    pub fn reposition(&mut self, id: &str, index: usize) {
        let Some(from) = self.tasks.iter().position(|t| t.id == id) else {
            return;
        };
        let task = self.tasks.remove(from);
        let members: Vec<usize> = self
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.status == task.status)
            .map(|(i, _)| i)
            .collect();
        let at = match members.get(index) {
            Some(&position) => position,
            None => members.last().map_or(self.tasks.len(), |&last| last + 1),
        };
        self.tasks.insert(at, task);
    }

    /// Write path: the task only appears once the server has created it.
    pub fn add_task(&mut self, store: &TaskStore, task: &NewTask) -> Result<&Task, ApiError> {
        let created = store.create(task)?;
        self.tasks.push(created);
        Ok(&self.tasks[self.tasks.len() - 1])
    }

    pub fn edit_task(
        &mut self,
        store: &TaskStore,
        id: &str,
        update: &TaskUpdate,
    ) -> Result<(), ApiError> {
        let updated = store.update(id, update)?;
        self.upsert(updated);
        Ok(())
    }

    pub fn delete_task(&mut self, store: &TaskStore, id: &str) -> Result<(), ApiError> {
        store.delete(id)?;
        self.tasks.retain(|t| t.id != id);
        self.in_flight.remove(id);
        self.clamp_selection();
        Ok(())
    }

    pub fn selected_column(&self) -> TaskStatus {
        TaskStatus::from_index(self.selected_status).unwrap_or(TaskStatus::Todo)
    }

    pub fn selected(&self) -> Option<&Task> {
        self.tasks_by_status(self.selected_column())
            .get(self.selected_task)
            .copied()
    }

    pub fn select_left(&mut self) {
        if self.selected_status > 0 {
            self.selected_status -= 1;
            self.clamp_selection();
        }
    }

    pub fn select_right(&mut self) {
        if self.selected_status < TaskStatus::ALL.len() - 1 {
            self.selected_status += 1;
            self.clamp_selection();
        }
    }

    pub fn select_up(&mut self) {
        self.selected_task = self.selected_task.saturating_sub(1);
    }

    pub fn select_down(&mut self) {
        let max_tasks = self.tasks_by_status(self.selected_column()).len();
        if self.selected_task + 1 < max_tasks {
            self.selected_task += 1;
        }
    }

    /// Moves the selected task one column in `direction` and follows it.
    pub fn move_selected(&mut self, store: &TaskStore, direction: isize) -> Result<(), ApiError> {
        let Some(task) = self.selected() else {
            return Ok(());
        };
        let id = task.id.clone();
        let target = task.status.step(direction);
        if self.change_status(store, &id, target)? {
            self.selected_status = target.index();
            self.selected_task = self
                .tasks_by_status(target)
                .iter()
                .position(|t| t.id == id)
                .unwrap_or(0);
        }
        Ok(())
    }

    /// Origin slot of a task, for starting a drag.
    pub fn slot_of(&self, id: &str) -> Option<Slot> {
        let task = self.find(id)?;
        let index = self.tasks_by_status(task.status).iter().position(|t| t.id == id)?;
        Some(Slot {
            status: task.status,
            index,
        })
    }

    fn clamp_selection(&mut self) {
        let len = self.tasks_by_status(self.selected_column()).len();
        if self.selected_task >= len {
            self.selected_task = len.saturating_sub(1);
        }
    }
}
