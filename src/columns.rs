//! Derived kanban columns.
//!
//! Columns own nothing: they are recomputed from the task list whenever the
//! board is drawn, so they cannot drift from it.

use crate::task::{Task, TaskStatus};

#[derive(Debug, Clone, PartialEq)]
pub struct Column<'a> {
    pub status: TaskStatus,
    pub tasks: Vec<&'a Task>,
}

impl<'a> Column<'a> {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn position_of(&self, task_id: &str) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == task_id)
    }
}

/// Partitions `tasks` into one column per status, in the order given.
///
/// Duplicate statuses are collapsed to their first occurrence. Within a column
/// tasks keep their order from `tasks`. Passing [`TaskStatus::ALL`] yields a
/// total, disjoint cover of the list.
pub fn derive_columns<'a>(tasks: &'a [Task], statuses: &[TaskStatus]) -> Vec<Column<'a>> {
    let mut columns: Vec<Column<'a>> = Vec::with_capacity(statuses.len());
    for &status in statuses {
        if columns.iter().any(|c| c.status == status) {
            continue;
        }
        columns.push(Column {
            status,
            tasks: tasks.iter().filter(|t| t.status == status).collect(),
        });
    }
    columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::fallback_tasks;

    fn ids<'a>(column: &Column<'a>) -> Vec<&'a str> {
        column.tasks.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn every_task_lands_in_exactly_one_matching_column() {
        let tasks = fallback_tasks();
        let columns = derive_columns(&tasks, &TaskStatus::ALL);

        for task in &tasks {
            let holders: Vec<_> = columns
                .iter()
                .filter(|c| c.tasks.iter().any(|t| t.id == task.id))
                .collect();
            assert_eq!(holders.len(), 1, "task {} in {} columns", task.id, holders.len());
            assert_eq!(holders[0].status, task.status);
        }
        let total: usize = columns.iter().map(Column::len).sum();
        assert_eq!(total, tasks.len());
    }

    #[test]
    fn list_order_is_kept_within_a_column() {
        let tasks = fallback_tasks();
        let columns = derive_columns(&tasks, &TaskStatus::ALL);
        assert_eq!(ids(&columns[0]), vec!["task-1", "task-2"]);
        assert_eq!(ids(&columns[1]), vec!["task-3"]);
        assert_eq!(ids(&columns[2]), vec!["task-4"]);
        assert_eq!(columns[0].position_of("task-2"), Some(1));
    }

    #[test]
    fn derivation_is_idempotent_and_leaves_input_alone() {
        let tasks = fallback_tasks();
        let before = tasks.clone();
        let first = derive_columns(&tasks, &TaskStatus::ALL);
        let second = derive_columns(&tasks, &TaskStatus::ALL);
        assert_eq!(first, second);
        assert_eq!(tasks, before);
    }

    #[test]
    fn status_order_is_respected_and_duplicates_collapse() {
        let tasks = fallback_tasks();
        let columns = derive_columns(
            &tasks,
            &[TaskStatus::Done, TaskStatus::Todo, TaskStatus::Done],
        );
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].status, TaskStatus::Done);
        assert_eq!(columns[1].status, TaskStatus::Todo);
    }

    #[test]
    fn empty_list_gives_empty_columns() {
        let columns = derive_columns(&[], &TaskStatus::ALL);
        assert_eq!(columns.len(), 3);
        assert!(columns.iter().all(Column::is_empty));
    }
}
