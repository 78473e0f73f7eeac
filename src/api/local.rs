use parking_lot::Mutex;

use super::RemoteApi;
use crate::error::ApiError;
use crate::integrations::{IntegrationStatus, Service};
use crate::local_store::{LocalStore, StorageKey};
use crate::task::{
    fallback_tasks, NewTask, NewUser, Project, Task, TaskFilters, TaskStatus, TaskUpdate, User,
    UserUpdate,
};

/// Offline stand-in for the backend, used when the remote path is disabled.
///
/// Tasks live in the `taskManagement-tasks` slot, seeded with the demo list.
/// Projects, users and integrations are empty and read-only.
pub struct LocalApi {
    store: LocalStore,
    tasks: Mutex<Vec<Task>>,
}

impl LocalApi {
    pub fn new(store: LocalStore) -> Self {
        let tasks = store.load_or(StorageKey::TaskList, fallback_tasks);
        Self {
            store,
            tasks: Mutex::new(tasks),
        }
    }

    fn with_task<R>(&self, id: &str, change: impl FnOnce(&mut Task) -> R) -> Result<R, ApiError> {
        let mut tasks = self.tasks.lock();
        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| ApiError::TaskNotFound(id.to_string()))?;
        let out = change(task);
        self.store.save(StorageKey::TaskList, &*tasks)?;
        Ok(out)
    }
}

impl RemoteApi for LocalApi {
    fn list_tasks(&self, filters: &TaskFilters) -> Result<Vec<Task>, ApiError> {
        Ok(self
            .tasks
            .lock()
            .iter()
            .filter(|t| filters.matches(t))
            .cloned()
            .collect())
    }

    fn get_task(&self, id: &str) -> Result<Option<Task>, ApiError> {
        Ok(self.tasks.lock().iter().find(|t| t.id == id).cloned())
    }

    fn update_task_status(&self, id: &str, status: TaskStatus) -> Result<Option<Task>, ApiError> {
        self.with_task(id, |task| {
            task.status = status;
            Some(task.clone())
        })
    }

    fn assign_task(&self, id: &str, assignee_id: &str) -> Result<Option<Task>, ApiError> {
        let update = TaskUpdate {
            assignee_id: Some(assignee_id.to_string()),
            ..TaskUpdate::default()
        };
        self.with_task(id, |task| {
            update.apply_to(task);
            Some(task.clone())
        })
    }

    fn create_task(&self, task: &NewTask) -> Result<Task, ApiError> {
        let created = task.clone().into_task(format!("local-{}", uuid::Uuid::new_v4()));
        let mut tasks = self.tasks.lock();
        tasks.push(created.clone());
        self.store.save(StorageKey::TaskList, &*tasks)?;
        Ok(created)
    }

    fn update_task(&self, id: &str, update: &TaskUpdate) -> Result<Task, ApiError> {
        self.with_task(id, |task| {
            update.apply_to(task);
            task.clone()
        })
    }

    fn delete_task(&self, id: &str) -> Result<(), ApiError> {
        let mut tasks = self.tasks.lock();
        let before = tasks.len();
        tasks.retain(|t| t.id != id);
        if tasks.len() == before {
            return Err(ApiError::TaskNotFound(id.to_string()));
        }
        self.store.save(StorageKey::TaskList, &*tasks)?;
        Ok(())
    }

    fn list_projects(&self) -> Result<Vec<Project>, ApiError> {
        Ok(Vec::new())
    }

    fn get_project(&self, _id: &str) -> Result<Option<Project>, ApiError> {
        Ok(None)
    }

    fn list_users(&self) -> Result<Vec<User>, ApiError> {
        Ok(Vec::new())
    }

    fn current_user(&self) -> Result<Option<User>, ApiError> {
        Ok(None)
    }

    fn create_user(&self, _user: &NewUser) -> Result<User, ApiError> {
        Err(ApiError::Unsupported("user management"))
    }

    fn update_user(&self, id: &str, _update: &UserUpdate) -> Result<User, ApiError> {
        Err(ApiError::UserNotFound(id.to_string()))
    }

    fn delete_user(&self, id: &str) -> Result<(), ApiError> {
        Err(ApiError::UserNotFound(id.to_string()))
    }

    fn integration_status(&self) -> Result<IntegrationStatus, ApiError> {
        Ok(IntegrationStatus::default())
    }

    fn disconnect_integration(&self, _service: Service) -> Result<String, ApiError> {
        Err(ApiError::Unsupported("integrations"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn starts_from_demo_list_and_persists_writes() {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();
        let api = LocalApi::new(store.clone());
        assert_eq!(api.list_tasks(&TaskFilters::default()).unwrap(), fallback_tasks());

        api.update_task_status("task-1", TaskStatus::Done).unwrap();
        let created = api.create_task(&NewTask::titled("Write release notes")).unwrap();
        api.delete_task("task-2").unwrap();

        let reopened = LocalApi::new(store);
        let tasks = reopened.list_tasks(&TaskFilters::default()).unwrap();
        assert_eq!(tasks.len(), 4);
        assert_eq!(tasks[0].status, TaskStatus::Done);
        assert_eq!(tasks.last().unwrap().id, created.id);
        assert!(created.id.starts_with("local-"));
        assert!(reopened.get_task("task-2").unwrap().is_none());
    }

    #[test]
    fn writes_to_unknown_tasks_fail() {
        let dir = tempdir().unwrap();
        let api = LocalApi::new(LocalStore::open(dir.path()).unwrap());
        assert!(matches!(
            api.update_task_status("nope", TaskStatus::Done),
            Err(ApiError::TaskNotFound(_))
        ));
        assert!(matches!(api.delete_task("nope"), Err(ApiError::TaskNotFound(_))));
    }
}
