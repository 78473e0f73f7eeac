//! Task store: the read and write paths to the backend.
//!
//! Reads may degrade to a fallback dataset depending on [`ReadPolicy`];
//! writes always report failure to the caller, which keeps its prior state.

use serde::{Deserialize, Serialize};

use crate::api::RemoteApi;
use crate::error::ApiError;
use crate::integrations::{IntegrationStatus, Service};
use crate::task::{
    NewTask, NewUser, Project, Task, TaskFilters, TaskStatus, TaskUpdate, User, UserUpdate,
};

/// What a failed read does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadPolicy {
    /// Substitute the fallback dataset and keep going.
    #[default]
    Fallback,
    /// Hand the error to the caller.
    Propagate,
}

impl ReadPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fallback" => Some(Self::Fallback),
            "propagate" => Some(Self::Propagate),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Remote,
    Fallback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub tasks: Vec<Task>,
    pub source: Source,
}

pub struct TaskStore {
    api: Box<dyn RemoteApi>,
    read_policy: ReadPolicy,
    fallback: Vec<Task>,
}

impl TaskStore {
    pub fn new(api: Box<dyn RemoteApi>, read_policy: ReadPolicy, fallback: Vec<Task>) -> Self {
        Self {
            api,
            read_policy,
            fallback,
        }
    }

    /// Runs a read under the configured policy. A rejected session is always
    /// reported so the caller can send the user to login.
    fn read<T>(
        &self,
        what: &'static str,
        result: Result<T, ApiError>,
        fallback: impl FnOnce() -> T,
    ) -> Result<(T, Source), ApiError> {
        match result {
            Ok(value) => Ok((value, Source::Remote)),
            Err(err) if err.is_unauthorized() => Err(err),
            Err(err) => match self.read_policy {
                ReadPolicy::Propagate => Err(err),
                ReadPolicy::Fallback => {
                    tracing::warn!(what, error = %err, "read failed, using fallback data");
                    Ok((fallback(), Source::Fallback))
                }
            },
        }
    }

    pub fn list(&self, filters: &TaskFilters) -> Result<Listing, ApiError> {
        let (tasks, source) = self.read("tasks", self.api.list_tasks(filters), || {
            self.fallback
                .iter()
                .filter(|t| filters.matches(t))
                .cloned()
                .collect()
        })?;
        Ok(Listing { tasks, source })
    }

    pub fn get(&self, id: &str) -> Result<Option<Task>, ApiError> {
        self.read("task", self.api.get_task(id), || None)
            .map(|(task, _)| task)
    }

    pub fn update_status(&self, id: &str, status: TaskStatus) -> Result<Option<Task>, ApiError> {
        tracing::info!(task_id = id, %status, "updating task status");
        self.api.update_task_status(id, status).inspect_err(|err| {
            tracing::error!(task_id = id, error = %err, "status update failed");
        })
    }

    pub fn assign(&self, id: &str, assignee_id: &str) -> Result<Option<Task>, ApiError> {
        self.api.assign_task(id, assignee_id).inspect_err(|err| {
            tracing::error!(task_id = id, error = %err, "assignment failed");
        })
    }

    pub fn create(&self, task: &NewTask) -> Result<Task, ApiError> {
        let created = self.api.create_task(task).inspect_err(|err| {
            tracing::error!(error = %err, "task creation failed");
        })?;
        tracing::info!(task_id = %created.id, "task created");
        Ok(created)
    }

    pub fn update(&self, id: &str, update: &TaskUpdate) -> Result<Task, ApiError> {
        self.api.update_task(id, update).inspect_err(|err| {
            tracing::error!(task_id = id, error = %err, "task update failed");
        })
    }

    pub fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.api.delete_task(id).inspect_err(|err| {
            tracing::error!(task_id = id, error = %err, "task deletion failed");
        })?;
        tracing::info!(task_id = id, "task deleted");
        Ok(())
    }

    pub fn projects(&self) -> Result<Vec<Project>, ApiError> {
        self.read("projects", self.api.list_projects(), Vec::new)
            .map(|(projects, _)| projects)
    }

    pub fn project(&self, id: &str) -> Result<Option<Project>, ApiError> {
        self.read("project", self.api.get_project(id), || None)
            .map(|(project, _)| project)
    }

    pub fn users(&self) -> Result<Vec<User>, ApiError> {
        self.read("users", self.api.list_users(), Vec::new)
            .map(|(users, _)| users)
    }

    pub fn current_user(&self) -> Result<Option<User>, ApiError> {
        self.read("current user", self.api.current_user(), || None)
            .map(|(user, _)| user)
    }

    pub fn create_user(&self, user: &NewUser) -> Result<User, ApiError> {
        let created = self.api.create_user(user).inspect_err(|err| {
            tracing::error!(error = %err, "user creation failed");
        })?;
        tracing::info!(user_id = %created.id, "user created");
        Ok(created)
    }

    pub fn update_user(&self, id: &str, update: &UserUpdate) -> Result<User, ApiError> {
        self.api.update_user(id, update).inspect_err(|err| {
            tracing::error!(user_id = id, error = %err, "user update failed");
        })
    }

    pub fn delete_user(&self, id: &str) -> Result<(), ApiError> {
        self.api.delete_user(id).inspect_err(|err| {
            tracing::error!(user_id = id, error = %err, "user deletion failed");
        })?;
        tracing::info!(user_id = id, "user deleted");
        Ok(())
    }

    pub fn integration_status(&self) -> Result<IntegrationStatus, ApiError> {
        self.read(
            "integration status",
            self.api.integration_status(),
            IntegrationStatus::default,
        )
        .map(|(status, _)| status)
    }

    pub fn disconnect(&self, service: Service) -> Result<String, ApiError> {
        self.api.disconnect_integration(service).inspect_err(|err| {
            tracing::error!(%service, error = %err, "disconnect failed");
        })
    }
}
