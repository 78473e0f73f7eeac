//! The remote collaborator: everything the board reads from or writes to the
//! dashboard backend.

mod http;
mod local;

pub use http::HttpApi;
pub use local::LocalApi;

use crate::error::ApiError;
use crate::integrations::{IntegrationStatus, Service};
use crate::task::{NewTask, NewUser, Project, Task, TaskFilters, TaskStatus, TaskUpdate, User, UserUpdate};

/// Backend operations. Every method reports failure; whether a failed read
/// degrades to a fallback is decided by [`crate::store::TaskStore`].
pub trait RemoteApi {
    fn list_tasks(&self, filters: &TaskFilters) -> Result<Vec<Task>, ApiError>;
    fn get_task(&self, id: &str) -> Result<Option<Task>, ApiError>;

    /// Returns the updated task when the server echoes it back.
    fn update_task_status(&self, id: &str, status: TaskStatus) -> Result<Option<Task>, ApiError>;
    fn assign_task(&self, id: &str, assignee_id: &str) -> Result<Option<Task>, ApiError>;
    fn create_task(&self, task: &NewTask) -> Result<Task, ApiError>;
    fn update_task(&self, id: &str, update: &TaskUpdate) -> Result<Task, ApiError>;
    fn delete_task(&self, id: &str) -> Result<(), ApiError>;

    fn list_projects(&self) -> Result<Vec<Project>, ApiError>;
    fn get_project(&self, id: &str) -> Result<Option<Project>, ApiError>;

    fn list_users(&self) -> Result<Vec<User>, ApiError>;
    fn current_user(&self) -> Result<Option<User>, ApiError>;
    fn create_user(&self, user: &NewUser) -> Result<User, ApiError>;
    fn update_user(&self, id: &str, update: &UserUpdate) -> Result<User, ApiError>;
    fn delete_user(&self, id: &str) -> Result<(), ApiError>;

    fn integration_status(&self) -> Result<IntegrationStatus, ApiError>;
    /// Returns the server's confirmation message.
    fn disconnect_integration(&self, service: Service) -> Result<String, ApiError>;
}
