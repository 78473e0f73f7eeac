use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::ACCEPT;
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::RemoteApi;
use crate::error::{ApiError, ConfigError};
use crate::integrations::{DisconnectReply, IntegrationStatus, Service};
use crate::session::SessionStore;
use crate::task::{NewTask, NewUser, Project, Task, TaskFilters, TaskStatus, TaskUpdate, User, UserUpdate};

pub const TENANT_HEADER: &str = "X-Tenant-Slug";

/// Blocking REST client for the dashboard backend.
///
/// Each request carries the tenant header and, when logged in, the bearer
/// token. A 401 outside the auth endpoints clears the shared session.
pub struct HttpApi {
    client: Client,
    base: Url,
    tenant: String,
    session: Arc<SessionStore>,
}

impl HttpApi {
    pub fn new(
        base_url: &str,
        tenant: impl Into<String>,
        timeout: Duration,
        session: Arc<SessionStore>,
    ) -> Result<Self, ConfigError> {
        let bad_url = || ConfigError::Value {
            name: "api_base_url",
            value: base_url.to_string(),
        };
        let base = Url::parse(base_url).map_err(|_| bad_url())?;
        if base.cannot_be_a_base() {
            return Err(bad_url());
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|_| bad_url())?;
        Ok(Self {
            client,
            base,
            tenant: tenant.into(),
            session,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let request = self
            .client
            .request(method, url)
            .header(TENANT_HEADER, &self.tenant)
            .header(ACCEPT, "application/json");
        match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn execute(
        &self,
        method: Method,
        url: Url,
        build: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> Result<Response, ApiError> {
        let path = url.path().to_string();
        let started = Instant::now();
        let response = build(self.request(method.clone(), url))
            .send()
            .map_err(|source| ApiError::Transport {
                path: path.clone(),
                source,
            })?;
        let status = response.status();
        tracing::debug!(
            method = %method,
            path = %path,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "api call"
        );

        if status == StatusCode::UNAUTHORIZED && !is_auth_path(&path) {
            tracing::warn!(path = %path, "backend rejected credentials, clearing session");
            self.session.clear();
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ApiError::Status {
                method: method.to_string(),
                path,
                status: status.as_u16(),
                message: error_message(&body),
            });
        }
        Ok(response)
    }

    fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let response = self.execute(Method::GET, url, |r| r)?;
        decode(response)
    }

    /// GET that maps a 404 to `None`.
    fn get_optional<T: DeserializeOwned>(&self, url: Url) -> Result<Option<T>, ApiError> {
        match self.get(url) {
            Ok(value) => Ok(Some(value)),
            Err(ApiError::Status { status: 404, .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

fn is_auth_path(path: &str) -> bool {
    path.contains("/auth/") || path.contains("/login")
}

/// Prefers the `message`/`error` field of a JSON error body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("error"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.chars().take(200).collect())
}

fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let path = response.url().path().to_string();
    let body = response.text().map_err(|source| ApiError::Transport {
        path: path.clone(),
        source,
    })?;
    serde_json::from_str(&body).map_err(|err| ApiError::Decode {
        path,
        message: err.to_string(),
    })
}

/// Decodes an echoed task if the body is one; anything else is `None`.
fn decode_echo(response: Response) -> Option<Task> {
    let body = response.text().ok()?;
    serde_json::from_str(&body).ok()
}

impl RemoteApi for HttpApi {
    fn list_tasks(&self, filters: &TaskFilters) -> Result<Vec<Task>, ApiError> {
        let mut url = self.endpoint(&["api", "tasks"]);
        if !filters.is_empty() {
            url.query_pairs_mut().extend_pairs(filters.query_pairs());
        }
        let tasks: Vec<Task> = self.get(url)?;
        tracing::debug!(count = tasks.len(), "tasks fetched");
        Ok(tasks)
    }

    fn get_task(&self, id: &str) -> Result<Option<Task>, ApiError> {
        self.get_optional(self.endpoint(&["api", "tasks", id]))
    }

    fn update_task_status(&self, id: &str, status: TaskStatus) -> Result<Option<Task>, ApiError> {
        let url = self.endpoint(&["api", "tasks", id, "status"]);
        let response = self.execute(Method::PATCH, url, |r| r.json(&json!({ "status": status })))?;
        Ok(decode_echo(response))
    }

    fn assign_task(&self, id: &str, assignee_id: &str) -> Result<Option<Task>, ApiError> {
        let url = self.endpoint(&["api", "tasks", id, "assign"]);
        let response = self.execute(Method::PATCH, url, |r| {
            r.json(&json!({ "assigneeId": assignee_id }))
        })?;
        Ok(decode_echo(response))
    }

    fn create_task(&self, task: &NewTask) -> Result<Task, ApiError> {
        let url = self.endpoint(&["api", "tasks"]);
        decode(self.execute(Method::POST, url, |r| r.json(task))?)
    }

    fn update_task(&self, id: &str, update: &TaskUpdate) -> Result<Task, ApiError> {
        let url = self.endpoint(&["api", "tasks", id]);
        decode(self.execute(Method::PATCH, url, |r| r.json(update))?)
    }

    fn delete_task(&self, id: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&["api", "tasks", id]);
        self.execute(Method::DELETE, url, |r| r)?;
        Ok(())
    }

    fn list_projects(&self) -> Result<Vec<Project>, ApiError> {
        self.get(self.endpoint(&["api", "projects"]))
    }

    fn get_project(&self, id: &str) -> Result<Option<Project>, ApiError> {
        self.get_optional(self.endpoint(&["api", "projects", id]))
    }

    fn list_users(&self) -> Result<Vec<User>, ApiError> {
        let mut url = self.endpoint(&["test", "users"]);
        if let Some(tenant_id) = self.session.claims().and_then(|c| c.tenant_id) {
            url.query_pairs_mut().append_pair("tenantId", &tenant_id);
        }
        self.get(url)
    }

    fn current_user(&self) -> Result<Option<User>, ApiError> {
        self.get_optional(self.endpoint(&["api", "users", "me"]))
    }

    fn create_user(&self, user: &NewUser) -> Result<User, ApiError> {
        let url = self.endpoint(&["api", "users"]);
        decode(self.execute(Method::POST, url, |r| r.json(user))?)
    }

    fn update_user(&self, id: &str, update: &UserUpdate) -> Result<User, ApiError> {
        let url = self.endpoint(&["api", "users", id]);
        decode(self.execute(Method::PATCH, url, |r| r.json(update))?)
    }

    fn delete_user(&self, id: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&["api", "users", id]);
        self.execute(Method::DELETE, url, |r| r)?;
        Ok(())
    }

    fn integration_status(&self) -> Result<IntegrationStatus, ApiError> {
        self.get(self.endpoint(&["api", "integrations", "status"]))
    }

    fn disconnect_integration(&self, service: Service) -> Result<String, ApiError> {
        let url = self.endpoint(&["api", "integrations", service.as_str()]);
        let response = self.execute(Method::DELETE, url, |r| r)?;
        let reply: DisconnectReply = response
            .text()
            .ok()
            .and_then(|body| serde_json::from_str(&body).ok())
            .unwrap_or_default();
        Ok(reply
            .message
            .unwrap_or_else(|| format!("{service} disconnected")))
    }
}
