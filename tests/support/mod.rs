#![allow(dead_code)]

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use parking_lot::Mutex;

use taskdeck::api::RemoteApi;
use taskdeck::error::ApiError;
use taskdeck::integrations::{IntegrationStatus, Service};
use taskdeck::store::{ReadPolicy, TaskStore};
use taskdeck::task::{
    fallback_tasks, NewTask, NewUser, Project, Task, TaskFilters, TaskStatus, TaskUpdate, User,
    UserUpdate,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Unavailable,
    Unauthorized,
}

impl Failure {
    fn error(self, path: &str) -> ApiError {
        match self {
            Failure::Unavailable => ApiError::Status {
                method: "GET".to_string(),
                path: path.to_string(),
                status: 503,
                message: "service unavailable".to_string(),
            },
            Failure::Unauthorized => ApiError::Unauthorized,
        }
    }
}

#[derive(Debug, Default)]
pub struct FakeState {
    pub tasks: Vec<Task>,
    pub users: Vec<User>,
    pub calls: Vec<String>,
    pub read_failure: Option<Failure>,
    pub write_failure: Option<Failure>,
}

/// In-memory backend. Clones share state so a test can inspect calls after
/// handing one to the store.
#[derive(Debug, Clone, Default)]
pub struct FakeApi {
    pub state: Arc<Mutex<FakeState>>,
}

impl FakeApi {
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let api = Self::default();
        api.state.lock().tasks = tasks;
        api
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn status_calls(&self) -> usize {
        self.calls().iter().filter(|c| c.starts_with("update_status")).count()
    }

    pub fn fail_reads(&self, failure: Failure) {
        self.state.lock().read_failure = Some(failure);
    }

    pub fn fail_writes(&self, failure: Failure) {
        self.state.lock().write_failure = Some(failure);
    }

    pub fn heal(&self) {
        let mut state = self.state.lock();
        state.read_failure = None;
        state.write_failure = None;
    }

    fn read<T>(&self, call: &str, f: impl FnOnce(&FakeState) -> T) -> Result<T, ApiError> {
        let mut state = self.state.lock();
        state.calls.push(call.to_string());
        match state.read_failure {
            Some(failure) => Err(failure.error(call)),
            None => Ok(f(&state)),
        }
    }

    fn write<T>(
        &self,
        call: String,
        f: impl FnOnce(&mut FakeState) -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        let mut state = self.state.lock();
        let failure = state.write_failure;
        state.calls.push(call.clone());
        match failure {
            Some(failure) => Err(failure.error(&call)),
            None => f(&mut state),
        }
    }
}

fn find<'a>(state: &'a mut FakeState, id: &str) -> Result<&'a mut Task, ApiError> {
    state
        .tasks
        .iter_mut()
        .find(|t| t.id == id)
        .ok_or_else(|| ApiError::TaskNotFound(id.to_string()))
}

impl RemoteApi for FakeApi {
    fn list_tasks(&self, filters: &TaskFilters) -> Result<Vec<Task>, ApiError> {
        self.read("list_tasks", |s| {
            s.tasks.iter().filter(|t| filters.matches(t)).cloned().collect()
        })
    }

    fn get_task(&self, id: &str) -> Result<Option<Task>, ApiError> {
        self.read("get_task", |s| s.tasks.iter().find(|t| t.id == id).cloned())
    }

    fn update_task_status(&self, id: &str, status: TaskStatus) -> Result<Option<Task>, ApiError> {
        self.write(format!("update_status {id} {status}"), |s| {
            let task = find(s, id)?;
            task.status = status;
            Ok(Some(task.clone()))
        })
    }

    fn assign_task(&self, id: &str, assignee_id: &str) -> Result<Option<Task>, ApiError> {
        self.write(format!("assign {id} {assignee_id}"), |s| {
            let update = TaskUpdate {
                assignee_id: Some(assignee_id.to_string()),
                ..TaskUpdate::default()
            };
            let task = find(s, id)?;
            update.apply_to(task);
            Ok(Some(task.clone()))
        })
    }

    fn create_task(&self, task: &NewTask) -> Result<Task, ApiError> {
        self.write(format!("create {}", task.title), |s| {
            let created = task.clone().into_task(format!("srv-{}", s.tasks.len() + 1));
            s.tasks.push(created.clone());
            Ok(created)
        })
    }

    fn update_task(&self, id: &str, update: &TaskUpdate) -> Result<Task, ApiError> {
        self.write(format!("update {id}"), |s| {
            let task = find(s, id)?;
            update.apply_to(task);
            Ok(task.clone())
        })
    }

    fn delete_task(&self, id: &str) -> Result<(), ApiError> {
        self.write(format!("delete {id}"), |s| {
            find(s, id)?;
            s.tasks.retain(|t| t.id != id);
            Ok(())
        })
    }

    fn list_projects(&self) -> Result<Vec<Project>, ApiError> {
        self.read("list_projects", |_| Vec::new())
    }

    fn get_project(&self, _id: &str) -> Result<Option<Project>, ApiError> {
        self.read("get_project", |_| None)
    }

    fn list_users(&self) -> Result<Vec<User>, ApiError> {
        self.read("list_users", |s| s.users.clone())
    }

    fn current_user(&self) -> Result<Option<User>, ApiError> {
        self.read("current_user", |s| s.users.first().cloned())
    }

    fn create_user(&self, user: &NewUser) -> Result<User, ApiError> {
        self.write(format!("create_user {}", user.name), |s| {
            let created = User {
                id: format!("u{}", s.users.len() + 1),
                name: user.name.clone(),
                email: user.email.clone(),
                role: user.role.unwrap_or_default(),
                skills: user.skills.clone(),
                available_hours: user.available_hours,
                experience_level: user.experience_level.clone(),
            };
            s.users.push(created.clone());
            Ok(created)
        })
    }

    fn update_user(&self, id: &str, update: &UserUpdate) -> Result<User, ApiError> {
        self.write(format!("update_user {id}"), |s| {
            let user = s
                .users
                .iter_mut()
                .find(|u| u.id == id)
                .ok_or_else(|| ApiError::UserNotFound(id.to_string()))?;
            if let Some(name) = &update.name {
                user.name = name.clone();
            }
            if let Some(email) = &update.email {
                user.email = email.clone();
            }
            if let Some(role) = update.role {
                user.role = role;
            }
            Ok(user.clone())
        })
    }

    fn delete_user(&self, id: &str) -> Result<(), ApiError> {
        self.write(format!("delete_user {id}"), |s| {
            let before = s.users.len();
            s.users.retain(|u| u.id != id);
            if s.users.len() == before {
                return Err(ApiError::UserNotFound(id.to_string()));
            }
            Ok(())
        })
    }

    fn integration_status(&self) -> Result<IntegrationStatus, ApiError> {
        self.read("integration_status", |_| IntegrationStatus {
            slack: true,
            notion: false,
            jira: true,
        })
    }

    fn disconnect_integration(&self, service: Service) -> Result<String, ApiError> {
        self.write(format!("disconnect {service}"), |_| Ok(format!("{service} disconnected")))
    }
}

pub fn store_over(api: &FakeApi, policy: ReadPolicy) -> TaskStore {
    TaskStore::new(Box::new(api.clone()), policy, fallback_tasks())
}

pub fn make_token(claims: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}

#[derive(Debug, Clone, Default)]
pub struct Recorded {
    pub request_line: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Answers exactly one HTTP request with `status` and `body`, then hands the
/// recorded request back through the join handle.
pub fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<Recorded>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream);
        let mut recorded = Recorded::default();

        reader.read_line(&mut recorded.request_line).unwrap();
        recorded.request_line = recorded.request_line.trim_end().to_string();
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                recorded.headers.push((name.trim().to_string(), value.trim().to_string()));
            }
        }
        let length = recorded
            .header("content-length")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(0);
        let mut request_body = vec![0; length];
        reader.read_exact(&mut request_body).unwrap();
        recorded.body = String::from_utf8(request_body).unwrap();

        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let mut stream = reader.into_inner();
        stream.write_all(response.as_bytes()).unwrap();
        stream.flush().unwrap();
        recorded
    });
    (format!("http://{addr}"), handle)
}
