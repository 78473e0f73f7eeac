use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    #[serde(rename = "TODO", alias = "todo")]
    Todo,
    #[serde(rename = "IN_PROGRESS", alias = "in_progress")]
    InProgress,
    #[serde(rename = "DONE", alias = "done")]
    Done,
}

impl TaskStatus {
    /// Board order, left to right.
    pub const ALL: [TaskStatus; 3] = [TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Done];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "TODO",
            Self::InProgress => "IN_PROGRESS",
            Self::Done => "DONE",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Todo => "To do",
            Self::InProgress => "In progress",
            Self::Done => "Done",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Self::Todo => 0,
            Self::InProgress => 1,
            Self::Done => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Steps along the board order, clamped at both ends.
    pub fn step(self, direction: isize) -> Self {
        let target = (self.index() as isize + direction).clamp(0, Self::ALL.len() as isize - 1);
        Self::ALL[target as usize]
    }

    pub fn next(self) -> Self {
        self.step(1)
    }

    pub fn prev(self) -> Self {
        self.step(-1)
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().replace(['-', ' '], "_").as_str() {
            "TODO" => Some(Self::Todo),
            "IN_PROGRESS" | "DOING" => Some(Self::InProgress),
            "DONE" => Some(Self::Done),
            _ => None,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Priority {
    #[serde(rename = "HIGH", alias = "high")]
    High,
    #[default]
    #[serde(rename = "MEDIUM", alias = "medium")]
    Medium,
    #[serde(rename = "LOW", alias = "low")]
    Low,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "HIGH" => Some(Self::High),
            "MEDIUM" => Some(Self::Medium),
            "LOW" => Some(Self::Low),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Who a task is assigned to, normalized from whatever shape the server sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssigneeRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl AssigneeRef {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_skills: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jira_issue_key: Option<String>,
}

/// A unit of work. The server owns it; this is a cached copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawTask")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<AssigneeRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<TaskMetadata>,
}

impl Task {
    pub fn assignee_id(&self) -> Option<&str> {
        self.assignee.as_ref().map(|a| a.id.as_str())
    }
}

// Wire shape. `assignee` is sometimes a bare string and sometimes a user object.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTask {
    id: String,
    title: String,
    #[serde(default)]
    description: Option<String>,
    status: TaskStatus,
    #[serde(default)]
    assignee_id: Option<String>,
    #[serde(default)]
    assignee: Option<RawAssignee>,
    #[serde(default)]
    due_date: Option<String>,
    #[serde(default)]
    priority: Priority,
    #[serde(default)]
    metadata: Option<TaskMetadata>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAssignee {
    Name(String),
    User {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        email: Option<String>,
    },
}

impl TryFrom<RawTask> for Task {
    type Error = String;

    fn try_from(raw: RawTask) -> Result<Self, Self::Error> {
        if raw.id.trim().is_empty() {
            return Err("task id is empty".to_string());
        }
        let assignee = normalize_assignee(raw.assignee, raw.assignee_id);
        Ok(Task {
            id: raw.id,
            title: raw.title,
            description: raw.description.filter(|d| !d.is_empty()),
            status: raw.status,
            assignee,
            due_date: raw.due_date.as_deref().and_then(parse_due_date),
            priority: raw.priority,
            metadata: raw.metadata,
        })
    }
}

fn normalize_assignee(raw: Option<RawAssignee>, assignee_id: Option<String>) -> Option<AssigneeRef> {
    let assignee_id = assignee_id.filter(|id| !id.is_empty());
    match raw {
        Some(RawAssignee::Name(name)) if !name.is_empty() => Some(AssigneeRef {
            id: assignee_id.unwrap_or_else(|| name.clone()),
            name: Some(name),
            email: None,
        }),
        Some(RawAssignee::User { id, name, email }) => {
            let id = id.filter(|id| !id.is_empty()).or(assignee_id).or_else(|| name.clone())?;
            Some(AssigneeRef { id, name, email })
        }
        _ => assignee_id.map(|id| AssigneeRef { id, name: None, email: None }),
    }
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp.
pub fn parse_due_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive()))
        .or_else(|| value.get(..10).and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()))
}

/// Optional narrowing for task listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilters {
    pub status: Option<TaskStatus>,
    pub assignee_id: Option<String>,
    pub priority: Option<Priority>,
}

impl TaskFilters {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.assignee_id.is_none() && self.priority.is_none()
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        if let Some(assignee_id) = &self.assignee_id {
            pairs.push(("assigneeId", assignee_id.clone()));
        }
        if let Some(priority) = self.priority {
            pairs.push(("priority", priority.as_str().to_string()));
        }
        pairs
    }

    pub fn matches(&self, task: &Task) -> bool {
        self.status.map_or(true, |s| task.status == s)
            && self.priority.map_or(true, |p| task.priority == p)
            && self
                .assignee_id
                .as_deref()
                .map_or(true, |id| task.assignee_id() == Some(id))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Materializes the request as a task, for backends that assign ids locally.
    pub fn into_task(self, id: String) -> Task {
        Task {
            id,
            title: self.title,
            description: self.description,
            status: self.status.unwrap_or(TaskStatus::Todo),
            assignee: self.assignee_id.map(|id| AssigneeRef { id, name: None, email: None }),
            due_date: self.due_date,
            priority: self.priority.unwrap_or_default(),
            metadata: None,
        }
    }
}

/// Field edits; unset fields stay untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<String>,
}

impl TaskUpdate {
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = Some(description.clone()).filter(|d| !d.is_empty());
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = Some(due_date);
        }
        if let Some(assignee_id) = &self.assignee_id {
            let unchanged = task.assignee_id() == Some(assignee_id.as_str());
            if !unchanged {
                task.assignee = Some(AssigneeRef {
                    id: assignee_id.clone(),
                    name: None,
                    email: None,
                });
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Owner,
    Admin,
    #[default]
    Member,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "OWNER",
            Self::Admin => "ADMIN",
            Self::Member => "MEMBER",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "OWNER" => Some(Self::Owner),
            "ADMIN" => Some(Self::Admin),
            "MEMBER" => Some(Self::Member),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience_level: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_hours: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience_level: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_hours: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience_level: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    #[serde(default)]
    pub title: String,
    // Older payloads carry `name` instead of `title`.
    #[serde(default, skip_serializing)]
    name: Option<String>,
    #[serde(default)]
    pub overview: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notion_page_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Project {
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            self.name.as_deref().unwrap_or(&self.id)
        } else {
            &self.title
        }
    }
}

/// The fixed demo list shown when the task listing cannot be fetched.
pub fn fallback_tasks() -> Vec<Task> {
    let person = |id: &str, name: &str, email: &str| AssigneeRef {
        id: id.to_string(),
        name: Some(name.to_string()),
        email: Some(email.to_string()),
    };
    let hours = |h: f64| TaskMetadata {
        estimated_hours: Some(h),
        ..TaskMetadata::default()
    };
    vec![
        Task {
            id: "task-1".to_string(),
            title: "Implement user authentication".to_string(),
            description: Some("JWT based login and logout".to_string()),
            status: TaskStatus::Todo,
            assignee: Some(person("user-1", "Kim Dev", "dev@example.com")),
            due_date: None,
            priority: Priority::High,
            metadata: Some(hours(8.0)),
        },
        Task {
            id: "task-2".to_string(),
            title: "Design database schema".to_string(),
            description: Some("User, task and project tables".to_string()),
            status: TaskStatus::Todo,
            assignee: Some(person("user-2", "Park DB", "db@example.com")),
            due_date: None,
            priority: Priority::Medium,
            metadata: Some(hours(4.0)),
        },
        Task {
            id: "task-3".to_string(),
            title: "Build API endpoints".to_string(),
            description: Some("REST API implementation and docs".to_string()),
            status: TaskStatus::InProgress,
            assignee: Some(person("user-1", "Kim Dev", "dev@example.com")),
            due_date: None,
            priority: Priority::High,
            metadata: Some(hours(12.0)),
        },
        Task {
            id: "task-4".to_string(),
            title: "Build frontend components".to_string(),
            description: Some("Components and styling".to_string()),
            status: TaskStatus::Done,
            assignee: Some(person("user-3", "Lee Front", "front@example.com")),
            due_date: None,
            priority: Priority::Medium,
            metadata: Some(hours(16.0)),
        },
    ]
}
