//! Meeting notes: summary, next-meeting info, preparation checklist, and the
//! action items derived from the decisions text. Each is mirrored to its own slot.

use chrono::{Datelike, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::error::StorageError;
use crate::local_store::{LocalStore, Mirror, StorageKey};
use crate::task::{Priority, TaskStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingSummary {
    pub purpose: String,
    pub main_content: String,
    pub decisions: String,
}

impl Default for MeetingSummary {
    fn default() -> Self {
        Self {
            purpose: "Review Q1 project progress and resolve open issues".to_string(),
            main_content: "Team status updates, technical issues, schedule changes".to_string(),
            decisions: "Finish the UI improvements by next week, complete the API documentation"
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextMeeting {
    pub title: String,
    pub host: String,
    pub preparations: String,
}

impl Default for NextMeeting {
    fn default() -> Self {
        Self {
            title: "Next meeting: 07.19 (Wed)".to_string(),
            host: "Kim".to_string(),
            preparations: "Model comparison table, collected UI feedback".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: i64,
    pub text: String,
    pub completed: bool,
}

pub fn default_checklist() -> Vec<ChecklistItem> {
    ["Summarize model results", "Collect feedback", "Book the meeting room"]
        .into_iter()
        .zip(1..)
        .map(|(text, id)| ChecklistItem {
            id,
            text: text.to_string(),
            completed: false,
        })
        .collect()
}

/// Ordered checklist mirrored to the `meetingAnalysis-checklist` slot.
pub struct Checklist {
    items: Mirror<Vec<ChecklistItem>>,
}

impl Checklist {
    pub fn open(store: &LocalStore) -> Self {
        Self {
            items: Mirror::hydrate(store, StorageKey::MeetingChecklist, default_checklist),
        }
    }

    pub fn items(&self) -> &[ChecklistItem] {
        self.items.get()
    }

    /// Flips an item. Returns its new state, or `None` for an unknown id.
    pub fn toggle(&mut self, id: i64) -> Result<Option<bool>, StorageError> {
        self.items.update(|items| {
            items.iter_mut().find(|i| i.id == id).map(|item| {
                item.completed = !item.completed;
                item.completed
            })
        })
    }

    pub fn add(&mut self, text: impl Into<String>) -> Result<i64, StorageError> {
        let text = text.into();
        self.items.update(|items| {
            // Millisecond ids, bumped past any collision.
            let mut id = Utc::now().timestamp_millis();
            while items.iter().any(|i| i.id == id) {
                id += 1;
            }
            items.push(ChecklistItem {
                id,
                text,
                completed: false,
            });
            id
        })
    }

    pub fn remove(&mut self, id: i64) -> Result<bool, StorageError> {
        self.items.update(|items| {
            let before = items.len();
            items.retain(|i| i.id != id);
            items.len() != before
        })
    }

    pub fn rename(&mut self, id: i64, text: impl Into<String>) -> Result<bool, StorageError> {
        let text = text.into();
        self.items.update(|items| match items.iter_mut().find(|i| i.id == id) {
            Some(item) => {
                item.text = text;
                true
            }
            None => false,
        })
    }
}

/// An action item extracted from meeting decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedTask {
    pub id: i64,
    pub name: String,
    pub assignee: String,
    pub due_date: NaiveDate,
    pub status: TaskStatus,
    pub priority: Priority,
}

struct Keyword {
    keyword: &'static str,
    assignee: &'static str,
    priority: Priority,
}

// First match wins, so the specific phrases come before the generic ones.
const KEYWORDS: &[Keyword] = &[
    Keyword { keyword: "ui improvement", assignee: "Kim", priority: Priority::High },
    Keyword { keyword: "api documentation", assignee: "Lee", priority: Priority::Medium },
    Keyword { keyword: "performance test", assignee: "Park", priority: Priority::Medium },
    Keyword { keyword: "meeting schedule", assignee: "Jung", priority: Priority::Low },
    Keyword { keyword: "test", assignee: "Park", priority: Priority::Medium },
    Keyword { keyword: "documentation", assignee: "Lee", priority: Priority::Medium },
    Keyword { keyword: "review", assignee: "Kim", priority: Priority::Medium },
    Keyword { keyword: "analysis", assignee: "Park", priority: Priority::Medium },
    Keyword { keyword: "prepare", assignee: "Jung", priority: Priority::Low },
    Keyword { keyword: "write", assignee: "Lee", priority: Priority::Medium },
];

const MAX_DERIVED: usize = 6;
const MAX_NAME_CHARS: usize = 20;

fn date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b(\d{1,2})[/.\-](\d{1,2})\b").expect("valid date pattern"))
}

fn owner_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)owner[:\s]*([A-Za-z][\w.]*)").expect("valid owner pattern"))
}

fn is_action_line(line: &str) -> bool {
    let lower = line.to_lowercase();
    line.contains('•') || line.contains('-') || lower.contains("owner:") || lower.contains("due:")
}

fn task_name(line: &str) -> String {
    let trimmed = line.trim_start_matches(|c: char| c == '•' || c == '-' || c.is_whitespace());
    let head = trimmed.split('(').next().unwrap_or_default();
    let head = head.split(':').next().unwrap_or_default().trim();
    if head.chars().count() > MAX_NAME_CHARS {
        format!("{}...", head.chars().take(MAX_NAME_CHARS).collect::<String>())
    } else {
        head.to_string()
    }
}

fn due_date(line: &str, year: i32) -> NaiveDate {
    let fallback = || NaiveDate::from_ymd_opt(year, 1, 30).unwrap_or_default();
    date_pattern()
        .captures(line)
        .and_then(|caps| {
            let month = caps[1].parse().ok()?;
            let day = caps[2].parse().ok()?;
            NaiveDate::from_ymd_opt(year, month, day)
        })
        .unwrap_or_else(fallback)
}

fn default_derived(year: i32, first_id: i64) -> Vec<DerivedTask> {
    let date = |m, d| NaiveDate::from_ymd_opt(year, m, d).unwrap_or_default();
    vec![
        DerivedTask {
            id: first_id,
            name: "Finish UI improvements".to_string(),
            assignee: "Kim".to_string(),
            due_date: date(1, 22),
            status: TaskStatus::InProgress,
            priority: Priority::High,
        },
        DerivedTask {
            id: first_id + 1,
            name: "Complete API documentation".to_string(),
            assignee: "Lee".to_string(),
            due_date: date(1, 20),
            status: TaskStatus::InProgress,
            priority: Priority::Medium,
        },
    ]
}

/// Extracts up to six action items from a decisions text.
///
/// A line counts when it is a bullet or carries an `owner:`/`due:` marker and
/// mentions a known keyword. With no hits the two default items are returned.
pub fn derive_tasks(decisions: &str, year: i32, first_id: i64) -> Vec<DerivedTask> {
    let mut tasks = Vec::new();
    let mut next_id = first_id;
    let lines = decisions.lines().filter(|l| !l.trim().is_empty());

    for (index, line) in lines.enumerate() {
        if !is_action_line(line) {
            continue;
        }
        let lower = line.to_lowercase();
        let Some(keyword) = KEYWORDS.iter().find(|k| lower.contains(k.keyword)) else {
            continue;
        };
        let assignee = owner_pattern()
            .captures(line)
            .map(|caps| caps[1].to_string())
            .unwrap_or_else(|| keyword.assignee.to_string());
        let name = task_name(line);
        tasks.push(DerivedTask {
            id: next_id,
            name: if name.is_empty() {
                format!("Action item {}", index + 1)
            } else {
                name
            },
            assignee,
            due_date: due_date(line, year),
            status: TaskStatus::Todo,
            priority: keyword.priority,
        });
        next_id += 1;
    }

    if tasks.is_empty() {
        return default_derived(year, first_id);
    }
    tasks.truncate(MAX_DERIVED);
    tasks
}

/// A past or scheduled meeting with its recorded notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingRecord {
    pub id: u32,
    pub name: String,
    pub date: NaiveDate,
    pub participants: Vec<String>,
    pub summary: MeetingSummary,
}

fn record(
    id: u32,
    name: &str,
    (month, day): (u32, u32),
    participants: &[&str],
    summary: [&str; 3],
) -> MeetingRecord {
    let [purpose, main_content, decisions] = summary;
    MeetingRecord {
        id,
        name: name.to_string(),
        date: NaiveDate::from_ymd_opt(2025, month, day).unwrap_or_default(),
        participants: participants.iter().map(|p| p.to_string()).collect(),
        summary: MeetingSummary {
            purpose: purpose.to_string(),
            main_content: main_content.to_string(),
            decisions: decisions.to_string(),
        },
    }
}

/// The built-in meeting history shown by `meeting list`.
pub fn meeting_catalog() -> Vec<MeetingRecord> {
    vec![
        record(
            1,
            "Weekly project review",
            (1, 15),
            &["Kim", "Lee", "Park"],
            [
                "Review Q1 project progress and resolve open issues",
                "Team status updates, technical issues, schedule changes",
                "• UI improvement wrap-up (owner: Kim, due: 1/22)\n\
                 • API documentation (owner: Lee, due: 1/20)\n\
                 • Performance test run (owner: Park, due: 1/25)\n\
                 • Confirm next meeting schedule (owner: Jung, due: 1/18)",
            ],
        ),
        record(
            2,
            "Client feedback review",
            (1, 12),
            &["Park", "Jung"],
            [
                "Analyse client feedback and plan improvements",
                "Interface requests, feature suggestions, performance requirements",
                "• Main screen redesign review (owner: Park, due: 1/25)\n\
                 • Search analysis (owner: Jung, due: 1/23)\n\
                 • Loading performance test (owner: Lee, due: 1/27)\n\
                 • Write the user manual (owner: Kim, due: 1/30)",
            ],
        ),
        record(
            3,
            "Monthly tech study",
            (1, 18),
            &["Kim", "Lee", "Park", "Jung", "Choi"],
            [
                "Share recent technology trends and how to apply them",
                "Framework upgrades, AI tooling, cloud services",
                "• Prepare the migration plan (owner: Lee, due: 2/5)\n\
                 • AI code review tooling (owner: Choi, due: 2/10)\n\
                 • Cloud service analysis (owner: Kim, due: 2/15)\n\
                 • Technical documentation update (owner: Park, due: 2/1)",
            ],
        ),
    ]
}

/// Case-insensitive search over name and participants; exact match on date.
pub fn filter_meetings<'a>(
    meetings: &'a [MeetingRecord],
    name: Option<&str>,
    date: Option<NaiveDate>,
    participant: Option<&str>,
) -> Vec<&'a MeetingRecord> {
    let name = name.map(str::to_lowercase);
    let participant = participant.map(str::to_lowercase);
    meetings
        .iter()
        .filter(|m| name.as_deref().map_or(true, |n| m.name.to_lowercase().contains(n)))
        .filter(|m| date.map_or(true, |d| m.date == d))
        .filter(|m| {
            participant.as_deref().map_or(true, |p| {
                m.participants.iter().any(|who| who.to_lowercase().contains(p))
            })
        })
        .collect()
}

/// All meeting-notes state, hydrated from its slots.
pub struct MeetingNotes {
    pub summary: Mirror<MeetingSummary>,
    pub next_meeting: Mirror<NextMeeting>,
    pub derived: Mirror<Vec<DerivedTask>>,
    pub checklist: Checklist,
}

impl MeetingNotes {
    pub fn open(store: &LocalStore) -> Self {
        let year = Utc::now().year();
        Self {
            summary: Mirror::hydrate(store, StorageKey::MeetingSummary, MeetingSummary::default),
            next_meeting: Mirror::hydrate(store, StorageKey::NextMeeting, NextMeeting::default),
            derived: Mirror::hydrate(store, StorageKey::DerivedTasks, || default_derived(year, 1)),
            checklist: Checklist::open(store),
        }
    }

    /// Switches to another meeting's notes and re-derives its action items.
    pub fn select(&mut self, record: &MeetingRecord) -> Result<(), StorageError> {
        self.summary.set(record.summary.clone())?;
        self.rederive(record.date.year())
    }

    /// Regenerates the action items from the current decisions text.
    pub fn rederive(&mut self, year: i32) -> Result<(), StorageError> {
        let tasks = derive_tasks(&self.summary.get().decisions, year, Utc::now().timestamp_millis());
        self.derived.set(tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    const DECISIONS: &str = "\
• UI improvement wrap-up (owner: Mina, due: 1/22)
• API documentation (owner: Joon, due: 1/20)
• Performance test run (due: 1-25)
• Confirm next meeting schedule (owner: Sumin, due: 1.18)
plain sentence about testing without bullet";

    #[test]
    fn bullets_with_keywords_become_action_items() {
        let tasks = derive_tasks(DECISIONS, 2025, 100);
        assert_eq!(tasks.len(), 4);

        assert_eq!(tasks[0].id, 100);
        assert_eq!(tasks[0].name, "UI improvement wrap-...");
        assert_eq!(tasks[0].assignee, "Mina");
        assert_eq!(tasks[0].due_date, NaiveDate::from_ymd_opt(2025, 1, 22).unwrap());
        assert_eq!(tasks[0].priority, Priority::High);

        assert_eq!(tasks[2].assignee, "Park");
        assert_eq!(tasks[2].due_date, NaiveDate::from_ymd_opt(2025, 1, 25).unwrap());
        assert_eq!(tasks[3].name, "Confirm next meeting...");
        assert_eq!(tasks[3].priority, Priority::Low);
        assert!(tasks.iter().all(|t| t.status == TaskStatus::Todo));
    }

    #[test]
    fn nothing_matching_yields_the_defaults() {
        let tasks = derive_tasks("We talked about lunch.", 2025, 1);
        assert_eq!(tasks, default_derived(2025, 1));
    }

    #[test]
    fn at_most_six_items_and_default_due_date() {
        let text = (0..10).map(|i| format!("- review item {i}")).collect::<Vec<_>>().join("\n");
        let tasks = derive_tasks(&text, 2024, 1);
        assert_eq!(tasks.len(), 6);
        assert_eq!(tasks[0].due_date, NaiveDate::from_ymd_opt(2024, 1, 30).unwrap());
        assert_eq!(tasks[0].assignee, "Kim");
    }

    #[test]
    fn checklist_survives_a_fresh_open_in_order() {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();

        let mut checklist = Checklist::open(&store);
        assert_eq!(checklist.items(), default_checklist().as_slice());
        let added = checklist.add("Send the agenda").unwrap();
        assert_eq!(checklist.toggle(2).unwrap(), Some(true));
        assert!(checklist.remove(1).unwrap());
        assert!(checklist.rename(added, "Send the final agenda").unwrap());
        let expected = checklist.items().to_vec();

        let reopened = Checklist::open(&store);
        assert_eq!(reopened.items(), expected.as_slice());
        let texts: Vec<_> = reopened.items().iter().map(|i| i.text.as_str()).collect();
        assert_eq!(texts, vec!["Collect feedback", "Book the meeting room", "Send the final agenda"]);
    }

    #[test]
    fn toggling_unknown_item_changes_nothing() {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();
        let mut checklist = Checklist::open(&store);
        assert_eq!(checklist.toggle(999).unwrap(), None);
        assert_eq!(checklist.items(), default_checklist().as_slice());
    }

    #[test]
    fn selecting_a_meeting_rederives_from_its_decisions() {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();
        let mut notes = MeetingNotes::open(&store);
        let record = MeetingRecord {
            id: 2,
            name: "Client feedback review".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 1, 12).unwrap(),
            participants: vec!["Park".to_string(), "Jung".to_string()],
            summary: MeetingSummary {
                purpose: "Analyse client feedback".to_string(),
                main_content: "UI requests".to_string(),
                decisions: "- Write the user manual (owner: Kim, due: 1/30)".to_string(),
            },
        };
        notes.select(&record).unwrap();

        let reopened = MeetingNotes::open(&store);
        assert_eq!(reopened.summary.get(), &record.summary);
        let derived = reopened.derived.get();
        assert_eq!(derived.len(), 1);
        assert_eq!(derived[0].assignee, "Kim");
        assert_eq!(derived[0].name, "Write the user manua...");
    }

    #[test]
    fn catalog_decisions_all_derive() {
        for meeting in meeting_catalog() {
            let tasks = derive_tasks(&meeting.summary.decisions, 2025, 1);
            assert_eq!(tasks.len(), 4, "{}", meeting.name);
        }
    }

    #[test]
    fn meeting_search_combines_filters() {
        let make = |id, name: &str, date, who: &[&str]| MeetingRecord {
            id,
            name: name.to_string(),
            date,
            participants: who.iter().map(|w| w.to_string()).collect(),
            summary: MeetingSummary::default(),
        };
        let jan = |d| NaiveDate::from_ymd_opt(2025, 1, d).unwrap();
        let meetings = vec![
            make(1, "Weekly project review", jan(15), &["Kim", "Lee"]),
            make(2, "Client feedback", jan(12), &["Park"]),
            make(3, "Design review", jan(20), &["Kim", "Park"]),
        ];
        let hits = filter_meetings(&meetings, Some("REVIEW"), None, Some("park"));
        assert_eq!(hits.iter().map(|m| m.id).collect::<Vec<_>>(), vec![3]);
        assert_eq!(filter_meetings(&meetings, None, Some(jan(12)), None).len(), 1);
        assert_eq!(filter_meetings(&meetings, None, None, None).len(), 3);
    }
}
