//! Core types for the planner.

use chrono::{NaiveDate, NaiveTime};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Task priority, 1 (lowest) to 5 (highest).
pub type Priority = i32;

pub const PRIORITY_LOWEST: Priority = 1;
pub const PRIORITY_LOW: Priority = 2;
pub const PRIORITY_MEDIUM: Priority = 3;
pub const PRIORITY_HIGH: Priority = 4;
pub const PRIORITY_HIGHEST: Priority = 5;

/// Default priority for new tasks.
pub const PRIORITY_DEFAULT: Priority = PRIORITY_MEDIUM;

/// Date format used for calendar dates in storage and on the wire.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Maximum length of task and template content, in characters.
pub const MAX_CONTENT_LEN: usize = 1000;

/// Wall-clock format of manual entry times.
pub const TIME_FORMAT: &str = "%H:%M";

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Backlog,
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Backlog,
        TaskStatus::Todo,
        TaskStatus::InProgress,
        TaskStatus::Done,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Backlog => "backlog",
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "backlog" => Some(TaskStatus::Backlog),
            "todo" => Some(TaskStatus::Todo),
            "in_progress" => Some(TaskStatus::InProgress),
            "done" => Some(TaskStatus::Done),
            _ => None,
        }
    }

    /// Statuses from which starting a timer promotes the task to in_progress.
    pub fn is_not_started(&self) -> bool {
        matches!(self, TaskStatus::Backlog | TaskStatus::Todo)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for TaskStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TaskStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        TaskStatus::parse(s).ok_or_else(|| FromSqlError::Other(format!("unknown status '{}'", s).into()))
    }
}

/// A unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub owner_id: String,
    /// Stable human-readable label, e.g. `TASK-12`.
    pub display_code: String,
    pub content: String,
    pub status: TaskStatus,
    pub priority: Priority,
    /// Always equal to `status == Done`.
    pub completed: bool,
    /// `None` means the task sits in the backlog.
    pub date: Option<NaiveDate>,
    pub sort_order: i64,

    // Owned by the sync collaborator, read-only here.
    pub external_key: Option<String>,
    pub external_url: Option<String>,

    pub created_at: i64,
    pub updated_at: i64,
}

impl Task {
    /// External key when linked, otherwise the display code.
    pub fn display_label(&self) -> &str {
        self.external_key.as_deref().unwrap_or(&self.display_code)
    }

    pub fn is_backlog(&self) -> bool {
        self.date.is_none()
    }
}

/// Input for creating a task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTask {
    pub content: String,
    pub date: Option<NaiveDate>,
    pub status: Option<String>,
    pub priority: Option<Priority>,
}

impl NewTask {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_status(mut self, status: &str) -> Self {
        self.status = Some(status.to_string());
        self
    }
}

/// Partial update for a task. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskUpdate {
    pub content: Option<String>,
    pub priority: Option<Priority>,
    pub status: Option<String>,
    pub completed: Option<bool>,
    /// `Some(None)` moves the task to the backlog.
    pub date: Option<Option<NaiveDate>>,
}

/// One contiguous recorded work interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerEntry {
    pub id: String,
    pub owner_id: String,
    pub task_id: Option<String>,
    /// Owner-local date the entry was started on.
    pub log_date: NaiveDate,
    pub start_at: i64,
    /// `None` while the timer is running.
    pub end_at: Option<i64>,
    pub description: Option<String>,
    pub category_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Placeholder shown for a running entry's duration.
pub const RUNNING_DURATION: &str = "--:--";

impl TimerEntry {
    pub fn is_running(&self) -> bool {
        self.end_at.is_none()
    }

    /// Whole minutes between start and end, `None` while running.
    pub fn duration_minutes(&self) -> Option<i64> {
        self.end_at
            .map(|end| (end - self.start_at).abs() / 1000 / 60)
    }

    /// Duration as `HH:MM`, or [`RUNNING_DURATION`] while running.
    pub fn formatted_duration(&self) -> String {
        match self.duration_minutes() {
            Some(minutes) => format!("{:02}:{:02}", minutes / 60, minutes % 60),
            None => RUNNING_DURATION.to_string(),
        }
    }
}

/// Input for logging time by hand. Times are owner-local on `log_date`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEntry {
    pub start: NaiveTime,
    /// `None` opens a running entry.
    pub end: Option<NaiveTime>,
    /// Defaults to the owner's today.
    pub log_date: Option<NaiveDate>,
    pub task_id: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<String>,
}

impl NewEntry {
    pub fn new(start: NaiveTime) -> Self {
        Self {
            start,
            end: None,
            log_date: None,
            task_id: None,
            description: None,
            category_id: None,
        }
    }

    pub fn until(mut self, end: NaiveTime) -> Self {
        self.end = Some(end);
        self
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.log_date = Some(date);
        self
    }

    pub fn for_task(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Partial update for a time entry. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntryUpdate {
    pub start: Option<NaiveTime>,
    /// `Some(None)` reopens the entry.
    pub end: Option<Option<NaiveTime>>,
    /// An empty string clears the description.
    pub description: Option<String>,
    /// An empty string clears the category.
    pub category_id: Option<String>,
}

/// How often a recurring template fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "daily" => Some(Frequency::Daily),
            "weekly" => Some(Frequency::Weekly),
            _ => None,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for Frequency {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Frequency {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        Frequency::parse(s)
            .ok_or_else(|| FromSqlError::Other(format!("unknown frequency '{}'", s).into()))
    }
}

/// A rule that spawns tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringTemplate {
    pub id: String,
    pub owner_id: String,
    pub content: String,
    pub frequency: Frequency,
    /// ISO weekdays (1 = Monday .. 7 = Sunday), sorted and unique.
    pub weekdays: Vec<u8>,
    pub active: bool,
    pub last_generated_date: Option<NaiveDate>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Input for creating or editing a recurring template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateInput {
    pub content: String,
    pub frequency: Frequency,
    #[serde(default)]
    pub weekdays: Vec<u8>,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

/// A task's position on the weekly board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub id: String,
    pub owner_id: String,
    pub task_id: String,
    pub week_key: String,
    /// 1 = Monday .. 5 = Friday.
    pub weekday: u8,
    /// `false` marks a historical ghost.
    pub is_current: bool,
    pub moved_to_id: Option<String>,
    pub sort_order: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Why a template did or did not produce a task on a given run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationOutcome {
    Created,
    NotScheduled,
    AlreadyGenerated,
    DuplicateContent,
}

/// Per-template record of a generation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRun {
    pub template_id: String,
    pub content: String,
    pub outcome: GenerationOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

/// Totals of a recurring generation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub date: NaiveDate,
    pub created: i32,
    pub skipped: i32,
    pub runs: Vec<TemplateRun>,
}

/// Result of carrying a whole week over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarryOverWeekResult {
    pub moved_count: i32,
    pub next_week_key: String,
}

/// Result of carrying selected tasks to a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarryOverSelectedResult {
    pub moved_count: i32,
    pub tasks: Vec<Task>,
}

/// One weekday column of the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySlot {
    pub date: NaiveDate,
    pub tasks: Vec<Task>,
    /// Ghost placements left behind by tasks that moved away.
    pub ghosts: Vec<Placement>,
}

/// Weekly board: five weekdays plus the backlog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekBoard {
    pub week_key: String,
    pub prev_week_key: String,
    pub next_week_key: String,
    pub is_current_week: bool,
    /// Keyed by weekday 1..=5.
    pub days: BTreeMap<u8, DaySlot>,
    pub backlog: Vec<Task>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(start_at: i64, end_at: Option<i64>) -> TimerEntry {
        TimerEntry {
            id: "e".to_string(),
            owner_id: "o".to_string(),
            task_id: None,
            log_date: NaiveDate::from_ymd_opt(2026, 1, 26).unwrap(),
            start_at,
            end_at,
            description: None,
            category_id: None,
            created_at: start_at,
            updated_at: start_at,
        }
    }

    #[test]
    fn status_parse_rejects_unknown() {
        for status in TaskStatus::ALL {
            assert_eq!(TaskStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TaskStatus::parse("in_review"), None);
        assert_eq!(TaskStatus::parse("DONE"), None);
    }

    #[test]
    fn duration_floors_to_whole_minutes() {
        // 1h 30m 59s
        let e = entry(0, Some((90 * 60 + 59) * 1000));
        assert_eq!(e.duration_minutes(), Some(90));
        assert_eq!(e.formatted_duration(), "01:30");
    }

    #[test]
    fn duration_uses_absolute_difference() {
        let e = entry(10 * 60 * 1000, Some(0));
        assert_eq!(e.duration_minutes(), Some(10));
    }

    #[test]
    fn running_entry_has_sentinel_duration() {
        let e = entry(0, None);
        assert!(e.is_running());
        assert_eq!(e.duration_minutes(), None);
        assert_eq!(e.formatted_duration(), RUNNING_DURATION);
    }

    #[test]
    fn display_label_prefers_external_key() {
        let mut task = Task {
            id: "t".to_string(),
            owner_id: "o".to_string(),
            display_code: "TASK-4".to_string(),
            content: "x".to_string(),
            status: TaskStatus::Todo,
            priority: PRIORITY_DEFAULT,
            completed: false,
            date: None,
            sort_order: 1,
            external_key: None,
            external_url: None,
            created_at: 0,
            updated_at: 0,
        };
        assert_eq!(task.display_label(), "TASK-4");
        task.external_key = Some("PROJ-17".to_string());
        assert_eq!(task.display_label(), "PROJ-17");
    }
}
