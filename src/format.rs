//! Output formatting utilities for markdown and JSON.

use crate::types::{
    GenerationOutcome, GenerationSummary, PRIORITY_HIGH, RecurringTemplate, Task, TaskStatus,
    TimerEntry, WeekBoard,
};
use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Markdown,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "markdown" | "md" => Some(OutputFormat::Markdown),
            _ => None,
        }
    }
}

const WEEKDAY_NAMES: [&str; 5] = ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday"];

/// Format a single task as markdown.
pub fn format_task_markdown(task: &Task) -> String {
    let mut md = String::new();

    md.push_str(&format!("## {}: {}\n", task.display_label(), task.content));
    md.push_str(&format!("- **id**: `{}`\n", task.id));
    md.push_str(&format!("- **status**: {}\n", task.status));
    md.push_str(&format!("- **priority**: {}\n", task.priority));
    match task.date {
        Some(date) => md.push_str(&format!("- **date**: {}\n", date)),
        None => md.push_str("- **date**: backlog\n"),
    }

    if let Some(ref url) = task.external_url {
        md.push_str(&format!("- **link**: {}\n", url));
    }

    md
}

/// Format a titled list of tasks as markdown.
pub fn format_tasks_markdown(title: &str, tasks: &[Task]) -> String {
    let mut md = format!("# {} ({})\n\n", title, tasks.len());
    for task in tasks {
        md.push_str(&format_task_short(task));
    }
    md
}

/// Format the weekly board as markdown.
pub fn format_board_markdown(board: &WeekBoard) -> String {
    let mut md = String::new();

    let marker = if board.is_current_week { " (this week)" } else { "" };
    md.push_str(&format!("# Week {}{}\n\n", board.week_key, marker));
    md.push_str(&format!(
        "_prev: {} | next: {}_\n\n",
        board.prev_week_key, board.next_week_key
    ));

    for (weekday, slot) in &board.days {
        let name = WEEKDAY_NAMES
            .get(usize::from(*weekday).saturating_sub(1))
            .copied()
            .unwrap_or("?");
        md.push_str(&format!("## {} {}\n\n", name, slot.date));
        if slot.tasks.is_empty() {
            md.push_str("_nothing planned_\n");
        }
        for task in &slot.tasks {
            md.push_str(&format_task_short(task));
        }
        if !slot.ghosts.is_empty() {
            md.push_str(&format!("_{} moved away_\n", slot.ghosts.len()));
        }
        md.push('\n');
    }

    md.push_str(&format!("## Backlog ({})\n\n", board.backlog.len()));
    for task in &board.backlog {
        md.push_str(&format_task_short(task));
    }

    md
}

/// Format one timer entry as a markdown list item, start time in `tz`.
pub fn format_entry_markdown(entry: &TimerEntry, tz: Tz) -> String {
    let start = DateTime::from_timestamp_millis(entry.start_at)
        .map(|t| t.with_timezone(&tz).format("%H:%M").to_string())
        .unwrap_or_else(|| entry.start_at.to_string());
    format!(
        "- {} {} `{}` {} ({})\n",
        entry.log_date,
        start,
        entry.formatted_duration(),
        entry.description.as_deref().unwrap_or(""),
        entry.id,
    )
}

/// Format timer entries as markdown.
pub fn format_entries_markdown(entries: &[TimerEntry], tz: Tz) -> String {
    let mut md = format!("# Time entries ({})\n\n", entries.len());
    for entry in entries {
        md.push_str(&format_entry_markdown(entry, tz));
    }
    md
}

/// Format a recurring generation run as markdown.
pub fn format_generation_markdown(summary: &GenerationSummary) -> String {
    let mut md = format!(
        "# Recurring tasks for {}\n\n- **created**: {}\n- **skipped**: {}\n\n",
        summary.date, summary.created, summary.skipped
    );
    for run in &summary.runs {
        let outcome = match run.outcome {
            GenerationOutcome::Created => "created",
            GenerationOutcome::NotScheduled => "not scheduled",
            GenerationOutcome::AlreadyGenerated => "already generated",
            GenerationOutcome::DuplicateContent => "duplicate",
        };
        md.push_str(&format!("- {}: {}\n", run.content, outcome));
    }
    md
}

/// Format recurring templates as markdown.
pub fn format_templates_markdown(templates: &[RecurringTemplate]) -> String {
    let mut md = format!("# Recurring templates ({})\n\n", templates.len());
    for template in templates {
        let days = if template.weekdays.is_empty() {
            String::new()
        } else {
            let days: Vec<String> = template.weekdays.iter().map(u8::to_string).collect();
            format!(" [{}]", days.join(","))
        };
        let inactive = if template.active { "" } else { " (paused)" };
        let last = template
            .last_generated_date
            .map(|d: NaiveDate| format!(" last {}", d))
            .unwrap_or_default();
        md.push_str(&format!(
            "- {} _{}{}_{}{} `{}`\n",
            template.content, template.frequency, days, inactive, last, template.id
        ));
    }
    md
}

/// Format a task in short form for lists.
fn format_task_short(task: &Task) -> String {
    let check = if task.status == TaskStatus::Done { "x" } else { " " };
    let priority_marker = if task.priority >= PRIORITY_HIGH { "!!! " } else { "" };
    let status = match task.status {
        TaskStatus::InProgress => " _(in progress)_",
        _ => "",
    };

    format!(
        "- [{}] {}{} `{}`{}\n",
        check,
        priority_marker,
        task.content,
        task.display_label(),
        status,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DaySlot, PRIORITY_DEFAULT};
    use std::collections::BTreeMap;

    fn task(content: &str, status: TaskStatus, priority: i32) -> Task {
        Task {
            id: "0190a3b4-0000-7000-8000-000000000000".to_string(),
            owner_id: "o".to_string(),
            display_code: "TASK-7".to_string(),
            content: content.to_string(),
            status,
            priority,
            completed: status == TaskStatus::Done,
            date: None,
            sort_order: 1,
            external_key: None,
            external_url: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn format_parse() {
        assert_eq!(OutputFormat::from_str("JSON"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_str("md"), Some(OutputFormat::Markdown));
        assert_eq!(OutputFormat::from_str("yaml"), None);
    }

    #[test]
    fn short_form_marks_done_and_priority() {
        let done = format_task_short(&task("ship it", TaskStatus::Done, PRIORITY_DEFAULT));
        assert_eq!(done, "- [x] ship it `TASK-7`\n");

        let urgent = format_task_short(&task("fix prod", TaskStatus::InProgress, 5));
        assert_eq!(urgent, "- [ ] !!! fix prod `TASK-7` _(in progress)_\n");
    }

    #[test]
    fn board_lists_days_and_backlog() {
        let monday = NaiveDate::from_ymd_opt(2026, 1, 26).unwrap();
        let mut days = BTreeMap::new();
        days.insert(
            1,
            DaySlot {
                date: monday,
                tasks: vec![task("plan", TaskStatus::Todo, 3)],
                ghosts: vec![],
            },
        );
        let board = WeekBoard {
            week_key: "2026-W05".to_string(),
            prev_week_key: "2026-W04".to_string(),
            next_week_key: "2026-W06".to_string(),
            is_current_week: false,
            days,
            backlog: vec![task("someday", TaskStatus::Backlog, 1)],
        };

        let md = format_board_markdown(&board);
        assert!(md.starts_with("# Week 2026-W05\n"));
        assert!(md.contains("## Monday 2026-01-26"));
        assert!(md.contains("- [ ] plan `TASK-7`"));
        assert!(md.contains("## Backlog (1)"));
    }
}
