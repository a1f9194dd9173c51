//! Timer coordination: at most one running entry per owner.
//!
//! Starting a timer closes every open entry of the owner and opens the new one
//! inside a single IMMEDIATE transaction. The partial unique index on
//! `timer_entries(owner_id) WHERE end_at IS NULL` backs this up when another
//! process shares the database file.
//!
//! Entries can also be logged, edited and deleted by hand. Manual times are
//! wall-clock `HH:MM` in the owner's zone on the entry's log date.

use super::{Planner, new_id, owned_entry, owned_task};
use crate::clock::Moment;
use crate::db::{tasks as task_rows, timers};
use crate::error::{PlannerError, PlannerResult};
use crate::types::{
    EntryUpdate, MAX_CONTENT_LEN, NewEntry, TIME_FORMAT, Task, TaskStatus, TimerEntry,
};
use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, TimeZone};
use chrono_tz::Tz;
use rusqlite::Connection;
use tracing::info;

/// Close every running entry of the owner, promote a not-started task, and
/// open a fresh entry for it.
pub(crate) fn start_in(conn: &Connection, task: &Task, now: &Moment) -> PlannerResult<TimerEntry> {
    let ms = now.ms();
    let stopped = timers::close_all_for_owner(conn, &task.owner_id, ms)?;

    if task.status.is_not_started() {
        let mut promoted = task.clone();
        promoted.status = TaskStatus::InProgress;
        promoted.completed = false;
        promoted.updated_at = ms;
        task_rows::save_task(conn, &promoted)?;
    }

    let entry = TimerEntry {
        id: new_id(),
        owner_id: task.owner_id.clone(),
        task_id: Some(task.id.clone()),
        log_date: now.today(),
        start_at: ms,
        end_at: None,
        description: Some(task.content.clone()),
        category_id: None,
        created_at: ms,
        updated_at: ms,
    };
    timers::insert_entry(conn, &entry)?;

    info!(
        owner = %task.owner_id,
        task = %task.display_code,
        stopped = stopped.len(),
        "Timer started"
    );
    Ok(entry)
}

/// Close the task's own running entry, if it has one.
pub(crate) fn stop_in(conn: &Connection, task: &Task, now_ms: i64) -> PlannerResult<Option<TimerEntry>> {
    let Some(mut entry) = timers::running_for_task(conn, &task.id)? else {
        return Ok(None);
    };
    timers::close_entry(conn, &entry.id, now_ms)?;
    entry.end_at = Some(now_ms);
    entry.updated_at = now_ms;

    info!(
        owner = %task.owner_id,
        task = %task.display_code,
        minutes = entry.duration_minutes().unwrap_or_default(),
        "Timer stopped"
    );
    Ok(Some(entry))
}

/// Epoch milliseconds of a wall-clock time on an owner-local date.
fn local_ms(tz: Tz, date: NaiveDate, time: NaiveTime, field: &str) -> PlannerResult<i64> {
    tz.from_local_datetime(&date.and_time(time))
        .earliest()
        .map(|at| at.timestamp_millis())
        .ok_or_else(|| {
            PlannerError::invalid_value(
                field,
                format!("{} {} does not exist in {}", date, time.format(TIME_FORMAT), tz.name()),
            )
        })
}

/// Trim optional text. Blank clears it.
fn optional_text(field: &str, value: Option<String>) -> PlannerResult<Option<String>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > MAX_CONTENT_LEN {
        return Err(PlannerError::invalid_value(
            field,
            format!("{} must be at most {} characters", field, MAX_CONTENT_LEN),
        ));
    }
    Ok(Some(trimmed.to_string()))
}

fn check_span(start_at: i64, end_at: Option<i64>) -> PlannerResult<()> {
    match end_at {
        Some(end_at) if end_at <= start_at => Err(PlannerError::invalid_value(
            "end",
            "End time must be after start time",
        )),
        _ => Ok(()),
    }
}

/// Fail when the owner has a running entry other than `except`.
fn ensure_idle(conn: &Connection, owner_id: &str, except: Option<&str>) -> PlannerResult<()> {
    match timers::running_for_owner(conn, owner_id)? {
        Some(running) if Some(running.id.as_str()) != except => {
            Err(PlannerError::timer_already_running(owner_id))
        }
        _ => Ok(()),
    }
}

impl Planner {
    /// Start working on a task. Any other running timer of the owner stops.
    pub fn start_timer(&self, owner_id: &str, task_id: &str) -> PlannerResult<TimerEntry> {
        let now = self.moment(owner_id);
        self.db().transaction(|tx| {
            let task = owned_task(tx, owner_id, task_id)?;
            start_in(tx, &task, &now)
        })
    }

    /// Stop the task's running timer. Returns `None` when nothing was running.
    pub fn stop_timer(&self, owner_id: &str, task_id: &str) -> PlannerResult<Option<TimerEntry>> {
        let now = self.moment(owner_id).ms();
        self.db().transaction(|tx| {
            let task = owned_task(tx, owner_id, task_id)?;
            stop_in(tx, &task, now)
        })
    }

    /// Close every running timer of the owner. Returns the affected task ids.
    pub fn stop_all(&self, owner_id: &str) -> PlannerResult<Vec<String>> {
        let now = self.moment(owner_id).ms();
        let stopped = self
            .db()
            .transaction(|tx| timers::close_all_for_owner(tx, owner_id, now))?;
        if !stopped.is_empty() {
            info!(owner = owner_id, count = stopped.len(), "Stopped all timers");
        }
        Ok(stopped)
    }

    /// The owner's running entry, if any.
    pub fn running_entry(&self, owner_id: &str) -> PlannerResult<Option<TimerEntry>> {
        Ok(self
            .db()
            .with_conn(|conn| timers::running_for_owner(conn, owner_id))?)
    }

    /// Entries logged on an owner-local date, newest first.
    pub fn entries_for_date(&self, owner_id: &str, date: NaiveDate) -> PlannerResult<Vec<TimerEntry>> {
        Ok(self
            .db()
            .with_conn(|conn| timers::entries_for_date(conn, owner_id, date))?)
    }

    /// Entries of one task, newest first.
    pub fn entries_for_task(&self, owner_id: &str, task_id: &str) -> PlannerResult<Vec<TimerEntry>> {
        self.db().with_conn(|conn| {
            owned_task(conn, owner_id, task_id)?;
            Ok(timers::entries_for_task(conn, task_id)?)
        })
    }

    /// Whether the task has a running timer.
    pub fn is_working(&self, owner_id: &str, task_id: &str) -> PlannerResult<bool> {
        self.db().with_conn(|conn| {
            owned_task(conn, owner_id, task_id)?;
            Ok(timers::running_for_task(conn, task_id)?.is_some())
        })
    }

    /// Start of the task's running timer as RFC 3339 in the owner's zone.
    pub fn working_started_at(&self, owner_id: &str, task_id: &str) -> PlannerResult<Option<String>> {
        let tz = self.timezones().for_owner(owner_id);
        let running = self.db().with_conn(|conn| {
            owned_task(conn, owner_id, task_id)?;
            Ok::<_, PlannerError>(timers::running_for_task(conn, task_id)?)
        })?;

        running
            .map(|entry| {
                DateTime::from_timestamp_millis(entry.start_at)
                    .map(|utc| {
                        utc.with_timezone(&tz)
                            .to_rfc3339_opts(SecondsFormat::Secs, false)
                    })
                    .ok_or_else(|| {
                        PlannerError::internal(format!("Timestamp out of range: {}", entry.start_at))
                    })
            })
            .transpose()
    }

    /// Log time by hand. An entry without an end is opened as the running
    /// timer and fails while another one runs.
    pub fn create_entry(&self, owner_id: &str, input: NewEntry) -> PlannerResult<TimerEntry> {
        let now = self.moment(owner_id);
        let tz = self.timezones().for_owner(owner_id);
        let log_date = input.log_date.unwrap_or_else(|| now.today());
        let start_at = local_ms(tz, log_date, input.start, "start")?;
        let end_at = input
            .end
            .map(|end| local_ms(tz, log_date, end, "end"))
            .transpose()?;
        check_span(start_at, end_at)?;
        let description = optional_text("description", input.description)?;
        let category_id = optional_text("category_id", input.category_id)?;
        let ms = now.ms();

        let entry = self.db().transaction(|tx| {
            if let Some(task_id) = &input.task_id {
                owned_task(tx, owner_id, task_id)?;
            }
            if end_at.is_none() {
                ensure_idle(tx, owner_id, None)?;
            }
            let entry = TimerEntry {
                id: new_id(),
                owner_id: owner_id.to_string(),
                task_id: input.task_id,
                log_date,
                start_at,
                end_at,
                description,
                category_id,
                created_at: ms,
                updated_at: ms,
            };
            timers::insert_entry(tx, &entry)?;
            Ok::<_, PlannerError>(entry)
        })?;

        info!(
            owner = owner_id,
            entry = %entry.id,
            date = %entry.log_date,
            running = entry.is_running(),
            "Time entry logged"
        );
        Ok(entry)
    }

    /// Edit a time entry. Times stay on the entry's log date.
    pub fn update_entry(
        &self,
        owner_id: &str,
        entry_id: &str,
        update: EntryUpdate,
    ) -> PlannerResult<TimerEntry> {
        let tz = self.timezones().for_owner(owner_id);
        let now = self.moment(owner_id).ms();
        let description = update
            .description
            .map(|text| optional_text("description", Some(text)))
            .transpose()?;
        let category_id = update
            .category_id
            .map(|text| optional_text("category_id", Some(text)))
            .transpose()?;

        let entry = self.db().transaction(|tx| {
            let mut entry = owned_entry(tx, owner_id, entry_id)?;
            if let Some(start) = update.start {
                entry.start_at = local_ms(tz, entry.log_date, start, "start")?;
            }
            match update.end {
                None => {}
                Some(Some(end)) => entry.end_at = Some(local_ms(tz, entry.log_date, end, "end")?),
                Some(None) => {
                    ensure_idle(tx, owner_id, Some(entry.id.as_str()))?;
                    entry.end_at = None;
                }
            }
            check_span(entry.start_at, entry.end_at)?;
            if let Some(description) = description {
                entry.description = description;
            }
            if let Some(category_id) = category_id {
                entry.category_id = category_id;
            }
            entry.updated_at = now;
            timers::save_entry(tx, &entry)?;
            Ok::<_, PlannerError>(entry)
        })?;

        info!(owner = owner_id, entry = entry_id, "Time entry updated");
        Ok(entry)
    }

    /// Remove a time entry, running or not.
    pub fn delete_entry(&self, owner_id: &str, entry_id: &str) -> PlannerResult<()> {
        self.db().transaction(|tx| {
            owned_entry(tx, owner_id, entry_id)?;
            timers::delete_entry(tx, entry_id)?;
            Ok::<_, PlannerError>(())
        })?;
        info!(owner = owner_id, entry = entry_id, "Time entry deleted");
        Ok(())
    }

    /// Whole minutes recorded on closed entries of the task.
    pub fn total_time_spent(&self, owner_id: &str, task_id: &str) -> PlannerResult<i64> {
        let entries = self.entries_for_task(owner_id, task_id)?;
        Ok(entries.iter().filter_map(TimerEntry::duration_minutes).sum())
    }
}
