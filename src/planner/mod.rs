//! Task lifecycle and time-allocation engine.
//!
//! [`Planner`] is the single entry point. Its methods are grouped by concern:
//!
//! - `tasks`: create, read, update, delete and listings
//! - `status`: status transitions and the completion flag
//! - `timers`: the single-running-timer coordinator and manual time entries
//! - `recurring`: recurring templates and daily generation
//! - `board`: weekly placements, reordering and carry-over
//!
//! Every operation takes the acting owner explicitly. Ids that resolve to
//! another owner's record fail with [`ErrorCode::Forbidden`]; ids that do not
//! resolve at all fail with a not-found code. Multi-write operations run in one
//! IMMEDIATE transaction and either fully apply or leave nothing behind.
//!
//! [`ErrorCode::Forbidden`]: crate::error::ErrorCode::Forbidden

mod board;
mod recurring;
mod status;
mod tasks;
mod timers;

use crate::clock::{Clock, Moment, SystemClock, Timezones};
use crate::db::Database;
use crate::db::{placements, tasks as task_rows, templates, timers as timer_rows};
use crate::error::{PlannerError, PlannerResult};
use crate::types::{Placement, RecurringTemplate, Task, TimerEntry};
use crate::week::WeekKey;
use chrono::NaiveDate;
use rusqlite::Connection;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// Owner-scoped planner service. Cheap to clone; clones share storage.
#[derive(Clone)]
pub struct Planner {
    db: Arc<Database>,
    clock: Arc<dyn Clock>,
    zones: Arc<Timezones>,
}

impl Planner {
    pub fn new(db: Database, clock: Arc<dyn Clock>, zones: Timezones) -> Self {
        Self {
            db: Arc::new(db),
            clock,
            zones: Arc::new(zones),
        }
    }

    /// Planner driven by the wall clock.
    pub fn with_system_clock(db: Database, zones: Timezones) -> Self {
        Self::new(db, Arc::new(SystemClock), zones)
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn timezones(&self) -> &Timezones {
        &self.zones
    }

    /// The current instant in the owner's timezone.
    pub fn moment(&self, owner_id: &str) -> Moment {
        Moment::new(self.clock.now(), self.zones.for_owner(owner_id))
    }

    /// Owner-local calendar date.
    pub fn today(&self, owner_id: &str) -> NaiveDate {
        self.moment(owner_id).today()
    }

    /// Week key of the owner's current week, e.g. `2026-W05`.
    pub fn current_week_key(&self, owner_id: &str) -> String {
        WeekKey::containing(self.today(owner_id)).to_string()
    }
}

pub(crate) fn new_id() -> String {
    Uuid::now_v7().to_string()
}

fn check_owner(entity: &str, id: &str, actual: &str, owner_id: &str) -> PlannerResult<()> {
    if actual == owner_id {
        return Ok(());
    }
    warn!(entity, id, owner = owner_id, "Rejected access to another owner's record");
    Err(PlannerError::forbidden(entity, id))
}

/// Load a task the owner holds.
pub(crate) fn owned_task(conn: &Connection, owner_id: &str, task_id: &str) -> PlannerResult<Task> {
    let task = task_rows::get_task_internal(conn, task_id)?
        .ok_or_else(|| PlannerError::task_not_found(task_id))?;
    check_owner("Task", task_id, &task.owner_id, owner_id)?;
    Ok(task)
}

/// Load several tasks the owner holds. Fails on the first missing or foreign id.
pub(crate) fn owned_tasks(
    conn: &Connection,
    owner_id: &str,
    task_ids: &[String],
) -> PlannerResult<Vec<Task>> {
    task_ids
        .iter()
        .map(|id| owned_task(conn, owner_id, id))
        .collect()
}

pub(crate) fn owned_template(
    conn: &Connection,
    owner_id: &str,
    template_id: &str,
) -> PlannerResult<RecurringTemplate> {
    let template = templates::get_template_internal(conn, template_id)?
        .ok_or_else(|| PlannerError::template_not_found(template_id))?;
    check_owner("Recurring template", template_id, &template.owner_id, owner_id)?;
    Ok(template)
}

pub(crate) fn owned_placement(
    conn: &Connection,
    owner_id: &str,
    placement_id: &str,
) -> PlannerResult<Placement> {
    let placement = placements::get_placement_internal(conn, placement_id)?
        .ok_or_else(|| PlannerError::placement_not_found(placement_id))?;
    check_owner("Placement", placement_id, &placement.owner_id, owner_id)?;
    Ok(placement)
}

pub(crate) fn owned_entry(conn: &Connection, owner_id: &str, entry_id: &str) -> PlannerResult<TimerEntry> {
    let entry = timer_rows::get_entry_internal(conn, entry_id)?
        .ok_or_else(|| PlannerError::entry_not_found(entry_id))?;
    check_owner("Time entry", entry_id, &entry.owner_id, owner_id)?;
    Ok(entry)
}

/// Trim and bound free-text content.
pub(crate) fn validate_content(content: &str) -> PlannerResult<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(PlannerError::missing_field("content"));
    }
    if trimmed.chars().count() > crate::types::MAX_CONTENT_LEN {
        return Err(PlannerError::invalid_value(
            "content",
            format!(
                "Content must be at most {} characters",
                crate::types::MAX_CONTENT_LEN
            ),
        ));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn validate_priority(priority: i32) -> PlannerResult<i32> {
    use crate::types::{PRIORITY_HIGHEST, PRIORITY_LOWEST};
    if (PRIORITY_LOWEST..=PRIORITY_HIGHEST).contains(&priority) {
        Ok(priority)
    } else {
        Err(PlannerError::invalid_value(
            "priority",
            format!(
                "Priority must be between {} and {}, got {}",
                PRIORITY_LOWEST, PRIORITY_HIGHEST, priority
            ),
        ))
    }
}
