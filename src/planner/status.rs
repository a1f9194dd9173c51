//! Task status state machine.
//!
//! Any status may move to any other. Entering `in_progress` starts a timer when
//! none is running for the task; entering `done` stops the task's running timer
//! first. `completed` is never written independently: it is recomputed from
//! the status in the same write.

use super::timers::{start_in, stop_in};
use super::{Planner, owned_task};
use crate::clock::Moment;
use crate::db::{tasks as task_rows, timers};
use crate::error::{PlannerError, PlannerResult};
use crate::types::{Task, TaskStatus, TaskUpdate};
use rusqlite::Connection;
use tracing::{debug, info};

/// Parse a status name, rejecting unknown values.
pub(crate) fn parse_status(value: &str) -> PlannerResult<TaskStatus> {
    TaskStatus::parse(value).ok_or_else(|| PlannerError::invalid_status(value))
}

/// Resolve the status a write should end in.
///
/// A written status wins. Otherwise a written completion flag decides:
/// `true` forces `done`, `false` on a done task reopens it as `todo`.
pub(crate) fn reconcile(
    current: TaskStatus,
    status: Option<TaskStatus>,
    completed: Option<bool>,
) -> TaskStatus {
    match (status, completed) {
        (Some(status), _) => status,
        (None, Some(true)) => TaskStatus::Done,
        (None, Some(false)) if current == TaskStatus::Done => TaskStatus::Todo,
        (None, _) => current,
    }
}

/// Move a loaded task to `target`, running the timer side effects.
pub(crate) fn transition_in(
    conn: &Connection,
    task: Task,
    target: TaskStatus,
    now: &Moment,
) -> PlannerResult<Task> {
    if task.status == target {
        debug!(task = %task.display_code, status = %target, "Status unchanged");
        return Ok(task);
    }

    let from = task.status;
    let running = timers::running_for_task(conn, &task.id)?.is_some();

    if target == TaskStatus::Done && running {
        stop_in(conn, &task, now.ms())?;
    }

    let mut updated = task;
    updated.status = target;
    updated.completed = target == TaskStatus::Done;
    updated.updated_at = now.ms();
    task_rows::save_task(conn, &updated)?;

    if target == TaskStatus::InProgress && !running {
        start_in(conn, &updated, now)?;
    }

    info!(
        owner = %updated.owner_id,
        task = %updated.display_code,
        from = %from,
        to = %target,
        "Task status changed"
    );
    Ok(updated)
}

impl Planner {
    /// Change a task's status.
    pub fn change_status(&self, owner_id: &str, task_id: &str, status: &str) -> PlannerResult<Task> {
        let target = parse_status(status)?;
        let now = self.moment(owner_id);
        self.db().transaction(|tx| {
            let task = owned_task(tx, owner_id, task_id)?;
            transition_in(tx, task, target, &now)
        })
    }

    /// Set the completion flag; the status follows it.
    pub fn set_completion(&self, owner_id: &str, task_id: &str, completed: bool) -> PlannerResult<Task> {
        self.update_task(
            owner_id,
            task_id,
            TaskUpdate {
                completed: Some(completed),
                ..Default::default()
            },
        )
    }
}
