//! Task lifecycle: create, read, update, delete and listings.

use super::board::sync_placement_in;
use super::status::{parse_status, reconcile, transition_in};
use super::timers::stop_in;
use super::{Planner, new_id, owned_task, validate_content, validate_priority};
use crate::db::tasks as task_rows;
use crate::error::{PlannerError, PlannerResult};
use crate::types::{NewTask, PRIORITY_DEFAULT, Task, TaskStatus, TaskUpdate};
use chrono::NaiveDate;
use tracing::info;

impl Planner {
    /// Create a task at the end of the owner's manual order.
    pub fn create_task(&self, owner_id: &str, new: NewTask) -> PlannerResult<Task> {
        let content = validate_content(&new.content)?;
        let status = new
            .status
            .as_deref()
            .map(parse_status)
            .transpose()?
            .unwrap_or(TaskStatus::Todo);
        let priority = new
            .priority
            .map(validate_priority)
            .transpose()?
            .unwrap_or(PRIORITY_DEFAULT);
        let now = self.moment(owner_id).ms();

        let task = self.db().transaction(|tx| {
            let task = Task {
                id: new_id(),
                owner_id: owner_id.to_string(),
                display_code: task_rows::next_display_code(tx, owner_id)?,
                content,
                status,
                priority,
                completed: status == TaskStatus::Done,
                date: new.date,
                sort_order: task_rows::next_sort_order(tx, owner_id)?,
                external_key: None,
                external_url: None,
                created_at: now,
                updated_at: now,
            };
            task_rows::insert_task(tx, &task)?;
            sync_placement_in(tx, &task, now)?;
            Ok::<_, PlannerError>(task)
        })?;

        info!(owner = owner_id, task = %task.display_code, "Task created");
        Ok(task)
    }

    pub fn get_task(&self, owner_id: &str, task_id: &str) -> PlannerResult<Task> {
        self.db().with_conn(|conn| owned_task(conn, owner_id, task_id))
    }

    /// Apply a partial update.
    ///
    /// Status and completion go through the state machine, so an update that
    /// enters `in_progress` or `done` has the same timer side effects as
    /// [`Planner::change_status`]. Everything is validated before any write.
    pub fn update_task(&self, owner_id: &str, task_id: &str, update: TaskUpdate) -> PlannerResult<Task> {
        let status = update.status.as_deref().map(parse_status).transpose()?;
        let content = update.content.as_deref().map(validate_content).transpose()?;
        let priority = update.priority.map(validate_priority).transpose()?;
        let now = self.moment(owner_id);

        self.db().transaction(|tx| {
            let mut task = owned_task(tx, owner_id, task_id)?;
            let target = reconcile(task.status, status, update.completed);

            let mut dirty = false;
            if let Some(content) = content {
                task.content = content;
                dirty = true;
            }
            if let Some(priority) = priority {
                task.priority = priority;
                dirty = true;
            }
            let date_changed = match update.date {
                Some(date) if date != task.date => {
                    task.date = date;
                    true
                }
                _ => false,
            };

            if dirty || date_changed {
                task.updated_at = now.ms();
                task_rows::save_task(tx, &task)?;
            }
            if date_changed {
                sync_placement_in(tx, &task, now.ms())?;
            }

            transition_in(tx, task, target, &now)
        })
    }

    /// Delete a task. Its running timer, if any, is closed first.
    pub fn delete_task(&self, owner_id: &str, task_id: &str) -> PlannerResult<()> {
        let now = self.moment(owner_id).ms();
        let task = self.db().transaction(|tx| {
            let task = owned_task(tx, owner_id, task_id)?;
            stop_in(tx, &task, now)?;
            task_rows::delete_task_row(tx, &task.id)?;
            Ok::<_, PlannerError>(task)
        })?;

        info!(owner = owner_id, task = %task.display_code, "Task deleted");
        Ok(())
    }

    /// Tasks dated on `date`.
    pub fn tasks_for_date(&self, owner_id: &str, date: NaiveDate) -> PlannerResult<Vec<Task>> {
        Ok(self
            .db()
            .with_conn(|conn| task_rows::tasks_for_date(conn, owner_id, date))?)
    }

    /// Undated, incomplete tasks.
    pub fn backlog(&self, owner_id: &str) -> PlannerResult<Vec<Task>> {
        Ok(self.db().with_conn(|conn| task_rows::backlog(conn, owner_id))?)
    }

    /// Incomplete tasks dated before `date`, candidates for carry-over.
    pub fn pending_from_previous_dates(
        &self,
        owner_id: &str,
        date: NaiveDate,
    ) -> PlannerResult<Vec<Task>> {
        Ok(self
            .db()
            .with_conn(|conn| task_rows::pending_before(conn, owner_id, date))?)
    }

    /// Attach or clear the link to an external tracker.
    pub fn link_external(
        &self,
        owner_id: &str,
        task_id: &str,
        key: Option<&str>,
        url: Option<&str>,
    ) -> PlannerResult<Task> {
        let now = self.moment(owner_id).ms();
        self.db().transaction(|tx| {
            let mut task = owned_task(tx, owner_id, task_id)?;
            task_rows::set_external_link(tx, &task.id, key, url, now)?;
            task.external_key = key.map(str::to_string);
            task.external_url = url.map(str::to_string);
            task.updated_at = now;
            Ok(task)
        })
    }

    pub fn find_by_external_key(&self, owner_id: &str, key: &str) -> PlannerResult<Option<Task>> {
        Ok(self
            .db()
            .with_conn(|conn| task_rows::find_by_external_key(conn, owner_id, key))?)
    }
}
