//! Weekly board: day assignment, backlog, reordering and carry-over.
//!
//! A task's calendar date is the source of truth. Placements are a projection
//! of it, kept in sync by [`sync_placement_in`] whenever a date changes.

use super::{Planner, new_id, owned_placement, owned_task, owned_tasks};
use crate::db::{placements, tasks as task_rows};
use crate::error::{PlannerError, PlannerResult};
use crate::types::{
    CarryOverSelectedResult, CarryOverWeekResult, DaySlot, Placement, Task, WeekBoard,
};
use crate::week::{FIRST_WEEKDAY, LAST_WEEKDAY, WeekKey, business_weekday, validate_weekday};
use chrono::{Duration, NaiveDate};
use rusqlite::Connection;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Bring the task's placement in line with its calendar date.
///
/// A dated weekday task gets a current placement in its slot; moving it
/// leaves the old placement behind as a ghost linked to the new one. Undated
/// and weekend tasks have no current placement.
pub(crate) fn sync_placement_in(conn: &Connection, task: &Task, now: i64) -> PlannerResult<()> {
    let current = placements::current_for_task(conn, &task.id)?;
    let target = task
        .date
        .and_then(|date| business_weekday(date).map(|weekday| (WeekKey::containing(date), weekday)));

    let Some((week, weekday)) = target else {
        if let Some(current) = current {
            placements::make_ghost(conn, &current.id, now)?;
            debug!(task = %task.display_code, "Placement retired");
        }
        return Ok(());
    };

    let week_key = week.to_string();
    if let Some(current) = &current
        && current.week_key == week_key
        && current.weekday == weekday
    {
        return Ok(());
    }

    // The predecessor is the live placement, or the last ghost left without a
    // successor when the task went to the backlog.
    let predecessor = match current {
        Some(current) => {
            placements::make_ghost(conn, &current.id, now)?;
            Some(current.id)
        }
        None => placements::history_for_task(conn, &task.id)?
            .pop()
            .filter(|last| !last.is_current && last.moved_to_id.is_none())
            .map(|last| last.id),
    };

    let placement = Placement {
        id: new_id(),
        owner_id: task.owner_id.clone(),
        task_id: task.id.clone(),
        sort_order: placements::next_slot_order(conn, &task.owner_id, &week_key, weekday)?,
        week_key,
        weekday,
        is_current: true,
        moved_to_id: None,
        created_at: now,
        updated_at: now,
    };
    placements::insert_placement(conn, &placement)?;

    if let Some(predecessor) = predecessor {
        placements::link_ghost(conn, &predecessor, &placement.id, now)?;
    }

    debug!(
        task = %task.display_code,
        week = %placement.week_key,
        weekday = placement.weekday,
        "Placement projected"
    );
    Ok(())
}

/// Write a new date for a task and project its placement.
fn move_task_in(conn: &Connection, mut task: Task, date: Option<NaiveDate>, now: i64) -> PlannerResult<Task> {
    if task.date != date {
        task.date = date;
        task.updated_at = now;
        task_rows::save_task(conn, &task)?;
    }
    sync_placement_in(conn, &task, now)?;
    Ok(task)
}

impl Planner {
    /// Put a task on a weekday of a week.
    pub fn assign_to_day(
        &self,
        owner_id: &str,
        task_id: &str,
        week_key: &str,
        weekday: i64,
    ) -> PlannerResult<Task> {
        let week = WeekKey::parse(week_key)?;
        let weekday = validate_weekday(weekday)?;
        let date = week.date_for(weekday)?;
        let now = self.moment(owner_id).ms();

        let task = self.db().transaction(|tx| {
            let task = owned_task(tx, owner_id, task_id)?;
            move_task_in(tx, task, Some(date), now)
        })?;

        info!(owner = owner_id, task = %task.display_code, week = %week, weekday, "Task assigned to day");
        Ok(task)
    }

    /// Clear a task's date. It leaves every day view and joins the backlog.
    pub fn move_to_backlog(&self, owner_id: &str, task_id: &str) -> PlannerResult<Task> {
        let now = self.moment(owner_id).ms();
        let task = self.db().transaction(|tx| {
            let task = owned_task(tx, owner_id, task_id)?;
            move_task_in(tx, task, None, now)
        })?;

        info!(owner = owner_id, task = %task.display_code, "Task moved to backlog");
        Ok(task)
    }

    /// Set intra-day order values for placements of one slot.
    ///
    /// Every placement must belong to the owner, sit in the named slot and be
    /// current. Ghosts are history and are never reordered; membership never
    /// changes.
    pub fn reorder_slot(
        &self,
        owner_id: &str,
        week_key: &str,
        weekday: i64,
        orders: &[(String, i64)],
    ) -> PlannerResult<()> {
        let week = WeekKey::parse(week_key)?.to_string();
        let weekday = validate_weekday(weekday)?;
        if let Some((_, order)) = orders.iter().find(|(_, order)| *order < 0) {
            return Err(PlannerError::invalid_value(
                "order",
                format!("Order must be zero or greater, got {}", order),
            ));
        }
        let now = self.moment(owner_id).ms();

        self.db().transaction(|tx| {
            for (placement_id, order) in orders {
                let placement = owned_placement(tx, owner_id, placement_id)?;
                if placement.week_key != week || placement.weekday != weekday {
                    return Err(PlannerError::invalid_value(
                        "placement_id",
                        format!(
                            "Placement {} is in {} day {}, not {} day {}",
                            placement_id, placement.week_key, placement.weekday, week, weekday
                        ),
                    ));
                }
                if !placement.is_current {
                    return Err(PlannerError::invalid_value(
                        "placement_id",
                        format!("Placement {} is a ghost and keeps its order", placement_id),
                    ));
                }
                placements::update_order(tx, placement_id, *order, now)?;
            }
            Ok(())
        })?;

        info!(owner = owner_id, week = %week, weekday, count = orders.len(), "Slot reordered");
        Ok(())
    }

    /// Move every incomplete Monday..Friday task of a week seven days ahead.
    ///
    /// Tasks landing on a slot that already holds tasks are appended; nothing
    /// is merged.
    pub fn carry_over_week(&self, owner_id: &str, week_key: &str) -> PlannerResult<CarryOverWeekResult> {
        let week = WeekKey::parse(week_key)?;
        let now = self.moment(owner_id).ms();

        let moved = self.db().transaction(|tx| {
            let tasks = task_rows::incomplete_in_range(tx, owner_id, week.monday(), week.friday())?;
            let count = tasks.len();
            for task in tasks {
                let next = task.date.map(|date| date + Duration::days(7));
                move_task_in(tx, task, next, now)?;
            }
            Ok::<_, PlannerError>(count)
        })?;

        let next_week_key = week.next()?.to_string();
        info!(owner = owner_id, week = %week, next = %next_week_key, moved, "Week carried over");
        Ok(CarryOverWeekResult {
            moved_count: moved as i32,
            next_week_key,
        })
    }

    /// Set the date of an explicit list of tasks.
    ///
    /// Ownership of every id is checked before anything is written.
    pub fn carry_over_selected(
        &self,
        owner_id: &str,
        task_ids: &[String],
        target: NaiveDate,
    ) -> PlannerResult<CarryOverSelectedResult> {
        if task_ids.is_empty() {
            return Err(PlannerError::missing_field("task_ids"));
        }
        let mut ids = task_ids.to_vec();
        ids.sort();
        ids.dedup();
        let now = self.moment(owner_id).ms();

        let (moved, tasks) = self.db().transaction(|tx| {
            let mut moved = 0;
            for task in owned_tasks(tx, owner_id, &ids)? {
                if task.date != Some(target) {
                    moved += 1;
                }
                move_task_in(tx, task, Some(target), now)?;
            }
            Ok::<_, PlannerError>((moved, task_rows::tasks_by_ids(tx, &ids)?))
        })?;

        info!(owner = owner_id, date = %target, moved, "Tasks carried over");
        Ok(CarryOverSelectedResult {
            moved_count: moved,
            tasks,
        })
    }

    /// Five weekday columns plus the backlog.
    pub fn get_week_board(&self, owner_id: &str, week_key: &str) -> PlannerResult<WeekBoard> {
        let week = WeekKey::parse(week_key)?;
        let key = week.to_string();
        let is_current_week = key == self.current_week_key(owner_id);

        self.db().with_conn(|conn| {
            let mut days = BTreeMap::new();
            for weekday in FIRST_WEEKDAY..=LAST_WEEKDAY {
                let date = week.date_for(weekday)?;
                days.insert(
                    weekday,
                    DaySlot {
                        date,
                        tasks: task_rows::tasks_for_date(conn, owner_id, date)?,
                        ghosts: placements::slot_ghosts(conn, owner_id, &key, weekday)?,
                    },
                );
            }

            Ok(WeekBoard {
                prev_week_key: week.prev()?.to_string(),
                next_week_key: week.next()?.to_string(),
                week_key: key,
                is_current_week,
                days,
                backlog: task_rows::backlog(conn, owner_id)?,
            })
        })
    }

    /// Current placements of a slot in intra-day order.
    pub fn slot_placements(
        &self,
        owner_id: &str,
        week_key: &str,
        weekday: i64,
    ) -> PlannerResult<Vec<Placement>> {
        let week = WeekKey::parse(week_key)?.to_string();
        let weekday = validate_weekday(weekday)?;
        Ok(self
            .db()
            .with_conn(|conn| placements::slot_current(conn, owner_id, &week, weekday))?)
    }

    /// Every placement a task has had, oldest first.
    pub fn placement_history(&self, owner_id: &str, task_id: &str) -> PlannerResult<Vec<Placement>> {
        self.db().with_conn(|conn| {
            owned_task(conn, owner_id, task_id)?;
            Ok(placements::history_for_task(conn, task_id)?)
        })
    }
}
