//! Recurring templates and daily task generation.

use super::board::sync_placement_in;
use super::{Planner, new_id, owned_template, validate_content};
use crate::db::{tasks as task_rows, templates};
use crate::error::{PlannerError, PlannerResult};
use crate::types::{
    Frequency, GenerationOutcome, GenerationSummary, PRIORITY_DEFAULT, RecurringTemplate, Task,
    TaskStatus, TemplateInput, TemplateRun,
};
use chrono::{Datelike, NaiveDate};
use rusqlite::Connection;
use tracing::{debug, info};

/// Validate ISO weekdays (1..=7), returning them sorted and de-duplicated.
pub(crate) fn normalize_weekdays(weekdays: &[u8]) -> PlannerResult<Vec<u8>> {
    if let Some(bad) = weekdays.iter().find(|d| !(1u8..=7).contains(*d)) {
        return Err(PlannerError::invalid_value(
            "weekdays",
            format!("Weekdays must be between 1 (Monday) and 7 (Sunday), got {}", bad),
        ));
    }
    let mut days = weekdays.to_vec();
    days.sort_unstable();
    days.dedup();
    Ok(days)
}

/// Whether a template's schedule includes `date`.
pub fn runs_on(template: &RecurringTemplate, date: NaiveDate) -> bool {
    match template.frequency {
        Frequency::Daily => true,
        Frequency::Weekly => {
            let weekday = date.weekday().number_from_monday() as u8;
            template.weekdays.contains(&weekday)
        }
    }
}

/// Decide and apply one template for one date.
fn generate_one(
    conn: &Connection,
    template: &RecurringTemplate,
    date: NaiveDate,
    now: i64,
) -> PlannerResult<TemplateRun> {
    let mut run = TemplateRun {
        template_id: template.id.clone(),
        content: template.content.clone(),
        outcome: GenerationOutcome::NotScheduled,
        task_id: None,
    };

    if !runs_on(template, date) {
        return Ok(run);
    }
    if template.last_generated_date == Some(date) {
        run.outcome = GenerationOutcome::AlreadyGenerated;
        return Ok(run);
    }
    if task_rows::content_exists_on(conn, &template.owner_id, date, &template.content)? {
        templates::set_last_generated(conn, &template.id, date, now)?;
        run.outcome = GenerationOutcome::DuplicateContent;
        return Ok(run);
    }

    let task = Task {
        id: new_id(),
        owner_id: template.owner_id.clone(),
        display_code: task_rows::next_display_code(conn, &template.owner_id)?,
        content: template.content.clone(),
        status: TaskStatus::Todo,
        priority: PRIORITY_DEFAULT,
        completed: false,
        date: Some(date),
        sort_order: task_rows::next_sort_order(conn, &template.owner_id)?,
        external_key: None,
        external_url: None,
        created_at: now,
        updated_at: now,
    };
    task_rows::insert_task(conn, &task)?;
    sync_placement_in(conn, &task, now)?;
    templates::set_last_generated(conn, &template.id, date, now)?;

    run.outcome = GenerationOutcome::Created;
    run.task_id = Some(task.id);
    Ok(run)
}

impl Planner {
    /// Spawn today's tasks from the owner's active templates.
    ///
    /// Safe to re-run for the same date: a second run creates nothing and
    /// reports every scheduled template as skipped.
    pub fn generate_for_date(&self, owner_id: &str, date: NaiveDate) -> PlannerResult<GenerationSummary> {
        let now = self.moment(owner_id).ms();

        let runs = self.db().transaction(|tx| {
            templates::active_for_owner(tx, owner_id)?
                .iter()
                .map(|template| generate_one(tx, template, date, now))
                .collect::<PlannerResult<Vec<_>>>()
        })?;

        for run in &runs {
            debug!(template = %run.template_id, outcome = ?run.outcome, "Recurring template evaluated");
        }

        let created = runs
            .iter()
            .filter(|run| run.outcome == GenerationOutcome::Created)
            .count() as i32;
        let summary = GenerationSummary {
            date,
            created,
            skipped: runs.len() as i32 - created,
            runs,
        };

        info!(
            owner = owner_id,
            date = %date,
            created = summary.created,
            skipped = summary.skipped,
            "Recurring tasks generated"
        );
        Ok(summary)
    }

    pub fn create_template(&self, owner_id: &str, input: TemplateInput) -> PlannerResult<RecurringTemplate> {
        let content = validate_content(&input.content)?;
        let weekdays = normalize_weekdays(&input.weekdays)?;
        let now = self.moment(owner_id).ms();

        let template = RecurringTemplate {
            id: new_id(),
            owner_id: owner_id.to_string(),
            content,
            frequency: input.frequency,
            weekdays,
            active: input.active,
            last_generated_date: None,
            created_at: now,
            updated_at: now,
        };
        self.db()
            .transaction(|tx| templates::insert_template(tx, &template))?;

        info!(owner = owner_id, template = %template.id, frequency = %template.frequency, "Recurring template created");
        Ok(template)
    }

    /// Replace the editable fields of a template. `last_generated_date` is kept.
    pub fn update_template(
        &self,
        owner_id: &str,
        template_id: &str,
        input: TemplateInput,
    ) -> PlannerResult<RecurringTemplate> {
        let content = validate_content(&input.content)?;
        let weekdays = normalize_weekdays(&input.weekdays)?;
        let now = self.moment(owner_id).ms();

        self.db().transaction(|tx| {
            let mut template = owned_template(tx, owner_id, template_id)?;
            template.content = content;
            template.frequency = input.frequency;
            template.weekdays = weekdays;
            template.active = input.active;
            template.updated_at = now;
            templates::save_template(tx, &template)?;
            Ok(template)
        })
    }

    /// Flip the active flag.
    pub fn toggle_template(&self, owner_id: &str, template_id: &str) -> PlannerResult<RecurringTemplate> {
        let now = self.moment(owner_id).ms();
        let template = self.db().transaction(|tx| {
            let mut template = owned_template(tx, owner_id, template_id)?;
            template.active = !template.active;
            template.updated_at = now;
            templates::save_template(tx, &template)?;
            Ok::<_, PlannerError>(template)
        })?;

        info!(owner = owner_id, template = %template.id, active = template.active, "Recurring template toggled");
        Ok(template)
    }

    /// Delete a template. Tasks it already produced stay.
    pub fn delete_template(&self, owner_id: &str, template_id: &str) -> PlannerResult<()> {
        self.db().transaction(|tx| {
            owned_template(tx, owner_id, template_id)?;
            templates::delete_template_row(tx, template_id)?;
            Ok::<_, PlannerError>(())
        })?;

        info!(owner = owner_id, template = template_id, "Recurring template deleted");
        Ok(())
    }

    pub fn get_template(&self, owner_id: &str, template_id: &str) -> PlannerResult<RecurringTemplate> {
        self.db()
            .with_conn(|conn| owned_template(conn, owner_id, template_id))
    }

    /// All of the owner's templates, newest first.
    pub fn list_templates(&self, owner_id: &str) -> PlannerResult<Vec<RecurringTemplate>> {
        Ok(self
            .db()
            .with_conn(|conn| templates::list_for_owner(conn, owner_id))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn template(frequency: Frequency, weekdays: Vec<u8>) -> RecurringTemplate {
        RecurringTemplate {
            id: "t".to_string(),
            owner_id: "o".to_string(),
            content: "standup".to_string(),
            frequency,
            weekdays,
            active: true,
            last_generated_date: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn weekdays_are_sorted_and_unique() {
        assert_eq!(normalize_weekdays(&[5, 1, 3, 1]).unwrap(), vec![1, 3, 5]);
        assert_eq!(normalize_weekdays(&[]).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn weekdays_out_of_range_rejected() {
        for bad in [[0u8], [8u8]] {
            let err = normalize_weekdays(&bad).unwrap_err();
            assert_eq!(err.code, ErrorCode::InvalidFieldValue);
            assert_eq!(err.field.as_deref(), Some("weekdays"));
        }
    }

    #[test]
    fn daily_runs_every_day() {
        let t = template(Frequency::Daily, vec![]);
        // Saturday and Sunday included.
        for d in 26..=31 {
            assert!(runs_on(&t, date(2026, 1, d)));
        }
        assert!(runs_on(&t, date(2026, 2, 1)));
    }

    #[test]
    fn weekly_runs_on_listed_days_only() {
        let t = template(Frequency::Weekly, vec![1, 3, 7]);
        assert!(runs_on(&t, date(2026, 1, 26))); // Monday
        assert!(!runs_on(&t, date(2026, 1, 27))); // Tuesday
        assert!(runs_on(&t, date(2026, 1, 28))); // Wednesday
        assert!(runs_on(&t, date(2026, 2, 1))); // Sunday
    }

    #[test]
    fn weekly_without_weekdays_never_runs() {
        let t = template(Frequency::Weekly, vec![]);
        for d in 26..=31 {
            assert!(!runs_on(&t, date(2026, 1, d)));
        }
    }
}
