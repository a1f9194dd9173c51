//! Recurring template storage.

use super::{date_column, date_param, optional};
use crate::types::RecurringTemplate;
use chrono::NaiveDate;
use rusqlite::{Connection, Row, params};

const TEMPLATE_COLUMNS: &str = "id, owner_id, content, frequency, weekdays, active,
     last_generated_date, created_at, updated_at";

fn parse_template_row(row: &Row) -> rusqlite::Result<RecurringTemplate> {
    let weekdays_json: String = row.get("weekdays")?;
    let weekdays: Vec<u8> = serde_json::from_str(&weekdays_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(RecurringTemplate {
        id: row.get("id")?,
        owner_id: row.get("owner_id")?,
        content: row.get("content")?,
        frequency: row.get("frequency")?,
        weekdays,
        active: row.get("active")?,
        last_generated_date: date_column(row, "last_generated_date")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn weekdays_param(weekdays: &[u8]) -> rusqlite::Result<String> {
    serde_json::to_string(weekdays).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

pub(crate) fn get_template_internal(
    conn: &Connection,
    template_id: &str,
) -> rusqlite::Result<Option<RecurringTemplate>> {
    let sql = format!(
        "SELECT {} FROM recurring_templates WHERE id = ?1",
        TEMPLATE_COLUMNS
    );
    optional(conn.query_row(&sql, params![template_id], parse_template_row))
}

pub(crate) fn insert_template(conn: &Connection, template: &RecurringTemplate) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO recurring_templates (
            id, owner_id, content, frequency, weekdays, active,
            last_generated_date, created_at, updated_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            template.id,
            template.owner_id,
            template.content,
            template.frequency,
            weekdays_param(&template.weekdays)?,
            template.active,
            template.last_generated_date.map(date_param),
            template.created_at,
            template.updated_at,
        ],
    )?;
    Ok(())
}

/// Persist the user-editable fields of a template.
pub(crate) fn save_template(conn: &Connection, template: &RecurringTemplate) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE recurring_templates SET
            content = ?1, frequency = ?2, weekdays = ?3, active = ?4, updated_at = ?5
         WHERE id = ?6",
        params![
            template.content,
            template.frequency,
            weekdays_param(&template.weekdays)?,
            template.active,
            template.updated_at,
            template.id,
        ],
    )?;
    Ok(())
}

pub(crate) fn delete_template_row(conn: &Connection, template_id: &str) -> rusqlite::Result<bool> {
    let deleted = conn.execute(
        "DELETE FROM recurring_templates WHERE id = ?1",
        params![template_id],
    )?;
    Ok(deleted > 0)
}

pub(crate) fn set_last_generated(
    conn: &Connection,
    template_id: &str,
    date: NaiveDate,
    now: i64,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE recurring_templates SET last_generated_date = ?1, updated_at = ?2 WHERE id = ?3",
        params![date_param(date), now, template_id],
    )?;
    Ok(())
}

/// All templates of an owner, newest first.
pub(crate) fn list_for_owner(conn: &Connection, owner_id: &str) -> rusqlite::Result<Vec<RecurringTemplate>> {
    let sql = format!(
        "SELECT {} FROM recurring_templates WHERE owner_id = ?1
         ORDER BY created_at DESC, id DESC",
        TEMPLATE_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let templates = stmt
        .query_map(params![owner_id], parse_template_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(templates)
}

/// Active templates of an owner, oldest first.
pub(crate) fn active_for_owner(conn: &Connection, owner_id: &str) -> rusqlite::Result<Vec<RecurringTemplate>> {
    let sql = format!(
        "SELECT {} FROM recurring_templates WHERE owner_id = ?1 AND active = 1
         ORDER BY created_at ASC, id ASC",
        TEMPLATE_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let templates = stmt
        .query_map(params![owner_id], parse_template_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(templates)
}
