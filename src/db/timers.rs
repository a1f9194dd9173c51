//! Timer entry storage.

use super::{date_column, date_param, optional};
use crate::types::TimerEntry;
use chrono::NaiveDate;
use rusqlite::{Connection, Row, params};

const ENTRY_COLUMNS: &str = "id, owner_id, task_id, log_date, start_at, end_at,
     description, category_id, created_at, updated_at";

fn parse_entry_row(row: &Row) -> rusqlite::Result<TimerEntry> {
    let log_date = date_column(row, "log_date")?.ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(0, "log_date".to_string(), rusqlite::types::Type::Null)
    })?;
    Ok(TimerEntry {
        id: row.get("id")?,
        owner_id: row.get("owner_id")?,
        task_id: row.get("task_id")?,
        log_date,
        start_at: row.get("start_at")?,
        end_at: row.get("end_at")?,
        description: row.get("description")?,
        category_id: row.get("category_id")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn query_entries(
    conn: &Connection,
    sql_tail: &str,
    params: impl rusqlite::Params,
) -> rusqlite::Result<Vec<TimerEntry>> {
    let sql = format!("SELECT {} FROM timer_entries WHERE {}", ENTRY_COLUMNS, sql_tail);
    let mut stmt = conn.prepare(&sql)?;
    let entries = stmt
        .query_map(params, parse_entry_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(entries)
}

pub(crate) fn get_entry_internal(conn: &Connection, entry_id: &str) -> rusqlite::Result<Option<TimerEntry>> {
    let sql = format!("SELECT {} FROM timer_entries WHERE id = ?1", ENTRY_COLUMNS);
    optional(conn.query_row(&sql, params![entry_id], parse_entry_row))
}

/// The owner's open entry, if any.
pub(crate) fn running_for_owner(conn: &Connection, owner_id: &str) -> rusqlite::Result<Option<TimerEntry>> {
    let sql = format!(
        "SELECT {} FROM timer_entries WHERE owner_id = ?1 AND end_at IS NULL",
        ENTRY_COLUMNS
    );
    optional(conn.query_row(&sql, params![owner_id], parse_entry_row))
}

/// The open entry attached to a task, if any.
pub(crate) fn running_for_task(conn: &Connection, task_id: &str) -> rusqlite::Result<Option<TimerEntry>> {
    let sql = format!(
        "SELECT {} FROM timer_entries WHERE task_id = ?1 AND end_at IS NULL
         ORDER BY start_at DESC LIMIT 1",
        ENTRY_COLUMNS
    );
    optional(conn.query_row(&sql, params![task_id], parse_entry_row))
}

pub(crate) fn insert_entry(conn: &Connection, entry: &TimerEntry) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO timer_entries (
            id, owner_id, task_id, log_date, start_at, end_at,
            description, category_id, created_at, updated_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            entry.id,
            entry.owner_id,
            entry.task_id,
            date_param(entry.log_date),
            entry.start_at,
            entry.end_at,
            entry.description,
            entry.category_id,
            entry.created_at,
            entry.updated_at,
        ],
    )?;
    Ok(())
}

/// Close an entry at `end_at`. No-op when it is already closed.
pub(crate) fn close_entry(conn: &Connection, entry_id: &str, end_at: i64) -> rusqlite::Result<bool> {
    let updated = conn.execute(
        "UPDATE timer_entries SET end_at = ?1, updated_at = ?1
         WHERE id = ?2 AND end_at IS NULL",
        params![end_at, entry_id],
    )?;
    Ok(updated > 0)
}

/// Write back the editable fields of an entry.
pub(crate) fn save_entry(conn: &Connection, entry: &TimerEntry) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE timer_entries SET
            start_at = ?1, end_at = ?2, description = ?3, category_id = ?4, updated_at = ?5
         WHERE id = ?6",
        params![
            entry.start_at,
            entry.end_at,
            entry.description,
            entry.category_id,
            entry.updated_at,
            entry.id,
        ],
    )?;
    Ok(())
}

pub(crate) fn delete_entry(conn: &Connection, entry_id: &str) -> rusqlite::Result<bool> {
    let deleted = conn.execute("DELETE FROM timer_entries WHERE id = ?1", params![entry_id])?;
    Ok(deleted > 0)
}

/// Close every open entry of an owner. Returns the task ids that were running.
pub(crate) fn close_all_for_owner(
    conn: &Connection,
    owner_id: &str,
    end_at: i64,
) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "UPDATE timer_entries SET end_at = ?1, updated_at = ?1
         WHERE owner_id = ?2 AND end_at IS NULL
         RETURNING task_id",
    )?;
    let task_ids = stmt
        .query_map(params![end_at, owner_id], |row| row.get::<_, Option<String>>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(task_ids.into_iter().flatten().collect())
}

/// Entries logged on a date, newest first.
pub(crate) fn entries_for_date(
    conn: &Connection,
    owner_id: &str,
    date: NaiveDate,
) -> rusqlite::Result<Vec<TimerEntry>> {
    query_entries(
        conn,
        "owner_id = ?1 AND log_date = ?2 ORDER BY start_at DESC, id DESC",
        params![owner_id, date_param(date)],
    )
}

/// Entries of one task, newest first.
pub(crate) fn entries_for_task(conn: &Connection, task_id: &str) -> rusqlite::Result<Vec<TimerEntry>> {
    query_entries(
        conn,
        "task_id = ?1 ORDER BY start_at DESC, id DESC",
        params![task_id],
    )
}
