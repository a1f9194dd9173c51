//! Task rows and listing queries.

use super::{date_column, date_param, optional};
use crate::types::Task;
use chrono::NaiveDate;
use rusqlite::{Connection, Row, params, params_from_iter};

const TASK_COLUMNS: &str = "id, owner_id, display_code, content, status, priority, completed,
     task_date, sort_order, external_key, external_url, created_at, updated_at";

/// Listing order: open before done, higher priority first, then manual order,
/// then creation time. `id` is a UUIDv7 and breaks same-millisecond ties.
const ORDERED: &str = "CASE WHEN status = 'done' THEN 1 ELSE 0 END,
     priority DESC, sort_order ASC, created_at ASC, id ASC";

pub fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get("id")?,
        owner_id: row.get("owner_id")?,
        display_code: row.get("display_code")?,
        content: row.get("content")?,
        status: row.get("status")?,
        priority: row.get("priority")?,
        completed: row.get("completed")?,
        date: date_column(row, "task_date")?,
        sort_order: row.get("sort_order")?,
        external_key: row.get("external_key")?,
        external_url: row.get("external_url")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn query_tasks(
    conn: &Connection,
    where_clause: &str,
    params: impl rusqlite::Params,
) -> rusqlite::Result<Vec<Task>> {
    let sql = format!(
        "SELECT {} FROM tasks WHERE {} ORDER BY {}",
        TASK_COLUMNS, where_clause, ORDERED
    );
    let mut stmt = conn.prepare(&sql)?;
    let tasks = stmt
        .query_map(params, parse_task_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(tasks)
}

/// Fetch a task regardless of owner.
pub(crate) fn get_task_internal(conn: &Connection, task_id: &str) -> rusqlite::Result<Option<Task>> {
    let sql = format!("SELECT {} FROM tasks WHERE id = ?1", TASK_COLUMNS);
    optional(conn.query_row(&sql, params![task_id], parse_task_row))
}

/// Allocate the next `TASK-<n>` code. Numbers are never reused.
pub(crate) fn next_display_code(conn: &Connection, owner_id: &str) -> rusqlite::Result<String> {
    let number: i64 = conn.query_row(
        "INSERT INTO owner_sequences (owner_id, last_task_number) VALUES (?1, 1)
         ON CONFLICT(owner_id) DO UPDATE SET last_task_number = last_task_number + 1
         RETURNING last_task_number",
        params![owner_id],
        |row| row.get(0),
    )?;
    Ok(format!("TASK-{}", number))
}

/// Next manual sort order for an owner (max + 1).
pub(crate) fn next_sort_order(conn: &Connection, owner_id: &str) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COALESCE(MAX(sort_order), 0) + 1 FROM tasks WHERE owner_id = ?1",
        params![owner_id],
        |row| row.get(0),
    )
}

pub(crate) fn insert_task(conn: &Connection, task: &Task) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO tasks (
            id, owner_id, display_code, content, status, priority, completed,
            task_date, sort_order, external_key, external_url, created_at, updated_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            task.id,
            task.owner_id,
            task.display_code,
            task.content,
            task.status,
            task.priority,
            task.completed,
            task.date.map(date_param),
            task.sort_order,
            task.external_key,
            task.external_url,
            task.created_at,
            task.updated_at,
        ],
    )?;
    Ok(())
}

/// Persist the mutable fields of a task.
pub(crate) fn save_task(conn: &Connection, task: &Task) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE tasks SET
            content = ?1, status = ?2, priority = ?3, completed = ?4,
            task_date = ?5, updated_at = ?6
         WHERE id = ?7",
        params![
            task.content,
            task.status,
            task.priority,
            task.completed,
            task.date.map(date_param),
            task.updated_at,
            task.id,
        ],
    )?;
    Ok(())
}

pub(crate) fn delete_task_row(conn: &Connection, task_id: &str) -> rusqlite::Result<bool> {
    let deleted = conn.execute("DELETE FROM tasks WHERE id = ?1", params![task_id])?;
    Ok(deleted > 0)
}

pub(crate) fn set_external_link(
    conn: &Connection,
    task_id: &str,
    key: Option<&str>,
    url: Option<&str>,
    now: i64,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE tasks SET external_key = ?1, external_url = ?2, updated_at = ?3 WHERE id = ?4",
        params![key, url, now, task_id],
    )?;
    Ok(())
}

pub(crate) fn find_by_external_key(
    conn: &Connection,
    owner_id: &str,
    key: &str,
) -> rusqlite::Result<Option<Task>> {
    let sql = format!(
        "SELECT {} FROM tasks WHERE owner_id = ?1 AND external_key = ?2 LIMIT 1",
        TASK_COLUMNS
    );
    optional(conn.query_row(&sql, params![owner_id, key], parse_task_row))
}

/// Tasks dated on `date`, in listing order.
pub(crate) fn tasks_for_date(
    conn: &Connection,
    owner_id: &str,
    date: NaiveDate,
) -> rusqlite::Result<Vec<Task>> {
    query_tasks(
        conn,
        "owner_id = ?1 AND task_date = ?2",
        params![owner_id, date_param(date)],
    )
}

/// Undated, incomplete tasks.
pub(crate) fn backlog(conn: &Connection, owner_id: &str) -> rusqlite::Result<Vec<Task>> {
    query_tasks(
        conn,
        "owner_id = ?1 AND task_date IS NULL AND completed = 0",
        params![owner_id],
    )
}

/// Incomplete tasks dated within `[start, end]`.
pub(crate) fn incomplete_in_range(
    conn: &Connection,
    owner_id: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> rusqlite::Result<Vec<Task>> {
    query_tasks(
        conn,
        "owner_id = ?1 AND task_date BETWEEN ?2 AND ?3
         AND completed = 0 AND status != 'done'",
        params![owner_id, date_param(start), date_param(end)],
    )
}

/// Incomplete tasks dated strictly before `date`.
pub(crate) fn pending_before(
    conn: &Connection,
    owner_id: &str,
    date: NaiveDate,
) -> rusqlite::Result<Vec<Task>> {
    query_tasks(
        conn,
        "owner_id = ?1 AND task_date IS NOT NULL AND task_date < ?2
         AND completed = 0 AND status != 'done'",
        params![owner_id, date_param(date)],
    )
}

/// Fetch several tasks by id, in listing order. Missing ids are skipped.
pub(crate) fn tasks_by_ids(conn: &Connection, ids: &[String]) -> rusqlite::Result<Vec<Task>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{}", i)).collect();
    query_tasks(
        conn,
        &format!("id IN ({})", placeholders.join(", ")),
        params_from_iter(ids.iter()),
    )
}

/// Whether the owner already has a task with this exact content on `date`.
pub(crate) fn content_exists_on(
    conn: &Connection,
    owner_id: &str,
    date: NaiveDate,
    content: &str,
) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM tasks WHERE owner_id = ?1 AND task_date = ?2 AND content = ?3)",
        params![owner_id, date_param(date), content],
        |row| row.get(0),
    )
}
