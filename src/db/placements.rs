//! Board placement storage.
//!
//! Placements are never deleted while their task lives: a move inserts a new
//! current row and flips the previous one to a ghost pointing at it.

use super::optional;
use crate::types::Placement;
use rusqlite::{Connection, Row, params};

const PLACEMENT_COLUMNS: &str = "id, owner_id, task_id, week_key, weekday, is_current,
     moved_to_id, sort_order, created_at, updated_at";

fn parse_placement_row(row: &Row) -> rusqlite::Result<Placement> {
    Ok(Placement {
        id: row.get("id")?,
        owner_id: row.get("owner_id")?,
        task_id: row.get("task_id")?,
        week_key: row.get("week_key")?,
        weekday: row.get("weekday")?,
        is_current: row.get("is_current")?,
        moved_to_id: row.get("moved_to_id")?,
        sort_order: row.get("sort_order")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn query_placements(
    conn: &Connection,
    sql_tail: &str,
    params: impl rusqlite::Params,
) -> rusqlite::Result<Vec<Placement>> {
    let sql = format!("SELECT {} FROM placements WHERE {}", PLACEMENT_COLUMNS, sql_tail);
    let mut stmt = conn.prepare(&sql)?;
    let placements = stmt
        .query_map(params, parse_placement_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(placements)
}

pub(crate) fn get_placement_internal(
    conn: &Connection,
    placement_id: &str,
) -> rusqlite::Result<Option<Placement>> {
    let sql = format!("SELECT {} FROM placements WHERE id = ?1", PLACEMENT_COLUMNS);
    optional(conn.query_row(&sql, params![placement_id], parse_placement_row))
}

pub(crate) fn current_for_task(conn: &Connection, task_id: &str) -> rusqlite::Result<Option<Placement>> {
    let sql = format!(
        "SELECT {} FROM placements WHERE task_id = ?1 AND is_current = 1",
        PLACEMENT_COLUMNS
    );
    optional(conn.query_row(&sql, params![task_id], parse_placement_row))
}

pub(crate) fn insert_placement(conn: &Connection, placement: &Placement) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO placements (
            id, owner_id, task_id, week_key, weekday, is_current,
            moved_to_id, sort_order, created_at, updated_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            placement.id,
            placement.owner_id,
            placement.task_id,
            placement.week_key,
            placement.weekday,
            placement.is_current,
            placement.moved_to_id,
            placement.sort_order,
            placement.created_at,
            placement.updated_at,
        ],
    )?;
    Ok(())
}

/// Flip a current placement to a ghost. The successor is linked separately.
pub(crate) fn make_ghost(conn: &Connection, placement_id: &str, now: i64) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE placements SET is_current = 0, updated_at = ?1
         WHERE id = ?2 AND is_current = 1",
        params![now, placement_id],
    )?;
    Ok(())
}

/// Point an existing ghost at a successor.
pub(crate) fn link_ghost(
    conn: &Connection,
    placement_id: &str,
    moved_to_id: &str,
    now: i64,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE placements SET moved_to_id = ?1, updated_at = ?2
         WHERE id = ?3 AND is_current = 0",
        params![moved_to_id, now, placement_id],
    )?;
    Ok(())
}

/// Next intra-day order for a slot (max over current placements + 1).
pub(crate) fn next_slot_order(
    conn: &Connection,
    owner_id: &str,
    week_key: &str,
    weekday: u8,
) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COALESCE(MAX(sort_order), 0) + 1 FROM placements
         WHERE owner_id = ?1 AND week_key = ?2 AND weekday = ?3 AND is_current = 1",
        params![owner_id, week_key, weekday],
        |row| row.get(0),
    )
}

/// Current placements of a slot in intra-day order.
pub(crate) fn slot_current(
    conn: &Connection,
    owner_id: &str,
    week_key: &str,
    weekday: u8,
) -> rusqlite::Result<Vec<Placement>> {
    query_placements(
        conn,
        "owner_id = ?1 AND week_key = ?2 AND weekday = ?3 AND is_current = 1
         ORDER BY sort_order ASC, created_at ASC, id ASC",
        params![owner_id, week_key, weekday],
    )
}

/// Ghost placements of a slot, oldest first.
pub(crate) fn slot_ghosts(
    conn: &Connection,
    owner_id: &str,
    week_key: &str,
    weekday: u8,
) -> rusqlite::Result<Vec<Placement>> {
    query_placements(
        conn,
        "owner_id = ?1 AND week_key = ?2 AND weekday = ?3 AND is_current = 0
         ORDER BY created_at ASC, id ASC",
        params![owner_id, week_key, weekday],
    )
}

/// Every placement a task has had, ordered by creation.
pub(crate) fn history_for_task(conn: &Connection, task_id: &str) -> rusqlite::Result<Vec<Placement>> {
    query_placements(
        conn,
        "task_id = ?1 ORDER BY created_at ASC, id ASC",
        params![task_id],
    )
}

/// Set the intra-day order of a current placement. Ghosts are left untouched;
/// returns whether a row changed.
pub(crate) fn update_order(
    conn: &Connection,
    placement_id: &str,
    sort_order: i64,
    now: i64,
) -> rusqlite::Result<bool> {
    let updated = conn.execute(
        "UPDATE placements SET sort_order = ?1, updated_at = ?2
         WHERE id = ?3 AND is_current = 1",
        params![sort_order, now, placement_id],
    )?;
    Ok(updated > 0)
}
