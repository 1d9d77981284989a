//! Read queries backing swap card aggregation
//!
//! Rows are mapped straight into the typed raw rows of
//! `swap_cards::store`. Iteration checks the cancel flag between rows; an
//! early return drops the statement and its cursor.

use rusqlite::{params, Connection, Row};

use crate::error::StorageError;
use crate::swap_cards::store::{BookingLink, CancelFlag, RawBooking, RawProposalRow, RawSwapRow, ViewerQuery};

/// Booking columns selected by both queries, prefixed by alias `b`
const BOOKING_COLUMNS: &str =
    "b.id, b.status, b.title, b.location, b.provider, b.check_in, b.check_out, b.swap_value";

/// Read the 8 booking columns starting at `start`; `None` if the join missed
fn read_booking(row: &Row<'_>, start: usize) -> rusqlite::Result<Option<RawBooking>> {
    let id: Option<String> = row.get(start)?;
    let Some(id) = id else {
        return Ok(None);
    };

    Ok(Some(RawBooking {
        id,
        status: row.get(start + 1)?,
        title: row.get(start + 2)?,
        location: row.get(start + 3)?,
        provider: row.get(start + 4)?,
        check_in: row.get(start + 5)?,
        check_out: row.get(start + 6)?,
        swap_value: row.get(start + 7)?,
    }))
}

/// List every swap owned by `viewer_id`, with its booking if it still exists
pub fn fetch_viewer_swaps(
    conn: &Connection,
    viewer_id: &str,
    cancel: &CancelFlag,
) -> Result<Vec<RawSwapRow>, StorageError> {
    let sql = format!(
        "SELECT s.id, s.owner_user_id, s.status, s.created_at, s.booking_id, {}
         FROM swaps s
         LEFT JOIN bookings b ON b.id = s.booking_id
         WHERE s.owner_user_id = ?1
         ORDER BY s.id",
        BOOKING_COLUMNS
    );

    let mut stmt = conn.prepare(&sql)
        .map_err(|e| StorageError::StoreAccess(format!("Failed to prepare swap query: {}", e)))?;
    let mut rows = stmt.query(params![viewer_id])
        .map_err(|e| StorageError::StoreAccess(format!("Failed to query swaps: {}", e)))?;

    let mut results = Vec::new();
    while let Some(row) = rows.next()
        .map_err(|e| StorageError::StoreAccess(format!("Failed to read swap row: {}", e)))?
    {
        cancel.check()?;

        let booking_ref: Option<String> = row.get(4)?;
        let joined = read_booking(row, 5)?;

        results.push(RawSwapRow {
            swap_id: row.get(0)?,
            owner_user_id: row.get(1)?,
            status: row.get(2)?,
            created_at: row.get(3)?,
            booking: BookingLink::from_parts(booking_ref, joined),
        });
    }

    Ok(results)
}

/// List proposals against the viewer's swaps.
///
/// With `push_down` the self-exclusion predicate is part of the WHERE clause;
/// without it only ownership is constrained and the caller must post-filter.
/// Statuses are bound as one JSON array parameter.
pub fn fetch_proposals_for_viewer(
    conn: &Connection,
    query: &ViewerQuery,
    push_down: bool,
    cancel: &CancelFlag,
) -> Result<Vec<RawProposalRow>, StorageError> {
    let sql = format!(
        "SELECT p.id, p.proposer_user_id, p.created_at, p.status,
                s.id, s.owner_user_id, p.offered_booking_id, {}
         FROM proposals p
         JOIN swaps s ON s.id = p.swap_id
         LEFT JOIN bookings b ON b.id = p.offered_booking_id
         WHERE {}
           AND p.status IN (SELECT value FROM json_each(?2))
         ORDER BY p.id",
        BOOKING_COLUMNS,
        query.constraint.where_clause(push_down)
    );
    let statuses = serde_json::to_string(&query.visible_statuses)?;

    let mut stmt = conn.prepare(&sql)
        .map_err(|e| StorageError::StoreAccess(format!("Failed to prepare proposal query: {}", e)))?;
    let mut rows = stmt.query(params![query.viewer_id(), statuses])
        .map_err(|e| StorageError::StoreAccess(format!("Failed to query proposals: {}", e)))?;

    let mut results = Vec::new();
    while let Some(row) = rows.next()
        .map_err(|e| StorageError::StoreAccess(format!("Failed to read proposal row: {}", e)))?
    {
        cancel.check()?;

        let booking_ref: Option<String> = row.get(6)?;
        let joined = read_booking(row, 7)?;

        results.push(RawProposalRow {
            proposal_id: row.get(0)?,
            proposer_user_id: row.get(1)?,
            created_at: row.get(2)?,
            status: row.get(3)?,
            swap_id: row.get(4)?,
            swap_owner_user_id: row.get(5)?,
            offered_booking: BookingLink::from_parts(booking_ref, joined),
        });
    }

    Ok(results)
}
