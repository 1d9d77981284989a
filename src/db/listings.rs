//! Booking, swap and proposal writers
//!
//! Used for seeding and test fixtures. Production writes arrive through the
//! listing and proposal-submission services.

use rusqlite::{params, Connection};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::StorageError;

// =============================================================================
// Inputs
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBookingInput {
    pub id: Option<String>,
    pub owner_user_id: String,
    #[serde(default = "default_booking_status")]
    pub status: String,
    pub title: Option<String>,
    pub location: Option<String>,
    pub provider: Option<String>,
    pub check_in: Option<String>,
    pub check_out: Option<String>,
    pub original_price: Option<f64>,
    pub swap_value: Option<f64>,
}

fn default_booking_status() -> String { "available".to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSwapInput {
    pub id: Option<String>,
    pub booking_id: String,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProposalInput {
    pub id: Option<String>,
    pub swap_id: String,
    pub proposer_user_id: String,
    pub offered_booking_id: String,
    #[serde(default = "default_proposal_status")]
    pub status: String,
    pub message: Option<String>,
    pub created_at: Option<String>,
}

fn default_proposal_status() -> String { "pending".to_string() }

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

// =============================================================================
// Write Operations
// =============================================================================

fn ensure_user(conn: &Connection, user_id: &str) -> Result<(), StorageError> {
    conn.execute("INSERT OR IGNORE INTO users (id) VALUES (?)", params![user_id])
        .map_err(|e| StorageError::StoreAccess(format!("Failed to upsert user: {}", e)))?;
    Ok(())
}

/// Create a booking, returning its id
pub fn create_booking(conn: &mut Connection, input: CreateBookingInput) -> Result<String, StorageError> {
    if input.owner_user_id.is_empty() {
        return Err(StorageError::InvalidInput("owner_user_id is required".into()));
    }
    let id = input.id.unwrap_or_else(|| Uuid::new_v4().to_string());

    let tx = conn.transaction()?;
    ensure_user(&tx, &input.owner_user_id)?;
    tx.execute(
        "INSERT INTO bookings (id, owner_user_id, status, title, location, provider,
                               check_in, check_out, original_price, swap_value)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            id,
            input.owner_user_id,
            input.status,
            input.title,
            input.location,
            input.provider,
            input.check_in,
            input.check_out,
            input.original_price,
            input.swap_value,
        ],
    ).map_err(|e| StorageError::StoreAccess(format!("Failed to create booking: {}", e)))?;
    tx.commit()?;

    Ok(id)
}

/// Create a swap for a booking; the owner is the booking's owner
pub fn create_swap(conn: &mut Connection, input: CreateSwapInput) -> Result<String, StorageError> {
    let id = input.id.unwrap_or_else(|| Uuid::new_v4().to_string());

    let tx = conn.transaction()?;
    let owner: String = tx
        .query_row(
            "SELECT owner_user_id FROM bookings WHERE id = ?",
            params![input.booking_id],
            |row| row.get(0),
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                StorageError::NotFound(format!("booking '{}'", input.booking_id))
            }
            other => StorageError::StoreAccess(format!("Failed to look up booking: {}", other)),
        })?;

    tx.execute(
        "INSERT INTO swaps (id, owner_user_id, booking_id, status, created_at)
         VALUES (?, ?, ?, 'active', ?)",
        params![id, owner, input.booking_id, input.created_at.unwrap_or_else(now)],
    ).map_err(|e| match e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StorageError::InvalidInput(format!(
                "booking '{}' already backs an active swap",
                input.booking_id
            ))
        }
        other => StorageError::StoreAccess(format!("Failed to create swap: {}", other)),
    })?;
    tx.commit()?;

    Ok(id)
}

/// Create a proposal; rejects proposals on the proposer's own swap
pub fn create_proposal(conn: &mut Connection, input: CreateProposalInput) -> Result<String, StorageError> {
    if input.proposer_user_id.is_empty() {
        return Err(StorageError::InvalidInput("proposer_user_id is required".into()));
    }
    let id = input.id.unwrap_or_else(|| Uuid::new_v4().to_string());

    let tx = conn.transaction()?;
    let owner: String = tx
        .query_row(
            "SELECT owner_user_id FROM swaps WHERE id = ?",
            params![input.swap_id],
            |row| row.get(0),
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                StorageError::NotFound(format!("swap '{}'", input.swap_id))
            }
            other => StorageError::StoreAccess(format!("Failed to look up swap: {}", other)),
        })?;

    if owner == input.proposer_user_id {
        return Err(StorageError::InvalidInput(
            "Cannot propose against your own swap".into(),
        ));
    }

    ensure_user(&tx, &input.proposer_user_id)?;
    tx.execute(
        "INSERT INTO proposals (id, swap_id, proposer_user_id, offered_booking_id, status, message, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        params![
            id,
            input.swap_id,
            input.proposer_user_id,
            input.offered_booking_id,
            input.status,
            input.message,
            input.created_at.unwrap_or_else(now),
        ],
    ).map_err(|e| StorageError::StoreAccess(format!("Failed to create proposal: {}", e)))?;
    tx.commit()?;

    Ok(id)
}

/// Delete a booking without touching swaps or proposals that reference it
pub fn delete_booking(conn: &mut Connection, id: &str) -> Result<bool, StorageError> {
    let rows = conn.execute("DELETE FROM bookings WHERE id = ?", params![id])
        .map_err(|e| StorageError::StoreAccess(format!("Failed to delete booking: {}", e)))?;

    Ok(rows > 0)
}
