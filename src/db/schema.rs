//! Database schema definitions

use rusqlite::Connection;
use tracing::info;

use crate::error::StorageError;

/// Current schema version for migrations
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<(), StorageError> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        info!("Creating new database schema v{}", SCHEMA_VERSION);
        create_tables(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version > SCHEMA_VERSION {
        return Err(StorageError::StoreAccess(format!(
            "Database schema v{} is newer than supported v{}",
            current_version, SCHEMA_VERSION
        )));
    } else {
        info!("Database schema is up to date (v{})", current_version);
    }

    Ok(())
}

/// Get current schema version (0 if not initialized)
fn get_schema_version(conn: &Connection) -> Result<i32, StorageError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
        [],
    ).map_err(|e| StorageError::StoreAccess(format!("Failed to create schema_version table: {}", e)))?;

    let version: i32 = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
        .unwrap_or(0);

    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<(), StorageError> {
    conn.execute("DELETE FROM schema_version", [])
        .map_err(|e| StorageError::StoreAccess(format!("Failed to clear schema_version: {}", e)))?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?)", [version])
        .map_err(|e| StorageError::StoreAccess(format!("Failed to set schema_version: {}", e)))?;
    Ok(())
}

fn create_tables(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(LISTINGS_SCHEMA)
        .map_err(|e| StorageError::StoreAccess(format!("Failed to create listing tables: {}", e)))?;

    conn.execute_batch(INDEXES_SCHEMA)
        .map_err(|e| StorageError::StoreAccess(format!("Failed to create indexes: {}", e)))?;

    Ok(())
}

/// Users, bookings, swaps and proposals.
///
/// Booking references carry no enforced foreign keys: bookings are deleted by
/// the booking lifecycle service independently of swaps and proposals.
const LISTINGS_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS bookings (
    id TEXT PRIMARY KEY NOT NULL,
    owner_user_id TEXT NOT NULL,
    status TEXT,
    title TEXT,
    location TEXT,
    provider TEXT,
    check_in TEXT,
    check_out TEXT,
    original_price REAL,
    swap_value REAL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS swaps (
    id TEXT PRIMARY KEY NOT NULL,
    owner_user_id TEXT NOT NULL,
    booking_id TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'active',
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- proposer_user_id and created_at are nullable: legacy imports left gaps
CREATE TABLE IF NOT EXISTS proposals (
    id TEXT PRIMARY KEY NOT NULL,
    swap_id TEXT NOT NULL,
    proposer_user_id TEXT,
    offered_booking_id TEXT,
    status TEXT NOT NULL DEFAULT 'pending',
    message TEXT,
    created_at TEXT
);
"#;

const INDEXES_SCHEMA: &str = r#"
CREATE INDEX IF NOT EXISTS idx_bookings_owner ON bookings(owner_user_id);
CREATE INDEX IF NOT EXISTS idx_swaps_owner ON swaps(owner_user_id);
CREATE INDEX IF NOT EXISTS idx_proposals_swap ON proposals(swap_id, status);
CREATE INDEX IF NOT EXISTS idx_proposals_proposer ON proposals(proposer_user_id);

-- A booking backs at most one live swap
CREATE UNIQUE INDEX IF NOT EXISTS idx_swaps_active_booking
    ON swaps(booking_id) WHERE status != 'cancelled';
"#;
