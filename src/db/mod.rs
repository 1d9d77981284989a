//! SQLite store for bookings, swaps and proposals
//!
//! ## Tables
//!
//! - `users` - Known user ids
//! - `bookings` - Reservation listings (owner, status, dates, prices)
//! - `swaps` - Bookings offered for exchange
//! - `proposals` - Offers made against swaps
//!
//! Listing and proposal writes belong to other services; this crate keeps
//! `listings` writers for seeding and fixtures and reads through `proposals`.
//!
//! ## Connections
//!
//! Writes go through one mutex-guarded connection. Reads check out their own
//! query-only connection from an r2d2 pool, so concurrent aggregations never
//! queue behind each other or behind a writer.

pub mod schema;
pub mod listings;
pub mod proposals;

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use r2d2::{ManageConnection, Pool, PooledConnection};
use rusqlite::{Connection, OpenFlags, TransactionBehavior};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::Config;
use crate::error::StorageError;
use crate::swap_cards::store::{CancelFlag, ProposalStore, ViewerQuery, ViewerSnapshot};

pub type ReadPool = Pool<ReadConnectionManager>;
pub type ReadConn = PooledConnection<ReadConnectionManager>;

const DEFAULT_READ_POOL_SIZE: u32 = 8;

/// Opens query-only connections to the same database as the writer
#[derive(Debug, Clone)]
pub struct ReadConnectionManager {
    target: String,
}

impl ReadConnectionManager {
    pub fn new(target: impl Into<String>) -> Self {
        Self { target: target.into() }
    }
}

impl ManageConnection for ReadConnectionManager {
    type Connection = Connection;
    type Error = rusqlite::Error;

    fn connect(&self) -> Result<Connection, rusqlite::Error> {
        let conn = Connection::open_with_flags(
            &self.target,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.pragma_update(None, "query_only", true)?;
        Ok(conn)
    }

    fn is_valid(&self, conn: &mut Connection) -> Result<(), rusqlite::Error> {
        conn.execute_batch("SELECT 1")
    }

    fn has_broken(&self, _conn: &mut Connection) -> bool {
        false
    }
}

/// SQLite database for swap listings
pub struct SwapDb {
    conn: Mutex<Connection>,
    readers: ReadPool,
    exclusion_pushdown: bool,
}

impl SwapDb {
    /// Open or create the database at `config.database_path()`
    pub fn open(config: &Config) -> Result<Self, StorageError> {
        std::fs::create_dir_all(&config.storage_dir)?;
        Self::open_path(&config.database_path(), config.read_pool_size)
    }

    /// Open or create the database file at `db_path`
    pub fn open_path(db_path: &Path, read_pool_size: u32) -> Result<Self, StorageError> {
        info!("Opening SQLite database at {:?}", db_path);

        let conn = Connection::open(db_path)
            .map_err(|e| StorageError::StoreAccess(format!("Failed to open SQLite: {}", e)))?;

        // WAL gives readers a stable snapshot while writers append
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| StorageError::StoreAccess(format!("Failed to set PRAGMA: {}", e)))?;

        let manager = ReadConnectionManager::new(db_path.to_string_lossy().into_owned());
        Self::with_readers(conn, manager, read_pool_size)
    }

    /// Open an in-memory database (for testing)
    ///
    /// Uses a uniquely named shared-cache database so pooled readers see the
    /// writer's data. It lives as long as the writer connection.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let target = format!("file:swaps-{}?mode=memory&cache=shared", Uuid::new_v4());
        debug!(target = %target, "Opening in-memory SQLite database");

        let conn = Connection::open_with_flags(
            &target,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| StorageError::StoreAccess(format!("Failed to open in-memory SQLite: {}", e)))?;

        Self::with_readers(conn, ReadConnectionManager::new(target), DEFAULT_READ_POOL_SIZE)
    }

    fn with_readers(
        conn: Connection,
        manager: ReadConnectionManager,
        read_pool_size: u32,
    ) -> Result<Self, StorageError> {
        schema::init_schema(&conn)?;

        let readers = Pool::builder()
            .max_size(read_pool_size.max(1))
            .connection_timeout(Duration::from_secs(5))
            .build(manager)
            .map_err(|e| StorageError::StoreAccess(format!("Failed to build read pool: {}", e)))?;

        Ok(Self {
            conn: Mutex::new(conn),
            readers,
            exclusion_pushdown: true,
        })
    }

    /// Leave self-exclusion out of the SQL; the assembler post-filters instead
    pub fn without_exclusion_pushdown(mut self) -> Self {
        self.exclusion_pushdown = false;
        self
    }

    /// Check out a query-only connection
    pub fn read_conn(&self) -> Result<ReadConn, StorageError> {
        self.readers
            .get()
            .map_err(|e| StorageError::StoreAccess(format!("Failed to get read connection: {}", e)))
    }

    /// Run `f` with shared access to the writer connection
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError>,
    {
        let conn = self.conn.lock()
            .map_err(|e| StorageError::Internal(format!("Lock poisoned: {}", e)))?;
        f(&conn)
    }

    /// Run `f` with exclusive access (transactions, writes)
    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StorageError>,
    {
        let mut conn = self.conn.lock()
            .map_err(|e| StorageError::Internal(format!("Lock poisoned: {}", e)))?;
        f(&mut conn)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats, StorageError> {
        let conn = self.read_conn()?;
        let count = |table: &str| -> Result<u64, StorageError> {
            let n: i64 = conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
                .map_err(|e| StorageError::StoreAccess(format!("Query failed: {}", e)))?;
            Ok(n as u64)
        };

        Ok(DbStats {
            booking_count: count("bookings")?,
            swap_count: count("swaps")?,
            proposal_count: count("proposals")?,
        })
    }
}

impl ProposalStore for SwapDb {
    fn pushes_down_exclusion(&self) -> bool {
        self.exclusion_pushdown
    }

    fn fetch_proposals_for_viewer(
        &self,
        query: &ViewerQuery,
        cancel: &CancelFlag,
    ) -> Result<ViewerSnapshot, StorageError> {
        let mut conn = self.read_conn()?;

        // Both reads share one read transaction, hence one snapshot
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Deferred)
            .map_err(|e| StorageError::StoreAccess(format!("Failed to begin read: {}", e)))?;

        let swaps = proposals::fetch_viewer_swaps(&tx, query.viewer_id(), cancel)?;
        let rows = proposals::fetch_proposals_for_viewer(&tx, query, self.exclusion_pushdown, cancel)?;

        tx.commit()
            .map_err(|e| StorageError::StoreAccess(format!("Failed to end read: {}", e)))?;

        Ok(ViewerSnapshot {
            swaps,
            proposals: rows,
        })
    }
}

/// Database statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct DbStats {
    pub booking_count: u64,
    pub swap_count: u64,
    pub proposal_count: u64,
}

// Re-exports
pub use listings::{CreateBookingInput, CreateProposalInput, CreateSwapInput};
