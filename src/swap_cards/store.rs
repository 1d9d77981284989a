//! Store access boundary for swap card aggregation
//!
//! Raw rows leave the store already typed: every column the engine reads is
//! either a plain value or an explicit `Option`, and the offered-booking join
//! is folded into a [`BookingLink`] tag. Nothing downstream inspects loosely
//! typed result rows.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::StorageError;

use super::exclusion::ExclusionConstraint;

/// Booking columns as joined from the `bookings` table
#[derive(Debug, Clone, PartialEq)]
pub struct RawBooking {
    pub id: String,
    pub status: Option<String>,
    pub title: Option<String>,
    pub location: Option<String>,
    pub provider: Option<String>,
    pub check_in: Option<String>,
    pub check_out: Option<String>,
    pub swap_value: Option<f64>,
}

/// Outcome of following a booking reference
#[derive(Debug, Clone, PartialEq)]
pub enum BookingLink {
    /// The referencing row holds no booking id
    Missing,
    /// The booking id points at a row that no longer exists
    Dangling(String),
    Resolved(RawBooking),
}

impl BookingLink {
    /// Fold a nullable reference and a nullable LEFT JOIN result into a link
    pub fn from_parts(reference: Option<String>, joined: Option<RawBooking>) -> Self {
        match (reference, joined) {
            (_, Some(booking)) => BookingLink::Resolved(booking),
            (Some(id), None) => BookingLink::Dangling(id),
            (None, None) => BookingLink::Missing,
        }
    }
}

/// One swap owned by the viewer
#[derive(Debug, Clone, PartialEq)]
pub struct RawSwapRow {
    pub swap_id: String,
    pub owner_user_id: String,
    pub status: String,
    pub created_at: Option<String>,
    pub booking: BookingLink,
}

/// One proposal made against a swap owned by the viewer
#[derive(Debug, Clone, PartialEq)]
pub struct RawProposalRow {
    pub proposal_id: String,
    pub proposer_user_id: Option<String>,
    pub created_at: Option<String>,
    pub status: Option<String>,
    pub swap_id: String,
    pub swap_owner_user_id: String,
    pub offered_booking: BookingLink,
}

/// Everything the engine needs for one viewer, read from a single snapshot
#[derive(Debug, Clone, Default)]
pub struct ViewerSnapshot {
    pub swaps: Vec<RawSwapRow>,
    pub proposals: Vec<RawProposalRow>,
}

/// Parameters for a viewer read
#[derive(Debug, Clone)]
pub struct ViewerQuery {
    pub constraint: ExclusionConstraint,
    /// Proposal statuses that count as incoming proposals
    pub visible_statuses: Vec<String>,
}

impl ViewerQuery {
    pub fn new(viewer_id: &str, visible_statuses: &[String]) -> Self {
        Self {
            constraint: ExclusionConstraint::for_viewer(viewer_id),
            visible_statuses: visible_statuses.to_vec(),
        }
    }

    pub fn viewer_id(&self) -> &str {
        self.constraint.viewer_id()
    }
}

/// Cooperative cancellation shared between a request and its aggregation
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Return `Err(Cancelled)` once the caller has gone away
    pub fn check(&self) -> Result<(), StorageError> {
        if self.is_cancelled() {
            Err(StorageError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Guard that cancels the flag when dropped
    pub fn drop_guard(&self) -> CancelOnDrop {
        CancelOnDrop(self.clone())
    }
}

/// Cancels its flag on drop, e.g. when hyper drops a handler future
pub struct CancelOnDrop(CancelFlag);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// Read access to swaps and the proposals made against them
pub trait ProposalStore: Send + Sync {
    /// Whether the store applies `ExclusionConstraint` inside its query.
    /// Stores returning `false` get post-filtered by the assembler.
    fn pushes_down_exclusion(&self) -> bool {
        true
    }

    /// Read the viewer's swaps and the proposals against them in one snapshot.
    ///
    /// Implementations must check `cancel` while iterating and release any
    /// open cursor when they return early.
    fn fetch_proposals_for_viewer(
        &self,
        query: &ViewerQuery,
        cancel: &CancelFlag,
    ) -> Result<ViewerSnapshot, StorageError>;
}
