//! Defensive normalization of raw store rows
//!
//! Each proposal row is classified once:
//! - `Valid` - every field present
//! - `Degraded` - optional booking details absent; kept, absent values stay `None`
//!   and are listed in `missing_fields`
//! - `Corrupt` - essential linkage absent; dropped and counted
//!
//! A corrupt row never fails the aggregation.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tracing::{debug, warn};

use super::store::{BookingLink, RawBooking, RawProposalRow, RawSwapRow, ViewerSnapshot};

/// Booking lifecycle states, owned by the booking service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingStatus {
    Available,
    Locked,
    Cancelled,
    Verified,
}

impl BookingStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "available" => Some(Self::Available),
            "locked" => Some(Self::Locked),
            "cancelled" => Some(Self::Cancelled),
            "verified" => Some(Self::Verified),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Locked => "locked",
            Self::Cancelled => "cancelled",
            Self::Verified => "verified",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposalStatus {
    Pending,
    Accepted,
    Rejected,
    Withdrawn,
    Expired,
}

impl ProposalStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            "withdrawn" => Some(Self::Withdrawn),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Withdrawn => "withdrawn",
            Self::Expired => "expired",
        }
    }
}

/// Optional booking detail that was absent or unreadable
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MissingField {
    BookingStatus,
    Title,
    Location,
    Provider,
    CheckIn,
    CheckOut,
    SwapValue,
}

impl MissingField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BookingStatus => "bookingStatus",
            Self::Title => "title",
            Self::Location => "location",
            Self::Provider => "provider",
            Self::CheckIn => "checkIn",
            Self::CheckOut => "checkOut",
            Self::SwapValue => "swapValue",
        }
    }
}

/// Why a proposal row was excluded
#[derive(Debug, Clone, PartialEq)]
pub enum CorruptReason {
    MissingProposer,
    MissingCreatedAt,
    UnreadableCreatedAt(String),
    UnknownStatus(Option<String>),
    MissingBookingRef,
    DanglingBookingRef(String),
    /// Proposal points at a swap absent from the viewer's snapshot
    OrphanedSwap(String),
}

/// Booking details after normalization
#[derive(Debug, Clone, PartialEq)]
pub struct BookingSummary {
    pub id: String,
    pub status: Option<BookingStatus>,
    pub title: Option<String>,
    pub location: Option<String>,
    pub provider: Option<String>,
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub swap_value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProposalRecord {
    pub id: String,
    pub swap_id: String,
    pub swap_owner_user_id: String,
    pub proposer_user_id: String,
    pub status: ProposalStatus,
    pub created_at: DateTime<Utc>,
    pub offered_booking: BookingSummary,
    pub missing_fields: Vec<MissingField>,
}

impl ProposalRecord {
    pub fn is_degraded(&self) -> bool {
        !self.missing_fields.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwapRecord {
    pub id: String,
    pub owner_user_id: String,
    pub status: String,
    pub created_at: Option<DateTime<Utc>>,
    /// `None` when the swap's own booking is gone
    pub booking: Option<BookingSummary>,
    pub missing_fields: Vec<MissingField>,
}

impl SwapRecord {
    pub fn is_degraded(&self) -> bool {
        self.booking.is_none() || self.created_at.is_none() || !self.missing_fields.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Classified {
    Valid(ProposalRecord),
    Degraded(ProposalRecord),
    Corrupt {
        proposal_id: String,
        reason: CorruptReason,
    },
}

/// Data quality counters reported in response metadata
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataQuality {
    pub degraded_count: usize,
    pub excluded_count: usize,
    pub degraded_swap_count: usize,
}

/// Normalized snapshot ready for grouping
#[derive(Debug, Clone, Default)]
pub struct NormalizedSnapshot {
    pub swaps: Vec<SwapRecord>,
    pub proposals: Vec<ProposalRecord>,
    pub quality: DataQuality,
}

/// Offset-less layouts, read as UTC. `%.f` also matches no fraction.
const NAIVE_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parse a stored timestamp: RFC 3339, or SQLite/ORM `YYYY-MM-DD HH:MM:SS[.fff]`
/// with either separator and no offset (UTC)
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn summarize_booking(raw: RawBooking) -> (BookingSummary, Vec<MissingField>) {
    let mut missing = Vec::new();

    let status = raw.status.as_deref().and_then(BookingStatus::parse);
    if status.is_none() {
        missing.push(MissingField::BookingStatus);
    }
    let title = non_blank(raw.title);
    if title.is_none() {
        missing.push(MissingField::Title);
    }
    let location = non_blank(raw.location);
    if location.is_none() {
        missing.push(MissingField::Location);
    }
    let provider = non_blank(raw.provider);
    if provider.is_none() {
        missing.push(MissingField::Provider);
    }
    let check_in = raw
        .check_in
        .as_deref()
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
    if check_in.is_none() {
        missing.push(MissingField::CheckIn);
    }
    let check_out = raw
        .check_out
        .as_deref()
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
    if check_out.is_none() {
        missing.push(MissingField::CheckOut);
    }
    // NaN or negative prices are unreadable, not zero
    let swap_value = raw.swap_value.filter(|v| v.is_finite() && *v >= 0.0);
    if swap_value.is_none() {
        missing.push(MissingField::SwapValue);
    }

    let summary = BookingSummary {
        id: raw.id,
        status,
        title,
        location,
        provider,
        check_in,
        check_out,
        swap_value,
    };
    (summary, missing)
}

/// Classify one proposal row
pub fn classify_proposal(row: RawProposalRow) -> Classified {
    let corrupt = |reason| Classified::Corrupt {
        proposal_id: row.proposal_id.clone(),
        reason,
    };

    let proposer_user_id = match non_blank(row.proposer_user_id.clone()) {
        Some(p) => p,
        None => return corrupt(CorruptReason::MissingProposer),
    };

    let created_at = match row.created_at.as_deref() {
        None => return corrupt(CorruptReason::MissingCreatedAt),
        Some(raw) => match parse_timestamp(raw) {
            Some(ts) => ts,
            None => return corrupt(CorruptReason::UnreadableCreatedAt(raw.to_string())),
        },
    };

    let status = match row.status.as_deref().and_then(ProposalStatus::parse) {
        Some(s) => s,
        None => return corrupt(CorruptReason::UnknownStatus(row.status.clone())),
    };

    let booking = match &row.offered_booking {
        BookingLink::Missing => return corrupt(CorruptReason::MissingBookingRef),
        BookingLink::Dangling(id) => return corrupt(CorruptReason::DanglingBookingRef(id.clone())),
        BookingLink::Resolved(b) => b.clone(),
    };

    let (offered_booking, missing_fields) = summarize_booking(booking);

    let record = ProposalRecord {
        id: row.proposal_id,
        swap_id: row.swap_id,
        swap_owner_user_id: row.swap_owner_user_id,
        proposer_user_id,
        status,
        created_at,
        offered_booking,
        missing_fields,
    };

    if record.is_degraded() {
        Classified::Degraded(record)
    } else {
        Classified::Valid(record)
    }
}

/// Normalize a swap row. Swaps are never dropped.
pub fn normalize_swap(row: RawSwapRow) -> SwapRecord {
    let created_at = row.created_at.as_deref().and_then(parse_timestamp);
    let (booking, missing_fields) = match row.booking {
        BookingLink::Resolved(raw) => {
            let (summary, missing) = summarize_booking(raw);
            (Some(summary), missing)
        }
        BookingLink::Missing | BookingLink::Dangling(_) => (None, Vec::new()),
    };

    SwapRecord {
        id: row.swap_id,
        owner_user_id: row.owner_user_id,
        status: row.status,
        created_at,
        booking,
        missing_fields,
    }
}

/// Normalize a full viewer snapshot
pub fn normalize(snapshot: ViewerSnapshot) -> NormalizedSnapshot {
    let mut quality = DataQuality::default();

    let swaps: Vec<SwapRecord> = snapshot
        .swaps
        .into_iter()
        .map(normalize_swap)
        .inspect(|swap| {
            if swap.is_degraded() {
                quality.degraded_swap_count += 1;
            }
        })
        .collect();

    let mut proposals = Vec::with_capacity(snapshot.proposals.len());
    for row in snapshot.proposals {
        match classify_proposal(row) {
            Classified::Valid(record) => proposals.push(record),
            Classified::Degraded(record) => {
                debug!(
                    proposal_id = %record.id,
                    missing = ?record.missing_fields,
                    "Proposal degraded"
                );
                quality.degraded_count += 1;
                proposals.push(record);
            }
            Classified::Corrupt { proposal_id, reason } => {
                warn!(proposal_id = %proposal_id, reason = ?reason, "Excluding corrupt proposal");
                quality.excluded_count += 1;
            }
        }
    }

    NormalizedSnapshot {
        swaps,
        proposals,
        quality,
    }
}
