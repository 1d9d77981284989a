//! View types for the HTTP API boundary
//!
//! These types use camelCase serialization for TypeScript clients.
//! Engine types in `swap_cards` stay free of wire concerns.
//!
//! Design principles:
//! - Absent booking details serialize as `null` and are listed in
//!   `missingFields`; nothing is filled with a plausible-looking default.
//! - Timestamps are RFC 3339 strings, dates are `YYYY-MM-DD`.

use serde::Serialize;
use ts_rs::TS;

use crate::swap_cards::normalizer::{BookingSummary, DataQuality, MissingField};
use crate::swap_cards::{CardSetMetadata, PaginationMeta, ProposalRecord, SwapCard, SwapCardSet, SwapRecord};

fn missing_names(fields: &[MissingField]) -> Vec<String> {
    fields.iter().map(|f| f.as_str().to_string()).collect()
}

// ============================================================================
// Booking / Swap / Proposal Views
// ============================================================================

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BookingSummaryView {
    pub id: String,
    pub status: Option<String>,
    pub title: Option<String>,
    pub location: Option<String>,
    pub provider: Option<String>,
    pub check_in: Option<String>,
    pub check_out: Option<String>,
    pub swap_value: Option<f64>,
}

impl From<BookingSummary> for BookingSummaryView {
    fn from(b: BookingSummary) -> Self {
        Self {
            id: b.id,
            status: b.status.map(|s| s.as_str().to_string()),
            title: b.title,
            location: b.location,
            provider: b.provider,
            check_in: b.check_in.map(|d| d.format("%Y-%m-%d").to_string()),
            check_out: b.check_out.map(|d| d.format("%Y-%m-%d").to_string()),
            swap_value: b.swap_value,
        }
    }
}

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SwapView {
    pub id: String,
    pub owner_user_id: String,
    pub status: String,
    pub created_at: Option<String>,
    /// Null when the swap's booking no longer exists
    pub booking: Option<BookingSummaryView>,
    pub missing_fields: Vec<String>,
}

impl From<SwapRecord> for SwapView {
    fn from(s: SwapRecord) -> Self {
        Self {
            id: s.id,
            owner_user_id: s.owner_user_id,
            status: s.status,
            created_at: s.created_at.map(|t| t.to_rfc3339()),
            booking: s.booking.map(Into::into),
            missing_fields: missing_names(&s.missing_fields),
        }
    }
}

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProposalView {
    pub id: String,
    pub swap_id: String,
    pub proposer_user_id: String,
    pub status: String,
    pub created_at: String,
    pub offered_booking: BookingSummaryView,
    /// "valid" or "degraded"
    pub data_quality: String,
    pub missing_fields: Vec<String>,
}

impl From<ProposalRecord> for ProposalView {
    fn from(p: ProposalRecord) -> Self {
        let data_quality = if p.is_degraded() { "degraded" } else { "valid" };
        Self {
            id: p.id,
            swap_id: p.swap_id,
            proposer_user_id: p.proposer_user_id,
            status: p.status.as_str().to_string(),
            created_at: p.created_at.to_rfc3339(),
            offered_booking: p.offered_booking.into(),
            data_quality: data_quality.to_string(),
            missing_fields: missing_names(&p.missing_fields),
        }
    }
}

// ============================================================================
// Swap Card Views
// ============================================================================

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SwapCardView {
    pub swap: SwapView,
    pub proposals: Vec<ProposalView>,
    pub proposal_count: usize,
    pub has_proposals: bool,
}

impl From<SwapCard> for SwapCardView {
    fn from(c: SwapCard) -> Self {
        let proposal_count = c.proposal_count();
        let has_proposals = c.has_proposals();
        Self {
            swap: c.swap.into(),
            proposals: c.proposals.into_iter().map(Into::into).collect(),
            proposal_count,
            has_proposals,
        }
    }
}

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PaginationView {
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
    pub has_more: bool,
}

impl From<PaginationMeta> for PaginationView {
    fn from(p: PaginationMeta) -> Self {
        Self {
            total: p.total,
            limit: p.limit,
            offset: p.offset,
            has_more: p.has_more,
        }
    }
}

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DataQualityView {
    pub degraded_count: usize,
    pub excluded_count: usize,
    pub degraded_swap_count: usize,
}

impl From<DataQuality> for DataQualityView {
    fn from(q: DataQuality) -> Self {
        Self {
            degraded_count: q.degraded_count,
            excluded_count: q.excluded_count,
            degraded_swap_count: q.degraded_swap_count,
        }
    }
}

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SwapCardsMetadataView {
    pub total_swaps: usize,
    pub total_proposals: usize,
    pub swaps_with_proposals: usize,
    pub data_quality: DataQualityView,
    #[ts(type = "number")]
    pub elapsed_ms: u64,
    #[ts(type = "number")]
    pub latency_budget_ms: u64,
    pub budget_exceeded: bool,
}

impl From<CardSetMetadata> for SwapCardsMetadataView {
    fn from(m: CardSetMetadata) -> Self {
        Self {
            total_swaps: m.total_swaps,
            total_proposals: m.total_proposals,
            swaps_with_proposals: m.swaps_with_proposals,
            data_quality: m.data_quality.into(),
            elapsed_ms: m.elapsed_ms,
            latency_budget_ms: m.latency_budget_ms,
            budget_exceeded: m.budget_exceeded,
        }
    }
}

/// `data` payload of the swap cards endpoint
#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SwapCardsView {
    pub swap_cards: Vec<SwapCardView>,
    pub pagination: PaginationView,
    pub metadata: SwapCardsMetadataView,
}

impl From<SwapCardSet> for SwapCardsView {
    fn from(set: SwapCardSet) -> Self {
        Self {
            swap_cards: set.cards.into_iter().map(Into::into).collect(),
            pagination: set.pagination.into(),
            metadata: set.metadata.into(),
        }
    }
}
