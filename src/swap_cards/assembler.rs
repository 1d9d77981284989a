//! Swap card assembler
//!
//! Store access -> (post-filter) -> normalize -> group -> paginate.
//! The latency budget is reported in metadata and never aborts a request.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::StorageError;

use super::exclusion::admits_row;
use super::grouping::{group_by_swap, CardSetMetadata, SwapCard};
use super::normalizer::normalize;
use super::pagination::{paginate, PageRequest, PaginationMeta};
use super::store::{CancelFlag, ProposalStore, ViewerQuery};

/// Tunables for the assembler
#[derive(Debug, Clone)]
pub struct AssemblySettings {
    pub latency_budget: Duration,
    pub visible_statuses: Vec<String>,
}

impl Default for AssemblySettings {
    fn default() -> Self {
        Self {
            latency_budget: Duration::from_millis(250),
            visible_statuses: vec!["pending".to_string()],
        }
    }
}

/// One page of swap cards with its metadata
#[derive(Debug, Clone)]
pub struct SwapCardSet {
    pub cards: Vec<SwapCard>,
    pub pagination: PaginationMeta,
    pub metadata: CardSetMetadata,
}

pub struct SwapCardAssembler {
    store: Arc<dyn ProposalStore>,
    settings: AssemblySettings,
}

impl SwapCardAssembler {
    pub fn new(store: Arc<dyn ProposalStore>, settings: AssemblySettings) -> Self {
        Self { store, settings }
    }

    pub fn settings(&self) -> &AssemblySettings {
        &self.settings
    }

    /// Assemble the swap cards `viewer_id` sees for one page.
    ///
    /// `viewer_id` is trusted (authenticated upstream) and `page` is already
    /// validated. Fails without partial data on store errors, cancellation or
    /// an invariant violation.
    pub fn assemble(
        &self,
        viewer_id: &str,
        page: PageRequest,
        cancel: &CancelFlag,
    ) -> Result<SwapCardSet, StorageError> {
        let started = Instant::now();
        let query = ViewerQuery::new(viewer_id, &self.settings.visible_statuses);

        let mut snapshot = self.store.fetch_proposals_for_viewer(&query, cancel)?;
        cancel.check()?;

        if !self.store.pushes_down_exclusion() {
            let before = snapshot.proposals.len();
            snapshot
                .proposals
                .retain(|row| admits_row(&row.swap_owner_user_id, row.proposer_user_id.as_deref()));
            debug!(
                viewer_id = %viewer_id,
                filtered = before - snapshot.proposals.len(),
                "Applied self-exclusion post-filter"
            );
        }

        let fetched_swaps = snapshot.swaps.len();
        let fetched_proposals = snapshot.proposals.len();

        let normalized = normalize(snapshot);
        let grouped = group_by_swap(viewer_id, normalized)?;
        cancel.check()?;

        let page = paginate(grouped.cards, page);

        let elapsed_ms = started.elapsed().as_millis() as u64;
        let budget_ms = self.settings.latency_budget.as_millis() as u64;
        let metadata = CardSetMetadata::build(&page.items, grouped.quality, elapsed_ms, budget_ms);

        if metadata.budget_exceeded {
            warn!(
                viewer_id = %viewer_id,
                elapsed_ms,
                budget_ms,
                "Swap card aggregation exceeded latency budget"
            );
        }

        debug!(
            viewer_id = %viewer_id,
            fetched_swaps,
            fetched_proposals,
            returned_cards = page.items.len(),
            excluded = metadata.data_quality.excluded_count,
            degraded = metadata.data_quality.degraded_count,
            elapsed_ms,
            "Assembled swap cards"
        );

        Ok(SwapCardSet {
            cards: page.items,
            pagination: page.meta,
            metadata,
        })
    }
}
