//! Grouping proposals under the viewer's swaps
//!
//! Produces one card per swap the viewer owns, including swaps with no
//! qualifying proposals. This is the second self-exclusion enforcement point.

use std::cmp::Ordering;
use std::collections::HashMap;

use tracing::{error, warn};

use crate::error::StorageError;

use super::exclusion::is_admissible;
use super::normalizer::{DataQuality, NormalizedSnapshot, ProposalRecord, SwapRecord};

/// One swap and its incoming proposals
#[derive(Debug, Clone, PartialEq)]
pub struct SwapCard {
    pub swap: SwapRecord,
    pub proposals: Vec<ProposalRecord>,
}

impl SwapCard {
    pub fn proposal_count(&self) -> usize {
        self.proposals.len()
    }

    pub fn has_proposals(&self) -> bool {
        !self.proposals.is_empty()
    }
}

/// Grouped, ordered cards plus the quality counters gathered on the way
#[derive(Debug, Clone, Default)]
pub struct GroupedCards {
    pub cards: Vec<SwapCard>,
    pub quality: DataQuality,
}

/// Response-level metadata for one page of cards
#[derive(Debug, Clone, PartialEq)]
pub struct CardSetMetadata {
    pub total_swaps: usize,
    pub total_proposals: usize,
    pub swaps_with_proposals: usize,
    pub data_quality: DataQuality,
    pub elapsed_ms: u64,
    pub latency_budget_ms: u64,
    pub budget_exceeded: bool,
}

impl CardSetMetadata {
    /// Aggregate metadata over the cards actually returned
    pub fn build(cards: &[SwapCard], data_quality: DataQuality, elapsed_ms: u64, latency_budget_ms: u64) -> Self {
        Self {
            total_swaps: cards.len(),
            total_proposals: cards.iter().map(SwapCard::proposal_count).sum(),
            swaps_with_proposals: cards.iter().filter(|c| c.has_proposals()).count(),
            data_quality,
            elapsed_ms,
            latency_budget_ms,
            budget_exceeded: elapsed_ms > latency_budget_ms,
        }
    }
}

/// Most recent first, then id ascending
fn proposal_order(a: &ProposalRecord, b: &ProposalRecord) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| a.id.cmp(&b.id))
}

/// Most recent first, undated swaps last, then id ascending
fn swap_order(a: &SwapRecord, b: &SwapRecord) -> Ordering {
    match (&a.created_at, &b.created_at) {
        (Some(x), Some(y)) => y.cmp(x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.id.cmp(&b.id))
}

fn violation(swap_id: &str, proposal_id: &str, detail: String) -> StorageError {
    error!(
        swap_id = %swap_id,
        proposal_id = %proposal_id,
        detail = %detail,
        "Self-exclusion invariant violated"
    );
    StorageError::InvariantViolation {
        swap_id: swap_id.to_string(),
        proposal_id: proposal_id.to_string(),
        detail,
    }
}

/// Group normalized proposals by swap for `viewer_id`.
///
/// Fails with `InvariantViolation` if a swap is not the viewer's or a
/// self-proposal reached this stage; either means the query constraint broke.
pub fn group_by_swap(viewer_id: &str, snapshot: NormalizedSnapshot) -> Result<GroupedCards, StorageError> {
    let NormalizedSnapshot {
        swaps,
        proposals,
        mut quality,
    } = snapshot;

    let mut index: HashMap<String, usize> = HashMap::with_capacity(swaps.len());
    let mut cards: Vec<SwapCard> = Vec::with_capacity(swaps.len());

    for swap in swaps {
        if swap.owner_user_id != viewer_id {
            return Err(violation(
                &swap.id,
                "-",
                format!("swap owned by '{}' in card set of '{}'", swap.owner_user_id, viewer_id),
            ));
        }
        if index.contains_key(&swap.id) {
            // Duplicate join rows; the first one wins
            warn!(swap_id = %swap.id, "Duplicate swap row in snapshot");
            continue;
        }
        index.insert(swap.id.clone(), cards.len());
        cards.push(SwapCard {
            swap,
            proposals: Vec::new(),
        });
    }

    for proposal in proposals {
        if proposal.swap_owner_user_id != viewer_id {
            return Err(violation(
                &proposal.swap_id,
                &proposal.id,
                format!("proposal on swap owned by '{}'", proposal.swap_owner_user_id),
            ));
        }
        if !is_admissible(&proposal.swap_owner_user_id, &proposal.proposer_user_id) {
            return Err(violation(
                &proposal.swap_id,
                &proposal.id,
                "proposer is the swap owner".to_string(),
            ));
        }

        match index.get(&proposal.swap_id) {
            Some(&slot) => cards[slot].proposals.push(proposal),
            None => {
                warn!(
                    proposal_id = %proposal.id,
                    swap_id = %proposal.swap_id,
                    "Excluding proposal for swap missing from snapshot"
                );
                quality.excluded_count += 1;
            }
        }
    }

    for card in &mut cards {
        card.proposals.sort_by(proposal_order);
    }
    cards.sort_by(|a, b| swap_order(&a.swap, &b.swap));

    Ok(GroupedCards { cards, quality })
}
