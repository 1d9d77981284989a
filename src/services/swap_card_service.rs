//! Swap card service - the read path behind the swap cards endpoint
//!
//! Wraps the assembler with event emission for the observability layer.

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::StorageError;
use crate::swap_cards::{AssemblySettings, CancelFlag, PageRequest, ProposalStore, SwapCardAssembler, SwapCardSet};

use super::events::{AggregationEvent, EventBus};

pub struct SwapCardService {
    assembler: SwapCardAssembler,
    events: Arc<EventBus>,
}

impl SwapCardService {
    pub fn new(store: Arc<dyn ProposalStore>, settings: AssemblySettings, events: Arc<EventBus>) -> Self {
        Self {
            assembler: SwapCardAssembler::new(store, settings),
            events,
        }
    }

    /// Build assembler settings from config
    pub fn settings_from_config(config: &Config) -> AssemblySettings {
        AssemblySettings {
            latency_budget: Duration::from_millis(config.latency_budget_ms),
            visible_statuses: config.visible_proposal_statuses.clone(),
        }
    }

    /// Swap cards for `viewer_id`, one page
    pub fn list_cards(
        &self,
        viewer_id: &str,
        page: PageRequest,
        cancel: &CancelFlag,
    ) -> Result<SwapCardSet, StorageError> {
        let set = match self.assembler.assemble(viewer_id, page, cancel) {
            Ok(set) => set,
            Err(e) => {
                if let StorageError::InvariantViolation { swap_id, proposal_id, .. } = &e {
                    self.events.emit(AggregationEvent::InvariantViolated {
                        viewer_id: viewer_id.to_string(),
                        swap_id: swap_id.clone(),
                        proposal_id: proposal_id.clone(),
                    });
                }
                return Err(e);
            }
        };

        let meta = &set.metadata;
        if meta.budget_exceeded {
            self.events.emit(AggregationEvent::LatencyBudgetExceeded {
                viewer_id: viewer_id.to_string(),
                elapsed_ms: meta.elapsed_ms,
                budget_ms: meta.latency_budget_ms,
            });
        }
        let quality = meta.data_quality;
        if quality.excluded_count > 0 || quality.degraded_count > 0 {
            self.events.emit(AggregationEvent::RowsExcluded {
                viewer_id: viewer_id.to_string(),
                excluded: quality.excluded_count,
                degraded: quality.degraded_count,
            });
        }
        self.events.emit(AggregationEvent::CardsAssembled {
            viewer_id: viewer_id.to_string(),
            cards: set.cards.len(),
            proposals: meta.total_proposals,
            elapsed_ms: meta.elapsed_ms,
        });

        Ok(set)
    }
}
