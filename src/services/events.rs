//! Aggregation events for the observability layer
//!
//! The engine only reports. Budget overruns, excluded rows and invariant
//! violations are published here for whoever subscribes (alerting, metrics).

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, trace, warn};

/// Events emitted by the swap card service
#[derive(Debug, Clone)]
pub enum AggregationEvent {
    CardsAssembled {
        viewer_id: String,
        cards: usize,
        proposals: usize,
        elapsed_ms: u64,
    },
    LatencyBudgetExceeded {
        viewer_id: String,
        elapsed_ms: u64,
        budget_ms: u64,
    },
    RowsExcluded {
        viewer_id: String,
        excluded: usize,
        degraded: usize,
    },
    InvariantViolated {
        viewer_id: String,
        swap_id: String,
        proposal_id: String,
    },
}

/// Trait for event listeners
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: &AggregationEvent);
}

/// Event bus for broadcasting aggregation events
pub struct EventBus {
    sender: broadcast::Sender<AggregationEvent>,
}

impl EventBus {
    /// Create a new event bus with default capacity
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    /// Create a new event bus with specified capacity
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event to all subscribers
    pub fn emit(&self, event: AggregationEvent) {
        trace!(event = ?event, "Emitting aggregation event");
        // No subscribers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AggregationEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Logs every event at a level matching its severity
pub struct LoggingEventListener;

impl EventListener for LoggingEventListener {
    fn on_event(&self, event: &AggregationEvent) {
        match event {
            AggregationEvent::LatencyBudgetExceeded { viewer_id, elapsed_ms, budget_ms } => {
                warn!(viewer_id = %viewer_id, elapsed_ms, budget_ms, "Latency budget exceeded");
            }
            AggregationEvent::RowsExcluded { viewer_id, excluded, degraded } => {
                debug!(viewer_id = %viewer_id, excluded, degraded, "Data quality issues recovered");
            }
            AggregationEvent::InvariantViolated { viewer_id, swap_id, proposal_id } => {
                error!(
                    viewer_id = %viewer_id,
                    swap_id = %swap_id,
                    proposal_id = %proposal_id,
                    "Self-exclusion invariant violated"
                );
            }
            _ => {
                trace!(event = ?event, "Aggregation event");
            }
        }
    }
}

/// Spawn a background task that logs all events
pub fn spawn_logging_listener(event_bus: Arc<EventBus>) -> tokio::task::JoinHandle<()> {
    let mut receiver = event_bus.subscribe();
    let listener = LoggingEventListener;

    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => listener.on_event(&event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    debug!(skipped = n, "Event listener lagged, skipped events");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed, stopping listener");
                    break;
                }
            }
        }
    })
}
