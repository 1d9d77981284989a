//! Service layer for swap-cards
//!
//! ## Architecture
//!
//! ```text
//! HTTP Handlers (thin)
//!     ↓
//! Service Layer (events, settings)
//!     ↓
//! swap_cards engine
//!     ↓
//! Repository Layer (db/*.rs)
//!     ↓
//! SQLite Database
//! ```

pub mod response;
pub mod events;
pub mod swap_card_service;

pub use response::*;
pub use events::{AggregationEvent, EventBus, EventListener};
pub use swap_card_service::SwapCardService;

use crate::config::Config;
use crate::db::SwapDb;
use std::sync::Arc;

/// Service container handed to the HTTP server
pub struct Services {
    pub db: Arc<SwapDb>,
    pub swap_cards: Arc<SwapCardService>,
    pub events: Arc<EventBus>,
}

impl Services {
    /// Create all services over a shared database
    pub fn new(db: Arc<SwapDb>, config: &Config) -> Self {
        let events = Arc::new(EventBus::new());
        let settings = SwapCardService::settings_from_config(config);

        Self {
            swap_cards: Arc::new(SwapCardService::new(db.clone(), settings, events.clone())),
            db,
            events,
        }
    }
}
