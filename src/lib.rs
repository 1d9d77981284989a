//! Swap Cards - incoming proposals on a user's swap listings
//!
//! A user lists bookings (hotel/travel reservations) as swaps; other users
//! propose their own bookings in exchange. This crate serves the read path:
//! for a viewer, every swap they own paired with the proposals other users
//! made against it, and never a proposal the viewer made on their own swap.
//!
//! ## Architecture
//!
//! | Layer | Module |
//! |-------|--------|
//! | HTTP boundary | `http`, `views`, `services::response` |
//! | Service | `services` (events, settings) |
//! | Engine | `swap_cards` (store access, exclusion, normalizer, grouping, pagination, assembler) |
//! | Repository | `db` (SQLite) |
//!
//! ## Storage Layout
//!
//! ```text
//! ~/.local/share/swap-cards/
//! ├── swaps.db       # SQLite (WAL)
//! └── config.toml    # Configuration
//! ```

pub mod config;
pub mod error;
pub mod db;
pub mod swap_cards;
pub mod services;
pub mod views;
pub mod http;

// Re-exports
pub use config::Config;
pub use db::SwapDb;
pub use error::StorageError;
pub use http::HttpServer;
pub use services::Services;
pub use swap_cards::{CancelFlag, PageRequest, SwapCardAssembler, SwapCardSet};
