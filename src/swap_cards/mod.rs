//! Proposal aggregation and self-exclusion engine
//!
//! Assembles "swap cards" for a viewer: each swap the viewer owns, paired with
//! the proposals other users made against it.
//!
//! ## Pipeline
//!
//! ```text
//! SwapCardAssembler
//!     ↓
//! ProposalStore (one snapshot, ExclusionConstraint pushed into the query)
//!     ↓
//! normalizer (valid / degraded / corrupt)
//!     ↓
//! grouping (second self-exclusion check, ordering, metadata)
//!     ↓
//! pagination (whole cards)
//! ```
//!
//! The engine only reads. It holds no locks or caches and keeps no state
//! between requests.

pub mod store;
pub mod exclusion;
pub mod normalizer;
pub mod grouping;
pub mod pagination;
pub mod assembler;

pub use assembler::{AssemblySettings, SwapCardAssembler, SwapCardSet};
pub use exclusion::{admits_row, is_admissible, ExclusionConstraint};
pub use grouping::{CardSetMetadata, SwapCard};
pub use normalizer::{DataQuality, ProposalRecord, SwapRecord};
pub use pagination::{PageRequest, PaginationMeta};
pub use store::{CancelFlag, ProposalStore, ViewerQuery, ViewerSnapshot};
