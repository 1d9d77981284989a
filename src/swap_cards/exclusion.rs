//! Self-exclusion: a viewer never sees a proposal they made on their own swap
//!
//! Enforced twice. `ExclusionConstraint` is pushed into the store query so
//! self-proposals never leave storage; grouping re-checks `is_admissible` and
//! treats a miss as an invariant violation.

/// Include a proposal iff its proposer is not the swap owner
pub fn is_admissible(swap_owner_user_id: &str, proposer_user_id: &str) -> bool {
    proposer_user_id != swap_owner_user_id
}

/// Query constraint scoping proposals to a viewer's swaps, minus self-proposals.
///
/// The SQL fragments are static and take the viewer id as bound parameter
/// `?1`. Aliases: `s` = swaps, `p` = proposals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionConstraint {
    viewer_id: String,
}

impl ExclusionConstraint {
    /// Swaps owned by the viewer
    pub const OWNERSHIP_SQL: &'static str = "s.owner_user_id = ?1";

    /// Ownership plus proposer != owner. `IS NOT` is null-safe, so a row with a
    /// NULL proposer still reaches the normalizer and is counted as corrupt.
    pub const OWNERSHIP_AND_EXCLUSION_SQL: &'static str =
        "s.owner_user_id = ?1 AND p.proposer_user_id IS NOT s.owner_user_id";

    pub fn for_viewer(viewer_id: &str) -> Self {
        Self {
            viewer_id: viewer_id.to_string(),
        }
    }

    pub fn viewer_id(&self) -> &str {
        &self.viewer_id
    }

    /// WHERE fragment for the proposal query
    pub fn where_clause(&self, push_down: bool) -> &'static str {
        if push_down {
            Self::OWNERSHIP_AND_EXCLUSION_SQL
        } else {
            Self::OWNERSHIP_SQL
        }
    }
}

/// Post-filter for stores that cannot push the exclusion into their query.
///
/// Checks only the proposer, never ownership: a foreign row must reach
/// grouping and fail there. Rows without a proposer pass so the normalizer
/// can count them.
pub fn admits_row(swap_owner_user_id: &str, proposer_user_id: Option<&str>) -> bool {
    proposer_user_id.map_or(true, |p| is_admissible(swap_owner_user_id, p))
}
