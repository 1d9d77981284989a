//! Integration tests for swap card aggregation
//!
//! Layered like the service: what the store returns (filtering), what the
//! engine builds (transformation), what the API emits (response shape).

use std::sync::mpsc;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use rusqlite::{params, TransactionBehavior};
use swap_cards::db::listings::{create_booking, create_proposal, create_swap, delete_booking};
use swap_cards::db::{CreateBookingInput, CreateProposalInput, CreateSwapInput};
use swap_cards::swap_cards::{AssemblySettings, ProposalStore, ViewerQuery};
use swap_cards::views::SwapCardsView;
use swap_cards::{CancelFlag, Config, PageRequest, StorageError, SwapCardAssembler, SwapCardSet, SwapDb};
use tempfile::TempDir;

// =============================================================================
// Fixtures
// =============================================================================

fn booking_input(owner: &str, title: &str) -> CreateBookingInput {
    CreateBookingInput {
        id: None,
        owner_user_id: owner.to_string(),
        status: "available".into(),
        title: Some(title.to_string()),
        location: Some("Lisbon".into()),
        provider: Some("booking.com".into()),
        check_in: Some("2026-12-10".into()),
        check_out: Some("2026-12-14".into()),
        original_price: Some(500.0),
        swap_value: Some(450.0),
    }
}

fn add_booking(db: &SwapDb, owner: &str) -> String {
    db.with_conn_mut(|conn| create_booking(conn, booking_input(owner, "Stay")))
        .unwrap()
}

fn add_swap(db: &SwapDb, owner: &str, created_at: &str) -> String {
    let booking_id = add_booking(db, owner);
    db.with_conn_mut(|conn| {
        create_swap(conn, CreateSwapInput {
            id: None,
            booking_id,
            created_at: Some(created_at.to_string()),
        })
    })
    .unwrap()
}

fn add_proposal(db: &SwapDb, swap_id: &str, proposer: &str, created_at: &str) -> String {
    let offered = add_booking(db, proposer);
    db.with_conn_mut(|conn| {
        create_proposal(conn, CreateProposalInput {
            id: None,
            swap_id: swap_id.to_string(),
            proposer_user_id: proposer.to_string(),
            offered_booking_id: offered,
            status: "pending".into(),
            message: None,
            created_at: Some(created_at.to_string()),
        })
    })
    .unwrap()
}

/// Bypass the submission service, the way a bad migration would
fn inject_raw_proposal(
    db: &SwapDb,
    id: &str,
    swap_id: &str,
    proposer: Option<&str>,
    offered_booking_id: Option<&str>,
) {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO proposals (id, swap_id, proposer_user_id, offered_booking_id, status, created_at)
             VALUES (?, ?, ?, ?, 'pending', '2026-10-15T08:00:00Z')",
            params![id, swap_id, proposer, offered_booking_id],
        )
        .map_err(StorageError::from)
    })
    .unwrap();
}

fn assembler(db: Arc<SwapDb>) -> SwapCardAssembler {
    SwapCardAssembler::new(db, AssemblySettings::default())
}

fn assemble(db: &Arc<SwapDb>, viewer: &str, limit: usize, offset: usize) -> SwapCardSet {
    assembler(db.clone())
        .assemble(viewer, PageRequest::new(limit, offset).unwrap(), &CancelFlag::new())
        .unwrap()
}

fn all_cards(db: &Arc<SwapDb>, viewer: &str) -> SwapCardSet {
    assemble(db, viewer, 1000, 0)
}

/// alice: 3 swaps; bob: 1 swap; proposals flowing both ways
fn marketplace() -> Arc<SwapDb> {
    let db = Arc::new(SwapDb::open_in_memory().unwrap());

    let a1 = add_swap(&db, "alice", "2026-09-01T10:00:00Z");
    let a2 = add_swap(&db, "alice", "2026-09-03T10:00:00Z");
    let _a3 = add_swap(&db, "alice", "2026-09-02T10:00:00Z");
    let b1 = add_swap(&db, "bob", "2026-09-04T10:00:00Z");

    add_proposal(&db, &a1, "bob", "2026-10-01T10:00:00Z");
    add_proposal(&db, &a1, "carol", "2026-10-03T10:00:00Z");
    add_proposal(&db, &a2, "dave", "2026-10-02T10:00:00Z");
    add_proposal(&db, &b1, "alice", "2026-10-04T10:00:00Z");
    add_proposal(&db, &b1, "carol", "2026-10-05T10:00:00Z");

    db
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn scenario_a_self_proposal_injected_into_storage_is_never_shown() {
    let db = Arc::new(SwapDb::open_in_memory().unwrap());
    let swap = add_swap(&db, "u", "2026-09-01T00:00:00Z");
    add_proposal(&db, &swap, "p1", "2026-10-01T00:00:00Z");
    add_proposal(&db, &swap, "p2", "2026-10-02T00:00:00Z");
    add_proposal(&db, &swap, "p3", "2026-10-03T00:00:00Z");
    let own_booking = add_booking(&db, "u");
    inject_raw_proposal(&db, "self-proposal", &swap, Some("u"), Some(&own_booking));

    let set = all_cards(&db, "u");

    assert_eq!(set.cards.len(), 1);
    let card = &set.cards[0];
    assert_eq!(card.proposal_count(), 3);
    assert!(card.proposals.iter().all(|p| p.proposer_user_id != "u"));
    assert_eq!(set.metadata.data_quality.excluded_count, 0);
}

#[test]
fn scenario_b_pagination_over_cards() {
    let db = Arc::new(SwapDb::open_in_memory().unwrap());
    let _empty = add_swap(&db, "u", "2026-09-01T00:00:00Z");
    let busy = add_swap(&db, "u", "2026-09-02T00:00:00Z");
    for i in 0..5 {
        add_proposal(&db, &busy, &format!("user-{}", i), &format!("2026-10-0{}T00:00:00Z", i + 1));
    }

    let set = assemble(&db, "u", 1, 0);

    assert_eq!(set.cards.len(), 1);
    assert!(set.pagination.has_more);
    assert_eq!(set.pagination.total, 2);
    // The newer swap comes first and keeps all of its proposals
    assert_eq!(set.cards[0].swap.id, busy);
    assert_eq!(set.cards[0].proposal_count(), 5);
}

#[test]
fn scenario_c_deleted_booking_excludes_only_that_proposal() {
    let db = Arc::new(SwapDb::open_in_memory().unwrap());
    let swap = add_swap(&db, "u", "2026-09-01T00:00:00Z");
    add_proposal(&db, &swap, "p1", "2026-10-01T00:00:00Z");
    add_proposal(&db, &swap, "p2", "2026-10-02T00:00:00Z");
    let doomed = add_booking(&db, "p3");
    inject_raw_proposal(&db, "p3-proposal", &swap, Some("p3"), Some(&doomed));
    assert!(db.with_conn_mut(|conn| delete_booking(conn, &doomed)).unwrap());

    let set = all_cards(&db, "u");

    assert_eq!(set.metadata.data_quality.excluded_count, 1);
    assert_eq!(set.cards[0].proposal_count(), 2);
    assert!(set.cards[0].proposals.iter().all(|p| p.id != "p3-proposal"));
}

// =============================================================================
// Properties
// =============================================================================

#[test]
fn p1_no_viewer_ever_sees_their_own_proposals() {
    let db = marketplace();
    for viewer in ["alice", "bob", "carol", "dave"] {
        let set = all_cards(&db, viewer);
        for card in &set.cards {
            assert_eq!(card.swap.owner_user_id, viewer);
            for proposal in &card.proposals {
                assert_ne!(proposal.proposer_user_id, viewer);
            }
        }
    }
}

#[test]
fn p2_every_owned_swap_appears_exactly_once() {
    let db = marketplace();
    let set = all_cards(&db, "alice");

    let mut ids: Vec<&str> = set.cards.iter().map(|c| c.swap.id.as_str()).collect();
    assert_eq!(ids.len(), 3);
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 3);

    // One swap has no proposals and is still there
    assert_eq!(set.cards.iter().filter(|c| !c.has_proposals()).count(), 1);

    // Users without swaps get an empty set, not an error
    assert!(all_cards(&db, "carol").cards.is_empty());
}

#[test]
fn p3_counts_match_cardinality() {
    let db = marketplace();
    let set = all_cards(&db, "alice");

    let sum: usize = set.cards.iter().map(|c| c.proposal_count()).sum();
    assert_eq!(set.metadata.total_proposals, sum);
    assert_eq!(sum, 3);
    assert_eq!(set.metadata.total_swaps, set.cards.len());
    for card in &set.cards {
        assert_eq!(card.proposal_count(), card.proposals.len());
        assert_eq!(card.has_proposals(), !card.proposals.is_empty());
    }

    // bob sees alice's and carol's offers
    let bob = all_cards(&db, "bob");
    assert_eq!(bob.metadata.total_proposals, 2);
}

#[test]
fn p4_pages_are_slices_of_the_full_order() {
    let db = marketplace();
    let full: Vec<String> = all_cards(&db, "alice")
        .cards
        .into_iter()
        .map(|c| c.swap.id)
        .collect();

    for limit in 1..=4 {
        for offset in 0..=5 {
            let set = assemble(&db, "alice", limit, offset);
            let got: Vec<String> = set.cards.iter().map(|c| c.swap.id.clone()).collect();
            let start = offset.min(full.len());
            let end = (offset + limit).min(full.len());
            assert_eq!(got, full[start..end].to_vec(), "limit={} offset={}", limit, offset);
            assert_eq!(set.pagination.total, full.len());
            assert_eq!(set.pagination.has_more, offset + got.len() < full.len());
        }
    }
}

#[test]
fn p5_one_corrupt_row_among_valid_rows() {
    let db = Arc::new(SwapDb::open_in_memory().unwrap());
    let swap = add_swap(&db, "u", "2026-09-01T00:00:00Z");
    let n = 6;
    for i in 0..n {
        add_proposal(&db, &swap, &format!("user-{}", i), "2026-10-01T00:00:00Z");
    }
    inject_raw_proposal(&db, "no-booking", &swap, Some("mallory"), None);

    let set = all_cards(&db, "u");

    assert_eq!(set.cards[0].proposal_count(), n);
    assert_eq!(set.metadata.data_quality.excluded_count, 1);
    assert_eq!(set.metadata.data_quality.degraded_count, 0);
}

#[test]
fn p6_repeat_calls_are_identical() {
    let db = marketplace();
    // Ties on created_at exercise the id tie-break
    let swap = add_swap(&db, "erin", "2026-09-01T00:00:00Z");
    for proposer in ["zed", "amy", "kim"] {
        add_proposal(&db, &swap, proposer, "2026-10-01T00:00:00Z");
    }

    for viewer in ["alice", "erin"] {
        let first = serde_json::to_value(SwapCardsView::from(all_cards(&db, viewer))).unwrap();
        let second = serde_json::to_value(SwapCardsView::from(all_cards(&db, viewer))).unwrap();
        assert_eq!(first["swapCards"], second["swapCards"]);
        assert_eq!(first["pagination"], second["pagination"]);
    }

    let erin = all_cards(&db, "erin");
    let ids: Vec<&str> = erin.cards[0].proposals.iter().map(|p| p.id.as_str()).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);
}

// =============================================================================
// Ordering, degradation and fallback
// =============================================================================

#[test]
fn proposals_are_newest_first() {
    let db = marketplace();
    let set = all_cards(&db, "alice");
    for card in &set.cards {
        for pair in card.proposals.windows(2) {
            assert!(pair[0].created_at >= pair[1].created_at);
        }
    }
    // Swaps newest first as well
    let created: Vec<_> = set.cards.iter().map(|c| c.swap.created_at).collect();
    for pair in created.windows(2) {
        assert!(pair[0] >= pair[1]);
    }
}

#[test]
fn degraded_offer_is_kept_and_counted() {
    let db = Arc::new(SwapDb::open_in_memory().unwrap());
    let swap = add_swap(&db, "u", "2026-09-01T00:00:00Z");
    let sparse = db
        .with_conn_mut(|conn| {
            create_booking(conn, CreateBookingInput {
                provider: None,
                swap_value: None,
                ..booking_input("v", "Sparse")
            })
        })
        .unwrap();
    db.with_conn_mut(|conn| {
        create_proposal(conn, CreateProposalInput {
            id: Some("sparse-offer".into()),
            swap_id: swap.clone(),
            proposer_user_id: "v".into(),
            offered_booking_id: sparse,
            status: "pending".into(),
            message: None,
            created_at: Some("2026-10-01T00:00:00Z".into()),
        })
    })
    .unwrap();

    let set = all_cards(&db, "u");
    assert_eq!(set.metadata.data_quality.degraded_count, 1);
    assert_eq!(set.metadata.data_quality.excluded_count, 0);

    let view = serde_json::to_value(SwapCardsView::from(set)).unwrap();
    let proposal = &view["swapCards"][0]["proposals"][0];
    assert_eq!(proposal["dataQuality"], "degraded");
    assert!(proposal["offeredBooking"]["provider"].is_null());
    assert!(proposal["offeredBooking"]["swapValue"].is_null());
}

#[test]
fn swap_with_deleted_booking_still_has_a_card() {
    let db = Arc::new(SwapDb::open_in_memory().unwrap());
    let booking = add_booking(&db, "u");
    let swap = db
        .with_conn_mut(|conn| {
            create_swap(conn, CreateSwapInput {
                id: None,
                booking_id: booking.clone(),
                created_at: Some("2026-09-01T00:00:00Z".into()),
            })
        })
        .unwrap();
    add_proposal(&db, &swap, "v", "2026-10-01T00:00:00Z");
    db.with_conn_mut(|conn| delete_booking(conn, &booking)).unwrap();

    let set = all_cards(&db, "u");
    assert_eq!(set.cards.len(), 1);
    assert!(set.cards[0].swap.booking.is_none());
    assert_eq!(set.cards[0].proposal_count(), 1);
    assert_eq!(set.metadata.data_quality.degraded_swap_count, 1);
}

#[test]
fn null_proposer_is_counted_not_dropped_silently() {
    let db = Arc::new(SwapDb::open_in_memory().unwrap());
    let swap = add_swap(&db, "u", "2026-09-01T00:00:00Z");
    let offered = add_booking(&db, "ghost");
    inject_raw_proposal(&db, "anonymous", &swap, None, Some(&offered));

    let set = all_cards(&db, "u");
    assert_eq!(set.cards[0].proposal_count(), 0);
    assert_eq!(set.metadata.data_quality.excluded_count, 1);
}

#[test]
fn post_filter_fallback_matches_push_down() {
    let db = marketplace();
    let own = add_booking(&db, "alice");
    let alice_swap = all_cards(&db, "alice").cards[0].swap.id.clone();
    inject_raw_proposal(&db, "alice-self", &alice_swap, Some("alice"), Some(&own));

    let pushed = all_cards(&db, "alice");

    // Same rows, exclusion applied in-process instead of in SQL
    let raw = Arc::try_unwrap(db).ok().expect("sole owner");
    let fallback_db = Arc::new(raw.without_exclusion_pushdown());
    assert!(!fallback_db.pushes_down_exclusion());
    let filtered = all_cards(&fallback_db, "alice");

    assert_eq!(pushed.cards, filtered.cards);
    assert_eq!(pushed.metadata.total_proposals, filtered.metadata.total_proposals);
}

#[test]
fn store_snapshot_reads_with_cancellation() {
    let db = marketplace();
    let cancel = CancelFlag::new();
    cancel.cancel();
    let query = ViewerQuery::new("alice", &["pending".to_string()]);
    let err = db.fetch_proposals_for_viewer(&query, &cancel).unwrap_err();
    assert!(matches!(err, StorageError::Cancelled));

    // The connection is released and usable afterwards
    assert_eq!(all_cards(&db, "alice").cards.len(), 3);
}

#[test]
fn on_disk_database_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let config = on_disk_config(&dir);
    let swap_id = {
        let db = Arc::new(SwapDb::open(&config).unwrap());
        let swap = add_swap(&db, "u", "2026-09-01T00:00:00Z");
        add_proposal(&db, &swap, "v", "2026-10-01T00:00:00Z");
        swap
    };

    let db = Arc::new(SwapDb::open(&config).unwrap());
    let set = all_cards(&db, "u");
    assert_eq!(set.cards[0].swap.id, swap_id);
    assert_eq!(set.cards[0].proposal_count(), 1);
    assert_eq!(db.stats().unwrap().proposal_count, 1);
}

// =============================================================================
// Concurrency
// =============================================================================

fn on_disk_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.storage_dir = dir.path().to_path_buf();
    config.read_pool_size = 4;
    config
}

#[test]
fn aggregation_proceeds_while_another_snapshot_is_open() {
    let db = marketplace();

    // An in-flight aggregation for bob holding its read snapshot
    let (opened_tx, opened_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let holder = {
        let db = db.clone();
        thread::spawn(move || {
            let mut conn = db.read_conn().unwrap();
            let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred).unwrap();
            let n: i64 = tx.query_row("SELECT COUNT(*) FROM proposals", [], |r| r.get(0)).unwrap();
            opened_tx.send(n).unwrap();
            release_rx.recv().ok();
            tx.commit().unwrap();
        })
    };
    assert_eq!(opened_rx.recv().unwrap(), 5);

    let (done_tx, done_rx) = mpsc::channel();
    {
        let db = db.clone();
        thread::spawn(move || {
            done_tx.send(all_cards(&db, "alice").cards.len()).ok();
        });
    }
    let cards = done_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("aggregation queued behind an open snapshot");
    assert_eq!(cards, 3);

    release_tx.send(()).unwrap();
    holder.join().unwrap();
}

#[test]
fn aggregation_reads_committed_snapshot_during_a_write() {
    let dir = TempDir::new().unwrap();
    let db = Arc::new(SwapDb::open(&on_disk_config(&dir)).unwrap());
    let swap = add_swap(&db, "u", "2026-09-01T00:00:00Z");
    add_proposal(&db, &swap, "v", "2026-10-01T00:00:00Z");
    let offered = add_booking(&db, "w");

    // Writer holds the write lock with an uncommitted proposal
    let (written_tx, written_rx) = mpsc::channel();
    let (commit_tx, commit_rx) = mpsc::channel::<()>();
    let writer = {
        let db = db.clone();
        let swap = swap.clone();
        thread::spawn(move || {
            db.with_conn_mut(|conn| {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT INTO proposals (id, swap_id, proposer_user_id, offered_booking_id, status, created_at)
                     VALUES ('late', ?, 'w', ?, 'pending', '2026-10-02T00:00:00Z')",
                    params![swap, offered],
                )?;
                written_tx.send(()).unwrap();
                commit_rx.recv().ok();
                tx.commit()?;
                Ok(())
            })
            .unwrap();
        })
    };
    written_rx.recv().unwrap();

    let (done_tx, done_rx) = mpsc::channel();
    {
        let db = db.clone();
        thread::spawn(move || {
            done_tx.send(all_cards(&db, "u").cards[0].proposal_count()).ok();
        });
    }
    let during = done_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("aggregation queued behind the writer");
    assert_eq!(during, 1);

    commit_tx.send(()).unwrap();
    writer.join().unwrap();
    assert_eq!(all_cards(&db, "u").cards[0].proposal_count(), 2);
}

#[test]
fn concurrent_aggregations_match_sequential_results() {
    let db = marketplace();
    let viewers = ["alice", "bob", "carol", "dave"];
    let expected: Vec<_> = viewers.iter().map(|v| all_cards(&db, v).cards).collect();

    let barrier = Arc::new(Barrier::new(viewers.len()));
    let handles: Vec<_> = viewers
        .iter()
        .map(|viewer| {
            let db = db.clone();
            let barrier = barrier.clone();
            let viewer = viewer.to_string();
            thread::spawn(move || {
                barrier.wait();
                all_cards(&db, &viewer).cards
            })
        })
        .collect();

    for (handle, expected) in handles.into_iter().zip(expected) {
        assert_eq!(handle.join().unwrap(), expected);
    }
}
