//! Integration tests for the booking session: confirm-then-commit against
//! the in-memory reservation store.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use slotbook_core::environment::Clock;
use slotbook_core::reservation::ReservationId;
use slotbook_core::reservation_store::{ReservationStore, StoreError};
use slotbook_core::slot::SlotLabel;
use slotbook_core::validation::{IdentityField, RejectReason};
use slotbook_runtime::{
    AdminConsole, BookingError, BookingSession, ConfirmSource, HealthStatus, Schedule,
    SessionConfig,
};
use slotbook_testing::{fixtures, test_clock, InMemoryReservationStore};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Test Fixtures
// ============================================================================

fn schedule() -> Arc<Schedule> {
    Arc::new(Schedule::new(fixtures::small_registry(), &fixtures::three_group_roster()).unwrap())
}

async fn connect(store: &InMemoryReservationStore, config: SessionConfig) -> BookingSession {
    BookingSession::connect(
        Arc::new(store.clone()),
        schedule(),
        Arc::new(test_clock()),
        config,
    )
    .await
    .unwrap()
}

async fn wait_for_len(session: &BookingSession, len: usize) {
    let mut changes = session.changes();
    tokio::time::timeout(Duration::from_secs(5), changes.wait_for(|s| s.len() == len))
        .await
        .expect("snapshot never reached the expected size")
        .unwrap();
}

async fn wait_for_health(session: &BookingSession, status: HealthStatus) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while session.health().status != status {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("session never reached the expected health");
}

fn reason(result: Result<impl std::fmt::Debug, BookingError>) -> RejectReason {
    match result {
        Err(BookingError::Validation(error)) => error.reason,
        other => panic!("Expected a validation error, got {other:?}"),
    }
}

// ============================================================================
// Accept path
// ============================================================================

#[tokio::test]
async fn test_submit_writes_and_stamps_reservation() {
    slotbook_testing::init_test_tracing();
    let store = InMemoryReservationStore::new();
    let session = connect(&store, SessionConfig::default()).await;

    let reservation = session
        .submit(fixtures::candidate(1, "a", fixtures::MORNING))
        .await
        .unwrap();

    assert_eq!(reservation.holder_name, "Holder 1");
    assert_eq!(reservation.created_at, test_clock().now());
    assert_eq!(store.records(), vec![reservation]);

    wait_for_len(&session, 1).await;
    let usage = session.quota_usage();
    assert_eq!(usage[0].used, 1);
    assert_eq!(usage[0].remaining, 3);
}

#[tokio::test]
async fn test_connect_sees_existing_reservations() {
    let store = InMemoryReservationStore::with_reservations(vec![
        fixtures::reservation(1, "a", fixtures::MORNING),
        fixtures::reservation(2, "c", fixtures::MORNING),
    ]);

    let session = connect(&store, SessionConfig::default()).await;

    assert_eq!(session.snapshot().len(), 2);
    let board = session.slot_board();
    assert_eq!(board.len(), 6);
    assert_eq!(board[0].label, SlotLabel::new(fixtures::MORNING));
    assert_eq!(board[0].occupants, 2);
    assert!(board[0].full);
    assert!(!board[1].full);
    assert!(!board[2].bookable);
    assert!(session.health().status.is_healthy());
}

// ============================================================================
// Rejections
// ============================================================================

#[tokio::test]
async fn test_third_booking_of_full_slot_is_rejected() {
    let store = InMemoryReservationStore::with_reservations(vec![
        fixtures::reservation(1, "a", fixtures::MORNING),
        fixtures::reservation(2, "b", fixtures::MORNING),
    ]);
    let session = connect(&store, SessionConfig::default()).await;
    let candidate = fixtures::candidate(3, "c", fixtures::MORNING);

    let result = session.submit(candidate.clone()).await;

    assert_eq!(
        reason(result),
        RejectReason::SlotFull {
            slot: SlotLabel::new(fixtures::MORNING),
            capacity: 2,
        }
    );
    assert_eq!(store.len(), 2);

    // Same person, next window
    let reservation = session
        .submit(candidate.for_slot(fixtures::LATE_MORNING))
        .await
        .unwrap();
    assert_eq!(reservation.slot.as_str(), fixtures::LATE_MORNING);
    assert_eq!(store.len(), 3);
}

#[tokio::test]
async fn test_group_at_quota_is_rejected_while_slots_remain() {
    // Group B holds all three of its seats
    let store = InMemoryReservationStore::with_reservations(vec![
        fixtures::reservation(1, "b", fixtures::MORNING),
        fixtures::reservation(2, "b", fixtures::LATE_MORNING),
        fixtures::reservation(3, "b", "10:15 - 10:45"),
    ]);
    let session = connect(&store, SessionConfig::default()).await;

    let result = session
        .submit(fixtures::candidate(4, "b", "10:45 - 11:15"))
        .await;

    assert_eq!(reason(result).code(), "group_full");
    assert!(!session.slot_board()[3].full);
    assert_eq!(store.len(), 3);
}

#[tokio::test]
async fn test_reused_contact_suffix_is_a_duplicate() {
    let store = InMemoryReservationStore::with_reservations(vec![fixtures::reservation(
        1234,
        "a",
        fixtures::MORNING,
    )]);
    let session = connect(&store, SessionConfig::default()).await;

    // Different name and email, same suffix
    let mut candidate = fixtures::candidate(2, "b", fixtures::LATE_MORNING);
    candidate.contact_suffix = "1234".to_string();

    assert_eq!(
        reason(session.submit(candidate).await),
        RejectReason::Duplicate {
            field: IdentityField::ContactSuffix,
            value: "1234".to_string(),
        }
    );
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_check_rejects_without_writing() {
    let store = InMemoryReservationStore::with_reservations(vec![
        fixtures::reservation(1, "a", fixtures::MORNING),
        fixtures::reservation(2, "b", fixtures::MORNING),
    ]);
    let session = connect(&store, SessionConfig::default()).await;

    let error = session
        .check(&fixtures::candidate(3, "c", fixtures::MORNING))
        .unwrap_err();

    assert_eq!(error.reason.code(), "slot_full");
    assert!(session
        .check(&fixtures::candidate(3, "c", fixtures::LATE_MORNING))
        .is_ok());
    assert_eq!(store.len(), 2);
}

// ============================================================================
// Snapshot updates
// ============================================================================

#[tokio::test]
async fn test_deletion_frees_seat_on_next_snapshot() {
    let store = InMemoryReservationStore::with_reservations(vec![
        fixtures::reservation(1, "a", fixtures::MORNING),
        fixtures::reservation(2, "b", fixtures::MORNING),
    ]);
    let session = connect(&store, SessionConfig::default()).await;
    let admin = AdminConsole::new(Arc::new(store.clone()), schedule());
    assert_eq!(session.quota_usage()[0].used, 1);

    admin.delete(&ReservationId::new("r1")).await.unwrap();
    wait_for_len(&session, 1).await;

    assert_eq!(session.quota_usage()[0].used, 0);
    assert_eq!(session.slot_board()[0].occupants, 1);
    assert!(session
        .submit(fixtures::candidate(3, "c", fixtures::MORNING))
        .await
        .is_ok());
}

#[tokio::test]
async fn test_dropping_session_unsubscribes() {
    let store = InMemoryReservationStore::new();
    let session = connect(&store, SessionConfig::default()).await;
    assert_eq!(store.subscriber_count(), 1);

    drop(session);

    tokio::time::timeout(Duration::from_secs(5), async {
        while store.subscriber_count() > 0 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("snapshot pump kept its subscription");
}

// ============================================================================
// Races
// ============================================================================

#[tokio::test]
async fn test_stale_sessions_can_overbook_a_slot() {
    // Both clients see one free place and neither has received the other's write.
    let store = InMemoryReservationStore::with_reservations(vec![fixtures::reservation(
        1,
        "a",
        fixtures::MORNING,
    )]);
    let first = connect(&store, SessionConfig::default()).await;
    let second = connect(&store, SessionConfig::default()).await;

    first
        .submit(fixtures::candidate(2, "b", fixtures::MORNING))
        .await
        .unwrap();
    second
        .submit(fixtures::candidate(3, "c", fixtures::MORNING))
        .await
        .unwrap();

    let occupants = store
        .records()
        .iter()
        .filter(|r| r.slot.as_str() == fixtures::MORNING)
        .count();
    assert_eq!(occupants, 3);
}

#[tokio::test]
async fn test_store_read_confirm_catches_unseen_write() {
    let store = InMemoryReservationStore::with_reservations(vec![fixtures::reservation(
        1,
        "a",
        fixtures::MORNING,
    )]);
    let session = connect(
        &store,
        SessionConfig::default().with_confirm_source(ConfirmSource::StoreRead),
    )
    .await;

    // Another client takes the last place; the session has not seen it yet
    store.insert_unchecked(fixtures::new_reservation(2, "b", fixtures::MORNING));

    let result = session
        .submit(fixtures::candidate(3, "c", fixtures::MORNING))
        .await;

    assert_eq!(reason(result).code(), "slot_full");
    assert_eq!(store.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_second_submit_while_pending_is_refused() {
    let store = InMemoryReservationStore::new().with_insert_latency(Duration::from_secs(1));
    let session = connect(&store, SessionConfig::default()).await;

    let first = session.submit(fixtures::candidate(1, "a", fixtures::MORNING));
    tokio::pin!(first);
    assert!(futures::poll!(&mut first).is_pending());
    assert!(session.is_submitting());

    let second = session
        .submit(fixtures::candidate(2, "b", fixtures::LATE_MORNING))
        .await;
    assert_eq!(second.unwrap_err(), BookingError::SubmissionInFlight);

    first.await.unwrap();
    assert!(!session.is_submitting());
    assert_eq!(store.len(), 1);
}

// ============================================================================
// Store failures
// ============================================================================

#[tokio::test]
async fn test_insert_failure_surfaces_and_is_not_retried() {
    let store = InMemoryReservationStore::new();
    let session = connect(&store, SessionConfig::default()).await;
    store.fail_next_insert(StoreError::PermissionDenied("rules".to_string()));

    let result = session
        .submit(fixtures::candidate(1, "a", fixtures::MORNING))
        .await;

    assert_eq!(
        result.unwrap_err(),
        BookingError::Store(StoreError::PermissionDenied("rules".to_string()))
    );
    assert!(store.is_empty());
    assert!(!session.is_submitting());

    // The caller may resubmit
    session
        .submit(fixtures::candidate(1, "a", fixtures::MORNING))
        .await
        .unwrap();
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_confirm_read_failure_writes_nothing() {
    let store = InMemoryReservationStore::new();
    let session = connect(
        &store,
        SessionConfig::default().with_confirm_source(ConfirmSource::StoreRead),
    )
    .await;
    store.fail_next_list(StoreError::Read("offline".to_string()));

    let result = session
        .submit(fixtures::candidate(1, "a", fixtures::MORNING))
        .await;

    assert!(matches!(result, Err(BookingError::Store(StoreError::Read(_)))));
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_local_confirm_source_makes_no_store_read() {
    let store = InMemoryReservationStore::new();
    store.fail_next_list(StoreError::Read("unreachable".to_string()));
    let session = connect(&store, SessionConfig::default()).await;

    session
        .submit(fixtures::candidate(1, "a", fixtures::MORNING))
        .await
        .unwrap();

    // The armed list failure is still pending
    assert!(matches!(
        store.list_once().await,
        Err(StoreError::Read(_))
    ));
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_connect_fails_when_subscription_is_refused() {
    let store = InMemoryReservationStore::new();
    store.fail_next_subscribe(StoreError::PermissionDenied("no read".to_string()));

    let result = BookingSession::connect(
        Arc::new(store),
        schedule(),
        Arc::new(test_clock()),
        SessionConfig::default(),
    )
    .await;

    assert!(matches!(
        result,
        Err(BookingError::Store(StoreError::PermissionDenied(_)))
    ));
}

// ============================================================================
// Feed health
// ============================================================================

#[tokio::test]
async fn test_feed_error_degrades_until_next_snapshot() {
    let store = InMemoryReservationStore::new();
    let session = connect(&store, SessionConfig::default()).await;
    assert_eq!(session.health().status, HealthStatus::Healthy);

    store.fail_feed(StoreError::Subscription("socket reset".to_string()));
    wait_for_health(&session, HealthStatus::Degraded).await;
    assert!(session.snapshot().is_empty());

    store.insert_unchecked(fixtures::new_reservation(1, "a", fixtures::MORNING));
    wait_for_health(&session, HealthStatus::Healthy).await;
    assert_eq!(session.snapshot().len(), 1);
}

#[tokio::test]
async fn test_closed_feed_is_unhealthy_and_keeps_last_snapshot() {
    let store = InMemoryReservationStore::with_reservations(vec![fixtures::reservation(
        1,
        "a",
        fixtures::MORNING,
    )]);
    let session = connect(&store, SessionConfig::default()).await;

    store.close_feed();
    wait_for_health(&session, HealthStatus::Unhealthy).await;

    let health = session.health();
    assert_eq!(health.message.as_deref(), Some("Snapshot feed closed"));
    assert_eq!(session.snapshot().len(), 1);
}
