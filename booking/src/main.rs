//! Slotbook demo.
//!
//! Builds the schedule from configuration, connects two booking clients to
//! an in-memory reservation store and walks through an accepted booking, a
//! duplicate, a full slot and an admin clear.

use slotbook::{App, Config};
use slotbook_core::environment::SystemClock;
use slotbook_core::reservation::Candidate;
use slotbook_runtime::metrics::MetricsServer;
use slotbook_runtime::BookingSession;
use slotbook_testing::InMemoryReservationStore;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "slotbook=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        slot_capacity = config.booking.slot_capacity,
        confirm_source = ?config.booking.confirm_source,
        "Configuration loaded"
    );

    let mut metrics = MetricsServer::new(config.metrics_addr()?);
    if config.metrics.enabled {
        metrics.start()?;
    }

    let store = Arc::new(InMemoryReservationStore::new());
    let app = App::build(&config, store)?;
    app.log_quotas();

    let alice = app.session(Arc::new(SystemClock)).await?;
    let bob = app.session(Arc::new(SystemClock)).await?;

    let first_slot = app
        .schedule()
        .registry()
        .list_bookable_slots()
        .next()
        .map(|slot| slot.label.clone())
        .ok_or("schedule has no bookable slot")?;

    attempt(
        &alice,
        Candidate::new("Lin", "ent", "lin@example.com", "1234", first_slot.clone()),
    )
    .await;

    let mut changes = bob.changes();
    changes.wait_for(|snapshot| snapshot.len() == 1).await?;
    // Same contact suffix as Lin
    attempt(
        &bob,
        Candidate::new("Chen", "surgery", "chen@example.com", "1234", first_slot.clone()),
    )
    .await;
    attempt(
        &bob,
        Candidate::new("Chen", "surgery", "chen@example.com", "5678", first_slot.clone()),
    )
    .await;

    changes.wait_for(|snapshot| snapshot.len() == 2).await?;
    attempt(
        &bob,
        Candidate::new("Wu", "family", "wu@example.com", "9012", first_slot),
    )
    .await;

    for row in bob.quota_usage().iter().filter(|row| row.used > 0) {
        info!(group = %row.group_id, used = row.used, remaining = row.remaining, "Usage");
    }

    let admin = app.admin();
    let summary = admin.summary().await?;
    info!(
        booked = summary.figures.total_booked,
        remaining = summary.figures.remaining,
        busiest = ?summary.figures.busiest_group,
        "Summary"
    );

    let report = admin.clear_all().await?;
    info!(deleted = report.deleted.len(), failed = report.failed.len(), "Cleared");

    if let Some(rendered) = metrics.render() {
        println!("{rendered}");
    }
    Ok(())
}

async fn attempt(session: &BookingSession, candidate: Candidate) {
    let name = candidate.holder_name.clone();
    match session.submit(candidate).await {
        Ok(reservation) => info!(%name, id = %reservation.id, slot = %reservation.slot, "Booked"),
        Err(error) => warn!(%name, %error, "Not booked"),
    }
}
