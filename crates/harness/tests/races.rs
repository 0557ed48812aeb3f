use chrono::{Duration, NaiveDate};

use daybook_core::LineageId;
use daybook_engine::{telemetry, ContinuationRequest, EngineError, JournalConfig, LoggingConfig};
use daybook_harness::{CaptureLayer, TestNetwork};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;
use daybook_storage::DocumentStore;

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn request(title: &str, content: &str) -> ContinuationRequest {
    ContinuationRequest {
        title: title.into(),
        content: content.into(),
        color: None,
    }
}

// ============================================================================
// Duplicate reconciliation
// ============================================================================

#[test]
fn reconciler_keeps_the_latest_of_each_title() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init_for_tests(&LoggingConfig::default());
    let today = day(2024, 1, 3);
    let mut net = TestNetwork::new(today)?;
    let a = net.add_client()?;

    let mut seeded = Vec::new();
    for _ in 0..3 {
        seeded.push(net.client_mut(a).seed(None, "Untitled", "", Some(today))?);
        net.clock().advance(Duration::seconds(1));
    }
    let single = net.client_mut(a).seed(None, "Unique", "", Some(today))?;
    let other_day = net
        .client_mut(a)
        .seed(None, "Untitled", "", Some(day(2024, 1, 2)))?;

    let report = net.client_mut(a).journal.reconcile_duplicates(today)?;

    assert_eq!(report.groups.len(), 1);
    assert_eq!(report.groups[0].keep, seeded[2].id);
    assert_eq!(report.deleted, 2);
    let remaining: Vec<_> = net.client(a).documents_on(today)?.iter().map(|d| d.id).collect();
    assert_eq!(remaining, vec![seeded[2].id, single.id]);
    assert!(net.client(a).document(other_day.id)?.is_some());

    // Nothing left to do the second time.
    let again = net.client_mut(a).journal.reconcile_duplicates(today)?;
    assert!(again.groups.is_empty());
    assert_eq!(again.deleted, 0);
    Ok(())
}

#[test]
fn reconciler_logs_each_group_before_deleting() -> Result<(), Box<dyn std::error::Error>> {
    let today = day(2024, 1, 3);
    let mut net = TestNetwork::new(today)?;
    let a = net.add_client()?;
    let mut standup = Vec::new();
    let mut notes = Vec::new();
    for _ in 0..2 {
        standup.push(net.client_mut(a).seed(None, "Standup", "", Some(today))?);
        notes.push(net.client_mut(a).seed(None, "Notes", "", Some(today))?);
        net.clock().advance(Duration::seconds(1));
    }
    let total = net.client(a).document_count()?;

    let (layer, logs) = CaptureLayer::new();
    let layer = layer.watching(net.open_store()?);
    let dispatch = tracing::Dispatch::new(Registry::default().with(layer));
    let report = tracing::dispatcher::with_default(&dispatch, || {
        net.client_mut(a).journal.reconcile_duplicates(today)
    })?;
    assert_eq!(report.deleted, 2);

    let warnings = logs.at_level(Level::WARN);
    assert_eq!(warnings.len(), 2);
    for (warning, group) in warnings.iter().zip(&report.groups) {
        assert_eq!(warning.field("title"), Some(group.title.as_str()));
        assert_eq!(warning.field("keep"), Some(group.keep.to_string().as_str()));
        // Nothing was gone yet when the record was written.
        assert_eq!(warning.documents, Some(total));
    }
    assert_eq!(report.groups[0].keep, standup[1].id);
    assert_eq!(report.groups[1].keep, notes[1].id);
    assert_eq!(net.client(a).document_count()?, total - 2);
    Ok(())
}

// ============================================================================
// Concurrent materialization
// ============================================================================

#[test]
fn racing_sessions_insert_twice_and_reconciler_repairs() -> Result<(), Box<dyn std::error::Error>> {
    let today = day(2024, 1, 3);
    let mut net = TestNetwork::new(today)?;
    let a = net.add_client()?;
    let lineage = LineageId::mint();
    let base = net
        .client_mut(a)
        .seed(Some(&lineage), "Standup", "", Some(day(2024, 1, 2)))?;

    let mut journal = net.hooked_journal()?;
    let mut racer = net.detached_client()?;
    let clock = net.clock().clone();
    let base_id = base.id;
    journal.store_mut().before_insert(move || {
        racer.continue_from(base_id, "from the other tab").unwrap();
        clock.advance(Duration::seconds(1));
    });

    let mine = journal.materialize(base.id, &request("Standup", "from this tab"))?;

    let entries = journal.store().find_lineage_entry(&lineage, today)?.unwrap();
    assert_ne!(entries.id, mine.id, "the racer's entry has the lower id");
    let on_today = net.client(a).documents_on(today)?;
    assert_eq!(on_today.len(), 2);
    assert!(on_today.iter().all(|d| d.lineage_id.as_ref() == Some(&lineage)));

    // A third session adopts an existing entry instead of adding another.
    let third = net.client_mut(a).continue_from(base.id, "third")?;
    assert_eq!(third.id, entries.id);
    assert_eq!(net.client(a).documents_on(today)?.len(), 2);

    let report = journal.reconcile_duplicates(today)?;
    assert_eq!(report.groups.len(), 1);
    assert_eq!(report.groups[0].keep, mine.id);
    let survivors = net.client(a).documents_on(today)?;
    assert_eq!(survivors.len(), 1);
    assert_eq!(survivors[0].content, "from this tab");
    Ok(())
}

#[test]
fn racing_backfills_split_the_lineage() -> Result<(), Box<dyn std::error::Error>> {
    let today = day(2024, 1, 3);
    let mut net = TestNetwork::new(today)?;
    let a = net.add_client()?;
    let base = net.client_mut(a).seed(None, "Legacy", "", Some(day(2024, 1, 2)))?;

    let mut journal = net.hooked_journal()?;
    let mut racer = net.detached_client()?;
    let clock = net.clock().clone();
    let base_id = base.id;
    journal.store_mut().before_backfill(move || {
        racer.continue_from(base_id, "theirs").unwrap();
        clock.advance(Duration::seconds(1));
    });

    let outcome = journal.materialize_detailed(base.id, &request("Legacy", "mine"))?;
    let mine = outcome.document;
    let minted = outcome.backfilled.unwrap();

    // The base keeps the first token written to it.
    let base_after = net.client(a).document(base.id)?.unwrap();
    let winner = base_after.lineage_id.clone().unwrap();
    assert_ne!(winner, minted);
    assert_eq!(mine.lineage_id, Some(minted));

    let on_today = net.client(a).documents_on(today)?;
    assert_eq!(on_today.len(), 2);

    // Only the winner's continuation is reachable from the base's history.
    let history = net.client(a).journal.get_history(base.id)?;
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|d| d.id != mine.id));

    let report = journal.reconcile_duplicates(today)?;
    assert_eq!(report.deleted, 1);
    assert_eq!(report.groups[0].keep, mine.id);
    assert_eq!(net.client(a).documents_on(today)?.len(), 1);
    Ok(())
}

#[test]
fn unique_index_surfaces_conflict_and_session_adopts_winner() -> Result<(), Box<dyn std::error::Error>> {
    let today = day(2024, 1, 3);
    let config = JournalConfig {
        enforce_lineage_date_unique: true,
        ..JournalConfig::default()
    };
    let mut net = TestNetwork::with_config(today, config)?;
    let a = net.add_client()?;
    let lineage = LineageId::mint();
    let base = net
        .client_mut(a)
        .seed(Some(&lineage), "Standup", "", Some(day(2024, 1, 2)))?;

    // Bare materialize reports the conflict.
    let mut journal = net.hooked_journal()?;
    let mut racer = net.detached_client()?;
    let base_id = base.id;
    journal.store_mut().before_insert(move || {
        racer.continue_from(base_id, "theirs").unwrap();
    });
    let err = journal
        .materialize(base.id, &request("Standup", "mine"))
        .unwrap_err();
    assert!(matches!(err, EngineError::LineageDateConflict { .. }));
    assert_eq!(net.client(a).documents_on(today)?.len(), 1);
    Ok(())
}

#[test]
fn session_retries_after_unique_conflict() -> Result<(), Box<dyn std::error::Error>> {
    let today = day(2024, 1, 3);
    let config = JournalConfig {
        enforce_lineage_date_unique: true,
        ..JournalConfig::default()
    };
    let mut net = TestNetwork::with_config(today, config)?;
    let a = net.add_client()?;
    let lineage = LineageId::mint();
    let base = net
        .client_mut(a)
        .seed(Some(&lineage), "Standup", "", Some(day(2024, 1, 2)))?;

    let mut journal = net.hooked_journal()?;
    let mut racer = net.detached_client()?;
    let base_id = base.id;
    journal.store_mut().before_insert(move || {
        racer.continue_from(base_id, "theirs").unwrap();
    });

    let mut session = daybook_engine::SheetSession::open(&journal, base.id)?;
    session.edit_content(&mut journal, "mine")?;

    assert!(!session.is_virtual());
    let on_today = net.client(a).documents_on(today)?;
    assert_eq!(on_today.len(), 1);
    assert_eq!(session.target_id(), on_today[0].id);
    assert_eq!(on_today[0].content, "theirs");
    assert_eq!(session.view().content(), "mine");

    // The typed text lands on the adopted entry.
    session.flush(&mut journal)?;
    assert_eq!(net.client(a).documents_on(today)?[0].content, "mine");
    Ok(())
}

// ============================================================================
// Store failures
// ============================================================================

#[test]
fn failed_insert_keeps_session_virtual_until_retry() -> Result<(), Box<dyn std::error::Error>> {
    let today = day(2024, 1, 3);
    let mut net = TestNetwork::new(today)?;
    let a = net.add_client()?;
    let lineage = LineageId::mint();
    let base = net
        .client_mut(a)
        .seed(Some(&lineage), "Standup", "", Some(day(2024, 1, 2)))?;

    let mut journal = net.hooked_journal()?;
    let mut session = daybook_engine::SheetSession::open(&journal, base.id)?;

    journal.store_mut().fail_next_insert();
    let err = session.edit_content(&mut journal, "draft").unwrap_err();
    assert!(err.is_store_unavailable());
    assert!(session.is_virtual());
    assert_eq!(session.target_id(), base.id);
    assert!(net.client(a).documents_on(today)?.is_empty());

    session.edit_content(&mut journal, "draft again")?;
    assert!(!session.is_virtual());
    let on_today = net.client(a).documents_on(today)?;
    assert_eq!(on_today.len(), 1);
    assert_eq!(on_today[0].content, "draft again");
    assert_eq!(journal.store().inserts(), 1);
    Ok(())
}
