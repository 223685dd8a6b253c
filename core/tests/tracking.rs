//! Tracker / event log tests: durable appends, clear semantics, the
//! completion idempotency guard and degraded-mode behavior.

use funnel_core::config::ScoringConfig;
use funnel_core::lead::Contact;
use funnel_core::store::LocalStore;
use funnel_core::tracker::Tracker;

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Shared-memory database so a second handle can observe what the tracker
/// wrote. The URI keeps each test isolated by name.
fn shared_store(name: &str) -> LocalStore {
    let store = LocalStore::open(&format!("file:{name}?mode=memory&cache=shared")).unwrap();
    store.migrate().unwrap();
    store
}

fn tracker_on(store: LocalStore, session: &str) -> Tracker {
    Tracker::new(
        store,
        ScoringConfig::default(),
        session.to_string(),
        "testbx9".to_string(),
    )
}

fn contato() -> Contact {
    Contact {
        nome: "Maria Teste".into(),
        email: "maria@exemplo.com".into(),
        telefone: "11999999999".into(),
        idade: Some(45),
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// An appended event is visible to a reader immediately after the call
/// returns.
#[test]
fn append_is_visible_to_immediate_read() {
    let observer = shared_store("trk-visible");
    let mut tracker = tracker_on(observer.reopen().unwrap(), "s-1");

    let recorded = tracker.start_session("https://quiz.local/?variante=testbx9", "test-agent");

    let events = tracker.events().unwrap();
    assert!(events.iter().any(|e| e.event_id == recorded.event_id));

    // The independent handle sees it too — the write was synchronous.
    assert_eq!(observer.count_events_of_type("session_start").unwrap(), 1);
}

/// clear() leaves an empty log behind.
#[test]
fn clear_empties_the_log() {
    let store = shared_store("trk-clear");
    let mut tracker = tracker_on(store, "s-2");

    tracker.start_session("https://quiz.local/", "test-agent");
    tracker.record_answer("idade", "Entre 46 e 55 anos", 15, 7_000, 1);
    assert_eq!(tracker.events().unwrap().len(), 2);

    tracker.clear().unwrap();
    assert!(tracker.events().unwrap().is_empty());
}

/// Completing the quiz registers the lead in both the primary list and
/// the backup copy, and records the quiz_completed event.
#[test]
fn completion_registers_lead_redundantly() {
    let observer = shared_store("trk-complete");
    let mut tracker = tracker_on(observer.reopen().unwrap(), "s-3");

    tracker.start_session("https://quiz.local/", "test-agent");
    tracker.record_answer("sintomas", "Ondas de calor (fogachos)", 15, 9_000, 1);
    tracker.record_answer("impacto", "Muito, afetam minha rotina diariamente", 25, 11_000, 2);

    let lead = tracker.complete_quiz(contato(), 120_000).unwrap();

    assert_eq!(lead.qualificacao.score, 40);
    assert_eq!(observer.lead_count().unwrap(), 1);
    assert_eq!(observer.backup_lead_count().unwrap(), 1);
    assert_eq!(observer.count_events_of_type("quiz_completed").unwrap(), 1);
}

/// Invoking the completion path twice must not register a second lead.
#[test]
fn completion_is_idempotent_per_session() {
    let observer = shared_store("trk-idem");
    let mut tracker = tracker_on(observer.reopen().unwrap(), "s-4");

    tracker.start_session("https://quiz.local/", "test-agent");
    tracker.record_answer("duracao", "Mais de 2 anos", 20, 6_000, 1);

    tracker.complete_quiz(contato(), 60_000).unwrap();
    let second = tracker.complete_quiz(contato(), 60_000);

    assert!(second.is_err(), "second completion must be rejected");
    assert_eq!(observer.lead_count().unwrap(), 1);
    assert_eq!(observer.count_events_of_type("quiz_completed").unwrap(), 1);
}

/// A fresh tracker on the same session also refuses to re-register: the
/// guard holds across tracker instances, not just within one.
#[test]
fn completion_guard_survives_tracker_restart() {
    let observer = shared_store("trk-restart");

    let mut first = tracker_on(observer.reopen().unwrap(), "s-5");
    first.start_session("https://quiz.local/", "test-agent");
    first.record_answer("impacto", "Pouco, são sintomas leves", 10, 5_500, 1);
    first.complete_quiz(contato(), 30_000).unwrap();

    let mut second = tracker_on(observer.reopen().unwrap(), "s-5");
    second.record_answer("impacto", "Pouco, são sintomas leves", 10, 5_500, 1);
    assert!(second.complete_quiz(contato(), 30_000).is_err());
    assert_eq!(observer.lead_count().unwrap(), 1);
}

/// A broken store must never fail the caller: track() still returns a
/// best-effort event and keeps it readable from this tracker.
#[test]
fn append_degrades_when_storage_is_unavailable() {
    // No migrate(): every table is missing, every insert fails.
    let broken = LocalStore::in_memory().unwrap();
    let mut tracker = tracker_on(broken, "s-6");

    let recorded = tracker.start_session("https://quiz.local/", "test-agent");
    assert_eq!(recorded.event_type, "session_start");
    assert!(recorded.id.is_none(), "degraded events have no rowid");
}
