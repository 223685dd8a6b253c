//! Aggregator / reconciler tests: conversion-rate edges, idempotence,
//! the "bigger wins" self-healing repair and corrupt-row tolerance.

use funnel_core::aggregator::{conversion_rate, merge_leads, Aggregator, RemoteRows, SourceMode};
use funnel_core::config::VariantCatalog;
use funnel_core::event::EventRecord;
use funnel_core::lead::{LeadRow, ViewRow};
use funnel_core::store::LocalStore;

// ── Helpers ──────────────────────────────────────────────────────────────────

fn shared_store(name: &str) -> LocalStore {
    let store = LocalStore::open(&format!("file:{name}?mode=memory&cache=shared")).unwrap();
    store.migrate().unwrap();
    store
}

fn lead(id: &str, variante: &str, categoria: &str, pontuacao: i64) -> LeadRow {
    LeadRow {
        lead_id: id.to_string(),
        nome: format!("Lead {id}"),
        email: format!("{id}@exemplo.com"),
        telefone: Some("11999999999".into()),
        idade: Some(48),
        categoria_lead: Some(categoria.to_string()),
        classificacao_final: Some("A".into()),
        pontuacao_total: pontuacao,
        score_qualificacao: pontuacao,
        prioridade: if categoria == "MUITO_QUENTE" { 5 } else { 2 },
        urgencia: Some("media".into()),
        engajamento: Some("MEDIO".into()),
        motivos_qualificacao: None,
        sintomas_identificados: None,
        tempo_total_questionario: Some(120_000),
        tempo_medio_resposta: Some(24_000),
        voltas_perguntas: 0,
        variante: Some(variante.to_string()),
        versao_questionario: Some(variante.to_string()),
        origem: None,
        respostas_detalhadas: None,
        criado_em: "2025-06-01T12:00:00Z".into(),
    }
}

fn view(variante: &str) -> ViewRow {
    ViewRow {
        variante: variante.to_string(),
        user_agent: Some("test-agent".into()),
        url: Some("https://quiz.local/".into()),
        recorded_at: "2025-06-01T11:00:00Z".into(),
    }
}

// ── Policy functions ─────────────────────────────────────────────────────────

/// Conversion rate: zero views means zero, otherwise one decimal place.
#[test]
fn conversion_rate_edges() {
    assert_eq!(conversion_rate(5, 0), 0.0);
    assert_eq!(conversion_rate(0, 10), 0.0);
    assert_eq!(conversion_rate(1, 3), 33.3);
    assert_eq!(conversion_rate(5, 8), 62.5);
    assert_eq!(conversion_rate(10, 10), 100.0);
}

/// merge_leads: bigger wins, ties keep the first source.
#[test]
fn merge_prefers_the_richer_source() {
    let three: Vec<LeadRow> = (0..3).map(|i| lead(&format!("a{i}"), "testbx4", "MORNO", 50)).collect();
    let five: Vec<LeadRow> = (0..5).map(|i| lead(&format!("b{i}"), "testbx4", "MORNO", 50)).collect();

    assert_eq!(merge_leads(&three, &five).len(), 5);
    assert_eq!(merge_leads(&five, &three).len(), 5);

    let tie: Vec<LeadRow> = (0..3).map(|i| lead(&format!("c{i}"), "testbx4", "MORNO", 50)).collect();
    let winner = merge_leads(&three, &tie);
    assert_eq!(winner[0].lead_id, "a0", "ties keep the first source");
}

// ── Aggregation ──────────────────────────────────────────────────────────────

/// Two divergent local lead sources (3 vs 5 entries) are healed: after one
/// computation both read back the richer set.
#[test]
fn bigger_wins_reconciliation_heals_both_stores() {
    let observer = shared_store("agg-heal");
    for i in 0..3 {
        observer.insert_lead(&lead(&format!("p{i}"), "testbx5", "QUENTE", 70)).unwrap();
    }
    for i in 0..5 {
        observer
            .insert_backup_lead(&lead(&format!("q{i}"), "testbx5", "QUENTE", 70))
            .unwrap();
    }

    let aggregator = Aggregator::new(observer.reopen().unwrap(), VariantCatalog::default());
    let metrics = aggregator.compute_metrics(None).unwrap();

    assert_eq!(metrics.total_leads, 5);
    assert_eq!(observer.lead_count().unwrap(), 5);
    assert_eq!(observer.backup_lead_count().unwrap(), 5);
}

/// Two computations with no intervening writes return identical results —
/// the self-healing repair only runs the first time.
#[test]
fn compute_metrics_is_idempotent() {
    let observer = shared_store("agg-idem");
    observer.insert_view(&view("testbx4")).unwrap();
    observer.insert_view(&view("testbx4")).unwrap();
    observer.insert_lead(&lead("l1", "testbx4", "MUITO_QUENTE", 85)).unwrap();

    let aggregator = Aggregator::new(observer.reopen().unwrap(), VariantCatalog::default());
    let first = aggregator.compute_metrics(None).unwrap();
    let second = aggregator.compute_metrics(None).unwrap();

    assert_eq!(first, second);
}

/// clear_all() leaves all-zero counters behind.
#[test]
fn cleared_store_yields_zero_metrics() {
    let observer = shared_store("agg-clear");
    observer.insert_view(&view("testbx9")).unwrap();
    observer.insert_lead(&lead("l1", "testbx9", "FRIO", 20)).unwrap();

    observer.clear_all().unwrap();

    let aggregator = Aggregator::new(observer.reopen().unwrap(), VariantCatalog::default());
    let metrics = aggregator.compute_metrics(None).unwrap();

    assert_eq!(metrics.total_views, 0);
    assert_eq!(metrics.total_leads, 0);
    assert_eq!(metrics.taxa_conversao, 0.0);
    assert!(metrics.variantes.is_empty());
    assert!(metrics.leads.is_empty());
}

/// Variant grouping resolves display names and tallies the breakdown.
#[test]
fn per_variant_breakdown() {
    let observer = shared_store("agg-variants");
    for _ in 0..4 {
        observer.insert_view(&view("testbx9")).unwrap();
    }
    observer.insert_view(&view("testbx4")).unwrap();

    observer.insert_lead(&lead("l1", "testbx9", "MUITO_QUENTE", 85)).unwrap();
    observer.insert_lead(&lead("l2", "testbx9", "FRIO", 20)).unwrap();

    let aggregator = Aggregator::new(observer.reopen().unwrap(), VariantCatalog::default());
    let metrics = aggregator.compute_metrics(None).unwrap();

    let efeitos = &metrics.variantes["Efeitos Visuais"];
    assert_eq!(efeitos.views, 4);
    assert_eq!(efeitos.leads, 2);
    assert_eq!(efeitos.taxa_conversao, 50.0);
    assert_eq!(efeitos.qualificacao.muito_quentes, 1);
    assert_eq!(efeitos.qualificacao.frios, 1);
    assert_eq!(efeitos.qualificacao.prioridade_alta, 1);
    assert_eq!(efeitos.qualificacao.pontuacao_media, 53); // (85+20)/2 rounded
    assert_eq!(efeitos.qualificacao.tempo_medio_s, 120);

    let base = &metrics.variantes["Base Completa"];
    assert_eq!(base.views, 1);
    assert_eq!(base.leads, 0);
}

/// Remote rows, when supplied, win over everything local.
#[test]
fn remote_rows_take_precedence() {
    let observer = shared_store("agg-remote");
    observer.insert_lead(&lead("local", "testbx4", "FRIO", 10)).unwrap();

    let remote = RemoteRows {
        leads: vec![
            lead("r1", "testbx5", "QUENTE", 70),
            lead("r2", "testbx5", "QUENTE", 72),
        ],
        views: vec![view("testbx5"), view("testbx5"), view("testbx5"), view("testbx5")],
    };

    let aggregator = Aggregator::new(observer.reopen().unwrap(), VariantCatalog::default());
    let metrics = aggregator.compute_metrics(Some(&remote)).unwrap();

    assert_eq!(metrics.mode, SourceMode::Remote);
    assert_eq!(metrics.total_leads, 2);
    assert_eq!(metrics.total_views, 4);
    assert_eq!(metrics.variantes["Com Agendamento"].taxa_conversao, 50.0);
}

/// An unparsable event payload is skipped, not fatal, and leads derived
/// from quiz_completed events heal an empty lead list.
#[test]
fn corrupt_events_are_skipped_and_event_leads_heal_the_lists() {
    let observer = shared_store("agg-corrupt");

    // A completion event whose payload is garbage…
    observer
        .append_event(&EventRecord {
            id: None,
            event_id: "ev-bad".into(),
            session_id: "s-bad".into(),
            variante: "testbx9".into(),
            event_type: "quiz_completed".into(),
            payload: "{not json".into(),
            recorded_at: "2025-06-01T10:00:00Z".into(),
        })
        .unwrap();

    // …and one that decodes cleanly.
    observer
        .append_event(&EventRecord {
            id: None,
            event_id: "ev-ok".into(),
            session_id: "s-ok".into(),
            variante: "testbx9".into(),
            event_type: "quiz_completed".into(),
            payload: serde_json::json!({
                "type": "quiz_completed",
                "nome": "Maria",
                "email": "maria@exemplo.com",
                "telefone": "11999999999",
                "idade": 47,
                "categoria": "QUENTE",
                "classificacao_final": "AA",
                "pontuacao_total": 70,
                "tempo_total_ms": 90000
            })
            .to_string(),
            recorded_at: "2025-06-01T10:05:00Z".into(),
        })
        .unwrap();

    let aggregator = Aggregator::new(observer.reopen().unwrap(), VariantCatalog::default());
    let metrics = aggregator.compute_metrics(None).unwrap();

    assert_eq!(metrics.total_leads, 1, "only the decodable event counts");
    assert_eq!(observer.lead_count().unwrap(), 1, "lead list healed from the event");
    assert_eq!(observer.backup_lead_count().unwrap(), 1);
}
