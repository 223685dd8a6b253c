//! Dashboard metrics — aggregation over redundant lead/view sources with
//! self-healing reconciliation.
//!
//! Source precedence:
//!   - Remote rows, when the caller fetched them, win outright.
//!   - Otherwise the local sources are reconciled first: the flat lead
//!     list, its backup copy and the leads derivable from quiz_completed
//!     events. The richest source wins and is copied over the poorer
//!     stores ("bigger wins" — there is no merge beyond that).
//!   - The repair is write-once: repairing an already-repaired store is a
//!     no-op, so computing metrics twice without intervening writes
//!     returns identical results.
//!
//! Corrupt rows (unparsable payloads) are skipped, never fatal.

use crate::canonical::extract_variant_code;
use crate::config::VariantCatalog;
use crate::error::FunnelResult;
use crate::event::{EventRecord, FunnelEvent};
use crate::lead::{LeadRow, ViewRow};
use crate::store::LocalStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ── Output types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualificationBreakdown {
    pub frios: i64,
    pub mornos: i64,
    pub quentes: i64,
    pub muito_quentes: i64,
    pub classificacao_b: i64,
    pub classificacao_a: i64,
    pub classificacao_aa: i64,
    pub classificacao_aaa: i64,
    pub urgentes: i64,
    pub prioridade_alta: i64,
    pub pontuacao_media: i64,
    pub tempo_medio_s: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariantMetrics {
    pub views: i64,
    pub leads: i64,
    pub taxa_conversao: f64,
    pub qualificacao: QualificationBreakdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceMode {
    Remote,
    Local,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub total_views: i64,
    pub total_leads: i64,
    pub taxa_conversao: f64,
    pub variantes: BTreeMap<String, VariantMetrics>,
    /// Most recent leads, capped at 50.
    pub leads: Vec<LeadRow>,
    pub mode: SourceMode,
}

/// Rows fetched from the hosted store by the caller.
#[derive(Debug, Clone, Default)]
pub struct RemoteRows {
    pub leads: Vec<LeadRow>,
    pub views: Vec<ViewRow>,
}

// ── Policy functions ─────────────────────────────────────────────────────────

/// The reconciliation policy: whichever source holds more entries wins.
/// Ties keep the first argument. No row-level merge is attempted.
pub fn merge_leads<'a>(a: &'a [LeadRow], b: &'a [LeadRow]) -> &'a [LeadRow] {
    if b.len() > a.len() {
        b
    } else {
        a
    }
}

/// Leads / views as a percentage, one decimal place. Zero views means
/// zero — never a division by zero.
pub fn conversion_rate(leads: i64, views: i64) -> f64 {
    if views <= 0 {
        return 0.0;
    }
    let pct = leads as f64 / views as f64 * 100.0;
    (pct * 10.0).round() / 10.0
}

/// Variant grouping key for a lead row, resolved in fixed priority order:
/// explicit variant, questionnaire version, origin, then "default".
fn variant_of_lead(row: &LeadRow) -> String {
    let raw = [&row.variante, &row.versao_questionario, &row.origem]
        .into_iter()
        .flatten()
        .find(|s| !s.is_empty())
        .map(String::as_str)
        .unwrap_or("default");
    extract_variant_code(raw)
}

fn variant_of_view(view: &ViewRow) -> String {
    if view.variante.is_empty() {
        "default".to_string()
    } else {
        extract_variant_code(&view.variante)
    }
}

/// Rebuild a flat lead row from a quiz_completed event. Events that fail
/// to decode yield `None` and are skipped by the caller.
fn lead_row_from_event(record: &EventRecord) -> Option<LeadRow> {
    match record.decode()? {
        FunnelEvent::QuizCompleted {
            nome,
            email,
            telefone,
            idade,
            categoria,
            classificacao_final,
            pontuacao_total,
            tempo_total_ms,
        } => Some(LeadRow {
            lead_id: record.event_id.clone(),
            nome,
            email,
            telefone: Some(telefone).filter(|t| !t.is_empty()),
            idade: idade.map(|i| i as i64),
            categoria_lead: Some(categoria),
            classificacao_final: Some(classificacao_final),
            pontuacao_total,
            score_qualificacao: pontuacao_total,
            prioridade: 1,
            urgencia: None,
            engajamento: None,
            motivos_qualificacao: None,
            sintomas_identificados: None,
            tempo_total_questionario: Some(tempo_total_ms as i64),
            tempo_medio_resposta: None,
            voltas_perguntas: 0,
            variante: Some(record.variante.clone()),
            versao_questionario: Some(record.variante.clone()),
            origem: None,
            respostas_detalhadas: None,
            criado_em: record.recorded_at.clone(),
        }),
        _ => None,
    }
}

// ── Aggregator ───────────────────────────────────────────────────────────────

pub struct Aggregator {
    store: LocalStore,
    catalog: VariantCatalog,
}

impl Aggregator {
    pub fn new(store: LocalStore, catalog: VariantCatalog) -> Self {
        Self { store, catalog }
    }

    /// Compute the dashboard metrics. `remote` carries rows the caller
    /// pulled from the hosted store; `None` means local-only mode.
    pub fn compute_metrics(&self, remote: Option<&RemoteRows>) -> FunnelResult<Metrics> {
        if let Some(rows) = remote {
            return Ok(self.tally(&rows.leads, &rows.views, SourceMode::Remote));
        }

        let (leads, views) = self.reconcile_local()?;
        Ok(self.tally(&leads, &views, SourceMode::Local))
    }

    /// Reconcile the redundant local sources and return the healed rows.
    fn reconcile_local(&self) -> FunnelResult<(Vec<LeadRow>, Vec<ViewRow>)> {
        let primary = self.store.all_leads()?;
        let backup = self.store.all_backup_leads()?;
        let events = self.store.all_events()?;

        let derived: Vec<LeadRow> = events
            .iter()
            .filter(|e| e.event_type == "quiz_completed")
            .filter_map(lead_row_from_event)
            .collect();

        let winner = merge_leads(merge_leads(&primary, &backup), &derived).to_vec();

        // Copy-back repair: only stores that fell behind are rewritten.
        if primary.len() < winner.len() {
            log::debug!(
                "healing lead list: {} -> {} entries",
                primary.len(),
                winner.len()
            );
            self.store.replace_leads(&winner)?;
        }
        if backup.len() < winner.len() {
            log::debug!(
                "healing backup lead list: {} -> {} entries",
                backup.len(),
                winner.len()
            );
            self.store.replace_backup_leads(&winner)?;
        }

        // Views: the session_start events and the view rows describe the
        // same visits; the richer count wins.
        let view_rows = self.store.all_views()?;
        let derived_views: Vec<ViewRow> = events
            .iter()
            .filter(|e| e.event_type == "session_start")
            .map(|e| ViewRow {
                variante: e.variante.clone(),
                user_agent: None,
                url: None,
                recorded_at: e.recorded_at.clone(),
            })
            .collect();
        let views = if derived_views.len() > view_rows.len() {
            derived_views
        } else {
            view_rows
        };

        Ok((winner, views))
    }

    fn tally(&self, leads: &[LeadRow], views: &[ViewRow], mode: SourceMode) -> Metrics {
        let mut variantes: BTreeMap<String, VariantMetrics> = BTreeMap::new();

        for view in views {
            let name = self.catalog.display_name(&variant_of_view(view));
            variantes.entry(name).or_default().views += 1;
        }

        for lead in leads {
            let name = self.catalog.display_name(&variant_of_lead(lead));
            let entry = variantes.entry(name).or_default();
            entry.leads += 1;

            let q = &mut entry.qualificacao;
            match lead.categoria_lead.as_deref() {
                Some("FRIO") => q.frios += 1,
                Some("MORNO") => q.mornos += 1,
                Some("QUENTE") => q.quentes += 1,
                Some("MUITO_QUENTE") => q.muito_quentes += 1,
                _ => {}
            }
            match lead.classificacao_final.as_deref() {
                Some("B") => q.classificacao_b += 1,
                Some("A") => q.classificacao_a += 1,
                Some("AA") => q.classificacao_aa += 1,
                Some("AAA") => q.classificacao_aaa += 1,
                _ => {}
            }
            if lead.urgencia.as_deref() == Some("alta") {
                q.urgentes += 1;
            }
            if lead.prioridade >= 4 {
                q.prioridade_alta += 1;
            }
        }

        // Means need a second pass per variant: sums were not kept in the
        // breakdown to keep it a plain output shape.
        for (name, metrics) in variantes.iter_mut() {
            let in_variant: Vec<&LeadRow> = leads
                .iter()
                .filter(|l| &self.catalog.display_name(&variant_of_lead(l)) == name)
                .collect();

            let scored: Vec<i64> = in_variant.iter().map(|l| l.pontuacao_total).collect();
            if !scored.is_empty() {
                metrics.qualificacao.pontuacao_media =
                    (scored.iter().sum::<i64>() as f64 / scored.len() as f64).round() as i64;
            }

            let timed: Vec<i64> = in_variant
                .iter()
                .filter_map(|l| l.tempo_total_questionario)
                .collect();
            if !timed.is_empty() {
                metrics.qualificacao.tempo_medio_s =
                    (timed.iter().sum::<i64>() as f64 / timed.len() as f64 / 1000.0).round() as i64;
            }

            metrics.taxa_conversao = conversion_rate(metrics.leads, metrics.views);
        }

        let total_views = views.len() as i64;
        let total_leads = leads.len() as i64;

        let recent: Vec<LeadRow> = leads
            .iter()
            .rev()
            .take(50)
            .cloned()
            .collect();

        Metrics {
            total_views,
            total_leads,
            taxa_conversao: conversion_rate(total_leads, total_views),
            variantes,
            leads: recent,
            mode,
        }
    }
}
