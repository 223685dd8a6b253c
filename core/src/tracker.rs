//! Session tracker — the writing side of the event log.
//!
//! Construction performs no I/O; recording the session start is an
//! explicit call made by the caller at a well-defined point. Appends are
//! synchronous: when `track` returns, the event is durable and visible to
//! any reader. If the store rejects a write the tracker degrades to an
//! in-memory buffer and the funnel keeps moving — a storage failure must
//! never block quiz completion.

use crate::config::ScoringConfig;
use crate::error::{FunnelError, FunnelResult};
use crate::event::{event_type_name, EventRecord, FunnelEvent};
use crate::lead::{Contact, Lead};
use crate::scoring::{qualify, Answer};
use crate::store::LocalStore;
use crate::types::{SessionId, VariantId};
use std::collections::BTreeMap;

pub struct Tracker {
    store: LocalStore,
    scoring: ScoringConfig,
    session_id: SessionId,
    variante: VariantId,
    answers: BTreeMap<String, Answer>,
    voltas_perguntas: u32,
    completed: bool,
    /// Events that could not be persisted; kept so readers of this
    /// tracker still see the full sequence.
    overflow: Vec<EventRecord>,
}

impl Tracker {
    /// Build a tracker for one session. Does not touch the store.
    pub fn new(
        store: LocalStore,
        scoring: ScoringConfig,
        session_id: SessionId,
        variante: VariantId,
    ) -> Self {
        Self {
            store,
            scoring,
            session_id,
            variante,
            answers: BTreeMap::new(),
            voltas_perguntas: 0,
            completed: false,
            overflow: Vec::new(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn variante(&self) -> &str {
        &self.variante
    }

    /// Record the session start. Explicit — the caller decides when a
    /// visit begins.
    pub fn start_session(&mut self, url: &str, user_agent: &str) -> EventRecord {
        self.track(FunnelEvent::SessionStart {
            url: url.to_string(),
            user_agent: user_agent.to_string(),
        })
    }

    /// Record an answer. Re-answering a question overwrites the previous
    /// entry under the same question id.
    pub fn record_answer(
        &mut self,
        question_id: &str,
        resposta: &str,
        pontos: i64,
        tempo_ms: u64,
        step: usize,
    ) -> EventRecord {
        self.answers.insert(
            question_id.to_string(),
            Answer {
                pergunta: question_id.to_string(),
                resposta: resposta.to_string(),
                pontos,
                tempo_ms,
                variante: self.variante.clone(),
            },
        );
        self.track(FunnelEvent::QuestionAnswered {
            question_id: question_id.to_string(),
            answer: resposta.to_string(),
            pontos,
            tempo_resposta_ms: tempo_ms,
            step,
        })
    }

    pub fn navigate_back(&mut self, from_step: usize) -> EventRecord {
        self.voltas_perguntas += 1;
        self.track(FunnelEvent::NavigationBack { from_step })
    }

    pub fn navigate_next(&mut self, from_step: usize) -> EventRecord {
        self.track(FunnelEvent::NavigationNext { from_step })
    }

    /// Append any event. Never fails the caller: a rejected write is
    /// logged and buffered in memory instead.
    pub fn track(&mut self, event: FunnelEvent) -> EventRecord {
        let payload = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
        let mut record = EventRecord {
            id: None,
            event_id: uuid::Uuid::new_v4().to_string(),
            session_id: self.session_id.clone(),
            variante: self.variante.clone(),
            event_type: event_type_name(&event).to_string(),
            payload,
            recorded_at: chrono::Utc::now().to_rfc3339(),
        };

        match self.store.append_event(&record) {
            Ok(rowid) => record.id = Some(rowid),
            Err(e) => {
                log::warn!(
                    "event store rejected '{}' for session {}: {e}; keeping in memory",
                    record.event_type,
                    self.session_id
                );
                self.overflow.push(record.clone());
            }
        }
        record
    }

    /// Full event log (persisted entries first, then any degraded-mode
    /// buffer), in insertion order.
    pub fn events(&self) -> FunnelResult<Vec<EventRecord>> {
        let mut events = self.store.all_events()?;
        events.extend(self.overflow.iter().cloned());
        Ok(events)
    }

    /// Drop the whole event log.
    pub fn clear(&mut self) -> FunnelResult<()> {
        self.overflow.clear();
        self.store.clear_events()
    }

    /// Complete the quiz: qualify, record the completion event and
    /// register the lead — exactly once per session.
    pub fn complete_quiz(&mut self, contato: Contact, tempo_total_ms: u64) -> FunnelResult<Lead> {
        if self.completed
            || self
                .store
                .session_has_event(&self.session_id, "quiz_completed")
                .unwrap_or(false)
        {
            return Err(FunnelError::AlreadyCompleted {
                session_id: self.session_id.clone(),
            });
        }

        let qualificacao = qualify(
            &self.answers,
            tempo_total_ms,
            self.voltas_perguntas,
            contato.idade,
            &self.scoring,
        );

        let lead = Lead {
            id: uuid::Uuid::new_v4().to_string(),
            contato: contato.clone(),
            qualificacao: qualificacao.clone(),
            variante: self.variante.clone(),
            tempo_total_ms,
            respostas: self.answers.clone(),
            criado_em: chrono::Utc::now().to_rfc3339(),
        };

        self.track(FunnelEvent::QuizCompleted {
            nome: contato.nome.clone(),
            email: contato.email.clone(),
            telefone: contato.telefone.clone(),
            idade: contato.idade,
            categoria: qualificacao.categoria.as_str().to_string(),
            classificacao_final: qualificacao.classificacao_final.as_str().to_string(),
            pontuacao_total: qualificacao.score,
            tempo_total_ms,
        });

        // Redundant write: primary list plus backup copy. A failure here
        // is logged, not surfaced — the event above already carries the
        // lead and the aggregator can heal the lists from it.
        let row = lead.to_row();
        if let Err(e) = self.store.insert_lead(&row) {
            log::warn!("lead list write failed for {}: {e}", lead.id);
        }
        if let Err(e) = self.store.insert_backup_lead(&row) {
            log::warn!("backup lead write failed for {}: {e}", lead.id);
        }

        self.completed = true;
        Ok(lead)
    }
}
