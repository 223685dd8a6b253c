//! Typed funnel events — the append-only interaction record.
//!
//! RULE: events are write-once. Nothing mutates or removes an event except
//! `clear()`, which drops the whole log.

use crate::types::{SessionId, VariantId};
use serde::{Deserialize, Serialize};

/// Every interaction recorded during a funnel session.
/// Variants are added as the funnel grows — never removed or reordered.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FunnelEvent {
    SessionStart {
        url: String,
        user_agent: String,
    },
    QuestionAnswered {
        question_id: String,
        answer: String,
        pontos: i64,
        tempo_resposta_ms: u64,
        step: usize,
    },
    NavigationBack {
        from_step: usize,
    },
    NavigationNext {
        from_step: usize,
    },
    InputChange {
        field: String,
    },
    CtaClick {
        label: String,
    },
    QuizCompleted {
        nome: String,
        email: String,
        telefone: String,
        idade: Option<u32>,
        categoria: String,
        classificacao_final: String,
        pontuacao_total: i64,
        tempo_total_ms: u64,
    },
}

/// Extract a stable string name from a FunnelEvent variant.
/// Used for the event_type column in event_log.
pub fn event_type_name(event: &FunnelEvent) -> &'static str {
    match event {
        FunnelEvent::SessionStart { .. } => "session_start",
        FunnelEvent::QuestionAnswered { .. } => "question_answered",
        FunnelEvent::NavigationBack { .. } => "navigation_back",
        FunnelEvent::NavigationNext { .. } => "navigation_next",
        FunnelEvent::InputChange { .. } => "input_change",
        FunnelEvent::CtaClick { .. } => "cta_click",
        FunnelEvent::QuizCompleted { .. } => "quiz_completed",
    }
}

/// The event log entry as persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: Option<i64>,
    pub event_id: String,
    pub session_id: SessionId,
    pub variante: VariantId,
    pub event_type: String,
    pub payload: String, // JSON-serialized FunnelEvent
    pub recorded_at: String,
}

impl EventRecord {
    /// Decode the payload back into a typed event. Corrupt payloads yield
    /// `None` — readers skip them rather than abort.
    pub fn decode(&self) -> Option<FunnelEvent> {
        serde_json::from_str(&self.payload).ok()
    }
}
