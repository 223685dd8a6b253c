//! Lead data model — the completed submission and its flat persisted row.

use crate::scoring::{Answer, Qualification};
use crate::types::{LeadId, VariantId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub nome: String,
    pub email: String,
    #[serde(default)]
    pub telefone: String,
    #[serde(default)]
    pub idade: Option<u32>,
}

/// A completed submission: contact, qualification, answers.
/// Created exactly once per completed quiz.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    pub contato: Contact,
    pub qualificacao: Qualification,
    pub variante: VariantId,
    pub tempo_total_ms: u64,
    pub respostas: BTreeMap<String, Answer>,
    pub criado_em: String,
}

/// The flat lead row as persisted — locally and in the hosted dashboard
/// table. Field names follow the wire schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadRow {
    #[serde(default)]
    pub lead_id: String,
    pub nome: String,
    pub email: String,
    #[serde(default)]
    pub telefone: Option<String>,
    #[serde(default)]
    pub idade: Option<i64>,
    #[serde(default)]
    pub categoria_lead: Option<String>,
    #[serde(default)]
    pub classificacao_final: Option<String>,
    #[serde(default)]
    pub pontuacao_total: i64,
    #[serde(default)]
    pub score_qualificacao: i64,
    #[serde(default = "default_prioridade")]
    pub prioridade: i64,
    #[serde(default)]
    pub urgencia: Option<String>,
    #[serde(default)]
    pub engajamento: Option<String>,
    #[serde(default)]
    pub motivos_qualificacao: Option<String>,
    #[serde(default)]
    pub sintomas_identificados: Option<String>,
    #[serde(default)]
    pub tempo_total_questionario: Option<i64>,
    #[serde(default)]
    pub tempo_medio_resposta: Option<i64>,
    #[serde(default)]
    pub voltas_perguntas: i64,
    #[serde(default)]
    pub variante: Option<String>,
    #[serde(default)]
    pub versao_questionario: Option<String>,
    #[serde(default)]
    pub origem: Option<String>,
    #[serde(default)]
    pub respostas_detalhadas: Option<String>,
    #[serde(default)]
    pub criado_em: String,
}

fn default_prioridade() -> i64 {
    1
}

impl Lead {
    /// Flatten into the persisted row shape.
    pub fn to_row(&self) -> LeadRow {
        let q = &self.qualificacao;
        LeadRow {
            lead_id: self.id.clone(),
            nome: self.contato.nome.clone(),
            email: self.contato.email.clone(),
            telefone: if self.contato.telefone.is_empty() {
                None
            } else {
                Some(self.contato.telefone.clone())
            },
            idade: self.contato.idade.map(|i| i as i64),
            categoria_lead: Some(q.categoria.as_str().to_string()),
            classificacao_final: Some(q.classificacao_final.as_str().to_string()),
            pontuacao_total: q.score,
            score_qualificacao: q.score,
            prioridade: q.prioridade as i64,
            urgencia: Some(q.urgencia.as_str().to_string()),
            engajamento: Some(q.comportamento.engajamento.as_str().to_string()),
            motivos_qualificacao: serde_json::to_string(&q.motivos).ok(),
            sintomas_identificados: serde_json::to_string(&q.sintomas).ok(),
            tempo_total_questionario: Some(self.tempo_total_ms as i64),
            tempo_medio_resposta: Some(q.comportamento.tempo_medio_resposta_ms as i64),
            voltas_perguntas: q.comportamento.voltas_perguntas as i64,
            variante: Some(self.variante.clone()),
            versao_questionario: Some(self.variante.clone()),
            origem: Some("questionario_direto".to_string()),
            respostas_detalhadas: serde_json::to_string(&self.respostas).ok(),
            criado_em: self.criado_em.clone(),
        }
    }
}

/// A recorded page view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewRow {
    pub variante: String,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub recorded_at: String,
}
