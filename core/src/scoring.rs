//! Lead qualification — pure scoring over questionnaire answers plus
//! behavioral metadata (response latency, back-navigation).
//!
//! RULES:
//!   - The score is exactly the sum of the recorded answer points at the
//!     moment of computation; negative or missing points count as 0.
//!   - Tier and final classification are monotone in the score.
//!   - Behavioral adjustments move priority, never the tier.

use crate::config::ScoringConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One questionnaire response. Write-once; re-answering a question
/// replaces the entry under the same question id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub pergunta: String,
    pub resposta: String,
    pub pontos: i64,
    pub tempo_ms: u64,
    pub variante: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    Frio,
    Morno,
    Quente,
    MuitoQuente,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Frio => "FRIO",
            Tier::Morno => "MORNO",
            Tier::Quente => "QUENTE",
            Tier::MuitoQuente => "MUITO_QUENTE",
        }
    }
}

/// Compatibility classification kept alongside the tier (B lowest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    B,
    A,
    #[serde(rename = "AA")]
    Aa,
    #[serde(rename = "AAA")]
    Aaa,
}

impl Grade {
    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::B => "B",
            Grade::A => "A",
            Grade::Aa => "AA",
            Grade::Aaa => "AAA",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Engagement {
    Baixo,
    Medio,
    Alto,
}

impl Engagement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Engagement::Baixo => "BAIXO",
            Engagement::Medio => "MEDIO",
            Engagement::Alto => "ALTO",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Baixa,
    Media,
    Alta,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Baixa => "baixa",
            Urgency::Media => "media",
            Urgency::Alta => "alta",
        }
    }
}

/// A single symptom whose answer crossed its flag threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymptomFlag {
    pub nome: String,
    pub urgencia: Urgency,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Behavior {
    pub tempo_medio_resposta_ms: u64,
    pub tempo_total_ms: u64,
    pub voltas_perguntas: u32,
    pub engajamento: Engagement,
}

/// The derived qualification. Computed once at quiz completion,
/// immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Qualification {
    pub score: i64,
    pub categoria: Tier,
    pub classificacao_final: Grade,
    pub prioridade: u8,
    pub motivos: Vec<String>,
    pub urgencia: Urgency,
    pub sintomas: Vec<SymptomFlag>,
    pub comportamento: Behavior,
}

/// Qualify a completed quiz.
///
/// `idade` comes from the contact form; `None` falls back to the
/// configured default age for the urgency rule.
pub fn qualify(
    answers: &BTreeMap<String, Answer>,
    tempo_total_ms: u64,
    voltas_perguntas: u32,
    idade: Option<u32>,
    cfg: &ScoringConfig,
) -> Qualification {
    // Negative points are clamped before summing; the score can never be
    // negative and integer arithmetic keeps NaN out entirely.
    let score: i64 = answers.values().map(|a| a.pontos.max(0)).sum();

    if answers.is_empty() {
        return Qualification {
            score: 0,
            categoria: Tier::Frio,
            classificacao_final: Grade::B,
            prioridade: 1,
            motivos: Vec::new(),
            urgencia: Urgency::Baixa,
            sintomas: Vec::new(),
            comportamento: Behavior {
                tempo_medio_resposta_ms: 0,
                tempo_total_ms,
                voltas_perguntas,
                engajamento: Engagement::Medio,
            },
        };
    }

    let mut motivos = Vec::new();

    // Tier bands are inclusive on their lower bound.
    let (categoria, mut prioridade) = if score <= cfg.frio_max {
        motivos.push("Baixa pontuação no questionário".to_string());
        (Tier::Frio, 1u8)
    } else if score <= cfg.morno_max {
        motivos.push("Pontuação média no questionário".to_string());
        (Tier::Morno, 2)
    } else if score <= cfg.quente_max {
        motivos.push("Pontuação alta no questionário".to_string());
        (Tier::Quente, 4)
    } else {
        motivos.push("Pontuação muito alta no questionário".to_string());
        (Tier::MuitoQuente, 5)
    };

    let classificacao_final = if score <= cfg.grade_b_max {
        Grade::B
    } else if score <= cfg.grade_a_max {
        Grade::A
    } else if score <= cfg.grade_aa_max {
        Grade::Aa
    } else {
        Grade::Aaa
    };

    let tempo_medio = tempo_total_ms / answers.len() as u64;
    let mut engajamento = Engagement::Medio;

    if tempo_medio > cfg.high_deliberation_ms {
        motivos.push("Alto tempo de consideração nas respostas".to_string());
        engajamento = Engagement::Alto;
        prioridade = (prioridade + 1).min(5);
    } else if tempo_medio < cfg.low_deliberation_ms {
        motivos.push("Baixo tempo de consideração nas respostas".to_string());
        engajamento = Engagement::Baixo;
        prioridade = (prioridade - 1).max(1);
    }

    if voltas_perguntas > cfg.back_navigation_max {
        motivos.push("Revisitou perguntas múltiplas vezes".to_string());
        engajamento = Engagement::Alto;
        prioridade = (prioridade + 1).min(5);
    }

    let sintomas = cfg
        .symptom_flags
        .iter()
        .filter(|rule| {
            answers
                .get(&rule.question_id)
                .is_some_and(|a| a.pontos >= rule.min_points)
        })
        .map(|rule| SymptomFlag {
            nome: rule.label.clone(),
            urgencia: rule.urgency,
        })
        .collect();

    let idade = idade.unwrap_or(cfg.default_age);
    let urgencia = if (idade < cfg.urgency_young_age_max && score > cfg.urgency_alta_young_min_score)
        || score > cfg.urgency_alta_min_score
    {
        Urgency::Alta
    } else if score > cfg.urgency_media_min_score {
        Urgency::Media
    } else {
        Urgency::Baixa
    };

    Qualification {
        score,
        categoria,
        classificacao_final,
        prioridade,
        motivos,
        urgencia,
        sintomas,
        comportamento: Behavior {
            tempo_medio_resposta_ms: tempo_medio,
            tempo_total_ms,
            voltas_perguntas,
            engajamento,
        },
    }
}
