//! Funnel configuration — every threshold the scoring engine and the
//! aggregator apply lives here, never inline at the use site.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::scoring::Urgency;

/// Scoring thresholds for the canonical qualification scheme.
///
/// Tier boundaries are inclusive on the lower bound: a score equal to the
/// boundary belongs to the lower band.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// score <= frio_max  => FRIO
    pub frio_max: i64,
    /// score <= morno_max => MORNO
    pub morno_max: i64,
    /// score <= quente_max => QUENTE, above => MUITO_QUENTE
    pub quente_max: i64,

    /// score <= grade_b_max  => B
    pub grade_b_max: i64,
    /// score <= grade_a_max  => A
    pub grade_a_max: i64,
    /// score <= grade_aa_max => AA, above => AAA
    pub grade_aa_max: i64,

    /// Mean response time above this marks high deliberation (ms).
    pub high_deliberation_ms: u64,
    /// Mean response time below this marks low deliberation (ms).
    pub low_deliberation_ms: u64,
    /// More back-navigations than this raise engagement and priority.
    pub back_navigation_max: u32,

    /// Urgency rules for display purposes.
    pub urgency_media_min_score: i64,
    pub urgency_alta_min_score: i64,
    pub urgency_alta_young_min_score: i64,
    pub urgency_young_age_max: u32,
    /// Assumed when the contact's age is absent or unparsable.
    pub default_age: u32,

    /// Per-question point thresholds that flag individual symptoms,
    /// independent of the aggregate score.
    pub symptom_flags: Vec<SymptomRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymptomRule {
    pub question_id: String,
    pub min_points: i64,
    pub label: String,
    pub urgency: Urgency,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            frio_max: 40,
            morno_max: 60,
            quente_max: 80,

            grade_b_max: 25,
            grade_a_max: 45,
            grade_aa_max: 65,

            high_deliberation_ms: 15_000,
            low_deliberation_ms: 5_000,
            back_navigation_max: 2,

            urgency_media_min_score: 30,
            urgency_alta_min_score: 50,
            urgency_alta_young_min_score: 40,
            urgency_young_age_max: 45,
            default_age: 50,

            symptom_flags: vec![
                SymptomRule {
                    question_id: "ganho_peso".into(),
                    min_points: 8,
                    label: "Ganho de Peso Descontrolado".into(),
                    urgency: Urgency::Alta,
                },
                SymptomRule {
                    question_id: "compulsao_alimentar".into(),
                    min_points: 7,
                    label: "Compulsão por Doces".into(),
                    urgency: Urgency::Alta,
                },
                SymptomRule {
                    question_id: "energia_disposicao".into(),
                    min_points: 6,
                    label: "Baixa Energia e Disposição".into(),
                    urgency: Urgency::Media,
                },
                SymptomRule {
                    question_id: "frequencia_fogachos".into(),
                    min_points: 8,
                    label: "Calores e Suores Frequentes".into(),
                    urgency: Urgency::Alta,
                },
                SymptomRule {
                    question_id: "qualidade_sono".into(),
                    min_points: 7,
                    label: "Problemas para Dormir".into(),
                    urgency: Urgency::Alta,
                },
                SymptomRule {
                    question_id: "digestao".into(),
                    min_points: 6,
                    label: "Problemas Digestivos".into(),
                    urgency: Urgency::Media,
                },
            ],
        }
    }
}

/// Known variant codes and their dashboard display names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantCatalog {
    pub names: BTreeMap<String, String>,
}

impl Default for VariantCatalog {
    fn default() -> Self {
        let mut names = BTreeMap::new();
        names.insert("testbx4".to_string(), "Base Completa".to_string());
        names.insert("testbx5".to_string(), "Com Agendamento".to_string());
        names.insert("testbx6".to_string(), "Com Depoimentos".to_string());
        names.insert("testbx7".to_string(), "Texto Alterado".to_string());
        names.insert("testbx8".to_string(), "Botões Continuar".to_string());
        names.insert("testbx9".to_string(), "Efeitos Visuais".to_string());
        names.insert("default".to_string(), "Padrão".to_string());
        Self { names }
    }
}

impl VariantCatalog {
    /// Dashboard display name for a variant code. Unknown codes are shown
    /// as themselves.
    pub fn display_name(&self, code: &str) -> String {
        self.names
            .get(code)
            .cloned()
            .unwrap_or_else(|| code.to_string())
    }
}
