//! Scoring engine tests: exact sums, monotone tiers, behavioral
//! adjustments and the documented qualification scenarios.

use funnel_core::config::ScoringConfig;
use funnel_core::scoring::{qualify, Answer, Engagement, Grade, Tier, Urgency};
use std::collections::BTreeMap;

// ── Helpers ──────────────────────────────────────────────────────────────────

fn answers_from(points: &[(&str, i64)]) -> BTreeMap<String, Answer> {
    points
        .iter()
        .map(|(id, pts)| {
            (
                id.to_string(),
                Answer {
                    pergunta: id.to_string(),
                    resposta: format!("resposta {id}"),
                    pontos: *pts,
                    tempo_ms: 8_000,
                    variante: "testbx9".into(),
                },
            )
        })
        .collect()
}

fn cfg() -> ScoringConfig {
    ScoringConfig::default()
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// The score is exactly the sum of the recorded answer points.
#[test]
fn score_is_exact_sum_of_points() {
    let answers = answers_from(&[("idade", 10), ("sintomas", 15), ("duracao", 20)]);
    let q = qualify(&answers, 30_000, 0, Some(50), &cfg());
    assert_eq!(q.score, 45);
}

/// Negative or missing point values count as 0, never below.
#[test]
fn negative_points_are_clamped_to_zero() {
    let answers = answers_from(&[("idade", -10), ("sintomas", 15)]);
    let q = qualify(&answers, 30_000, 0, Some(50), &cfg());
    assert_eq!(q.score, 15);
    assert!(q.score >= 0);
}

/// Tier and final classification never decrease as the score rises.
#[test]
fn tier_and_grade_are_monotone_in_score() {
    let mut previous_tier = Tier::Frio;
    let mut previous_grade = Grade::B;

    for score in 0..=110 {
        let answers = answers_from(&[("unica", score)]);
        let q = qualify(&answers, 30_000, 0, Some(50), &cfg());
        assert!(
            q.categoria >= previous_tier,
            "tier regressed at score {score}"
        );
        assert!(
            q.classificacao_final >= previous_grade,
            "grade regressed at score {score}"
        );
        previous_tier = q.categoria;
        previous_grade = q.classificacao_final;
    }
}

/// Band boundaries are inclusive on the lower bound: a score equal to the
/// boundary stays in the lower band.
#[test]
fn tier_boundaries_are_inclusive_below() {
    let at_boundary = qualify(&answers_from(&[("q", 40)]), 30_000, 0, Some(50), &cfg());
    assert_eq!(at_boundary.categoria, Tier::Frio);

    let above = qualify(&answers_from(&[("q", 41)]), 30_000, 0, Some(50), &cfg());
    assert_eq!(above.categoria, Tier::Morno);
}

/// The documented hot-lead scenario: 85 points over 5 questions, mean
/// response time of 40s and 3 back-navigations.
#[test]
fn hot_lead_scenario() {
    let answers = answers_from(&[
        ("idade", 10),
        ("sintomas", 15),
        ("duracao", 20),
        ("tratamento", 15),
        ("impacto", 25),
    ]);
    let q = qualify(&answers, 200_000, 3, Some(50), &cfg());

    assert_eq!(q.score, 85);
    assert_eq!(q.categoria, Tier::MuitoQuente);
    assert_eq!(q.prioridade, 5, "priority must cap at 5");
    assert_eq!(q.comportamento.tempo_medio_resposta_ms, 40_000);
    assert_eq!(q.comportamento.engajamento, Engagement::Alto);
    assert!(q
        .motivos
        .iter()
        .any(|m| m.contains("Alto tempo de consideração")));
    assert!(q
        .motivos
        .iter()
        .any(|m| m.contains("Revisitou perguntas múltiplas vezes")));
}

/// The empty quiz: nothing answered, nothing flagged, nothing urgent.
#[test]
fn empty_quiz_scenario() {
    let q = qualify(&BTreeMap::new(), 0, 0, None, &cfg());

    assert_eq!(q.score, 0);
    assert_eq!(q.categoria, Tier::Frio);
    assert_eq!(q.classificacao_final, Grade::B);
    assert_eq!(q.prioridade, 1);
    assert!(q.motivos.is_empty());
    assert!(q.sintomas.is_empty());
    assert_eq!(q.urgencia, Urgency::Baixa);
}

/// Rushing through the quiz lowers priority and marks low engagement.
#[test]
fn low_deliberation_lowers_priority() {
    // 70 points => QUENTE, base priority 4; 2s mean response drops it to 3.
    let answers = answers_from(&[("a", 35), ("b", 35)]);
    let q = qualify(&answers, 4_000, 0, Some(50), &cfg());

    assert_eq!(q.categoria, Tier::Quente);
    assert_eq!(q.prioridade, 3);
    assert_eq!(q.comportamento.engajamento, Engagement::Baixo);
    assert!(q
        .motivos
        .iter()
        .any(|m| m.contains("Baixo tempo de consideração")));
}

/// Symptom flags fire per question threshold, independent of the total.
#[test]
fn symptom_flags_follow_per_question_thresholds() {
    let answers = answers_from(&[
        ("ganho_peso", 10),
        ("qualidade_sono", 7),
        ("digestao", 3), // below its threshold of 6
    ]);
    let q = qualify(&answers, 30_000, 0, Some(50), &cfg());

    let nomes: Vec<&str> = q.sintomas.iter().map(|s| s.nome.as_str()).collect();
    assert!(nomes.contains(&"Ganho de Peso Descontrolado"));
    assert!(nomes.contains(&"Problemas para Dormir"));
    assert!(!nomes.contains(&"Problemas Digestivos"));

    let peso = q
        .sintomas
        .iter()
        .find(|s| s.nome == "Ganho de Peso Descontrolado")
        .unwrap();
    assert_eq!(peso.urgencia, Urgency::Alta);
}

/// Display urgency: young contacts cross into "alta" at a lower score.
#[test]
fn urgency_depends_on_age_and_score() {
    let answers = answers_from(&[("q", 45)]);

    let young = qualify(&answers, 30_000, 0, Some(42), &cfg());
    assert_eq!(young.urgencia, Urgency::Alta);

    let older = qualify(&answers, 30_000, 0, Some(52), &cfg());
    assert_eq!(older.urgencia, Urgency::Media);

    let high_score = qualify(&answers_from(&[("q", 55)]), 30_000, 0, Some(52), &cfg());
    assert_eq!(high_score.urgencia, Urgency::Alta);
}
