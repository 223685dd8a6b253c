//! Canonical submission schema and the adapters that fold every legacy
//! payload shape into it.
//!
//! The wire has accumulated alternate names for the same concepts
//! (`categoria` vs `categoria_sintomas`, `variante` vs
//! `versao_questionario`, camelCase vs snake_case timing fields). Each
//! adapter is total and pure: any JSON object maps to a canonical value,
//! missing fields fall back to documented defaults, nothing throws.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalContact {
    pub nome: String,
    pub email: String,
    pub telefone: String,
    pub idade: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalAnalysis {
    pub categoria: String,
    pub pontuacao_total: i64,
    pub urgencia: String,
    pub expectativa: String,
    pub sintomas: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalBehavior {
    pub tempo_medio_resposta: i64,
    pub tempo_total_questionario: i64,
    pub voltas_perguntas: i64,
    pub engajamento: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalQualification {
    pub score: i64,
    pub categoria: String,
    pub prioridade: i64,
    pub motivos: Vec<String>,
    pub comportamento: CanonicalBehavior,
}

/// One canonical shape for a quiz submission, whatever the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalSubmission {
    pub dados_contato: CanonicalContact,
    pub analise: CanonicalAnalysis,
    pub qualificacao_lead: CanonicalQualification,
    pub respostas: Value,
    pub variante: String,
    pub tempo_total: i64,
    pub timestamp: String,
    pub origem: String,
    pub dispositivo: String,
    pub navegador: String,
    pub sistema: String,
}

fn str_of(v: &Value, key: &str) -> Option<String> {
    v.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .filter(|s| !s.is_empty())
}

fn num_of(v: &Value, key: &str) -> Option<i64> {
    let field = v.get(key)?;
    field
        .as_i64()
        .or_else(|| field.as_f64().map(|f| f as i64))
        // Legacy rows sometimes carry numbers as strings.
        .or_else(|| field.as_str().and_then(|s| s.trim().parse().ok()))
}

fn first_str(v: &Value, keys: &[&str], default: &str) -> String {
    keys.iter()
        .find_map(|k| str_of(v, k))
        .unwrap_or_else(|| default.to_string())
}

fn first_num(v: &Value, keys: &[&str]) -> i64 {
    keys.iter().find_map(|k| num_of(v, k)).unwrap_or(0)
}

/// The variant grouping key, resolved in fixed priority order:
/// explicit variant field, questionnaire-version field, origin field,
/// then the literal `"default"`.
pub fn extract_variant(raw: &Value) -> String {
    let resolved = first_str(raw, &["variante", "versao_questionario", "origem"], "default");
    extract_variant_code(&resolved)
}

/// Pull a bare `testbxN` code out of a value that may embed it in a longer
/// string (e.g. an origin like "questionario-testbx7-v2").
pub fn extract_variant_code(value: &str) -> String {
    if let Some(pos) = value.find("testbx") {
        let rest = &value[pos + "testbx".len()..];
        let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        if !digits.is_empty() {
            return format!("testbx{digits}");
        }
    }
    value.to_string()
}

/// Fold a legacy flat row (the hosted-table shape, or any of its
/// ancestors) into the canonical submission.
pub fn legacy_to_canonical(raw: &Value) -> CanonicalSubmission {
    let motivos = raw
        .get("motivos_qualificacao")
        .map(|m| match m {
            // Stored rows hold motivos as a JSON-encoded string.
            Value::String(s) => serde_json::from_str::<Vec<String>>(s).unwrap_or_default(),
            Value::Array(items) => items
                .iter()
                .filter_map(|i| i.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        })
        .unwrap_or_default();

    CanonicalSubmission {
        dados_contato: CanonicalContact {
            nome: first_str(raw, &["nome"], "Desconhecido"),
            email: first_str(raw, &["email"], "no-email@example.com"),
            telefone: first_str(raw, &["telefone"], "00000000000"),
            idade: first_num(raw, &["idade"]),
        },
        analise: CanonicalAnalysis {
            categoria: first_str(raw, &["categoria_sintomas", "categoria"], ""),
            pontuacao_total: first_num(raw, &["pontuacao_total", "pontuacaoTotal", "pontuacao"]),
            urgencia: first_str(raw, &["urgencia"], ""),
            expectativa: first_str(raw, &["expectativa_melhora", "expectativa"], ""),
            sintomas: raw
                .get("sintomas_identificados")
                .or_else(|| raw.get("sintomas"))
                .cloned()
                .unwrap_or_else(|| Value::Object(Default::default())),
        },
        qualificacao_lead: CanonicalQualification {
            score: first_num(raw, &["score_qualificacao", "score"]),
            categoria: first_str(raw, &["categoria_lead"], ""),
            prioridade: first_num(raw, &["prioridade"]),
            motivos,
            comportamento: CanonicalBehavior {
                tempo_medio_resposta: first_num(raw, &["tempo_medio_resposta"]),
                tempo_total_questionario: first_num(
                    raw,
                    &["tempo_total_questionario", "tempoTotal", "tempo_total"],
                ),
                voltas_perguntas: first_num(raw, &["voltas_perguntas"]),
                engajamento: first_str(raw, &["engajamento"], "MEDIO"),
            },
        },
        respostas: raw
            .get("respostas_detalhadas")
            .or_else(|| raw.get("respostas"))
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default())),
        variante: first_str(raw, &["versao_questionario", "variante"], ""),
        tempo_total: first_num(raw, &["tempo_total_questionario", "tempoTotal", "tempo_total"]),
        timestamp: first_str(raw, &["timestamp", "criado_em"], ""),
        origem: first_str(raw, &["origem"], ""),
        dispositivo: first_str(raw, &["dispositivo"], ""),
        navegador: first_str(raw, &["navegador"], ""),
        sistema: first_str(raw, &["sistema_operacional", "sistema"], ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn variant_chain_prefers_explicit_field() {
        let raw = json!({
            "variante": "testbx5",
            "versao_questionario": "testbx8",
            "origem": "questionario-testbx9"
        });
        assert_eq!(extract_variant(&raw), "testbx5");
    }

    #[test]
    fn variant_falls_back_through_version_and_origin() {
        let raw = json!({ "versao_questionario": "testbx8" });
        assert_eq!(extract_variant(&raw), "testbx8");

        let raw = json!({ "origem": "campanha-testbx4-junho" });
        assert_eq!(extract_variant(&raw), "testbx4");

        assert_eq!(extract_variant(&json!({})), "default");
    }

    #[test]
    fn legacy_snake_and_camel_fields_land_in_the_same_place() {
        let snake = json!({
            "nome": "Maria",
            "email": "maria@exemplo.com",
            "categoria_sintomas": "Sintomas Intensos",
            "pontuacao_total": 55,
            "tempo_total_questionario": 120000
        });
        let camel = json!({
            "nome": "Maria",
            "email": "maria@exemplo.com",
            "categoria": "Sintomas Intensos",
            "pontuacaoTotal": 55,
            "tempoTotal": 120000
        });

        assert_eq!(legacy_to_canonical(&snake), legacy_to_canonical(&camel));
    }

    #[test]
    fn adapter_is_total_on_garbage() {
        let canonical = legacy_to_canonical(&json!({ "idade": "quarenta" }));
        assert_eq!(canonical.dados_contato.nome, "Desconhecido");
        assert_eq!(canonical.dados_contato.idade, 0);
        assert_eq!(canonical.qualificacao_lead.comportamento.engajamento, "MEDIO");
    }

    #[test]
    fn motivos_decode_from_stored_json_string() {
        let raw = json!({ "motivos_qualificacao": "[\"Pontuação alta no questionário\"]" });
        let canonical = legacy_to_canonical(&raw);
        assert_eq!(
            canonical.qualificacao_lead.motivos,
            vec!["Pontuação alta no questionário".to_string()]
        );
    }
}
