//! Lead submission webhook — validate, normalize, persist.
//!
//! Every response is structured JSON; no path lets an error escape to the
//! framework. Malformed JSON and missing contact fields answer 400 with
//! enumerated errors, a failed hosted-store insert answers 500, and the
//! unconfigured case degrades to the local lead list.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use funnel_core::lead::LeadRow;
use serde_json::{json, Value};
use std::time::Instant;

use crate::device;
use crate::state::AppState;
use crate::supabase::DASHBOARD_TABLE;

pub async fn receive(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    let started = Instant::now();

    let dados: Value = match serde_json::from_str(&body) {
        Ok(v) => v,
        Err(e) => {
            log::warn!("corpo inválido no webhook: {e}");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "success": false,
                    "message": "Dados JSON inválidos",
                    "error": "invalid_json",
                })),
            );
        }
    };

    let erros = validate_submission(&dados);
    if !erros.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "message": "Dados inválidos",
                "errors": erros,
            })),
        );
    }

    let processados = process_submission(&dados, &headers);

    if let Some(client) = state.sink.client() {
        // Duplicate emails are logged and accepted, not rejected.
        let email = processados["email"].as_str().unwrap_or_default().to_string();
        match client
            .select(
                DASHBOARD_TABLE,
                &[
                    ("select", "id,email,criado_em".to_string()),
                    ("email", format!("eq.{email}")),
                    ("order", "criado_em.desc".to_string()),
                    ("limit", "1".to_string()),
                ],
            )
            .await
        {
            Ok(existing) if !existing.is_empty() => {
                log::info!("lead já existe para {email}, registrando mesmo assim");
            }
            Ok(_) => {}
            Err(e) => log::warn!("verificação de duplicado falhou: {e}"),
        }

        match client.insert(DASHBOARD_TABLE, &processados).await {
            Ok(saved) => {
                let process_time = started.elapsed().as_millis();
                (
                    StatusCode::OK,
                    Json(json!({
                        "success": true,
                        "message": "Lead processado e salvo com sucesso",
                        "leadId": saved.get("id").cloned().unwrap_or(Value::Null),
                        "processTime": format!("{process_time}ms"),
                        "timestamp": Utc::now().to_rfc3339(),
                        "saved_data": {
                            "nome": processados["nome"],
                            "email": processados["email"],
                            "categoria_lead": processados["categoria_lead"],
                            "classificacao_final": processados["classificacao_final"],
                            "pontuacao_total": processados["pontuacao_total"],
                            "urgencia": processados["urgencia"],
                            "dispositivo": processados["dispositivo"],
                            "origem": processados["origem"],
                        },
                    })),
                )
            }
            Err(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "message": "Erro ao salvar no banco de dados",
                    "error": e.to_string(),
                    "processTime": format!("{}ms", started.elapsed().as_millis()),
                })),
            ),
        }
    } else {
        // Local mode: the lead lands in the local lists via the sink.
        let row = lead_row_from_processed(&processados);
        let outcome = state.sink.record_lead(&row).await;
        let process_time = started.elapsed().as_millis();
        (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": "Lead processado com sucesso (Supabase não configurado)",
                "leadId": row.lead_id,
                "backend": outcome.backend,
                "processTime": format!("{process_time}ms"),
                "timestamp": Utc::now().to_rfc3339(),
                "saved_data": {
                    "nome": processados["nome"],
                    "email": processados["email"],
                    "categoria_lead": processados["categoria_lead"],
                    "classificacao_final": processados["classificacao_final"],
                    "pontuacao_total": processados["pontuacao_total"],
                },
            })),
        )
    }
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "Webhook está funcionando",
        "timestamp": Utc::now().to_rfc3339(),
        "supabase_configured": state.config.supabase_configured(),
    }))
}

// ── Validation ───────────────────────────────────────────────────────────────

fn validate_submission(dados: &Value) -> Vec<String> {
    let mut erros = Vec::new();

    let Some(contato) = dados.get("dadosContato") else {
        erros.push("dadosContato é obrigatório".to_string());
        return erros;
    };

    let nome = contato.get("nome").and_then(Value::as_str).unwrap_or("");
    if nome.trim().is_empty() {
        erros.push("Nome é obrigatório".to_string());
    }

    let email = contato.get("email").and_then(Value::as_str).unwrap_or("");
    if email.trim().is_empty() {
        erros.push("Email é obrigatório".to_string());
    } else if !valid_email(email) {
        erros.push("Email inválido".to_string());
    }

    erros
}

/// local@domain.tld, no whitespace — the shape check the funnel has
/// always applied, nothing stricter.
pub fn valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

// ── Normalization ────────────────────────────────────────────────────────────

pub fn client_ip(headers: &HeaderMap) -> String {
    header_str(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next().map(|ip| ip.trim().to_string()))
        .filter(|ip| !ip.is_empty())
        .or_else(|| header_str(headers, "x-real-ip"))
        .or_else(|| header_str(headers, "cf-connecting-ip"))
        .unwrap_or_else(|| "unknown".to_string())
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .filter(|v| !v.is_empty())
}

fn num(value: &Value) -> i64 {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
        .unwrap_or(0)
}

/// Reshape a submission into the flat dashboard row, with safe fallbacks
/// for every optional field.
fn process_submission(dados: &Value, headers: &HeaderMap) -> Value {
    let user_agent = header_str(headers, "user-agent").unwrap_or_default();
    let info = device::detect(&user_agent);

    let contato = dados.get("dadosContato").cloned().unwrap_or_default();
    let analise = dados.get("analise").cloned().unwrap_or_default();
    let qualificacao = dados.get("qualificacaoLead").cloned().unwrap_or_default();
    let comportamento = qualificacao.get("comportamento").cloned().unwrap_or_default();

    // Age only survives as a plausible human age.
    let idade = contato
        .get("idade")
        .map(num)
        .filter(|i| (1..150).contains(i));

    let upper = |v: &Value, key: &str| {
        v.get(key)
            .and_then(Value::as_str)
            .map(|s| s.trim().to_uppercase())
    };

    json!({
        "nome": contato.get("nome").and_then(Value::as_str).unwrap_or("").trim(),
        "email": contato.get("email").and_then(Value::as_str).unwrap_or("").trim().to_lowercase(),
        "telefone": contato.get("telefone").and_then(Value::as_str).map(str::trim),
        "idade": idade,

        "categoria_sintomas": analise.get("categoria").and_then(Value::as_str).map(str::trim),
        "pontuacao_total": analise.get("pontuacaoTotal").map(num).unwrap_or(0),
        "urgencia": analise.get("urgencia").and_then(Value::as_str).map(str::to_lowercase),
        "expectativa_melhora": analise.get("expectativa").and_then(Value::as_str).map(str::trim),
        "sintomas_identificados": analise.get("sintomas"),

        "score_qualificacao": qualificacao.get("score").map(num).unwrap_or(0),
        "categoria_lead": upper(&qualificacao, "categoria"),
        "classificacao_final": upper(&qualificacao, "classificacaoFinal"),
        "prioridade": qualificacao.get("prioridade").map(num),
        "motivos_qualificacao": qualificacao.get("motivos").map(|m| m.to_string()),

        "respostas_detalhadas": dados.get("respostas"),

        "tempo_total_questionario": dados.get("tempoTotal").map(num),
        "tempo_medio_resposta": comportamento.get("tempoMedioResposta").map(num),
        "voltas_perguntas": comportamento.get("voltasPerguntas").map(num).unwrap_or(0),
        "engajamento": upper(&comportamento, "engajamento"),

        "timestamp": dados.get("timestamp").and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| Utc::now().to_rfc3339()),
        "user_agent": user_agent,
        "origem": dados.get("origem").and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("questionario-menopausa"),
        "versao_questionario": dados.get("variante").and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("default"),
        "acao": "lead_registrado",

        "dispositivo": info.dispositivo,
        "sistema_operacional": info.sistema_operacional,
        "navegador": info.navegador,
        "referrer": header_str(headers, "referer"),

        "utm_source": dados.get("utm_source"),
        "utm_medium": dados.get("utm_medium"),
        "utm_campaign": dados.get("utm_campaign"),

        "ip_address": client_ip(headers),
        "criado_em": Utc::now().to_rfc3339(),
    })
}

/// Flatten the processed row into the local lead shape for degraded mode.
fn lead_row_from_processed(processados: &Value) -> LeadRow {
    let s = |key: &str| {
        processados
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    LeadRow {
        lead_id: uuid(),
        nome: s("nome").unwrap_or_default(),
        email: s("email").unwrap_or_default(),
        telefone: s("telefone"),
        idade: processados.get("idade").and_then(Value::as_i64),
        categoria_lead: s("categoria_lead"),
        classificacao_final: s("classificacao_final"),
        pontuacao_total: processados.get("pontuacao_total").map(num).unwrap_or(0),
        score_qualificacao: processados.get("score_qualificacao").map(num).unwrap_or(0),
        prioridade: processados.get("prioridade").map(num).unwrap_or(1).max(1),
        urgencia: s("urgencia"),
        engajamento: s("engajamento"),
        motivos_qualificacao: s("motivos_qualificacao"),
        sintomas_identificados: processados
            .get("sintomas_identificados")
            .filter(|v| !v.is_null())
            .map(Value::to_string),
        tempo_total_questionario: processados
            .get("tempo_total_questionario")
            .and_then(Value::as_i64),
        tempo_medio_resposta: processados.get("tempo_medio_resposta").and_then(Value::as_i64),
        voltas_perguntas: processados.get("voltas_perguntas").map(num).unwrap_or(0),
        variante: s("versao_questionario"),
        versao_questionario: s("versao_questionario"),
        origem: s("origem"),
        respostas_detalhadas: processados
            .get("respostas_detalhadas")
            .filter(|v| !v.is_null())
            .map(Value::to_string),
        criado_em: s("criado_em").unwrap_or_else(|| Utc::now().to_rfc3339()),
    }
}

fn uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}
