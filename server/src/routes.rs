//! Router assembly and the smaller endpoints: sales, payload reshaping,
//! view registration and the dashboard metrics read.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;
use funnel_core::canonical::{extract_variant, legacy_to_canonical};
use serde_json::{json, Map, Value};
use std::time::Instant;
use tower_http::cors::CorsLayer;

use crate::state::AppState;
use crate::webhook::client_ip;
use crate::{device, hubla, webhook};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/webhook", post(webhook::receive).get(webhook::health))
        .route("/api/webhook-hubla", post(hubla::receive).get(hubla::health))
        .route("/api/vendas", post(record_sale).put(detect_sale))
        .route("/api/format-data", post(format_data).get(format_data_health))
        .route(
            "/api/register-view",
            post(register_view).get(register_view_health),
        )
        .route("/api/metrics", get(metrics))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── /api/vendas ──────────────────────────────────────────────────────────────

async fn record_sale(body: String) -> impl IntoResponse {
    let dados: Value = match serde_json::from_str(&body) {
        Ok(v) => v,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "message": "Erro ao processar venda",
                    "error": e.to_string(),
                })),
            )
        }
    };

    let text = |key: &str| {
        dados
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };

    // A sale must be attributable to someone.
    if text("nome").is_none() && text("email").is_none() && text("telefone").is_none() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "message": "Dados insuficientes - é necessário pelo menos nome, email ou telefone",
                "error": "missing_identification_data",
            })),
        );
    }

    let valor = dados
        .get("valor")
        .and_then(|v| v.as_f64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
        .unwrap_or(0.0);

    let venda = json!({
        "nome": text("nome").unwrap_or("Não informado"),
        "email": text("email").unwrap_or("Não informado"),
        "telefone": text("telefone").unwrap_or("Não informado"),
        "valor": valor,
        "produto": text("produto").unwrap_or("Consulta Nutricional"),
        "variante": text("variante").unwrap_or("desconhecida"),
        "timestamp": text("timestamp").map(str::to_string)
            .unwrap_or_else(|| Utc::now().to_rfc3339()),
        "origem": "webhook-vendas",
    });

    log::info!("venda registrada: {}", venda["email"]);

    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "message": "Venda registrada com sucesso",
            "vendaId": format!("venda_{}", Utc::now().timestamp_millis()),
            "timestamp": Utc::now().to_rfc3339(),
            "dadosProcessados": venda,
        })),
    )
}

/// Auto-detection variant: same identity key, defaulted product and price.
async fn detect_sale(body: String) -> impl IntoResponse {
    let dados: Value = match serde_json::from_str(&body) {
        Ok(v) => v,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "message": "Erro na detecção de venda",
                    "error": e.to_string(),
                })),
            )
        }
    };

    let venda = json!({
        "nome": dados.get("nome").cloned().unwrap_or(Value::Null),
        "email": dados.get("email").cloned().unwrap_or(Value::Null),
        "telefone": dados.get("telefone").cloned().unwrap_or(Value::Null),
        "valor": dados.get("valor").and_then(Value::as_f64).unwrap_or(197.0),
        "produto": dados.get("produto").and_then(Value::as_str).unwrap_or("Consulta Nutricional"),
        "variante": dados.get("variante").cloned().unwrap_or(Value::Null),
        "timestamp": Utc::now().to_rfc3339(),
        "origem": "deteccao-automatica",
        "status": "detectada",
    });

    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "message": "Venda detectada e registrada",
            "venda": venda,
        })),
    )
}

// ── /api/format-data ─────────────────────────────────────────────────────────

async fn format_data(body: String) -> impl IntoResponse {
    match serde_json::from_str::<Value>(&body) {
        Ok(raw) => {
            let canonical = legacy_to_canonical(&raw);
            log::debug!(
                "payload formatado: {} <{}>",
                canonical.dados_contato.nome,
                canonical.dados_contato.email
            );
            (StatusCode::OK, Json(serde_json::to_value(canonical).unwrap_or(Value::Null)))
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": "Erro ao processar os dados",
                "message": e.to_string(),
            })),
        ),
    }
}

async fn format_data_health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "API de formatação de dados está funcionando",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

// ── /api/register-view ───────────────────────────────────────────────────────

async fn register_view(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    let started = Instant::now();

    let dados: Value = match serde_json::from_str(&body) {
        Ok(v) => v,
        Err(e) => {
            log::warn!("corpo inválido no registro de view: {e}");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "success": false,
                    "message": "Dados JSON inválidos para view",
                    "error": "invalid_json",
                })),
            );
        }
    };

    let user_agent = headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let info = device::detect(&user_agent);

    let mut enriched: Map<String, Value> = dados.as_object().cloned().unwrap_or_default();
    enriched.insert("user_agent".into(), json!(user_agent));
    enriched.insert("dispositivo".into(), json!(info.dispositivo));
    enriched.insert("sistema_operacional".into(), json!(info.sistema_operacional));
    enriched.insert("navegador".into(), json!(info.navegador));
    enriched.insert("ip_address".into(), json!(client_ip(&headers)));
    enriched.insert(
        "referrer".into(),
        headers
            .get("referer")
            .and_then(|v| v.to_str().ok())
            .map(|r| json!(r))
            .unwrap_or(Value::Null),
    );
    if !enriched.contains_key("timestamp") {
        enriched.insert("timestamp".into(), json!(Utc::now().to_rfc3339()));
    }
    let processados = Value::Object(enriched);

    // The view always goes through the sink, whatever the relay does.
    let variante = extract_variant(&processados);
    let url = processados
        .get("url")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let outcome = state.sink.record_view(&variante, &user_agent, &url).await;
    log::debug!("view registrada via {:?}", outcome.backend);

    let Some(make_url) = &state.config.make_view_webhook_url else {
        return (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": "Dados de view processados (MAKE_VIEW_WEBHOOK_URL não configurado)",
                "processTime": format!("{}ms", started.elapsed().as_millis()),
                "processed_data": processados,
                "timestamp": Utc::now().to_rfc3339(),
            })),
        );
    };

    // Fire-and-forget relay: one attempt, no retry, failure reported in
    // the response body rather than swallowed.
    match state.http.post(make_url).json(&processados).send().await {
        Ok(response) if response.status().is_success() => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": "View processada e encaminhada com sucesso para Make.com",
                "processTime": format!("{}ms", started.elapsed().as_millis()),
                "timestamp": Utc::now().to_rfc3339(),
                "forwarded_data": processados,
            })),
        ),
        Ok(response) => {
            let detail = response.text().await.unwrap_or_default();
            log::warn!("relay de view rejeitado: {detail}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "message": "Erro ao encaminhar view para Make.com",
                    "make_error": detail,
                })),
            )
        }
        Err(e) => {
            log::warn!("relay de view falhou: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "message": "Erro ao chamar Make.com para view",
                    "error": e.to_string(),
                })),
            )
        }
    }
}

async fn register_view_health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "Webhook de View está funcionando",
        "timestamp": Utc::now().to_rfc3339(),
        "make_view_webhook_configured": state.config.make_view_webhook_url.is_some(),
    }))
}

// ── /api/metrics ─────────────────────────────────────────────────────────────

/// Dashboard read: hosted rows when reachable, reconciled local data
/// otherwise.
async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let remote = state.sink.fetch_remote_rows().await;

    let computed = {
        let aggregator = match state.aggregator.lock() {
            Ok(a) => a,
            Err(_) => {
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "success": false, "error": "estado interno indisponível" })),
                )
            }
        };
        aggregator.compute_metrics(remote.as_ref())
    };

    match computed {
        Ok(metrics) => (
            StatusCode::OK,
            Json(serde_json::to_value(metrics).unwrap_or(Value::Null)),
        ),
        Err(e) => {
            log::error!("cálculo de métricas falhou: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": e.to_string() })),
            )
        }
    }
}
