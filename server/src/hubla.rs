//! Payment-provider webhook — correlates purchases back to quiz leads.
//!
//! Correlation tries email, then phone (digits only), then name. A
//! purchase with no matching lead is an accepted orphan: logged and
//! answered 200, never an error to the provider (it would retry).

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Instant;

use crate::state::AppState;
use crate::supabase::{SupabaseClient, CONVERSIONS_TABLE, DASHBOARD_TABLE};

#[derive(Debug, Clone, Deserialize)]
pub struct HublaWebhook {
    pub event: String,
    pub payment: Payment,
    pub customer: Customer,
    pub product: Product,
    #[serde(default)]
    pub metadata: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Payment {
    pub id: String,
    pub status: String,
    pub amount: f64,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub approved_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Customer {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub document: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Product {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: f64,
}

pub async fn receive(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    let started = Instant::now();

    if !authorized(&headers, state.config.hubla_webhook_secret.as_deref()) {
        log::warn!("token de autenticação inválido no webhook de pagamento");
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "message": "Token inválido" })),
        );
    }

    let dados: HublaWebhook = match serde_json::from_str(&body) {
        Ok(d) => d,
        Err(e) => {
            log::warn!("payload inválido no webhook de pagamento: {e}");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "success": false, "message": "JSON inválido" })),
            );
        }
    };

    log::debug!(
        "evento {} para pagamento {} ({})",
        dados.event,
        dados.payment.id,
        dados.customer.email
    );

    if dados.event != "payment.approved" {
        return (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": format!("Evento {} recebido", dados.event),
                "timestamp": Utc::now().to_rfc3339(),
            })),
        );
    }

    let lead = match state.sink.client() {
        Some(client) => correlate(client, &dados).await,
        None => None,
    };

    let process_time = format!("{}ms", started.elapsed().as_millis());

    match lead {
        Some(lead) => {
            let conversao = match state.sink.client() {
                Some(client) => register_conversion(client, &lead, &dados).await,
                None => None,
            };
            (
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "message": "Conversão registrada com sucesso",
                    "data": {
                        "leadId": lead.get("id").cloned().unwrap_or(Value::Null),
                        "conversaoId": conversao
                            .as_ref()
                            .and_then(|c| c.get("id").cloned())
                            .unwrap_or(Value::Null),
                        "variante": lead.get("versao_questionario").cloned().unwrap_or(Value::Null),
                        "valor": dados.payment.amount,
                        "processTime": process_time,
                    },
                    "timestamp": Utc::now().to_rfc3339(),
                })),
            )
        }
        None => {
            // Orphan purchase: accepted, recorded in the logs only.
            log::info!(
                "compra sem lead correspondente: {} / {}",
                dados.customer.email,
                dados.customer.name
            );
            (
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "message": "Pagamento processado - lead não encontrado",
                    "data": {
                        "paymentId": dados.payment.id,
                        "customerEmail": dados.customer.email,
                        "processTime": process_time,
                    },
                    "timestamp": Utc::now().to_rfc3339(),
                })),
            )
        }
    }
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "Webhook Hubla está funcionando",
        "timestamp": Utc::now().to_rfc3339(),
        "supabase_configured": state.config.supabase_configured(),
    }))
}

// ── Auth ─────────────────────────────────────────────────────────────────────

/// Bearer-token check. No configured secret means the check is skipped.
fn authorized(headers: &HeaderMap, secret: Option<&str>) -> bool {
    let Some(secret) = secret else {
        return true;
    };
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {secret}"))
}

// ── Correlation ──────────────────────────────────────────────────────────────

/// Find the lead a purchase belongs to: email first, phone digits next,
/// name last. Newest match wins at every step.
async fn correlate(client: &SupabaseClient, dados: &HublaWebhook) -> Option<Value> {
    let email = dados.customer.email.trim().to_lowercase();
    if let Some(lead) = newest(client, &[("email", format!("eq.{email}"))]).await {
        return Some(lead);
    }

    if let Some(phone) = &dados.customer.phone {
        let digits = phone_digits(phone);
        if !digits.is_empty() {
            if let Some(lead) = newest(client, &[("telefone", format!("ilike.*{digits}*"))]).await {
                return Some(lead);
            }
        }
    }

    let nome = dados.customer.name.trim().to_lowercase();
    if !nome.is_empty() {
        if let Some(lead) = newest(client, &[("nome", format!("ilike.*{nome}*"))]).await {
            return Some(lead);
        }
    }

    None
}

async fn newest(client: &SupabaseClient, filter: &[(&str, String)]) -> Option<Value> {
    let mut query: Vec<(&str, String)> = vec![("select", "*".to_string())];
    query.extend(filter.iter().map(|(k, v)| (*k, v.clone())));
    query.push(("order", "criado_em.desc".to_string()));
    query.push(("limit", "1".to_string()));

    match client.select(DASHBOARD_TABLE, &query).await {
        Ok(mut rows) if !rows.is_empty() => Some(rows.remove(0)),
        Ok(_) => None,
        Err(e) => {
            log::warn!("busca de lead falhou: {e}");
            None
        }
    }
}

pub fn phone_digits(phone: &str) -> String {
    phone.chars().filter(char::is_ascii_digit).collect()
}

/// Seconds between lead registration and the purchase, when both
/// timestamps parse.
pub fn conversion_delay_secs(payment_created: &str, lead_created: &str) -> Option<i64> {
    let payment = DateTime::parse_from_rfc3339(payment_created).ok()?;
    let lead = DateTime::parse_from_rfc3339(lead_created).ok()?;
    Some((payment - lead).num_seconds())
}

async fn register_conversion(
    client: &SupabaseClient,
    lead: &Value,
    dados: &HublaWebhook,
) -> Option<Value> {
    let delay = lead
        .get("criado_em")
        .and_then(Value::as_str)
        .and_then(|criado| conversion_delay_secs(&dados.payment.created_at, criado));

    let conversao = json!({
        "lead_id": lead.get("id"),
        "lead_email": lead.get("email"),
        "lead_nome": lead.get("nome"),
        "lead_variante": lead.get("versao_questionario"),
        "lead_categoria": lead.get("categoria_lead"),
        "lead_pontuacao": lead.get("pontuacao_total"),
        "lead_criado_em": lead.get("criado_em"),

        "payment_id": dados.payment.id,
        "payment_status": dados.payment.status,
        "payment_amount": dados.payment.amount,
        "payment_currency": dados.payment.currency,
        "payment_created_at": dados.payment.created_at,
        "payment_approved_at": dados.payment.approved_at,

        "customer_id": dados.customer.id,
        "customer_name": dados.customer.name,
        "customer_email": dados.customer.email,
        "customer_phone": dados.customer.phone,
        "customer_document": dados.customer.document,

        "product_id": dados.product.id,
        "product_name": dados.product.name,
        "product_price": dados.product.price,

        "tempo_para_conversao": delay,
        "evento_hubla": dados.event,
        "metadata": dados.metadata,
        "criado_em": Utc::now().to_rfc3339(),
    });

    let saved = match client.insert(CONVERSIONS_TABLE, &conversao).await {
        Ok(row) => Some(row),
        Err(e) => {
            log::warn!("registro de conversão falhou: {e}");
            None
        }
    };

    // Mark the lead itself as converted. Best-effort: the conversion row
    // is the source of truth.
    if let Some(id) = lead.get("id") {
        let id = id.as_str().map(str::to_string).unwrap_or_else(|| id.to_string());
        let update = json!({
            "converteu": true,
            "payment_id": dados.payment.id,
            "valor_conversao": dados.payment.amount,
            "data_conversao": dados.payment.approved_at.clone()
                .unwrap_or_else(|| dados.payment.created_at.clone()),
            "tempo_para_conversao": delay,
        });
        if let Err(e) = client
            .update(DASHBOARD_TABLE, ("id", format!("eq.{id}")), &update)
            .await
        {
            log::warn!("atualização do lead convertido falhou: {e}");
        }
    }

    saved
}
