//! Hosted-store adapter (Supabase PostgREST) and the best-effort sink.
//!
//! RULE: the sink never fails the funnel. Missing credentials or a failed
//! remote call degrade to the local store and the outcome says which
//! backend took the write. Remote calls are fire-and-forget — no retry,
//! no backoff, client-default timeouts.

use anyhow::{anyhow, Result};
use funnel_core::aggregator::RemoteRows;
use funnel_core::lead::{LeadRow, ViewRow};
use funnel_core::store::LocalStore;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

pub const LEADS_TABLE: &str = "leads";
pub const SESSIONS_TABLE: &str = "sessions";
pub const DASHBOARD_TABLE: &str = "QUIZ_DASHBOARD";
pub const CONVERSIONS_TABLE: &str = "conversoes";

// ── REST client ──────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct SupabaseClient {
    base_url: String,
    anon_key: String,
    http: reqwest::Client,
}

impl SupabaseClient {
    pub fn new(base_url: &str, anon_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// Insert one row; returns the representation the store echoes back.
    pub async fn insert(&self, table: &str, body: &Value) -> Result<Value> {
        let response = self
            .http
            .post(self.endpoint(table))
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(anyhow!("insert into {table} failed: {status} {detail}"));
        }

        let rows: Value = response.json().await?;
        Ok(rows.get(0).cloned().unwrap_or(rows))
    }

    /// Select rows with PostgREST query parameters (eq./ilike./order/limit).
    pub async fn select(&self, table: &str, query: &[(&str, String)]) -> Result<Vec<Value>> {
        let response = self
            .http
            .get(self.endpoint(table))
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("select from {table} failed: {status}"));
        }

        Ok(response.json().await?)
    }

    /// Patch rows matching an `eq.` filter.
    pub async fn update(&self, table: &str, filter: (&str, String), body: &Value) -> Result<()> {
        let response = self
            .http
            .patch(self.endpoint(table))
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .query(&[filter])
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("update on {table} failed: {status}"));
        }
        Ok(())
    }
}

// ── Sink ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkBackend {
    Remote,
    Local,
}

/// Explicit delivery outcome — callers and tests can assert on it instead
/// of guessing from swallowed exceptions.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SinkOutcome {
    pub ok: bool,
    pub backend: SinkBackend,
}

#[derive(Clone)]
pub struct RemoteSink {
    client: Option<SupabaseClient>,
    store: Arc<Mutex<LocalStore>>,
}

impl RemoteSink {
    pub fn new(client: Option<SupabaseClient>, store: Arc<Mutex<LocalStore>>) -> Self {
        Self { client, store }
    }

    pub fn remote_configured(&self) -> bool {
        self.client.is_some()
    }

    pub fn client(&self) -> Option<&SupabaseClient> {
        self.client.as_ref()
    }

    /// Record a page view. Remote when possible, local otherwise.
    pub async fn record_view(&self, variante: &str, user_agent: &str, url: &str) -> SinkOutcome {
        if let Some(client) = &self.client {
            let body = json!({
                "variante": variante,
                "user_agent": user_agent,
                "url": url,
            });
            match client.insert(SESSIONS_TABLE, &body).await {
                Ok(_) => {
                    return SinkOutcome {
                        ok: true,
                        backend: SinkBackend::Remote,
                    }
                }
                Err(e) => log::warn!("view remoto falhou, usando armazenamento local: {e}"),
            }
        }

        let view = ViewRow {
            variante: variante.to_string(),
            user_agent: Some(user_agent.to_string()),
            url: Some(url.to_string()),
            recorded_at: chrono::Utc::now().to_rfc3339(),
        };
        let ok = match self.store.lock() {
            Ok(store) => store.insert_view(&view).map_err(|e| log::warn!("view local falhou: {e}")).is_ok(),
            Err(_) => false,
        };
        SinkOutcome {
            ok,
            backend: SinkBackend::Local,
        }
    }

    /// Record a lead. A successful remote write also mirrors a loosened
    /// row into the dashboard table for cross-system correlation; that
    /// secondary write is best-effort and never rolls back the primary.
    pub async fn record_lead(&self, row: &LeadRow) -> SinkOutcome {
        if let Some(client) = &self.client {
            let body = serde_json::to_value(row).unwrap_or(Value::Null);
            match client.insert(LEADS_TABLE, &body).await {
                Ok(_) => {
                    if let Err(e) = client.insert(DASHBOARD_TABLE, &dashboard_row(row)).await {
                        log::warn!("espelho no {DASHBOARD_TABLE} falhou: {e}");
                    }
                    return SinkOutcome {
                        ok: true,
                        backend: SinkBackend::Remote,
                    };
                }
                Err(e) => log::warn!("lead remoto falhou, usando armazenamento local: {e}"),
            }
        }

        let ok = match self.store.lock() {
            Ok(store) => {
                let primary = store.insert_lead(row);
                let backup = store.insert_backup_lead(row);
                if let Err(e) = &primary {
                    log::warn!("lead local falhou: {e}");
                }
                if let Err(e) = &backup {
                    log::warn!("backup local falhou: {e}");
                }
                primary.is_ok()
            }
            Err(_) => false,
        };
        SinkOutcome {
            ok,
            backend: SinkBackend::Local,
        }
    }

    /// Pull the dashboard rows from the hosted store. `None` means not
    /// configured or unreachable — the caller falls back to local data.
    pub async fn fetch_remote_rows(&self) -> Option<RemoteRows> {
        let client = self.client.as_ref()?;

        let leads_raw = match client
            .select(DASHBOARD_TABLE, &[("select", "*".to_string())])
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                log::warn!("leitura remota de leads falhou: {e}");
                return None;
            }
        };
        let sessions_raw = match client
            .select(SESSIONS_TABLE, &[("select", "variante".to_string())])
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                log::warn!("leitura remota de sessões falhou: {e}");
                return None;
            }
        };

        // Rows that fail to decode are skipped, not fatal.
        let leads = leads_raw
            .into_iter()
            .filter_map(|v| serde_json::from_value::<LeadRow>(v).ok())
            .collect();
        let views = sessions_raw
            .into_iter()
            .map(|v| ViewRow {
                variante: v
                    .get("variante")
                    .and_then(Value::as_str)
                    .unwrap_or("default")
                    .to_string(),
                user_agent: None,
                url: None,
                recorded_at: String::new(),
            })
            .collect();

        Some(RemoteRows { leads, views })
    }
}

/// The loosened dashboard row mirrored next to a remote lead write.
fn dashboard_row(row: &LeadRow) -> Value {
    json!({
        "nome": row.nome,
        "email": row.email,
        "telefone": row.telefone,
        "idade": row.idade,
        "categoria_lead": row.categoria_lead,
        "classificacao_final": row.classificacao_final,
        "pontuacao_total": row.pontuacao_total,
        "score_qualificacao": row.score_qualificacao,
        "prioridade": row.prioridade,
        "urgencia": row.urgencia,
        "engajamento": row.engajamento,
        "motivos_qualificacao": row.motivos_qualificacao,
        "sintomas_identificados": row.sintomas_identificados,
        "tempo_total_questionario": row.tempo_total_questionario,
        "tempo_medio_resposta": row.tempo_medio_resposta,
        "voltas_perguntas": row.voltas_perguntas,
        "variante": row.variante,
        "versao_questionario": row.versao_questionario,
        "respostas_detalhadas": row.respostas_detalhadas,
        "origem": "questionario_direto",
        "acao": "lead_registrado",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Arc<Mutex<LocalStore>> {
        let store = LocalStore::in_memory().unwrap();
        store.migrate().unwrap();
        Arc::new(Mutex::new(store))
    }

    fn sample_lead() -> LeadRow {
        LeadRow {
            lead_id: "l-degrade".into(),
            nome: "Maria Teste".into(),
            email: "maria@exemplo.com".into(),
            telefone: Some("11999999999".into()),
            idade: Some(45),
            categoria_lead: Some("QUENTE".into()),
            classificacao_final: Some("AA".into()),
            pontuacao_total: 70,
            score_qualificacao: 70,
            prioridade: 4,
            urgencia: Some("alta".into()),
            engajamento: Some("ALTO".into()),
            motivos_qualificacao: None,
            sintomas_identificados: None,
            tempo_total_questionario: Some(120_000),
            tempo_medio_resposta: Some(24_000),
            voltas_perguntas: 1,
            variante: Some("testbx9".into()),
            versao_questionario: Some("testbx9".into()),
            origem: None,
            respostas_detalhadas: None,
            criado_em: "2025-06-01T12:00:00Z".into(),
        }
    }

    /// Remote configured but unreachable: the lead lands locally and the
    /// outcome says so. Nothing is lost.
    #[tokio::test]
    async fn record_lead_degrades_to_local_on_remote_error() {
        let store = store();
        // Nothing listens on port 9; the insert fails immediately.
        let client = SupabaseClient::new("http://127.0.0.1:9", "anon-key");
        let sink = RemoteSink::new(Some(client), store.clone());

        let outcome = sink.record_lead(&sample_lead()).await;

        assert!(outcome.ok);
        assert_eq!(outcome.backend, SinkBackend::Local);
        let guard = store.lock().unwrap();
        assert_eq!(guard.lead_count().unwrap(), 1);
        assert_eq!(guard.backup_lead_count().unwrap(), 1);
    }

    /// No credentials at all: local mode from the start.
    #[tokio::test]
    async fn record_view_without_credentials_is_local() {
        let store = store();
        let sink = RemoteSink::new(None, store.clone());

        let outcome = sink.record_view("testbx4", "test-agent", "https://quiz.local/").await;

        assert!(outcome.ok);
        assert_eq!(outcome.backend, SinkBackend::Local);
        assert_eq!(store.lock().unwrap().view_count().unwrap(), 1);
    }
}
