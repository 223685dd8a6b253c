//! SQLite persistence layer — the browser-storage analogue.
//!
//! RULE: only store.rs talks to the database. The tracker, the aggregator
//! and the sinks call store methods; they never execute SQL directly.

use crate::error::FunnelResult;
use crate::event::EventRecord;
use crate::lead::{LeadRow, ViewRow};
use rusqlite::{params, Connection};

pub struct LocalStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file/URI
}

impl LocalStore {
    pub fn open(path: &str) -> FunnelResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL only applies to real files; shared-memory URIs ignore it.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> FunnelResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, path: None })
    }

    /// Reopen a new connection to the same database.
    /// For in-memory databases this returns a fresh, isolated database.
    pub fn reopen(&self) -> FunnelResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> FunnelResult<()> {
        self.conn
            .execute_batch(include_str!("../migrations/001_foundation.sql"))?;
        Ok(())
    }

    // ── Event log ──────────────────────────────────────────────

    /// Append one event. The write is synchronous: once this returns the
    /// event is visible to any subsequent reader.
    pub fn append_event(&self, entry: &EventRecord) -> FunnelResult<i64> {
        self.conn.execute(
            "INSERT INTO event_log (event_id, session_id, variante, event_type, payload, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry.event_id,
                entry.session_id,
                entry.variante,
                entry.event_type,
                entry.payload,
                entry.recorded_at,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Full log in insertion order.
    pub fn all_events(&self) -> FunnelResult<Vec<EventRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, event_id, session_id, variante, event_type, payload, recorded_at
             FROM event_log ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map([], |row| {
                Ok(EventRecord {
                    id: Some(row.get(0)?),
                    event_id: row.get(1)?,
                    session_id: row.get(2)?,
                    variante: row.get(3)?,
                    event_type: row.get(4)?,
                    payload: row.get(5)?,
                    recorded_at: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn count_events_of_type(&self, event_type: &str) -> FunnelResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM event_log WHERE event_type = ?1",
            params![event_type],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Whether a session already produced an event of the given type.
    /// Backs the completion idempotency guard.
    pub fn session_has_event(&self, session_id: &str, event_type: &str) -> FunnelResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM event_log WHERE session_id = ?1 AND event_type = ?2",
            params![session_id, event_type],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Drop the whole log. Single-statement, so a concurrent reader sees
    /// the full log or the empty log, never a partial truncation.
    pub fn clear_events(&self) -> FunnelResult<()> {
        self.conn.execute("DELETE FROM event_log", [])?;
        Ok(())
    }

    // ── Leads (primary + redundant copy) ───────────────────────

    pub fn insert_lead(&self, row: &LeadRow) -> FunnelResult<()> {
        self.insert_lead_into("leads", row)
    }

    pub fn insert_backup_lead(&self, row: &LeadRow) -> FunnelResult<()> {
        self.insert_lead_into("backup_leads", row)
    }

    fn insert_lead_into(&self, table: &str, row: &LeadRow) -> FunnelResult<()> {
        // OR IGNORE on lead_id keeps repair passes idempotent.
        let sql = format!(
            "INSERT OR IGNORE INTO {table} (
                lead_id, nome, email, telefone, idade, categoria_lead,
                classificacao_final, pontuacao_total, score_qualificacao,
                prioridade, urgencia, engajamento, motivos_qualificacao,
                sintomas_identificados, tempo_total_questionario,
                tempo_medio_resposta, voltas_perguntas, variante,
                versao_questionario, origem, respostas_detalhadas, criado_em
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                      ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22)"
        );
        self.conn.execute(
            &sql,
            params![
                row.lead_id,
                row.nome,
                row.email,
                row.telefone,
                row.idade,
                row.categoria_lead,
                row.classificacao_final,
                row.pontuacao_total,
                row.score_qualificacao,
                row.prioridade,
                row.urgencia,
                row.engajamento,
                row.motivos_qualificacao,
                row.sintomas_identificados,
                row.tempo_total_questionario,
                row.tempo_medio_resposta,
                row.voltas_perguntas,
                row.variante,
                row.versao_questionario,
                row.origem,
                row.respostas_detalhadas,
                row.criado_em,
            ],
        )?;
        Ok(())
    }

    pub fn all_leads(&self) -> FunnelResult<Vec<LeadRow>> {
        self.leads_from("leads")
    }

    pub fn all_backup_leads(&self) -> FunnelResult<Vec<LeadRow>> {
        self.leads_from("backup_leads")
    }

    fn leads_from(&self, table: &str) -> FunnelResult<Vec<LeadRow>> {
        let sql = format!(
            "SELECT lead_id, nome, email, telefone, idade, categoria_lead,
                    classificacao_final, pontuacao_total, score_qualificacao,
                    prioridade, urgencia, engajamento, motivos_qualificacao,
                    sintomas_identificados, tempo_total_questionario,
                    tempo_medio_resposta, voltas_perguntas, variante,
                    versao_questionario, origem, respostas_detalhadas, criado_em
             FROM {table} ORDER BY id ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(LeadRow {
                    lead_id: row.get(0)?,
                    nome: row.get(1)?,
                    email: row.get(2)?,
                    telefone: row.get(3)?,
                    idade: row.get(4)?,
                    categoria_lead: row.get(5)?,
                    classificacao_final: row.get(6)?,
                    pontuacao_total: row.get(7)?,
                    score_qualificacao: row.get(8)?,
                    prioridade: row.get(9)?,
                    urgencia: row.get(10)?,
                    engajamento: row.get(11)?,
                    motivos_qualificacao: row.get(12)?,
                    sintomas_identificados: row.get(13)?,
                    tempo_total_questionario: row.get(14)?,
                    tempo_medio_resposta: row.get(15)?,
                    voltas_perguntas: row.get(16)?,
                    variante: row.get(17)?,
                    versao_questionario: row.get(18)?,
                    origem: row.get(19)?,
                    respostas_detalhadas: row.get(20)?,
                    criado_em: row.get(21)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn lead_count(&self) -> FunnelResult<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM leads", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn backup_lead_count(&self) -> FunnelResult<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM backup_leads", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Overwrite a lead table with the winning row set (self-healing
    /// copy-back). Replacing a table with its own contents is a no-op in
    /// effect, which keeps the repair idempotent.
    pub fn replace_leads(&self, rows: &[LeadRow]) -> FunnelResult<()> {
        self.replace_lead_table("leads", rows)
    }

    pub fn replace_backup_leads(&self, rows: &[LeadRow]) -> FunnelResult<()> {
        self.replace_lead_table("backup_leads", rows)
    }

    fn replace_lead_table(&self, table: &str, rows: &[LeadRow]) -> FunnelResult<()> {
        self.conn.execute(&format!("DELETE FROM {table}"), [])?;
        for row in rows {
            self.insert_lead_into(table, row)?;
        }
        Ok(())
    }

    // ── Views ──────────────────────────────────────────────────

    pub fn insert_view(&self, view: &ViewRow) -> FunnelResult<()> {
        self.conn.execute(
            "INSERT INTO views (variante, user_agent, url, recorded_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![view.variante, view.user_agent, view.url, view.recorded_at],
        )?;
        Ok(())
    }

    pub fn all_views(&self) -> FunnelResult<Vec<ViewRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT variante, user_agent, url, recorded_at FROM views ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(ViewRow {
                    variante: row.get(0)?,
                    user_agent: row.get(1)?,
                    url: row.get(2)?,
                    recorded_at: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn view_count(&self) -> FunnelResult<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM views", [], |row| row.get(0))?;
        Ok(count)
    }

    // ── Wipe ───────────────────────────────────────────────────

    /// The explicit "clear all test data" operation: every store at once.
    pub fn clear_all(&self) -> FunnelResult<()> {
        self.conn.execute_batch(
            "DELETE FROM event_log;
             DELETE FROM leads;
             DELETE FROM backup_leads;
             DELETE FROM views;",
        )?;
        Ok(())
    }
}
