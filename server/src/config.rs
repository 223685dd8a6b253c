//! Server configuration, read once from the environment at startup.
//!
//! Absence is a mode, not an error: missing Supabase credentials put the
//! funnel in local-only mode, a missing automation URL skips the view
//! relay, a missing shared secret disables the payment-webhook auth check.

use std::env;
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub db_path: String,
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    pub make_view_webhook_url: Option<String>,
    pub hubla_webhook_secret: Option<String>,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let config = Self {
            port: try_load("FUNNEL_PORT", "3000"),
            db_path: try_load("FUNNEL_DB", "funnel.db"),
            supabase_url: optional("SUPABASE_URL"),
            supabase_anon_key: optional("SUPABASE_ANON_KEY"),
            make_view_webhook_url: optional("MAKE_VIEW_WEBHOOK_URL"),
            hubla_webhook_secret: optional("HUBLA_WEBHOOK_SECRET"),
        };

        if config.supabase_url.is_none() || config.supabase_anon_key.is_none() {
            log::warn!("Supabase não configurado — operando em modo local");
        }
        if config.make_view_webhook_url.is_none() {
            log::warn!("MAKE_VIEW_WEBHOOK_URL não configurado — relay de views desativado");
        }

        config
    }

    pub fn supabase_configured(&self) -> bool {
        self.supabase_url.is_some() && self.supabase_anon_key.is_some()
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    env::var(key)
        .unwrap_or_else(|_| {
            log::info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| log::warn!("Invalid {key} value: {e}"))
        .unwrap_or_else(|_| default.parse().ok().expect("default must parse"))
}
