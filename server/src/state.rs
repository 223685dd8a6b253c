use std::sync::{Arc, Mutex};

use funnel_core::aggregator::Aggregator;
use funnel_core::config::VariantCatalog;
use funnel_core::store::LocalStore;

use crate::config::ServerConfig;
use crate::supabase::{RemoteSink, SupabaseClient};

/// Shared handler state. The local store sits behind a mutex — requests
/// are serialized onto it, the single-writer model this system assumes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub sink: RemoteSink,
    pub aggregator: Arc<Mutex<Aggregator>>,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: ServerConfig) -> anyhow::Result<Self> {
        let store = LocalStore::open(&config.db_path)?;
        store.migrate()?;
        // The aggregator gets its own connection to the same database.
        let aggregator_store = store.reopen()?;

        let client = match (&config.supabase_url, &config.supabase_anon_key) {
            (Some(url), Some(key)) => Some(SupabaseClient::new(url, key)),
            _ => None,
        };

        Ok(Self {
            config: Arc::new(config),
            sink: RemoteSink::new(client, Arc::new(Mutex::new(store))),
            aggregator: Arc::new(Mutex::new(Aggregator::new(
                aggregator_store,
                VariantCatalog::default(),
            ))),
            http: reqwest::Client::new(),
        })
    }
}
