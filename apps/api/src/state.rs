use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::analysis::client::AnalysisClient;
use crate::analysis::orchestrator::{self, AnalysisOrchestrator};
use crate::config::Config;
use crate::llm_client::GenerativeModel;

/// Live analysis sessions. Each orchestrator sits behind its own mutex so runs
/// in different sessions never contend.
pub type SessionStore = Arc<RwLock<HashMap<Uuid, Arc<Mutex<AnalysisOrchestrator>>>>>;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Remote model. Swapped for a scripted one in tests.
    pub model: Arc<dyn GenerativeModel>,
    pub analysis: AnalysisClient,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(config: Config, model: Arc<dyn GenerativeModel>) -> Self {
        Self {
            config,
            analysis: AnalysisClient::new(model.clone()),
            model,
            sessions: SessionStore::default(),
        }
    }
}

/// Drops every session idle for longer than `ttl` as of `now`. Returns how many went.
pub async fn evict_idle_sessions(
    sessions: &SessionStore,
    ttl: chrono::Duration,
    now: DateTime<Utc>,
) -> usize {
    let mut sessions = sessions.write().await;
    let before = sessions.len();
    sessions.retain(|_, session| !orchestrator::lock(session).is_expired(now, ttl));
    before - sessions.len()
}

/// Sweeps idle sessions every `ttl / 4` (at least once a second) for the life
/// of the process.
pub fn spawn_session_sweeper(sessions: SessionStore, ttl_secs: u64) {
    let ttl = chrono::Duration::seconds(
        i64::try_from(ttl_secs)
            .unwrap_or(i64::MAX)
            .min(i64::MAX / 1000),
    );
    let period = Duration::from_secs((ttl_secs / 4).max(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await; // first tick fires immediately
        loop {
            ticker.tick().await;
            let evicted = evict_idle_sessions(&sessions, ttl, Utc::now()).await;
            if evicted > 0 {
                info!("Evicted {evicted} idle analysis session(s)");
            }
        }
    });
}
