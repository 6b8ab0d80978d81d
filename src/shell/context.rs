use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use axum::http::{header, HeaderMap};
use uuid::Uuid;

use crate::controller::EvaluationController;
use crate::handoff::ResultHandoff;
use crate::navigation::ShellNavigator;
use crate::prediction::PredictionClient;
use crate::shell::error::ShellError;

pub const SESSION_COOKIE: &str = "cardioia_session";

/// Sessions kept before idle ones are evicted.
pub const MAX_SESSIONS: usize = 256;

/// One browser session: its own form instance, navigator and result slot.
pub struct ShellSession {
    pub id: Uuid,
    pub controller: Arc<EvaluationController>,
    pub navigator: Arc<ShellNavigator>,
    last_used: AtomicU64,
}

impl ShellSession {
    fn new(client: Arc<dyn PredictionClient>, tick: u64) -> Self {
        let navigator = Arc::new(ShellNavigator::new());
        let controller = Arc::new(EvaluationController::new(
            client,
            navigator.clone(),
            Arc::new(ResultHandoff::new()),
        ));
        Self {
            id: Uuid::new_v4(),
            controller,
            navigator,
            last_used: AtomicU64::new(tick),
        }
    }

    pub fn handoff(&self) -> &Arc<ResultHandoff> {
        self.controller.handoff()
    }

    /// `Set-Cookie` value naming this session.
    pub fn cookie(&self) -> String {
        format!("{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Strict", self.id)
    }
}

/// Shared state for all shell routes.
#[derive(Clone)]
pub struct ShellContext {
    pub client: Arc<dyn PredictionClient>,
    sessions: Arc<Mutex<HashMap<Uuid, Arc<ShellSession>>>>,
    clock: Arc<AtomicU64>,
}

impl ShellContext {
    pub fn new(client: Arc<dyn PredictionClient>) -> Self {
        Self {
            client,
            sessions: Arc::new(Mutex::new(HashMap::new())),
            clock: Arc::new(AtomicU64::new(0)),
        }
    }

    fn lock_sessions(
        &self,
    ) -> Result<MutexGuard<'_, HashMap<Uuid, Arc<ShellSession>>>, ShellError> {
        self.sessions
            .lock()
            .map_err(|_| ShellError::Internal("session store lock poisoned".into()))
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Session named by the request cookie. A missing or unknown id opens a
    /// new session; the flag is true when one was created.
    pub fn session(&self, headers: &HeaderMap) -> Result<(Arc<ShellSession>, bool), ShellError> {
        if let Some(id) = session_id(headers) {
            if let Some(session) = self.lock_sessions()?.get(&id) {
                session.last_used.store(self.tick(), Ordering::Relaxed);
                return Ok((session.clone(), false));
            }
            tracing::debug!(%id, "Unknown session cookie, opening a new session");
        }
        Ok((self.open_session()?, true))
    }

    pub fn open_session(&self) -> Result<Arc<ShellSession>, ShellError> {
        let session = Arc::new(ShellSession::new(self.client.clone(), self.tick()));
        let mut sessions = self.lock_sessions()?;
        if sessions.len() >= MAX_SESSIONS {
            evict_idle(&mut sessions);
        }
        sessions.insert(session.id, session.clone());
        tracing::info!(session = %session.id, open = sessions.len(), "Session opened");
        Ok(session)
    }

    pub fn find(&self, id: Uuid) -> Option<Arc<ShellSession>> {
        self.sessions.lock().ok()?.get(&id).cloned()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn any_pending(&self) -> Result<bool, ShellError> {
        Ok(self
            .lock_sessions()?
            .values()
            .any(|s| s.controller.is_pending()))
    }
}

/// Drop the least recently used session with no exchange in flight.
fn evict_idle(sessions: &mut HashMap<Uuid, Arc<ShellSession>>) {
    let victim = sessions
        .values()
        .filter(|s| !s.controller.is_pending())
        .min_by_key(|s| s.last_used.load(Ordering::Relaxed))
        .map(|s| s.id);
    match victim {
        Some(id) => {
            sessions.remove(&id);
            tracing::debug!(session = %id, "Evicted idle session");
        }
        None => tracing::warn!(open = sessions.len(), "Session limit reached with every session pending"),
    }
}

fn session_id(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}
