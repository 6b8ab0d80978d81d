//! Single in-flight submission guard.
//!
//! The prediction exchange is the only asynchronous step of the form and
//! at most one may be outstanding. `try_acquire()` hands out an RAII
//! guard; while it lives, further attempts get `None`. Dropping the guard
//! (normal settle, error, or a cancelled future) frees the slot.

use std::sync::Mutex;

use serde::Serialize;
use uuid::Uuid;

/// Snapshot of the submission currently in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveSubmission {
    pub id: Uuid,
    /// ISO 8601
    pub started_at: String,
}

pub struct SubmissionGate {
    current: Mutex<Option<ActiveSubmission>>,
}

impl SubmissionGate {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(None),
        }
    }

    /// Claim the slot without waiting. `None` while another submission runs.
    pub fn try_acquire(&self) -> Option<SubmissionGuard<'_>> {
        let mut current = self.current.lock().ok()?;
        if current.is_some() {
            return None;
        }
        let submission = ActiveSubmission {
            id: Uuid::new_v4(),
            started_at: chrono::Utc::now().to_rfc3339(),
        };
        let id = submission.id;
        *current = Some(submission);
        Some(SubmissionGuard { gate: self, id })
    }

    pub fn current(&self) -> Option<ActiveSubmission> {
        self.current.lock().ok()?.clone()
    }

    /// A poisoned lock counts as busy so nothing new starts.
    pub fn is_busy(&self) -> bool {
        self.current
            .lock()
            .map(|current| current.is_some())
            .unwrap_or(true)
    }

    fn release(&self, id: Uuid) {
        if let Ok(mut current) = self.current.lock() {
            if current.as_ref().is_some_and(|s| s.id == id) {
                *current = None;
            }
        }
    }
}

impl Default for SubmissionGate {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII token for the in-flight slot.
pub struct SubmissionGuard<'a> {
    gate: &'a SubmissionGate,
    id: Uuid,
}

impl SubmissionGuard<'_> {
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl Drop for SubmissionGuard<'_> {
    fn drop(&mut self) {
        self.gate.release(self.id);
    }
}
