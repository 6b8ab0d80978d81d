//! Single-slot handoff of the latest evaluation result.
//!
//! The form writes, the result view consumes. The slot holds the result
//! serialized as JSON under `RESULT_SLOT_KEY`, is overwritten by every
//! successful submission, and is emptied by `take()` or `clear()`.

use std::sync::Mutex;

use thiserror::Error;

use crate::models::EvaluationResult;

/// Fixed key of the slot.
pub const RESULT_SLOT_KEY: &str = "cardioResult";

#[derive(Error, Debug)]
pub enum HandoffError {
    #[error("Internal lock error")]
    LockPoisoned,

    #[error("Stored result is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub struct ResultHandoff {
    slot: Mutex<Option<String>>,
}

impl ResultHandoff {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    pub fn key(&self) -> &'static str {
        RESULT_SLOT_KEY
    }

    /// Store a result, replacing whatever was there.
    pub fn publish(&self, result: &EvaluationResult) -> Result<(), HandoffError> {
        let json = serde_json::to_string(result)?;
        let mut slot = self.slot.lock().map_err(|_| HandoffError::LockPoisoned)?;
        if slot.is_some() {
            tracing::debug!(key = RESULT_SLOT_KEY, "Overwriting unconsumed result");
        }
        *slot = Some(json);
        Ok(())
    }

    /// Consume the stored result, leaving the slot empty.
    pub fn take(&self) -> Result<Option<EvaluationResult>, HandoffError> {
        let stored = self
            .slot
            .lock()
            .map_err(|_| HandoffError::LockPoisoned)?
            .take();
        match stored {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Read without consuming.
    pub fn peek(&self) -> Result<Option<EvaluationResult>, HandoffError> {
        let slot = self.slot.lock().map_err(|_| HandoffError::LockPoisoned)?;
        match slot.as_ref() {
            Some(json) => Ok(Some(serde_json::from_str(json)?)),
            None => Ok(None),
        }
    }

    /// Raw JSON as stored under the key.
    pub fn peek_json(&self) -> Option<String> {
        let slot = self.slot.lock().ok()?;
        slot.clone()
    }

    pub fn clear(&self) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = None;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.slot
            .lock()
            .map(|slot| slot.is_none())
            .unwrap_or(true)
    }
}

impl Default for ResultHandoff {
    fn default() -> Self {
        Self::new()
    }
}
