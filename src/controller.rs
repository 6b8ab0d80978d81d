//! Evaluation form controller.
//!
//! Owns the form text and drives one submission at a time:
//!
//! ```text
//! Idle ──submit──▶ Submitting ──ok──▶ Navigated (result in handoff)
//!   ▲                  │
//!   └──── Failed ◀─err─┘      (Failed ──submit──▶ Submitting)
//! ```
//!
//! Submitting is the gate being held. Controller state sits behind a
//! `std::sync::Mutex` that is never held across the network await.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use thiserror::Error;

use crate::form::{EvaluationForm, FieldId, ValidationError};
use crate::handoff::ResultHandoff;
use crate::navigation::{Navigator, Route};
use crate::prediction::{PredictionClient, PredictionErrorKind};
use crate::submission::SubmissionGate;

/// The only message shown for a failed exchange, whatever its kind.
pub const SUBMIT_ERROR_MESSAGE: &str =
    "There was an error processing the evaluation. Please try again.";
pub const SUBMIT_LABEL: &str = "Calculate risk";
pub const SUBMIT_PENDING_LABEL: &str = "Calculating...";

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("Internal lock error")]
    LockPoisoned,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum FormStatus {
    Idle,
    Submitting,
    Failed { message: String },
    Navigated,
}

/// What one call to `submit()` did.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Result stored, navigation to the result view requested.
    Navigated,
    /// The service exchange failed; the generic message is shown.
    Failed(PredictionErrorKind),
    /// The service answered but the result could not be stored.
    ResultNotStored,
    /// Input did not coerce; nothing was sent.
    Invalid(ValidationError),
    /// Another submission is in flight; nothing was sent.
    AlreadyPending,
    /// The component is unmounted or has already navigated.
    Ignored,
    /// The exchange settled after the component was torn down.
    Discarded,
}

/// Everything needed to render the form.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerSnapshot {
    pub status: FormStatus,
    pub pending: bool,
    pub submit_enabled: bool,
    pub submit_label: &'static str,
    pub last_error: Option<String>,
    pub form: EvaluationForm,
}

struct ControllerState {
    form: EvaluationForm,
    status: FormStatus,
    mounted: bool,
    /// Bumped on every mount so a late settle can tell it is stale.
    generation: u64,
}

pub struct EvaluationController {
    client: Arc<dyn PredictionClient>,
    navigator: Arc<dyn Navigator>,
    handoff: Arc<ResultHandoff>,
    gate: SubmissionGate,
    state: Mutex<ControllerState>,
}

impl EvaluationController {
    /// A mounted controller with a fresh form.
    pub fn new(
        client: Arc<dyn PredictionClient>,
        navigator: Arc<dyn Navigator>,
        handoff: Arc<ResultHandoff>,
    ) -> Self {
        Self {
            client,
            navigator,
            handoff,
            gate: SubmissionGate::new(),
            state: Mutex::new(ControllerState {
                form: EvaluationForm::new(),
                status: FormStatus::Idle,
                mounted: true,
                generation: 0,
            }),
        }
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, ControllerState>, ControllerError> {
        self.state.lock().map_err(|_| ControllerError::LockPoisoned)
    }

    pub fn handoff(&self) -> &Arc<ResultHandoff> {
        &self.handoff
    }

    // ── Lifecycle ───────────────────────────────────────────

    /// Start a fresh component instance: default fields, Idle.
    ///
    /// An exchange still in flight from the previous instance is
    /// discarded when it settles.
    pub fn mount(&self) -> Result<(), ControllerError> {
        start_instance(&mut *self.lock_state()?);
        Ok(())
    }

    pub fn unmount(&self) -> Result<(), ControllerError> {
        self.lock_state()?.mounted = false;
        Ok(())
    }

    pub fn is_mounted(&self) -> bool {
        self.state.lock().map(|s| s.mounted).unwrap_or(false)
    }

    pub fn is_pending(&self) -> bool {
        self.gate.is_busy()
    }

    /// Remount before an explicit submission from a form the user still has
    /// on screen (for example after Back from the result view).
    ///
    /// Posted fields are applied afterwards, so nothing typed is lost. Does
    /// nothing while an exchange is in flight. Returns whether it remounted.
    pub fn ensure_mounted(&self) -> Result<bool, ControllerError> {
        if self.gate.is_busy() {
            return Ok(false);
        }
        let mut state = self.lock_state()?;
        if state.mounted && state.status != FormStatus::Navigated {
            return Ok(false);
        }
        start_instance(&mut state);
        Ok(true)
    }

    // ── Field editing ───────────────────────────────────────

    /// Store raw text. Allowed while submitting; the payload in flight
    /// was already built.
    pub fn set_field(&self, field: FieldId, value: &str) -> Result<(), ControllerError> {
        self.lock_state()?.form.set(field, value);
        Ok(())
    }

    /// Apply posted key/value pairs. Returns the keys that name no field.
    pub fn apply_fields<'a, I>(&self, pairs: I) -> Result<Vec<String>, ControllerError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut state = self.lock_state()?;
        let mut unknown = Vec::new();
        for (key, value) in pairs {
            if !state.form.set_by_key(key, value) {
                unknown.push(key.to_string());
            }
        }
        Ok(unknown)
    }

    pub fn form(&self) -> Result<EvaluationForm, ControllerError> {
        Ok(self.lock_state()?.form.clone())
    }

    /// Restore default fields and clear the error. Refused while pending.
    pub fn reset(&self) -> Result<bool, ControllerError> {
        if self.gate.is_busy() {
            return Ok(false);
        }
        let mut state = self.lock_state()?;
        state.form.reset();
        if matches!(state.status, FormStatus::Failed { .. }) {
            state.status = FormStatus::Idle;
        }
        Ok(true)
    }

    // ── Submission ──────────────────────────────────────────

    pub async fn submit(&self) -> Result<SubmitOutcome, ControllerError> {
        let (guard, observation, generation) = {
            let mut state = self.lock_state()?;
            if !state.mounted || state.status == FormStatus::Navigated {
                return Ok(SubmitOutcome::Ignored);
            }
            let Some(guard) = self.gate.try_acquire() else {
                tracing::debug!("Submit ignored, evaluation already in flight");
                return Ok(SubmitOutcome::AlreadyPending);
            };
            state.status = FormStatus::Idle;

            match state.form.to_observation() {
                Ok(observation) => (guard, observation, state.generation),
                Err(err) => {
                    tracing::debug!(field = err.field().key(), error = %err, "Form input rejected");
                    state.status = FormStatus::Failed {
                        message: err.to_string(),
                    };
                    return Ok(SubmitOutcome::Invalid(err));
                }
            }
        };

        let submission_id = guard.id();
        let started_at = self
            .gate
            .current()
            .map(|s| s.started_at)
            .unwrap_or_default();
        tracing::info!(%submission_id, %started_at, "Submitting evaluation");
        let outcome = self.client.predict(&observation).await;

        let mut state = self.lock_state()?;
        if !state.mounted || state.generation != generation {
            tracing::debug!(%submission_id, "Evaluation settled after teardown, discarded");
            return Ok(SubmitOutcome::Discarded);
        }

        match outcome {
            Ok(result) => {
                if let Err(e) = self.handoff.publish(&result) {
                    tracing::error!(%submission_id, error = %e, "Evaluation result could not be stored");
                    state.status = FormStatus::Failed {
                        message: SUBMIT_ERROR_MESSAGE.to_string(),
                    };
                    return Ok(SubmitOutcome::ResultNotStored);
                }
                state.status = FormStatus::Navigated;
                drop(state);

                tracing::info!(%submission_id, "Evaluation complete");
                self.navigator.navigate(Route::Result);
                Ok(SubmitOutcome::Navigated)
            }
            Err(e) => {
                tracing::error!(
                    %submission_id,
                    %started_at,
                    kind = e.kind().as_str(),
                    status = ?e.status(),
                    error = %e,
                    "Evaluation failed"
                );
                state.status = FormStatus::Failed {
                    message: SUBMIT_ERROR_MESSAGE.to_string(),
                };
                Ok(SubmitOutcome::Failed(e.kind()))
            }
        }
    }

    pub fn snapshot(&self) -> Result<ControllerSnapshot, ControllerError> {
        let pending = self.gate.is_busy();
        let state = self.lock_state()?;
        let status = if pending {
            FormStatus::Submitting
        } else {
            state.status.clone()
        };
        let last_error = match &status {
            FormStatus::Failed { message } => Some(message.clone()),
            _ => None,
        };
        Ok(ControllerSnapshot {
            submit_enabled: state.mounted && !pending && status != FormStatus::Navigated,
            submit_label: if pending {
                SUBMIT_PENDING_LABEL
            } else {
                SUBMIT_LABEL
            },
            status,
            pending,
            last_error,
            form: state.form.clone(),
        })
    }
}

fn start_instance(state: &mut ControllerState) {
    state.form.reset();
    state.status = FormStatus::Idle;
    state.mounted = true;
    state.generation += 1;
}
