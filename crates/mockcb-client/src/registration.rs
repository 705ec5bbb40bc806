//! Write-once registration cell for the server-issued client identifier.
//!
//! The cell settles exactly once, either with the identifier or with the
//! reason registration failed. Readers that arrive earlier wait on a watch
//! channel; readers that arrive later get the cached outcome immediately.

use tokio::sync::watch;

use mockcb_core::{CallbackError, CbResult, CONFIGURATION_CONFLICT_MARKER};

type Outcome = Option<Result<String, String>>;

/// Single-assignment cell delivering the client identifier.
#[derive(Debug)]
pub struct Registration {
    slot: watch::Sender<Outcome>,
}

impl Default for Registration {
    fn default() -> Self {
        Self::new()
    }
}

impl Registration {
    pub fn new() -> Self {
        let (slot, _) = watch::channel(None);
        Self { slot }
    }

    /// Settle the cell with `id`. Returns `false` if it was already settled.
    pub fn resolve(&self, id: impl Into<String>) -> bool {
        let id = id.into();
        self.settle(Ok(id))
    }

    /// Settle the cell with a failure. Returns `false` if it was already settled.
    pub fn fail(&self, reason: impl Into<String>) -> bool {
        self.settle(Err(reason.into()))
    }

    pub fn is_settled(&self) -> bool {
        self.slot.borrow().is_some()
    }

    /// The outcome if settled, without waiting.
    pub fn try_identifier(&self) -> Option<CbResult<String>> {
        self.slot.borrow().clone().map(surface)
    }

    /// Wait until the cell settles and return the identifier.
    ///
    /// No timeout is applied; wrap in `tokio::time::timeout` for a bounded wait.
    pub async fn identifier(&self) -> CbResult<String> {
        let mut rx = self.slot.subscribe();
        let outcome = rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| CallbackError::Registration("registration cell dropped".into()))?
            .clone();

        match outcome {
            Some(outcome) => surface(outcome),
            None => Err(CallbackError::Registration(
                "registration cell dropped".into(),
            )),
        }
    }

    fn settle(&self, outcome: Result<String, String>) -> bool {
        self.slot.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(outcome);
            true
        })
    }
}

/// Map a settled outcome to the caller-facing result.
///
/// A configuration-conflict reason from the server is surfaced verbatim.
fn surface(outcome: Result<String, String>) -> CbResult<String> {
    outcome.map_err(|reason| {
        if reason.contains(CONFIGURATION_CONFLICT_MARKER) {
            CallbackError::Registration(reason)
        } else {
            CallbackError::Registration(format!(
                "unable to retrieve client registration id: {reason}"
            ))
        }
    })
}
