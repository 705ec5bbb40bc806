//! Callback registry: at most one callback, response-kind or forward-kind.
//!
//! The binding is a single tagged value behind one lock, so the cross-kind
//! check and the assignment happen together.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use mockcb_core::{CallbackError, CbResult, HttpRequest, HttpResponse};

/// Error type callbacks may fail with.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Synthesizes a response for an intercepted request.
pub trait ResponseCallback: Send + Sync {
    fn handle(&self, request: HttpRequest) -> Result<HttpResponse, BoxError>;
}

/// Rewrites an intercepted request before the server forwards it.
pub trait ForwardCallback: Send + Sync {
    fn handle(&self, request: HttpRequest) -> Result<HttpRequest, BoxError>;
}

impl<F> ResponseCallback for F
where
    F: Fn(HttpRequest) -> HttpResponse + Send + Sync,
{
    fn handle(&self, request: HttpRequest) -> Result<HttpResponse, BoxError> {
        Ok(self(request))
    }
}

impl<F> ForwardCallback for F
where
    F: Fn(HttpRequest) -> HttpRequest + Send + Sync,
{
    fn handle(&self, request: HttpRequest) -> Result<HttpRequest, BoxError> {
        Ok(self(request))
    }
}

/// Which kind of callback a binding holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackKind {
    Response,
    Forward,
}

impl fmt::Display for CallbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Response => f.write_str("response callback"),
            Self::Forward => f.write_str("forward callback"),
        }
    }
}

/// The currently bound callback.
#[derive(Clone, Default)]
pub enum CallbackBinding {
    #[default]
    Unbound,
    Response(Arc<dyn ResponseCallback>),
    Forward(Arc<dyn ForwardCallback>),
}

impl CallbackBinding {
    pub fn kind(&self) -> Option<CallbackKind> {
        match self {
            Self::Unbound => None,
            Self::Response(_) => Some(CallbackKind::Response),
            Self::Forward(_) => Some(CallbackKind::Forward),
        }
    }
}

impl fmt::Debug for CallbackBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            None => f.write_str("Unbound"),
            Some(kind) => write!(f, "Bound({kind})"),
        }
    }
}

/// Holds the single active callback binding.
#[derive(Debug, Default)]
pub struct CallbackRegistry {
    binding: Mutex<CallbackBinding>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a response callback, replacing any previous response callback.
    ///
    /// Fails without touching the binding if a forward callback is bound.
    pub fn bind_response(&self, callback: Arc<dyn ResponseCallback>) -> CbResult<()> {
        self.bind(CallbackBinding::Response(callback))
    }

    /// Bind a forward callback, replacing any previous forward callback.
    ///
    /// Fails without touching the binding if a response callback is bound.
    pub fn bind_forward(&self, callback: Arc<dyn ForwardCallback>) -> CbResult<()> {
        self.bind(CallbackBinding::Forward(callback))
    }

    /// Snapshot of the current binding for one dispatch.
    pub fn current(&self) -> CallbackBinding {
        self.lock().clone()
    }

    pub fn kind(&self) -> Option<CallbackKind> {
        self.lock().kind()
    }

    fn bind(&self, next: CallbackBinding) -> CbResult<()> {
        let mut binding = self.lock();
        match (binding.kind(), next.kind()) {
            (Some(bound), Some(requested)) if bound != requested => {
                Err(CallbackError::Configuration(format!(
                    "cannot bind {requested} once {bound} is bound"
                )))
            }
            _ => {
                tracing::debug!(kind = ?next.kind(), "callback bound");
                *binding = next;
                Ok(())
            }
        }
    }

    // The guarded value is replaced in one assignment, so a poisoned lock
    // still holds a consistent binding.
    fn lock(&self) -> MutexGuard<'_, CallbackBinding> {
        self.binding.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
