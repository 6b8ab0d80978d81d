use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use serde::Serialize;

/// Screens of the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Evaluation,
    Result,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Self::Evaluation => "/",
            Self::Result => "/result",
        }
    }
}

/// Programmatic navigation, owned by the shell.
///
/// Takes no payload: the result travels through `ResultHandoff`.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Records navigation requests for the HTTP layer to turn into redirects.
pub struct ShellNavigator {
    pending: Mutex<Option<Route>>,
    requests: AtomicUsize,
}

impl ShellNavigator {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(None),
            requests: AtomicUsize::new(0),
        }
    }

    /// The most recent unconsumed request.
    pub fn take_pending(&self) -> Option<Route> {
        self.pending.lock().ok()?.take()
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl Default for ShellNavigator {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator for ShellNavigator {
    fn navigate(&self, route: Route) {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut pending) = self.pending.lock() {
            *pending = Some(route);
        }
        tracing::debug!(route = route.path(), "Navigation requested");
    }
}
