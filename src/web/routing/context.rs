use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::web::routing::ContextRef;

/// ## Context
///
/// The shared per-request object handed to every handler.
///
/// The router itself only touches `params`: captured parameter values are
/// bound while their sub-tree is being dispatched and restored on the way out,
/// so code outside a capture always sees the values that existed before the
/// dispatch began. `state` is free for handlers to pass data to each other.
pub struct Context {
    /// Captured path parameters.
    ///
    /// ### Example
    ///
    /// Register "/tasks/:user_id/delete" and dispatch "/tasks/1/delete";
    /// handlers under the parameter see `params["user_id"] == "1"`.
    pub params: HashMap<String, String>,

    /// Free-form handler-to-handler values.
    pub state: HashMap<String, String>,
}

impl Context {
    pub fn new() -> Self {
        Self {
            params: HashMap::new(),
            state: HashMap::new(),
        }
    }

    /// Wrap the context for sharing with handlers.
    pub fn shared(self) -> ContextRef {
        Arc::new(Mutex::new(self))
    }

    /// Borrow a captured parameter value.
    pub fn param(&self, name: &str) -> Option<&String> {
        self.params.get(name)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
