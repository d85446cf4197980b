//! Table-driven request dispatch for one component.
//!
//! A [`DispatchTable`] maps exact method names (`"UI.AddCommand"`) to
//! handlers over explicit domain state. It is populated once through the
//! builder and read-only afterwards, so it can be consulted from dispatch
//! without locking.
//!
//! # Example
//!
//! ```ignore
//! let table = DispatchTable::builder()
//!     .handle("UI.Show", |state: &mut UiState, req, ctx| {
//!         ctx.reply_result(req.id, ResultCode::Success, &req.method)
//!     })
//!     .unknown_method(UnknownMethodPolicy::Reject)
//!     .build();
//! ```

use std::collections::HashMap;

use crate::error::Result;
use crate::protocol::{Request, ResultCode};

use super::SessionContext;

/// Handler for one method, invoked with the component's domain state, the
/// inbound request, and the session context for replying.
pub type Handler<S> =
    Box<dyn Fn(&mut S, &Request, &mut SessionContext<'_>) -> Result<()> + Send + Sync>;

/// What to do with a request whose method has no handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownMethodPolicy {
    /// Take no action and send nothing; the caller relies on its own
    /// timeout. This matches the behavior of the reference HMI.
    #[default]
    Ignore,
    /// Answer with an UNSUPPORTED_REQUEST error response.
    Reject,
}

/// Outcome of a dispatch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    /// A handler ran (it may still have replied with a non-success code).
    Handled,
    /// No handler matched; the unknown-method policy applied.
    Unhandled,
}

/// Immutable mapping from method name to handler.
pub struct DispatchTable<S> {
    handlers: HashMap<&'static str, Handler<S>>,
    unknown: UnknownMethodPolicy,
}

impl<S> DispatchTable<S> {
    /// Start building a table.
    pub fn builder() -> DispatchTableBuilder<S> {
        DispatchTableBuilder {
            handlers: HashMap::new(),
            unknown: UnknownMethodPolicy::default(),
        }
    }

    /// Route one request to its handler.
    ///
    /// Exactly one domain action runs for a known method; an unknown method
    /// triggers the configured policy instead.
    pub fn dispatch(
        &self,
        state: &mut S,
        request: &Request,
        ctx: &mut SessionContext<'_>,
    ) -> Result<Dispatched> {
        match self.handlers.get(request.method.as_str()) {
            Some(handler) => {
                handler(state, request, ctx)?;
                Ok(Dispatched::Handled)
            }
            None => {
                match self.unknown {
                    UnknownMethodPolicy::Ignore => {
                        tracing::debug!(method = %request.method, "no handler, ignoring request");
                    }
                    UnknownMethodPolicy::Reject => {
                        tracing::debug!(method = %request.method, "no handler, rejecting request");
                        ctx.reply_error(
                            request.id,
                            ResultCode::UnsupportedRequest,
                            "method not found",
                        )?;
                    }
                }
                Ok(Dispatched::Unhandled)
            }
        }
    }

    /// Whether a handler is registered for `method`.
    pub fn contains(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether the table has no handlers.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// The configured unknown-method policy.
    pub fn unknown_method_policy(&self) -> UnknownMethodPolicy {
        self.unknown
    }
}

/// Builder for a [`DispatchTable`]; the table is immutable once built.
pub struct DispatchTableBuilder<S> {
    handlers: HashMap<&'static str, Handler<S>>,
    unknown: UnknownMethodPolicy,
}

impl<S> DispatchTableBuilder<S> {
    /// Register a handler for a method name. A later registration for the
    /// same name replaces the earlier one.
    pub fn handle<F>(mut self, method: &'static str, handler: F) -> Self
    where
        F: Fn(&mut S, &Request, &mut SessionContext<'_>) -> Result<()> + Send + Sync + 'static,
    {
        self.handlers.insert(method, Box::new(handler));
        self
    }

    /// Set the policy for unrecognized methods.
    pub fn unknown_method(mut self, policy: UnknownMethodPolicy) -> Self {
        self.unknown = policy;
        self
    }

    /// Finish building.
    pub fn build(self) -> DispatchTable<S> {
        DispatchTable {
            handlers: self.handlers,
            unknown: self.unknown,
        }
    }
}
