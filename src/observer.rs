//! The per-component adapter above the client core.
//!
//! An [`RpcObserver`] receives the categorized inbound events for one
//! session: lifecycle transitions (registered, unregistered, disconnected)
//! and classified messages (request, result, error, notification). Every
//! hook has a default no-op body; a component proxy overrides exactly the
//! categories it cares about.
//!
//! Hooks are invoked synchronously in delivery order for their session.
//! No two hooks for the same session ever run concurrently, so observers
//! can keep plain mutable state without locking.
//!
//! # Example
//!
//! ```ignore
//! struct ButtonsProxy;
//!
//! impl RpcObserver for ButtonsProxy {
//!     fn on_request(&mut self, request: &Request, ctx: &mut SessionContext<'_>) {
//!         if request.method == "Buttons.GetCapabilities" {
//!             let _ = ctx.reply_result(request.id, ResultCode::Success, &request.method);
//!         }
//!     }
//! }
//! ```

use crate::handler::SessionContext;
use crate::protocol::{ErrorResponse, Notification, Request, Response};

/// Observer contract for one session.
///
/// The client core holds exactly one observer per session and drives every
/// hook from its dispatch sequence. The [`SessionContext`] passed to each
/// hook is the only sanctioned way back into the session: sending
/// envelopes, allocating request ids, and managing subscriptions.
pub trait RpcObserver: Send + 'static {
    /// The bus acknowledged registration; requests may be sent from now on.
    fn on_registered(&mut self, _ctx: &mut SessionContext<'_>) {}

    /// The session is being unregistered; no more requests after this.
    fn on_unregistered(&mut self, _ctx: &mut SessionContext<'_>) {}

    /// The transport link is gone or the session was torn down.
    fn on_disconnected(&mut self, _ctx: &mut SessionContext<'_>) {}

    /// An inbound request addressed to this component.
    fn on_request(&mut self, _request: &Request, _ctx: &mut SessionContext<'_>) {}

    /// A result matched to a request this component sent.
    fn on_result(&mut self, _response: &Response, _ctx: &mut SessionContext<'_>) {}

    /// An error matched to a request this component sent, or a synthetic
    /// error delivered when teardown fails an outstanding request.
    fn on_error(&mut self, _error: &ErrorResponse, _ctx: &mut SessionContext<'_>) {}

    /// An inbound notification. Delivered unconditionally; the observer
    /// decides which topics are meaningful.
    fn on_notification(&mut self, _notification: &Notification, _ctx: &mut SessionContext<'_>) {}
}

/// Observer that ignores everything. Useful for tests and for components
/// that only ever send.
pub struct NullObserver;

impl RpcObserver for NullObserver {}
