//! Session context passed to observer hooks and dispatch handlers.
//!
//! Provides the only sanctioned way back into the session from component
//! code: sending envelopes, allocating request ids, managing subscriptions,
//! and the response/notification helpers:
//!
//! - `reply_result` - the common `{code, method}` result
//! - `reply` - a result with component-specific extra fields
//! - `reply_error` - an explicit error response
//! - `notify` - fire-and-forget notification, never fails loudly
//!
//! # Example
//!
//! ```ignore
//! fn handle_show(state: &mut UiState, req: &Request, ctx: &mut SessionContext<'_>) -> Result<()> {
//!     ctx.reply_result(req.id, ResultCode::Success, &req.method)
//! }
//! ```

use serde_json::{json, Value};

use crate::client::{Session, SessionState, Subscription};
use crate::error::{BuslinkError, Result};
use crate::protocol::{self, bus, EnvelopeKind, ResultCode};
use crate::transport::TransportLink;

/// Scoped access to one session, alive for the duration of a single hook
/// or host-driven call.
///
/// The pending-request map and subscription set are mutated only through
/// these methods; handlers never touch them directly.
pub struct SessionContext<'a> {
    session: &'a mut Session,
    link: &'a TransportLink,
}

impl<'a> SessionContext<'a> {
    pub(crate) fn new(session: &'a mut Session, link: &'a TransportLink) -> Self {
        Self { session, link }
    }

    /// Assigned component name.
    pub fn component(&self) -> &str {
        self.session.component()
    }

    /// Current connection state.
    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// Fresh request identifier, unique for the lifetime of the session.
    pub fn next_request_id(&mut self) -> u64 {
        self.session.next_request_id()
    }

    /// Whether a subscription for `topic` is active.
    pub fn is_subscribed(&self, topic: &str) -> bool {
        self.session.is_subscribed(topic)
    }

    /// Serialize and forward a fully-formed envelope to the transport link.
    ///
    /// Requires a registered session for every envelope kind. Requests are
    /// tracked in the pending map; their id must not collide with one
    /// already in flight.
    pub fn send(&mut self, envelope: &Value) -> Result<()> {
        if self.session.state() != SessionState::Registered {
            return Err(BuslinkError::NotConnected);
        }

        match protocol::kind_of(envelope) {
            Some(EnvelopeKind::Request) => {
                // kind_of guarantees both fields are present and well-typed.
                let id = envelope["id"].as_u64().unwrap_or_default();
                let method = envelope["method"].as_str().unwrap_or_default();
                self.session.track(id, method)?;
            }
            Some(_) => {}
            None => {
                return Err(BuslinkError::Protocol(
                    "value is not a JSON-RPC envelope".to_string(),
                ));
            }
        }

        let wire = protocol::to_wire(envelope)?;
        self.link.send(wire)
    }

    /// Allocate an id, build a request envelope, track it, and send it.
    /// Returns the id for later correlation.
    pub fn send_request(&mut self, method: &str, params: Value) -> Result<u64> {
        if self.session.state() != SessionState::Registered {
            return Err(BuslinkError::NotConnected);
        }
        let id = self.session.next_request_id();
        self.send(&protocol::request(id, method, params))?;
        Ok(id)
    }

    /// Subscribe this session to a notification topic.
    ///
    /// At most one subscription per topic is active at a time; a duplicate
    /// subscribe is rejected. Returns the request id used so the caller can
    /// correlate the eventual ack.
    pub fn subscribe_to_notification(&mut self, topic: &str) -> Result<u64> {
        if self.session.is_subscribed(topic) {
            return Err(BuslinkError::AlreadySubscribed(topic.to_string()));
        }

        let id = self.send_request(bus::SUBSCRIBE_TO, json!({ "propertyName": topic }))?;
        self.session.subscriptions.insert(
            topic.to_string(),
            Subscription {
                topic: topic.to_string(),
                subscribe_request_id: id,
                unsubscribe_request_id: None,
            },
        );

        tracing::debug!(topic, request_id = id, "subscribed to notification");
        Ok(id)
    }

    /// Drop this session's subscription for a topic.
    ///
    /// The subscription is cleared immediately; notifications arriving
    /// afterwards no longer match it. Returns the request id used.
    pub fn unsubscribe_from_notification(&mut self, topic: &str) -> Result<u64> {
        if !self.session.is_subscribed(topic) {
            return Err(BuslinkError::NotSubscribed(topic.to_string()));
        }

        let id = self.send_request(bus::UNSUBSCRIBE_FROM, json!({ "propertyName": topic }))?;
        if let Some(mut subscription) = self.session.subscriptions.remove(topic) {
            subscription.unsubscribe_request_id = Some(id);
            tracing::debug!(
                topic,
                subscribe_request_id = subscription.subscribe_request_id,
                unsubscribe_request_id = id,
                "unsubscribed from notification"
            );
        }
        Ok(id)
    }

    /// Send the common `{code, method}` result for a request.
    pub fn reply_result(&mut self, id: u64, code: ResultCode, method: &str) -> Result<()> {
        self.send(&protocol::result_with_code(id, code, method))
    }

    /// Send a response whose result carries component-specific extra fields.
    pub fn reply(&mut self, id: u64, result: Value) -> Result<()> {
        self.send(&protocol::response(id, result))
    }

    /// Send an explicit error response for a request.
    pub fn reply_error(&mut self, id: u64, code: ResultCode, message: &str) -> Result<()> {
        self.send(&protocol::error_response(id, code, message))
    }

    /// Emit a fire-and-forget notification.
    ///
    /// Notifications are advisory; a transport failure (or an unregistered
    /// session) is swallowed here with a warning rather than surfaced.
    pub fn notify(&mut self, method: &str, params: Value) {
        if let Err(e) = self.send(&protocol::notification(method, params)) {
            tracing::warn!(method, error = %e, "notification dropped");
        }
    }
}
