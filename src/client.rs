//! RPC client core - session lifecycle, request tracking, inbound dispatch.
//!
//! One [`RpcClient`] owns one logical session between a component proxy and
//! the bus. The lifecycle:
//!
//! 1. `connect` sends the registration request and arms the handshake timeout
//! 2. the registration ack moves the session to `Registered` and fires the
//!    observer's registered hook
//! 3. inbound messages are classified and dispatched, strictly in order
//! 4. `disconnect` (or a transport-level close) fails every outstanding
//!    request, clears subscriptions, and resets to `Disconnected`
//!
//! Reconnection is a fresh `connect`, never a resume.
//!
//! # Example
//!
//! ```ignore
//! let (link, outbound_rx) = transport::link();
//! let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
//!
//! let mut client = RpcClient::new("UI", UiProxy::new(), link);
//! client.connect(Duration::from_millis(400))?;
//! tokio::spawn(client.run(inbound_rx));
//! ```

use std::collections::HashMap;
use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::error::{BuslinkError, Result};
use crate::handler::SessionContext;
use crate::observer::RpcObserver;
use crate::protocol::{self, bus, ErrorResponse, InboundEnvelope};
use crate::transport::TransportLink;

/// Connection state of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session; `connect` has not been called or teardown completed.
    Disconnected,
    /// Registration request sent, ack not yet received.
    Connecting,
    /// The bus acknowledged registration; traffic may flow.
    Registered,
}

/// An outbound request awaiting its correlated response.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    /// Session-unique identifier the response must echo.
    pub id: u64,
    /// Method name, kept for diagnostics and synthetic failures.
    pub method: String,
    /// When the request was sent.
    pub sent_at: std::time::Instant,
}

/// An active notification-topic subscription.
#[derive(Debug, Clone)]
pub struct Subscription {
    /// Topic name, e.g. `VR.OnChoice`.
    pub topic: String,
    /// Identifier of the `MB.subscribeTo` request that opened it.
    pub subscribe_request_id: u64,
    /// Identifier of the `MB.unsubscribeFrom` request, once closed.
    pub unsubscribe_request_id: Option<u64>,
}

/// Mutable state of one logical session.
///
/// Owned exclusively by one [`RpcClient`]; mutated only from its dispatch
/// sequence, never directly by component handlers.
pub struct Session {
    pub(crate) component: String,
    pub(crate) state: SessionState,
    pub(crate) pending: HashMap<u64, PendingRequest>,
    pub(crate) subscriptions: HashMap<String, Subscription>,
    next_id: u64,
}

impl Session {
    pub(crate) fn new(component: &str) -> Self {
        Self {
            component: component.to_string(),
            state: SessionState::Disconnected,
            pending: HashMap::new(),
            subscriptions: HashMap::new(),
            next_id: 1,
        }
    }

    /// Assigned component name.
    pub fn component(&self) -> &str {
        &self.component
    }

    /// Current connection state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Number of requests awaiting a response.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Whether a subscription for `topic` is active.
    pub fn is_subscribed(&self, topic: &str) -> bool {
        self.subscriptions.contains_key(topic)
    }

    /// Fresh identifier, unique for the lifetime of the session.
    pub(crate) fn next_request_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Advance the counter to a bus-assigned base, never backwards.
    pub(crate) fn seed_request_id(&mut self, base: u64) {
        if base > self.next_id {
            self.next_id = base;
        }
    }

    /// Record an outbound request as awaiting its response.
    pub(crate) fn track(&mut self, id: u64, method: &str) -> Result<()> {
        if self.pending.contains_key(&id) {
            return Err(BuslinkError::Protocol(format!(
                "request id {} is already pending",
                id
            )));
        }
        self.pending.insert(
            id,
            PendingRequest {
                id,
                method: method.to_string(),
                sent_at: std::time::Instant::now(),
            },
        );
        Ok(())
    }

    /// Resolve the pending entry for `id`, at most once.
    pub(crate) fn resolve(&mut self, id: u64) -> Option<PendingRequest> {
        self.pending.remove(&id)
    }

    fn drain_pending(&mut self) -> Vec<PendingRequest> {
        let mut drained: Vec<PendingRequest> = self.pending.drain().map(|(_, p)| p).collect();
        drained.sort_by_key(|p| p.id);
        drained
    }
}

/// Client core for one component's session on the bus.
pub struct RpcClient<O: RpcObserver> {
    session: Session,
    link: TransportLink,
    observer: O,
    registration_deadline: Option<Instant>,
}

impl<O: RpcObserver> RpcClient<O> {
    /// Create a disconnected client bound to one observer and one link.
    pub fn new(component: &str, observer: O, link: TransportLink) -> Self {
        Self {
            session: Session::new(component),
            link,
            observer,
            registration_deadline: None,
        }
    }

    /// The session state and bookkeeping, read-only.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// A context for driving the session directly (sends, subscriptions,
    /// deferred-reply completion from host code).
    pub fn context(&mut self) -> SessionContext<'_> {
        SessionContext::new(&mut self.session, &self.link)
    }

    /// Scoped access to the observer together with a session context.
    ///
    /// This is the entry point domain code uses to trigger proxy actions
    /// that need the session, e.g. completing a deferred interaction or
    /// emitting a component notification.
    pub fn with_observer<R>(
        &mut self,
        f: impl FnOnce(&mut O, &mut SessionContext<'_>) -> R,
    ) -> R {
        let mut ctx = SessionContext::new(&mut self.session, &self.link);
        f(&mut self.observer, &mut ctx)
    }

    /// Open the session: send the registration request and arm the
    /// handshake timeout.
    ///
    /// # Errors
    ///
    /// Returns [`BuslinkError::AlreadyConnected`] unless the session is
    /// `Disconnected`, and [`BuslinkError::ConnectionClosed`] when the
    /// link is already gone.
    pub fn connect(&mut self, registration_timeout: Duration) -> Result<()> {
        if self.session.state != SessionState::Disconnected {
            return Err(BuslinkError::AlreadyConnected);
        }

        self.session.state = SessionState::Connecting;

        let id = self.session.next_request_id();
        let envelope = protocol::request(
            id,
            bus::REGISTER_COMPONENT,
            json!({ "componentName": self.session.component }),
        );

        // Registration traffic bypasses the Registered gate.
        let wire = protocol::to_wire(&envelope)?;
        if let Err(e) = self.link.send(wire) {
            self.session.state = SessionState::Disconnected;
            return Err(e);
        }
        self.session.track(id, bus::REGISTER_COMPONENT)?;
        self.registration_deadline = Some(Instant::now() + registration_timeout);

        tracing::debug!(
            component = %self.session.component,
            request_id = id,
            "registration request sent"
        );
        Ok(())
    }

    /// Tear the session down.
    ///
    /// Best-effort on the wire side: an unregister notice is sent when the
    /// session is registered, every pending request is failed with a
    /// session-closed error through the observer's error hook, and all
    /// subscriptions are cleared. Always ends in `Disconnected`.
    pub fn disconnect(&mut self) {
        if self.session.state == SessionState::Disconnected {
            return;
        }

        if self.session.state == SessionState::Registered {
            let id = self.session.next_request_id();
            let envelope = protocol::request(
                id,
                bus::UNREGISTER_COMPONENT,
                json!({ "componentName": self.session.component }),
            );
            match protocol::to_wire(&envelope).and_then(|wire| self.link.send(wire)) {
                Ok(()) => {}
                Err(e) => {
                    tracing::debug!(error = %e, "unregister notice lost")
                }
            }

            let mut ctx = SessionContext::new(&mut self.session, &self.link);
            self.observer.on_unregistered(&mut ctx);
        }

        self.fail_pending("session closed", bus::SESSION_CLOSED_CODE);
        self.session.subscriptions.clear();
        self.session.state = SessionState::Disconnected;
        self.registration_deadline = None;

        let mut ctx = SessionContext::new(&mut self.session, &self.link);
        self.observer.on_disconnected(&mut ctx);

        tracing::debug!(component = %self.session.component, "session closed");
    }

    /// Serialize and forward a fully-formed envelope. See
    /// [`SessionContext::send`] for the gating rules.
    pub fn send(&mut self, envelope: &serde_json::Value) -> Result<()> {
        self.context().send(envelope)
    }

    /// Fresh request identifier, unique for the lifetime of the session.
    pub fn next_request_id(&mut self) -> u64 {
        self.session.next_request_id()
    }

    /// Subscribe to a notification topic. Returns the request id used.
    pub fn subscribe_to_notification(&mut self, topic: &str) -> Result<u64> {
        self.context().subscribe_to_notification(topic)
    }

    /// Drop a notification-topic subscription. Returns the request id used.
    pub fn unsubscribe_from_notification(&mut self, topic: &str) -> Result<u64> {
        self.context().unsubscribe_from_notification(topic)
    }

    /// Classify and dispatch one raw inbound message.
    ///
    /// Malformed text is logged and dropped before classification; a
    /// response or error whose id matches no pending request is logged and
    /// dropped. Requests and notifications are forwarded to the observer
    /// unconditionally.
    pub fn handle_raw(&mut self, raw: &str) {
        if self.session.state == SessionState::Disconnected {
            tracing::debug!("inbound message while disconnected, dropping");
            return;
        }

        let envelope = match InboundEnvelope::parse(raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed envelope");
                return;
            }
        };

        match envelope {
            InboundEnvelope::Request(request) => {
                let mut ctx = SessionContext::new(&mut self.session, &self.link);
                self.observer.on_request(&request, &mut ctx);
            }
            InboundEnvelope::Notification(notification) => {
                let mut ctx = SessionContext::new(&mut self.session, &self.link);
                self.observer.on_notification(&notification, &mut ctx);
            }
            InboundEnvelope::Response(response) => {
                let Some(pending) = self.session.resolve(response.id) else {
                    tracing::warn!(id = response.id, "response for unknown request id, dropping");
                    return;
                };

                if pending.method == bus::REGISTER_COMPONENT {
                    self.registration_acknowledged(&response.result);
                    return;
                }

                let mut ctx = SessionContext::new(&mut self.session, &self.link);
                self.observer.on_result(&response, &mut ctx);
            }
            InboundEnvelope::Error(error) => {
                let Some(pending) = self.session.resolve(error.id) else {
                    tracing::warn!(id = error.id, "error for unknown request id, dropping");
                    return;
                };

                if pending.method == bus::REGISTER_COMPONENT
                    && self.session.state == SessionState::Connecting
                {
                    tracing::warn!(
                        component = %self.session.component,
                        "registration rejected by the bus"
                    );
                    self.registration_deadline = None;
                    self.session.state = SessionState::Disconnected;

                    let mut ctx = SessionContext::new(&mut self.session, &self.link);
                    self.observer.on_error(&error, &mut ctx);
                    let mut ctx = SessionContext::new(&mut self.session, &self.link);
                    self.observer.on_disconnected(&mut ctx);
                    return;
                }

                let mut ctx = SessionContext::new(&mut self.session, &self.link);
                self.observer.on_error(&error, &mut ctx);
            }
        }
    }

    /// Main loop: read raw messages and dispatch them, strictly in order.
    ///
    /// Returns the client when the inbound channel closes (transport-level
    /// disconnect) so the host can inspect state or reconnect.
    pub async fn run(mut self, mut inbound: mpsc::UnboundedReceiver<String>) -> Self {
        loop {
            let deadline = self.registration_deadline;
            tokio::select! {
                message = inbound.recv() => match message {
                    Some(raw) => self.handle_raw(&raw),
                    None => {
                        self.transport_closed();
                        return self;
                    }
                },
                _ = sleep_until_opt(deadline) => self.registration_timed_out(),
            }
        }
    }

    fn registration_acknowledged(&mut self, result: &serde_json::Value) {
        if self.session.state != SessionState::Connecting {
            tracing::warn!(
                state = ?self.session.state,
                "registration ack outside of handshake, ignoring"
            );
            return;
        }

        self.session.state = SessionState::Registered;
        self.registration_deadline = None;

        // The bus may hand out a base for this session's request ids.
        if let Some(base) = result.as_u64() {
            self.session.seed_request_id(base);
        }

        tracing::debug!(component = %self.session.component, "registered on the bus");

        let mut ctx = SessionContext::new(&mut self.session, &self.link);
        self.observer.on_registered(&mut ctx);
    }

    fn registration_timed_out(&mut self) {
        self.registration_deadline = None;
        if self.session.state != SessionState::Connecting {
            return;
        }

        tracing::warn!(
            component = %self.session.component,
            "registration timed out"
        );
        self.fail_pending("registration timed out", bus::REGISTRATION_TIMEOUT_CODE);
        self.session.state = SessionState::Disconnected;

        let mut ctx = SessionContext::new(&mut self.session, &self.link);
        self.observer.on_disconnected(&mut ctx);
    }

    fn transport_closed(&mut self) {
        if self.session.state == SessionState::Disconnected {
            return;
        }

        tracing::warn!(component = %self.session.component, "transport link closed");
        self.fail_pending("session closed", bus::SESSION_CLOSED_CODE);
        self.session.subscriptions.clear();
        self.session.state = SessionState::Disconnected;
        self.registration_deadline = None;

        let mut ctx = SessionContext::new(&mut self.session, &self.link);
        self.observer.on_disconnected(&mut ctx);
    }

    /// Fail every pending request with a uniform synthetic error, delivered
    /// through the observer's error hook.
    fn fail_pending(&mut self, reason: &str, code: i64) {
        let drained = self.session.drain_pending();
        if drained.is_empty() {
            return;
        }

        tracing::debug!(count = drained.len(), reason, "failing pending requests");

        let mut ctx = SessionContext::new(&mut self.session, &self.link);
        for pending in drained {
            let error = ErrorResponse {
                id: pending.id,
                error: json!({
                    "code": code,
                    "message": reason,
                    "data": { "method": pending.method },
                }),
            };
            self.observer.on_error(&error, &mut ctx);
        }
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
