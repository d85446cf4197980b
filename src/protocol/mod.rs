//! Wire protocol - JSON-RPC envelopes and result codes.

mod codes;
mod envelope;

pub use codes::ResultCode;
pub use envelope::{
    error_response, kind_of, notification, request, response, result_with_code, to_wire,
    EnvelopeKind, ErrorResponse, InboundEnvelope, Notification, Request, Response,
    JSONRPC_VERSION,
};

/// Bus-level methods spoken to the message broker itself, as opposed to
/// component methods routed to peers.
pub mod bus {
    /// Registers a component proxy under its component name.
    pub const REGISTER_COMPONENT: &str = "MB.registerComponent";
    /// Withdraws a component registration.
    pub const UNREGISTER_COMPONENT: &str = "MB.unregisterComponent";
    /// Subscribes the session to a notification topic.
    pub const SUBSCRIBE_TO: &str = "MB.subscribeTo";
    /// Drops a notification-topic subscription.
    pub const UNSUBSCRIBE_FROM: &str = "MB.unsubscribeFrom";

    /// Error code used when teardown fails the outstanding requests.
    pub const SESSION_CLOSED_CODE: i64 = -32000;
    /// Error code used when the registration handshake times out.
    pub const REGISTRATION_TIMEOUT_CODE: i64 = -32001;
}
