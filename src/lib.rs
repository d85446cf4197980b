//! # buslink
//!
//! Client-side session, dispatch, and observer plumbing for head-unit
//! component proxies speaking JSON-RPC 2.0 to a core message broker.
//!
//! Each HMI component (UI, VR, TTS, ...) runs one [`RpcClient`] that
//! registers the component on the bus, tracks the requests it has in
//! flight, and classifies every inbound envelope into exactly one
//! observer hook. Domain behavior lives in an [`RpcObserver`]
//! implementation, typically a proxy like [`proxy::UiProxy`] that routes
//! requests through a [`handler::DispatchTable`] and answers them through
//! the [`handler::SessionContext`].
//!
//! ## Quick start
//!
//! ```no_run
//! use buslink::{transport, RpcClient};
//! use buslink::proxy::UiProxy;
//! use std::time::Duration;
//!
//! # async fn run() -> buslink::Result<()> {
//! let (link, outbound) = transport::link();
//! // `outbound` feeds the broker connection; inbound frames come back
//! // through the channel passed to `run`.
//! let (inbound_tx, inbound_rx) = tokio::sync::mpsc::unbounded_channel();
//! # let _ = inbound_tx;
//!
//! let mut client = RpcClient::new("UI", UiProxy::new(), link);
//! client.connect(Duration::from_secs(3))?;
//! let client = client.run(inbound_rx).await;
//! # let _ = client;
//! # Ok(())
//! # }
//! ```
//!
//! ## Guarantees
//!
//! - Inbound messages are dispatched strictly in arrival order; a handler
//!   finishes before the next message is classified.
//! - Every tracked request resolves at most once; duplicate and unmatched
//!   responses are logged and dropped.
//! - Teardown fails every pending request exactly once and always ends in
//!   the disconnected state.

pub mod client;
pub mod error;
pub mod handler;
pub mod observer;
pub mod protocol;
pub mod proxy;
pub mod transport;

pub use client::{PendingRequest, RpcClient, Session, SessionState, Subscription};
pub use error::{BuslinkError, Result};
pub use handler::{
    DeferredReplies, DispatchTable, DispatchTableBuilder, Dispatched, SessionContext,
    UnknownMethodPolicy,
};
pub use observer::{NullObserver, RpcObserver};
pub use protocol::{
    ErrorResponse, InboundEnvelope, Notification, Request, Response, ResultCode,
};
pub use transport::TransportLink;
