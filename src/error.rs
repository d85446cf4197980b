//! Error types for buslink.

use thiserror::Error;

/// Main error type for all buslink operations.
#[derive(Debug, Error)]
pub enum BuslinkError {
    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Protocol error (malformed envelope, duplicate request id, etc.).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Operation requires a registered session.
    #[error("Not connected")]
    NotConnected,

    /// `connect` called while the session is already Connecting or Registered.
    #[error("Already connected")]
    AlreadyConnected,

    /// A subscription for this topic is already active.
    #[error("Already subscribed to {0}")]
    AlreadySubscribed(String),

    /// No active subscription for this topic.
    #[error("Not subscribed to {0}")]
    NotSubscribed(String),

    /// No deferred reply is pending for this interaction.
    #[error("No pending interaction for {0}")]
    NoPendingInteraction(String),

    /// Transport link closed unexpectedly.
    #[error("Connection closed")]
    ConnectionClosed,
}

/// Result type alias using BuslinkError.
pub type Result<T> = std::result::Result<T, BuslinkError>;
