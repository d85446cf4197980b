//! Component dispatch - session context, dispatch table, deferred replies.
//!
//! Each component proxy owns one [`DispatchTable`] routing inbound method
//! names to handlers, a [`DeferredReplies`] store for replies produced by
//! later user actions, and receives a [`SessionContext`] per dispatch for
//! talking back to the bus.

mod context;
mod deferred;
mod table;

pub use context::SessionContext;
pub use deferred::DeferredReplies;
pub use table::{DispatchTable, DispatchTableBuilder, Dispatched, Handler, UnknownMethodPolicy};
