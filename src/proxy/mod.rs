//! Component proxies built on the dispatch core.
//!
//! A proxy owns its domain state and a [`DispatchTable`](crate::handler::DispatchTable)
//! over it, and implements [`RpcObserver`](crate::observer::RpcObserver) so the
//! client can hand it every classified inbound message. The UI proxy here is
//! the reference shape; VR, TTS, Buttons and the rest follow the same pattern
//! with their own method sets.

pub mod ui;

pub use ui::{AppModel, UiModel, UiProxy, UiState, VR_ON_CHOICE};
