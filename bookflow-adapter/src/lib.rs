//! Adapter utilities for the `bookflow` crate.
//!
//! The `bookflow` crate is UI-agnostic and never performs I/O on its own: it hands out load
//! tickets and expects the outcomes back. This crate provides small, framework-neutral helpers
//! commonly needed by adapters:
//!
//! - Off-thread chapter loading with a completion queue ([`LoadDispatcher`])
//! - A controller that turns session updates into viewport commands ([`Controller`])
//! - Row anchors that survive window changes ([`ScrollAnchor`])
//!
//! This crate is intentionally framework-agnostic (no ratatui/egui bindings).
#![forbid(unsafe_code)]

#[macro_use]
mod macros;

mod anchor;
mod controller;
mod dispatcher;

#[cfg(test)]
mod tests;

pub use anchor::{ScrollAnchor, apply_anchor, capture_anchor};
pub use controller::{Controller, ViewportCommand};
pub use dispatcher::{DispatchMode, LoadDispatcher};
