//! Action subsystem.
//!
//! # Data Flow
//! ```text
//! execute(action id, input, session)
//!     → lookup (unknown → false)
//!     → context: session + bound route (with its active variant)
//!                + bound plugin
//!     → handler(context, &mut input)
//!     → true, or the handler's error unchanged
//! ```
//!
//! # Design Decisions
//! - Actions are a side channel for state changes outside request handling
//! - Handler errors are not wrapped or logged away here

pub mod registry;

pub use registry::{Action, ActionHandler, ActionRegistry};
