//! Profile subsystem.
//!
//! # Data Flow
//! ```text
//! apply(profile id | inline profile, session)
//!     → resolve id (unknown → false, session untouched)
//!     → reset route state
//!     → every route: instruction from profile, or empty instruction
//!     → reset plugin input to defaults
//!     → true
//! ```
//!
//! # Design Decisions
//! - Validation happens before any mutation
//! - The whole application runs under one session lock, so no request for
//!   the same session observes a half-applied profile
//! - Unknown variants inside a profile are skipped with a warning

pub mod registry;

pub use registry::{Profile, ProfileRegistry, ProfileSelector, RouteInstruction};
