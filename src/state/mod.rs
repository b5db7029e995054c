//! Session state subsystem.
//!
//! # Data Flow
//! ```text
//! Request headers
//!     → backend.rs (static | header | cookie → SessionId)
//!     → store.rs (SessionId → SessionState, created lazily once a
//!                 route matches, seeded with plugin defaults)
//!     → session.rs regions:
//!           plugin_state   (plugin id → input id → value)
//!           global         (session-wide user state)
//!           routes[id]     (pinned variant, route inputs, route user
//!                           state shared by predicates, actions and
//!                           builders, per-variant private state)
//! ```
//!
//! # Design Decisions
//! - State is in-memory; idle sessions are swept after a TTL and the
//!   least recently used are evicted past a size bound
//! - The store is the only writer of session data
//! - Distinct sessions never share a region
//! - Resetting route state never re-seeds plugin input; callers do that

pub mod backend;
pub mod session;
pub mod store;

pub use backend::{SessionLookup, StateBackend};
pub use session::{PluginState, RouteState, SessionId, SessionState, StateMap, StateScope};
pub use store::{SessionLimits, StateStore};
