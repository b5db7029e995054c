//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (startup):
//!     RouteSpec → registry.rs (register, method fork-or-mutate)
//!     → Variant[] attached in declaration order
//!     → validate (unique ids, one default per route)
//!
//! Incoming request (method, path):
//!     → registry.rs (candidate routes accepting the method)
//!     → matcher.rs (path pattern, captured params)
//!     → most specific route wins
//!     → route.rs resolve_active (pinned > predicate > default)
//! ```
//!
//! # Design Decisions
//! - Routes are immutable once the engine is built
//! - Method is a route attribute, never a variant attribute
//! - Deterministic: same request and session state, same variant

pub mod matcher;
pub mod registry;
pub mod request;
pub mod route;
pub mod variant;

pub use matcher::PathPattern;
pub use registry::{RouteBuilder, RouteKey, RouteMatch, RouteRegistry};
pub use request::{MockBody, MockResponse, RequestData};
pub use route::{Route, RouteSpec};
pub use variant::{Predicate, ResponseBody, Variant};
