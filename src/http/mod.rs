//! HTTP transport subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, trace + body limit layers)
//!     → StateBackend::session_id (static | header | cookie)
//!     → Engine::find_route (method, path); no match → 404, no session
//!     → Engine::initialize_session
//!     → proxy.rs when the session selected an upstream
//!       otherwise:
//!         → request.rs (RequestData: params, query, headers, payload)
//!         → Engine::respond (active variant, rendered)
//!         → response.rs (MockResponse → HTTP response)
//!     → StateBackend::persist (Set-Cookie for minted sessions)
//! ```
//!
//! # Design Decisions
//! - The transport owns no mock semantics; it only converts wire values
//! - Admin routes are nested under a prefix and win over mock routes

pub mod proxy;
pub mod request;
pub mod response;
pub mod server;

pub use proxy::Forwarder;
pub use request::request_data;
pub use response::error_response;
pub use server::{AppState, HttpServer};
