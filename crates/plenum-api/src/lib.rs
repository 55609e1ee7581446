#![forbid(unsafe_code)]

//! HTTP surface of the plenum search service.
//!
//! Two endpoints:
//!
//! - `GET /system/search?q=<question>[&c=<c1,c2,...>][&meeting_id=<n>]` —
//!   execute a search and return `{fqid: {"Score": …, "MatchedWords": …}}`;
//! - `GET /health` — liveness probe.
//!
//! The router holds a read handle over the index; searches run concurrently
//! with ongoing index updates. Content restriction happens in an external
//! collaborator, so this surface serves the unrestricted answer shape.

pub mod server;

pub use server::create_router;
