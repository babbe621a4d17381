//! Tarn Remote - Provisioning API Client
//!
//! HTTPS implementation of the [`Gateway`](tarn_core::Gateway) trait: a
//! bearer-authenticated hyper/rustls transport plus the typed wrappers for
//! the provisioning API's operations.
//!
//! The transport maps HTTP failures onto the closed
//! [`RemoteError`](tarn_core::RemoteError) set — 401/403 becomes
//! `Unauthorized`, other non-2xx statuses become `ServerError`, connection
//! and TLS problems become `Transport` — so no raw error types cross into
//! the activation engine. No retries happen at this layer.

mod api;
mod http;

pub use api::RemoteGateway;
pub use http::HttpTransport;
