//! Remote Gateway Interface
//!
//! The closed set of operations the activation engine needs from the
//! provisioning/authorization API, and the typed results they return.
//! The HTTP implementation lives in `tarn-remote`; tests use counting
//! stubs.
//!
//! Failures arrive as [`RemoteError`] kinds so the state machine branches
//! on a tagged enumeration, never on transport error types.
//! [`RemoteError::Unauthorized`] is the sole trigger for re-authentication
//! and must stay distinguishable from everything else.

use crate::meta::KeyPair;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Remote call errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum RemoteError {
    /// The service rejected the bearer credential. Recoverable through
    /// re-authentication, never silently retried.
    #[error("Bearer credential rejected")]
    Unauthorized,

    #[error("Server error (status {status}): {detail}")]
    ServerError { status: u16, detail: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Result of a remote certificate validity check.
///
/// `reason` is meaningful only when `is_valid` is false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateValidity {
    pub is_valid: bool,
    #[serde(default)]
    pub reason: String,
}

impl CertificateValidity {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            reason: String::new(),
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            reason: reason.into(),
        }
    }
}

/// Account state as reported by the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub user_id: String,
    #[serde(default)]
    pub is_disabled: bool,
    #[serde(default)]
    pub two_factor_enrolled: Option<bool>,
}

/// One profile offered by a server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub profile_id: String,
    pub display_name: String,
    #[serde(default)]
    pub two_factor: bool,
}

/// The four remote operations the activation flow sequences, plus profile
/// listing for selection UIs.
///
/// Implementations hold the bearer credential and API base URI; every call
/// is a synchronous round-trip with no built-in retry. `create_keypair` is
/// NOT idempotent — each call yields a fresh, distinct pair, so callers
/// must never invoke it speculatively.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Fetch the raw profile configuration text for `profile_id`.
    async fn fetch_profile_config(&self, profile_id: &str) -> Result<String, RemoteError>;

    /// Have the service issue a fresh certificate/key pair.
    async fn create_keypair(&self) -> Result<KeyPair, RemoteError>;

    /// Fetch account state; doubles as the account liveness check.
    async fn fetch_user_info(&self) -> Result<UserInfo, RemoteError>;

    /// Ask the service whether the certificate named by `common_name` is
    /// still acceptable. An empty common name is reported by the service
    /// as `certificate_missing`.
    async fn check_certificate(&self, common_name: &str)
    -> Result<CertificateValidity, RemoteError>;

    /// List the profiles this server offers.
    async fn list_profiles(&self) -> Result<Vec<Profile>, RemoteError>;
}
