//! Activation State Machine
//!
//! Sequences one connection attempt: credential check, account liveness,
//! profile config fetch, certificate validation with conditional
//! re-provisioning, and finally tunnel activation.
//!
//! # Contract
//!
//! - All remote calls within one attempt run strictly in sequence; their
//!   failures are converted into [`ActivationResult`] values at the point
//!   of call, never surfaced as raw transport errors.
//! - At most one attempt runs per connection uuid; a concurrent second
//!   attempt is rejected immediately rather than interleaved, so
//!   certificate re-provisioning can never race itself.
//! - `AuthRequired` suspends the attempt entirely. The caller runs the
//!   interactive re-authentication and retries the whole activation; no
//!   retry loop lives here.
//! - Cancellation is observed between steps and reported as its own
//!   terminal state, never disguised as success.

use crate::cert::common_name_from_pem;
use crate::gateway::{Gateway, RemoteError};
use crate::meta::ServerMeta;
use crate::ovpn::parse_ovpn;
use crate::providers::{Notifier, ProfileStore, TunnelController};
use crate::validator::{CertAction, DISABLED_ACCOUNT_MESSAGE, evaluate};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Where an attempt currently is; used for logging and failure detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationPhase {
    CredentialCheck,
    AccountCheck,
    ConfigFetch,
    CertCheck,
    Reprovision,
    TunnelUp,
}

impl fmt::Display for ActivationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActivationPhase::CredentialCheck => "credential-check",
            ActivationPhase::AccountCheck => "account-check",
            ActivationPhase::ConfigFetch => "config-fetch",
            ActivationPhase::CertCheck => "cert-check",
            ActivationPhase::Reprovision => "reprovision",
            ActivationPhase::TunnelUp => "tunnel-up",
        };
        write!(f, "{name}")
    }
}

/// Why an attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The account liveness check failed for a non-auth reason.
    AccountCheck,
    /// Fetching, parsing, or persisting the profile configuration failed.
    ConfigFetch,
    /// The certificate validity check itself could not be performed.
    CertCheck,
    /// Issuing a fresh certificate/key pair failed.
    Keypair,
    /// The account or certificate was rejected; detail is user-facing.
    AccountRejected,
    /// The local network stack refused to bring the tunnel up.
    Tunnel,
    /// Another attempt for the same connection is already in flight.
    AlreadyActive,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::AccountCheck => "account-check",
            FailureKind::ConfigFetch => "config-fetch",
            FailureKind::CertCheck => "cert-check",
            FailureKind::Keypair => "keypair",
            FailureKind::AccountRejected => "account-rejected",
            FailureKind::Tunnel => "tunnel",
            FailureKind::AlreadyActive => "already-active",
        };
        write!(f, "{name}")
    }
}

/// Terminal outcome of one activation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationResult {
    /// The tunnel is up.
    Connected,
    /// The bearer credential was rejected; the caller must run the
    /// external re-authentication flow and retry from the top.
    AuthRequired,
    /// The attempt was cancelled between steps.
    Cancelled,
    /// Terminal failure; `detail` is precise enough to render.
    Failed { kind: FailureKind, detail: String },
}

impl ActivationResult {
    pub fn is_connected(&self) -> bool {
        matches!(self, ActivationResult::Connected)
    }

    fn failed(kind: FailureKind, detail: impl Into<String>) -> Self {
        ActivationResult::Failed {
            kind,
            detail: detail.into(),
        }
    }
}

/// Cooperative cancellation handle shared between the attempt and the
/// caller (e.g. a UI disabling the connection mid-flow).
#[derive(Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Drives activation attempts against the supplied capabilities.
pub struct Activator {
    gateway: Arc<dyn Gateway>,
    store: Arc<dyn ProfileStore>,
    tunnel: Arc<dyn TunnelController>,
    notifier: Arc<dyn Notifier>,
    /// Connection uuids with an attempt currently in flight.
    in_flight: Mutex<HashSet<String>>,
    cancel: CancelFlag,
}

impl Activator {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        store: Arc<dyn ProfileStore>,
        tunnel: Arc<dyn TunnelController>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self::with_cancel_flag(gateway, store, tunnel, notifier, CancelFlag::default())
    }

    pub fn with_cancel_flag(
        gateway: Arc<dyn Gateway>,
        store: Arc<dyn ProfileStore>,
        tunnel: Arc<dyn TunnelController>,
        notifier: Arc<dyn Notifier>,
        cancel: CancelFlag,
    ) -> Self {
        Self {
            gateway,
            store,
            tunnel,
            notifier,
            in_flight: Mutex::new(HashSet::new()),
            cancel,
        }
    }

    /// Handle the caller can use to cancel in-flight attempts.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Run one activation attempt for `meta`.
    ///
    /// Mutates `meta` in place: `config` on a successful fetch, `cert` and
    /// `key` on re-provisioning. Nothing is rolled back on a late failure;
    /// the updated state stays valid for the next attempt.
    pub async fn activate(&self, meta: &mut ServerMeta) -> ActivationResult {
        {
            let mut in_flight = self.in_flight.lock().await;
            if !in_flight.insert(meta.uuid.clone()) {
                warn!("activation already in flight for {}", meta.uuid);
                return ActivationResult::failed(
                    FailureKind::AlreadyActive,
                    format!("activation already in flight for '{}'", meta.display_name),
                );
            }
        }

        let result = self.run(meta).await;
        self.in_flight.lock().await.remove(&meta.uuid);

        match &result {
            ActivationResult::Connected => info!("'{}' is up", meta.display_name),
            ActivationResult::AuthRequired => {
                info!("'{}' needs re-authentication", meta.display_name)
            }
            ActivationResult::Cancelled => info!("activation of '{}' cancelled", meta.display_name),
            ActivationResult::Failed { kind, detail } => {
                warn!("activation of '{}' failed ({kind}): {detail}", meta.display_name)
            }
        }
        result
    }

    async fn run(&self, meta: &mut ServerMeta) -> ActivationResult {
        info!("Connecting to '{}' ({})", meta.display_name, meta.uuid);
        if let Err(e) = self
            .notifier
            .notify("VPN connecting...", &format!("Connecting to '{}'", meta.display_name))
        {
            warn!("notification dropped: {e}");
        }

        if self.cancel.is_cancelled() {
            return ActivationResult::Cancelled;
        }

        // Fast path: without a token the local profile is trusted as-is
        // and no remote verification happens. Intentional asymmetry with
        // the authorized path.
        if meta.token.is_none() {
            debug!(phase = %ActivationPhase::CredentialCheck, "no bearer token, using local profile");
            return self.bring_tunnel_up(meta).await;
        }

        debug!(phase = %ActivationPhase::AccountCheck, "checking account state");
        let user = match self.gateway.fetch_user_info().await {
            Ok(user) => user,
            Err(RemoteError::Unauthorized) => {
                info!("credential rejected, handing off for re-authentication");
                return ActivationResult::AuthRequired;
            }
            Err(e) => return ActivationResult::failed(FailureKind::AccountCheck, e.to_string()),
        };
        if user.is_disabled {
            return ActivationResult::failed(
                FailureKind::AccountRejected,
                DISABLED_ACCOUNT_MESSAGE,
            );
        }

        if self.cancel.is_cancelled() {
            return ActivationResult::Cancelled;
        }

        debug!(phase = %ActivationPhase::ConfigFetch, profile = %meta.profile_id, "fetching profile config");
        let raw = match self.gateway.fetch_profile_config(&meta.profile_id).await {
            Ok(raw) => raw,
            Err(e) => return ActivationResult::failed(FailureKind::ConfigFetch, e.to_string()),
        };
        meta.config = Some(raw.clone());
        let parsed = match parse_ovpn(&raw) {
            Ok(parsed) => parsed,
            Err(e) => return ActivationResult::failed(FailureKind::ConfigFetch, e.to_string()),
        };
        if let Err(e) = self.store.update_config(meta, &parsed).await {
            return ActivationResult::failed(FailureKind::ConfigFetch, e.to_string());
        }

        if self.cancel.is_cancelled() {
            return ActivationResult::Cancelled;
        }

        // An absent or unreadable certificate produces the empty common
        // name, which the service reports as certificate_missing.
        let common_name = meta
            .cert
            .as_ref()
            .and_then(common_name_from_pem)
            .unwrap_or_default();
        debug!(phase = %ActivationPhase::CertCheck, common_name = %common_name, "checking certificate validity");
        let validity = match self.gateway.check_certificate(&common_name).await {
            Ok(validity) => validity,
            Err(e) => return ActivationResult::failed(FailureKind::CertCheck, e.to_string()),
        };

        match evaluate(&validity) {
            CertAction::Reuse => {}
            CertAction::Reprovision => {
                warn!("certificate not usable ({}), requesting a fresh pair", validity.reason);
                debug!(phase = %ActivationPhase::Reprovision, "creating keypair");
                let pair = match self.gateway.create_keypair().await {
                    Ok(pair) => pair,
                    Err(e) => {
                        return ActivationResult::failed(FailureKind::Keypair, e.to_string());
                    }
                };
                if let Err(e) = self
                    .store
                    .update_keys(&meta.uuid, &pair.certificate, &pair.private_key)
                    .await
                {
                    return ActivationResult::failed(FailureKind::Keypair, e.to_string());
                }
                meta.set_keypair(pair);
            }
            CertAction::Reject(message) => {
                return ActivationResult::failed(FailureKind::AccountRejected, message);
            }
        }

        self.bring_tunnel_up(meta).await
    }

    async fn bring_tunnel_up(&self, meta: &ServerMeta) -> ActivationResult {
        if self.cancel.is_cancelled() {
            return ActivationResult::Cancelled;
        }
        debug!(phase = %ActivationPhase::TunnelUp, "bringing tunnel up");
        match self.tunnel.connect(&meta.uuid).await {
            Ok(()) => ActivationResult::Connected,
            Err(e) => ActivationResult::failed(FailureKind::Tunnel, e.to_string()),
        }
    }
}
