//! Tarn Core - VPN Activation Engine
//!
//! Decides, for a configured server connection, whether the stored client
//! certificate can be reused, must be re-provisioned, or the account has to
//! be rejected, and sequences the remote calls that take a connection from
//! "user wants to connect" to an established tunnel.
//!
//! # Activation flow
//!
//! ```text
//! ┌────────────────┐   no token   ┌──────────────┐
//! │ CredentialCheck│─────────────▶│   TunnelUp   │
//! └───────┬────────┘              └──────▲───────┘
//!         │ token                        │
//! ┌───────▼────────┐  unauthorized       │
//! │  AccountCheck  │──────────▶ AuthRequired (caller re-authenticates)
//! └───────┬────────┘                     │
//! ┌───────▼────────┐              ┌──────┴───────┐
//! │  ConfigFetch   │─────────────▶│  CertCheck   │──▶ Reprovision?
//! └────────────────┘              └──────────────┘
//! ```
//!
//! # Design
//!
//! - Remote calls go through the [`Gateway`] trait; failures arrive as a
//!   closed set of [`RemoteError`] kinds, never raw transport errors.
//! - Tunnel control, local persistence, and notifications are capability
//!   traits supplied by the embedding application.
//! - One activation attempt per connection at a time; a second attempt for
//!   the same uuid is rejected, not interleaved.

mod activation;
mod cert;
mod gateway;
mod meta;
mod ovpn;
mod providers;
mod validator;

pub use activation::{ActivationPhase, ActivationResult, Activator, CancelFlag, FailureKind};
pub use cert::common_name_from_pem;
pub use gateway::{CertificateValidity, Gateway, Profile, RemoteError, UserInfo};
pub use meta::{KeyPair, MetaError, MetaStore, Pem, ServerMeta, StoreFormat};
pub use ovpn::{OvpnConfig, OvpnError, RemoteEndpoint, parse_ovpn};
pub use providers::{CapabilityError, Notifier, ProfileStore, TunnelController};
pub use validator::{CertAction, DISABLED_ACCOUNT_MESSAGE, evaluate};
