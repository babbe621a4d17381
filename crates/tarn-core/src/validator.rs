//! Certificate Validator
//!
//! Interprets a remote validity check and decides what to do with the
//! stored client certificate: keep it, have the service issue a new pair,
//! or give up with a user-facing message.

use crate::gateway::CertificateValidity;

/// Fixed notice shown when the service reports the account as disabled.
pub const DISABLED_ACCOUNT_MESSAGE: &str = "Your account has been disabled.";

/// Reasons the service reports for a certificate that can simply be
/// re-provisioned.
const TRANSIENT_REASONS: [&str; 3] = [
    "certificate_missing",
    "certificate_not_yet_valid",
    "certificate_expired",
];

const REASON_USER_DISABLED: &str = "user_disabled";

/// What to do with the current certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertAction {
    /// Certificate is still valid; keep using it.
    Reuse,
    /// Certificate is missing, expired, or not yet valid; request a fresh
    /// pair from the service.
    Reprovision,
    /// Activation cannot continue; the message is ready for display.
    Reject(String),
}

/// Decide among reuse, re-provision, and reject.
///
/// Stateless. Unknown reasons are rejected with the raw reason embedded
/// verbatim so new server-side codes surface intact.
pub fn evaluate(validity: &CertificateValidity) -> CertAction {
    if validity.is_valid {
        return CertAction::Reuse;
    }

    let reason = validity.reason.as_str();
    if TRANSIENT_REASONS.contains(&reason) {
        CertAction::Reprovision
    } else if reason == REASON_USER_DISABLED {
        CertAction::Reject(DISABLED_ACCOUNT_MESSAGE.to_string())
    } else {
        CertAction::Reject(format!("Your client certificate is invalid ({reason})"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_certificate_is_reused() {
        assert_eq!(evaluate(&CertificateValidity::valid()), CertAction::Reuse);
    }

    #[test]
    fn test_transient_reasons_reprovision() {
        for reason in [
            "certificate_missing",
            "certificate_not_yet_valid",
            "certificate_expired",
        ] {
            assert_eq!(
                evaluate(&CertificateValidity::invalid(reason)),
                CertAction::Reprovision,
                "reason {reason} should trigger re-provisioning"
            );
        }
    }

    #[test]
    fn test_disabled_account_gets_fixed_message() {
        let action = evaluate(&CertificateValidity::invalid("user_disabled"));
        assert_eq!(action, CertAction::Reject(DISABLED_ACCOUNT_MESSAGE.into()));
    }

    #[test]
    fn test_unknown_reason_is_embedded_verbatim() {
        let action = evaluate(&CertificateValidity::invalid("certificate_on_fire"));
        match action {
            CertAction::Reject(msg) => assert!(msg.contains("certificate_on_fire")),
            other => panic!("expected reject, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_flag_wins_over_reason() {
        // A reason alongside is_valid=true is ignored.
        let validity = CertificateValidity {
            is_valid: true,
            reason: "user_disabled".into(),
        };
        assert_eq!(evaluate(&validity), CertAction::Reuse);
    }
}
