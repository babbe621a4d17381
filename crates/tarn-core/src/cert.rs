//! Client Certificate Inspection
//!
//! The only thing the activation flow needs from the stored certificate is
//! the subject common name, which the remote validity check uses as its
//! lookup key.

use crate::meta::Pem;
use x509_parser::pem::parse_x509_pem;

/// Extract the subject common name from a PEM-encoded certificate.
///
/// Returns `None` when the blob is not parseable X.509 or carries no
/// common name. Callers fall back to the empty name, which the remote
/// service reports as `certificate_missing`.
pub fn common_name_from_pem(cert: &Pem) -> Option<String> {
    let (_, pem) = parse_x509_pem(cert.as_str().as_bytes()).ok()?;
    let parsed = pem.parse_x509().ok()?;
    parsed
        .subject()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(str::to_owned)
}
