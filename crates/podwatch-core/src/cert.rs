//! Certificate expiry evaluation.
//!
//! Only the first PEM block of the payload is decoded. Trust chain,
//! signature and key usage are not validated; the NotAfter field is all
//! that is read.

use time::OffsetDateTime;
use x509_parser::error::X509Error;
use x509_parser::nom::Err;
use x509_parser::pem::parse_x509_pem;

use crate::error::{PodwatchError, Result};

/// Returns the expiry (NotAfter) of the first PEM-encoded certificate in
/// `raw_bytes`.
///
/// # Errors
/// - [`PodwatchError::MalformedInput`] if no PEM block can be decoded.
/// - [`PodwatchError::CertificateParse`] if the block is not an X.509 certificate.
pub fn evaluate(raw_bytes: &[u8]) -> Result<OffsetDateTime> {
    let (_, pem) = parse_x509_pem(raw_bytes).map_err(|e| match e {
        Err::Incomplete(_) => PodwatchError::malformed("truncated PEM block"),
        Err::Error(err) | Err::Failure(err) => PodwatchError::malformed(err.to_string()),
    })?;

    let certificate = pem.parse_x509().map_err(|e| match e {
        Err::Incomplete(_) => {
            PodwatchError::certificate_parse(X509Error::InvalidCertificate.to_string())
        }
        Err::Error(err) | Err::Failure(err) => PodwatchError::certificate_parse(err.to_string()),
    })?;

    Ok(certificate.validity().not_after.to_datetime())
}
