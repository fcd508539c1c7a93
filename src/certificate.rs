//! X.509 certificate loading from DER or PEM input

use crate::error::CertificateError;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use x509_parser::pem::parse_x509_pem;
use x509_parser::prelude::*;

const PEM_CERTIFICATE_LABEL: &str = "CERTIFICATE";
const PEM_PREFIX: &[u8] = b"-----BEGIN";

/// A single parsed X.509 certificate.
///
/// The DER encoding is kept verbatim; the descriptive fields are read once when the
/// certificate is loaded so that later accessors cannot fail.
#[derive(Clone, PartialEq, Eq)]
pub struct Certificate {
    der: Vec<u8>,
    subject: String,
    issuer: String,
    serial: String,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
}

impl Certificate {
    /// Parse a DER-encoded certificate. Trailing bytes after the certificate are dropped.
    pub fn from_der(der: &[u8]) -> Result<Self, CertificateError> {
        let (rem, cert) =
            X509Certificate::from_der(der).map_err(|e| CertificateError::Der(e.to_string()))?;
        let consumed = &der[..der.len() - rem.len()];

        Ok(Self {
            der: consumed.to_vec(),
            subject: cert.subject().to_string(),
            issuer: cert.issuer().to_string(),
            serial: cert.raw_serial_as_string(),
            not_before: to_utc(cert.validity().not_before.timestamp()),
            not_after: to_utc(cert.validity().not_after.timestamp()),
        })
    }

    /// Parse either a PEM (`CERTIFICATE` block) or a raw DER certificate.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CertificateError> {
        if !bytes.trim_ascii_start().starts_with(PEM_PREFIX) {
            return Self::from_der(bytes);
        }

        let (_rem, pem) =
            parse_x509_pem(bytes).map_err(|e| CertificateError::Pem(e.to_string()))?;

        if pem.label != PEM_CERTIFICATE_LABEL {
            return Err(CertificateError::Pem(format!(
                "expected a {PEM_CERTIFICATE_LABEL} block, found {}",
                pem.label
            )));
        }

        Self::from_der(&pem.contents)
    }

    /// Read and parse a certificate file.
    pub fn from_file(path: &Path) -> Result<Self, CertificateError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    #[must_use]
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Serial number as colon separated hex.
    #[must_use]
    pub fn serial(&self) -> &str {
        &self.serial
    }

    #[must_use]
    pub fn not_before(&self) -> DateTime<Utc> {
        self.not_before
    }

    #[must_use]
    pub fn not_after(&self) -> DateTime<Utc> {
        self.not_after
    }

    /// Whether `now` lies inside the validity window. Informational only.
    #[must_use]
    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        self.not_before <= now && now <= self.not_after
    }

    /// Lowercase hex SHA-256 of the DER encoding.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        hex::encode(Sha256::digest(&self.der))
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("subject", &self.subject)
            .field("issuer", &self.issuer)
            .field("serial", &self.serial)
            .field("not_after", &self.not_after)
            .finish()
    }
}

fn to_utc(timestamp: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(timestamp, 0).unwrap_or(DateTime::UNIX_EPOCH)
}
