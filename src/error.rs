//! Error types for identity provisioning, storage and key extraction.

use crate::trust::TrustStatus;
use thiserror::Error;

/// Failures surfaced by `IdentityStore::import`.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Failed to read identity bundle: {0}")]
    ReadFailed(#[from] std::io::Error),

    #[error("Failed to decode PKCS#12 bundle (wrong passphrase or malformed container): {0}")]
    DecodeFailed(String),

    #[error("PKCS#12 bundle contains no certificate and private key pair")]
    NoIdentity,

    #[error("Secure store rejected the identity: {0}")]
    StoreWriteFailed(#[source] StoreError),
}

/// Failures surfaced by `IdentityStore::extract_public_key`.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Failed to load certificate: {0}")]
    LoadFailed(#[source] CertificateError),

    #[error("Failed to create trust object (status {})", .0.code())]
    TrustCreationFailed(TrustStatus),

    #[error("Trust object was not created")]
    TrustObjectMissing,

    #[error("Public key extraction is not supported on this platform")]
    UnsupportedPlatform,

    #[error("Failed to copy public key from trust object: {0}")]
    KeyExtractionFailed(String),
}

/// Failures turning bytes into a `Certificate`.
#[derive(Debug, Error)]
pub enum CertificateError {
    #[error("Could not read certificate file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid PEM certificate: {0}")]
    Pem(String),

    #[error("Malformed X.509 certificate: {0}")]
    Der(String),
}

/// Failures reported by a `SecureStore` backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("An identity is already stored under label '{0}'")]
    Duplicate(String),

    #[error("Stored identity under label '{label}' is unreadable: {reason}")]
    Corrupt { label: String, reason: String },

    #[error("Failed to encode identity for storage: {0}")]
    Encode(String),

    #[error("Secure store unavailable: {0}")]
    Unavailable(String),

    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures loading or resolving `IdentityConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Missing required configuration: {0}")]
    Missing(String),

    #[error("Config file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config file is not valid TOML: {0}")]
    Toml(#[from] toml::de::Error),
}
