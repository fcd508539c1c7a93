//! Trust objects and public key extraction
//!
//! A [`TrustContext`] binds a leaf certificate to a [`TrustPolicy`]. It exists only so the
//! subject public key can be copied out; no chain building, revocation or expiry evaluation
//! happens here.

use crate::certificate::Certificate;
use std::fmt;
use x509_parser::prelude::*;
use x509_parser::public_key::PublicKey as ParsedPublicKey;

const OID_RSA_ENCRYPTION: &str = "1.2.840.113549.1.1.1";
const OID_EC_PUBLIC_KEY: &str = "1.2.840.10045.2.1";
const OID_DSA: &str = "1.2.840.10040.4.1";
const OID_ED25519: &str = "1.3.101.112";
const OID_ED448: &str = "1.3.101.113";

const OID_CURVE_P256: &str = "1.2.840.10045.3.1.7";
const OID_CURVE_P384: &str = "1.3.132.0.34";
const OID_CURVE_P521: &str = "1.3.132.0.35";
const OID_CURVE_SECP256K1: &str = "1.3.132.0.10";

/// Validation policy a trust object is created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrustPolicy {
    /// Plain X.509 structure checks, no anchors and no chain.
    #[default]
    BasicX509,
}

/// Why a trust object could not be created. The numeric code is stable for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustStatus {
    /// The SubjectPublicKeyInfo bit string carries no key bits.
    EmptyPublicKey,
    /// The certificate could not be re-read while binding the policy.
    MalformedPublicKeyInfo,
}

impl TrustStatus {
    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            Self::EmptyPublicKey => -1001,
            Self::MalformedPublicKeyInfo => -1002,
        }
    }
}

impl fmt::Display for TrustStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPublicKey => write!(f, "empty public key ({})", self.code()),
            Self::MalformedPublicKeyInfo => {
                write!(f, "malformed public key info ({})", self.code())
            }
        }
    }
}

/// Runtime capability set, checked when an operation is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    key_extraction: bool,
}

impl Capabilities {
    /// Capabilities of the running build. The pure Rust backend supports key extraction
    /// everywhere.
    #[must_use]
    pub fn detect() -> Self {
        Self {
            key_extraction: true,
        }
    }

    /// A capability set with public key extraction switched off.
    #[must_use]
    pub fn without_key_extraction() -> Self {
        Self {
            key_extraction: false,
        }
    }

    #[must_use]
    pub fn supports_key_extraction(&self) -> bool {
        self.key_extraction
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::detect()
    }
}

/// Named elliptic curve of an EC public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EcCurve {
    P256,
    P384,
    P521,
    Secp256k1,
    Other(String),
}

impl EcCurve {
    fn from_oid(oid: &str) -> Self {
        match oid {
            OID_CURVE_P256 => Self::P256,
            OID_CURVE_P384 => Self::P384,
            OID_CURVE_P521 => Self::P521,
            OID_CURVE_SECP256K1 => Self::Secp256k1,
            other => Self::Other(other.to_string()),
        }
    }

    fn bits(&self) -> Option<usize> {
        match self {
            Self::P256 | Self::Secp256k1 => Some(256),
            Self::P384 => Some(384),
            Self::P521 => Some(521),
            Self::Other(_) => None,
        }
    }
}

/// Public key algorithm family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAlgorithm {
    Rsa,
    Ec(EcCurve),
    Ed25519,
    Ed448,
    Dsa,
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rsa => write!(f, "RSA"),
            Self::Ec(EcCurve::Other(oid)) => write!(f, "EC ({oid})"),
            Self::Ec(curve) => write!(f, "EC ({curve:?})"),
            Self::Ed25519 => write!(f, "Ed25519"),
            Self::Ed448 => write!(f, "Ed448"),
            Self::Dsa => write!(f, "DSA"),
        }
    }
}

/// A public key copied out of a trust object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    algorithm: KeyAlgorithm,
    bits: usize,
    spki_der: Vec<u8>,
}

impl PublicKey {
    #[must_use]
    pub fn algorithm(&self) -> &KeyAlgorithm {
        &self.algorithm
    }

    /// Key size in bits (modulus length for RSA, field size for curves).
    #[must_use]
    pub fn bits(&self) -> usize {
        self.bits
    }

    /// DER encoded SubjectPublicKeyInfo.
    #[must_use]
    pub fn spki_der(&self) -> &[u8] {
        &self.spki_der
    }
}

/// Evaluation context binding a leaf certificate to a policy.
#[derive(Debug)]
pub struct TrustContext {
    leaf: Certificate,
    policy: TrustPolicy,
}

impl TrustContext {
    /// Bind `certificates[0]` to `policy`.
    ///
    /// Returns `Ok(None)` when there is no certificate to bind.
    pub fn create(
        certificates: &[Certificate],
        policy: TrustPolicy,
    ) -> Result<Option<Self>, TrustStatus> {
        let Some(leaf) = certificates.first() else {
            return Ok(None);
        };

        let (_, parsed) = X509Certificate::from_der(leaf.as_der())
            .map_err(|_| TrustStatus::MalformedPublicKeyInfo)?;

        match policy {
            TrustPolicy::BasicX509 => {
                if parsed.public_key().subject_public_key.data.is_empty() {
                    return Err(TrustStatus::EmptyPublicKey);
                }
            }
        }

        Ok(Some(Self {
            leaf: leaf.clone(),
            policy,
        }))
    }

    #[must_use]
    pub fn policy(&self) -> TrustPolicy {
        self.policy
    }

    #[must_use]
    pub fn leaf(&self) -> &Certificate {
        &self.leaf
    }

    /// Copy the leaf's public key. `None` when the key algorithm is not understood.
    #[must_use]
    pub fn copy_public_key(&self) -> Option<PublicKey> {
        let (_, parsed) = X509Certificate::from_der(self.leaf.as_der()).ok()?;
        let spki = parsed.public_key();
        let oid = spki.algorithm.algorithm.to_id_string();

        let (algorithm, bits) = match oid.as_str() {
            OID_RSA_ENCRYPTION => match spki.parsed().ok()? {
                ParsedPublicKey::RSA(rsa) => (KeyAlgorithm::Rsa, bit_length(rsa.modulus)),
                _ => return None,
            },
            OID_EC_PUBLIC_KEY => {
                let curve_oid = spki
                    .algorithm
                    .parameters
                    .as_ref()
                    .and_then(|params| params.as_oid().ok())?
                    .to_id_string();
                let curve = EcCurve::from_oid(&curve_oid);
                let bits = curve
                    .bits()
                    .unwrap_or_else(|| point_bits(&spki.subject_public_key.data));
                (KeyAlgorithm::Ec(curve), bits)
            }
            OID_ED25519 => (KeyAlgorithm::Ed25519, 256),
            OID_ED448 => (KeyAlgorithm::Ed448, 448),
            OID_DSA => match spki.parsed().ok()? {
                ParsedPublicKey::DSA(y) => (KeyAlgorithm::Dsa, bit_length(y)),
                _ => return None,
            },
            _ => return None,
        };

        Some(PublicKey {
            algorithm,
            bits,
            spki_der: spki.raw.to_vec(),
        })
    }
}

/// Bit length of a big-endian unsigned integer, ignoring leading zero bytes.
fn bit_length(bytes: &[u8]) -> usize {
    let trimmed = match bytes.iter().position(|b| *b != 0) {
        Some(start) => &bytes[start..],
        None => return 0,
    };
    (trimmed.len() - 1) * 8 + (8 - trimmed[0].leading_zeros() as usize)
}

/// Field size estimate from an uncompressed EC point (`04 || X || Y`).
fn point_bits(point: &[u8]) -> usize {
    point.len().saturating_sub(1) / 2 * 8
}
