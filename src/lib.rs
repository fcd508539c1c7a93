//! Client identity provisioning for mutually authenticated remote pairing
//!
//! Imports a passphrase protected PKCS#12 bundle into a labeled secure store, hands the
//! stored identity back for TLS client authentication, and copies the public key out of a
//! peer certificate.
//!
//! ```no_run
//! use pairing_identity::{IdentityStore, MemoryStore};
//! use std::path::Path;
//!
//! let identities = IdentityStore::new(MemoryStore::new());
//! identities.import_file(Path::new("client.p12"), "secret")?;
//!
//! let identity = identities.lookup().expect("identity was just imported");
//! let peer_key = identities.extract_public_key(Path::new("peer.pem"))?;
//! # let _ = (identity, peer_key);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod bundle;
pub mod certificate;
pub mod config;
pub mod error;
pub mod identity_store;
pub mod store;
pub mod trust;

// Re-export public API
pub use bundle::{Identity, IdentityBundle, ImportedItem};
pub use certificate::Certificate;
pub use config::{DEFAULT_LABEL, IdentityConfig, StoreConfig};
pub use error::{CertificateError, ConfigError, ExtractError, ImportError, StoreError};
pub use identity_store::IdentityStore;
pub use store::{DeleteOutcome, FileStore, MemoryStore, SecureStore};
pub use trust::{Capabilities, EcCurve, KeyAlgorithm, PublicKey, TrustPolicy, TrustStatus};
