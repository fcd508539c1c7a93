//! Client identity provisioning over a labeled secure store

use crate::bundle::{Identity, IdentityBundle, ImportedItem};
use crate::certificate::Certificate;
use crate::config::DEFAULT_LABEL;
use crate::error::{ExtractError, ImportError, StoreError};
use crate::store::{DeleteOutcome, SecureStore};
use crate::trust::{Capabilities, PublicKey, TrustContext, TrustPolicy};
use std::path::Path;
use tracing::{debug, info, warn};

/// Provisions the client TLS identity used for remote pairing.
///
/// The store is injected; this type keeps no state of its own between calls beyond the
/// store handle, the label and the capability set. It does no locking, so a
/// `lookup` followed by `import` from several callers needs external synchronization.
#[derive(Debug)]
pub struct IdentityStore<S> {
    store: S,
    label: String,
    capabilities: Capabilities,
}

impl<S: SecureStore> IdentityStore<S> {
    /// Use `store` with the default label.
    pub fn new(store: S) -> Self {
        Self::with_label(store, DEFAULT_LABEL)
    }

    pub fn with_label(store: S, label: impl Into<String>) -> Self {
        Self {
            store,
            label: label.into(),
            capabilities: Capabilities::detect(),
        }
    }

    /// Override the detected capability set.
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Read a PKCS#12 file and import it.
    pub fn import_file(
        &self,
        path: &Path,
        passphrase: &str,
    ) -> Result<Vec<ImportedItem>, ImportError> {
        let bytes = std::fs::read(path)?;
        self.import(&bytes, passphrase)
    }

    /// Decode a PKCS#12 bundle and store its first identity under the label.
    ///
    /// If an identity is already stored under the label nothing is written, even when the
    /// bundle holds a different identity. The first provisioned identity stays in place
    /// until [`IdentityStore::delete`] removes it.
    ///
    /// # Returns
    /// * `Ok(items)` - Every identity decoded from the bundle
    /// * `Err(ImportError::DecodeFailed)` - Wrong passphrase or malformed bundle
    /// * `Err(ImportError::NoIdentity)` - Bundle holds no certificate and key pair
    /// * `Err(ImportError::StoreWriteFailed)` - The store rejected the add
    pub fn import(
        &self,
        bundle_bytes: &[u8],
        passphrase: &str,
    ) -> Result<Vec<ImportedItem>, ImportError> {
        let items = IdentityBundle::new(bundle_bytes, passphrase).decode()?;

        if self.lookup().is_some() {
            debug!(label = %self.label, "identity already stored, skipping write");
            return Ok(items);
        }

        let Some(first) = items.first() else {
            return Err(ImportError::NoIdentity);
        };

        self.store
            .add(&self.label, first.identity())
            .map_err(ImportError::StoreWriteFailed)?;

        info!(
            label = %self.label,
            fingerprint = %first.identity().fingerprint(),
            "stored client identity"
        );
        Ok(items)
    }

    /// The stored identity, or `None` if it is absent or the store could not be read.
    pub fn lookup(&self) -> Option<Identity> {
        match self.try_lookup() {
            Ok(identity) => identity,
            Err(e) => {
                warn!(label = %self.label, error = %e, "identity lookup failed");
                None
            }
        }
    }

    /// Like [`IdentityStore::lookup`] but keeps store failures apart from absence.
    pub fn try_lookup(&self) -> Result<Option<Identity>, StoreError> {
        self.store.query(&self.label)
    }

    /// Best-effort removal of the stored identity. Never fails.
    pub fn delete(&self) {
        if let Err(e) = self.try_delete() {
            warn!(label = %self.label, error = %e, "identity delete failed");
        }
    }

    /// Remove the stored identity, reporting whether anything was there.
    pub fn try_delete(&self) -> Result<DeleteOutcome, StoreError> {
        let outcome = self.store.delete(&self.label)?;
        debug!(label = %self.label, ?outcome, "identity delete");
        Ok(outcome)
    }

    /// Copy the public key out of the certificate stored at `certificate_path`.
    ///
    /// Only a basic X.509 trust object is built; chain, revocation and expiry are not
    /// checked, so the key returned says nothing about whether the peer is trustworthy.
    pub fn extract_public_key(&self, certificate_path: &Path) -> Result<PublicKey, ExtractError> {
        let certificate =
            Certificate::from_file(certificate_path).map_err(ExtractError::LoadFailed)?;
        self.public_key_of(certificate)
    }

    /// [`IdentityStore::extract_public_key`] for an in-memory DER or PEM certificate.
    pub fn extract_public_key_from_bytes(&self, bytes: &[u8]) -> Result<PublicKey, ExtractError> {
        let certificate = Certificate::from_bytes(bytes).map_err(ExtractError::LoadFailed)?;
        self.public_key_of(certificate)
    }

    fn public_key_of(&self, certificate: Certificate) -> Result<PublicKey, ExtractError> {
        let trust = TrustContext::create(&[certificate], TrustPolicy::BasicX509)
            .map_err(ExtractError::TrustCreationFailed)?
            .ok_or(ExtractError::TrustObjectMissing)?;

        if !self.capabilities.supports_key_extraction() {
            return Err(ExtractError::UnsupportedPlatform);
        }

        trust.copy_public_key().ok_or_else(|| {
            ExtractError::KeyExtractionFailed(format!(
                "unsupported key algorithm in certificate '{}'",
                trust.leaf().subject()
            ))
        })
    }
}
