//! PKCS#12 identity bundles and the identity handle they decode into

use crate::certificate::Certificate;
use crate::error::{ImportError, StoreError};
use p12_keystore::{KeyStore, KeyStoreEntry, PrivateKeyChain};
use std::fmt;
use tracing::debug;

/// A PKCS#12 container together with the passphrase protecting it.
///
/// Only lives for the duration of an import.
pub struct IdentityBundle<'a> {
    bytes: &'a [u8],
    passphrase: &'a str,
}

impl<'a> IdentityBundle<'a> {
    #[must_use]
    pub fn new(bytes: &'a [u8], passphrase: &'a str) -> Self {
        Self { bytes, passphrase }
    }

    /// Decode every certificate and private key pair in the container.
    ///
    /// # Returns
    /// * `Ok(items)` - At least one identity, in container order
    /// * `Err(ImportError::DecodeFailed)` - Wrong passphrase or malformed container
    /// * `Err(ImportError::NoIdentity)` - Container decoded but holds no key pair
    pub fn decode(&self) -> Result<Vec<ImportedItem>, ImportError> {
        let keystore = KeyStore::from_pkcs12(self.bytes, self.passphrase)
            .map_err(|e| ImportError::DecodeFailed(e.to_string()))?;

        let items = identities(&keystore)
            .map_err(ImportError::DecodeFailed)?
            .into_iter()
            .map(|(alias, identity)| ImportedItem {
                alias,
                local_key_id: identity.keychain.local_key_id().to_vec(),
                identity,
            })
            .collect::<Vec<_>>();

        if items.is_empty() {
            return Err(ImportError::NoIdentity);
        }

        debug!(count = items.len(), "decoded PKCS#12 bundle");
        Ok(items)
    }
}

/// One key pair decoded from a bundle.
#[derive(Debug, Clone)]
pub struct ImportedItem {
    alias: String,
    local_key_id: Vec<u8>,
    identity: Identity,
}

impl ImportedItem {
    /// Friendly name of the entry inside the container.
    #[must_use]
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// `localKeyId` bag attribute linking the key to its certificate.
    #[must_use]
    pub fn local_key_id(&self) -> &[u8] {
        &self.local_key_id
    }

    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    #[must_use]
    pub fn into_identity(self) -> Identity {
        self.identity
    }
}

/// A certificate paired with its private key, ready to hand to a TLS client.
#[derive(Clone)]
pub struct Identity {
    certificate: Certificate,
    chain: Vec<Certificate>,
    keychain: PrivateKeyChain,
}

impl Identity {
    fn from_key_chain(keychain: PrivateKeyChain) -> Result<Self, String> {
        let mut certificates = keychain
            .chain()
            .iter()
            .map(|cert| Certificate::from_der(cert.as_der()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| e.to_string())?
            .into_iter();

        let certificate = certificates
            .next()
            .ok_or_else(|| "private key has no certificate".to_string())?;

        Ok(Self {
            certificate,
            chain: certificates.collect(),
            keychain,
        })
    }

    /// The end-entity certificate.
    #[must_use]
    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    /// Intermediate certificates following the leaf, if the bundle carried any.
    #[must_use]
    pub fn chain(&self) -> &[Certificate] {
        &self.chain
    }

    /// PKCS#8 DER encoding of the private key.
    #[must_use]
    pub fn private_key_der(&self) -> &[u8] {
        self.keychain.key()
    }

    #[must_use]
    pub fn fingerprint(&self) -> String {
        self.certificate.fingerprint()
    }

    /// Re-encode as a single-entry PKCS#12 container.
    pub(crate) fn to_pkcs12(&self, alias: &str, passphrase: &str) -> Result<Vec<u8>, StoreError> {
        let mut keystore = KeyStore::new();
        keystore.add_entry(alias, KeyStoreEntry::PrivateKeyChain(self.keychain.clone()));

        keystore
            .writer(passphrase)
            .write()
            .map_err(|e| StoreError::Encode(e.to_string()))
    }

    /// Read back a container written by [`Identity::to_pkcs12`].
    pub(crate) fn from_pkcs12(bytes: &[u8], passphrase: &str) -> Result<Option<Self>, String> {
        let keystore = KeyStore::from_pkcs12(bytes, passphrase).map_err(|e| e.to_string())?;
        Ok(identities(&keystore)?
            .into_iter()
            .next()
            .map(|(_, identity)| identity))
    }
}

impl PartialEq for Identity {
    fn eq(&self, other: &Self) -> bool {
        self.certificate == other.certificate && self.private_key_der() == other.private_key_der()
    }
}

impl Eq for Identity {}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("subject", &self.certificate.subject())
            .field("fingerprint", &self.fingerprint())
            .field("chain_len", &self.chain.len())
            .field("private_key", &"<redacted>")
            .finish()
    }
}

fn identities(keystore: &KeyStore) -> Result<Vec<(String, Identity)>, String> {
    let mut found = Vec::new();

    for (alias, entry) in keystore.entries() {
        match entry {
            KeyStoreEntry::PrivateKeyChain(keychain) => {
                let identity = Identity::from_key_chain(keychain.clone())?;
                found.push((alias.to_string(), identity));
            }
            _ => debug!(%alias, "skipping PKCS#12 entry without a private key"),
        }
    }

    Ok(found)
}
