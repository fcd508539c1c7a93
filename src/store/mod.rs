//! Labeled secure storage for identities
//!
//! The provisioning code only ever talks to a store through label based add, query and
//! delete. Backends:
//! - `memory` - process-local map, also the test double
//! - `file` - one encrypted PKCS#12 file per label under a directory

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::bundle::Identity;
use crate::error::StoreError;

/// Outcome of a delete request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

/// A key-value store of identities addressed by label.
///
/// Implementations serialize their own internal access; callers that need a
/// lookup-then-add sequence to be atomic must synchronize externally.
pub trait SecureStore {
    /// Store `identity` under `label`.
    ///
    /// Fails with `StoreError::Duplicate` when the label is already taken.
    fn add(&self, label: &str, identity: &Identity) -> Result<(), StoreError>;

    /// Fetch the identity stored under `label`, `Ok(None)` if there is none.
    fn query(&self, label: &str) -> Result<Option<Identity>, StoreError>;

    /// Remove the identity stored under `label`.
    fn delete(&self, label: &str) -> Result<DeleteOutcome, StoreError>;
}

impl<S: SecureStore + ?Sized> SecureStore for &S {
    fn add(&self, label: &str, identity: &Identity) -> Result<(), StoreError> {
        (**self).add(label, identity)
    }

    fn query(&self, label: &str) -> Result<Option<Identity>, StoreError> {
        (**self).query(label)
    }

    fn delete(&self, label: &str) -> Result<DeleteOutcome, StoreError> {
        (**self).delete(label)
    }
}

impl<S: SecureStore + ?Sized> SecureStore for Box<S> {
    fn add(&self, label: &str, identity: &Identity) -> Result<(), StoreError> {
        (**self).add(label, identity)
    }

    fn query(&self, label: &str) -> Result<Option<Identity>, StoreError> {
        (**self).query(label)
    }

    fn delete(&self, label: &str) -> Result<DeleteOutcome, StoreError> {
        (**self).delete(label)
    }
}
