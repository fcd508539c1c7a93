use pairing_identity::{
    DEFAULT_LABEL, DeleteOutcome, ExtractError, FileStore, IdentityStore, ImportError,
    KeyAlgorithm, MemoryStore, SecureStore, TrustStatus,
};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn file_store(dir: &TempDir) -> FileStore {
    FileStore::open(dir.path(), "store-pass").unwrap()
}

#[test]
fn client_bundle_round_trip_through_file_store() {
    let dir = TempDir::new().unwrap();
    let identities = IdentityStore::new(file_store(&dir));

    let items = identities
        .import_file(&fixture("client.p12"), "secret")
        .unwrap();
    assert_eq!(items.len(), 1);

    let stored = identities.lookup().unwrap();
    assert!(stored.certificate().subject().contains("pairing-client"));
    assert_eq!(&stored, items[0].identity());

    identities.delete();
    assert!(identities.lookup().is_none());
}

#[test]
fn wrong_passphrase_is_a_decode_error_and_stores_nothing() {
    let dir = TempDir::new().unwrap();
    let identities = IdentityStore::new(file_store(&dir));

    let err = identities
        .import_file(&fixture("client.p12"), "wrong")
        .unwrap_err();
    assert!(matches!(err, ImportError::DecodeFailed(_)));
    assert!(identities.lookup().is_none());
}

#[test]
fn missing_bundle_is_a_read_error() {
    let identities = IdentityStore::new(MemoryStore::new());

    let err = identities
        .import_file(&fixture("missing.p12"), "secret")
        .unwrap_err();
    assert!(matches!(err, ImportError::ReadFailed(_)));
}

#[test]
fn stored_identity_outlives_the_component() {
    let dir = TempDir::new().unwrap();

    IdentityStore::new(file_store(&dir))
        .import_file(&fixture("client.p12"), "secret")
        .unwrap();

    let reopened = IdentityStore::new(file_store(&dir));
    let stored = reopened.lookup().unwrap();
    assert!(stored.certificate().subject().contains("pairing-client"));
    assert_eq!(reopened.label(), DEFAULT_LABEL);
}

#[test]
fn reimport_keeps_first_identity_in_file_store() {
    let dir = TempDir::new().unwrap();
    let identities = IdentityStore::new(file_store(&dir));

    let first = identities
        .import_file(&fixture("client.p12"), "secret")
        .unwrap();
    identities
        .import_file(&fixture("client.p12"), "secret")
        .unwrap();
    let second = identities
        .import_file(&fixture("other-client.p12"), "hunter2")
        .unwrap();

    let stored = identities.lookup().unwrap();
    assert_eq!(&stored, first[0].identity());
    assert_ne!(&stored, second[0].identity());

    let entries = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "p12"))
        .count();
    assert_eq!(entries, 1);
}

#[test]
fn long_label_round_trip_through_file_store() {
    let dir = TempDir::new().unwrap();
    let identities = IdentityStore::with_label(file_store(&dir), "x".repeat(240));

    identities
        .import_file(&fixture("client.p12"), "secret")
        .unwrap();
    assert!(identities.try_lookup().unwrap().is_some());
    assert_eq!(identities.try_delete().unwrap(), DeleteOutcome::Deleted);
}

#[test]
fn delete_then_reimport_replaces_identity() {
    let store = MemoryStore::new();
    let identities = IdentityStore::new(&store);

    identities
        .import_file(&fixture("client.p12"), "secret")
        .unwrap();
    assert_eq!(identities.try_delete().unwrap(), DeleteOutcome::Deleted);

    let other = identities
        .import_file(&fixture("other-client.p12"), "hunter2")
        .unwrap();
    assert_eq!(identities.lookup().as_ref(), Some(other[0].identity()));
    assert_eq!(store.query(DEFAULT_LABEL).unwrap().as_ref(), Some(other[0].identity()));
}

#[test]
fn delete_on_empty_store_is_quiet() {
    let dir = TempDir::new().unwrap();
    let identities = IdentityStore::new(file_store(&dir));

    identities.delete();
    identities.delete();
    assert!(identities.lookup().is_none());
    assert_eq!(identities.try_delete().unwrap(), DeleteOutcome::NotFound);
}

#[test]
fn lookup_swallows_store_errors_that_try_lookup_reports() {
    let dir = TempDir::new().unwrap();
    IdentityStore::new(file_store(&dir))
        .import_file(&fixture("client.p12"), "secret")
        .unwrap();

    let wrong_key = IdentityStore::new(FileStore::open(dir.path(), "other-pass").unwrap());
    assert!(wrong_key.lookup().is_none());
    assert!(wrong_key.try_lookup().is_err());
}

#[test]
fn peer_rsa_certificate_public_key() {
    let identities = IdentityStore::new(MemoryStore::new());

    for name in ["peer.pem", "peer.der"] {
        let key = identities.extract_public_key(&fixture(name)).unwrap();
        assert_eq!(key.algorithm(), &KeyAlgorithm::Rsa);
        assert_eq!(key.bits(), 2048);
    }
}

#[test]
fn peer_ec_certificate_public_key() {
    let identities = IdentityStore::new(MemoryStore::new());

    let key = identities
        .extract_public_key(&fixture("peer-ec.pem"))
        .unwrap();
    assert!(matches!(key.algorithm(), KeyAlgorithm::Ec(_)));
    assert_eq!(key.bits(), 256);
}

#[test]
fn non_certificate_input_fails_to_load() {
    let identities = IdentityStore::new(MemoryStore::new());

    for name in ["not-a-cert.bin", "client.p12", "missing.pem"] {
        let err = identities.extract_public_key(&fixture(name)).unwrap_err();
        assert!(
            matches!(err, ExtractError::LoadFailed(_)),
            "{name}: unexpected {err:?}"
        );
    }
}

#[test]
fn certificate_without_key_bits_fails_trust_creation() {
    let identities = IdentityStore::new(MemoryStore::new());

    let err = identities
        .extract_public_key(&fixture("empty-key.der"))
        .unwrap_err();
    assert!(matches!(
        err,
        ExtractError::TrustCreationFailed(TrustStatus::EmptyPublicKey)
    ));
}

#[test]
fn stored_identity_key_matches_its_certificate() {
    let identities = IdentityStore::new(MemoryStore::new());
    identities
        .import_file(&fixture("client.p12"), "secret")
        .unwrap();

    let stored = identities.lookup().unwrap();
    let key = identities
        .extract_public_key_from_bytes(stored.certificate().as_der())
        .unwrap();
    assert_eq!(key.algorithm(), &KeyAlgorithm::Rsa);
    assert_eq!(key.bits(), 2048);
}
