//! tests/batch_ops_tests.rs
//! Parallel key recovery (feature `batch-ops`)

#[cfg(feature = "batch-ops")]
mod common;

#[cfg(feature = "batch-ops")]
use common::{primary_material, sealed, sealed_for, secondary_key};
#[cfg(feature = "batch-ops")]
use msgaudit_rs::{recover_keys_parallel, ArchiveError, HybridDecryptor, KeyMaterial};

#[cfg(feature = "batch-ops")]
#[test]
fn parallel_recovery_keeps_record_order() {
    let decryptor = HybridDecryptor::with_key(primary_material());
    let records: Vec<_> = (1..=16)
        .map(|seq| {
            if seq % 5 == 0 {
                sealed_for(secondary_key(), seq)
            } else {
                sealed(seq)
            }
        })
        .collect();

    let keys = recover_keys_parallel(&decryptor, &records).unwrap();
    assert_eq!(keys.len(), records.len());
    for (record, key) in records.iter().zip(&keys) {
        assert_eq!(key.is_some(), record.seq % 5 != 0, "seq {}", record.seq);
    }
}

#[cfg(feature = "batch-ops")]
#[test]
fn parallel_and_sequential_agree() {
    let decryptor = HybridDecryptor::with_key(primary_material());
    let records: Vec<_> = (1..=8).map(sealed).collect();

    let parallel = recover_keys_parallel(&decryptor, &records).unwrap();
    let sequential: Vec<_> = records
        .iter()
        .map(|record| decryptor.recover_key(record).unwrap())
        .collect();

    let expose = |keys: &[Option<msgaudit_rs::aliases::RecoveredKey>]| {
        keys.iter()
            .map(|key| key.as_ref().map(|k| k.expose_secret().clone()))
            .collect::<Vec<_>>()
    };
    assert_eq!(expose(&parallel), expose(&sequential));
}

#[cfg(feature = "batch-ops")]
#[test]
fn empty_batch() {
    let decryptor = HybridDecryptor::with_key(primary_material());
    assert!(recover_keys_parallel(&decryptor, &[]).unwrap().is_empty());
}

#[cfg(feature = "batch-ops")]
#[test]
fn bad_private_key_fails_the_batch() {
    let decryptor = HybridDecryptor::with_key(KeyMaterial::pem("garbage"));
    let records: Vec<_> = (1..=4).map(sealed).collect();
    assert!(matches!(
        recover_keys_parallel(&decryptor, &records),
        Err(ArchiveError::PrivateKey(_))
    ));
}
