#[cfg(feature = "batch-ops")]
use rayon::prelude::*;

#[cfg(feature = "batch-ops")]
use crate::aliases::RecoveredKey;
#[cfg(feature = "batch-ops")]
use crate::{ArchiveError, EncryptedRecord, HybridDecryptor};

/// Recover the symmetric keys of a batch on the rayon pool.
///
/// RSA unwrapping dominates batch decryption and touches no session state, so it runs in
/// parallel. Results keep record order. The first key-loading error aborts the batch.
#[cfg(feature = "batch-ops")]
pub fn recover_keys_parallel(
    decryptor: &HybridDecryptor,
    records: &[EncryptedRecord],
) -> Result<Vec<Option<RecoveredKey>>, ArchiveError> {
    records
        .par_iter()
        .map(|record| decryptor.recover_key(record))
        .collect()
}
