//! Utility functions used across the library.

/// XORs two 16-byte blocks and writes the result to `output`.
///
/// Used by the CBC chaining in [`crypto::cbc`](crate::crypto::cbc).
///
/// # Panics
///
/// Panics if any of the three slices is shorter than 16 bytes.
#[inline(always)]
pub const fn xor_blocks(block_a: &[u8], block_b: &[u8], output: &mut [u8]) {
    let mut i = 0;
    while i < 16 {
        output[i] = block_a[i] ^ block_b[i];
        i += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::xor_blocks;

    #[test]
    fn xor_is_its_own_inverse() {
        let a = [0x5au8; 16];
        let b: [u8; 16] = core::array::from_fn(|i| i as u8);
        let mut mixed = [0u8; 16];
        xor_blocks(&a, &b, &mut mixed);
        let mut back = [0u8; 16];
        xor_blocks(&mixed, &b, &mut back);
        assert_eq!(back, a);
    }
}
