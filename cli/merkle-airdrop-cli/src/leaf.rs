//! Leaf encoding shared with the on-chain claim verifier.
//!
//! A leaf is `keccak256(recipient_pubkey(32) || amount_le(8) || is_claimed(1))`.
//! The claimed byte is always [`UNCLAIMED`] here; claim state lives in the
//! verifier's own accounts. Changing anything in this module invalidates
//! every root that has already been published.

use crate::common::keccak256;
use crate::error::{MerkleError, Result};

/// Width of a recipient public key.
pub const ADDRESS_LEN: usize = 32;

/// Width of the little-endian amount field.
pub const AMOUNT_LEN: usize = 8;

/// Total width of the encoded leaf preimage.
pub const LEAF_ENCODED_LEN: usize = ADDRESS_LEN + AMOUNT_LEN + 1;

/// Value of the claimed byte at tree-construction time.
pub const UNCLAIMED: u8 = 0x00;

pub const HASH_ALGORITHM: &str = "keccak256";
pub const LEAF_FORMAT: &str = "recipient_pubkey(32) + amount(8) + is_claimed(1)";
pub const LEAF_FORMAT_VERSION: &str = "1.0.0";

/// Serializes a recipient into the fixed 41-byte leaf preimage.
pub fn encode_leaf(address: &[u8; ADDRESS_LEN], amount: u64) -> [u8; LEAF_ENCODED_LEN] {
    let mut buf = [0u8; LEAF_ENCODED_LEN];
    buf[..ADDRESS_LEN].copy_from_slice(address);
    buf[ADDRESS_LEN..ADDRESS_LEN + AMOUNT_LEN].copy_from_slice(&amount.to_le_bytes());
    buf[LEAF_ENCODED_LEN - 1] = UNCLAIMED;
    buf
}

/// Hashes a recipient into its 32-byte leaf.
pub fn hash_leaf(address: &[u8; ADDRESS_LEN], amount: u64) -> [u8; 32] {
    keccak256(&encode_leaf(address, amount))
}

/// Like [`hash_leaf`], for callers holding an unsized address buffer.
pub fn leaf_from_slice(address: &[u8], amount: u64) -> Result<[u8; 32]> {
    let address: &[u8; ADDRESS_LEN] =
        address.try_into().map_err(|_| MerkleError::InvalidAddressLength {
            expected: ADDRESS_LEN,
            actual: address.len(),
        })?;
    Ok(hash_leaf(address, amount))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::hex_encode;

    #[test]
    fn test_encode_leaf_layout() {
        let address = [0xAA; 32];
        let encoded = encode_leaf(&address, 0x0102_0304_0506_0708);
        assert_eq!(encoded.len(), 41);
        assert_eq!(encoded[..32], address);
        assert_eq!(
            encoded[32..40],
            [0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01]
        );
        assert_eq!(encoded[40], 0x00);
    }

    #[test]
    fn test_hash_leaf_is_keccak_of_preimage() {
        let address = [0xBB; 32];
        let mut preimage = address.to_vec();
        preimage.extend_from_slice(&2000u64.to_le_bytes());
        preimage.push(0);
        assert_eq!(hash_leaf(&address, 2000), keccak256(&preimage));
    }

    #[test]
    fn test_hash_leaf_deterministic() {
        let a = hash_leaf(&[3u8; 32], 42);
        let b = hash_leaf(&[3u8; 32], 42);
        assert_eq!(hex_encode(a), hex_encode(b));
        assert_ne!(a, hash_leaf(&[3u8; 32], 43));
        assert_ne!(a, hash_leaf(&[4u8; 32], 42));
    }

    #[test]
    fn test_hash_leaf_max_amount() {
        let encoded = encode_leaf(&[0u8; 32], u64::MAX);
        assert_eq!(encoded[32..40], [0xFF; 8]);
    }

    #[test]
    fn test_leaf_from_slice() {
        assert_eq!(
            leaf_from_slice(&[9u8; 32], 5).unwrap(),
            hash_leaf(&[9u8; 32], 5)
        );
        assert_eq!(
            leaf_from_slice(&[9u8; 20], 5),
            Err(MerkleError::InvalidAddressLength {
                expected: 32,
                actual: 20
            })
        );
    }
}
