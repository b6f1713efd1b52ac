use anyhow::Context;
use sha3::{Digest, Keccak256};
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::MerkleError;
use crate::leaf::ADDRESS_LEN;

/// Computes a plain Keccak256 hash (the pre-standard variant, not SHA3-256).
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// Computes a Keccak256 hash of two 32-byte values concatenated.
///
/// # Arguments
/// * `left` - Digest placed first in the hash input
/// * `right` - Digest placed second in the hash input
///
/// # Returns
/// 32-byte hash result
pub fn keccak256_hash(left: [u8; 32], right: [u8; 32]) -> [u8; 32] {
    let hash = Keccak256::new()
        .chain_update(left)
        .chain_update(right)
        .finalize();
    hash.into()
}

/// Hex-encodes bytes with a `0x` prefix.
pub fn hex_encode(bytes: impl AsRef<[u8]>) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Decodes a 32-byte digest from hex, with or without the `0x` prefix.
///
/// # Errors
/// Returns an error if the value is not 64 hex characters or contains invalid hex
pub fn decode_hash32(value: &str) -> anyhow::Result<[u8; 32]> {
    let trimmed = value.trim();
    let cleaned = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    if cleaned.len() != 64 {
        anyhow::bail!(
            "Invalid digest length: expected 64 hex chars, got {}",
            cleaned.len()
        );
    }
    let mut digest = [0u8; 32];
    hex::decode_to_slice(cleaned, &mut digest)
        .map_err(|e| anyhow::anyhow!("Invalid hex encoding: {}", e))?;
    Ok(digest)
}

/// Parses a Merkle root supplied by an operator.
///
/// The all-zero root is the placeholder written into freshly generated
/// recipient files and is never a valid commitment.
pub fn validate_merkle_root(root: &str) -> anyhow::Result<[u8; 32]> {
    let parsed = decode_hash32(root)?;
    if parsed == [0u8; 32] {
        anyhow::bail!("Merkle root is the all-zero placeholder; run build-tree first");
    }
    Ok(parsed)
}

/// Parses a recipient public key.
///
/// Accepts a base58 Solana public key or a `0x`-prefixed 64-char hex string.
///
/// # Errors
/// Returns [`MerkleError::InvalidAddressLength`] if the decoded key is not
/// 32 bytes, or a decoding error for malformed input
pub fn parse_address(addr_str: &str) -> anyhow::Result<[u8; 32]> {
    let trimmed = addr_str.trim();
    if trimmed.is_empty() {
        anyhow::bail!("Address is empty");
    }

    let bytes = match trimmed.strip_prefix("0x") {
        Some(hex_str) => {
            hex::decode(hex_str).map_err(|e| anyhow::anyhow!("Invalid hex encoding: {}", e))?
        }
        None => bs58::decode(trimmed)
            .into_vec()
            .map_err(|e| anyhow::anyhow!("Invalid base58 encoding: {}", e))?,
    };

    let address: [u8; ADDRESS_LEN] = bytes.as_slice().try_into().map_err(|_| {
        MerkleError::InvalidAddressLength {
            expected: ADDRESS_LEN,
            actual: bytes.len(),
        }
    })?;

    if address == [0u8; ADDRESS_LEN] {
        tracing::warn!(address = trimmed, "recipient is the all-zero public key");
    }
    Ok(address)
}

/// Renders a public key as base58.
pub fn format_address(address: &[u8; 32]) -> String {
    bs58::encode(address).into_string()
}

/// Writes `contents` to a temporary sibling file and renames it over `path`.
pub fn write_file_atomic(path: &Path, contents: &str) -> anyhow::Result<()> {
    let temp_path = path.with_extension("tmp");
    let mut file = File::create(&temp_path).context("Failed to create temp file")?;
    file.write_all(contents.as_bytes())
        .context("Failed to write to temp file")?;
    file.flush().context("Failed to flush temp file")?;
    std::fs::rename(&temp_path, path).context("Failed to move temp file to output")?;
    Ok(())
}
