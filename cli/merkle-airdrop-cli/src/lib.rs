//! Merkle tree construction and inclusion proofs for on-chain airdrop claims.
//!
//! A distribution is a recipient list committed to a single Keccak256 root.
//! See [`leaf`] for the leaf encoding shared with the claim verifier.

pub mod common;
pub mod error;
pub mod leaf;
pub mod manifest;
pub mod recipients;
pub mod tree;

pub use common::{
    format_address, hex_encode, keccak256, keccak256_hash, parse_address, validate_merkle_root,
    write_file_atomic,
};
pub use error::MerkleError;
pub use leaf::{encode_leaf, hash_leaf};
pub use manifest::{ClaimProof, DistributionManifest, ProofBundle};
pub use recipients::{Recipient, RecipientsFile};
pub use tree::{verify_proof, MerkleTree, Node};
