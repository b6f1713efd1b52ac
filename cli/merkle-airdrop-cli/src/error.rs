use thiserror::Error;

/// Errors raised while encoding recipients or building and querying the tree.
///
/// All of these are deterministic. None of them leaves a partially built tree behind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MerkleError {
    #[error("cannot build a Merkle tree from an empty recipient set")]
    EmptyRecipientSet,

    #[error("invalid address length: expected {expected} bytes, got {actual}")]
    InvalidAddressLength { expected: usize, actual: usize },

    #[error("amount for recipient {index} does not fit in u64: {value}")]
    AmountOverflow { index: u64, value: String },

    #[error("leaf index {index} is out of range for tree with {leaf_count} leaves")]
    IndexOutOfRange { index: usize, leaf_count: usize },

    #[error("public key {address} is listed at index {first} and again at index {second}")]
    DuplicateAddress {
        address: String,
        first: u64,
        second: u64,
    },

    #[error("recipient index {index} is assigned more than once")]
    DuplicateIndex { index: u64 },

    #[error("recipient index {index} leaves a gap: indices must cover 0..{leaf_count}")]
    IndexGap { index: u64, leaf_count: usize },

    #[error("declared total amount {declared} does not match computed total {computed}")]
    TotalAmountMismatch { declared: String, computed: u64 },
}

pub type Result<T> = std::result::Result<T, MerkleError>;
