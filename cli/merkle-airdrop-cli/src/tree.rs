//! Binary Keccak256 Merkle tree over recipient leaves.
//!
//! Every level is retained, level 0 being the leaves. A level with an odd
//! number of nodes pairs its last node with itself, and that orphan
//! contributes no entry to proofs passing through it.

use std::io::Write;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::common::{hex_encode, keccak256_hash};
use crate::error::{MerkleError, Result};
use crate::recipients::Recipient;

/// A 32-byte tree node: leaf, interior digest or root.
pub type Node = [u8; 32];

/// Levels at least this wide are hashed on the rayon pool.
pub const PARALLEL_THRESHOLD: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    levels: Vec<Vec<Node>>,
}

impl MerkleTree {
    /// Builds the tree for a finalized recipient list.
    ///
    /// Each recipient's leaf is placed at slot `recipient.index`, so the
    /// indices must be exactly `0..recipients.len()` with no repeats.
    pub fn from_recipients(recipients: &[Recipient]) -> Result<Self> {
        let leaves = order_leaves(recipients)?;
        Self::from_leaves(leaves)
    }

    /// Builds the tree from precomputed leaves, in leaf-index order.
    pub fn from_leaves(leaves: Vec<Node>) -> Result<Self> {
        if leaves.is_empty() {
            return Err(MerkleError::EmptyRecipientSet);
        }

        let mut levels = vec![leaves];
        while let Some(current) = levels.last().filter(|level| level.len() > 1) {
            let next = next_level(current);
            tracing::debug!(
                level = levels.len(),
                width = next.len(),
                "built tree level"
            );
            levels.push(next);
        }

        Ok(Self { levels })
    }

    pub fn root(&self) -> Node {
        // `from_leaves` guarantees a final level of width one.
        self.levels.last().and_then(|top| top.first()).copied().unwrap_or_default()
    }

    /// Root rendered as `0x`-prefixed lowercase hex.
    pub fn root_hex(&self) -> String {
        hex_encode(self.root())
    }

    pub fn leaf_count(&self) -> usize {
        self.levels.first().map_or(0, Vec::len)
    }

    pub fn leaf(&self, index: usize) -> Option<&Node> {
        self.levels.first().and_then(|leaves| leaves.get(index))
    }

    pub fn levels(&self) -> &[Vec<Node>] {
        &self.levels
    }

    /// Number of levels including leaves and root: `ceil(log2(n)) + 1`.
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Number of levels above the leaves. Upper bound on proof length.
    pub fn depth(&self) -> usize {
        self.levels.len().saturating_sub(1)
    }

    /// Collects the sibling digests on the path from a leaf to the root,
    /// bottom level first.
    ///
    /// # Errors
    /// Returns [`MerkleError::IndexOutOfRange`] if `leaf_index >= leaf_count`
    pub fn proof(&self, leaf_index: usize) -> Result<Vec<Node>> {
        let leaf_count = self.leaf_count();
        if leaf_index >= leaf_count {
            return Err(MerkleError::IndexOutOfRange {
                index: leaf_index,
                leaf_count,
            });
        }

        let mut proof = Vec::with_capacity(self.depth());
        let mut current_index = leaf_index;

        for level in self.levels.iter().take(self.depth()) {
            let sibling_index = if current_index % 2 == 0 {
                current_index + 1
            } else {
                current_index - 1
            };

            // An orphan has no sibling at this level.
            if let Some(sibling) = level.get(sibling_index) {
                proof.push(*sibling);
            }

            current_index /= 2;
        }

        Ok(proof)
    }

    /// Verifies a proof against this tree's root and leaf count.
    pub fn verify(&self, leaf: &Node, leaf_index: usize, proof: &[Node]) -> bool {
        verify_proof(&self.root(), leaf, leaf_index, self.leaf_count(), proof)
    }

    /// Dumps every node as a `level:index:0xhash` line.
    pub fn write_levels<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for (level_num, level) in self.levels.iter().enumerate() {
            for (i, hash) in level.iter().enumerate() {
                writeln!(writer, "{}:{}:{}", level_num, i, hex_encode(hash))?;
            }
        }
        Ok(())
    }
}

/// Recomputes the root from `leaf` and `proof` and compares it with `root`.
///
/// `leaf_count` is needed to replay the odd-tail rule: when the path passes
/// through an orphan node the verifier hashes the node with itself instead
/// of consuming a proof entry. The proof must be consumed exactly.
pub fn verify_proof(
    root: &Node,
    leaf: &Node,
    leaf_index: usize,
    leaf_count: usize,
    proof: &[Node],
) -> bool {
    if leaf_index >= leaf_count {
        return false;
    }

    let mut siblings = proof.iter();
    let mut current = *leaf;
    let mut index = leaf_index;
    let mut width = leaf_count;

    while width > 1 {
        let is_left = index % 2 == 0;
        current = if is_left && index + 1 == width {
            keccak256_hash(current, current)
        } else {
            let Some(sibling) = siblings.next() else {
                return false;
            };
            if is_left {
                keccak256_hash(current, *sibling)
            } else {
                keccak256_hash(*sibling, current)
            }
        };
        index /= 2;
        width = width.div_ceil(2);
    }

    siblings.next().is_none() && current == *root
}

/// Number of proof entries a leaf's path yields in a tree of `leaf_count` leaves.
pub fn expected_proof_len(leaf_index: usize, leaf_count: usize) -> Result<usize> {
    if leaf_index >= leaf_count {
        return Err(MerkleError::IndexOutOfRange {
            index: leaf_index,
            leaf_count,
        });
    }

    let mut len = 0;
    let mut index = leaf_index;
    let mut width = leaf_count;
    while width > 1 {
        if !(index % 2 == 0 && index + 1 == width) {
            len += 1;
        }
        index /= 2;
        width = width.div_ceil(2);
    }
    Ok(len)
}

/// Hashes one level into its parent level, pairing an odd tail with itself.
pub fn next_level_sequential(level: &[Node]) -> Vec<Node> {
    level.chunks(2).map(hash_chunk).collect()
}

/// Like [`next_level_sequential`], on the rayon pool for wide levels.
#[cfg(feature = "parallel")]
pub fn next_level(level: &[Node]) -> Vec<Node> {
    if level.len() >= PARALLEL_THRESHOLD {
        level.par_chunks(2).map(hash_chunk).collect()
    } else {
        next_level_sequential(level)
    }
}

#[cfg(not(feature = "parallel"))]
pub fn next_level(level: &[Node]) -> Vec<Node> {
    next_level_sequential(level)
}

fn hash_chunk(chunk: &[Node]) -> Node {
    let left = chunk[0];
    let right = if chunk.len() == 2 { chunk[1] } else { left };
    keccak256_hash(left, right)
}

fn order_leaves(recipients: &[Recipient]) -> Result<Vec<Node>> {
    if recipients.is_empty() {
        return Err(MerkleError::EmptyRecipientSet);
    }

    let leaf_count = recipients.len();
    let mut slots: Vec<Option<Node>> = vec![None; leaf_count];

    for recipient in recipients {
        let slot = usize::try_from(recipient.index)
            .ok()
            .filter(|&i| i < leaf_count)
            .ok_or(MerkleError::IndexGap {
                index: recipient.index,
                leaf_count,
            })?;
        if slots[slot].is_some() {
            return Err(MerkleError::DuplicateIndex {
                index: recipient.index,
            });
        }
        slots[slot] = Some(recipient.leaf());
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(i, slot)| {
            slot.ok_or(MerkleError::IndexGap {
                index: i as u64,
                leaf_count,
            })
        })
        .collect()
}
