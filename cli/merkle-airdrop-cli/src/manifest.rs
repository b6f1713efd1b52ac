use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::common::{decode_hash32, format_address, hex_encode, parse_address, write_file_atomic};
use crate::leaf::{hash_leaf, HASH_ALGORITHM, LEAF_FORMAT, LEAF_FORMAT_VERSION};
use crate::recipients::{Recipient, RecipientsFile};
use crate::tree::{verify_proof, MerkleTree, Node};

/// Everything needed to commit a distribution on-chain and audit it later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionManifest {
    pub airdrop_id: String,
    pub network: String,
    pub program_id: String,
    pub merkle_root: String,
    /// Root as the raw byte array passed to the on-chain initialize call.
    pub merkle_root_bytes: [u8; 32],
    pub recipient_count: usize,
    pub total_amount: String,
    pub tree_depth: usize,
    pub algorithm: String,
    pub leaf_format: String,
    pub leaf_format_version: String,
    pub generated_at: DateTime<Utc>,
}

impl DistributionManifest {
    pub fn new(file: &RecipientsFile, tree: &MerkleTree, total_amount: u64) -> Self {
        Self {
            airdrop_id: file.airdrop_id.clone(),
            network: file.network.clone(),
            program_id: file.program_id.clone(),
            merkle_root: tree.root_hex(),
            merkle_root_bytes: tree.root(),
            recipient_count: tree.leaf_count(),
            total_amount: total_amount.to_string(),
            tree_depth: tree.depth(),
            algorithm: HASH_ALGORITHM.to_string(),
            leaf_format: LEAF_FORMAT.to_string(),
            leaf_format_version: LEAF_FORMAT_VERSION.to_string(),
            generated_at: Utc::now(),
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read manifest file")?;
        serde_json::from_str(&content).context("Failed to parse manifest file")
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize manifest")?;
        write_file_atomic(path, &json).context("Failed to write manifest file")
    }
}

/// Inclusion proof for one recipient, in the shape the claim instruction takes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimProof {
    pub recipient: String,
    pub leaf_index: usize,
    pub leaf_count: usize,
    pub amount: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub leaf: String,
    pub merkle_root: String,
    /// Sibling digests, leaf level first, as `Vec<[u8; 32]>`.
    pub proof: Vec<[u8; 32]>,
    pub proof_hex: Vec<String>,
}

impl ClaimProof {
    pub fn new(tree: &MerkleTree, recipient: &Recipient) -> anyhow::Result<Self> {
        let leaf_index =
            usize::try_from(recipient.index).context("Recipient index does not fit in usize")?;
        let leaf = recipient.leaf();
        if tree.leaf(leaf_index) != Some(&leaf) {
            anyhow::bail!(
                "Recipient {} with amount {} is not leaf {} of this tree",
                format_address(&recipient.address),
                recipient.amount,
                leaf_index
            );
        }

        let proof = tree.proof(leaf_index)?;
        Ok(Self {
            recipient: format_address(&recipient.address),
            leaf_index,
            leaf_count: tree.leaf_count(),
            amount: recipient.amount.to_string(),
            description: None,
            leaf: hex_encode(leaf),
            merkle_root: tree.root_hex(),
            proof_hex: proof.iter().map(hex_encode).collect(),
            proof,
        })
    }

    pub fn with_description(mut self, description: Option<&str>) -> Self {
        self.description = description.map(str::to_string);
        self
    }

    /// Re-derives the leaf from `(recipient, amount)` and checks the proof
    /// against the embedded root.
    pub fn verify(&self) -> anyhow::Result<bool> {
        let root = decode_hash32(&self.merkle_root).context("Invalid merkleRoot")?;
        self.verify_against(&root)
    }

    /// Whether the embedded root is `root`, however the hex was written.
    pub fn is_for_root(&self, root: &Node) -> anyhow::Result<bool> {
        let recorded = decode_hash32(&self.merkle_root).context("Invalid merkleRoot")?;
        Ok(recorded == *root)
    }

    /// Like [`ClaimProof::verify`], against an externally supplied root.
    pub fn verify_against(&self, root: &Node) -> anyhow::Result<bool> {
        let address = parse_address(&self.recipient).context("Invalid recipient")?;
        let amount: u64 = self.amount.trim().parse().context("Invalid amount")?;
        let leaf = hash_leaf(&address, amount);

        if decode_hash32(&self.leaf).context("Invalid leaf")? != leaf {
            tracing::warn!(
                recipient = %self.recipient,
                "stored leaf does not match recipient and amount"
            );
            return Ok(false);
        }

        Ok(verify_proof(
            root,
            &leaf,
            self.leaf_index,
            self.leaf_count,
            &self.proof,
        ))
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read proof file")?;
        serde_json::from_str(&content).context("Failed to parse proof JSON")
    }
}

/// Proofs for every recipient of a distribution, ordered by leaf index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofBundle {
    pub merkle_root: String,
    pub leaf_count: usize,
    pub proofs: Vec<ClaimProof>,
}

impl ProofBundle {
    pub fn build(
        tree: &MerkleTree,
        recipients: &[Recipient],
        file: &RecipientsFile,
    ) -> anyhow::Result<Self> {
        let descriptions = file.descriptions();
        let mut proofs = recipients
            .iter()
            .map(|recipient| {
                ClaimProof::new(tree, recipient).map(|proof| {
                    proof.with_description(descriptions.get(&recipient.index).copied())
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        proofs.sort_by_key(|proof| proof.leaf_index);

        Ok(Self {
            merkle_root: tree.root_hex(),
            leaf_count: tree.leaf_count(),
            proofs,
        })
    }
}
