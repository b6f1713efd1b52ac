use anyhow::Context;
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::num::IntErrorKind;
use std::path::Path;

use crate::common::{
    decode_hash32, format_address, hex_encode, parse_address, write_file_atomic,
};
use crate::error::MerkleError;
use crate::leaf::{hash_leaf, HASH_ALGORITHM, LEAF_FORMAT, LEAF_FORMAT_VERSION};
use crate::tree::Node;

pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// One entitlement in a finalized distribution.
///
/// `index` is the recipient's leaf slot and the only way to regenerate its
/// proof, so it must never change once the root is published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Recipient {
    pub address: [u8; 32],
    pub amount: u64,
    pub index: u64,
}

impl Recipient {
    pub fn leaf(&self) -> Node {
        hash_leaf(&self.address, self.amount)
    }
}

/// Amount as stored on disk: a decimal string, or a plain JSON number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AmountField {
    Text(String),
    Number(serde_json::Number),
}

impl AmountField {
    /// Parses the amount as `u64` smallest-unit value.
    ///
    /// `index` only labels the error.
    pub fn to_u64(&self, index: u64) -> anyhow::Result<u64> {
        let overflow = |value: String| MerkleError::AmountOverflow { index, value };
        match self {
            AmountField::Text(text) => match text.trim().parse::<u64>() {
                Ok(amount) => Ok(amount),
                Err(e) if matches!(e.kind(), IntErrorKind::PosOverflow) => {
                    Err(overflow(text.clone()).into())
                }
                Err(e) => anyhow::bail!("Invalid amount '{}': {}", text, e),
            },
            AmountField::Number(number) => number
                .as_u64()
                .ok_or_else(|| overflow(number.to_string()).into()),
        }
    }
}

impl From<u64> for AmountField {
    fn from(amount: u64) -> Self {
        AmountField::Text(amount.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientEntry {
    pub public_key: String,
    pub amount: AmountField,
    pub index: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RecipientEntry {
    pub fn to_recipient(&self) -> anyhow::Result<Recipient> {
        let address = parse_address(&self.public_key)
            .with_context(|| format!("Invalid public key '{}'", self.public_key))?;
        let amount = self.amount.to_u64(self.index)?;
        Ok(Recipient {
            address,
            amount,
            index: self.index,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub created_at: DateTime<Utc>,
    pub version: String,
    pub algorithm: String,
    pub leaf_format: String,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            created_at: Utc::now(),
            version: LEAF_FORMAT_VERSION.to_string(),
            algorithm: HASH_ALGORITHM.to_string(),
            leaf_format: LEAF_FORMAT.to_string(),
        }
    }
}

/// The persisted recipient list of one distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientsFile {
    pub airdrop_id: String,
    #[serde(default)]
    pub description: String,
    pub merkle_root: String,
    pub total_amount: AmountField,
    #[serde(default)]
    pub network: String,
    #[serde(default)]
    pub program_id: String,
    pub recipients: Vec<RecipientEntry>,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Header fields for a newly generated recipient list.
#[derive(Debug, Clone)]
pub struct ListOptions {
    pub airdrop_id: String,
    pub description: String,
    pub network: String,
    pub program_id: String,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            airdrop_id: format!("solana-distributor-airdrop-{}", Utc::now().year()),
            description: "Merkle airdrop distribution".to_string(),
            network: "devnet".to_string(),
            program_id: String::new(),
        }
    }
}

impl RecipientsFile {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            anyhow::bail!("Recipients file not found: {:?}", path);
        }
        let content = fs::read_to_string(path).context("Failed to read recipients file")?;
        let file: RecipientsFile =
            serde_json::from_str(&content).context("Failed to parse recipients file")?;
        tracing::debug!(
            path = %path.display(),
            recipients = file.recipients.len(),
            "loaded recipients file"
        );
        Ok(file)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize recipients")?;
        write_file_atomic(path, &json).context("Failed to write recipients file")
    }

    /// Converts every entry, aborting on the first invalid record.
    ///
    /// A public key may appear only once; address lookups would otherwise
    /// be ambiguous.
    pub fn to_recipients(&self) -> anyhow::Result<Vec<Recipient>> {
        let mut seen: HashMap<[u8; 32], u64> = HashMap::with_capacity(self.recipients.len());
        let mut recipients = Vec::with_capacity(self.recipients.len());

        for (position, entry) in self.recipients.iter().enumerate() {
            let recipient = entry
                .to_recipient()
                .with_context(|| format!("Invalid recipient entry at position {}", position))?;
            if let Some(&first) = seen.get(&recipient.address) {
                return Err(MerkleError::DuplicateAddress {
                    address: format_address(&recipient.address),
                    first,
                    second: recipient.index,
                }
                .into());
            }
            seen.insert(recipient.address, recipient.index);
            recipients.push(recipient);
        }

        Ok(recipients)
    }

    /// Sum of all entry amounts.
    pub fn computed_total(&self) -> anyhow::Result<u64> {
        let mut total: u64 = 0;
        for entry in &self.recipients {
            let amount = entry.amount.to_u64(entry.index)?;
            total = total
                .checked_add(amount)
                .ok_or_else(|| MerkleError::AmountOverflow {
                    index: entry.index,
                    value: format!("{} + {}", total, amount),
                })?;
        }
        Ok(total)
    }

    /// Checks the declared `totalAmount` against the entries and returns the total.
    pub fn check_total_amount(&self) -> anyhow::Result<u64> {
        let computed = self.computed_total()?;
        let declared = self
            .total_amount
            .to_u64(0)
            .context("Invalid totalAmount")?;
        if declared != computed {
            let declared = match &self.total_amount {
                AmountField::Text(text) => text.clone(),
                AmountField::Number(number) => number.to_string(),
            };
            return Err(MerkleError::TotalAmountMismatch { declared, computed }.into());
        }
        Ok(computed)
    }

    pub fn find(&self, address: &[u8; 32]) -> anyhow::Result<Option<Recipient>> {
        for entry in &self.recipients {
            let recipient = entry.to_recipient()?;
            if recipient.address == *address {
                return Ok(Some(recipient));
            }
        }
        Ok(None)
    }

    pub fn description_of(&self, index: u64) -> Option<&str> {
        self.recipients
            .iter()
            .find(|entry| entry.index == index)
            .and_then(|entry| entry.description.as_deref())
    }

    /// Descriptions keyed by recipient index, for bulk lookups.
    pub fn descriptions(&self) -> HashMap<u64, &str> {
        self.recipients
            .iter()
            .filter_map(|entry| Some((entry.index, entry.description.as_deref()?)))
            .collect()
    }

    /// Whether the root still holds the placeholder of a freshly generated list.
    /// Whether the recorded `merkleRoot` decodes to `root`.
    pub fn records_root(&self, root: &Node) -> bool {
        decode_hash32(&self.merkle_root).is_ok_and(|recorded| recorded == *root)
    }

    pub fn has_placeholder_root(&self) -> bool {
        self.merkle_root == placeholder_root()
    }

    /// Records a computed root and refreshes the leaf-format metadata.
    pub fn set_merkle_root(&mut self, root_hex: String) {
        self.merkle_root = root_hex;
        self.metadata.algorithm = HASH_ALGORITHM.to_string();
        self.metadata.leaf_format = LEAF_FORMAT.to_string();
    }

    /// Builds a new list paying `amount` to every address, indexed in input order.
    pub fn generate(
        addresses: &[[u8; 32]],
        amount: u64,
        options: &ListOptions,
    ) -> anyhow::Result<Self> {
        if addresses.is_empty() {
            return Err(MerkleError::EmptyRecipientSet.into());
        }

        let mut seen = HashSet::with_capacity(addresses.len());
        for address in addresses {
            if !seen.insert(address) {
                anyhow::bail!("Duplicate recipient address: {}", format_address(address));
            }
        }

        let count = addresses.len() as u64;
        let total = amount
            .checked_mul(count)
            .ok_or_else(|| MerkleError::AmountOverflow {
                index: count,
                value: format!("{} * {}", amount, count),
            })?;

        let recipients = addresses
            .iter()
            .zip(0u64..)
            .map(|(address, index)| RecipientEntry {
                public_key: format_address(address),
                amount: amount.into(),
                index,
                description: Some(format!("Recipient {} - {} SOL", index, format_sol(amount))),
            })
            .collect();

        Ok(Self {
            airdrop_id: options.airdrop_id.clone(),
            description: options.description.clone(),
            merkle_root: placeholder_root(),
            total_amount: total.into(),
            network: options.network.clone(),
            program_id: options.program_id.clone(),
            recipients,
            metadata: Metadata::default(),
        })
    }
}

pub fn placeholder_root() -> String {
    hex_encode([0u8; 32])
}

/// Renders lamports as a decimal SOL amount without trailing zeros.
pub fn format_sol(lamports: u64) -> String {
    let whole = lamports / LAMPORTS_PER_SOL;
    let frac = lamports % LAMPORTS_PER_SOL;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:09}", frac);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

/// Reads one address per line, skipping blank lines and `#` comments.
pub fn read_address_list(path: &Path) -> anyhow::Result<Vec<[u8; 32]>> {
    let file = File::open(path).context("Failed to open address list")?;
    let reader = BufReader::new(file);

    let mut addresses = Vec::new();
    for (line_num, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read line")?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let address = parse_address(trimmed)
            .with_context(|| format!("Invalid address at line {}", line_num + 1))?;
        addresses.push(address);
    }

    Ok(addresses)
}
