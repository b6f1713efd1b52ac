use anyhow::{Context, Result};
use clap::{ArgGroup, Args};
use std::path::{Path, PathBuf};

use merkle_airdrop_cli::{
    parse_address, write_file_atomic, ClaimProof, MerkleError, MerkleTree, ProofBundle,
    RecipientsFile,
};

#[derive(Args, Debug)]
#[command(group(
    ArgGroup::new("target")
        .required(true)
        .args(["address", "index", "all"])
))]
pub struct Cli {
    /// Recipients JSON file
    #[arg(short, long, env = "AIRDROP_RECIPIENTS", default_value = "recipients.json")]
    recipients: PathBuf,

    /// Recipient public key (base58, or 0x-prefixed hex)
    #[arg(short, long)]
    address: Option<String>,

    /// Leaf index of the recipient
    #[arg(short, long)]
    index: Option<usize>,

    /// Generate proofs for every recipient
    #[arg(long)]
    all: bool,

    /// Output JSON file (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub fn run(args: &Cli) -> Result<()> {
    let file = RecipientsFile::load(&args.recipients)?;
    let recipients = file.to_recipients()?;
    let tree = MerkleTree::from_recipients(&recipients).context("Failed to build Merkle tree")?;

    if !file.has_placeholder_root() && !file.records_root(&tree.root()) {
        tracing::warn!(
            recorded = %file.merkle_root,
            computed = %tree.root_hex(),
            "proofs will not verify against the root recorded in the recipients file"
        );
    }

    let json = if args.all {
        let bundle = ProofBundle::build(&tree, &recipients, &file)?;
        tracing::info!(
            proofs = bundle.proofs.len(),
            root = %bundle.merkle_root,
            "generated all proofs"
        );
        serde_json::to_string_pretty(&bundle).context("Failed to serialize proofs")?
    } else {
        let recipient = if let Some(address) = &args.address {
            let address = parse_address(address).context("Invalid recipient address")?;
            file.find(&address)?.context("Address not found in recipients list")?
        } else {
            let index = args.index.unwrap_or_default();
            *recipients
                .iter()
                .find(|r| r.index == index as u64)
                .ok_or(MerkleError::IndexOutOfRange {
                    index,
                    leaf_count: tree.leaf_count(),
                })?
        };

        let claim = ClaimProof::new(&tree, &recipient)?
            .with_description(file.description_of(recipient.index));
        tracing::info!(
            recipient = %claim.recipient,
            leaf_index = claim.leaf_index,
            amount = %claim.amount,
            proof_len = claim.proof.len(),
            "generated proof"
        );
        serde_json::to_string_pretty(&claim).context("Failed to serialize proof")?
    };

    emit(&json, args.output.as_deref())
}

fn emit(json: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            write_file_atomic(path, json).context("Failed to write proof file")?;
            tracing::info!(path = %path.display(), "wrote proof file");
        }
        None => println!("{}", json),
    }
    Ok(())
}
