use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use merkle_airdrop_cli::{hex_encode, validate_merkle_root, ClaimProof};

#[derive(Args, Debug)]
pub struct Cli {
    /// Proof JSON produced by `prove`
    #[arg(short, long)]
    proof: PathBuf,

    /// Expected Merkle root (defaults to the root recorded in the proof)
    #[arg(short, long)]
    root: Option<String>,
}

pub fn run(args: &Cli) -> Result<()> {
    let claim = ClaimProof::load(&args.proof)?;

    let valid = match &args.root {
        Some(root) => {
            let root = validate_merkle_root(root).context("Invalid Merkle root")?;
            if !claim.is_for_root(&root)? {
                tracing::warn!(
                    expected = %hex_encode(root),
                    recorded = %claim.merkle_root,
                    "proof was generated for a different root"
                );
            }
            claim.verify_against(&root)?
        }
        None => claim.verify()?,
    };

    if !valid {
        anyhow::bail!(
            "Proof does not verify for recipient {} at index {}",
            claim.recipient,
            claim.leaf_index
        );
    }

    tracing::info!(
        recipient = %claim.recipient,
        leaf_index = claim.leaf_index,
        "proof verified"
    );
    println!("valid");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use merkle_airdrop_cli::recipients::ListOptions;
    use merkle_airdrop_cli::{MerkleTree, RecipientsFile};
    use std::path::Path;

    fn write_claim(dir: &Path, index: usize) -> (PathBuf, ClaimProof) {
        let addresses: Vec<[u8; 32]> = (1..=5u8).map(|b| [b; 32]).collect();
        let file = RecipientsFile::generate(&addresses, 1_000, &ListOptions::default()).unwrap();
        let recipients = file.to_recipients().unwrap();
        let tree = MerkleTree::from_recipients(&recipients).unwrap();
        let claim = ClaimProof::new(&tree, &recipients[index]).unwrap();

        let path = dir.join("proof.json");
        save(&path, &claim);
        (path, claim)
    }

    fn save(path: &Path, claim: &ClaimProof) {
        std::fs::write(path, serde_json::to_string_pretty(claim).unwrap()).unwrap();
    }

    #[test]
    fn test_verify_embedded_root() {
        let dir = tempfile::tempdir().unwrap();
        let (proof, _) = write_claim(dir.path(), 4);
        run(&Cli { proof, root: None }).unwrap();
    }

    #[test]
    fn test_verify_tampered_proof_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (proof, mut claim) = write_claim(dir.path(), 2);
        claim.proof[0][0] ^= 0x01;
        save(&proof, &claim);

        let err = run(&Cli { proof, root: None }).unwrap_err();
        assert!(err.to_string().contains("does not verify"));
    }

    #[test]
    fn test_verify_tampered_amount_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (proof, mut claim) = write_claim(dir.path(), 0);
        claim.amount = "1000000".to_string();
        save(&proof, &claim);

        assert!(run(&Cli { proof, root: None }).is_err());
    }

    #[test]
    fn test_verify_explicit_root_without_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let (proof, mut claim) = write_claim(dir.path(), 1);
        let root = claim.merkle_root.clone();
        claim.merkle_root = root.trim_start_matches("0x").to_uppercase();
        save(&proof, &claim);

        run(&Cli {
            proof,
            root: Some(root),
        })
        .unwrap();
    }

    #[test]
    fn test_verify_wrong_root_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (proof, _) = write_claim(dir.path(), 3);
        let other = hex_encode([7u8; 32]);

        assert!(run(&Cli {
            proof,
            root: Some(other)
        })
        .is_err());
    }
}
