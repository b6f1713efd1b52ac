use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use merkle_airdrop_cli::recipients::{format_sol, read_address_list, ListOptions};
use merkle_airdrop_cli::RecipientsFile;

#[derive(Args, Debug)]
pub struct Cli {
    /// File with one recipient public key per line
    #[arg(short, long)]
    addresses: PathBuf,

    /// Amount per recipient, in lamports
    #[arg(long)]
    amount: u64,

    /// Output recipients file
    #[arg(short, long, env = "AIRDROP_RECIPIENTS", default_value = "recipients.json")]
    output: PathBuf,

    /// Distribution identifier (defaults to one derived from the current year)
    #[arg(long)]
    airdrop_id: Option<String>,

    /// Free-form description stored in the file header
    #[arg(long)]
    description: Option<String>,

    /// Cluster the distribution targets
    #[arg(long, default_value = "devnet")]
    network: String,

    /// Distributor program id
    #[arg(long, default_value = "")]
    program_id: String,

    /// Overwrite an existing recipients file
    #[arg(long)]
    force: bool,
}

pub fn run(args: Cli) -> Result<()> {
    if args.output.exists() && !args.force {
        anyhow::bail!(
            "Recipients file {:?} already exists; pass --force to replace it",
            args.output
        );
    }

    tracing::info!(path = %args.addresses.display(), "reading addresses");
    let addresses = read_address_list(&args.addresses)?;

    let defaults = ListOptions::default();
    let options = ListOptions {
        airdrop_id: args.airdrop_id.unwrap_or(defaults.airdrop_id),
        description: args.description.unwrap_or(defaults.description),
        network: args.network,
        program_id: args.program_id,
    };

    let file = RecipientsFile::generate(&addresses, args.amount, &options)
        .context("Failed to generate recipients list")?;
    file.save(&args.output)?;

    tracing::info!(
        path = %args.output.display(),
        recipients = file.recipients.len(),
        amount_sol = %format_sol(args.amount),
        "wrote recipients file; run build-tree to compute the root"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use merkle_airdrop_cli::format_address;
    use std::fs;
    use std::path::Path;

    fn cli(dir: &Path, force: bool) -> Cli {
        let addresses = dir.join("addresses.txt");
        let list: Vec<String> = (1..=3u8).map(|b| format_address(&[b; 32])).collect();
        fs::write(&addresses, format!("# wallets\n{}\n", list.join("\n"))).unwrap();
        Cli {
            addresses,
            amount: 5_000,
            output: dir.join("recipients.json"),
            airdrop_id: Some("test-drop".to_string()),
            description: None,
            network: "devnet".to_string(),
            program_id: String::new(),
            force,
        }
    }

    #[test]
    fn test_new_list_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let args = cli(dir.path(), false);
        let output = args.output.clone();

        run(args).unwrap();

        let file = RecipientsFile::load(&output).unwrap();
        assert_eq!(file.airdrop_id, "test-drop");
        assert_eq!(file.recipients.len(), 3);
        assert_eq!(file.check_total_amount().unwrap(), 15_000);
        assert!(file.has_placeholder_root());
    }

    #[test]
    fn test_new_list_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let args = cli(dir.path(), false);
        fs::write(&args.output, "keep me").unwrap();
        let output = args.output.clone();

        let err = run(args).unwrap_err();
        assert!(err.to_string().contains("--force"));
        assert_eq!(fs::read_to_string(&output).unwrap(), "keep me");
    }

    #[test]
    fn test_new_list_force_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let args = cli(dir.path(), true);
        fs::write(&args.output, "stale").unwrap();
        let output = args.output.clone();

        run(args).unwrap();

        let file = RecipientsFile::load(&output).unwrap();
        assert_eq!(file.recipients.len(), 3);
    }
}
