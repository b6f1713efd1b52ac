use anyhow::{Context, Result};
use clap::Args;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use merkle_airdrop_cli::recipients::format_sol;
use merkle_airdrop_cli::{DistributionManifest, MerkleTree, RecipientsFile};

#[derive(Args, Debug)]
pub struct Cli {
    /// Recipients JSON file
    #[arg(short, long, env = "AIRDROP_RECIPIENTS", default_value = "recipients.json")]
    recipients: PathBuf,

    /// Output file for the distribution manifest
    #[arg(short, long, env = "AIRDROP_MANIFEST", default_value = "distribution.json")]
    manifest: PathBuf,

    /// Output file for the full tree, one `level:index:0xhash` line per node
    #[arg(short, long)]
    tree_output: Option<PathBuf>,

    /// Write the computed root back into the recipients file
    #[arg(long)]
    update_recipients: bool,
}

pub fn run(args: Cli) -> Result<()> {
    tracing::info!(path = %args.recipients.display(), "reading recipients");
    let mut file = RecipientsFile::load(&args.recipients)?;
    let total = file
        .check_total_amount()
        .context("Recipients file failed validation")?;
    let recipients = file.to_recipients()?;

    tracing::info!(
        recipients = recipients.len(),
        total_sol = %format_sol(total),
        "building merkle tree"
    );
    let tree = MerkleTree::from_recipients(&recipients).context("Failed to build Merkle tree")?;
    let root_hex = tree.root_hex();

    tracing::info!(
        root = %root_hex,
        depth = tree.depth(),
        root_bytes = ?tree.root(),
        "merkle root computed"
    );

    if !file.has_placeholder_root() && !file.records_root(&tree.root()) {
        tracing::warn!(
            recorded = %file.merkle_root,
            computed = %root_hex,
            "recipients file records a different root; this is a new distribution"
        );
    }

    let manifest = DistributionManifest::new(&file, &tree, total);
    manifest
        .save(&args.manifest)
        .context("Failed to write distribution manifest")?;
    tracing::info!(path = %args.manifest.display(), "wrote distribution manifest");

    if let Some(tree_path) = args.tree_output {
        let tree_file = File::create(&tree_path).context("Failed to create tree file")?;
        let mut writer = BufWriter::new(tree_file);
        tree.write_levels(&mut writer).context("Failed to write tree")?;
        writer.flush().context("Failed to flush tree file")?;
        tracing::info!(path = %tree_path.display(), "wrote merkle tree");
    }

    if args.update_recipients {
        file.set_merkle_root(root_hex.clone());
        file.save(&args.recipients)?;
        tracing::info!(
            path = %args.recipients.display(),
            "recorded merkle root in recipients file"
        );
    }

    println!("{}", root_hex);
    Ok(())
}
