#![forbid(unsafe_code)]
#![allow(unreachable_pub)]

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod build_tree;
mod new_list;
mod prove;
mod verify;

#[derive(Parser, Debug)]
#[command(name = "airdrop")]
#[command(about = "Merkle airdrop distribution tools", long_about = None)]
#[command(version)]
struct Cli {
    /// Log at debug level (ignored when RUST_LOG is set)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the Merkle tree and write the distribution manifest
    BuildTree(build_tree::Cli),
    /// Generate inclusion proofs for recipients
    Prove(prove::Cli),
    /// Check a proof file against its root
    Verify(verify::Cli),
    /// Create a recipients file from an address list
    NewList(new_list::Cli),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::BuildTree(args) => build_tree::run(args)?,
        Commands::Prove(args) => prove::run(&args)?,
        Commands::Verify(args) => verify::run(&args)?,
        Commands::NewList(args) => new_list::run(args)?,
    }

    Ok(())
}

/// Logs go to stderr so JSON written to stdout stays machine-readable.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}
