/*!

`nodeadm` joins a machine to an EKS cluster as a hybrid node. It also exposes the lookups the
bootstrap relies on (artifact sources, ECR registries, partitions) as standalone commands.

!*/

mod init;
mod partition;
mod registry;
mod source;

use agent_utils::constants::DEFAULT_MANIFEST_URL;
use agent_utils::init_agent_logger;
use agent_utils::manifest::fetch_manifest;
use anyhow::{Context, Result};
use clap::Parser;
use hybrid_model::Manifest;
use log::LevelFilter;

/// Bootstrap hybrid nodes and inspect the release manifest.
#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Args {
    /// Set logging verbosity [trace|debug|info|warn|error]. If the environment variable `RUST_LOG`
    /// is present, it overrides the default logging behavior. See https://docs.rs/env_logger/latest
    #[clap(long = "log-level", default_value = "info")]
    log_level: LevelFilter,
    /// The release manifest, as an `https://` URL or a local path.
    #[clap(long = "manifest", default_value = DEFAULT_MANIFEST_URL)]
    manifest: String,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Parser)]
enum Command {
    /// Join this machine to the cluster described by a node config.
    Init(init::Init),
    /// Print the artifact sources for a Kubernetes version.
    Source(source::Source),
    /// Print the ECR registry that serves EKS images in a region.
    Registry(registry::Registry),
    /// Print the partition of an ARN or of the current caller.
    Partition(partition::Partition),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_agent_logger(env!("CARGO_CRATE_NAME"), Some(args.log_level));
    if let Err(e) = run(args).await {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let manifest = ManifestSource(args.manifest);
    match args.command {
        Command::Init(init) => init.run(&manifest).await,
        Command::Source(source) => source.run(&manifest).await,
        Command::Registry(registry) => registry.run(&manifest).await,
        Command::Partition(partition) => partition.run().await,
    }
}

/// Where the release manifest comes from. Commands load it only when they need it.
pub(crate) struct ManifestSource(String);

impl ManifestSource {
    pub(crate) async fn load(&self) -> Result<Manifest> {
        fetch_manifest(&self.0)
            .await
            .context(format!("Unable to load release manifest from '{}'", self.0))
    }
}

/// Print `value` as pretty JSON on stdout.
pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Unable to serialize output")?
    );
    Ok(())
}
