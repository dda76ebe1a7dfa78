/*!

Deletes leftover e2e test infrastructure tagged with `Nodeadm-E2E-Tests-Cluster`.

!*/

use agent_utils::aws::aws_config;
use agent_utils::init_agent_logger;
use clap::{ArgGroup, Parser};
use hybrid_model::FilterInput;
use hybrid_sweeper::{IntoSweepError, SweepError, SweepResult, Sweeper};
use log::{info, LevelFilter};
use std::time::Duration;

/// Delete e2e test resources of one cluster, or of every cluster past an age threshold.
#[derive(Debug, Parser)]
#[clap(author, version, about)]
#[clap(group(ArgGroup::new("selection").required(true).args(&["cluster-name", "all-clusters"])))]
struct Args {
    /// Set logging verbosity [trace|debug|info|warn|error]. If the environment variable `RUST_LOG`
    /// is present, it overrides the default logging behavior. See https://docs.rs/env_logger/latest
    #[clap(long = "log-level", default_value = "info")]
    log_level: LevelFilter,

    /// Delete every resource of this cluster, regardless of age.
    #[clap(long = "cluster-name")]
    cluster_name: Option<String>,

    /// Delete resources of any e2e cluster older than `--age-threshold-hours`.
    #[clap(long = "all-clusters")]
    all_clusters: bool,

    #[clap(long = "age-threshold-hours", default_value = "12")]
    age_threshold_hours: u64,

    /// Only log what would be deleted.
    #[clap(long = "dry-run")]
    dry_run: bool,

    /// The region to sweep. Defaults to us-west-2.
    #[clap(long = "region")]
    region: Option<String>,

    /// A role to assume for all aws calls.
    #[clap(long = "assume-role")]
    assume_role: Option<String>,
}

impl TryFrom<&Args> for FilterInput {
    type Error = SweepError;

    fn try_from(args: &Args) -> SweepResult<Self> {
        let age_threshold_secs = args
            .age_threshold_hours
            .checked_mul(60 * 60)
            .context(format!(
                "--age-threshold-hours {} is too large",
                args.age_threshold_hours
            ))?;
        Ok(FilterInput {
            cluster_name: args.cluster_name.clone(),
            all_clusters: args.all_clusters,
            age_threshold: Duration::from_secs(age_threshold_secs),
            dry_run: args.dry_run,
        })
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_agent_logger(env!("CARGO_CRATE_NAME"), Some(args.log_level));
    if let Err(e) = run(args).await {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> SweepResult<()> {
    let filter = FilterInput::try_from(&args).context("Invalid arguments")?;
    filter.validate().context("Invalid arguments")?;
    let config = aws_config(&args.region, &args.assume_role, &None)
        .await
        .context("Unable to create the aws config")?;
    let sweeper = Sweeper::new(&config, filter)?;
    let report = sweeper.run().await?;
    info!(
        "Swept {} resources in '{}'",
        report.deleted.values().map(Vec::len).sum::<usize>(),
        sweeper.region()
    );
    println!("{}", report);
    Ok(())
}
