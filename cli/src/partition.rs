use crate::print_json;
use agent_utils::aws::{aws_config, caller_partition};
use anyhow::{Context, Result};
use clap::Parser;
use hybrid_model::{parse_partition_from_arn, parse_region_from_arn, partition_dns_suffix};
use serde::Serialize;

/// Print the partition of an ARN or of the current caller.
#[derive(Debug, Parser)]
pub(crate) struct Partition {
    /// The ARN to inspect. Without it, the caller identity from STS is used.
    #[clap(long)]
    arn: Option<String>,
    /// The region used for the STS call.
    #[clap(long)]
    region: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PartitionOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    arn: Option<String>,
    partition: String,
    dns_suffix: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    region: Option<String>,
}

impl Partition {
    pub(crate) async fn run(&self) -> Result<()> {
        let partition = match &self.arn {
            Some(arn) => parse_partition_from_arn(arn).context("Unable to parse the ARN")?,
            None => {
                let config = aws_config(&self.region, &None, &None)
                    .await
                    .context("Unable to create the aws config")?;
                caller_partition(&aws_sdk_sts::Client::new(&config))
                    .await
                    .context("Unable to find the partition of the caller")?
            }
        };
        print_json(&PartitionOutput {
            dns_suffix: partition_dns_suffix(&partition).to_string(),
            region: self.arn.as_ref().and_then(parse_region_from_arn),
            arn: self.arn.clone(),
            partition,
        })
    }
}
