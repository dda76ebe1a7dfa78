use crate::ec2::e2e_tag_filter;
use crate::error::{IntoSweepError, SweepResult};
use crate::{tagged, Sweeper};
use agent_utils::aws::{has_error_code, is_not_found};
use agent_utils::retry::{retry, DEPENDENCY_RETRY};
use aws_sdk_ec2::model::Filter;
use chrono::{DateTime, Utc};
use hybrid_model::ResourceWithTags;
use log::debug;

const KIND: &str = "VPC";
const DEPENDENCY_VIOLATION: &str = "DependencyViolation";

fn vpc_filter(vpc_id: &str) -> Filter {
    Filter::builder().name("vpc-id").values(vpc_id).build()
}

/// Delete the e2e VPCs selected by the filter, after their gateways, subnets, route tables and
/// security groups.
pub(crate) async fn sweep(sweeper: &Sweeper, now: DateTime<Utc>) -> SweepResult<Vec<String>> {
    let mut vpc_ids = Vec::new();
    let mut next_token = None;
    loop {
        let output = sweeper
            .ec2_client
            .describe_vpcs()
            .filters(e2e_tag_filter())
            .set_next_token(next_token)
            .send()
            .await
            .context("Unable to describe VPCs")?;
        for vpc in output.vpcs().unwrap_or_default() {
            let vpc_id = match vpc.vpc_id() {
                Some(vpc_id) => vpc_id,
                None => continue,
            };
            let mut resource = tagged(
                vpc_id,
                None,
                vpc.tags()
                    .unwrap_or_default()
                    .iter()
                    .map(|tag| (tag.key(), tag.value())),
            );
            // EC2 does not report when a VPC was created.
            resource.creation_time = ResourceWithTags::creation_time_from_tag(&resource.tags);
            if sweeper.select(KIND, &resource, now) {
                vpc_ids.push(resource.id);
            }
        }
        next_token = output.next_token().map(ToString::to_string);
        if next_token.is_none() {
            break;
        }
    }

    sweeper
        .delete_each(KIND, vpc_ids, move |vpc_id| delete_vpc(sweeper, vpc_id))
        .await
}

async fn delete_vpc(sweeper: &Sweeper, vpc_id: String) -> SweepResult<()> {
    delete_internet_gateways(sweeper, &vpc_id).await?;
    delete_subnets(sweeper, &vpc_id).await?;
    delete_route_tables(sweeper, &vpc_id).await?;
    delete_security_groups(sweeper, &vpc_id).await?;

    let result = retry(
        DEPENDENCY_RETRY,
        &format!("Deleting VPC '{}'", vpc_id),
        |e| has_error_code(e, &[DEPENDENCY_VIOLATION]),
        || sweeper.ec2_client.delete_vpc().vpc_id(&vpc_id).send(),
    )
    .await;
    match result {
        Err(e) if !is_not_found(&e) => Err(e).context(format!("Unable to delete VPC '{}'", vpc_id)),
        _ => Ok(()),
    }
}

async fn delete_internet_gateways(sweeper: &Sweeper, vpc_id: &str) -> SweepResult<()> {
    let ec2 = &sweeper.ec2_client;
    let output = ec2
        .describe_internet_gateways()
        .filters(
            Filter::builder()
                .name("attachment.vpc-id")
                .values(vpc_id)
                .build(),
        )
        .send()
        .await
        .context(format!(
            "Unable to describe internet gateways of VPC '{}'",
            vpc_id
        ))?;
    for gateway_id in output
        .internet_gateways()
        .unwrap_or_default()
        .iter()
        .filter_map(|gateway| gateway.internet_gateway_id())
    {
        debug!("Detaching internet gateway '{}' from '{}'", gateway_id, vpc_id);
        if let Err(e) = ec2
            .detach_internet_gateway()
            .internet_gateway_id(gateway_id)
            .vpc_id(vpc_id)
            .send()
            .await
        {
            if !is_not_found(&e) {
                return Err(e).context(format!(
                    "Unable to detach internet gateway '{}'",
                    gateway_id
                ));
            }
        }
        if let Err(e) = ec2
            .delete_internet_gateway()
            .internet_gateway_id(gateway_id)
            .send()
            .await
        {
            if !is_not_found(&e) {
                return Err(e).context(format!(
                    "Unable to delete internet gateway '{}'",
                    gateway_id
                ));
            }
        }
    }
    Ok(())
}

async fn delete_subnets(sweeper: &Sweeper, vpc_id: &str) -> SweepResult<()> {
    let ec2 = &sweeper.ec2_client;
    let output = ec2
        .describe_subnets()
        .filters(vpc_filter(vpc_id))
        .send()
        .await
        .context(format!("Unable to describe subnets of VPC '{}'", vpc_id))?;
    for subnet_id in output
        .subnets()
        .unwrap_or_default()
        .iter()
        .filter_map(|subnet| subnet.subnet_id())
    {
        debug!("Deleting subnet '{}' of '{}'", subnet_id, vpc_id);
        // Network interfaces of terminated instances take a while to be released.
        let result = retry(
            DEPENDENCY_RETRY,
            &format!("Deleting subnet '{}'", subnet_id),
            |e| has_error_code(e, &[DEPENDENCY_VIOLATION]),
            || ec2.delete_subnet().subnet_id(subnet_id).send(),
        )
        .await;
        if let Err(e) = result {
            if !is_not_found(&e) {
                return Err(e).context(format!("Unable to delete subnet '{}'", subnet_id));
            }
        }
    }
    Ok(())
}

async fn delete_route_tables(sweeper: &Sweeper, vpc_id: &str) -> SweepResult<()> {
    let ec2 = &sweeper.ec2_client;
    let output = ec2
        .describe_route_tables()
        .filters(vpc_filter(vpc_id))
        .send()
        .await
        .context(format!("Unable to describe route tables of VPC '{}'", vpc_id))?;
    for route_table in output.route_tables().unwrap_or_default() {
        let is_main = route_table
            .associations()
            .unwrap_or_default()
            .iter()
            .any(|association| association.main().unwrap_or_default());
        let route_table_id = match route_table.route_table_id() {
            // The main route table goes away with the VPC.
            Some(route_table_id) if !is_main => route_table_id,
            _ => continue,
        };
        debug!("Deleting route table '{}' of '{}'", route_table_id, vpc_id);
        if let Err(e) = ec2
            .delete_route_table()
            .route_table_id(route_table_id)
            .send()
            .await
        {
            if !is_not_found(&e) {
                return Err(e).context(format!(
                    "Unable to delete route table '{}'",
                    route_table_id
                ));
            }
        }
    }
    Ok(())
}

async fn delete_security_groups(sweeper: &Sweeper, vpc_id: &str) -> SweepResult<()> {
    let ec2 = &sweeper.ec2_client;
    let output = ec2
        .describe_security_groups()
        .filters(vpc_filter(vpc_id))
        .send()
        .await
        .context(format!(
            "Unable to describe security groups of VPC '{}'",
            vpc_id
        ))?;
    for group in output.security_groups().unwrap_or_default() {
        if group.group_name() == Some("default") {
            continue;
        }
        let group_id = match group.group_id() {
            Some(group_id) => group_id,
            None => continue,
        };
        debug!("Deleting security group '{}' of '{}'", group_id, vpc_id);
        let result = retry(
            DEPENDENCY_RETRY,
            &format!("Deleting security group '{}'", group_id),
            |e| has_error_code(e, &[DEPENDENCY_VIOLATION]),
            || ec2.delete_security_group().group_id(group_id).send(),
        )
        .await;
        if let Err(e) = result {
            if !is_not_found(&e) {
                return Err(e).context(format!(
                    "Unable to delete security group '{}'",
                    group_id
                ));
            }
        }
    }
    Ok(())
}
