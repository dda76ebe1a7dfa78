use crate::error::{IntoSweepError, SweepResult};
use crate::{tagged, to_utc, Sweeper};
use agent_utils::aws::is_not_found;
use aws_sdk_ec2::model::{Filter, InstanceStateName};
use chrono::{DateTime, Utc};
use hybrid_model::constants::E2E_CLUSTER_TAG_KEY;
use log::{debug, info};
use std::time::Duration;

const KIND: &str = "EC2 instance";
const TERMINATE_TIMEOUT: Duration = Duration::from_secs(10 * 60);
const POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Filter matching resources that carry the e2e cluster tag, whatever its value.
pub(crate) fn e2e_tag_filter() -> Filter {
    Filter::builder()
        .name("tag-key")
        .values(E2E_CLUSTER_TAG_KEY)
        .build()
}

/// Terminate the e2e instances selected by the filter and wait for them to reach `terminated`.
pub(crate) async fn sweep(sweeper: &Sweeper, now: DateTime<Utc>) -> SweepResult<Vec<String>> {
    let mut instance_ids = Vec::new();
    let mut next_token = None;
    loop {
        let output = sweeper
            .ec2_client
            .describe_instances()
            .filters(e2e_tag_filter())
            .filters(
                Filter::builder()
                    .name("instance-state-name")
                    .values("pending")
                    .values("running")
                    .values("stopping")
                    .values("stopped")
                    .build(),
            )
            .set_next_token(next_token)
            .send()
            .await
            .context("Unable to describe instances")?;
        for instance in output
            .reservations()
            .unwrap_or_default()
            .iter()
            .flat_map(|reservation| reservation.instances().unwrap_or_default())
        {
            let instance_id = match instance.instance_id() {
                Some(instance_id) => instance_id,
                None => continue,
            };
            let resource = tagged(
                instance_id,
                to_utc(instance.launch_time()),
                instance
                    .tags()
                    .unwrap_or_default()
                    .iter()
                    .map(|tag| (tag.key(), tag.value())),
            );
            if sweeper.select(KIND, &resource, now) {
                instance_ids.push(resource.id);
            }
        }
        next_token = output.next_token().map(ToString::to_string);
        if next_token.is_none() {
            break;
        }
    }

    sweeper
        .delete_each(KIND, instance_ids, move |instance_id| {
            terminate_instance(sweeper, instance_id)
        })
        .await
}

async fn terminate_instance(sweeper: &Sweeper, instance_id: String) -> SweepResult<()> {
    let result = sweeper
        .ec2_client
        .terminate_instances()
        .instance_ids(&instance_id)
        .send()
        .await;
    match result {
        Err(e) if is_not_found(&e) => return Ok(()),
        result => {
            result.context(format!("Unable to terminate instance '{}'", instance_id))?;
        }
    }
    info!("Waiting for instance '{}' to terminate", instance_id);
    tokio::time::timeout(
        TERMINATE_TIMEOUT,
        wait_for_termination(sweeper, &instance_id),
    )
    .await
    .context(format!(
        "Timed out waiting for instance '{}' to terminate",
        instance_id
    ))?
}

async fn wait_for_termination(sweeper: &Sweeper, instance_id: &str) -> SweepResult<()> {
    loop {
        let output = match sweeper
            .ec2_client
            .describe_instances()
            .instance_ids(instance_id)
            .send()
            .await
        {
            Ok(output) => output,
            Err(e) if is_not_found(&e) => return Ok(()),
            Err(e) => {
                return Err(e).context(format!("Unable to describe instance '{}'", instance_id))
            }
        };
        let state = output
            .reservations()
            .unwrap_or_default()
            .iter()
            .flat_map(|reservation| reservation.instances().unwrap_or_default())
            .find_map(|instance| instance.state().and_then(|state| state.name()))
            .cloned();
        match state {
            None | Some(InstanceStateName::Terminated) => return Ok(()),
            Some(state) => {
                debug!("Instance '{}' is {}", instance_id, state.as_str());
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        }
    }
}
