use crate::error::{IntoSweepError, SweepResult};
use crate::{tagged, to_utc, Sweeper};
use agent_utils::aws::is_not_found;
use aws_sdk_ssm::model::InstanceInformationStringFilter;
use chrono::{DateTime, Utc};
use log::info;

const KIND: &str = "SSM activation";

/// Deregister the managed instances registered through selected activations, then delete the
/// activations.
pub(crate) async fn sweep(sweeper: &Sweeper, now: DateTime<Utc>) -> SweepResult<Vec<String>> {
    let mut activation_ids = Vec::new();
    let mut next_token = None;
    loop {
        let output = sweeper
            .ssm_client
            .describe_activations()
            .set_next_token(next_token)
            .send()
            .await
            .context("Unable to describe activations")?;
        for activation in output.activation_list().unwrap_or_default() {
            let activation_id = match activation.activation_id() {
                Some(activation_id) => activation_id,
                None => continue,
            };
            let resource = tagged(
                activation_id,
                to_utc(activation.created_date()),
                activation
                    .tags()
                    .unwrap_or_default()
                    .iter()
                    .map(|tag| (tag.key(), tag.value())),
            );
            if sweeper.select(KIND, &resource, now) {
                activation_ids.push(resource.id);
            }
        }
        next_token = output.next_token().map(ToString::to_string);
        if next_token.is_none() {
            break;
        }
    }

    sweeper
        .delete_each(KIND, activation_ids, move |activation_id| {
            delete_activation(sweeper, activation_id)
        })
        .await
}

async fn delete_activation(sweeper: &Sweeper, activation_id: String) -> SweepResult<()> {
    for instance_id in managed_instances(sweeper, &activation_id).await? {
        match sweeper
            .ssm_client
            .deregister_managed_instance()
            .instance_id(&instance_id)
            .send()
            .await
        {
            Err(e) if !is_not_found(&e) => {
                return Err(e).context(format!(
                    "Unable to deregister managed instance '{}'",
                    instance_id
                ));
            }
            _ => info!(
                "Deregistered managed instance '{}' of activation '{}'",
                instance_id, activation_id
            ),
        }
    }

    match sweeper
        .ssm_client
        .delete_activation()
        .activation_id(&activation_id)
        .send()
        .await
    {
        Err(e) if !is_not_found(&e) => {
            Err(e).context(format!("Unable to delete activation '{}'", activation_id))
        }
        _ => Ok(()),
    }
}

async fn managed_instances(sweeper: &Sweeper, activation_id: &str) -> SweepResult<Vec<String>> {
    let mut instance_ids = Vec::new();
    let mut next_token = None;
    loop {
        let output = sweeper
            .ssm_client
            .describe_instance_information()
            .filters(
                InstanceInformationStringFilter::builder()
                    .key("ActivationIds")
                    .values(activation_id)
                    .build(),
            )
            .set_next_token(next_token)
            .send()
            .await
            .context(format!(
                "Unable to list managed instances of activation '{}'",
                activation_id
            ))?;
        instance_ids.extend(
            output
                .instance_information_list()
                .unwrap_or_default()
                .iter()
                .filter_map(|info| info.instance_id())
                .map(ToString::to_string),
        );
        next_token = output.next_token().map(ToString::to_string);
        if next_token.is_none() {
            break;
        }
    }
    Ok(instance_ids)
}
