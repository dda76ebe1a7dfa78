use crate::error::{IntoSweepError, SweepError, SweepResult};
use crate::{tagged, to_utc, Sweeper};
use agent_utils::aws::error_code;
use aws_sdk_cloudformation::model::StackStatus;
use chrono::{DateTime, Utc};
use log::{debug, info};
use std::time::Duration;

const KIND: &str = "CloudFormation stack";
const DELETE_TIMEOUT: Duration = Duration::from_secs(30 * 60);
const POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Delete the e2e stacks selected by the filter, waiting for each deletion to finish.
pub(crate) async fn sweep(sweeper: &Sweeper, now: DateTime<Utc>) -> SweepResult<Vec<String>> {
    let mut stack_ids = Vec::new();
    let mut next_token = None;
    loop {
        let output = sweeper
            .cfn_client
            .describe_stacks()
            .set_next_token(next_token)
            .send()
            .await
            .context("Unable to describe stacks")?;
        for stack in output.stacks().unwrap_or_default() {
            if matches!(stack.stack_status(), Some(StackStatus::DeleteComplete)) {
                continue;
            }
            let stack_id = match stack.stack_id() {
                Some(stack_id) => stack_id,
                None => continue,
            };
            let resource = tagged(
                stack_id,
                to_utc(stack.creation_time()),
                stack
                    .tags()
                    .unwrap_or_default()
                    .iter()
                    .map(|tag| (tag.key(), tag.value())),
            );
            if sweeper.select(KIND, &resource, now) {
                stack_ids.push(resource.id);
            }
        }
        next_token = output.next_token().map(ToString::to_string);
        if next_token.is_none() {
            break;
        }
    }

    sweeper
        .delete_each(KIND, stack_ids, move |stack_id| delete_stack(sweeper, stack_id))
        .await
}

async fn delete_stack(sweeper: &Sweeper, stack_id: String) -> SweepResult<()> {
    sweeper
        .cfn_client
        .delete_stack()
        .stack_name(&stack_id)
        .send()
        .await
        .context(format!("Unable to delete stack '{}'", stack_id))?;
    info!("Waiting for stack '{}' to be deleted", stack_id);
    tokio::time::timeout(DELETE_TIMEOUT, wait_for_deletion(sweeper, &stack_id))
        .await
        .context(format!(
            "Timed out waiting for stack '{}' to be deleted",
            stack_id
        ))?
}

async fn wait_for_deletion(sweeper: &Sweeper, stack_id: &str) -> SweepResult<()> {
    loop {
        let output = sweeper
            .cfn_client
            .describe_stacks()
            .stack_name(stack_id)
            .send()
            .await;
        let status = match output {
            Ok(output) => output
                .stacks()
                .unwrap_or_default()
                .first()
                .and_then(|stack| stack.stack_status())
                .cloned(),
            // Stacks looked up by name vanish once deleted.
            Err(e) if error_code(&e) == Some("ValidationError") => return Ok(()),
            Err(e) => {
                return Err(e).context(format!("Unable to describe stack '{}'", stack_id));
            }
        };
        match status {
            None | Some(StackStatus::DeleteComplete) => return Ok(()),
            Some(StackStatus::DeleteFailed) => {
                return Err(SweepError::new_with_context(format!(
                    "Stack '{}' reached DELETE_FAILED",
                    stack_id
                )));
            }
            Some(status) => {
                debug!("Stack '{}' is {}", stack_id, status.as_str());
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        }
    }
}
