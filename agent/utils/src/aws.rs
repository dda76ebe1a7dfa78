use crate::constants::{
    DEFAULT_ASSUME_ROLE_SESSION_DURATION, DEFAULT_REGION, DEFAULT_SDK_MAX_ATTEMPTS, SESSION_NAME,
};
use crate::error::{self, Result};
use aws_config::default_provider::credentials::default_provider;
use aws_config::sts::AssumeRoleProvider;
use aws_config::retry::RetryConfig;
use aws_credential_types::provider::SharedCredentialsProvider;
use aws_sdk_sts::types::SdkError;
use aws_smithy_types::retry::{ProvideErrorKind, RetryMode};
use aws_types::region::Region;
use aws_types::SdkConfig;
use hybrid_model::{parse_partition_from_arn, partition_dns_suffix};
use log::{debug, info};
use serde::Serialize;
use snafu::{OptionExt, ResultExt};
use std::time::Duration;

/// Service error codes that mean the thing we wanted gone is already gone.
const NOT_FOUND_CODES: &[&str] = &[
    "InvalidInstanceID.NotFound",
    "InvalidInternetGatewayID.NotFound",
    "InvalidGroup.NotFound",
    "InvalidRouteTableID.NotFound",
    "InvalidSubnetID.NotFound",
    "InvalidVpcID.NotFound",
    "NoSuchBucket",
    "NoSuchEntity",
    "NotFound",
    "NotFoundException",
    "ResourceNotFoundException",
    "InvalidActivation",
    "InvalidInstanceId",
];

/// Set up the config for aws calls in `region`, using the default credential chain and
/// `sts::assume_role` if a role arn is provided.
pub async fn aws_config(
    region: &Option<String>,
    assume_role: &Option<String>,
    assume_role_session_duration: &Option<i32>,
) -> Result<SdkConfig> {
    let region = region
        .as_ref()
        .cloned()
        .unwrap_or_else(|| DEFAULT_REGION.to_string());
    info!(
        "Creating a custom region provider for '{}' to be used in the aws config.",
        region
    );

    let config_loader = aws_config::from_env().retry_config(
        RetryConfig::standard()
            .with_retry_mode(RetryMode::Adaptive)
            .with_max_attempts(DEFAULT_SDK_MAX_ATTEMPTS),
    );
    let base_provider = SharedCredentialsProvider::new(default_provider().await);

    let config_loader = match assume_role {
        Some(role_arn) => {
            info!("Using assumed role '{}' for aws calls", role_arn);
            config_loader.credentials_provider(SharedCredentialsProvider::new(
                AssumeRoleProvider::builder(role_arn)
                    .region(Region::new(region.clone()))
                    .session_name(SESSION_NAME)
                    .session_length(Duration::from_secs(
                        assume_role_session_duration.unwrap_or(DEFAULT_ASSUME_ROLE_SESSION_DURATION)
                            as u64,
                    ))
                    .build(base_provider.clone()),
            ))
        }
        None => config_loader.credentials_provider(base_provider),
    };

    Ok(config_loader.region(Region::new(region)).load().await)
}

/// The identity the configured credentials resolve to.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallerIdentity {
    pub account: String,
    pub arn: String,
    pub partition: String,
    pub dns_suffix: String,
}

/// Calls STS `GetCallerIdentity` and derives the partition from the returned ARN.
pub async fn caller_identity(sts_client: &aws_sdk_sts::Client) -> Result<CallerIdentity> {
    let output = sts_client
        .get_caller_identity()
        .send()
        .await
        .context(error::CallerIdentitySnafu)?;
    let arn = output
        .arn()
        .context(error::MissingSnafu {
            what: "arn",
            from: "GetCallerIdentity",
        })?
        .to_string();
    let account = output
        .account()
        .context(error::MissingSnafu {
            what: "account",
            from: "GetCallerIdentity",
        })?
        .to_string();
    let partition = parse_partition_from_arn(&arn).context(error::PartitionSnafu)?;
    debug!("Caller '{}' is in partition '{}'", arn, partition);
    Ok(CallerIdentity {
        account,
        dns_suffix: partition_dns_suffix(&partition).to_string(),
        arn,
        partition,
    })
}

/// The partition of the identity the configured credentials resolve to.
pub async fn caller_partition(sts_client: &aws_sdk_sts::Client) -> Result<String> {
    caller_identity(sts_client)
        .await
        .map(|identity| identity.partition)
}

/// The service error code of a failed SDK call, or `None` for transport and other errors.
pub fn error_code<E, R>(error: &SdkError<E, R>) -> Option<&str>
where
    E: ProvideErrorKind,
{
    match error {
        SdkError::ServiceError(service_error) => service_error.err().code(),
        _ => None,
    }
}

/// Whether the failed call reports that its target does not exist.
pub fn is_not_found<E, R>(error: &SdkError<E, R>) -> bool
where
    E: ProvideErrorKind,
{
    error_code(error)
        .map(|code| NOT_FOUND_CODES.contains(&code))
        .unwrap_or_default()
}

/// Whether the failed call returned one of `codes`.
pub fn has_error_code<E, R>(error: &SdkError<E, R>, codes: &[&str]) -> bool
where
    E: ProvideErrorKind,
{
    error_code(error)
        .map(|code| codes.contains(&code))
        .unwrap_or_default()
}

#[cfg(test)]
mod test {
    use super::*;
    use aws_smithy_types::retry::ErrorKind;

    #[derive(Debug)]
    struct CodedError(&'static str);

    impl ProvideErrorKind for CodedError {
        fn retryable_error_kind(&self) -> Option<ErrorKind> {
            None
        }

        fn code(&self) -> Option<&str> {
            Some(self.0)
        }
    }

    fn service_error(code: &'static str) -> SdkError<CodedError, ()> {
        SdkError::service_error(CodedError(code), ())
    }

    #[test]
    fn not_found_codes() {
        let err = service_error("NoSuchEntity");
        assert_eq!(error_code(&err), Some("NoSuchEntity"));
        assert!(is_not_found(&err));
        assert!(is_not_found(&service_error("InvalidVpcID.NotFound")));
        assert!(!is_not_found(&service_error("AccessDenied")));
    }

    #[test]
    fn retryable_codes() {
        let err = service_error("DependencyViolation");
        assert!(has_error_code(&err, &["DependencyViolation", "DeleteConflict"]));
        assert!(!has_error_code(&err, &["BucketNotEmpty"]));
        assert!(!is_not_found(&err));
    }

    #[test]
    fn transport_errors_have_no_code() {
        let err: SdkError<CodedError, ()> = SdkError::timeout_error("timed out");
        assert_eq!(error_code(&err), None);
        assert!(!is_not_found(&err));
        assert!(!has_error_code(&err, &["DependencyViolation"]));
    }
}
