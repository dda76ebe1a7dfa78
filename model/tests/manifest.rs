use hybrid_model::constants::{ARTIFACT_IAM_AUTHENTICATOR, ARTIFACT_KUBELET, ARTIFACT_SIGNING_HELPER};
use hybrid_model::{CredentialProvider, EcrRegistry, K8sVersion, Manifest, Platform};
use std::fs::read_to_string;
use std::path::PathBuf;

fn manifest() -> Manifest {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join("manifest.yaml");
    Manifest::from_yaml_str(read_to_string(path).unwrap()).unwrap()
}

#[test]
fn source_for_major_minor() {
    let manifest = manifest();
    let source = manifest
        .source(&K8sVersion::parse("1.30").unwrap())
        .unwrap();
    assert_eq!(source.eks.version, "v1.30.2-eks-2");
    assert_eq!(source.iam_roles_anywhere.version, "1.2.0");

    let linux_amd64 = Platform::new("linux", "amd64");
    let authenticator = source
        .eks_artifact(ARTIFACT_IAM_AUTHENTICATOR, &linux_amd64)
        .unwrap();
    assert!(authenticator.uri.contains("2024-08-01"));
    assert!(authenticator.checksum_uri.ends_with(".sha256"));
    let helper = source
        .iam_roles_anywhere_artifact(ARTIFACT_SIGNING_HELPER, &linux_amd64)
        .unwrap();
    assert!(helper.uri.contains("/1.2.0/"));
}

#[test]
fn source_for_patch() {
    let manifest = manifest();
    let source = manifest
        .source(&K8sVersion::parse("v1.30.0").unwrap())
        .unwrap();
    assert_eq!(source.eks.release_date, "2024-05-20");
    let source = manifest
        .source(&K8sVersion::parse("1.29").unwrap())
        .unwrap();
    assert!(source
        .eks_artifact(ARTIFACT_KUBELET, &Platform::new("linux", "arm64"))
        .is_ok());
    assert!(manifest
        .source(&K8sVersion::parse("1.28").unwrap())
        .is_err());
}

#[test]
fn region_config_drives_registry_and_providers() {
    let manifest = manifest();

    let registry = EcrRegistry::for_region("cn-north-1", manifest.region_data("cn-north-1"));
    assert_eq!(
        registry.host(),
        "111122223333.dkr.ecr.cn-north-1.amazonaws.com.cn"
    );

    let registry = EcrRegistry::for_region("us-west-2", manifest.region_data("us-west-2"));
    assert_eq!(registry.host(), "602401143452.dkr.ecr.us-west-2.amazonaws.com");

    let registry = EcrRegistry::for_region("us-east-1", manifest.region_data("us-east-1"));
    assert_eq!(registry.region, "us-west-2");

    let ap = manifest.region_data("ap-southeast-7");
    assert!(CredentialProvider::Ssm
        .ensure_available("ap-southeast-7", ap)
        .is_ok());
    assert!(CredentialProvider::IamRolesAnywhere
        .ensure_available("ap-southeast-7", ap)
        .is_err());
    assert!(CredentialProvider::IamRolesAnywhere
        .ensure_available("cn-north-1", manifest.region_data("cn-north-1"))
        .is_ok());
}
