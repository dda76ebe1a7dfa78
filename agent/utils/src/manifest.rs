use crate::error::{self, Result};
use hybrid_model::Manifest;
use log::info;
use snafu::{ensure, ResultExt};

/// Load the release manifest from an `https://` URL or a local path. Paths may carry a `file://`
/// prefix. Plain `http://` URLs are rejected.
pub async fn fetch_manifest(location: &str) -> Result<Manifest> {
    ensure!(
        !location.starts_with("http://"),
        error::InsecureManifestUrlSnafu { url: location }
    );
    let yaml = if location.starts_with("https://") {
        info!("Fetching release manifest from '{}'", location);
        reqwest::get(location)
            .await
            .and_then(|response| response.error_for_status())
            .context(error::ManifestRequestSnafu { url: location })?
            .text()
            .await
            .context(error::ManifestRequestSnafu { url: location })?
    } else {
        let path = location.strip_prefix("file://").unwrap_or(location);
        info!("Reading release manifest from '{}'", path);
        tokio::fs::read_to_string(path)
            .await
            .context(error::ReadFileSnafu { path })?
    };
    Manifest::from_yaml_str(yaml).context(error::ManifestSnafu { from: location })
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    const MANIFEST: &str = r#"
supported_eks_releases:
  - major_minor_version: "1.30"
    latest_patch_version: "1.30.2"
region_config:
  cn-north-1:
    ecr_account_id: "111122223333"
"#;

    #[tokio::test]
    async fn local_manifest() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MANIFEST.as_bytes()).unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let manifest = fetch_manifest(&path).await.unwrap();
        assert_eq!(manifest.supported_eks_releases.len(), 1);

        let manifest = fetch_manifest(&format!("file://{}", path)).await.unwrap();
        assert!(manifest.region_data("cn-north-1").is_some());
    }

    #[tokio::test]
    async fn rejected_manifests() {
        assert!(fetch_manifest("http://example.com/manifest.yaml")
            .await
            .is_err());
        assert!(fetch_manifest("/does/not/exist/manifest.yaml")
            .await
            .is_err());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"supported_eks_releases: {").unwrap();
        let path = file.path().to_str().unwrap();
        let err = fetch_manifest(path).await.unwrap_err();
        assert!(matches!(err, crate::Error::Manifest { .. }));
        assert!(err.to_string().contains(path));
    }
}
