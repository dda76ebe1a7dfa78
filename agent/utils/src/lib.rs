/*!

`agent-utils` is a collection of functions shared by `nodeadm` and the e2e sweeper.
`aws` sets up the AWS SDK config and classifies SDK errors, `retry` runs bounded retries for
eventually-consistent AWS APIs, and `manifest` loads the release manifest.

!*/

use constants::DEFAULT_AGENT_LEVEL_FILTER;
use env_logger::Builder;
pub use error::{Error, Result};
use log::LevelFilter;
use snafu::ResultExt;
use std::path::Path;
use std::{env, fs};

pub mod aws;
pub mod constants;
mod error;
pub mod manifest;
pub mod retry;

/// Decode base64 blob and write to a file at the specified path, creating parent directories.
pub fn base64_decode_write_file(
    base64_content: &str,
    path_to_write_to: &Path,
) -> Result<()> {
    let decoded_bytes =
        base64::decode(base64_content.as_bytes()).context(error::Base64DecodeSnafu)?;
    write_file(path_to_write_to, decoded_bytes)
}

/// Write `contents` to `path`, creating parent directories.
pub fn write_file<C: AsRef<[u8]>>(path: &Path, contents: C) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context(error::WriteFileSnafu {
            path: parent.display().to_string(),
        })?;
    }
    fs::write(path, contents).context(error::WriteFileSnafu {
        path: path.display().to_string(),
    })
}

/// Extract the value of `RUST_LOG` if it exists, otherwise log this application at
/// `DEFAULT_AGENT_LEVEL_FILTER`.
pub fn init_agent_logger(bin_crate: &str, log_level: Option<LevelFilter>) {
    match env::var(env_logger::DEFAULT_FILTER_ENV).ok() {
        Some(_) => {
            // RUST_LOG exists; env_logger will use it.
            Builder::from_default_env().init();
        }
        None => {
            // RUST_LOG does not exist; use default log level except AWS SDK.
            let log_level = log_level.unwrap_or(DEFAULT_AGENT_LEVEL_FILTER);
            Builder::new()
                // Set log level to Error for crates other than our own.
                .filter_level(LevelFilter::Error)
                // Set all of our crates to the desired level.
                .filter(Some(bin_crate), log_level)
                .filter(Some("agent_utils"), log_level)
                .filter(Some("hybrid_model"), log_level)
                .filter(Some("hybrid_sweeper"), log_level)
                .init();
        }
    }
}

/// Implement `Display` using `serde_json` `to_string_pretty` for types that implement Serialize.
#[macro_export]
macro_rules! impl_display_as_json {
    ($i:ident) => {
        impl std::fmt::Display for $i {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let s = serde_json::to_string_pretty(self)
                    .unwrap_or_else(|e| format!("Serialization failed: {}", e));
                std::fmt::Display::fmt(&s, f)
            }
        }
    };
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn decode_and_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pki").join("ca.crt");
        base64_decode_write_file("aGVsbG8gY2E=", &path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello ca");
        assert!(base64_decode_write_file("not base64!", &path).is_err());
    }
}
