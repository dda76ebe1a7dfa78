use aws_sdk_sts::error::GetCallerIdentityError;
use aws_sdk_sts::types::SdkError;
use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
#[allow(clippy::large_enum_variant)]
pub enum Error {
    #[snafu(display("Failed to decode base64 blob: {}", source))]
    Base64Decode { source: base64::DecodeError },

    #[snafu(display("Unable to get caller identity: {}", source))]
    CallerIdentity {
        source: SdkError<GetCallerIdentityError>,
    },

    #[snafu(display("Refusing to fetch manifest over plain http: '{}'", url))]
    InsecureManifestUrl { url: String },

    #[snafu(display("Invalid release manifest from '{}': {}", from, source))]
    Manifest {
        from: String,
        source: hybrid_model::Error,
    },

    #[snafu(display("Unable to request release manifest '{}': {}", url, source))]
    ManifestRequest { url: String, source: reqwest::Error },

    #[snafu(display("{} was missing from {}", what, from))]
    Missing { what: String, from: String },

    #[snafu(display("Unable to determine partition: {}", source))]
    Partition { source: hybrid_model::Error },

    #[snafu(display("Failed to read file at '{}': {}", path, source))]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    #[snafu(display("Failed to write file at '{}': {}", path, source))]
    WriteFile {
        path: String,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
