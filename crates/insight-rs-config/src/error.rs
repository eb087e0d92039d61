use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A config file or directory could not be read.
    #[error("failed to read {}: {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A layer is not valid JSON5.
    #[error("failed to parse config layer {layer}: {source}")]
    ParseFailed {
        layer: String,
        #[source]
        source: json5::Error,
    },
    /// The merged config did not decode into `InsightConfig`.
    #[error("config does not match the model: {0}")]
    DecodeFailed(#[from] serde_json::Error),
    /// A specific field failed validation, located as `layer:path`.
    #[error("{path}: {message}")]
    InvalidField { path: String, message: String },
    /// A value is well-typed but unusable, such as a zero buffer capacity.
    #[error("config rejected: {0}")]
    Invalid(String),
}
