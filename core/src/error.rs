use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Invalid module name pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid reference type '{kind}'. Supported types: {supported}")]
    UnknownReferenceKind { kind: String, supported: String },

    #[error("Invalid module filter '{category}'. Supported filters: {supported}")]
    UnknownCategory { category: String, supported: String },

    #[error("Invalid URL template for '{kind}': {reason}")]
    InvalidTemplate { kind: String, reason: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Invalid YAML syntax in {}: {message}", file.display())]
    YamlSyntaxError {
        file: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Validation error in config file '{}':\n{}", file.display(), .errors.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation { file: PathBuf, errors: Vec<String> },

    #[error("Module catalog error: {message}")]
    Catalog { message: String },

    #[error("Manifest parsing error in {}: {message}", file.display())]
    ManifestParse { file: PathBuf, message: String },

    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("HTTP client error: {source}")]
    HttpClient {
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to save results to {}: {source}", path.display())]
    Sink {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, AuditError>;
