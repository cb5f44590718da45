use derive_more::Display;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Display, Clone, PartialEq)]
pub enum SError {
    #[display("Parse error: {_0}")]
    ParseError(String),
    #[display("IO error: {_0}")]
    IOError(String),
    #[display("Archive error: {_0}")]
    ArchiveError(String),
    #[display("Network error: {_0}")]
    NetworkError(String),
    #[display("Package not found or corrupt: {_0}")]
    PackageNotFound(String),
    #[display("Package manifest missing: {_0}")]
    ManifestMissing(String),
    #[display("Invalid value for '{_0}': {_1}")]
    InvalidField(String, String),
    #[display("Invalid build step: {_0}")]
    InvalidStep(String),
    #[display("Mod not found: {_0}")]
    ModNotFound(String),
    #[display("File or directory not found: {_0}")]
    FileOrDirectoryNotFound(String),
    #[display("Config error: {_0}")]
    ConfigError(String),
    #[display("Status channel closed: {_0}")]
    UpdateStatusError(String),
    #[display("No status channel bound to the current task")]
    ContextUnprovided,
    #[display("Async runtime error: {_0}")]
    AsyncRuntimeError(String),
    #[display("Operation cancelled")]
    OperationCancelled,
    #[display("Unexpected error: {_0:?}")]
    Unexpected(Option<String>),
}

impl std::error::Error for SError {}

impl From<std::io::Error> for SError {
    fn from(e: std::io::Error) -> Self {
        SError::IOError(e.to_string())
    }
}

impl From<serde_json::Error> for SError {
    fn from(e: serde_json::Error) -> Self {
        SError::ParseError(e.to_string())
    }
}

impl From<zip::result::ZipError> for SError {
    fn from(e: zip::result::ZipError) -> Self {
        SError::ArchiveError(e.to_string())
    }
}

impl From<reqwest::Error> for SError {
    fn from(e: reqwest::Error) -> Self {
        SError::NetworkError(e.to_string())
    }
}

impl From<walkdir::Error> for SError {
    fn from(e: walkdir::Error) -> Self {
        SError::IOError(e.to_string())
    }
}

impl From<std::path::StripPrefixError> for SError {
    fn from(e: std::path::StripPrefixError) -> Self {
        SError::ParseError(e.to_string())
    }
}

impl From<camino::FromPathBufError> for SError {
    fn from(e: camino::FromPathBufError) -> Self {
        SError::ParseError(format!("Invalid UTF-8 path: {e}"))
    }
}

impl From<confy::ConfyError> for SError {
    fn from(e: confy::ConfyError) -> Self {
        SError::ConfigError(e.to_string())
    }
}

impl From<tokio::task::JoinError> for SError {
    fn from(e: tokio::task::JoinError) -> Self {
        SError::AsyncRuntimeError(e.to_string())
    }
}
