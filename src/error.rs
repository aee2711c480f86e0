use crate::filter::FilterKey;
use crate::types::Platform;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong in the controller and its collaborators.
///
/// None of these are fatal: every error path leaves the controller in a
/// state the user can resume from.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("required filter '{field}' is not set for platform '{platform}'")]
    MissingRequiredFilter { platform: Platform, field: FilterKey },

    #[error("platform '{0}' does not support tailing")]
    TailingUnsupported(Platform),

    #[error("log fetch failed: {detail}")]
    FetchFailed { detail: String },

    #[error("authentication required")]
    AuthRequired,

    #[error("log stream error: {detail}")]
    StreamError { detail: String },

    #[error("unsupported export format '{0}'")]
    UnsupportedFormat(String),

    /// Recovered locally: the offending message is dropped and logged,
    /// the tail session stays active.
    #[error("malformed stream message")]
    MalformedStreamMessage(#[source] serde_json::Error),

    #[error("io error")]
    Io(#[from] std::io::Error),
}
