//! Error types for tidemark-analysis

use std::path::PathBuf;

use thiserror::Error;
use tidemark_cloud::CloudError;

/// Errors that end a session.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Boundary dataset missing, unreadable, in an unsupported CRS, or empty
    /// after clipping.
    #[error("boundary data unavailable at {}: {reason}", path.display())]
    DataUnavailable { path: PathBuf, reason: String },

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] tidemark_core::Error),

    #[error(transparent)]
    Cloud(CloudError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

impl AnalysisError {
    pub fn is_auth(&self) -> bool {
        matches!(self, AnalysisError::Authentication(_))
    }
}

/// Rejected credentials surface as `Authentication`, everything else as `Cloud`.
impl From<CloudError> for AnalysisError {
    fn from(e: CloudError) -> Self {
        match e {
            CloudError::Auth(msg) => AnalysisError::Authentication(msg),
            other => AnalysisError::Cloud(other),
        }
    }
}

/// Failure to classify one year. The session turns these into placeholder
/// results, except for authentication failures.
#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("no scenes for {year} with cloud cover below {max_cloud}%")]
    NoScenes { year: i32, max_cloud: f64 },

    #[error("none of the {attempted} scenes for {year} could be read")]
    NoReadableScenes { year: i32, attempted: usize },

    #[error(transparent)]
    Source(#[from] AnalysisError),

    #[error(transparent)]
    Core(#[from] tidemark_core::Error),
}

impl ClassifyError {
    pub fn is_auth(&self) -> bool {
        matches!(self, ClassifyError::Source(e) if e.is_auth())
    }
}

impl From<CloudError> for ClassifyError {
    fn from(e: CloudError) -> Self {
        ClassifyError::Source(e.into())
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cloud_auth_maps_to_authentication() {
        let e: AnalysisError = CloudError::Auth("HTTP 401".into()).into();
        assert!(e.is_auth());

        let e: AnalysisError = CloudError::BBoxOutside.into();
        assert!(matches!(e, AnalysisError::Cloud(CloudError::BBoxOutside)));
    }

    #[test]
    fn classify_error_keeps_auth_visible() {
        let e: ClassifyError = CloudError::Auth("signing".into()).into();
        assert!(e.is_auth());
        assert!(!ClassifyError::NoScenes { year: 2015, max_cloud: 10.0 }.is_auth());
    }
}
