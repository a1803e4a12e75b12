use std::path::PathBuf;
use thiserror::Error;
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("{path}: malformed session record: {reason}")]
    Format { path: PathBuf, reason: String },
    #[error("event {event}: need at least two active units, found {active}")]
    InsufficientData { event: usize, active: usize },
    #[error("cannot access {path}: {source}")]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid analysis parameters: {0}")]
    Config(String),
    #[error("failed to render plot: {0}")]
    Plot(String),
}
impl SyncError {
    pub fn format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        SyncError::Format {
            path: path.into(),
            reason: reason.into(),
        }
    }
    pub fn file_access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SyncError::FileAccess {
            path: path.into(),
            source,
        }
    }
}
impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for SyncError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        SyncError::Plot(format!("{value:?}"))
    }
}
impl From<image::ImageError> for SyncError {
    fn from(value: image::ImageError) -> Self {
        SyncError::Plot(value.to_string())
    }
}
