use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by a conversion run. All of them are fatal.
#[derive(Error, Debug)]
pub enum Error {
    /// The input path does not exist.
    #[error("source not found: {}", path.display())]
    SourceNotFound { path: PathBuf },

    /// The decoder could not open or parse the input.
    #[error("cannot read source {}: {reason}", path.display())]
    SourceUnreadable { path: PathBuf, reason: String },

    /// The source yielded no frame to estimate a brightness range from.
    #[error("no frames available for brightness range estimation")]
    NoFramesAvailable,

    /// Conversion finished without producing a single frame.
    #[error("no frames were produced")]
    NoFramesProduced,

    /// The output artifact could not be written.
    #[error("cannot write output {}", path.display())]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A configuration value is out of range or malformed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// No usable font for the image renderer.
    #[error("font unavailable: {0}")]
    FontUnavailable(String),
}

impl Error {
    pub(crate) fn unreadable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::SourceUnreadable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn write_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::OutputWriteFailed {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
