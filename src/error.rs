//! Error types for openskynet.

use crate::window::Window;

/// Result type alias for openskynet operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error returned by external collaborators (raster readers, tile
/// services, inference backends, feature sinks).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Coarse classification of an [`Error`], used to decide how a failure is
/// reported and which stage it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Invalid sizing, thresholds, or an empty region of interest. Raised
    /// before any window is dispatched.
    Configuration,
    /// The image source cannot be opened or is not georeferenced.
    SourceAccess,
    /// A fetch or inference call failed for a single window.
    WindowIo,
    /// The output sink failed.
    Write,
    /// The run was interrupted.
    Cancelled,
    /// Anything else (I/O on auxiliary files, internal failures).
    Other,
}

/// Stage of the per-window chain in which a [`Error::WindowIo`] occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowStage {
    /// Pixel fetch from the image source.
    Fetch,
    /// Model inference.
    Inference,
}

impl std::fmt::Display for WindowStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch => write!(f, "fetch"),
            Self::Inference => write!(f, "inference"),
        }
    }
}

/// Top-level error type for openskynet.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration directory could not be determined.
    #[error("could not determine configuration directory for this platform")]
    ConfigDirNotFound,

    /// Failed to read configuration file.
    #[error("failed to read config file '{path}'")]
    ConfigRead {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration file.
    #[error("failed to parse config file '{path}'")]
    ConfigParse {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// Failed to write configuration file.
    #[error("failed to write config file '{path}'")]
    ConfigWrite {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize configuration.
    #[error("failed to serialize config")]
    ConfigSerialize {
        /// Underlying serialization error.
        #[source]
        source: toml::ser::Error,
    },

    /// Configuration is invalid (sizes, thresholds, bounding box, ...).
    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        /// Description of the validation failure.
        message: String,
    },

    /// The region of interest does not intersect the image.
    #[error("region of interest {region} does not intersect the image extent")]
    EmptyRegion {
        /// Human-readable description of the requested region.
        region: String,
    },

    /// Failed to open or georeference the image source.
    #[error("cannot access image source: {reason}")]
    SourceAccess {
        /// Description of the failure.
        reason: String,
    },

    /// Failed to open a local raster file.
    #[error("failed to open image '{path}'")]
    ImageOpen {
        /// Path to the image file.
        path: std::path::PathBuf,
        /// Underlying error.
        #[source]
        source: BoxError,
    },

    /// Failed to build the inference client.
    #[error("failed to build classifier: {reason}")]
    ClassifierBuild {
        /// Description of the build failure.
        reason: String,
    },

    /// Failed to read the model labels file.
    #[error("failed to read labels file '{path}'")]
    LabelsRead {
        /// Path to the labels file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A pixel fetch or inference call failed for one window. Aborts the run.
    #[error("{stage} failed for window {window}")]
    WindowIo {
        /// The window being processed.
        window: Window,
        /// Stage that failed.
        stage: WindowStage,
        /// Underlying collaborator error.
        #[source]
        source: BoxError,
    },

    /// The output sink failed.
    #[error("failed to write output '{path}'")]
    Write {
        /// Output location.
        path: std::path::PathBuf,
        /// Underlying error.
        #[source]
        source: BoxError,
    },

    /// The run was cancelled (Ctrl+C).
    #[error("processing cancelled")]
    Cancelled,

    /// Internal error (for unexpected failures).
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl Error {
    /// Shorthand for an [`Error::InvalidConfiguration`].
    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Classify this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigDirNotFound
            | Self::ConfigRead { .. }
            | Self::ConfigParse { .. }
            | Self::InvalidConfiguration { .. }
            | Self::EmptyRegion { .. } => ErrorCategory::Configuration,
            Self::SourceAccess { .. } | Self::ImageOpen { .. } => ErrorCategory::SourceAccess,
            Self::WindowIo { .. } => ErrorCategory::WindowIo,
            Self::Write { .. } => ErrorCategory::Write,
            Self::Cancelled => ErrorCategory::Cancelled,
            Self::Io(_)
            | Self::ConfigWrite { .. }
            | Self::ConfigSerialize { .. }
            | Self::ClassifierBuild { .. }
            | Self::LabelsRead { .. }
            | Self::Internal { .. } => ErrorCategory::Other,
        }
    }
}
