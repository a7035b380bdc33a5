use thiserror::Error;

/// Failure to retrieve or decode one published JSON document.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("request for {location} returned status {status}")]
    Status { location: String, status: u16 },
    #[error("failed to reach {location}: {message}")]
    Transport { location: String, message: String },
    #[error("invalid JSON from {location}: {message}")]
    Parse { location: String, message: String },
    #[error("unsupported location scheme for {location}")]
    UnsupportedScheme { location: String },
}

impl FetchError {
    pub fn location(&self) -> &str {
        match self {
            Self::Status { location, .. }
            | Self::Transport { location, .. }
            | Self::Parse { location, .. }
            | Self::UnsupportedScheme { location } => location,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}

/// Errors surfaced to the user as a blocking notification.
#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("failed to load the initial study manifest: {0}")]
    InitialManifest(#[source] FetchError),
    #[error("invalid data root '{root}': {message}")]
    InvalidDataRoot { root: String, message: String },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind} value '{value}'")]
pub struct ParseSelectionError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseSelectionError {
    pub fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}
