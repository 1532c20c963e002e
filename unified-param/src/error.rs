//! Error and outcome types for the parameter subsystem.

use crate::value::ParameterType;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("parameter '{0}' not registered")]
    NotFound(String),

    #[error("value rejected by validator for '{0}'")]
    ValidationRejected(String),

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: ParameterType,
        found: ParameterType,
    },

    #[error("invalid parameter path '{0}'")]
    InvalidPath(String),

    #[error("path '{0}' conflicts with an existing node")]
    PathConflict(String),

    #[error("no property bound to '{0}'")]
    UnknownProperty(String),

    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Custom(String),
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Self::Custom(msg)
    }
}

/// Outcome of a single write or scheduling request.
///
/// Writes never panic on bad input; the caller gets one of these instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum UpdateOutcome {
    Applied,
    NotFound,
    ValidationRejected,
    Throttled,
}

impl UpdateOutcome {
    pub fn is_applied(self) -> bool {
        self == Self::Applied
    }

    /// Convert into a `Result`, mapping every non-applied outcome to an error
    /// that names `path`. `Throttled` still counts as success: the value was
    /// stored, only the refresh was skipped.
    pub fn into_result(self, path: &str) -> Result<()> {
        match self {
            Self::Applied | Self::Throttled => Ok(()),
            Self::NotFound => Err(Error::NotFound(path.to_string())),
            Self::ValidationRejected => Err(Error::ValidationRejected(path.to_string())),
        }
    }
}
