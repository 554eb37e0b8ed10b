use std::fmt;

use thiserror::Error;

/// Server error code for "There is no such grant defined for user".
const NO_SUCH_GRANT_CODE: u16 = 1141;

/// Failure reported by the [`Connection`](crate::Connection) collaborator.
///
/// Covers network, authentication and syntax failures alike; the engine never
/// inspects it beyond [`ConnectionError::is_missing_grant`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ConnectionError {
    pub message: String,
    pub code: Option<u16>,
}

impl ConnectionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: u16) -> Self {
        self.code = Some(code);
        self
    }

    /// True when the server refused a revoke because no matching grant exists.
    pub fn is_missing_grant(&self) -> bool {
        if self.code == Some(NO_SUCH_GRANT_CODE) {
            return true;
        }
        self.message
            .to_ascii_lowercase()
            .contains("there is no such grant defined")
    }
}

/// Which half of the two-step teardown failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevokeStage {
    GrantOption,
    Privileges,
}

impl fmt::Display for RevokeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevokeStage::GrantOption => write!(f, "grant_option"),
            RevokeStage::Privileges => write!(f, "privileges"),
        }
    }
}

/// Errors surfaced by the grant reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrantError {
    #[error("invalid grant spec: {0}")]
    InvalidSpec(String),
    #[error("grant apply failed: {cause}")]
    ApplyFailed {
        #[source]
        cause: ConnectionError,
    },
    #[error("grant revoke failed at stage {stage}: {cause}")]
    RevokeFailed {
        stage: RevokeStage,
        #[source]
        cause: ConnectionError,
    },
}

impl GrantError {
    /// True when the grant option was already revoked but the privileges were not.
    pub fn is_partial_revoke(&self) -> bool {
        matches!(
            self,
            GrantError::RevokeFailed {
                stage: RevokeStage::Privileges,
                ..
            }
        )
    }
}

pub type Result<T, E = GrantError> = std::result::Result<T, E>;
