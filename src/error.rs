use thiserror::Error;

use crate::data::ValidationError;

/// Failures surfaced by the catalog client.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The remote catalog could not be reached at all (connect refused, DNS, timeout).
    #[error("no connection to the catalog: {0}")]
    Connectivity(String),

    /// The remote answered, or the exchange failed for a reason other than reachability.
    #[error("catalog request failed (status={status:?}): {}", .message.as_deref().unwrap_or("no message"))]
    Remote {
        status: Option<u16>,
        message: Option<String>,
    },

    #[error("local store read failed: {0}")]
    LocalRead(String),

    #[error("local store write failed: {0}")]
    LocalWrite(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("image staging failed: {0}")]
    Image(String),
}

impl CatalogError {
    pub fn is_connectivity(&self) -> bool {
        matches!(self, CatalogError::Connectivity(_))
    }

    /// Message carried by a remote failure, if the remote gave one.
    pub fn remote_message(&self) -> Option<&str> {
        match self {
            CatalogError::Remote { message, .. } => {
                message.as_deref().filter(|m| !m.trim().is_empty())
            }
            _ => None,
        }
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            return CatalogError::Connectivity(err.to_string());
        }
        CatalogError::Remote {
            status: err.status().map(|s| s.as_u16()),
            message: Some(err.to_string()),
        }
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;
