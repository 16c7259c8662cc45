//! Network error types.

use thiserror::Error;

/// Outcomes of a failed network action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum NetworkError {
    /// Link did not come up within the join timeout
    #[error("timed out joining network")]
    Timeout,
    /// Credential file missing or malformed
    #[error("bad or missing credentials")]
    BadCredentials,
    /// Credentials could not be fetched from storage
    #[error("storage unavailable for credentials")]
    StorageUnavailable,
    /// Network not found
    #[error("network not found")]
    NoNetwork,
    /// Radio failed to initialize
    #[error("could not initialize radio")]
    HardwareInitFailed,
    /// Radio refused to start or complete the association
    #[error("could not start connection")]
    AssociationFailed,
    /// Access point rejected the credentials
    #[error("authentication failed")]
    AuthenticationFailed,
}
