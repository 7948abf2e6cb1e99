//! Error taxonomy shared by every pipeline of the client.

/// Failures the controller and its collaborators can report.
///
/// None of these is fatal. Each pipeline catches them at its own boundary and
/// turns them into a single user-visible message, or logs them when the
/// failure is an internal guard (`InvalidState`).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HqError {
    /// Capture permission was denied or no input device exists.
    #[error("capture device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Transport error or a non-success status from the remote service.
    #[error("network failure: {0}")]
    NetworkFailure(String),

    /// The remote answered, but the body was missing or had unexpected fields.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// An entry point was invoked outside the state it is valid in.
    #[error("invalid state: {0}")]
    InvalidState(String),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, HqError>;
