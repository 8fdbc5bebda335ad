//! Error type for provider operations.

use thiserror::Error;

/// Result type alias for provider operations.
pub type CloudResult<T> = Result<T, CloudError>;

/// Errors surfaced by a cloud provider implementation.
#[derive(Debug, Error)]
pub enum CloudError {
    /// The provider transport could not be constructed at all.
    #[error("cloud provider unavailable: {0}")]
    Unavailable(String),

    /// The named scaling group does not exist.
    #[error("scaling group not found: {0}")]
    GroupNotFound(String),

    /// The scaling group has no load balancer attached.
    #[error("no load balancer attached to scaling group {0}")]
    NoLoadBalancer(String),

    /// Any other provider call failure.
    #[error("provider api error: {0}")]
    Api(String),
}
