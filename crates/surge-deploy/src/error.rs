//! Deployment error taxonomy.

use std::fmt;

use surge_cloud::CloudError;
use thiserror::Error;

/// Which health-polling phase a timeout or abort occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthPhase {
    ScalingGroup,
    LoadBalancer,
}

impl fmt::Display for HealthPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthPhase::ScalingGroup => write!(f, "scaling group"),
            HealthPhase::LoadBalancer => write!(f, "load balancer"),
        }
    }
}

/// Errors that end a deployment run.
#[derive(Debug, Error)]
pub enum DeployError {
    /// Doubling the fleet would exceed the group's maximum capacity.
    #[error(
        "not enough capacity in scaling group: doubling desired capacity {desired} to {target} exceeds max {max}"
    )]
    InsufficientCapacity { desired: u32, target: u32, max: u32 },

    /// Health convergence was not reached within the polling ceiling.
    #[error("{phase} did not report {target} healthy instances within {waited_secs}s")]
    HealthCheckTimeout {
        phase: HealthPhase,
        target: u32,
        waited_secs: u64,
    },

    /// The operator aborted the run during a polling phase.
    #[error("deployment aborted during the {phase} health check")]
    Aborted { phase: HealthPhase },

    /// An underlying provider call failed.
    #[error(transparent)]
    Cloud(#[from] CloudError),
}
