//! Read-only registration-health view of one load balancer.

use surge_cloud::{CloudError, LoadBalancerApi};

/// Health view scoped to the balancer resolved for this deployment.
/// Re-fetched per call; never cached across polls.
pub struct BalancerHealth<'a, L: LoadBalancerApi> {
    api: &'a L,
    name: &'a str,
}

impl<'a, L: LoadBalancerApi> BalancerHealth<'a, L> {
    pub fn new(api: &'a L, name: &'a str) -> Self {
        Self { api, name }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    /// Count of registrations the balancer reports as in service.
    pub async fn healthy_registered_count(&self) -> Result<u32, CloudError> {
        let states = self.api.describe_instance_health(self.name).await?;
        Ok(states.iter().filter(|s| s.state.is_in_service()).count() as u32)
    }

    /// Total registrations, healthy or not.
    pub async fn registered_count(&self) -> Result<u32, CloudError> {
        Ok(self.api.describe_instance_health(self.name).await?.len() as u32)
    }
}
