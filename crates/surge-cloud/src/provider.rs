//! Provider capability traits.
//!
//! One trait per provider service the deployment consumes: the scaling
//! service, the compute service, and the load-balancer service. `HttpCloud`
//! implements all three over the gateway transport; `SimCloud` implements
//! them in memory for tests and local runs.

use crate::error::CloudError;
use crate::types::{BalancerInstanceHealth, GroupDescription, InstanceId, ScalingInstance, Tag};

/// Scaling-service operations: group description, fleet-scope instance
/// listing, capacity mutation, and scaling-process suspension.
#[allow(async_fn_in_trait)]
pub trait AutoScalingApi {
    /// Describe one scaling group by name.
    async fn describe_group(&self, name: &str) -> Result<GroupDescription, CloudError>;

    /// List scaling instances across the whole fleet visible to the
    /// credential, with their lifecycle states.
    async fn describe_scaling_instances(&self) -> Result<Vec<ScalingInstance>, CloudError>;

    /// Set a group's desired capacity. `honor_cooldown: false` bypasses the
    /// provider's scaling cooldown.
    async fn set_desired_capacity(
        &self,
        group: &str,
        capacity: u32,
        honor_cooldown: bool,
    ) -> Result<(), CloudError>;

    /// Suspend the named automatic scaling processes on a group.
    async fn suspend_processes(&self, group: &str, processes: &[&str]) -> Result<(), CloudError>;

    /// Resume the named automatic scaling processes on a group.
    async fn resume_processes(&self, group: &str, processes: &[&str]) -> Result<(), CloudError>;
}

/// Load-balancer-service operations. Read-only: registration itself is the
/// balancer's own side effect of scaling-group membership changes.
#[allow(async_fn_in_trait)]
pub trait LoadBalancerApi {
    /// Per-instance registration health for one load balancer.
    async fn describe_instance_health(
        &self,
        balancer: &str,
    ) -> Result<Vec<BalancerInstanceHealth>, CloudError>;
}

/// Compute-service operations used for instance lifecycle bookkeeping.
#[allow(async_fn_in_trait)]
pub trait ComputeApi {
    /// Apply `tag` to each instance. Re-applying an existing tag is a no-op.
    async fn create_tags(&self, ids: &[InstanceId], tag: &Tag) -> Result<(), CloudError>;

    /// Instances currently carrying `tag`. An empty result is not an error.
    async fn describe_instances_by_tag(&self, tag: &Tag) -> Result<Vec<InstanceId>, CloudError>;

    /// Request termination of the given instances.
    async fn terminate_instances(&self, ids: &[InstanceId]) -> Result<(), CloudError>;
}
