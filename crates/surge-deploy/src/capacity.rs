//! Capacity mutation and scaling-process suspension for one group.

use surge_cloud::{AutoScalingApi, CloudError};
use tracing::info;

/// The only automatic process suspended during a deployment: the
/// alarm-driven scaling trigger. Every other automatic process stays
/// active.
pub const SUSPENDED_PROCESSES: &[&str] = &["AlarmNotification"];

/// Write-side controller for a scaling group's capacity.
pub struct CapacityController<'a, A: AutoScalingApi> {
    api: &'a A,
    group: &'a str,
}

impl<'a, A: AutoScalingApi> CapacityController<'a, A> {
    pub fn new(api: &'a A, group: &'a str) -> Self {
        Self { api, group }
    }

    /// Whether doubling the current desired capacity stays within the
    /// group's maximum. Read-only precondition gate; mutates nothing.
    pub async fn has_capacity_to_double(&self) -> Result<bool, CloudError> {
        let description = self.api.describe_group(self.group).await?;
        Ok(description
            .desired_capacity
            .checked_mul(2)
            .is_some_and(|target| target <= description.max_capacity))
    }

    /// Set the group's desired capacity, bypassing the provider cooldown.
    /// The orchestrator paces itself through its own polling.
    pub async fn set_desired_capacity(&self, capacity: u32) -> Result<(), CloudError> {
        info!(group = %self.group, capacity, "setting desired capacity");
        self.api
            .set_desired_capacity(self.group, capacity, false)
            .await
    }

    /// Suspend the alarm-driven scaling trigger so external alarms cannot
    /// change capacity mid-deployment. Idempotent provider call.
    pub async fn suspend_automatic_scaling(&self) -> Result<(), CloudError> {
        self.api
            .suspend_processes(self.group, SUSPENDED_PROCESSES)
            .await
    }

    /// Resume the alarm-driven scaling trigger. Idempotent provider call.
    pub async fn resume_automatic_scaling(&self) -> Result<(), CloudError> {
        self.api
            .resume_processes(self.group, SUSPENDED_PROCESSES)
            .await
    }
}
