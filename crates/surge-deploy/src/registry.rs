//! Read-only view of one scaling group.
//!
//! Every accessor re-fetches from the provider: capacity and membership
//! change throughout a deployment, so nothing is cached across calls.

use surge_cloud::{AutoScalingApi, CloudError, GroupDescription, InstanceId};

/// Registry of a scaling group's members and capacity settings.
pub struct GroupRegistry<'a, A: AutoScalingApi> {
    api: &'a A,
    group: &'a str,
}

impl<'a, A: AutoScalingApi> GroupRegistry<'a, A> {
    pub fn new(api: &'a A, group: &'a str) -> Self {
        Self { api, group }
    }

    async fn describe(&self) -> Result<GroupDescription, CloudError> {
        self.api.describe_group(self.group).await
    }

    pub async fn desired_capacity(&self) -> Result<u32, CloudError> {
        Ok(self.describe().await?.desired_capacity)
    }

    pub async fn max_capacity(&self) -> Result<u32, CloudError> {
        Ok(self.describe().await?.max_capacity)
    }

    /// Current member instances, in provider order.
    pub async fn member_instance_ids(&self) -> Result<Vec<InstanceId>, CloudError> {
        Ok(self.describe().await?.instance_ids)
    }

    /// Name of the first load balancer attached to the group.
    pub async fn load_balancer_name(&self) -> Result<String, CloudError> {
        self.describe()
            .await?
            .load_balancer_names
            .first()
            .cloned()
            .ok_or_else(|| CloudError::NoLoadBalancer(self.group.to_string()))
    }

    /// Count of this group's members whose scaling lifecycle state is
    /// in-service.
    ///
    /// The provider listing is fleet-scope; it is filtered down to this
    /// group here so that healthy instances of unrelated groups never count
    /// toward a deployment target.
    pub async fn healthy_member_count(&self) -> Result<u32, CloudError> {
        let fleet = self.api.describe_scaling_instances().await?;
        Ok(fleet
            .iter()
            .filter(|inst| inst.group_name == self.group && inst.lifecycle_state.is_in_service())
            .count() as u32)
    }
}
