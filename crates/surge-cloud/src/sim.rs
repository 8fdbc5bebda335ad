//! In-memory simulated provider.
//!
//! `SimCloud` implements all three capability traits against an in-memory
//! fleet. Raising a group's desired capacity launches simulated instances;
//! knobs can hold scaling-group or load-balancer health convergence to
//! exercise timeout paths. Every mutation is recorded in a log so tests can
//! assert that an aborted run left the provider untouched.
//!
//! `SimCloud` is `Clone` + `Send` + `Sync` (backed by `Arc<Mutex<..>>`) and
//! can be handed to the orchestrator and inspected concurrently.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::CloudError;
use crate::provider::{AutoScalingApi, ComputeApi, LoadBalancerApi};
use crate::types::{
    BalancerInstanceHealth, BalancerState, GroupDescription, InstanceId, LifecycleState,
    ScalingInstance, Tag,
};

/// Simulated cloud provider.
#[derive(Debug, Clone, Default)]
pub struct SimCloud {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    groups: BTreeMap<String, SimGroup>,
    instances: BTreeMap<InstanceId, SimInstance>,
    next_instance: u32,
    hold_group_health: bool,
    hold_balancer_health: bool,
    mutations: Vec<String>,
}

#[derive(Debug)]
struct SimGroup {
    desired: u32,
    max: u32,
    balancer: Option<String>,
    suspended: Vec<String>,
}

#[derive(Debug)]
struct SimInstance {
    group: String,
    lifecycle: LifecycleState,
    tags: BTreeMap<String, String>,
}

impl Inner {
    fn members(&self, group: &str) -> Vec<InstanceId> {
        self.instances
            .iter()
            .filter(|(_, inst)| inst.group == group)
            .map(|(id, _)| id.clone())
            .collect()
    }

    fn launch(&mut self, group: &str) {
        self.next_instance += 1;
        let id = format!("i-sim-{:04}", self.next_instance);
        let lifecycle = if self.hold_group_health {
            LifecycleState::Pending
        } else {
            LifecycleState::InService
        };
        self.instances.insert(
            id,
            SimInstance {
                group: group.to_string(),
                lifecycle,
                tags: BTreeMap::new(),
            },
        );
    }

    fn reconcile_capacity(&mut self, group: &str) {
        let desired = match self.groups.get(group) {
            Some(g) => g.desired,
            None => return,
        };
        let current = self.members(group).len() as u32;
        for _ in current..desired {
            self.launch(group);
        }
        // Scale-down is not automatic: retirement happens through explicit
        // instance termination, matching the deployment's Restore semantics.
    }
}

impl SimCloud {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("sim provider state lock poisoned")
    }

    /// Seed a group with `desired` in-service instances registered with
    /// `balancer`.
    pub fn add_group(&self, name: &str, desired: u32, max: u32, balancer: &str) {
        let mut inner = self.lock();
        inner.groups.insert(
            name.to_string(),
            SimGroup {
                desired,
                max,
                balancer: Some(balancer.to_string()),
                suspended: Vec::new(),
            },
        );
        for _ in 0..desired {
            inner.launch(name);
        }
    }

    /// Seed a group with no load balancer attached.
    pub fn add_group_without_balancer(&self, name: &str, desired: u32, max: u32) {
        let mut inner = self.lock();
        inner.groups.insert(
            name.to_string(),
            SimGroup {
                desired,
                max,
                balancer: None,
                suspended: Vec::new(),
            },
        );
        for _ in 0..desired {
            inner.launch(name);
        }
    }

    /// While held, newly launched instances stay in `Pending` lifecycle
    /// state instead of reaching `InService`.
    pub fn hold_group_health(&self, hold: bool) {
        self.lock().hold_group_health = hold;
    }

    /// While held, the balancer reports every registration `OutOfService`.
    pub fn hold_balancer_health(&self, hold: bool) {
        self.lock().hold_balancer_health = hold;
    }

    /// Change a group's desired capacity as an external actor would:
    /// instances launch, but nothing is written to the mutation log.
    pub fn perturb_desired_capacity(&self, group: &str, capacity: u32) {
        let mut inner = self.lock();
        if let Some(g) = inner.groups.get_mut(group) {
            g.desired = capacity;
        }
        inner.reconcile_capacity(group);
    }

    /// Every mutation issued through the provider traits, in order.
    pub fn mutations(&self) -> Vec<String> {
        self.lock().mutations.clone()
    }

    pub fn desired_capacity(&self, group: &str) -> u32 {
        self.lock().groups.get(group).map(|g| g.desired).unwrap_or(0)
    }

    pub fn member_ids(&self, group: &str) -> Vec<InstanceId> {
        self.lock().members(group)
    }

    pub fn live_instance_ids(&self) -> Vec<InstanceId> {
        self.lock().instances.keys().cloned().collect()
    }

    pub fn is_suspended(&self, group: &str, process: &str) -> bool {
        self.lock()
            .groups
            .get(group)
            .is_some_and(|g| g.suspended.iter().any(|p| p == process))
    }

    pub fn instance_tags(&self, id: &str) -> BTreeMap<String, String> {
        self.lock()
            .instances
            .get(id)
            .map(|inst| inst.tags.clone())
            .unwrap_or_default()
    }
}

impl AutoScalingApi for SimCloud {
    async fn describe_group(&self, name: &str) -> Result<GroupDescription, CloudError> {
        let inner = self.lock();
        let group = inner
            .groups
            .get(name)
            .ok_or_else(|| CloudError::GroupNotFound(name.to_string()))?;
        Ok(GroupDescription {
            name: name.to_string(),
            desired_capacity: group.desired,
            max_capacity: group.max,
            suspended_processes: group.suspended.clone(),
            load_balancer_names: group.balancer.iter().cloned().collect(),
            instance_ids: inner.members(name),
        })
    }

    async fn describe_scaling_instances(&self) -> Result<Vec<ScalingInstance>, CloudError> {
        let inner = self.lock();
        Ok(inner
            .instances
            .iter()
            .map(|(id, inst)| ScalingInstance {
                instance_id: id.clone(),
                group_name: inst.group.clone(),
                lifecycle_state: inst.lifecycle,
            })
            .collect())
    }

    async fn set_desired_capacity(
        &self,
        group: &str,
        capacity: u32,
        _honor_cooldown: bool,
    ) -> Result<(), CloudError> {
        let mut inner = self.lock();
        inner
            .mutations
            .push(format!("set_desired_capacity {group} {capacity}"));
        let g = inner
            .groups
            .get_mut(group)
            .ok_or_else(|| CloudError::GroupNotFound(group.to_string()))?;
        g.desired = capacity;
        inner.reconcile_capacity(group);
        Ok(())
    }

    async fn suspend_processes(&self, group: &str, processes: &[&str]) -> Result<(), CloudError> {
        let mut inner = self.lock();
        inner
            .mutations
            .push(format!("suspend_processes {group} {}", processes.join(",")));
        let g = inner
            .groups
            .get_mut(group)
            .ok_or_else(|| CloudError::GroupNotFound(group.to_string()))?;
        for process in processes {
            if !g.suspended.iter().any(|p| p == process) {
                g.suspended.push(process.to_string());
            }
        }
        Ok(())
    }

    async fn resume_processes(&self, group: &str, processes: &[&str]) -> Result<(), CloudError> {
        let mut inner = self.lock();
        inner
            .mutations
            .push(format!("resume_processes {group} {}", processes.join(",")));
        let g = inner
            .groups
            .get_mut(group)
            .ok_or_else(|| CloudError::GroupNotFound(group.to_string()))?;
        g.suspended.retain(|p| !processes.contains(&p.as_str()));
        Ok(())
    }
}

impl LoadBalancerApi for SimCloud {
    async fn describe_instance_health(
        &self,
        balancer: &str,
    ) -> Result<Vec<BalancerInstanceHealth>, CloudError> {
        let inner = self.lock();
        let state = if inner.hold_balancer_health {
            BalancerState::OutOfService
        } else {
            BalancerState::InService
        };
        Ok(inner
            .instances
            .iter()
            .filter(|(_, inst)| {
                inner
                    .groups
                    .get(&inst.group)
                    .is_some_and(|g| g.balancer.as_deref() == Some(balancer))
            })
            .map(|(id, _)| BalancerInstanceHealth {
                instance_id: id.clone(),
                state,
            })
            .collect())
    }
}

impl ComputeApi for SimCloud {
    async fn create_tags(&self, ids: &[InstanceId], tag: &Tag) -> Result<(), CloudError> {
        let mut inner = self.lock();
        inner.mutations.push(format!(
            "create_tags {} {}={}",
            ids.join(","),
            tag.key,
            tag.value
        ));
        for id in ids {
            let inst = inner
                .instances
                .get_mut(id)
                .ok_or_else(|| CloudError::Api(format!("unknown instance {id}")))?;
            inst.tags.insert(tag.key.clone(), tag.value.clone());
        }
        Ok(())
    }

    async fn describe_instances_by_tag(&self, tag: &Tag) -> Result<Vec<InstanceId>, CloudError> {
        let inner = self.lock();
        Ok(inner
            .instances
            .iter()
            .filter(|(_, inst)| inst.tags.get(&tag.key) == Some(&tag.value))
            .map(|(id, _)| id.clone())
            .collect())
    }

    async fn terminate_instances(&self, ids: &[InstanceId]) -> Result<(), CloudError> {
        let mut inner = self.lock();
        inner
            .mutations
            .push(format!("terminate_instances {}", ids.join(",")));
        for id in ids {
            if inner.instances.remove(id).is_none() {
                return Err(CloudError::Api(format!("unknown instance {id}")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn describe_missing_group_is_lookup_error() {
        let cloud = SimCloud::new();
        let err = cloud.describe_group("nope").await.unwrap_err();
        assert!(matches!(err, CloudError::GroupNotFound(name) if name == "nope"));
    }

    #[tokio::test]
    async fn scale_up_launches_instances() {
        let cloud = SimCloud::new();
        cloud.add_group("web", 2, 10, "web-elb");
        assert_eq!(cloud.member_ids("web").len(), 2);

        cloud.set_desired_capacity("web", 5, false).await.unwrap();
        assert_eq!(cloud.desired_capacity("web"), 5);
        assert_eq!(cloud.member_ids("web").len(), 5);
        assert_eq!(cloud.mutations(), vec!["set_desired_capacity web 5"]);
    }

    #[tokio::test]
    async fn held_group_health_launches_pending_instances() {
        let cloud = SimCloud::new();
        cloud.add_group("web", 1, 10, "web-elb");
        cloud.hold_group_health(true);
        cloud.set_desired_capacity("web", 2, false).await.unwrap();

        let fleet = cloud.describe_scaling_instances().await.unwrap();
        let in_service = fleet
            .iter()
            .filter(|i| i.lifecycle_state.is_in_service())
            .count();
        assert_eq!(fleet.len(), 2);
        assert_eq!(in_service, 1);
    }

    #[tokio::test]
    async fn balancer_health_is_scoped_to_one_balancer() {
        let cloud = SimCloud::new();
        cloud.add_group("web", 2, 10, "web-elb");
        cloud.add_group("batch", 3, 10, "batch-elb");

        let health = cloud.describe_instance_health("web-elb").await.unwrap();
        assert_eq!(health.len(), 2);
        assert!(health.iter().all(|h| h.state.is_in_service()));

        cloud.hold_balancer_health(true);
        let health = cloud.describe_instance_health("web-elb").await.unwrap();
        assert!(health.iter().all(|h| !h.state.is_in_service()));
    }

    #[tokio::test]
    async fn suspend_and_resume_processes() {
        let cloud = SimCloud::new();
        cloud.add_group("web", 1, 2, "web-elb");

        cloud
            .suspend_processes("web", &["AlarmNotification"])
            .await
            .unwrap();
        assert!(cloud.is_suspended("web", "AlarmNotification"));
        let described = cloud.describe_group("web").await.unwrap();
        assert_eq!(described.suspended_processes, vec!["AlarmNotification"]);

        cloud
            .resume_processes("web", &["AlarmNotification"])
            .await
            .unwrap();
        assert!(!cloud.is_suspended("web", "AlarmNotification"));
    }

    #[tokio::test]
    async fn tags_filter_and_termination_remove_instances() {
        let cloud = SimCloud::new();
        cloud.add_group("web", 2, 10, "web-elb");
        let members = cloud.member_ids("web");
        let tag = Tag::new("Terminate-After-Deploy", "true");

        cloud.create_tags(&members, &tag).await.unwrap();
        let mut marked = cloud.describe_instances_by_tag(&tag).await.unwrap();
        marked.sort();
        assert_eq!(marked, members);

        cloud.terminate_instances(&marked).await.unwrap();
        assert!(cloud.live_instance_ids().is_empty());
        assert!(
            cloud
                .describe_instances_by_tag(&tag)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn perturbation_is_not_logged_as_a_mutation() {
        let cloud = SimCloud::new();
        cloud.add_group("web", 2, 10, "web-elb");
        cloud.perturb_desired_capacity("web", 4);
        assert_eq!(cloud.desired_capacity("web"), 4);
        assert_eq!(cloud.member_ids("web").len(), 4);
        assert!(cloud.mutations().is_empty());
    }
}
