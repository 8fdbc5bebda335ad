//! Provider-facing domain types.
//!
//! Health is reported by two independent subsystems: the scaling service
//! reports a lifecycle state per instance, and the load balancer reports a
//! registration state per instance. The two are deliberately separate types
//! so they can never be conflated — an instance can be in service to the
//! scaling group before the balancer has registered it as healthy.

use serde::{Deserialize, Serialize};

/// Opaque cloud instance identifier.
pub type InstanceId = String;

/// A scaling group as described by the provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupDescription {
    pub name: String,
    pub desired_capacity: u32,
    pub max_capacity: u32,
    /// Automatic scaling processes currently suspended on this group.
    pub suspended_processes: Vec<String>,
    /// Load balancers attached to this group; a deployment uses the first.
    pub load_balancer_names: Vec<String>,
    /// Current member instances, in provider order.
    pub instance_ids: Vec<InstanceId>,
}

/// One instance in the fleet-scope scaling-instance listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScalingInstance {
    pub instance_id: InstanceId,
    /// The scaling group this instance belongs to.
    pub group_name: String,
    pub lifecycle_state: LifecycleState,
}

/// Scaling-group lifecycle state of an instance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LifecycleState {
    InService,
    Pending,
    Terminating,
    #[serde(other)]
    Unknown,
}

impl LifecycleState {
    pub fn is_in_service(self) -> bool {
        self == LifecycleState::InService
    }
}

/// Registration health of one instance as reported by a load balancer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BalancerInstanceHealth {
    pub instance_id: InstanceId,
    pub state: BalancerState,
}

/// Load-balancer-reported registration state of an instance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BalancerState {
    InService,
    OutOfService,
    #[serde(other)]
    Unknown,
}

impl BalancerState {
    pub fn is_in_service(self) -> bool {
        self == BalancerState::InService
    }
}

/// A key/value tag on a cloud instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}
