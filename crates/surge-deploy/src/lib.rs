//! surge-deploy — the capacity-doubling deployment core.
//!
//! Four read/write views over the provider capability traits (group
//! registry, capacity controller, balancer health view, termination
//! tagger) and the [`Orchestrator`] that sequences them into a complete
//! rolling deployment: double the fleet, wait for the new half to be
//! healthy in both the scaling group and the load balancer, retire the old
//! half, restore steady-state capacity.

pub mod balancer;
pub mod capacity;
pub mod error;
pub mod orchestrator;
pub mod registry;
pub mod tagger;

pub use balancer::BalancerHealth;
pub use capacity::CapacityController;
pub use error::{DeployError, HealthPhase};
pub use orchestrator::{DeployOptions, DeployPhase, DeployReport, Orchestrator};
pub use registry::GroupRegistry;
pub use tagger::TerminationTagger;
