//! surge-cloud — provider interfaces for surge deployments.
//!
//! The deployment core consumes three provider capability traits
//! ([`AutoScalingApi`], [`ComputeApi`], [`LoadBalancerApi`]). Two
//! implementations live here:
//!
//! - [`HttpCloud`] — the gateway transport used by the `surge` binary.
//! - [`SimCloud`] — an in-memory fleet for tests and local runs.

pub mod error;
pub mod http;
pub mod provider;
pub mod sim;
pub mod types;

pub use error::{CloudError, CloudResult};
pub use http::HttpCloud;
pub use provider::{AutoScalingApi, ComputeApi, LoadBalancerApi};
pub use sim::SimCloud;
pub use types::*;
