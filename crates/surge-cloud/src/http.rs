//! HTTP gateway transport for the provider capability traits.
//!
//! `HttpCloud` speaks a small JSON protocol to a provider gateway fronting
//! the cloud APIs:
//!
//! ```text
//! GET  /v1/scaling-groups/{name}                     -> GroupDescription
//! GET  /v1/scaling-instances                         -> [ScalingInstance]
//! PUT  /v1/scaling-groups/{name}/desired-capacity    <- {desired_capacity, honor_cooldown}
//! POST /v1/scaling-groups/{name}/processes/suspend   <- {processes}
//! POST /v1/scaling-groups/{name}/processes/resume    <- {processes}
//! GET  /v1/load-balancers/{name}/instance-health     -> [BalancerInstanceHealth]
//! POST /v1/instances/tags                            <- {instance_ids, tag}
//! GET  /v1/instances?tag_key=..&tag_value=..         -> [InstanceId]
//! POST /v1/instances/terminate                       <- {instance_ids}
//! ```
//!
//! The endpoint comes from `SURGE_CLOUD_ENDPOINT`; the credential profile
//! rides as the `x-cloud-profile` header and the region as a query
//! parameter on every request.

use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use crate::error::CloudError;
use crate::provider::{AutoScalingApi, ComputeApi, LoadBalancerApi};
use crate::types::{BalancerInstanceHealth, GroupDescription, InstanceId, ScalingInstance, Tag};

/// Environment variable naming the provider gateway endpoint.
pub const ENDPOINT_ENV: &str = "SURGE_CLOUD_ENDPOINT";

/// Provider client backed by the gateway's JSON API.
#[derive(Debug, Clone)]
pub struct HttpCloud {
    client: reqwest::Client,
    base: String,
    region: String,
}

impl HttpCloud {
    /// Build a client for the given credential profile and region.
    ///
    /// Fails with [`CloudError::Unavailable`] if the gateway endpoint is
    /// not configured or the transport cannot be constructed.
    pub fn connect(profile: &str, region: &str) -> Result<Self, CloudError> {
        let base = std::env::var(ENDPOINT_ENV)
            .map_err(|_| CloudError::Unavailable(format!("{ENDPOINT_ENV} is not set")))?;

        let mut headers = HeaderMap::new();
        let profile_value = HeaderValue::from_str(profile)
            .map_err(|_| CloudError::Unavailable(format!("invalid profile name '{profile}'")))?;
        headers.insert("x-cloud-profile", profile_value);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|err| CloudError::Unavailable(err.to_string()))?;

        Ok(Self {
            client,
            base: base.trim_end_matches('/').to_string(),
            region: region.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1{}", self.base, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        extra_query: &[(&str, &str)],
    ) -> Result<T, CloudError> {
        let url = self.url(path);
        debug!(%url, "provider GET");
        let response = self
            .client
            .get(&url)
            .query(&[("region", self.region.as_str())])
            .query(extra_query)
            .send()
            .await
            .map_err(|err| CloudError::Api(format!("GET {path}: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CloudError::Api(format!("GET {path}: {status}")));
        }
        response
            .json()
            .await
            .map_err(|err| CloudError::Api(format!("GET {path}: {err}")))
    }

    async fn send_json(
        &self,
        method: reqwest::Method,
        path: &str,
        body: serde_json::Value,
    ) -> Result<(), CloudError> {
        let url = self.url(path);
        debug!(%url, %method, "provider request");
        let response = self
            .client
            .request(method.clone(), &url)
            .query(&[("region", self.region.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|err| CloudError::Api(format!("{method} {path}: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CloudError::Api(format!("{method} {path}: {status}")));
        }
        Ok(())
    }
}

impl AutoScalingApi for HttpCloud {
    async fn describe_group(&self, name: &str) -> Result<GroupDescription, CloudError> {
        let path = format!("/scaling-groups/{name}");
        let url = self.url(&path);
        debug!(%url, "provider GET");
        let response = self
            .client
            .get(&url)
            .query(&[("region", self.region.as_str())])
            .send()
            .await
            .map_err(|err| CloudError::Api(format!("GET {path}: {err}")))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(CloudError::GroupNotFound(name.to_string()));
        }
        let status = response.status();
        if !status.is_success() {
            return Err(CloudError::Api(format!("GET {path}: {status}")));
        }
        response
            .json()
            .await
            .map_err(|err| CloudError::Api(format!("GET {path}: {err}")))
    }

    async fn describe_scaling_instances(&self) -> Result<Vec<ScalingInstance>, CloudError> {
        self.get_json("/scaling-instances", &[]).await
    }

    async fn set_desired_capacity(
        &self,
        group: &str,
        capacity: u32,
        honor_cooldown: bool,
    ) -> Result<(), CloudError> {
        self.send_json(
            reqwest::Method::PUT,
            &format!("/scaling-groups/{group}/desired-capacity"),
            json!({ "desired_capacity": capacity, "honor_cooldown": honor_cooldown }),
        )
        .await
    }

    async fn suspend_processes(&self, group: &str, processes: &[&str]) -> Result<(), CloudError> {
        self.send_json(
            reqwest::Method::POST,
            &format!("/scaling-groups/{group}/processes/suspend"),
            json!({ "processes": processes }),
        )
        .await
    }

    async fn resume_processes(&self, group: &str, processes: &[&str]) -> Result<(), CloudError> {
        self.send_json(
            reqwest::Method::POST,
            &format!("/scaling-groups/{group}/processes/resume"),
            json!({ "processes": processes }),
        )
        .await
    }
}

impl LoadBalancerApi for HttpCloud {
    async fn describe_instance_health(
        &self,
        balancer: &str,
    ) -> Result<Vec<BalancerInstanceHealth>, CloudError> {
        self.get_json(&format!("/load-balancers/{balancer}/instance-health"), &[])
            .await
    }
}

impl ComputeApi for HttpCloud {
    async fn create_tags(&self, ids: &[InstanceId], tag: &Tag) -> Result<(), CloudError> {
        self.send_json(
            reqwest::Method::POST,
            "/instances/tags",
            json!({ "instance_ids": ids, "tag": tag }),
        )
        .await
    }

    async fn describe_instances_by_tag(&self, tag: &Tag) -> Result<Vec<InstanceId>, CloudError> {
        self.get_json(
            "/instances",
            &[("tag_key", tag.key.as_str()), ("tag_value", tag.value.as_str())],
        )
        .await
    }

    async fn terminate_instances(&self, ids: &[InstanceId]) -> Result<(), CloudError> {
        self.send_json(
            reqwest::Method::POST,
            "/instances/terminate",
            json!({ "instance_ids": ids }),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test because both cases touch the process environment.
    #[test]
    fn connect_reads_endpoint_from_environment() {
        unsafe { std::env::remove_var(ENDPOINT_ENV) };
        let err = HttpCloud::connect("ec2", "eu-west-1").unwrap_err();
        assert!(matches!(err, CloudError::Unavailable(_)));

        unsafe { std::env::set_var(ENDPOINT_ENV, "http://gateway.internal/") };
        let cloud = HttpCloud::connect("ec2", "eu-west-1").unwrap();
        assert_eq!(
            cloud.url("/scaling-instances"),
            "http://gateway.internal/v1/scaling-instances"
        );
        unsafe { std::env::remove_var(ENDPOINT_ENV) };
    }
}
