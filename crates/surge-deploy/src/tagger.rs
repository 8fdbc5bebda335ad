//! Instance lifecycle tagging.
//!
//! The termination marker is deployment-scoped bookkeeping: it records
//! which instances predate the deployment so the retire step can select
//! its targets by tag instead of tracking IDs in memory. A marker left by
//! an earlier aborted run is simply re-applied, never assumed cleared.

use surge_cloud::{CloudError, ComputeApi, InstanceId, Tag};
use tracing::{debug, warn};

/// Marker applied to instances that predate the deployment.
pub fn termination_marker() -> Tag {
    Tag::new("Terminate-After-Deploy", "true")
}

/// Applies and consumes the termination marker on cloud instances.
pub struct TerminationTagger<'a, C: ComputeApi> {
    api: &'a C,
}

impl<'a, C: ComputeApi> TerminationTagger<'a, C> {
    pub fn new(api: &'a C) -> Self {
        Self { api }
    }

    /// Apply the termination marker to `ids`. Idempotent; a no-op for an
    /// empty set.
    pub async fn mark_for_termination(&self, ids: &[InstanceId]) -> Result<(), CloudError> {
        if ids.is_empty() {
            debug!("no instances to mark for termination");
            return Ok(());
        }
        self.api.create_tags(ids, &termination_marker()).await
    }

    /// Instances currently carrying the termination marker.
    ///
    /// A failed lookup is reported as an empty set: late in a run, "nothing
    /// carries the marker" is a valid state and must not fail the deploy.
    pub async fn marked_for_termination(&self) -> Vec<InstanceId> {
        match self.api.describe_instances_by_tag(&termination_marker()).await {
            Ok(ids) => ids,
            Err(err) => {
                warn!(error = %err, "marker lookup failed; treating as no instances marked");
                Vec::new()
            }
        }
    }

    /// Terminate exactly `ids`. A no-op for an empty set; otherwise this is
    /// the irreversible step of the deployment.
    pub async fn terminate(&self, ids: &[InstanceId]) -> Result<(), CloudError> {
        if ids.is_empty() {
            debug!("no instances marked for termination");
            return Ok(());
        }
        self.api.terminate_instances(ids).await
    }
}
