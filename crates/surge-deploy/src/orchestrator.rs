//! Deployment orchestrator — the capacity-doubling state machine.
//!
//! A run walks nine strictly sequential states:
//!
//! Preflight → Mark → Freeze → Double → AwaitGroupHealth →
//! AwaitBalancerHealth → Retire → Restore → Unfreeze
//!
//! The two health waits poll at a fixed interval against a fixed cumulative
//! ceiling; elapsed time is accumulated in interval increments rather than
//! checked against a deadline timestamp. The target capacity is captured
//! once when the group is doubled and never re-derived mid-poll, so an
//! externally perturbed desired capacity cannot move the goalposts.
//!
//! There is no rollback: a timeout exits with the group still frozen and
//! doubled, and once Retire has terminated the old instances the cutover
//! is irreversible.

use std::fmt;
use std::time::Duration;

use surge_cloud::{AutoScalingApi, CloudError, ComputeApi, InstanceId, LoadBalancerApi};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::balancer::BalancerHealth;
use crate::capacity::CapacityController;
use crate::error::{DeployError, HealthPhase};
use crate::registry::GroupRegistry;
use crate::tagger::TerminationTagger;

/// The nine states of a deployment run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployPhase {
    Preflight,
    Mark,
    Freeze,
    Double,
    AwaitGroupHealth,
    AwaitBalancerHealth,
    Retire,
    Restore,
    Unfreeze,
}

impl fmt::Display for DeployPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeployPhase::Preflight => "preflight",
            DeployPhase::Mark => "mark",
            DeployPhase::Freeze => "freeze",
            DeployPhase::Double => "double",
            DeployPhase::AwaitGroupHealth => "await-group-health",
            DeployPhase::AwaitBalancerHealth => "await-balancer-health",
            DeployPhase::Retire => "retire",
            DeployPhase::Restore => "restore",
            DeployPhase::Unfreeze => "unfreeze",
        };
        write!(f, "{name}")
    }
}

/// Polling knobs for the two health waits.
#[derive(Debug, Clone, Copy)]
pub struct DeployOptions {
    /// Fixed sleep between health polls.
    pub poll_interval: Duration,
    /// Cumulative wait ceiling per polling phase.
    pub health_timeout: Duration,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            health_timeout: Duration::from_secs(900),
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployReport {
    pub original_capacity: u32,
    pub target_capacity: u32,
    /// Instances retired at the end of the run.
    pub terminated: Vec<InstanceId>,
}

/// Drives one capacity-doubling deployment of a single scaling group.
pub struct Orchestrator<'a, A, C, L>
where
    A: AutoScalingApi,
    C: ComputeApi,
    L: LoadBalancerApi,
{
    scaling: &'a A,
    compute: &'a C,
    balancers: &'a L,
    group: String,
    opts: DeployOptions,
}

impl<'a, A, C, L> Orchestrator<'a, A, C, L>
where
    A: AutoScalingApi,
    C: ComputeApi,
    L: LoadBalancerApi,
{
    pub fn new(scaling: &'a A, compute: &'a C, balancers: &'a L, group: &str) -> Self {
        Self {
            scaling,
            compute,
            balancers,
            group: group.to_string(),
            opts: DeployOptions::default(),
        }
    }

    pub fn with_options(mut self, opts: DeployOptions) -> Self {
        self.opts = opts;
        self
    }

    /// Run the deployment to completion.
    ///
    /// A signal on `abort` cancels the run at the next polling suspension
    /// point; phases outside the two health waits are not interruptible.
    pub async fn run(
        &self,
        mut abort: watch::Receiver<bool>,
    ) -> Result<DeployReport, DeployError> {
        let registry = GroupRegistry::new(self.scaling, &self.group);
        let controller = CapacityController::new(self.scaling, &self.group);
        let tagger = TerminationTagger::new(self.compute);

        // Preflight: resolve the attached balancer, then gate on headroom
        // before any state is touched.
        info!(group = %self.group, phase = %DeployPhase::Preflight, "starting deployment");
        let balancer_name = registry.load_balancer_name().await?;
        let balancer = BalancerHealth::new(self.balancers, &balancer_name);
        if !controller.has_capacity_to_double().await? {
            let desired = registry.desired_capacity().await?;
            let max = registry.max_capacity().await?;
            error!(
                group = %self.group,
                desired,
                max,
                "not enough capacity in scaling group for deployment"
            );
            return Err(DeployError::InsufficientCapacity {
                desired,
                target: desired.saturating_mul(2),
                max,
            });
        }

        // Mark: remember who predates the deployment, by tag rather than
        // in-memory bookkeeping.
        let original = registry.desired_capacity().await?;
        info!(
            group = %self.group,
            phase = %DeployPhase::Mark,
            original_capacity = original,
            "marking existing instances for post-deployment termination"
        );
        let existing = registry.member_instance_ids().await?;
        tagger.mark_for_termination(&existing).await?;

        // Freeze: no external alarm may move capacity mid-run.
        info!(group = %self.group, phase = %DeployPhase::Freeze, "suspending automatic scaling");
        controller.suspend_automatic_scaling().await?;

        // Double. The target is fixed here for both health waits.
        let target = original * 2;
        info!(group = %self.group, phase = %DeployPhase::Double, target, "doubling scaling group capacity");
        controller.set_desired_capacity(target).await?;

        self.await_healthy(
            HealthPhase::ScalingGroup,
            target,
            async || registry.healthy_member_count().await,
            &mut abort,
        )
        .await?;

        self.await_healthy(
            HealthPhase::LoadBalancer,
            target,
            async || balancer.healthy_registered_count().await,
            &mut abort,
        )
        .await?;

        // Retire: the irreversible step. An empty marked set is a no-op.
        info!(group = %self.group, phase = %DeployPhase::Retire, "terminating previous instances");
        let terminated = tagger.marked_for_termination().await;
        tagger.terminate(&terminated).await?;

        info!(
            group = %self.group,
            phase = %DeployPhase::Restore,
            original_capacity = original,
            "restoring original desired capacity"
        );
        controller.set_desired_capacity(original).await?;

        info!(group = %self.group, phase = %DeployPhase::Unfreeze, "resuming automatic scaling");
        controller.resume_automatic_scaling().await?;

        info!(group = %self.group, terminated = terminated.len(), "deployment complete");
        Ok(DeployReport {
            original_capacity: original,
            target_capacity: target,
            terminated,
        })
    }

    /// Poll `fetch` until it reports at least `target` healthy instances.
    ///
    /// Only the healthy count is re-read each tick; the target never is.
    /// The wait fails once the cumulative slept time reaches the ceiling.
    async fn await_healthy<F>(
        &self,
        phase: HealthPhase,
        target: u32,
        fetch: F,
        abort: &mut watch::Receiver<bool>,
    ) -> Result<(), DeployError>
    where
        F: AsyncFn() -> Result<u32, CloudError>,
    {
        let deploy_phase = match phase {
            HealthPhase::ScalingGroup => DeployPhase::AwaitGroupHealth,
            HealthPhase::LoadBalancer => DeployPhase::AwaitBalancerHealth,
        };

        let mut waited = Duration::ZERO;
        let mut healthy = fetch().await?;
        while healthy < target {
            info!(
                group = %self.group,
                phase = %deploy_phase,
                target,
                healthy,
                waited_secs = waited.as_secs(),
                "waiting for healthy instances"
            );
            tokio::select! {
                _ = tokio::time::sleep(self.opts.poll_interval) => {}
                _ = abort.changed() => {
                    warn!(group = %self.group, phase = %deploy_phase, "abort requested, stopping deployment");
                    return Err(DeployError::Aborted { phase });
                }
            }
            waited += self.opts.poll_interval;
            if waited >= self.opts.health_timeout {
                error!(
                    group = %self.group,
                    phase = %deploy_phase,
                    target,
                    healthy,
                    waited_secs = waited.as_secs(),
                    "new hosts not healthy within the wait ceiling"
                );
                return Err(DeployError::HealthCheckTimeout {
                    phase,
                    target,
                    waited_secs: waited.as_secs(),
                });
            }
            healthy = fetch().await?;
        }

        info!(group = %self.group, phase = %deploy_phase, healthy, "healthy instance target reached");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use surge_cloud::SimCloud;

    fn abort_handle() -> (watch::Sender<bool>, watch::Receiver<bool>) {
        watch::channel(false)
    }

    #[tokio::test]
    async fn preflight_gate_fails_without_mutations() {
        let cloud = SimCloud::new();
        cloud.add_group("web", 6, 10, "web-elb");
        let (_tx, rx) = abort_handle();

        let err = Orchestrator::new(&cloud, &cloud, &cloud, "web")
            .run(rx)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DeployError::InsufficientCapacity {
                desired: 6,
                target: 12,
                max: 10
            }
        ));
        assert!(cloud.mutations().is_empty());
    }

    #[tokio::test]
    async fn missing_balancer_fails_preflight() {
        let cloud = SimCloud::new();
        cloud.add_group_without_balancer("worker", 1, 4);
        let (_tx, rx) = abort_handle();

        let err = Orchestrator::new(&cloud, &cloud, &cloud, "worker")
            .run(rx)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DeployError::Cloud(CloudError::NoLoadBalancer(_))
        ));
        assert!(cloud.mutations().is_empty());
    }

    #[tokio::test]
    async fn unknown_group_fails_preflight() {
        let cloud = SimCloud::new();
        let (_tx, rx) = abort_handle();

        let err = Orchestrator::new(&cloud, &cloud, &cloud, "ghost")
            .run(rx)
            .await
            .unwrap_err();
        assert!(matches!(err, DeployError::Cloud(CloudError::GroupNotFound(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn abort_signal_cancels_a_polling_wait() {
        let cloud = SimCloud::new();
        cloud.add_group("web", 2, 10, "web-elb");
        cloud.hold_balancer_health(true);
        let (tx, rx) = abort_handle();

        tx.send(true).unwrap();
        let err = Orchestrator::new(&cloud, &cloud, &cloud, "web")
            .run(rx)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DeployError::Aborted {
                phase: HealthPhase::LoadBalancer
            }
        ));
        // Aborted mid-run: no termination happened.
        assert_eq!(cloud.live_instance_ids().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_waits_exactly_the_ceiling() {
        let cloud = SimCloud::new();
        cloud.add_group("web", 2, 10, "web-elb");
        cloud.hold_group_health(true);
        let (_tx, rx) = abort_handle();

        let err = Orchestrator::new(&cloud, &cloud, &cloud, "web")
            .run(rx)
            .await
            .unwrap_err();

        match err {
            DeployError::HealthCheckTimeout {
                phase,
                target,
                waited_secs,
            } => {
                assert_eq!(phase, HealthPhase::ScalingGroup);
                assert_eq!(target, 4);
                // 30 polls of 30s: the cumulative wait reaches the 900s
                // ceiling exactly, never exceeding it by more than a tick.
                assert_eq!(waited_secs, 900);
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }
}
