//! Provisioning Orchestrator
//!
//! Materializes a [`DraftTree`] through a non-transactional [`Gateway`]:
//!
//! 1. Anchor: create the program, or read the existing one of a workplan
//! 2. Activity branches in draft order; each creates its activity, then its
//!    tasks in order
//! 3. On the first failure, stop and apply the [`FailurePolicy`]
//! 4. On full success, hand over to the [`ConsistencyVerifier`]
//!
//! Branches run one after another by default, or side by side under
//! [`Scheduling::Concurrent`].

use crate::compensation::{CompensationLog, CompensationReport};
use crate::config::{ConfigError, FailurePolicy, ProvisionConfig, Scheduling};
use crate::error::{FailedStep, PartialFailure, ProvisionError};
use crate::plan::{Branch, ProvisionPlan};
use crate::verifier::ConsistencyVerifier;
use futures::future::join_all;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::Instrument;
use wp_gateway::{Gateway, GatewayError};
use wp_model::{
    ActivityId, DraftTree, EntityRef, ProgramId, ProvisionedTree, RunId, TaskId, TreeCounts,
    TreeRoot,
};

/// Program a run attaches its activities to
#[derive(Debug, Clone, Copy)]
struct Anchor {
    program_id: ProgramId,
    /// Children the program already had before the run
    baseline: TreeCounts,
    created: bool,
}

/// What one activity branch managed to create
#[derive(Debug)]
struct BranchOutcome {
    activity: Option<ActivityId>,
    tasks: Vec<TaskId>,
    failure: Option<(FailedStep, GatewayError)>,
}

impl BranchOutcome {
    fn skipped() -> Self {
        Self {
            activity: None,
            tasks: Vec::new(),
            failure: None,
        }
    }
}

/// Shared state of one run
struct Run<'a> {
    program_id: ProgramId,
    log: &'a CompensationLog,
    abort: Option<&'a AtomicBool>,
}

impl Run<'_> {
    fn aborted(&self) -> bool {
        self.abort.is_some_and(|flag| flag.load(Ordering::Acquire))
    }

    fn raise_abort(&self) {
        if let Some(flag) = self.abort {
            flag.store(true, Ordering::Release);
        }
    }
}

/// Provisioning orchestrator
///
/// One instance can serve many runs; each call to
/// [`provision`](Self::provision) is independent.
#[derive(Clone)]
pub struct Provisioner {
    gateway: Arc<dyn Gateway>,
    config: ProvisionConfig,
    verifier: ConsistencyVerifier,
}

impl std::fmt::Debug for Provisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provisioner")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Provisioner {
    /// Create a provisioner with the default configuration
    #[inline]
    #[must_use]
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self {
            gateway,
            config: ProvisionConfig::default(),
            verifier: ConsistencyVerifier::new(),
        }
    }

    /// Create a provisioner with a validated configuration
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the configuration is not supported
    pub fn with_config(gateway: Arc<dyn Gateway>, config: ProvisionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new(gateway)
        })
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ProvisionConfig {
        &self.config
    }

    /// Execution plan for a tree, without calling the gateway
    #[inline]
    #[must_use]
    pub fn plan<'a>(&self, tree: &'a DraftTree) -> ProvisionPlan<'a> {
        ProvisionPlan::new(tree)
    }

    /// Provision a draft tree and return the verified hydrated result
    ///
    /// # Errors
    /// - [`ProvisionError::ProgramCreationFailed`] / [`ProvisionError::AnchorUnavailable`]
    ///   when nothing could be created
    /// - [`ProvisionError::PartialProvisioningFailure`] when a later create failed
    /// - verifier errors when the created tree cannot be confirmed
    pub async fn provision(&self, tree: &DraftTree) -> Result<ProvisionedTree, ProvisionError> {
        let run_id = RunId::new();
        let span = tracing::info_span!("provision", %run_id);
        self.run(run_id, tree).instrument(span).await
    }

    async fn run(&self, run_id: RunId, tree: &DraftTree) -> Result<ProvisionedTree, ProvisionError> {
        let counts = tree.counts();
        tracing::info!(
            activities = counts.activities,
            tasks = counts.tasks,
            scheduling = ?self.config.scheduling,
            policy = ?self.config.failure_policy,
            "provisioning draft tree"
        );

        let log = CompensationLog::new();
        let anchor = self.anchor(tree.root(), &log).await?;
        let plan = ProvisionPlan::new(tree);

        let outcomes = match self.config.scheduling {
            Scheduling::Sequential => self.run_sequential(&plan, anchor.program_id, &log).await,
            Scheduling::Concurrent { max_in_flight } => {
                self.run_concurrent(&plan, anchor.program_id, &log, max_in_flight)
                    .await
            }
        };

        let mut created_activities = Vec::new();
        let mut created_tasks = Vec::new();
        let mut first_failure = None;
        for outcome in outcomes {
            created_activities.extend(outcome.activity);
            created_tasks.extend(outcome.tasks);
            if first_failure.is_none() {
                first_failure = outcome.failure;
            }
        }

        if let Some((failed_step, cause)) = first_failure {
            tracing::warn!(%failed_step, %cause, "provisioning stopped");
            let compensation = match self.config.failure_policy {
                FailurePolicy::LeaveInPlace => CompensationReport::NotAttempted,
                FailurePolicy::Compensate => log.compensate(self.gateway.as_ref(), &self.config).await,
            };
            return Err(PartialFailure {
                run_id,
                program_id: anchor.program_id,
                program_created: anchor.created,
                created_activities,
                created_tasks,
                failed_step,
                cause,
                compensation,
            }
            .into());
        }

        let tree = self
            .verifier
            .verify(self.gateway.as_ref(), anchor.program_id, anchor.baseline + counts)
            .await?;
        tracing::info!(program_id = %anchor.program_id, counts = %tree.counts(), "draft tree provisioned");
        Ok(tree)
    }

    async fn anchor(&self, root: &TreeRoot, log: &CompensationLog) -> Result<Anchor, ProvisionError> {
        match root {
            TreeRoot::New(draft) => match self.gateway.create_program(draft).await {
                Ok(program_id) => {
                    tracing::debug!(%program_id, name = %draft.name, "program created");
                    log.track(EntityRef::Program(program_id));
                    Ok(Anchor {
                        program_id,
                        baseline: TreeCounts::default(),
                        created: true,
                    })
                }
                Err(cause) => {
                    tracing::warn!(%cause, "program creation failed");
                    Err(ProvisionError::ProgramCreationFailed { cause })
                }
            },
            TreeRoot::Existing { program_id } => {
                let program_id = *program_id;
                match self.gateway.read_program_with_children(program_id).await {
                    Ok(existing) => {
                        let baseline = existing.counts();
                        tracing::debug!(%program_id, %baseline, "extending existing program");
                        Ok(Anchor {
                            program_id,
                            baseline,
                            created: false,
                        })
                    }
                    Err(cause) => {
                        tracing::warn!(%program_id, %cause, "existing program unavailable");
                        Err(ProvisionError::AnchorUnavailable { program_id, cause })
                    }
                }
            }
        }
    }

    async fn run_sequential(
        &self,
        plan: &ProvisionPlan<'_>,
        program_id: ProgramId,
        log: &CompensationLog,
    ) -> Vec<BranchOutcome> {
        let run = Run {
            program_id,
            log,
            abort: None,
        };
        let mut outcomes = Vec::with_capacity(plan.branches().len());
        for branch in plan.branches() {
            let outcome = self.run_branch(&run, branch).await;
            let failed = outcome.failure.is_some();
            outcomes.push(outcome);
            if failed {
                break;
            }
        }
        outcomes
    }

    async fn run_concurrent(
        &self,
        plan: &ProvisionPlan<'_>,
        program_id: ProgramId,
        log: &CompensationLog,
        max_in_flight: usize,
    ) -> Vec<BranchOutcome> {
        let permits = Semaphore::new(max_in_flight);
        let abort = AtomicBool::new(false);
        let run = Run {
            program_id,
            log,
            abort: Some(&abort),
        };

        let branches = plan.branches().iter().map(|branch| {
            let run = &run;
            let permits = &permits;
            async move {
                let Ok(_permit) = permits.acquire().await else {
                    return BranchOutcome::skipped();
                };
                if run.aborted() {
                    tracing::debug!(activity = branch.index, "branch skipped after failure");
                    return BranchOutcome::skipped();
                }
                self.run_branch(run, branch).await
            }
        });
        join_all(branches).await
    }

    async fn run_branch(&self, run: &Run<'_>, branch: &Branch<'_>) -> BranchOutcome {
        let mut outcome = BranchOutcome::skipped();
        let activity = &branch.draft.activity;

        let activity_id = match self.gateway.create_activity(run.program_id, activity).await {
            Ok(id) => id,
            Err(cause) => {
                run.raise_abort();
                outcome.failure = Some((branch.activity_step(), cause));
                return outcome;
            }
        };
        tracing::debug!(%activity_id, index = branch.index, name = %activity.name, "activity created");
        run.log.track(EntityRef::Activity(activity_id));
        outcome.activity = Some(activity_id);

        for (index, task) in branch.draft.tasks.iter().enumerate() {
            if run.aborted() {
                break;
            }
            match self.gateway.create_task(activity_id, task).await {
                Ok(task_id) => {
                    tracing::debug!(%task_id, ordinal = branch.first_task_ordinal + index, name = %task.name, "task created");
                    run.log.track(EntityRef::Task(task_id));
                    outcome.tasks.push(task_id);
                }
                Err(cause) => {
                    run.raise_abort();
                    outcome.failure = Some((branch.task_step(index), cause));
                    break;
                }
            }
        }
        outcome
    }
}
