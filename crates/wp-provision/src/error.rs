//! Error types for provisioning
//!
//! Covers:
//! - Incomplete or malformed drafts (before any I/O)
//! - Program creation and anchor read failures (nothing persisted)
//! - Partial provisioning (records persisted, failed step attributed)
//! - Consistency alarms from the verifier
//! - Invalid configuration

use crate::builder::Stage;
use crate::compensation::CompensationReport;
use crate::config::ConfigError;
use std::fmt;
use wp_gateway::GatewayError;
use wp_model::{ActivityId, LinkViolation, ModelError, ProgramId, RunId, TaskId, TreeCounts};

/// Main provisioning error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProvisionError {
    /// Draft could not be finalized
    #[error(transparent)]
    IncompleteDraft(#[from] IncompleteDraftError),

    /// Invalid provisioner configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The program create call failed; nothing was persisted
    #[error("program creation failed: {cause}")]
    ProgramCreationFailed { cause: GatewayError },

    /// The existing program of a workplan could not be read; nothing was persisted
    #[error("program {program_id} unavailable: {cause}")]
    AnchorUnavailable {
        program_id: ProgramId,
        cause: GatewayError,
    },

    /// Some records were persisted before a create call failed
    #[error("{0}")]
    PartialProvisioningFailure(Box<PartialFailure>),

    /// The verifying read disagrees with what was created
    #[error("hydration mismatch for program {program_id}: expected {expected}, read {actual}")]
    HydrationMismatch {
        program_id: ProgramId,
        expected: TreeCounts,
        actual: TreeCounts,
    },

    /// The verifying read returned a child under the wrong parent
    #[error("broken parent link in program {program_id}: {violation}")]
    BrokenParentLink {
        program_id: ProgramId,
        violation: LinkViolation,
    },

    /// The verifying read itself failed; the tree was created but is unverified
    #[error("verification read of program {program_id} failed: {cause}")]
    VerificationReadFailed {
        program_id: ProgramId,
        cause: GatewayError,
    },
}

impl ProvisionError {
    /// Whether retrying the same draft is safe and may succeed
    ///
    /// True only when no persisted state remains and the cause was a
    /// transport failure.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ProgramCreationFailed { cause } | Self::AnchorUnavailable { cause, .. } => {
                cause.is_retryable()
            }
            Self::PartialProvisioningFailure(failure) => {
                failure.compensation.is_complete() && failure.cause.is_retryable()
            }
            _ => false,
        }
    }

    /// Whether an operator must look at persisted state
    #[inline]
    #[must_use]
    pub fn requires_human(&self) -> bool {
        match self {
            Self::PartialProvisioningFailure(failure) => failure.leaves_partial_state(),
            Self::HydrationMismatch { .. }
            | Self::BrokenParentLink { .. }
            | Self::VerificationReadFailed { .. } => true,
            _ => false,
        }
    }

    /// Partial failure report, if this is one
    #[inline]
    #[must_use]
    pub fn partial_failure(&self) -> Option<&PartialFailure> {
        match self {
            Self::PartialProvisioningFailure(failure) => Some(failure),
            _ => None,
        }
    }
}

impl From<PartialFailure> for ProvisionError {
    fn from(failure: PartialFailure) -> Self {
        Self::PartialProvisioningFailure(Box::new(failure))
    }
}

/// The create call that failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailedStep {
    /// Activity at `index` (0-based, draft order)
    Activity { index: usize, name: String },
    /// Task at `index` within its activity
    Task {
        activity_index: usize,
        activity_name: String,
        index: usize,
        /// 1-based position among all tasks of the run, in draft order
        ordinal: usize,
        name: String,
    },
}

impl FailedStep {
    /// Index of the activity branch the step belongs to
    #[inline]
    #[must_use]
    pub fn activity_index(&self) -> usize {
        match self {
            Self::Activity { index, .. } => *index,
            Self::Task { activity_index, .. } => *activity_index,
        }
    }
}

impl fmt::Display for FailedStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Activity { index, name } => write!(f, "Activity #{} '{name}'", index + 1),
            Self::Task {
                ordinal,
                name,
                activity_name,
                ..
            } => write!(f, "Task #{ordinal} '{name}' of Activity '{activity_name}'"),
        }
    }
}

/// Everything a caller needs to reconcile a partially provisioned tree
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("provisioning stopped at {failed_step} (run {run_id}): {cause}; compensation {compensation}")]
pub struct PartialFailure {
    pub run_id: RunId,
    /// Program the run created or extended
    pub program_id: ProgramId,
    /// Whether this run created the program
    pub program_created: bool,
    /// Activities created by this run, in draft order
    pub created_activities: Vec<ActivityId>,
    /// Tasks created by this run, in draft order
    pub created_tasks: Vec<TaskId>,
    pub failed_step: FailedStep,
    pub cause: GatewayError,
    pub compensation: CompensationReport,
}

impl PartialFailure {
    /// Whether records created by this run may still exist
    #[inline]
    #[must_use]
    pub fn leaves_partial_state(&self) -> bool {
        !self.compensation.is_complete()
    }
}

/// Why a field blocks a stage
#[derive(Debug, Clone, PartialEq)]
pub enum FieldProblem {
    /// Required and empty
    Missing,
    /// Present but malformed
    Invalid(ModelError),
}

impl fmt::Display for FieldProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "is required"),
            Self::Invalid(e) => write!(f, "is invalid: {e}"),
        }
    }
}

/// First field that keeps a draft from being finalized
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("incomplete draft ({stage} stage): {field} {problem}")]
pub struct IncompleteDraftError {
    pub stage: Stage,
    /// Field path, e.g. `activities[1].end_date`
    pub field: String,
    pub problem: FieldProblem,
}

impl IncompleteDraftError {
    /// Required field is empty
    #[inline]
    #[must_use]
    pub fn missing(stage: Stage, field: impl Into<String>) -> Self {
        Self {
            stage,
            field: field.into(),
            problem: FieldProblem::Missing,
        }
    }

    /// Field is present but malformed
    #[inline]
    #[must_use]
    pub fn invalid(stage: Stage, field: impl Into<String>, error: ModelError) -> Self {
        Self {
            stage,
            field: field.into(),
            problem: FieldProblem::Invalid(error),
        }
    }
}
