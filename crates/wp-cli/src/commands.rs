//! `validate` and `provision` subcommands
//!
//! Both return a serializable report; `main` decides how to print it.

use crate::config::{CliConfig, GatewayKind};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use wp_gateway::{Gateway, InMemoryGateway, RestGateway};
use wp_model::{ActivityId, ProgramId, ProvisionedTree, TaskId};
use wp_provision::{
    CompensationReport, DraftTreeBuilder, PlannedStep, ProvisionError, ProvisionPlan, Provisioner,
    Stage,
};

/// Completeness of one wizard stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageStatus {
    pub stage: Stage,
    pub complete: bool,
}

/// Result of `wp validate`
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub stages: Vec<StageStatus>,
    /// First missing or malformed field, if any
    pub problem: Option<String>,
    /// Gateway calls a provision run would make
    pub plan: Vec<PlannedStep>,
}

impl ValidationReport {
    /// Whether the draft can be provisioned
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.problem.is_none()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for status in &self.stages {
            let mark = if status.complete { "ok" } else { "incomplete" };
            writeln!(f, "{:<12}{mark}", status.stage.to_string())?;
        }
        if let Some(problem) = &self.problem {
            writeln!(f, "\n{problem}")?;
        }
        if !self.plan.is_empty() {
            writeln!(f, "\nplan:")?;
            for step in &self.plan {
                writeln!(f, "  {step}")?;
            }
        }
        Ok(())
    }
}

/// Check every stage of a draft without touching a backend
#[must_use]
pub fn validate(builder: &DraftTreeBuilder) -> ValidationReport {
    let stages = Stage::ALL
        .into_iter()
        .map(|stage| StageStatus {
            stage,
            complete: builder.is_stage_complete(stage),
        })
        .collect();
    match builder.finalize() {
        Ok(tree) => ValidationReport {
            stages,
            problem: None,
            plan: ProvisionPlan::new(&tree).steps(),
        },
        Err(e) => ValidationReport {
            stages,
            problem: Some(e.to_string()),
            plan: Vec::new(),
        },
    }
}

/// Build the gateway selected by the configuration
///
/// # Errors
/// Fails if the REST client cannot be constructed
pub fn gateway_for(config: &CliConfig) -> anyhow::Result<Arc<dyn Gateway>> {
    Ok(match config.gateway {
        GatewayKind::Memory => Arc::new(InMemoryGateway::new()),
        GatewayKind::Rest => Arc::new(RestGateway::new(config.rest.clone())?),
    })
}

/// Machine-readable failure of `wp provision`
#[derive(Debug, Clone, Serialize)]
pub struct FailureReport {
    pub error: String,
    pub retryable: bool,
    pub requires_human: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program_id: Option<ProgramId>,
    pub created_activities: Vec<ActivityId>,
    pub created_tasks: Vec<TaskId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compensation: Option<CompensationReport>,
}

impl From<&ProvisionError> for FailureReport {
    fn from(error: &ProvisionError) -> Self {
        let mut report = Self {
            error: error.to_string(),
            retryable: error.is_retryable(),
            requires_human: error.requires_human(),
            run_id: None,
            program_id: None,
            created_activities: Vec::new(),
            created_tasks: Vec::new(),
            failed_step: None,
            compensation: None,
        };
        if let Some(failure) = error.partial_failure() {
            report.run_id = Some(failure.run_id.to_string());
            report.program_id = Some(failure.program_id);
            report.created_activities.clone_from(&failure.created_activities);
            report.created_tasks.clone_from(&failure.created_tasks);
            report.failed_step = Some(failure.failed_step.to_string());
            report.compensation = Some(failure.compensation.clone());
        }
        report
    }
}

/// Outcome of `wp provision`
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProvisionReport {
    Provisioned { tree: ProvisionedTree },
    Failed(FailureReport),
}

impl ProvisionReport {
    /// Whether the run produced a verified tree
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Provisioned { .. })
    }
}

impl fmt::Display for ProvisionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Provisioned { tree } => {
                writeln!(f, "provisioned program {} {}", tree.program_id(), tree.program.fields.name)?;
                for branch in &tree.activities {
                    writeln!(f, "  activity {} {}", branch.activity.id, branch.activity.fields.name)?;
                    for task in &branch.tasks {
                        writeln!(f, "    task {} {}", task.id, task.fields.name)?;
                    }
                }
                Ok(())
            }
            Self::Failed(report) => {
                writeln!(f, "provisioning failed: {}", report.error)?;
                if let Some(program_id) = report.program_id {
                    writeln!(
                        f,
                        "  persisted under program {program_id}: {} activities, {} tasks",
                        report.created_activities.len(),
                        report.created_tasks.len()
                    )?;
                }
                if report.requires_human {
                    writeln!(f, "  manual cleanup required")?;
                } else if report.retryable {
                    writeln!(f, "  safe to retry")?;
                }
                Ok(())
            }
        }
    }
}

/// Finalize the draft and provision it
pub async fn provision(builder: &DraftTreeBuilder, provisioner: &Provisioner) -> ProvisionReport {
    let result = match builder.finalize() {
        Ok(tree) => provisioner.provision(&tree).await,
        Err(e) => Err(ProvisionError::from(e)),
    };
    match result {
        Ok(tree) => ProvisionReport::Provisioned { tree },
        Err(error) => {
            tracing::warn!(%error, "provision command failed");
            ProvisionReport::Failed(FailureReport::from(&error))
        }
    }
}
