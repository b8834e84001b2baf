//! Persisted records and the provisioned tree
//!
//! A record is a draft plus its server identifier and, for children, the
//! identifier of its persisted parent.

use crate::draft::{ActivityDraft, ProgramDraft, TaskDraft, TreeCounts};
use crate::ids::{ActivityId, EntityRef, ProgramId, TaskId};
use serde::{Deserialize, Serialize};

/// Persisted program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramRecord {
    pub id: ProgramId,
    #[serde(flatten)]
    pub fields: ProgramDraft,
}

/// Persisted activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: ActivityId,
    pub program_id: ProgramId,
    #[serde(flatten)]
    pub fields: ActivityDraft,
}

/// Persisted task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub activity_id: ActivityId,
    #[serde(flatten)]
    pub fields: TaskDraft,
}

/// An activity record with its task records, in creation order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvisionedActivity {
    #[serde(flatten)]
    pub activity: ActivityRecord,
    #[serde(default)]
    pub tasks: Vec<TaskRecord>,
}

/// Materialized program tree, as hydrated from the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvisionedTree {
    #[serde(flatten)]
    pub program: ProgramRecord,
    #[serde(default)]
    pub activities: Vec<ProvisionedActivity>,
}

/// A child whose parent reference does not match its owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{child} references {actual_parent}, expected {expected_parent}")]
pub struct LinkViolation {
    pub child: EntityRef,
    pub expected_parent: EntityRef,
    pub actual_parent: EntityRef,
}

impl ProvisionedTree {
    /// Program identifier
    #[inline]
    #[must_use]
    pub fn program_id(&self) -> ProgramId {
        self.program.id
    }

    /// Activity and total task counts
    #[must_use]
    pub fn counts(&self) -> TreeCounts {
        TreeCounts::new(
            self.activities.len(),
            self.activities.iter().map(|a| a.tasks.len()).sum(),
        )
    }

    /// Activity identifiers in order
    pub fn activity_ids(&self) -> impl Iterator<Item = ActivityId> + '_ {
        self.activities.iter().map(|a| a.activity.id)
    }

    /// Task identifiers in order, activity by activity
    pub fn task_ids(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.activities
            .iter()
            .flat_map(|a| a.tasks.iter().map(|t| t.id))
    }

    /// Check that every child points at its owner
    ///
    /// # Errors
    /// Returns the first [`LinkViolation`] in tree order
    pub fn check_links(&self) -> Result<(), LinkViolation> {
        for branch in &self.activities {
            let activity = &branch.activity;
            if activity.program_id != self.program.id {
                return Err(LinkViolation {
                    child: EntityRef::Activity(activity.id),
                    expected_parent: EntityRef::Program(self.program.id),
                    actual_parent: EntityRef::Program(activity.program_id),
                });
            }
            if let Some(task) = branch.tasks.iter().find(|t| t.activity_id != activity.id) {
                return Err(LinkViolation {
                    child: EntityRef::Task(task.id),
                    expected_parent: EntityRef::Activity(activity.id),
                    actual_parent: EntityRef::Activity(task.activity_id),
                });
            }
        }
        Ok(())
    }
}
