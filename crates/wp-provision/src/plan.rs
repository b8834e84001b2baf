//! Provisioning plan
//!
//! The dependency graph of one run, derived from a [`DraftTree`]:
//!
//! ```text
//! anchor ──► activity 0 ──► task 0.0 ──► task 0.1
//!       └──► activity 1 ──► task 1.0
//! ```
//!
//! Each activity depends on the anchor (created or read program), each task
//! on its own activity and on the task before it in the same branch.

use crate::error::FailedStep;
use serde::Serialize;
use std::fmt;
use wp_model::{DraftActivity, DraftTree, EntityKind, TreeRoot};

/// One gateway call of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedStep {
    /// Position in the sequential call order
    pub id: usize,
    /// Entity the step creates (or reads, for a workplan anchor)
    pub entity: EntityKind,
    /// Human-readable label
    pub label: String,
    /// Step that must succeed first
    pub depends_on: Option<usize>,
}

impl fmt::Display for PlannedStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.depends_on {
            Some(parent) => write!(f, "#{} {} (after #{parent})", self.id, self.label),
            None => write!(f, "#{} {}", self.id, self.label),
        }
    }
}

/// One activity branch: the activity and its tasks
#[derive(Debug, Clone, Copy)]
pub struct Branch<'a> {
    /// Position of the activity in the draft
    pub index: usize,
    /// Ordinal of the branch's first task across the run, 1-based
    pub first_task_ordinal: usize,
    pub draft: &'a DraftActivity,
}

impl Branch<'_> {
    /// Step describing the activity create call
    #[must_use]
    pub fn activity_step(&self) -> FailedStep {
        FailedStep::Activity {
            index: self.index,
            name: self.draft.activity.name.clone(),
        }
    }

    /// Step describing the create call of task `index`
    #[must_use]
    pub fn task_step(&self, index: usize) -> FailedStep {
        FailedStep::Task {
            activity_index: self.index,
            activity_name: self.draft.activity.name.clone(),
            index,
            ordinal: self.first_task_ordinal + index,
            name: self
                .draft
                .tasks
                .get(index)
                .map(|t| t.name.clone())
                .unwrap_or_default(),
        }
    }
}

/// Execution plan for one draft tree
#[derive(Debug, Clone)]
pub struct ProvisionPlan<'a> {
    tree: &'a DraftTree,
    branches: Vec<Branch<'a>>,
}

impl<'a> ProvisionPlan<'a> {
    /// Build the plan for a tree
    #[must_use]
    pub fn new(tree: &'a DraftTree) -> Self {
        let mut next_ordinal = 1;
        let branches = tree
            .activities()
            .iter()
            .enumerate()
            .map(|(index, draft)| {
                let branch = Branch {
                    index,
                    first_task_ordinal: next_ordinal,
                    draft,
                };
                next_ordinal += draft.tasks.len();
                branch
            })
            .collect();
        Self { tree, branches }
    }

    /// Activity branches in draft order
    #[inline]
    #[must_use]
    pub fn branches(&self) -> &[Branch<'a>] {
        &self.branches
    }

    /// All steps in sequential call order
    #[must_use]
    pub fn steps(&self) -> Vec<PlannedStep> {
        let anchor_label = match self.tree.root() {
            TreeRoot::New(program) => format!("create Program '{}'", program.name),
            TreeRoot::Existing { program_id } => format!("read Program {program_id}"),
        };
        let mut steps = vec![PlannedStep {
            id: 0,
            entity: EntityKind::Program,
            label: anchor_label,
            depends_on: None,
        }];

        for branch in &self.branches {
            let activity_id = steps.len();
            steps.push(PlannedStep {
                id: activity_id,
                entity: EntityKind::Activity,
                label: format!("create {}", branch.activity_step()),
                depends_on: Some(0),
            });
            for index in 0..branch.draft.tasks.len() {
                let id = steps.len();
                steps.push(PlannedStep {
                    id,
                    entity: EntityKind::Task,
                    label: format!("create {}", branch.task_step(index)),
                    depends_on: Some(id - 1),
                });
            }
        }
        steps
    }
}
