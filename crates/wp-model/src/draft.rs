//! Draft records and the draft tree
//!
//! Drafts carry the user's field values before anything is persisted. They
//! have no identifiers; children reference their parent by position in the
//! [`DraftTree`].

use crate::fields::{ActivityStatus, Budget, Progress, ProgramStatus, TaskStatus, Timeline, Visibility};
use crate::ids::ProgramId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Program fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub year: i32,
    #[serde(default)]
    pub status: ProgramStatus,
    pub total_budget: Budget,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub focus_area: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub strategic_objective: String,
}

impl ProgramDraft {
    /// Create a draft with the required fields; the rest default to empty
    #[must_use]
    pub fn new(name: impl Into<String>, year: i32, total_budget: Budget) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            year,
            status: ProgramStatus::default(),
            total_budget,
            visibility: Visibility::default(),
            focus_area: String::new(),
            location: String::new(),
            strategic_objective: String::new(),
        }
    }

    /// With status
    #[inline]
    #[must_use]
    pub fn with_status(mut self, status: ProgramStatus) -> Self {
        self.status = status;
        self
    }

    /// With visibility
    #[inline]
    #[must_use]
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }
}

/// Activity fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub outcome: String,
    #[serde(default)]
    pub kpi: String,
    pub timeline: Timeline,
    pub budget: Budget,
    #[serde(default)]
    pub status: ActivityStatus,
    #[serde(default)]
    pub responsible_person: String,
    #[serde(default)]
    pub progress: Progress,
}

impl ActivityDraft {
    /// Create a draft with the required fields; the rest default to empty
    #[must_use]
    pub fn new(name: impl Into<String>, timeline: Timeline, budget: Budget) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            outcome: String::new(),
            kpi: String::new(),
            timeline,
            budget,
            status: ActivityStatus::default(),
            responsible_person: String::new(),
            progress: Progress::default(),
        }
    }

    /// With status
    #[inline]
    #[must_use]
    pub fn with_status(mut self, status: ActivityStatus) -> Self {
        self.status = status;
        self
    }

    /// With progress
    #[inline]
    #[must_use]
    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }
}

/// Free-text follow-up fields of a task
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskNarrative {
    pub output: String,
    pub outcome: String,
    pub evaluation_criteria: String,
    pub risks: String,
    pub mitigation: String,
    pub resource_person: String,
    pub learning: String,
    pub self_evaluation: String,
    pub notes: String,
}

/// Task fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub name: String,
    #[serde(default)]
    pub target: Option<f64>,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub budget: Budget,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(flatten)]
    pub narrative: TaskNarrative,
}

impl TaskDraft {
    /// Create a draft with only a name
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: None,
            duration: String::new(),
            due_date: None,
            budget: Budget::ZERO,
            status: TaskStatus::default(),
            narrative: TaskNarrative::default(),
        }
    }

    /// With budget
    #[inline]
    #[must_use]
    pub fn with_budget(mut self, budget: Budget) -> Self {
        self.budget = budget;
        self
    }

    /// With due date
    #[inline]
    #[must_use]
    pub fn with_due_date(mut self, due: NaiveDate) -> Self {
        self.due_date = Some(due);
        self
    }
}

/// Where the tree is anchored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeRoot {
    /// Create a new program (program wizard)
    New(ProgramDraft),
    /// Attach to an existing program (workplan wizard)
    Existing { program_id: ProgramId },
}

impl TreeRoot {
    /// Program draft, when the root is new
    #[inline]
    #[must_use]
    pub fn draft(&self) -> Option<&ProgramDraft> {
        match self {
            Self::New(draft) => Some(draft),
            Self::Existing { .. } => None,
        }
    }
}

/// An activity draft with its ordered task drafts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftActivity {
    pub activity: ActivityDraft,
    #[serde(default)]
    pub tasks: Vec<TaskDraft>,
}

impl DraftActivity {
    /// Create an activity branch
    #[inline]
    #[must_use]
    pub fn new(activity: ActivityDraft, tasks: Vec<TaskDraft>) -> Self {
        Self { activity, tasks }
    }
}

/// Number of activities and tasks in a tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TreeCounts {
    pub activities: usize,
    pub tasks: usize,
}

impl TreeCounts {
    /// Create counts
    #[inline]
    #[must_use]
    pub const fn new(activities: usize, tasks: usize) -> Self {
        Self { activities, tasks }
    }
}

impl std::ops::Add for TreeCounts {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.activities + rhs.activities, self.tasks + rhs.tasks)
    }
}

impl std::fmt::Display for TreeCounts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.activities, self.tasks)
    }
}

/// Complete, immutable draft tree handed to the provisioner
///
/// Only shared accessors are exposed; a tree never changes after
/// construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftTree {
    root: TreeRoot,
    activities: Vec<DraftActivity>,
}

impl DraftTree {
    /// Assemble a tree
    #[inline]
    #[must_use]
    pub fn new(root: TreeRoot, activities: Vec<DraftActivity>) -> Self {
        Self { root, activities }
    }

    /// Tree anchored at a new program
    #[inline]
    #[must_use]
    pub fn for_new_program(program: ProgramDraft, activities: Vec<DraftActivity>) -> Self {
        Self::new(TreeRoot::New(program), activities)
    }

    /// Tree anchored at an existing program
    #[inline]
    #[must_use]
    pub fn for_existing_program(program_id: ProgramId, activities: Vec<DraftActivity>) -> Self {
        Self::new(TreeRoot::Existing { program_id }, activities)
    }

    /// Root anchor
    #[inline]
    #[must_use]
    pub fn root(&self) -> &TreeRoot {
        &self.root
    }

    /// Activity branches in draft order
    #[inline]
    #[must_use]
    pub fn activities(&self) -> &[DraftActivity] {
        &self.activities
    }

    /// Activity and total task counts
    #[must_use]
    pub fn counts(&self) -> TreeCounts {
        TreeCounts::new(
            self.activities.len(),
            self.activities.iter().map(|a| a.tasks.len()).sum(),
        )
    }
}
