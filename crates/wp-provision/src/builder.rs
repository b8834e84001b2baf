//! Draft Tree Builder
//!
//! Holds the in-progress wizard state as text forms and gates advancement
//! between stages:
//!
//! ```text
//! Program → Activities → Tasks → Review
//! ```
//!
//! Every mutation consumes the builder and returns a new one. Activity and
//! task lists are persistent vectors, so a [`DraftTreeBuilder::snapshot`]
//! taken before a mutation is unaffected by it and costs no deep copy.
//!
//! # Example
//!
//! ```rust,ignore
//! let builder = DraftTreeBuilder::program_wizard()
//!     .with_program(program_form)
//!     .push_activity(outreach_form)
//!     .push_task(0, flyers_form);
//!
//! assert!(builder.is_stage_complete(Stage::Activities));
//! let tree = builder.finalize()?;
//! ```

use crate::error::IncompleteDraftError;
use im::Vector;
use serde::{Deserialize, Serialize};
use std::fmt;
use wp_model::{
    parse_date, parse_target, parse_year, ActivityDraft, ActivityStatus, Budget, DraftActivity,
    DraftTree, ModelError, ProgramDraft, ProgramId, ProgramStatus, Progress, TaskDraft,
    TaskNarrative, TaskStatus, Timeline, TreeRoot, Visibility,
};

/// Wizard stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Program,
    Activities,
    Tasks,
    Review,
}

impl Stage {
    /// All stages in wizard order
    pub const ALL: [Stage; 4] = [Stage::Program, Stage::Activities, Stage::Tasks, Stage::Review];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Program => "program",
            Self::Activities => "activities",
            Self::Tasks => "tasks",
            Self::Review => "review",
        };
        f.write_str(label)
    }
}

/// Program fields as typed into the wizard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgramForm {
    pub name: String,
    pub description: String,
    pub year: String,
    pub status: String,
    pub budget: String,
    pub visibility: String,
    pub focus_area: String,
    pub location: String,
    pub strategic_objective: String,
}

/// Activity fields as typed into the wizard, with its task forms
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityForm {
    pub name: String,
    pub description: String,
    pub outcome: String,
    pub kpi: String,
    pub start_date: String,
    pub end_date: String,
    pub budget: String,
    pub status: String,
    pub responsible_person: String,
    pub progress: String,
    pub tasks: Vector<TaskForm>,
}

/// Task fields as typed into the wizard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskForm {
    pub name: String,
    pub target: String,
    pub duration: String,
    pub due_date: String,
    pub budget: String,
    pub status: String,
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

#[derive(Debug, Clone, PartialEq, Eq)]
enum RootForm {
    New(ProgramForm),
    Existing(ProgramId),
}

/// Immutable-snapshot builder for a [`DraftTree`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftTreeBuilder {
    root: RootForm,
    activities: Vector<ActivityForm>,
}

impl DraftTreeBuilder {
    /// Start a Program Wizard session: a new program with its workplan
    #[inline]
    #[must_use]
    pub fn program_wizard() -> Self {
        Self {
            root: RootForm::New(ProgramForm::default()),
            activities: Vector::new(),
        }
    }

    /// Start a Workplan Wizard session under an existing program
    ///
    /// The program stage is complete by construction.
    #[inline]
    #[must_use]
    pub fn workplan_wizard(program_id: ProgramId) -> Self {
        Self {
            root: RootForm::Existing(program_id),
            activities: Vector::new(),
        }
    }

    /// Set the program fields, making the session create a new program
    #[must_use]
    pub fn with_program(mut self, form: ProgramForm) -> Self {
        self.root = RootForm::New(form);
        self
    }

    /// Append an activity
    #[must_use]
    pub fn push_activity(mut self, form: ActivityForm) -> Self {
        self.activities.push_back(form);
        self
    }

    /// Replace the activity at `index`, keeping its tasks
    ///
    /// Out-of-range indices leave the builder unchanged.
    #[must_use]
    pub fn replace_activity(mut self, index: usize, mut form: ActivityForm) -> Self {
        if let Some(current) = self.activities.get(index) {
            form.tasks = current.tasks.clone();
            self.activities.set(index, form);
        }
        self
    }

    /// Remove the activity at `index` with its tasks
    ///
    /// Out-of-range indices leave the builder unchanged.
    #[must_use]
    pub fn remove_activity(mut self, index: usize) -> Self {
        if index < self.activities.len() {
            self.activities.remove(index);
        }
        self
    }

    /// Append a task to the activity at `activity_index`
    ///
    /// Out-of-range indices leave the builder unchanged.
    #[must_use]
    pub fn push_task(mut self, activity_index: usize, form: TaskForm) -> Self {
        if let Some(activity) = self.activities.get_mut(activity_index) {
            activity.tasks.push_back(form);
        }
        self
    }

    /// Remove a task
    ///
    /// Out-of-range indices leave the builder unchanged.
    #[must_use]
    pub fn remove_task(mut self, activity_index: usize, task_index: usize) -> Self {
        if let Some(activity) = self.activities.get_mut(activity_index) {
            if task_index < activity.tasks.len() {
                activity.tasks.remove(task_index);
            }
        }
        self
    }

    /// State that later mutations of `self` cannot affect
    #[inline]
    #[must_use]
    pub fn snapshot(&self) -> Self {
        self.clone()
    }

    /// Program form, unless this is a workplan session
    #[inline]
    #[must_use]
    pub fn program(&self) -> Option<&ProgramForm> {
        match &self.root {
            RootForm::New(form) => Some(form),
            RootForm::Existing(_) => None,
        }
    }

    /// Activity forms in order
    #[inline]
    #[must_use]
    pub fn activities(&self) -> &Vector<ActivityForm> {
        &self.activities
    }

    /// Whether every required field of `stage` is present and well-typed
    #[must_use]
    pub fn is_stage_complete(&self, stage: Stage) -> bool {
        self.check_stage(stage).is_ok()
    }

    /// First stage that is not complete, or [`Stage::Review`]
    #[must_use]
    pub fn current_stage(&self) -> Stage {
        Stage::ALL
            .into_iter()
            .find(|stage| !self.is_stage_complete(*stage))
            .unwrap_or(Stage::Review)
    }

    /// Check one stage, naming the first offending field
    ///
    /// # Errors
    /// Returns [`IncompleteDraftError`] for the first missing or malformed field
    pub fn check_stage(&self, stage: Stage) -> Result<(), IncompleteDraftError> {
        match stage {
            Stage::Program => self.parse_root().map(drop),
            Stage::Activities => self.parse_activities().map(drop),
            Stage::Tasks => self.parse_tasks().map(drop),
            Stage::Review => self.finalize().map(drop),
        }
    }

    /// Produce the immutable draft tree
    ///
    /// Stages are checked in wizard order; the error names the first
    /// offending field.
    ///
    /// # Errors
    /// Returns [`IncompleteDraftError`] if any stage is incomplete
    pub fn finalize(&self) -> Result<DraftTree, IncompleteDraftError> {
        let root = self.parse_root()?;
        let activities = self.parse_activities()?;
        let tasks = self.parse_tasks()?;
        let branches = activities
            .into_iter()
            .zip(tasks)
            .map(|(activity, tasks)| DraftActivity::new(activity, tasks))
            .collect();
        Ok(DraftTree::new(root, branches))
    }

    fn parse_root(&self) -> Result<TreeRoot, IncompleteDraftError> {
        match &self.root {
            RootForm::New(form) => parse_program(form).map(TreeRoot::New),
            RootForm::Existing(program_id) => Ok(TreeRoot::Existing {
                program_id: *program_id,
            }),
        }
    }

    fn parse_activities(&self) -> Result<Vec<ActivityDraft>, IncompleteDraftError> {
        if self.activities.is_empty() {
            return Err(IncompleteDraftError::missing(Stage::Activities, "activities"));
        }
        self.activities
            .iter()
            .enumerate()
            .map(|(index, form)| parse_activity(index, form))
            .collect()
    }

    fn parse_tasks(&self) -> Result<Vec<Vec<TaskDraft>>, IncompleteDraftError> {
        self.activities
            .iter()
            .enumerate()
            .map(|(activity_index, form)| {
                form.tasks
                    .iter()
                    .enumerate()
                    .map(|(index, task)| parse_task(activity_index, index, task))
                    .collect()
            })
            .collect()
    }
}

/// Field path prefix within one stage
struct Fields {
    stage: Stage,
    prefix: String,
}

impl Fields {
    fn new(stage: Stage, prefix: impl Into<String>) -> Self {
        Self {
            stage,
            prefix: prefix.into(),
        }
    }

    fn path(&self, field: &str) -> String {
        format!("{}.{field}", self.prefix)
    }

    fn required<'a>(&self, field: &str, value: &'a str) -> Result<&'a str, IncompleteDraftError> {
        let value = value.trim();
        if value.is_empty() {
            Err(IncompleteDraftError::missing(self.stage, self.path(field)))
        } else {
            Ok(value)
        }
    }

    fn parsed<T>(
        &self,
        field: &str,
        value: &str,
        parse: impl FnOnce(&str) -> Result<T, ModelError>,
    ) -> Result<T, IncompleteDraftError> {
        let value = self.required(field, value)?;
        parse(value).map_err(|e| IncompleteDraftError::invalid(self.stage, self.path(field), e))
    }

    fn optional<T>(
        &self,
        field: &str,
        value: &str,
        parse: impl FnOnce(&str) -> Result<T, ModelError>,
    ) -> Result<Option<T>, IncompleteDraftError> {
        let value = value.trim();
        if value.is_empty() {
            return Ok(None);
        }
        parse(value)
            .map(Some)
            .map_err(|e| IncompleteDraftError::invalid(self.stage, self.path(field), e))
    }
}

fn text(value: &str) -> String {
    value.trim().to_string()
}

fn parse_program(form: &ProgramForm) -> Result<ProgramDraft, IncompleteDraftError> {
    let fields = Fields::new(Stage::Program, "program");
    let name = fields.required("name", &form.name)?;
    let year = fields.parsed("year", &form.year, parse_year)?;
    let status = fields.parsed("status", &form.status, str::parse::<ProgramStatus>)?;
    let total_budget = fields.parsed("budget", &form.budget, Budget::parse)?;
    let visibility = fields
        .optional("visibility", &form.visibility, str::parse::<Visibility>)?
        .unwrap_or_default();

    Ok(ProgramDraft {
        name: name.to_string(),
        description: text(&form.description),
        year,
        status,
        total_budget,
        visibility,
        focus_area: text(&form.focus_area),
        location: text(&form.location),
        strategic_objective: text(&form.strategic_objective),
    })
}

fn parse_activity(index: usize, form: &ActivityForm) -> Result<ActivityDraft, IncompleteDraftError> {
    let fields = Fields::new(Stage::Activities, format!("activities[{index}]"));
    let name = fields.required("name", &form.name)?;
    let start = fields.parsed("start_date", &form.start_date, parse_date)?;
    let end = fields.parsed("end_date", &form.end_date, parse_date)?;
    let timeline = Timeline::new(start, end)
        .map_err(|e| IncompleteDraftError::invalid(fields.stage, fields.path("end_date"), e))?;
    let budget = fields.parsed("budget", &form.budget, Budget::parse)?;
    let status = fields.parsed("status", &form.status, str::parse::<ActivityStatus>)?;
    let progress = fields
        .optional("progress", &form.progress, Progress::parse)?
        .unwrap_or_default();

    Ok(ActivityDraft {
        name: name.to_string(),
        description: text(&form.description),
        outcome: text(&form.outcome),
        kpi: text(&form.kpi),
        timeline,
        budget,
        status,
        responsible_person: text(&form.responsible_person),
        progress,
    })
}

fn parse_task(
    activity_index: usize,
    index: usize,
    form: &TaskForm,
) -> Result<TaskDraft, IncompleteDraftError> {
    let fields = Fields::new(Stage::Tasks, format!("activities[{activity_index}].tasks[{index}]"));
    let name = fields.required("name", &form.name)?;
    let target = fields.optional("target", &form.target, parse_target)?;
    let due_date = fields.optional("due_date", &form.due_date, parse_date)?;
    let budget = fields
        .optional("budget", &form.budget, Budget::parse)?
        .unwrap_or(Budget::ZERO);
    let status = fields
        .optional("status", &form.status, TaskStatus::parse)?
        .unwrap_or_default();

    Ok(TaskDraft {
        name: name.to_string(),
        target,
        duration: text(&form.duration),
        due_date,
        budget,
        status,
        narrative: TaskNarrative {
            output: text(&form.output),
            outcome: text(&form.outcome),
            evaluation_criteria: text(&form.evaluation_criteria),
            risks: text(&form.risks),
            mitigation: text(&form.mitigation),
            resource_person: text(&form.resource_person),
            learning: text(&form.learning),
            self_evaluation: text(&form.self_evaluation),
            notes: text(&form.notes),
        },
    })
}
