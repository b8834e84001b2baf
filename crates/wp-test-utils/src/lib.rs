//! Testing utilities for the workplan workspace
//!
//! Shared draft trees, wizard forms and provisioner setup.

#![allow(missing_docs)]

use chrono::NaiveDate;
use std::sync::Arc;
use wp_gateway::InMemoryGateway;
use wp_model::{
    ActivityDraft, ActivityStatus, Budget, DraftActivity, DraftTree, ProgramDraft, ProgramId,
    ProgramStatus, TaskDraft, Timeline,
};
use wp_provision::{ActivityForm, ProgramForm, ProvisionConfig, Provisioner, TaskForm};

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn program_draft(name: &str) -> ProgramDraft {
    ProgramDraft::new(name, 2025, Budget::new(12_000.0).unwrap()).with_status(ProgramStatus::Active)
}

pub fn activity_draft(name: &str) -> ActivityDraft {
    let timeline = Timeline::new(date(2025, 2, 1), date(2025, 5, 31)).unwrap();
    ActivityDraft::new(name, timeline, Budget::new(3_000.0).unwrap())
        .with_status(ActivityStatus::NotStarted)
}

pub fn branch(name: &str, tasks: &[&str]) -> DraftActivity {
    DraftActivity::new(
        activity_draft(name),
        tasks.iter().map(|t| TaskDraft::new(*t)).collect(),
    )
}

/// "Literacy 2025": Outreach (Flyers, Visits) and Training (Workshop)
pub fn literacy_2025_tree() -> DraftTree {
    DraftTree::for_new_program(program_draft("Literacy 2025"), literacy_2025_branches())
}

pub fn literacy_2025_branches() -> Vec<DraftActivity> {
    vec![
        branch("Outreach", &["Flyers", "Visits"]),
        branch("Training", &["Workshop"]),
    ]
}

/// New-program tree with the given number of tasks per activity
pub fn tree_with_shape(shape: &[usize]) -> DraftTree {
    DraftTree::for_new_program(program_draft("Shaped"), branches_with_shape(shape))
}

pub fn branches_with_shape(shape: &[usize]) -> Vec<DraftActivity> {
    shape
        .iter()
        .enumerate()
        .map(|(a, &tasks)| {
            let names: Vec<String> = (0..tasks).map(|t| format!("Task {a}.{t}")).collect();
            let refs: Vec<&str> = names.iter().map(String::as_str).collect();
            branch(&format!("Activity {a}"), &refs)
        })
        .collect()
}

pub fn workplan_tree(program_id: ProgramId, shape: &[usize]) -> DraftTree {
    DraftTree::for_existing_program(program_id, branches_with_shape(shape))
}

pub fn program_form() -> ProgramForm {
    ProgramForm {
        name: "Literacy 2025".into(),
        year: "2025".into(),
        status: "active".into(),
        budget: "12000".into(),
        visibility: "public".into(),
        ..ProgramForm::default()
    }
}

pub fn activity_form(name: &str) -> ActivityForm {
    ActivityForm {
        name: name.into(),
        start_date: "2025-02-01".into(),
        end_date: "2025-05-31".into(),
        budget: "3000".into(),
        status: "not_started".into(),
        ..ActivityForm::default()
    }
}

pub fn task_form(name: &str) -> TaskForm {
    TaskForm {
        name: name.into(),
        ..TaskForm::default()
    }
}

pub fn setup_gateway() -> Arc<InMemoryGateway> {
    Arc::new(InMemoryGateway::new())
}

pub fn setup_provisioner(gateway: &Arc<InMemoryGateway>, config: ProvisionConfig) -> Provisioner {
    Provisioner::with_config(gateway.clone(), config).unwrap()
}
