//! End-to-end provisioning against the in-memory gateway, default policy.

use pretty_assertions::assert_eq;
use std::sync::Arc;
use wp_gateway::{FaultPlan, Gateway, GatewayCall, GatewayError, InMemoryGateway, Operation};
use wp_model::{EntityKind, TreeCounts};
use wp_provision::{
    CompensationReport, DraftTreeBuilder, FailedStep, ProvisionConfig, ProvisionError, Provisioner,
};
use wp_test_utils::{
    activity_form, literacy_2025_tree, program_form, setup_gateway, setup_provisioner, task_form,
    workplan_tree,
};

fn default_provisioner(gateway: &Arc<InMemoryGateway>) -> Provisioner {
    setup_provisioner(gateway, ProvisionConfig::default())
}

#[tokio::test]
async fn test_literacy_2025_full_success() {
    let gateway = setup_gateway();
    let tree = default_provisioner(&gateway)
        .provision(&literacy_2025_tree())
        .await
        .unwrap();

    assert_eq!(tree.counts(), TreeCounts::new(2, 3));
    assert_eq!(gateway.program_count(), 1);
    assert_eq!(gateway.activity_count(), 2);
    assert_eq!(gateway.task_count(), 3);
    assert!(tree.check_links().is_ok());

    let names: Vec<_> = tree.activities.iter().map(|a| a.activity.fields.name.as_str()).collect();
    assert_eq!(names, vec!["Outreach", "Training"]);
    let outreach: Vec<_> = tree.activities[0].tasks.iter().map(|t| t.fields.name.as_str()).collect();
    assert_eq!(outreach, vec!["Flyers", "Visits"]);
}

#[tokio::test]
async fn test_calls_follow_dependency_order() {
    let gateway = setup_gateway();
    default_provisioner(&gateway)
        .provision(&literacy_2025_tree())
        .await
        .unwrap();

    let ops: Vec<_> = gateway.calls().iter().map(GatewayCall::operation).collect();
    assert_eq!(
        ops,
        vec![
            Operation::CreateProgram,
            Operation::CreateActivity,
            Operation::CreateTask,
            Operation::CreateTask,
            Operation::CreateActivity,
            Operation::CreateTask,
            Operation::ReadProgram,
        ]
    );
}

/// The third task create fails: the report names Task #3 of "Training".
#[tokio::test]
async fn test_third_task_failure_is_attributed() {
    let gateway = Arc::new(InMemoryGateway::with_faults(FaultPlan::new().fail_nth(
        Operation::CreateTask,
        3,
        GatewayError::rejected(EntityKind::Task, "status out of range"),
    )));
    let err = default_provisioner(&gateway)
        .provision(&literacy_2025_tree())
        .await
        .unwrap_err();

    let failure = match err {
        ProvisionError::PartialProvisioningFailure(failure) => failure,
        other => panic!("expected PartialProvisioningFailure, got {other:?}"),
    };
    assert_eq!(failure.created_activities.len(), 2);
    assert_eq!(failure.created_tasks.len(), 2);
    assert!(failure.program_created);
    assert_eq!(
        failure.failed_step,
        FailedStep::Task {
            activity_index: 1,
            activity_name: "Training".into(),
            index: 0,
            ordinal: 3,
            name: "Workshop".into(),
        }
    );
    assert_eq!(failure.failed_step.to_string(), "Task #3 'Workshop' of Activity 'Training'");
    assert_eq!(failure.compensation, CompensationReport::NotAttempted);

    // Partial tree stays in place, no verification read is issued.
    assert_eq!(gateway.task_count(), 2);
    assert_eq!(gateway.call_count(Operation::ReadProgram), 0);
    let persisted = gateway.read_program_with_children(failure.program_id).await.unwrap();
    assert_eq!(persisted.counts(), TreeCounts::new(2, 2));
}

/// Failure of the k-th activity leaves exactly k-1 activities and none of the later tasks.
#[tokio::test]
async fn test_kth_activity_failure_stops_later_branches() {
    for k in 1..=4 {
        let gateway = Arc::new(InMemoryGateway::with_faults(FaultPlan::new().fail_nth(
            Operation::CreateActivity,
            k,
            GatewayError::unavailable("connection reset"),
        )));
        let tree = wp_test_utils::tree_with_shape(&[2, 1, 3, 2]);
        let err = default_provisioner(&gateway).provision(&tree).await.unwrap_err();
        let failure = err.partial_failure().expect("partial failure");

        let expected_tasks: usize = [2, 1, 3, 2].iter().take(k - 1).sum();
        assert_eq!(failure.created_activities.len(), k - 1);
        assert_eq!(failure.created_tasks.len(), expected_tasks);
        assert!(matches!(failure.failed_step, FailedStep::Activity { index, .. } if index == k - 1));
        assert_eq!(gateway.call_count(Operation::CreateActivity), k);
        assert!(err.requires_human());
        assert!(!err.is_retryable());
    }
}

#[tokio::test]
async fn test_rerun_after_program_failure_is_not_duplicated() {
    let gateway = Arc::new(InMemoryGateway::with_faults(FaultPlan::new().fail_nth(
        Operation::CreateProgram,
        1,
        GatewayError::unavailable("timeout"),
    )));
    let provisioner = default_provisioner(&gateway);
    let tree = literacy_2025_tree();

    let err = provisioner.provision(&tree).await.unwrap_err();
    assert!(matches!(err, ProvisionError::ProgramCreationFailed { .. }));
    assert!(err.is_retryable());
    assert!(gateway.is_empty());

    let provisioned = provisioner.provision(&tree).await.unwrap();
    assert_eq!(provisioned.counts(), TreeCounts::new(2, 3));
    assert_eq!(gateway.program_names(), vec!["Literacy 2025".to_string()]);
}

/// Create calls are not idempotent: rerunning a partially provisioned draft
/// without clearing it creates a second program.
#[tokio::test]
async fn test_rerun_after_partial_failure_duplicates_program() {
    let gateway = Arc::new(InMemoryGateway::with_faults(FaultPlan::new().fail_nth(
        Operation::CreateTask,
        3,
        GatewayError::unavailable("timeout"),
    )));
    let provisioner = default_provisioner(&gateway);
    let tree = literacy_2025_tree();

    let first = provisioner.provision(&tree).await.unwrap_err();
    let abandoned = first.partial_failure().expect("partial failure").program_id;

    let provisioned = provisioner.provision(&tree).await.unwrap();
    assert_eq!(provisioned.counts(), TreeCounts::new(2, 3));
    assert_eq!(gateway.program_count(), 2);
    assert_eq!(gateway.activity_count(), 4);
    assert_eq!(gateway.task_count(), 5);
    assert_eq!(
        gateway.program_names(),
        vec!["Literacy 2025".to_string(), "Literacy 2025".to_string()]
    );
    assert_ne!(provisioned.program_id(), abandoned);
}

#[tokio::test]
async fn test_stale_read_is_hydration_mismatch() {
    let gateway = Arc::new(InMemoryGateway::with_faults(FaultPlan::new().stale_reads(0, 1)));
    let err = default_provisioner(&gateway)
        .provision(&literacy_2025_tree())
        .await
        .unwrap_err();

    match err {
        ProvisionError::HydrationMismatch {
            expected, actual, ..
        } => {
            assert_eq!(expected, TreeCounts::new(2, 3));
            assert_eq!(actual, TreeCounts::new(2, 2));
        }
        other => panic!("expected HydrationMismatch, got {other:?}"),
    }
    // Every record was created; only the read lagged.
    assert_eq!(gateway.task_count(), 3);
}

#[tokio::test]
async fn test_stale_activity_read_is_hydration_mismatch() {
    let gateway = Arc::new(InMemoryGateway::with_faults(FaultPlan::new().stale_reads(1, 0)));
    let err = default_provisioner(&gateway)
        .provision(&literacy_2025_tree())
        .await
        .unwrap_err();
    assert!(matches!(err, ProvisionError::HydrationMismatch { .. }));
    assert!(err.requires_human());
}

#[tokio::test]
async fn test_workplan_extends_existing_program() {
    let gateway = setup_gateway();
    let provisioner = default_provisioner(&gateway);
    let existing = provisioner.provision(&literacy_2025_tree()).await.unwrap();

    let extension = workplan_tree(existing.program_id(), &[1, 2]);
    let tree = provisioner.provision(&extension).await.unwrap();

    assert_eq!(tree.program_id(), existing.program_id());
    assert_eq!(tree.counts(), TreeCounts::new(4, 6));
    assert_eq!(gateway.program_count(), 1);
}

#[tokio::test]
async fn test_unreadable_workplan_anchor_creates_nothing() {
    let gateway = setup_gateway();
    let missing = wp_model::ProgramId::new();
    let err = default_provisioner(&gateway)
        .provision(&workplan_tree(missing, &[1]))
        .await
        .unwrap_err();

    match err {
        ProvisionError::AnchorUnavailable { program_id, cause } => {
            assert_eq!(program_id, missing);
            assert!(matches!(cause, GatewayError::NotFound { .. }));
        }
        other => panic!("expected AnchorUnavailable, got {other:?}"),
    }
    assert_eq!(gateway.call_count(Operation::CreateActivity), 0);
}

#[tokio::test]
async fn test_builder_session_provisions_end_to_end() {
    let builder = DraftTreeBuilder::program_wizard()
        .with_program(program_form())
        .push_activity(activity_form("Outreach"))
        .push_task(0, task_form("Flyers"))
        .push_task(0, task_form("Visits"))
        .push_activity(activity_form("Training"))
        .push_task(1, task_form("Workshop"));
    let tree = builder.finalize().unwrap();

    let gateway = setup_gateway();
    let provisioned = default_provisioner(&gateway).provision(&tree).await.unwrap();
    assert_eq!(provisioned.counts(), TreeCounts::new(2, 3));
    assert!(provisioned.program.fields.visibility.is_public());
}

#[tokio::test]
async fn test_incomplete_draft_never_reaches_gateway() {
    let mut form = activity_form("Outreach");
    form.start_date = String::new();
    let err: ProvisionError = DraftTreeBuilder::program_wizard()
        .with_program(program_form())
        .push_activity(form)
        .finalize()
        .unwrap_err()
        .into();

    match err {
        ProvisionError::IncompleteDraft(incomplete) => {
            assert_eq!(incomplete.field, "activities[0].start_date");
        }
        other => panic!("expected IncompleteDraft, got {other:?}"),
    }
}
