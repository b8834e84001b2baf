//! Compensate policy and concurrent scheduling.

use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use wp_gateway::{FaultPlan, GatewayError, InMemoryGateway, Operation};
use wp_model::{EntityKind, EntityRef, TreeCounts};
use wp_provision::{CompensationReport, FailedStep, FailurePolicy, ProvisionConfig, ProvisionError};
use wp_test_utils::{
    literacy_2025_tree, setup_gateway, setup_provisioner, tree_with_shape, workplan_tree,
};

fn compensating() -> ProvisionConfig {
    ProvisionConfig::new()
        .with_failure_policy(FailurePolicy::Compensate)
        .with_compensation_backoff(Duration::ZERO)
}

fn concurrent(max_in_flight: usize) -> ProvisionConfig {
    ProvisionConfig::concurrent(max_in_flight).with_compensation_backoff(Duration::ZERO)
}

fn faulty(faults: FaultPlan) -> Arc<InMemoryGateway> {
    Arc::new(InMemoryGateway::with_faults(faults))
}

#[tokio::test]
async fn test_compensation_leaves_gateway_empty() {
    let gateway = faulty(FaultPlan::new().fail_nth(
        Operation::CreateTask,
        3,
        GatewayError::unavailable("timeout"),
    ));
    let err = setup_provisioner(&gateway, compensating())
        .provision(&literacy_2025_tree())
        .await
        .unwrap_err();

    let failure = err.partial_failure().expect("partial failure");
    match &failure.compensation {
        CompensationReport::Completed { deleted } => {
            assert_eq!(deleted.len(), 5);
            assert_eq!(deleted.last(), Some(&EntityRef::Program(failure.program_id)));
            // Training was created last and had no tasks yet.
            assert_eq!(deleted[0].kind(), EntityKind::Activity);
            assert_eq!(deleted[1].kind(), EntityKind::Task);
        }
        other => panic!("expected completed compensation, got {other:?}"),
    }
    assert!(gateway.is_empty());
    assert!(!err.requires_human());
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_failing_delete_reports_incomplete() {
    let gateway = faulty(
        FaultPlan::new()
            .fail_nth(Operation::CreateTask, 2, GatewayError::unavailable("timeout"))
            .fail_always(
                Operation::DeleteTask,
                GatewayError::rejected(EntityKind::Task, "locked"),
            ),
    );
    let err = setup_provisioner(&gateway, compensating())
        .provision(&literacy_2025_tree())
        .await
        .unwrap_err();

    let failure = err.partial_failure().expect("partial failure");
    let task = EntityRef::Task(failure.created_tasks[0]);
    let activity = EntityRef::Activity(failure.created_activities[0]);
    let program = EntityRef::Program(failure.program_id);

    // The task refuses deletion, so its activity and the program stay too.
    assert_eq!(failure.compensation.remaining(), &[task, activity, program]);
    assert!(err.requires_human());
    assert!(!err.is_retryable());
    assert_eq!(gateway.task_count(), 1);
    assert_eq!(gateway.program_count(), 1);
}

#[tokio::test]
async fn test_retryable_delete_failure_recovers() {
    let gateway = faulty(
        FaultPlan::new()
            .fail_nth(Operation::CreateActivity, 2, GatewayError::unavailable("timeout"))
            .fail_nth(Operation::DeleteActivity, 1, GatewayError::unavailable("blip")),
    );
    let err = setup_provisioner(&gateway, compensating().with_compensation_retries(1))
        .provision(&literacy_2025_tree())
        .await
        .unwrap_err();

    assert!(err.partial_failure().expect("partial failure").compensation.is_complete());
    assert_eq!(gateway.call_count(Operation::DeleteActivity), 2);
    assert!(gateway.is_empty());
}

#[tokio::test]
async fn test_workplan_anchor_is_never_deleted() {
    let gateway = setup_gateway();
    let existing = setup_provisioner(&gateway, ProvisionConfig::default())
        .provision(&literacy_2025_tree())
        .await
        .unwrap();

    gateway.set_faults(FaultPlan::new().fail_nth(
        Operation::CreateTask,
        5,
        GatewayError::unavailable("timeout"),
    ));
    let err = setup_provisioner(&gateway, compensating())
        .provision(&workplan_tree(existing.program_id(), &[1, 2]))
        .await
        .unwrap_err();

    let failure = err.partial_failure().expect("partial failure");
    assert!(!failure.program_created);
    assert!(failure.compensation.is_complete());
    assert_eq!(gateway.call_count(Operation::DeleteProgram), 0);
    assert_eq!(gateway.program_count(), 1);
    assert_eq!(gateway.activity_count(), 2);
    assert_eq!(gateway.task_count(), 3);
}

#[tokio::test]
async fn test_concurrent_builds_same_tree_as_sequential() {
    let shape = [3, 0, 2, 4, 1];

    let sequential_gateway = setup_gateway();
    let sequential = setup_provisioner(&sequential_gateway, ProvisionConfig::default())
        .provision(&tree_with_shape(&shape))
        .await
        .unwrap();

    let concurrent_gateway = Arc::new(InMemoryGateway::new().with_latency(Duration::from_millis(2)));
    let parallel = setup_provisioner(&concurrent_gateway, concurrent(3))
        .provision(&tree_with_shape(&shape))
        .await
        .unwrap();

    assert_eq!(parallel.counts(), sequential.counts());
    assert_eq!(parallel.counts(), TreeCounts::new(5, 10));
    assert!(parallel.check_links().is_ok());

    // Each branch keeps its own tasks in draft order.
    for branch in &parallel.activities {
        let activity = branch.activity.fields.name.trim_start_matches("Activity ");
        for (index, task) in branch.tasks.iter().enumerate() {
            assert_eq!(task.fields.name, format!("Task {activity}.{index}"));
        }
    }
}

#[tokio::test]
async fn test_concurrent_failure_compensates_every_branch() {
    let gateway = Arc::new(
        InMemoryGateway::with_faults(FaultPlan::new().fail_nth(
            Operation::CreateTask,
            4,
            GatewayError::rejected(EntityKind::Task, "invalid target"),
        ))
        .with_latency(Duration::from_millis(1)),
    );
    let err = setup_provisioner(&gateway, concurrent(4))
        .provision(&tree_with_shape(&[3, 3, 3]))
        .await
        .unwrap_err();

    let failure = err.partial_failure().expect("partial failure");
    assert!(matches!(failure.failed_step, FailedStep::Task { .. }));
    assert!(failure.compensation.is_complete());
    assert!(gateway.is_empty());
    assert_eq!(
        gateway.call_count(Operation::DeleteTask),
        failure.created_tasks.len()
    );
}

#[tokio::test]
async fn test_concurrent_reports_earliest_failure_in_draft_order() {
    let gateway = faulty(FaultPlan::new().fail_always(
        Operation::CreateActivity,
        GatewayError::unavailable("down"),
    ));
    let err = setup_provisioner(&gateway, concurrent(8))
        .provision(&tree_with_shape(&[1, 1, 1]))
        .await
        .unwrap_err();

    let failure = err.partial_failure().expect("partial failure");
    assert_eq!(
        failure.failed_step,
        FailedStep::Activity {
            index: 0,
            name: "Activity 0".into()
        }
    );
    assert!(failure.created_activities.is_empty());
    assert_eq!(
        failure.compensation,
        CompensationReport::Completed {
            deleted: vec![EntityRef::Program(failure.program_id)]
        }
    );
}

#[tokio::test]
async fn test_single_permit_runs_branches_one_at_a_time() {
    let gateway = setup_gateway();
    setup_provisioner(&gateway, concurrent(1))
        .provision(&tree_with_shape(&[2, 2]))
        .await
        .unwrap();

    let ops: Vec<_> = gateway.calls().iter().map(wp_gateway::GatewayCall::operation).collect();
    assert_eq!(
        ops,
        vec![
            Operation::CreateProgram,
            Operation::CreateActivity,
            Operation::CreateTask,
            Operation::CreateTask,
            Operation::CreateActivity,
            Operation::CreateTask,
            Operation::CreateTask,
            Operation::ReadProgram,
        ]
    );
}

#[test]
fn test_concurrent_requires_compensation() {
    let config = ProvisionConfig::concurrent(2).with_failure_policy(FailurePolicy::LeaveInPlace);
    let err = wp_provision::Provisioner::with_config(setup_gateway(), config).unwrap_err();
    assert_eq!(
        ProvisionError::from(err).to_string(),
        "concurrent scheduling requires the compensate failure policy"
    );
}
