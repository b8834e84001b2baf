use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use wp_gateway::{FaultPlan, GatewayError, InMemoryGateway, Operation};
use wp_model::{EntityKind, TreeCounts};
use wp_provision::{FailurePolicy, ProvisionConfig, Provisioner};
use wp_test_utils::tree_with_shape;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn shape() -> impl Strategy<Value = Vec<usize>> {
    proptest::collection::vec(0..5usize, 1..6)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_full_success_creates_exact_tree(shape in shape(), concurrent in any::<bool>()) {
        let config = if concurrent {
            ProvisionConfig::concurrent(3)
        } else {
            ProvisionConfig::default()
        };
        let gateway = Arc::new(InMemoryGateway::new());
        let provisioner = Provisioner::with_config(gateway.clone(), config).unwrap();

        let tree = runtime().block_on(provisioner.provision(&tree_with_shape(&shape))).unwrap();

        let expected = TreeCounts::new(shape.len(), shape.iter().sum());
        prop_assert_eq!(tree.counts(), expected);
        prop_assert!(tree.check_links().is_ok());
        prop_assert_eq!(gateway.activity_count(), expected.activities);
        prop_assert_eq!(gateway.task_count(), expected.tasks);
    }

    #[test]
    fn prop_task_failure_keeps_exactly_earlier_records(shape in shape(), pick in any::<prop::sample::Index>()) {
        let total: usize = shape.iter().sum();
        prop_assume!(total > 0);
        let failing = pick.index(total) + 1;

        let gateway = Arc::new(InMemoryGateway::with_faults(FaultPlan::new().fail_nth(
            Operation::CreateTask,
            failing,
            GatewayError::rejected(EntityKind::Task, "rejected"),
        )));
        let provisioner = Provisioner::new(gateway.clone());
        let err = runtime().block_on(provisioner.provision(&tree_with_shape(&shape))).unwrap_err();
        let failure = err.partial_failure().expect("partial failure");

        prop_assert_eq!(failure.created_tasks.len(), failing - 1);
        prop_assert_eq!(gateway.task_count(), failing - 1);

        // Activities up to and including the failing task's branch exist.
        let mut seen = 0;
        let branch = shape.iter().position(|&tasks| {
            seen += tasks;
            seen >= failing
        }).unwrap();
        prop_assert_eq!(failure.created_activities.len(), branch + 1);
        prop_assert_eq!(failure.failed_step.activity_index(), branch);
    }

    #[test]
    fn prop_compensation_always_cleans_up(shape in shape(), failing in 1..8usize) {
        let gateway = Arc::new(InMemoryGateway::with_faults(FaultPlan::new().fail_nth(
            Operation::CreateActivity,
            failing,
            GatewayError::unavailable("down"),
        )));
        let config = ProvisionConfig::new()
            .with_failure_policy(FailurePolicy::Compensate)
            .with_compensation_backoff(Duration::ZERO);
        let provisioner = Provisioner::with_config(gateway.clone(), config).unwrap();

        let result = runtime().block_on(provisioner.provision(&tree_with_shape(&shape)));
        if failing <= shape.len() {
            let err = result.unwrap_err();
            prop_assert!(err.partial_failure().expect("partial failure").compensation.is_complete());
            prop_assert!(gateway.is_empty());
        } else {
            prop_assert_eq!(result.unwrap().counts().activities, shape.len());
        }
    }
}
