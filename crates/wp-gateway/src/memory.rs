//! In-memory gateway
//!
//! A thread-safe, in-process backend. Children keep insertion order, deletes
//! of records that still have children are refused (like a restricting
//! foreign key), and a [`FaultPlan`] can make chosen calls fail or make reads
//! stale.

use crate::error::GatewayError;
use crate::Gateway;
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use wp_model::{
    ActivityDraft, ActivityId, ActivityRecord, EntityKind, ProgramDraft, ProgramId,
    ProgramRecord, ProvisionedActivity, ProvisionedTree, TaskDraft, TaskId, TaskRecord,
};

/// Gateway operation kinds, used to address faults and count calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateProgram,
    CreateActivity,
    CreateTask,
    ReadProgram,
    DeleteProgram,
    DeleteActivity,
    DeleteTask,
}

/// One recorded gateway call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    CreateProgram { name: String },
    CreateActivity { program_id: ProgramId, name: String },
    CreateTask { activity_id: ActivityId, name: String },
    ReadProgram(ProgramId),
    DeleteProgram(ProgramId),
    DeleteActivity(ActivityId),
    DeleteTask(TaskId),
}

impl GatewayCall {
    /// Operation kind of this call
    #[must_use]
    pub fn operation(&self) -> Operation {
        match self {
            Self::CreateProgram { .. } => Operation::CreateProgram,
            Self::CreateActivity { .. } => Operation::CreateActivity,
            Self::CreateTask { .. } => Operation::CreateTask,
            Self::ReadProgram(_) => Operation::ReadProgram,
            Self::DeleteProgram(_) => Operation::DeleteProgram,
            Self::DeleteActivity(_) => Operation::DeleteActivity,
            Self::DeleteTask(_) => Operation::DeleteTask,
        }
    }
}

/// Scripted failures and stale reads
///
/// Call numbers are 1-based and count every call of the operation,
/// including failed ones.
#[derive(Debug, Clone, Default)]
pub struct FaultPlan {
    nth: HashMap<(Operation, usize), GatewayError>,
    always: HashMap<Operation, GatewayError>,
    hidden_activities: usize,
    hidden_tasks: usize,
}

impl FaultPlan {
    /// Empty plan: every call succeeds
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the `n`-th call of `operation`
    #[inline]
    #[must_use]
    pub fn fail_nth(mut self, operation: Operation, n: usize, error: GatewayError) -> Self {
        self.nth.insert((operation, n), error);
        self
    }

    /// Fail every call of `operation`
    #[inline]
    #[must_use]
    pub fn fail_always(mut self, operation: Operation, error: GatewayError) -> Self {
        self.always.insert(operation, error);
        self
    }

    /// Hide the last `activities` activities and the last `tasks` tasks of
    /// every hydrated read, as a lagging replica would
    #[inline]
    #[must_use]
    pub fn stale_reads(mut self, activities: usize, tasks: usize) -> Self {
        self.hidden_activities = activities;
        self.hidden_tasks = tasks;
        self
    }

    fn fault_for(&self, operation: Operation, call_number: usize) -> Option<GatewayError> {
        self.nth
            .get(&(operation, call_number))
            .or_else(|| self.always.get(&operation))
            .cloned()
    }
}

#[derive(Debug, Default)]
struct Store {
    programs: IndexMap<ProgramId, ProgramDraft>,
    activities: IndexMap<ActivityId, (ProgramId, ActivityDraft)>,
    tasks: IndexMap<TaskId, (ActivityId, TaskDraft)>,
}

#[derive(Debug, Default)]
struct CallLog {
    calls: Vec<GatewayCall>,
    counts: HashMap<Operation, usize>,
}

/// In-memory backend
#[derive(Debug, Default)]
pub struct InMemoryGateway {
    store: Mutex<Store>,
    log: Mutex<CallLog>,
    faults: Mutex<FaultPlan>,
    latency: Option<Duration>,
}

impl InMemoryGateway {
    /// Create an empty, fault-free gateway
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with a fault plan
    #[inline]
    #[must_use]
    pub fn with_faults(faults: FaultPlan) -> Self {
        Self {
            faults: Mutex::new(faults),
            ..Self::default()
        }
    }

    /// Delay every call, to make interleaving observable
    #[inline]
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Replace the fault plan (e.g. to model a recovered backend)
    pub fn set_faults(&self, faults: FaultPlan) {
        *self.faults.lock() = faults;
    }

    /// All calls so far, in arrival order
    #[must_use]
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.log.lock().calls.clone()
    }

    /// Number of calls of one operation so far
    #[must_use]
    pub fn call_count(&self, operation: Operation) -> usize {
        self.log.lock().counts.get(&operation).copied().unwrap_or(0)
    }

    /// Number of stored programs
    #[must_use]
    pub fn program_count(&self) -> usize {
        self.store.lock().programs.len()
    }

    /// Number of stored activities
    #[must_use]
    pub fn activity_count(&self) -> usize {
        self.store.lock().activities.len()
    }

    /// Number of stored tasks
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.store.lock().tasks.len()
    }

    /// Whether nothing is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        let store = self.store.lock();
        store.programs.is_empty() && store.activities.is_empty() && store.tasks.is_empty()
    }

    /// Names of stored programs, in creation order
    #[must_use]
    pub fn program_names(&self) -> Vec<String> {
        self.store
            .lock()
            .programs
            .values()
            .map(|p| p.name.clone())
            .collect()
    }

    /// Record the call and return the scripted fault for it, if any
    async fn enter(&self, call: GatewayCall) -> Result<(), GatewayError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let operation = call.operation();
        let call_number = {
            let mut log = self.log.lock();
            log.calls.push(call);
            let count = log.counts.entry(operation).or_insert(0);
            *count += 1;
            *count
        };
        match self.faults.lock().fault_for(operation, call_number) {
            Some(error) => {
                tracing::debug!(?operation, call_number, %error, "injected gateway fault");
                Err(error)
            }
            None => Ok(()),
        }
    }

    fn hydrate(&self, store: &Store, program_id: ProgramId) -> Option<ProvisionedTree> {
        let fields = store.programs.get(&program_id)?.clone();
        let activities = store
            .activities
            .iter()
            .filter(|(_, (owner, _))| *owner == program_id)
            .map(|(id, (owner, draft))| ProvisionedActivity {
                activity: ActivityRecord {
                    id: *id,
                    program_id: *owner,
                    fields: draft.clone(),
                },
                tasks: store
                    .tasks
                    .iter()
                    .filter(|(_, (parent, _))| parent == id)
                    .map(|(task_id, (parent, task))| TaskRecord {
                        id: *task_id,
                        activity_id: *parent,
                        fields: task.clone(),
                    })
                    .collect(),
            })
            .collect();
        Some(ProvisionedTree {
            program: ProgramRecord {
                id: program_id,
                fields,
            },
            activities,
        })
    }

    fn apply_staleness(&self, tree: &mut ProvisionedTree) {
        let faults = self.faults.lock();
        let keep = tree.activities.len().saturating_sub(faults.hidden_activities);
        tree.activities.truncate(keep);

        let mut to_hide = faults.hidden_tasks;
        for branch in tree.activities.iter_mut().rev() {
            if to_hide == 0 {
                break;
            }
            let removed = to_hide.min(branch.tasks.len());
            branch.tasks.truncate(branch.tasks.len() - removed);
            to_hide -= removed;
        }
    }
}

#[async_trait::async_trait]
impl Gateway for InMemoryGateway {
    async fn create_program(&self, draft: &ProgramDraft) -> Result<ProgramId, GatewayError> {
        self.enter(GatewayCall::CreateProgram {
            name: draft.name.clone(),
        })
        .await?;
        let id = ProgramId::new();
        self.store.lock().programs.insert(id, draft.clone());
        Ok(id)
    }

    async fn create_activity(
        &self,
        program_id: ProgramId,
        draft: &ActivityDraft,
    ) -> Result<ActivityId, GatewayError> {
        self.enter(GatewayCall::CreateActivity {
            program_id,
            name: draft.name.clone(),
        })
        .await?;
        let mut store = self.store.lock();
        if !store.programs.contains_key(&program_id) {
            return Err(GatewayError::not_found(EntityKind::Program, program_id));
        }
        let id = ActivityId::new();
        store.activities.insert(id, (program_id, draft.clone()));
        Ok(id)
    }

    async fn create_task(
        &self,
        activity_id: ActivityId,
        draft: &TaskDraft,
    ) -> Result<TaskId, GatewayError> {
        self.enter(GatewayCall::CreateTask {
            activity_id,
            name: draft.name.clone(),
        })
        .await?;
        let mut store = self.store.lock();
        if !store.activities.contains_key(&activity_id) {
            return Err(GatewayError::not_found(EntityKind::Activity, activity_id));
        }
        let id = TaskId::new();
        store.tasks.insert(id, (activity_id, draft.clone()));
        Ok(id)
    }

    async fn read_program_with_children(
        &self,
        program_id: ProgramId,
    ) -> Result<ProvisionedTree, GatewayError> {
        self.enter(GatewayCall::ReadProgram(program_id)).await?;
        let mut tree = {
            let store = self.store.lock();
            self.hydrate(&store, program_id)
                .ok_or_else(|| GatewayError::not_found(EntityKind::Program, program_id))?
        };
        self.apply_staleness(&mut tree);
        Ok(tree)
    }

    async fn delete_program(&self, program_id: ProgramId) -> Result<(), GatewayError> {
        self.enter(GatewayCall::DeleteProgram(program_id)).await?;
        let mut store = self.store.lock();
        if store.activities.values().any(|(owner, _)| *owner == program_id) {
            return Err(GatewayError::rejected(
                EntityKind::Program,
                format!("program {program_id} still has activities"),
            ));
        }
        store
            .programs
            .shift_remove(&program_id)
            .map(|_| ())
            .ok_or_else(|| GatewayError::not_found(EntityKind::Program, program_id))
    }

    async fn delete_activity(&self, activity_id: ActivityId) -> Result<(), GatewayError> {
        self.enter(GatewayCall::DeleteActivity(activity_id)).await?;
        let mut store = self.store.lock();
        if store.tasks.values().any(|(parent, _)| *parent == activity_id) {
            return Err(GatewayError::rejected(
                EntityKind::Activity,
                format!("activity {activity_id} still has tasks"),
            ));
        }
        store
            .activities
            .shift_remove(&activity_id)
            .map(|_| ())
            .ok_or_else(|| GatewayError::not_found(EntityKind::Activity, activity_id))
    }

    async fn delete_task(&self, task_id: TaskId) -> Result<(), GatewayError> {
        self.enter(GatewayCall::DeleteTask(task_id)).await?;
        self.store
            .lock()
            .tasks
            .shift_remove(&task_id)
            .map(|_| ())
            .ok_or_else(|| GatewayError::not_found(EntityKind::Task, task_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use wp_model::{Budget, Timeline};

    fn program() -> ProgramDraft {
        ProgramDraft::new("Literacy 2025", 2025, Budget::new(5_000.0).unwrap())
    }

    fn activity(name: &str) -> ActivityDraft {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
        ActivityDraft::new(name, Timeline::new(start, end).unwrap(), Budget::ZERO)
    }

    #[tokio::test]
    async fn hydration_keeps_creation_order_and_links() {
        let gw = InMemoryGateway::new();
        let p = gw.create_program(&program()).await.unwrap();
        let a1 = gw.create_activity(p, &activity("Outreach")).await.unwrap();
        let a2 = gw.create_activity(p, &activity("Training")).await.unwrap();
        gw.create_task(a1, &TaskDraft::new("Flyers")).await.unwrap();
        gw.create_task(a2, &TaskDraft::new("Workshop")).await.unwrap();
        gw.create_task(a1, &TaskDraft::new("Visits")).await.unwrap();

        let tree = gw.read_program_with_children(p).await.unwrap();
        assert_eq!(tree.activity_ids().collect::<Vec<_>>(), vec![a1, a2]);
        let names: Vec<_> = tree.activities[0].tasks.iter().map(|t| t.fields.name.as_str()).collect();
        assert_eq!(names, vec!["Flyers", "Visits"]);
        assert!(tree.check_links().is_ok());
    }

    #[tokio::test]
    async fn nth_fault_counts_failed_calls() {
        let faults = FaultPlan::new().fail_nth(
            Operation::CreateTask,
            2,
            GatewayError::unavailable("connection reset"),
        );
        let gw = InMemoryGateway::with_faults(faults);
        let p = gw.create_program(&program()).await.unwrap();
        let a = gw.create_activity(p, &activity("Outreach")).await.unwrap();

        assert!(gw.create_task(a, &TaskDraft::new("one")).await.is_ok());
        assert!(gw.create_task(a, &TaskDraft::new("two")).await.is_err());
        assert!(gw.create_task(a, &TaskDraft::new("three")).await.is_ok());
        assert_eq!(gw.call_count(Operation::CreateTask), 3);
        assert_eq!(gw.task_count(), 2);
    }

    #[tokio::test]
    async fn delete_is_refused_while_children_exist() {
        let gw = InMemoryGateway::new();
        let p = gw.create_program(&program()).await.unwrap();
        let a = gw.create_activity(p, &activity("Outreach")).await.unwrap();
        let t = gw.create_task(a, &TaskDraft::new("Flyers")).await.unwrap();

        assert!(matches!(
            gw.delete_program(p).await,
            Err(GatewayError::Rejected { .. })
        ));
        assert!(gw.delete_activity(a).await.is_err());
        gw.delete_task(t).await.unwrap();
        gw.delete_activity(a).await.unwrap();
        gw.delete_program(p).await.unwrap();
        assert!(gw.is_empty());
    }

    #[tokio::test]
    async fn stale_reads_hide_trailing_children() {
        let gw = InMemoryGateway::with_faults(FaultPlan::new().stale_reads(0, 1));
        let p = gw.create_program(&program()).await.unwrap();
        let a1 = gw.create_activity(p, &activity("Outreach")).await.unwrap();
        let a2 = gw.create_activity(p, &activity("Training")).await.unwrap();
        gw.create_task(a1, &TaskDraft::new("Flyers")).await.unwrap();
        gw.create_task(a2, &TaskDraft::new("Workshop")).await.unwrap();

        let tree = gw.read_program_with_children(p).await.unwrap();
        assert_eq!(tree.counts().activities, 2);
        assert_eq!(tree.counts().tasks, 1);
        assert!(tree.activities[1].tasks.is_empty());
    }

    #[tokio::test]
    async fn children_of_unknown_parents_are_not_found() {
        let gw = InMemoryGateway::new();
        let err = gw
            .create_activity(ProgramId::new(), &activity("Orphan"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::NotFound { entity: EntityKind::Program, .. }));
    }
}
