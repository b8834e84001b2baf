//! Workplan Gateway
//!
//! The persistence seam of the provisioner. A [`Gateway`] exposes independent,
//! non-transactional create/read/delete calls per entity kind; there is no
//! batch endpoint and no cross-entity transaction.
//!
//! Backends:
//! - [`InMemoryGateway`]: in-process store with fault injection
//! - [`RestGateway`]: JSON over HTTP
//!
//! # Example
//!
//! ```rust,ignore
//! use wp_gateway::{Gateway, InMemoryGateway};
//!
//! let gateway = InMemoryGateway::new();
//! let program_id = gateway.create_program(&draft).await?;
//! let tree = gateway.read_program_with_children(program_id).await?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod error;
pub mod memory;
pub mod rest;

pub use error::GatewayError;
pub use memory::{FaultPlan, GatewayCall, InMemoryGateway, Operation};
pub use rest::{RestGateway, RestGatewayConfig};

use wp_model::{
    ActivityDraft, ActivityId, ProgramDraft, ProgramId, ProvisionedTree, TaskDraft, TaskId,
};

/// Persistence gateway
///
/// Implement this trait to connect the provisioner to a backend. Create calls
/// are not assumed idempotent: calling one twice creates two records.
#[async_trait::async_trait]
pub trait Gateway: Send + Sync {
    /// Create a program, returning its server identifier
    async fn create_program(&self, draft: &ProgramDraft) -> Result<ProgramId, GatewayError>;

    /// Create an activity under a persisted program
    async fn create_activity(
        &self,
        program_id: ProgramId,
        draft: &ActivityDraft,
    ) -> Result<ActivityId, GatewayError>;

    /// Create a task under a persisted activity
    async fn create_task(
        &self,
        activity_id: ActivityId,
        draft: &TaskDraft,
    ) -> Result<TaskId, GatewayError>;

    /// Read a program with its nested activities and tasks, in creation order
    async fn read_program_with_children(
        &self,
        program_id: ProgramId,
    ) -> Result<ProvisionedTree, GatewayError>;

    /// Delete a program (children must already be gone)
    async fn delete_program(&self, program_id: ProgramId) -> Result<(), GatewayError>;

    /// Delete an activity (tasks must already be gone)
    async fn delete_activity(&self, activity_id: ActivityId) -> Result<(), GatewayError>;

    /// Delete a task
    async fn delete_task(&self, task_id: TaskId) -> Result<(), GatewayError>;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
