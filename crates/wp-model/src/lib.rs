//! Workplan Model
//!
//! Shared data model of the workplan provisioning workspace.
//!
//! # Core Concepts
//!
//! - [`DraftTree`]: immutable Program → Activities → Tasks draft, before persistence
//! - [`ProvisionedTree`]: the same tree as persisted, with server identifiers
//! - [`Budget`], [`Progress`], [`TaskStatus`], [`Timeline`]: validated field values
//! - [`ProgramId`], [`ActivityId`], [`TaskId`]: server-assigned identifiers
//!
//! # Example
//!
//! ```rust,ignore
//! use wp_model::{ActivityDraft, Budget, DraftActivity, DraftTree, ProgramDraft};
//!
//! let program = ProgramDraft::new("Literacy 2025", 2025, Budget::new(12_000.0)?);
//! let tree = DraftTree::for_new_program(program, vec![DraftActivity::new(outreach, tasks)]);
//! assert_eq!(tree.counts().activities, 1);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod draft;
mod error;
mod fields;
mod ids;
mod record;

pub use draft::{
    ActivityDraft, DraftActivity, DraftTree, ProgramDraft, TaskDraft, TaskNarrative, TreeCounts,
    TreeRoot,
};
pub use error::ModelError;
pub use fields::{
    parse_date, parse_target, parse_year, ActivityStatus, Budget, Progress, ProgramStatus,
    TaskStatus, Timeline, Visibility,
};
pub use ids::{ActivityId, EntityKind, EntityRef, ProgramId, RunId, TaskId};
pub use record::{
    ActivityRecord, LinkViolation, ProgramRecord, ProvisionedActivity, ProvisionedTree, TaskRecord,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
