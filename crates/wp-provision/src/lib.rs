//! Workplan Provisioning
//!
//! Turns a wizard session into a persisted Program → Activities → Tasks
//! tree over a backend without multi-record transactions:
//! - [`DraftTreeBuilder`] collects and validates the draft, stage by stage
//! - [`Provisioner`] creates the records in dependency order
//! - [`CompensationLog`] undoes a failed run when configured to
//! - [`ConsistencyVerifier`] confirms the result with one hydrated read
//!
//! A run either returns the verified [`ProvisionedTree`](wp_model::ProvisionedTree)
//! or a [`ProvisionError`] naming exactly what was persisted.
//!
//! # Example
//!
//! ```rust,ignore
//! use wp_provision::prelude::*;
//!
//! # async fn example(gateway: Arc<dyn Gateway>, builder: DraftTreeBuilder) -> Result<(), ProvisionError> {
//! let tree = builder.finalize()?;
//! let provisioner = Provisioner::with_config(gateway, ProvisionConfig::new())?;
//!
//! let provisioned = provisioner.provision(&tree).await?;
//! println!("created {} under {}", provisioned.counts(), provisioned.program_id());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod builder;
pub mod compensation;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod plan;
pub mod verifier;

pub use builder::{ActivityForm, DraftTreeBuilder, ProgramForm, Stage, TaskForm};
pub use compensation::{CompensationLog, CompensationReport};
pub use config::{ConfigError, FailurePolicy, ProvisionConfig, Scheduling};
pub use error::{FailedStep, FieldProblem, IncompleteDraftError, PartialFailure, ProvisionError};
pub use orchestrator::Provisioner;
pub use plan::{Branch, PlannedStep, ProvisionPlan};
pub use verifier::ConsistencyVerifier;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for provisioning a draft tree
    pub use crate::{
        ActivityForm, CompensationReport, DraftTreeBuilder, FailurePolicy, ProgramForm,
        ProvisionConfig, ProvisionError, Provisioner, Scheduling, Stage, TaskForm,
    };
    pub use std::sync::Arc;
    pub use wp_gateway::{Gateway, GatewayError};
    pub use wp_model::{DraftTree, ProgramId, ProvisionedTree};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
