//! Compensation log
//!
//! Records every entity a run creates and, on failure, deletes them in
//! reverse creation order:
//!
//! ```text
//! created:      [Program] → [Activity 1] → [Task 1] → [Task 2] → FAIL
//! compensation:                            [Task 2] → [Task 1] → [Activity 1] → [Program]
//! ```
//!
//! A task is always tracked after its activity, and an activity after its
//! program, so LIFO order deletes children first even when branches
//! interleave. Entities the run did not create are never tracked.

use crate::config::ProvisionConfig;
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use wp_gateway::{Gateway, GatewayError};
use wp_model::EntityRef;

/// Outcome of undoing a failed run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CompensationReport {
    /// Failure policy kept the partial tree
    NotAttempted,
    /// Every tracked entity was deleted
    Completed { deleted: Vec<EntityRef> },
    /// Some entities survive; `remaining` lists them newest first
    Incomplete {
        deleted: Vec<EntityRef>,
        remaining: Vec<EntityRef>,
        #[serde(skip)]
        last_error: Option<GatewayError>,
    },
}

impl CompensationReport {
    /// True when nothing created by the run remains
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// Entities still persisted after compensation
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> &[EntityRef] {
        match self {
            Self::Incomplete { remaining, .. } => remaining,
            _ => &[],
        }
    }
}

impl fmt::Display for CompensationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAttempted => write!(f, "not attempted"),
            Self::Completed { deleted } => write!(f, "completed ({} deleted)", deleted.len()),
            Self::Incomplete {
                deleted, remaining, ..
            } => write!(
                f,
                "incomplete ({} deleted, {} remaining)",
                deleted.len(),
                remaining.len()
            ),
        }
    }
}

/// Thread-safe log of entities created by one run
#[derive(Debug, Default)]
pub struct CompensationLog {
    created: Mutex<Vec<EntityRef>>,
}

impl CompensationLog {
    /// Create an empty log
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a freshly created entity
    pub fn track(&self, entity: EntityRef) {
        self.created.lock().push(entity);
    }

    /// Number of tracked entities
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.created.lock().len()
    }

    /// Whether nothing has been tracked
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.created.lock().is_empty()
    }

    /// Tracked entities in creation order
    #[must_use]
    pub fn entries(&self) -> Vec<EntityRef> {
        self.created.lock().clone()
    }

    /// Delete every tracked entity, newest first
    ///
    /// Retryable delete errors are retried up to
    /// `config.compensation_max_retries` times. A `NotFound` answer counts
    /// as deleted. An entity that cannot be deleted is reported as remaining
    /// and compensation carries on with the rest.
    pub async fn compensate(&self, gateway: &dyn Gateway, config: &ProvisionConfig) -> CompensationReport {
        let pending: Vec<EntityRef> = self.created.lock().iter().rev().copied().collect();
        tracing::warn!(entities = pending.len(), "compensating failed run");

        let mut deleted = Vec::with_capacity(pending.len());
        let mut remaining = Vec::new();
        let mut last_error = None;

        for entity in pending {
            match delete_with_retry(gateway, entity, config).await {
                Ok(()) => deleted.push(entity),
                Err(error) => {
                    tracing::error!(%entity, %error, "compensation could not delete entity");
                    remaining.push(entity);
                    last_error = Some(error);
                }
            }
        }

        if remaining.is_empty() {
            tracing::info!(deleted = deleted.len(), "compensation completed");
            CompensationReport::Completed { deleted }
        } else {
            CompensationReport::Incomplete {
                deleted,
                remaining,
                last_error,
            }
        }
    }
}

async fn delete_with_retry(
    gateway: &dyn Gateway,
    entity: EntityRef,
    config: &ProvisionConfig,
) -> Result<(), GatewayError> {
    let mut attempt = 0;
    loop {
        let result = match entity {
            EntityRef::Program(id) => gateway.delete_program(id).await,
            EntityRef::Activity(id) => gateway.delete_activity(id).await,
            EntityRef::Task(id) => gateway.delete_task(id).await,
        };
        match result {
            Ok(()) | Err(GatewayError::NotFound { .. }) => return Ok(()),
            Err(error) if error.is_retryable() && attempt < config.compensation_max_retries => {
                attempt += 1;
                tracing::debug!(%entity, attempt, %error, "retrying compensation delete");
                tokio::time::sleep(config.backoff_for(attempt)).await;
            }
            Err(error) => return Err(error),
        }
    }
}
