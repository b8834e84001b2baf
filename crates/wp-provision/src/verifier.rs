//! Consistency Verifier
//!
//! Re-reads a provisioned program with its children and refuses to hand
//! back a tree that disagrees with what the run created.

use crate::error::ProvisionError;
use wp_gateway::{Gateway, GatewayError};
use wp_model::{ProgramId, ProvisionedTree, TreeCounts};

/// Hydration check after a successful run
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsistencyVerifier;

impl ConsistencyVerifier {
    /// Create a verifier
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Read `program_id` back and compare against `expected` counts
    ///
    /// # Errors
    /// - [`ProvisionError::VerificationReadFailed`] if the read fails or
    ///   returns another program
    /// - [`ProvisionError::HydrationMismatch`] if the counts differ
    /// - [`ProvisionError::BrokenParentLink`] if a child names the wrong parent
    pub async fn verify(
        &self,
        gateway: &dyn Gateway,
        program_id: ProgramId,
        expected: TreeCounts,
    ) -> Result<ProvisionedTree, ProvisionError> {
        let tree = gateway
            .read_program_with_children(program_id)
            .await
            .map_err(|cause| ProvisionError::VerificationReadFailed { program_id, cause })?;

        if tree.program_id() != program_id {
            return Err(ProvisionError::VerificationReadFailed {
                program_id,
                cause: GatewayError::Decode {
                    reason: format!("requested program {program_id}, read {}", tree.program_id()),
                },
            });
        }

        let actual = tree.counts();
        if actual != expected {
            tracing::warn!(%program_id, %expected, %actual, "hydrated tree does not match created records");
            return Err(ProvisionError::HydrationMismatch {
                program_id,
                expected,
                actual,
            });
        }

        tree.check_links()
            .map_err(|violation| ProvisionError::BrokenParentLink { program_id, violation })?;

        tracing::debug!(%program_id, counts = %actual, "hydrated tree verified");
        Ok(tree)
    }
}
