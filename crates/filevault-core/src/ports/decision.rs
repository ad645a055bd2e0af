//! Decision port (driving UI boundary)
//!
//! When a pass detects drift the engine does not pick a winner on its own.
//! It hands the diff to an [`IDecisionPrompt`] and waits for a direction.

use serde::{Deserialize, Serialize};

use crate::domain::diff::{DiffResult, SyncDirection};

/// The user's answer to a surfaced diff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Transfer in the given direction
    Apply(SyncDirection),
    /// Leave both sides untouched for now; the diff is surfaced again later
    Dismissed,
}

/// Port trait for asking a human which side wins
#[async_trait::async_trait]
pub trait IDecisionPrompt: Send + Sync {
    /// Presents `diff` and returns the chosen outcome
    async fn decide(&self, diff: &DiffResult) -> anyhow::Result<Decision>;
}
