//! Error taxonomy for a pipeline run.
//!
//! Three classes abort a run: provider failures (nothing usable was
//! loaded), validation failures (built fine, but the group metadata is
//! not trustworthy enough to write), and sink failures (the write
//! itself broke; relational writes roll back). Data-quality findings
//! such as duplicate fixtures or teams missing from standings are NOT
//! errors; they are collected on the run report and never abort.

use serde::Serialize;
use thiserror::Error;

/// A group-level defect that blocks commit/export but not building.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub group_id: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(group_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    /// Network or payload failure while loading from the upstream source.
    /// Fatal: the run short-circuits to the report stage.
    #[error("provider load failed: {message}")]
    Provider { message: String },

    /// Group metadata failed validation after building; the run reports
    /// and exits without writing or exporting anything.
    #[error("{} validation error(s); nothing was written", .issues.len())]
    Validation { issues: Vec<ValidationIssue> },

    /// The sink write failed. Relational writes are transactional, so a
    /// failure here means the store was left untouched.
    #[error("commit failed: {0}")]
    Commit(anyhow::Error),

    /// The run report could not be written.
    #[error("report write failed: {0}")]
    Report(anyhow::Error),
}

impl IngestError {
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
        }
    }
}
