//! Upstream source loading.
//!
//! Two interchangeable loaders sit behind [`SourceLoader`]: the
//! per-group paginated JSON API and the bulk sheet CSV export. Both
//! normalize to the same [`NormalizedBundle`] shape and the same row
//! field names (`Team1`/`Team2`/`Date`/`Time`/`Venue`/`Round`/`Pool`/
//! `Score1`/`Score2`/`Team`/`ageId`), so nothing downstream ever
//! branches on which provider ran.

pub mod api;
pub mod csv;
pub mod sheets;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Serialize;

use crate::error::IngestError;

/// One upstream row, keyed by normalized field name. Insertion order is
/// preserved so diagnostics read like the source did.
pub type RawRow = IndexMap<String, String>;

/// Field names a group identifier may hide behind in flat exports;
/// first non-empty wins per row.
pub const GROUP_FIELDS: [&str; 3] = ["ageId", "Age", "age"];

/// Exact-name field lookup; missing keys read as empty.
pub fn field<'a>(row: &'a RawRow, name: &str) -> &'a str {
    row.get(name).map(String::as_str).unwrap_or("")
}

/// First non-empty value among the candidate field names.
pub fn first_field<'a>(row: &'a RawRow, names: &[&str]) -> &'a str {
    for name in names {
        let value = field(row, name);
        if !value.trim().is_empty() {
            return value;
        }
    }
    ""
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupListing {
    pub id: String,
    pub label: String,
}

/// Uniform in-memory shape produced by every loader. Group order is the
/// provider's order and carries through to reports and exports.
#[derive(Debug)]
pub struct NormalizedBundle {
    pub source_tag: String,
    pub groups: Vec<GroupListing>,
    pub fixtures_by_group: IndexMap<String, Vec<RawRow>>,
    pub standings_by_group: IndexMap<String, Vec<RawRow>>,
}

#[async_trait]
pub trait SourceLoader: Send + Sync {
    /// Fetch and normalize everything this run needs. First network or
    /// payload failure aborts the whole load; no partial provider state
    /// is ever returned.
    async fn load(&self, limit_groups: Option<&[String]>)
        -> Result<NormalizedBundle, IngestError>;
}

pub(crate) fn retain_groups(groups: &mut Vec<GroupListing>, limit_groups: Option<&[String]>) {
    if let Some(allow) = limit_groups {
        groups.retain(|g| allow.iter().any(|a| a == &g.id));
    }
}
