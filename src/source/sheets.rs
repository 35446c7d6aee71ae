//! Provider B: bulk CSV sheet exports (two flat files).
//!
//! This provider has no canonical group metadata; the group list is
//! derived from the group-id-like column observed across both row sets,
//! and `label == id`.

use async_trait::async_trait;
use indexmap::IndexMap;
use std::time::Duration;
use tracing::{info, warn};

use super::{
    csv::parse_rows, first_field, retain_groups, GroupListing, NormalizedBundle, RawRow,
    SourceLoader, GROUP_FIELDS,
};
use crate::error::IngestError;

pub const SOURCE_TAG: &str = "csv";

pub struct SheetsCsvSource {
    fixtures_sheet_id: String,
    teams_sheet_id: String,
    http: reqwest::Client,
}

impl SheetsCsvSource {
    pub fn new(
        fixtures_sheet_id: &str,
        teams_sheet_id: &str,
        timeout_secs: u64,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("fixture-ingest/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            fixtures_sheet_id: fixtures_sheet_id.to_string(),
            teams_sheet_id: teams_sheet_id.to_string(),
            http,
        })
    }

    fn export_url(sheet_id: &str) -> String {
        format!("https://docs.google.com/spreadsheets/d/{sheet_id}/export?format=csv")
    }

    async fn fetch_csv(&self, sheet_id: &str) -> Result<String, IngestError> {
        let url = Self::export_url(sheet_id);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| IngestError::provider(format!("GET {url}: {e}")))?;
        response
            .text()
            .await
            .map_err(|e| IngestError::provider(format!("GET {url}: body read failed: {e}")))
    }
}

#[async_trait]
impl SourceLoader for SheetsCsvSource {
    async fn load(
        &self,
        limit_groups: Option<&[String]>,
    ) -> Result<NormalizedBundle, IngestError> {
        // Exactly two fetches, independent of group count.
        let fixtures_text = self.fetch_csv(&self.fixtures_sheet_id).await?;
        let standings_text = self.fetch_csv(&self.teams_sheet_id).await?;
        let mut bundle = bundle_from_csv(&fixtures_text, &standings_text);
        retain_groups(&mut bundle.groups, limit_groups);
        let keep: Vec<String> = bundle.groups.iter().map(|g| g.id.clone()).collect();
        bundle.fixtures_by_group.retain(|id, _| keep.contains(id));
        bundle.standings_by_group.retain(|id, _| keep.contains(id));
        info!(
            groups = bundle.groups.len(),
            "csv: sheets fetched and partitioned"
        );
        Ok(bundle)
    }
}

/// Build the normalized bundle from already-fetched CSV text. Split out
/// so the partitioning logic is testable without a network.
pub fn bundle_from_csv(fixtures_text: &str, standings_text: &str) -> NormalizedBundle {
    let fixture_rows = parse_rows(fixtures_text);
    let standings_rows = parse_rows(standings_text);

    let mut groups: Vec<GroupListing> = Vec::new();
    let mut fixtures_by_group: IndexMap<String, Vec<RawRow>> = IndexMap::new();
    let mut standings_by_group: IndexMap<String, Vec<RawRow>> = IndexMap::new();

    let mut note_group = |groups: &mut Vec<GroupListing>, id: &str| {
        if !groups.iter().any(|g| g.id == id) {
            groups.push(GroupListing {
                id: id.to_string(),
                label: id.to_string(),
            });
        }
    };

    for row in fixture_rows {
        let group_id = first_field(&row, &GROUP_FIELDS).trim().to_string();
        if group_id.is_empty() {
            warn!(?row, "csv: fixture row without a group id; skipped");
            continue;
        }
        note_group(&mut groups, &group_id);
        fixtures_by_group.entry(group_id).or_default().push(row);
    }
    for row in standings_rows {
        let group_id = first_field(&row, &GROUP_FIELDS).trim().to_string();
        if group_id.is_empty() {
            warn!(?row, "csv: standings row without a group id; skipped");
            continue;
        }
        note_group(&mut groups, &group_id);
        standings_by_group.entry(group_id).or_default().push(row);
    }

    NormalizedBundle {
        source_tag: SOURCE_TAG.to_string(),
        groups,
        fixtures_by_group,
        standings_by_group,
    }
}
