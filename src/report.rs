//! Run report accumulation and writing.
//!
//! One JSON file per run, named by UTC timestamp and run mode. For a
//! preview (no-commit) invocation this file is the only durable record
//! of what the run saw.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::build::fixtures::DuplicateFixture;
use crate::build::teams::MissingTeam;
use crate::error::ValidationIssue;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMeta {
    pub commit: bool,
    pub tournament_id: String,
    pub fixtures_sheet_id: Option<String>,
    pub teams_sheet_id: Option<String>,
    pub api_base: Option<String>,
    pub report_dir: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Counts {
    pub groups: usize,
    pub teams: usize,
    pub fixtures: usize,
    pub results: usize,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct GroupBreakdown {
    pub fixtures: usize,
    pub teams: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub meta: ReportMeta,
    pub counts: Counts,
    pub duplicates: Vec<DuplicateFixture>,
    pub validation_errors: Vec<ValidationIssue>,
    pub missing_teams: Vec<MissingTeam>,
    pub per_group: IndexMap<String, GroupBreakdown>,
    /// Set only when the run aborted before building (provider failure).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunReport {
    pub fn new(meta: ReportMeta) -> Self {
        Self {
            meta,
            counts: Counts::default(),
            duplicates: Vec::new(),
            validation_errors: Vec::new(),
            missing_teams: Vec::new(),
            per_group: IndexMap::new(),
            error: None,
        }
    }
}

/// Write the report as pretty JSON, creating the directory on demand.
/// Returns the path written.
pub fn write_report(
    report: &RunReport,
    report_dir: &Path,
    commit_mode: bool,
    now: DateTime<Utc>,
) -> Result<PathBuf> {
    fs::create_dir_all(report_dir)
        .with_context(|| format!("creating report dir {}", report_dir.display()))?;
    let mode = if commit_mode { "commit" } else { "preview" };
    let name = format!("{}_{mode}.json", now.format("%Y%m%dT%H%M%SZ"));
    let path = report_dir.join(name);
    let body = serde_json::to_string_pretty(report).context("serializing run report")?;
    fs::write(&path, body).with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), "run report written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn meta() -> ReportMeta {
        ReportMeta {
            commit: false,
            tournament_id: "cup".into(),
            fixtures_sheet_id: Some("fx".into()),
            teams_sheet_id: Some("tm".into()),
            api_base: None,
            report_dir: "reports/ingestion".into(),
        }
    }

    #[test]
    fn report_serializes_with_camel_case_keys() {
        let mut report = RunReport::new(meta());
        report.per_group.insert(
            "U13B".into(),
            GroupBreakdown {
                fixtures: 3,
                teams: 4,
            },
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["meta"]["tournamentId"], "cup");
        assert!(json["validationErrors"].as_array().unwrap().is_empty());
        assert!(json["missingTeams"].as_array().unwrap().is_empty());
        assert_eq!(json["perGroup"]["U13B"]["fixtures"], 3);
        // No error key on a clean report.
        assert!(json.get("error").is_none());
    }

    #[test]
    fn writes_timestamped_mode_named_file() {
        let dir = std::env::temp_dir().join(format!("ingest-report-test-{}", std::process::id()));
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 9, 30, 0).unwrap();
        let path = write_report(&RunReport::new(meta()), &dir, false, now).unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "20250601T093000Z_preview.json"
        );
        let body = std::fs::read_to_string(&path).unwrap();
        assert!(body.contains("\"tournamentId\": \"cup\""));
        std::fs::remove_dir_all(&dir).ok();
    }
}
