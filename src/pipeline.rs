//! Pipeline orchestration.
//!
//! `LOAD -> VALIDATE -> BUILD -> (WRITE | EXPORT | PREVIEW) -> REPORT`,
//! once per invocation, no state shared across runs. A fatal load or
//! validation failure short-circuits straight to the report stage with a
//! non-zero outcome; a commit failure rolls back and still gets a
//! best-effort report before propagating.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::path::PathBuf;
use tracing::{error, info};

use crate::build::fixtures::{build_fixtures, DuplicateFixture};
use crate::build::results::derive_results;
use crate::build::teams::{build_teams, MissingTeam};
use crate::db::Db;
use crate::error::{IngestError, ValidationIssue};
use crate::model::{self, EntityTables, Group, Tournament};
use crate::report::{self, Counts, GroupBreakdown, ReportMeta, RunReport};
use crate::sink::csv_export::CsvExportSink;
use crate::sink::postgres::PostgresSink;
use crate::sink::Sink;
use crate::source::api::ApiSource;
use crate::source::sheets::SheetsCsvSource;
use crate::source::{NormalizedBundle, SourceLoader};

pub const DEFAULT_TOURNAMENT_ID: &str = "local-tournament";
pub const DEFAULT_REPORT_DIR: &str = "reports/ingestion";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_DB_MAX_CONNS: u32 = 5;

fn http_timeout_secs() -> u64 {
    crate::util::env::env_parse("INGEST_HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)
}

#[derive(Debug, Clone)]
pub struct RunParams {
    pub tournament_id: String,
    /// Display name for the tournament row; defaults to the id.
    pub tournament_name: Option<String>,
    pub fixtures_sheet_id: Option<String>,
    pub teams_sheet_id: Option<String>,
    /// When set, selects the JSON API provider; absent selects CSV.
    pub api_base: Option<String>,
    pub database_url: Option<String>,
    /// false = preview/dry-run: report only, no writes anywhere.
    pub commit: bool,
    pub report_dir: PathBuf,
    pub limit_groups: Option<Vec<String>>,
    /// When set, writes CSV instead of the store and suppresses DB
    /// commit even if `commit` is true.
    pub export_dir: Option<PathBuf>,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            tournament_id: DEFAULT_TOURNAMENT_ID.to_string(),
            tournament_name: None,
            fixtures_sheet_id: None,
            teams_sheet_id: None,
            api_base: None,
            database_url: None,
            commit: false,
            report_dir: PathBuf::from(DEFAULT_REPORT_DIR),
            limit_groups: None,
            export_dir: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Commit,
    Export,
    Preview,
}

impl RunMode {
    pub fn status_line(self) -> &'static str {
        match self {
            RunMode::Commit => "Commit complete.",
            RunMode::Export => "Export complete.",
            RunMode::Preview => "Preview complete.",
        }
    }

    fn is_commit(self) -> bool {
        matches!(self, RunMode::Commit)
    }
}

pub struct RunOutcome {
    pub mode: RunMode,
    pub report_path: PathBuf,
    pub report: RunReport,
}

/// A failed run, with the report path when one was produced.
pub struct RunFailure {
    pub error: IngestError,
    pub report_path: Option<PathBuf>,
}

pub async fn run(params: RunParams) -> Result<RunOutcome, RunFailure> {
    run_at(params, Utc::now()).await
}

/// Run with an injected clock: `now` becomes both every row's
/// `ingested_at` and the report timestamp.
pub async fn run_at(params: RunParams, now: DateTime<Utc>) -> Result<RunOutcome, RunFailure> {
    let mut report = RunReport::new(report_meta(&params));

    // LOAD
    let loader = match select_loader(&params) {
        Ok(loader) => loader,
        Err(e) => return fail_with_report(report, e, &params, false, now),
    };
    let bundle = match loader.load(params.limit_groups.as_deref()).await {
        Ok(bundle) => bundle,
        Err(e) => {
            error!(error = %e, "load failed");
            return fail_with_report(report, e, &params, false, now);
        }
    };

    // VALIDATE
    let issues = validate_groups(&bundle);

    // BUILD runs even with validation errors, so the report still has
    // full visibility into what the upstream data looks like.
    let built = build_tables(&params, &bundle, now);
    report.counts = built.counts;
    report.duplicates = built.duplicates;
    report.missing_teams = built.missing_teams;
    report.per_group = built.per_group;
    report.validation_errors = issues.clone();

    for (group_id, breakdown) in &report.per_group {
        info!(
            group = %group_id,
            fixtures = breakdown.fixtures,
            teams = breakdown.teams,
            "group built"
        );
    }

    if !issues.is_empty() {
        return fail_with_report(report, IngestError::Validation { issues }, &params, false, now);
    }

    // WRITE | EXPORT | PREVIEW
    let mode = if params.export_dir.is_some() {
        RunMode::Export
    } else if params.commit {
        RunMode::Commit
    } else {
        RunMode::Preview
    };

    match mode {
        RunMode::Export => {
            let dir = params.export_dir.clone().unwrap_or_default();
            let sink = CsvExportSink::new(dir);
            if let Err(e) = sink.write(&built.tables).await {
                error!(error = %e, "csv export failed");
                return fail_with_report(report, IngestError::Commit(e), &params, false, now);
            }
        }
        RunMode::Commit => {
            let Some(database_url) = params.database_url.clone() else {
                let e = IngestError::Commit(anyhow::anyhow!(
                    "--commit requires a database URL (flag or DATABASE_URL)"
                ));
                return fail_with_report(report, e, &params, true, now);
            };
            let max_conns = crate::util::env::env_parse("DB_MAX_CONNS", DEFAULT_DB_MAX_CONNS);
            let db = match Db::connect(&database_url, max_conns).await {
                Ok(db) => db,
                Err(e) => {
                    return fail_with_report(report, IngestError::Commit(e), &params, true, now)
                }
            };
            if let Err(e) = PostgresSink::new(db).write(&built.tables).await {
                // Rolled back; still leave a durable record of the run.
                error!(error = %e, "commit failed; transaction rolled back");
                return fail_with_report(report, IngestError::Commit(e), &params, true, now);
            }
        }
        RunMode::Preview => {}
    }

    // REPORT
    match report::write_report(&report, &params.report_dir, mode.is_commit(), now) {
        Ok(report_path) => Ok(RunOutcome {
            mode,
            report_path,
            report,
        }),
        Err(e) => Err(RunFailure {
            error: IngestError::Report(e),
            report_path: None,
        }),
    }
}

fn report_meta(params: &RunParams) -> ReportMeta {
    ReportMeta {
        commit: params.commit,
        tournament_id: params.tournament_id.clone(),
        fixtures_sheet_id: params.fixtures_sheet_id.clone(),
        teams_sheet_id: params.teams_sheet_id.clone(),
        api_base: params.api_base.clone(),
        report_dir: params.report_dir.display().to_string(),
    }
}

fn select_loader(params: &RunParams) -> Result<Box<dyn SourceLoader>, IngestError> {
    if let Some(base) = &params.api_base {
        let source = ApiSource::new(base, http_timeout_secs())
            .map_err(|e| IngestError::provider(format!("api client init: {e}")))?;
        return Ok(Box::new(source));
    }
    let fixtures_sheet_id = params.fixtures_sheet_id.as_deref().ok_or_else(|| {
        IngestError::provider("fixtures sheet id required when no api base is configured")
    })?;
    let teams_sheet_id = params.teams_sheet_id.as_deref().ok_or_else(|| {
        IngestError::provider("teams sheet id required when no api base is configured")
    })?;
    let source = SheetsCsvSource::new(fixtures_sheet_id, teams_sheet_id, http_timeout_secs())
        .map_err(|e| IngestError::provider(format!("csv client init: {e}")))?;
    Ok(Box::new(source))
}

/// Group metadata checks. These block commit/export; everything else the
/// builders notice is a diagnostic.
fn validate_groups(bundle: &NormalizedBundle) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    for group in &bundle.groups {
        if group.id.trim().is_empty() {
            issues.push(ValidationIssue::new(
                group.label.clone(),
                "group is missing an id",
            ));
        }
        if group.label.trim().is_empty() {
            issues.push(ValidationIssue::new(
                group.id.clone(),
                "group is missing a label",
            ));
        }
    }
    issues
}

pub(crate) struct BuiltRun {
    pub tables: EntityTables,
    pub counts: Counts,
    pub duplicates: Vec<DuplicateFixture>,
    pub missing_teams: Vec<MissingTeam>,
    pub per_group: IndexMap<String, GroupBreakdown>,
}

pub(crate) fn build_tables(
    params: &RunParams,
    bundle: &NormalizedBundle,
    now: DateTime<Utc>,
) -> BuiltRun {
    let tournament_id = params.tournament_id.as_str();

    let team_out = build_teams(tournament_id, bundle);
    let fixture_out = build_fixtures(tournament_id, bundle);
    let results = derive_results(&fixture_out.fixtures);

    let groups: Vec<Group> = bundle
        .groups
        .iter()
        .map(|g| Group {
            tournament_id: tournament_id.to_string(),
            id: g.id.clone(),
            label: g.label.clone(),
            source: String::new(),
            source_row_hash: String::new(),
            ingested_at: DateTime::<Utc>::MIN_UTC,
        })
        .collect();

    let mut tables = EntityTables {
        tournament: Tournament {
            id: tournament_id.to_string(),
            name: params
                .tournament_name
                .clone()
                .unwrap_or_else(|| tournament_id.to_string()),
            source: String::new(),
            source_row_hash: String::new(),
            ingested_at: DateTime::<Utc>::MIN_UTC,
        },
        groups,
        teams: team_out.teams,
        fixtures: fixture_out.fixtures,
        results,
    };
    model::stamp(&mut tables, &bundle.source_tag, now);

    let mut per_group: IndexMap<String, GroupBreakdown> = IndexMap::new();
    for group in &tables.groups {
        per_group.insert(group.id.clone(), GroupBreakdown::default());
    }
    for fixture in &tables.fixtures {
        if let Some(b) = per_group.get_mut(&fixture.group_id) {
            b.fixtures += 1;
        }
    }
    for team in &tables.teams {
        if let Some(b) = per_group.get_mut(&team.group_id) {
            b.teams += 1;
        }
    }

    let counts = Counts {
        groups: tables.groups.len(),
        teams: tables.teams.len(),
        fixtures: tables.fixtures.len(),
        results: tables.results.len(),
    };

    BuiltRun {
        tables,
        counts,
        duplicates: fixture_out.duplicates,
        missing_teams: team_out.missing_teams,
        per_group,
    }
}

fn fail_with_report(
    mut report: RunReport,
    error: IngestError,
    params: &RunParams,
    commit_mode: bool,
    now: DateTime<Utc>,
) -> Result<RunOutcome, RunFailure> {
    if let IngestError::Provider { message } = &error {
        report.error = Some(message.clone());
    }
    // Best effort: the failure being reported matters more than the
    // report write itself.
    let report_path = match report::write_report(&report, &params.report_dir, commit_mode, now) {
        Ok(path) => Some(path),
        Err(e) => {
            error!(error = %e, "could not write failure report");
            None
        }
    };
    Err(RunFailure { error, report_path })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::sheets::bundle_from_csv;
    use crate::source::GroupListing;

    fn params() -> RunParams {
        RunParams {
            tournament_id: "cup".into(),
            ..RunParams::default()
        }
    }

    #[test]
    fn provider_b_scenario_builds_expected_tables() {
        let bundle = bundle_from_csv(
            "ageId,Date,Time,Team1,Team2,Venue,Round,Pool\n\
             U13B,2025-06-01,09:00,Lions,Tigers,Court A,Round 1,A\n",
            "ageId,Team\nU13B,Lions\nU13B,Tigers\n",
        );
        let built = build_tables(&params(), &bundle, Utc::now());

        assert_eq!(built.counts.groups, 1);
        assert_eq!(built.counts.teams, 2);
        assert_eq!(built.counts.fixtures, 1);
        assert_eq!(built.counts.results, 1);
        assert!(built.tables.teams.iter().all(|t| !t.is_placeholder));
        assert_eq!(built.tables.results[0].status, "");
        assert!(built.duplicates.is_empty());
        assert!(built.missing_teams.is_empty());

        let breakdown = &built.per_group["U13B"];
        assert_eq!(breakdown.fixtures, 1);
        assert_eq!(breakdown.teams, 2);

        // Every row carries provenance metadata for the same instant.
        let fx = &built.tables.fixtures[0];
        assert_eq!(fx.source, "csv");
        assert!(!fx.source_row_hash.is_empty());
        assert_eq!(fx.ingested_at, built.tables.tournament.ingested_at);
    }

    #[test]
    fn build_output_is_identical_across_runs_modulo_timestamp() {
        let make_bundle = || {
            bundle_from_csv(
                "ageId,Date,Team1,Team2\nU13B,2025-06-01,Lions,Tigers\n",
                "ageId,Team\nU13B,Lions\nU13B,Tigers\n",
            )
        };
        let a = build_tables(&params(), &make_bundle(), Utc::now());
        let b = build_tables(&params(), &make_bundle(), Utc::now());
        assert_eq!(a.tables.fixtures[0].id, b.tables.fixtures[0].id);
        assert_eq!(
            a.tables.fixtures[0].source_row_hash,
            b.tables.fixtures[0].source_row_hash
        );
        let ids = |built: &BuiltRun| -> Vec<String> {
            built.tables.teams.iter().map(|t| t.id.clone()).collect()
        };
        assert_eq!(ids(&a), ids(&b));
    }

    #[test]
    fn groups_missing_id_or_label_fail_validation() {
        let bundle = NormalizedBundle {
            source_tag: "api".into(),
            groups: vec![
                GroupListing {
                    id: "U13B".into(),
                    label: "U13 Boys".into(),
                },
                GroupListing {
                    id: "".into(),
                    label: "Mystery".into(),
                },
                GroupListing {
                    id: "U15G".into(),
                    label: "".into(),
                },
            ],
            fixtures_by_group: Default::default(),
            standings_by_group: Default::default(),
        };
        let issues = validate_groups(&bundle);
        assert_eq!(issues.len(), 2);
        assert!(issues[0].message.contains("missing an id"));
        assert!(issues[1].message.contains("missing a label"));
    }

    #[test]
    fn loader_selection_requires_sheet_ids_without_api_base() {
        let err = select_loader(&params()).err().unwrap();
        assert!(matches!(err, IngestError::Provider { .. }));

        let mut with_api = params();
        with_api.api_base = Some("https://example.test/api".into());
        assert!(select_loader(&with_api).is_ok());
    }
}
