use clap::Parser;
use fixture_ingest::pipeline::{self, RunParams, DEFAULT_REPORT_DIR, DEFAULT_TOURNAMENT_ID};
use fixture_ingest::util::env as env_util;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ingest", version, about = "Tournament data ingestion pipeline")]
struct Cli {
    /// Tournament identifier the run writes under
    #[arg(long, default_value = DEFAULT_TOURNAMENT_ID)]
    tournament_id: String,
    /// Display name for the tournament row (defaults to the id)
    #[arg(long)]
    tournament_name: Option<String>,
    /// CSV source identifier for the fixtures sheet (env: FIXTURES_SHEET_ID)
    #[arg(long)]
    fixtures_sheet_id: Option<String>,
    /// CSV source identifier for the teams/standings sheet (env: TEAMS_SHEET_ID)
    #[arg(long)]
    teams_sheet_id: Option<String>,
    /// Base URL of the row JSON API; when set, selects the API provider (env: API_BASE)
    #[arg(long)]
    api_base: Option<String>,
    /// Postgres DSN; required only when committing (env: DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,
    /// Write to the store; without this the run is a preview/dry-run
    #[arg(long, default_value_t = false)]
    commit: bool,
    /// Directory for run reports
    #[arg(long, default_value = DEFAULT_REPORT_DIR)]
    report_dir: PathBuf,
    /// Comma-separated allow-list of group ids
    #[arg(long, value_delimiter = ',')]
    limit_groups: Option<Vec<String>>,
    /// Write the normalized tables as CSV here instead of the store
    /// (suppresses DB commit even with --commit)
    #[arg(long)]
    export_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    env_util::init_env();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let params = RunParams {
        tournament_id: cli.tournament_id,
        tournament_name: cli.tournament_name,
        fixtures_sheet_id: cli
            .fixtures_sheet_id
            .or_else(|| env_util::env_opt("FIXTURES_SHEET_ID")),
        teams_sheet_id: cli
            .teams_sheet_id
            .or_else(|| env_util::env_opt("TEAMS_SHEET_ID")),
        api_base: cli.api_base.or_else(|| env_util::env_opt("API_BASE")),
        database_url: cli.database_url.or_else(env_util::db_url),
        commit: cli.commit,
        report_dir: cli.report_dir,
        limit_groups: cli.limit_groups.filter(|groups| !groups.is_empty()),
        export_dir: cli.export_dir,
    };

    match pipeline::run(params).await {
        Ok(outcome) => {
            println!("{}", outcome.report_path.display());
            println!("{}", outcome.mode.status_line());
        }
        Err(failure) => {
            match &failure.report_path {
                Some(path) => eprintln!(
                    "ingest failed: {} (report: {})",
                    failure.error,
                    path.display()
                ),
                None => eprintln!("ingest failed: {} (no report written)", failure.error),
            }
            std::process::exit(1);
        }
    }
}
