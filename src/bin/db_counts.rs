use anyhow::Result;
use clap::Parser;
use fixture_ingest::db::Db;
use fixture_ingest::util::env as env_util;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "db_counts",
    version,
    about = "Print row counts for the materialized tournament tables"
)]
struct Cli {
    /// Optional override for the database URL
    #[arg(long)]
    db_url: Option<String>,
}

fn is_undefined_table_error(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("42P01"),
        _ => false,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_util::init_env();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let db_url = cli.db_url.or_else(env_util::db_url).ok_or_else(|| {
        anyhow::anyhow!("database URL not configured; pass --db-url or set DATABASE_URL")
    })?;
    let db = Db::connect(&db_url, 2).await?;

    for table in ["tournament", "groups", "team", "fixture", "result"] {
        // Tolerate a store that has never been committed to.
        let count = match sqlx::query_scalar::<_, i64>(&format!("SELECT count(*) FROM {table}"))
            .persistent(false)
            .fetch_one(&db.pool)
            .await
        {
            Ok(value) => value,
            Err(e) if is_undefined_table_error(&e) => 0,
            Err(e) => return Err(e.into()),
        };
        println!("{table:>12}: {count}");
    }
    Ok(())
}
