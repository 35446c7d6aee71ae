//! CSV file-set sink.
//!
//! Writes the same five tables the relational sink upserts, one RFC4180
//! file each, full attribute set plus the provenance columns. Files are
//! independent; there are no transaction semantics here.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use super::Sink;
use crate::model::EntityTables;

pub struct CsvExportSink {
    dir: PathBuf,
}

impl CsvExportSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn writer(&self, file: &str) -> Result<csv::Writer<fs::File>> {
        let path = self.dir.join(file);
        csv::Writer::from_path(&path).with_context(|| format!("creating {}", path.display()))
    }
}

fn timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn score(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[async_trait]
impl Sink for CsvExportSink {
    async fn write(&self, tables: &EntityTables) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating export dir {}", self.dir.display()))?;

        let mut w = self.writer("tournament.csv")?;
        w.write_record(["id", "name", "source", "source_row_hash", "ingested_at"])?;
        let t = &tables.tournament;
        let ts = timestamp(&t.ingested_at);
        w.write_record([
            t.id.as_str(),
            t.name.as_str(),
            t.source.as_str(),
            t.source_row_hash.as_str(),
            ts.as_str(),
        ])?;
        w.flush()?;

        let mut w = self.writer("groups.csv")?;
        w.write_record([
            "tournament_id",
            "id",
            "label",
            "source",
            "source_row_hash",
            "ingested_at",
        ])?;
        for g in &tables.groups {
            let ts = timestamp(&g.ingested_at);
            w.write_record([
                g.tournament_id.as_str(),
                g.id.as_str(),
                g.label.as_str(),
                g.source.as_str(),
                g.source_row_hash.as_str(),
                ts.as_str(),
            ])?;
        }
        w.flush()?;

        let mut w = self.writer("team.csv")?;
        w.write_record([
            "tournament_id",
            "id",
            "group_id",
            "name",
            "is_placeholder",
            "source",
            "source_row_hash",
            "ingested_at",
        ])?;
        for team in &tables.teams {
            let ts = timestamp(&team.ingested_at);
            w.write_record([
                team.tournament_id.as_str(),
                team.id.as_str(),
                team.group_id.as_str(),
                team.name.as_str(),
                if team.is_placeholder { "true" } else { "false" },
                team.source.as_str(),
                team.source_row_hash.as_str(),
                ts.as_str(),
            ])?;
        }
        w.flush()?;

        let mut w = self.writer("fixture.csv")?;
        w.write_record([
            "tournament_id",
            "id",
            "group_id",
            "date",
            "time",
            "venue",
            "round",
            "pool",
            "team1",
            "team2",
            "fixture_key",
            "score1",
            "score2",
            "status",
            "source",
            "source_row_hash",
            "ingested_at",
        ])?;
        for f in &tables.fixtures {
            let ts = timestamp(&f.ingested_at);
            w.write_record([
                f.tournament_id.as_str(),
                f.id.as_str(),
                f.group_id.as_str(),
                f.date.as_str(),
                f.time.as_str(),
                f.venue.as_str(),
                f.round.as_str(),
                f.pool.as_str(),
                f.team1.as_str(),
                f.team2.as_str(),
                f.fixture_key.as_str(),
                f.score1.as_str(),
                f.score2.as_str(),
                f.status.as_str(),
                f.source.as_str(),
                f.source_row_hash.as_str(),
                ts.as_str(),
            ])?;
        }
        w.flush()?;

        let mut w = self.writer("result.csv")?;
        w.write_record([
            "fixture_id",
            "score1",
            "score2",
            "status",
            "source",
            "source_row_hash",
            "ingested_at",
        ])?;
        for r in &tables.results {
            let s1 = score(r.score1);
            let s2 = score(r.score2);
            let ts = timestamp(&r.ingested_at);
            w.write_record([
                r.fixture_id.as_str(),
                s1.as_str(),
                s2.as_str(),
                r.status.as_str(),
                r.source.as_str(),
                r.source_row_hash.as_str(),
                ts.as_str(),
            ])?;
        }
        w.flush()?;

        info!(dir = %self.dir.display(), "csv export written");
        Ok(())
    }
}

/// File names this sink produces, in write order.
pub fn export_files(dir: &Path) -> [PathBuf; 5] {
    [
        dir.join("tournament.csv"),
        dir.join("groups.csv"),
        dir.join("team.csv"),
        dir.join("fixture.csv"),
        dir.join("result.csv"),
    ]
}
