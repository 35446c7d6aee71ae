//! Relational upsert sink.
//!
//! One transaction per run; entity sets are written in dependency order
//! (tournament, groups, teams, fixtures, results), each as a batched
//! insert-or-update keyed by the entity's natural key with all mutable
//! columns overwritten. Any failure rolls the whole run back.
//!
//! Entities absent from the current run are left in place; this
//! pipeline never deletes.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder, Transaction};
use tracing::info;

use super::Sink;
use crate::db::Db;
use crate::model::EntityTables;

pub struct PostgresSink {
    db: Db,
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS tournament (
    id              TEXT PRIMARY KEY,
    name            TEXT NOT NULL,
    source          TEXT NOT NULL,
    source_row_hash TEXT NOT NULL,
    ingested_at     TIMESTAMPTZ NOT NULL
);
CREATE TABLE IF NOT EXISTS groups (
    tournament_id   TEXT NOT NULL,
    id              TEXT NOT NULL,
    label           TEXT NOT NULL,
    source          TEXT NOT NULL,
    source_row_hash TEXT NOT NULL,
    ingested_at     TIMESTAMPTZ NOT NULL,
    PRIMARY KEY (tournament_id, id)
);
CREATE TABLE IF NOT EXISTS team (
    tournament_id   TEXT NOT NULL,
    id              TEXT NOT NULL,
    group_id        TEXT NOT NULL,
    name            TEXT NOT NULL,
    is_placeholder  BOOLEAN NOT NULL,
    source          TEXT NOT NULL,
    source_row_hash TEXT NOT NULL,
    ingested_at     TIMESTAMPTZ NOT NULL,
    PRIMARY KEY (tournament_id, id)
);
CREATE TABLE IF NOT EXISTS fixture (
    tournament_id   TEXT NOT NULL,
    id              TEXT NOT NULL,
    group_id        TEXT NOT NULL,
    date            TEXT NOT NULL,
    time            TEXT NOT NULL,
    venue           TEXT NOT NULL,
    round           TEXT NOT NULL,
    pool            TEXT NOT NULL,
    team1           TEXT NOT NULL,
    team2           TEXT NOT NULL,
    fixture_key     TEXT NOT NULL,
    score1          TEXT NOT NULL,
    score2          TEXT NOT NULL,
    status          TEXT NOT NULL,
    source          TEXT NOT NULL,
    source_row_hash TEXT NOT NULL,
    ingested_at     TIMESTAMPTZ NOT NULL,
    PRIMARY KEY (tournament_id, id)
);
CREATE TABLE IF NOT EXISTS result (
    fixture_id      TEXT PRIMARY KEY,
    score1          BIGINT,
    score2          BIGINT,
    status          TEXT NOT NULL,
    source          TEXT NOT NULL,
    source_row_hash TEXT NOT NULL,
    ingested_at     TIMESTAMPTZ NOT NULL
);
"#;

impl PostgresSink {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Idempotent schema bootstrap, outside the write transaction.
    async fn ensure_schema(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.db.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Sink for PostgresSink {
    async fn write(&self, tables: &EntityTables) -> Result<()> {
        self.ensure_schema().await?;
        let mut tx = self.db.pool.begin().await?;
        upsert_tournament(&mut tx, tables).await?;
        upsert_groups(&mut tx, tables).await?;
        upsert_teams(&mut tx, tables).await?;
        upsert_fixtures(&mut tx, tables).await?;
        upsert_results(&mut tx, tables).await?;
        tx.commit().await?;
        info!(
            groups = tables.groups.len(),
            teams = tables.teams.len(),
            fixtures = tables.fixtures.len(),
            results = tables.results.len(),
            "relational upsert committed"
        );
        Ok(())
    }
}

async fn upsert_tournament(
    tx: &mut Transaction<'_, Postgres>,
    tables: &EntityTables,
) -> Result<()> {
    let t = &tables.tournament;
    sqlx::query(
        "INSERT INTO tournament (id, name, source, source_row_hash, ingested_at)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (id) DO UPDATE SET
             name = EXCLUDED.name,
             source = EXCLUDED.source,
             source_row_hash = EXCLUDED.source_row_hash,
             ingested_at = EXCLUDED.ingested_at",
    )
    .persistent(false)
    .bind(&t.id)
    .bind(&t.name)
    .bind(&t.source)
    .bind(&t.source_row_hash)
    .bind(t.ingested_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn upsert_groups(tx: &mut Transaction<'_, Postgres>, tables: &EntityTables) -> Result<()> {
    if tables.groups.is_empty() {
        return Ok(());
    }
    let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(
        "INSERT INTO groups (tournament_id, id, label, source, source_row_hash, ingested_at) ",
    );
    qb.push_values(&tables.groups, |mut b, g| {
        b.push_bind(&g.tournament_id)
            .push_bind(&g.id)
            .push_bind(&g.label)
            .push_bind(&g.source)
            .push_bind(&g.source_row_hash)
            .push_bind(g.ingested_at);
    });
    qb.push(
        " ON CONFLICT (tournament_id, id) DO UPDATE SET
             label = EXCLUDED.label,
             source = EXCLUDED.source,
             source_row_hash = EXCLUDED.source_row_hash,
             ingested_at = EXCLUDED.ingested_at",
    );
    qb.build().persistent(false).execute(&mut **tx).await?;
    Ok(())
}

async fn upsert_teams(tx: &mut Transaction<'_, Postgres>, tables: &EntityTables) -> Result<()> {
    if tables.teams.is_empty() {
        return Ok(());
    }
    let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(
        "INSERT INTO team (tournament_id, id, group_id, name, is_placeholder, source, source_row_hash, ingested_at) ",
    );
    qb.push_values(&tables.teams, |mut b, t| {
        b.push_bind(&t.tournament_id)
            .push_bind(&t.id)
            .push_bind(&t.group_id)
            .push_bind(&t.name)
            .push_bind(t.is_placeholder)
            .push_bind(&t.source)
            .push_bind(&t.source_row_hash)
            .push_bind(t.ingested_at);
    });
    qb.push(
        " ON CONFLICT (tournament_id, id) DO UPDATE SET
             group_id = EXCLUDED.group_id,
             name = EXCLUDED.name,
             is_placeholder = EXCLUDED.is_placeholder,
             source = EXCLUDED.source,
             source_row_hash = EXCLUDED.source_row_hash,
             ingested_at = EXCLUDED.ingested_at",
    );
    qb.build().persistent(false).execute(&mut **tx).await?;
    Ok(())
}

async fn upsert_fixtures(tx: &mut Transaction<'_, Postgres>, tables: &EntityTables) -> Result<()> {
    if tables.fixtures.is_empty() {
        return Ok(());
    }
    let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(
        "INSERT INTO fixture (tournament_id, id, group_id, date, time, venue, round, pool, team1, team2, fixture_key, score1, score2, status, source, source_row_hash, ingested_at) ",
    );
    qb.push_values(&tables.fixtures, |mut b, f| {
        b.push_bind(&f.tournament_id)
            .push_bind(&f.id)
            .push_bind(&f.group_id)
            .push_bind(&f.date)
            .push_bind(&f.time)
            .push_bind(&f.venue)
            .push_bind(&f.round)
            .push_bind(&f.pool)
            .push_bind(&f.team1)
            .push_bind(&f.team2)
            .push_bind(&f.fixture_key)
            .push_bind(&f.score1)
            .push_bind(&f.score2)
            .push_bind(&f.status)
            .push_bind(&f.source)
            .push_bind(&f.source_row_hash)
            .push_bind(f.ingested_at);
    });
    qb.push(
        " ON CONFLICT (tournament_id, id) DO UPDATE SET
             group_id = EXCLUDED.group_id,
             date = EXCLUDED.date,
             time = EXCLUDED.time,
             venue = EXCLUDED.venue,
             round = EXCLUDED.round,
             pool = EXCLUDED.pool,
             team1 = EXCLUDED.team1,
             team2 = EXCLUDED.team2,
             fixture_key = EXCLUDED.fixture_key,
             score1 = EXCLUDED.score1,
             score2 = EXCLUDED.score2,
             status = EXCLUDED.status,
             source = EXCLUDED.source,
             source_row_hash = EXCLUDED.source_row_hash,
             ingested_at = EXCLUDED.ingested_at",
    );
    qb.build().persistent(false).execute(&mut **tx).await?;
    Ok(())
}

async fn upsert_results(tx: &mut Transaction<'_, Postgres>, tables: &EntityTables) -> Result<()> {
    if tables.results.is_empty() {
        return Ok(());
    }
    let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(
        "INSERT INTO result (fixture_id, score1, score2, status, source, source_row_hash, ingested_at) ",
    );
    qb.push_values(&tables.results, |mut b, r| {
        b.push_bind(&r.fixture_id)
            .push_bind(r.score1)
            .push_bind(r.score2)
            .push_bind(&r.status)
            .push_bind(&r.source)
            .push_bind(&r.source_row_hash)
            .push_bind(r.ingested_at);
    });
    qb.push(
        " ON CONFLICT (fixture_id) DO UPDATE SET
             score1 = EXCLUDED.score1,
             score2 = EXCLUDED.score2,
             status = EXCLUDED.status,
             source = EXCLUDED.source,
             source_row_hash = EXCLUDED.source_row_hash,
             ingested_at = EXCLUDED.ingested_at",
    );
    qb.build().persistent(false).execute(&mut **tx).await?;
    Ok(())
}
