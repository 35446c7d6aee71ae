//! Canonical entity shapes materialized by a run.
//!
//! Builders produce entities with the write-time metadata fields
//! (`source`, `source_row_hash`, `ingested_at`) left at their defaults;
//! [`stamp`] fills them in one pass once the tables are assembled. The
//! row hash covers semantic fields only, so re-ingesting unchanged
//! upstream data produces byte-identical hashes.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use crate::identity;

#[derive(Debug, Clone, Serialize)]
pub struct Tournament {
    pub id: String,
    pub name: String,
    pub source: String,
    pub source_row_hash: String,
    pub ingested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Group {
    pub tournament_id: String,
    pub id: String,
    pub label: String,
    pub source: String,
    pub source_row_hash: String,
    pub ingested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Team {
    pub tournament_id: String,
    pub id: String,
    pub group_id: String,
    pub name: String,
    pub is_placeholder: bool,
    pub source: String,
    pub source_row_hash: String,
    pub ingested_at: DateTime<Utc>,
}

/// Scores stay raw trimmed strings here (`""` when absent); the parsed,
/// nullable form lives on [`MatchResult`]. The differing empty-score
/// sentinels are part of the downstream schema contract.
#[derive(Debug, Clone, Serialize)]
pub struct Fixture {
    pub tournament_id: String,
    pub id: String,
    pub group_id: String,
    pub date: String,
    pub time: String,
    pub venue: String,
    pub round: String,
    pub pool: String,
    pub team1: String,
    pub team2: String,
    pub fixture_key: String,
    pub score1: String,
    pub score2: String,
    pub status: String,
    pub source: String,
    pub source_row_hash: String,
    pub ingested_at: DateTime<Utc>,
}

/// One-to-one with [`Fixture`]; `fixture_id` is both foreign and primary
/// key. `status` is `"Final"` iff both scores are present upstream.
#[derive(Debug, Clone, Serialize)]
pub struct MatchResult {
    pub fixture_id: String,
    pub score1: Option<i64>,
    pub score2: Option<i64>,
    pub status: String,
    pub source: String,
    pub source_row_hash: String,
    pub ingested_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct EntityTables {
    pub tournament: Tournament,
    pub groups: Vec<Group>,
    pub teams: Vec<Team>,
    pub fixtures: Vec<Fixture>,
    pub results: Vec<MatchResult>,
}

impl Tournament {
    fn semantic_json(&self) -> Value {
        json!({"id": self.id, "name": self.name})
    }
}

impl Group {
    fn semantic_json(&self) -> Value {
        json!({"tournament_id": self.tournament_id, "id": self.id, "label": self.label})
    }
}

impl Team {
    fn semantic_json(&self) -> Value {
        json!({
            "tournament_id": self.tournament_id,
            "id": self.id,
            "group_id": self.group_id,
            "name": self.name,
            "is_placeholder": self.is_placeholder,
        })
    }
}

impl Fixture {
    fn semantic_json(&self) -> Value {
        json!({
            "tournament_id": self.tournament_id,
            "id": self.id,
            "group_id": self.group_id,
            "date": self.date,
            "time": self.time,
            "venue": self.venue,
            "round": self.round,
            "pool": self.pool,
            "team1": self.team1,
            "team2": self.team2,
            "fixture_key": self.fixture_key,
            "score1": self.score1,
            "score2": self.score2,
            "status": self.status,
        })
    }
}

impl MatchResult {
    fn semantic_json(&self) -> Value {
        json!({
            "fixture_id": self.fixture_id,
            "score1": self.score1,
            "score2": self.score2,
            "status": self.status,
        })
    }
}

/// Fill provenance metadata across every row of the run in one pass.
/// All rows share the run's single `ingested_at` timestamp.
pub fn stamp(tables: &mut EntityTables, source: &str, ingested_at: DateTime<Utc>) {
    let t = &mut tables.tournament;
    t.source = source.to_string();
    t.source_row_hash = identity::source_row_hash(&t.semantic_json());
    t.ingested_at = ingested_at;

    for g in &mut tables.groups {
        g.source = source.to_string();
        g.source_row_hash = identity::source_row_hash(&g.semantic_json());
        g.ingested_at = ingested_at;
    }
    for team in &mut tables.teams {
        team.source = source.to_string();
        team.source_row_hash = identity::source_row_hash(&team.semantic_json());
        team.ingested_at = ingested_at;
    }
    for f in &mut tables.fixtures {
        f.source = source.to_string();
        f.source_row_hash = identity::source_row_hash(&f.semantic_json());
        f.ingested_at = ingested_at;
    }
    for r in &mut tables.results {
        r.source = source.to_string();
        r.source_row_hash = identity::source_row_hash(&r.semantic_json());
        r.ingested_at = ingested_at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(score1: &str) -> Fixture {
        Fixture {
            tournament_id: "cup".into(),
            id: "abc".into(),
            group_id: "u13b".into(),
            date: "2025-06-01".into(),
            time: "09:00".into(),
            venue: "Court A".into(),
            round: "Round 1".into(),
            pool: "A".into(),
            team1: "Lions".into(),
            team2: "Tigers".into(),
            fixture_key: "k".into(),
            score1: score1.into(),
            score2: "".into(),
            status: "".into(),
            source: String::new(),
            source_row_hash: String::new(),
            ingested_at: DateTime::<Utc>::MIN_UTC,
        }
    }

    #[test]
    fn stamping_is_stable_for_unchanged_content() {
        let make = || EntityTables {
            tournament: Tournament {
                id: "cup".into(),
                name: "Cup".into(),
                source: String::new(),
                source_row_hash: String::new(),
                ingested_at: DateTime::<Utc>::MIN_UTC,
            },
            groups: vec![],
            teams: vec![],
            fixtures: vec![fixture("2")],
            results: vec![],
        };
        let now = Utc::now();
        let later = now + chrono::Duration::hours(1);
        let mut a = make();
        let mut b = make();
        stamp(&mut a, "csv", now);
        stamp(&mut b, "csv", later);
        // Timestamp differs, content hash does not.
        assert_eq!(
            a.fixtures[0].source_row_hash,
            b.fixtures[0].source_row_hash
        );
        assert_eq!(a.tournament.source_row_hash, b.tournament.source_row_hash);
    }

    #[test]
    fn hash_tracks_content_changes() {
        let mut a = fixture("2");
        let mut b = fixture("3");
        a.source_row_hash = identity::source_row_hash(&a.semantic_json());
        b.source_row_hash = identity::source_row_hash(&b.semantic_json());
        assert_ne!(a.source_row_hash, b.source_row_hash);
    }
}
