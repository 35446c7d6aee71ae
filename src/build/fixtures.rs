//! Fixture building: date normalization with carry-forward, annotation
//! row filtering, and natural-key deduplication.
//!
//! Rows are processed in source order. The only carried state is the
//! last valid date, which blank-dated rows inherit (sheet layouts often
//! put the date only on the first fixture of a day). A row whose date is
//! present but unparseable is dropped outright: that is a data-quality
//! signal, not a date gap, so it must never fall back to the carried
//! date.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use tracing::warn;

use crate::identity;
use crate::model::Fixture;
use crate::normalization::date::{normalize_date, DateOutcome};
use crate::source::{field, NormalizedBundle};

/// A later row that repeated an already-seen fixture key; dropped, first
/// occurrence wins.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateFixture {
    pub group_id: String,
    pub fixture_key: String,
}

#[derive(Debug)]
pub struct FixtureBuildOutput {
    pub fixtures: Vec<Fixture>,
    pub duplicates: Vec<DuplicateFixture>,
}

pub fn build_fixtures(tournament_id: &str, bundle: &NormalizedBundle) -> FixtureBuildOutput {
    let mut fixtures: Vec<Fixture> = Vec::new();
    let mut duplicates: Vec<DuplicateFixture> = Vec::new();

    for group in &bundle.groups {
        let empty = Vec::new();
        let rows = bundle.fixtures_by_group.get(&group.id).unwrap_or(&empty);
        let mut last_valid_date: Option<String> = None;
        let mut seen_keys: HashSet<String> = HashSet::new();

        for row in rows {
            // Date handling runs before the team filter so a
            // date-bearing annotation row still advances the carry.
            let date = match normalize_date(field(row, "Date")) {
                DateOutcome::Normalized(date) => {
                    last_valid_date = Some(date.clone());
                    date
                }
                DateOutcome::Invalid => {
                    warn!(
                        group = %group.id,
                        date = field(row, "Date"),
                        "fixture row with unparseable date; dropped"
                    );
                    continue;
                }
                DateOutcome::Blank => match &last_valid_date {
                    Some(date) => date.clone(),
                    None => continue,
                },
            };

            let team1 = field(row, "Team1").trim();
            let team2 = field(row, "Team2").trim();
            if team1.is_empty() || team2.is_empty() {
                // Annotation row, not an error.
                continue;
            }

            let time = field(row, "Time").trim();
            let venue = field(row, "Venue").trim();
            let round = field(row, "Round").trim();
            let pool = field(row, "Pool").trim();
            let fixture_key =
                [date.as_str(), time, team1, team2, venue, round, pool].join("|");

            if !seen_keys.insert(fixture_key.clone()) {
                duplicates.push(DuplicateFixture {
                    group_id: group.id.clone(),
                    fixture_key,
                });
                continue;
            }

            fixtures.push(Fixture {
                tournament_id: tournament_id.to_string(),
                id: identity::fixture_id(tournament_id, &group.id, &fixture_key),
                group_id: group.id.clone(),
                date,
                time: time.to_string(),
                venue: venue.to_string(),
                round: round.to_string(),
                pool: pool.to_string(),
                team1: team1.to_string(),
                team2: team2.to_string(),
                fixture_key,
                score1: field(row, "Score1").trim().to_string(),
                score2: field(row, "Score2").trim().to_string(),
                status: field(row, "Status").trim().to_string(),
                source: String::new(),
                source_row_hash: String::new(),
                ingested_at: DateTime::<Utc>::MIN_UTC,
            });
        }
    }

    FixtureBuildOutput {
        fixtures,
        duplicates,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::sheets::bundle_from_csv;

    fn build(fixtures_csv: &str) -> FixtureBuildOutput {
        build_fixtures("cup", &bundle_from_csv(fixtures_csv, ""))
    }

    #[test]
    fn blank_date_inherits_prior_valid_date() {
        let out = build(
            "ageId,Date,Time,Team1,Team2\n\
             U13B,2025-06-01,09:00,A,B\n\
             U13B,,10:00,C,D\n",
        );
        assert_eq!(out.fixtures.len(), 2);
        assert_eq!(out.fixtures[1].date, "2025-06-01");
        assert_eq!(out.fixtures[1].time, "10:00");
    }

    #[test]
    fn unparseable_date_drops_the_row_despite_carry() {
        let out = build(
            "ageId,Date,Team1,Team2\n\
             U13B,2025-06-01,A,B\n\
             U13B,not-a-date,C,D\n",
        );
        assert_eq!(out.fixtures.len(), 1);
        assert_eq!(out.fixtures[0].team1, "A");
    }

    #[test]
    fn blank_date_without_carry_is_dropped() {
        let out = build("ageId,Date,Team1,Team2\nU13B,,A,B\n");
        assert!(out.fixtures.is_empty());
    }

    #[test]
    fn date_only_annotation_row_still_advances_carry() {
        let out = build(
            "ageId,Date,Team1,Team2\n\
             U13B,2025-06-01,,\n\
             U13B,,C,D\n",
        );
        assert_eq!(out.fixtures.len(), 1);
        assert_eq!(out.fixtures[0].date, "2025-06-01");
    }

    #[test]
    fn rows_missing_a_team_are_skipped() {
        let out = build("ageId,Date,Team1,Team2\nU13B,2025-06-01,A,\n");
        assert!(out.fixtures.is_empty());
    }

    #[test]
    fn duplicate_keys_drop_later_rows_and_are_recorded() {
        let out = build(
            "ageId,Date,Time,Team1,Team2\n\
             U13B,2025-06-01,09:00,A,B\n\
             U13B,2025-06-01,09:00,A,B\n\
             U13B,2025-06-01,10:00,A,B\n",
        );
        assert_eq!(out.fixtures.len(), 2);
        assert_eq!(out.duplicates.len(), 1);
        assert_eq!(out.duplicates[0].group_id, "U13B");
        assert!(out.duplicates[0].fixture_key.contains("09:00"));
    }

    #[test]
    fn same_key_in_different_groups_is_not_a_duplicate() {
        let out = build(
            "ageId,Date,Time,Team1,Team2\n\
             U13B,2025-06-01,09:00,A,B\n\
             U15B,2025-06-01,09:00,A,B\n",
        );
        assert_eq!(out.fixtures.len(), 2);
        assert!(out.duplicates.is_empty());
        assert_ne!(out.fixtures[0].id, out.fixtures[1].id);
    }

    #[test]
    fn fixture_identity_is_stable_across_builds() {
        let csv = "ageId,Date,Time,Team1,Team2,Venue,Round,Pool\n\
                   U13B,2025-06-01,09:00,Lions,Tigers,Court A,Round 1,A\n";
        assert_eq!(build(csv).fixtures[0].id, build(csv).fixtures[0].id);
    }

    #[test]
    fn normalized_dates_feed_the_key() {
        let out = build("ageId,Date,Team1,Team2\nU13B,7th June 2025,A,B\n");
        assert_eq!(out.fixtures[0].date, "2025-06-07");
        assert!(out.fixtures[0].fixture_key.starts_with("2025-06-07|"));
    }
}
