//! Result projection: pure, no side effects.
//!
//! `status` is `"Final"` iff both scores are non-empty upstream;
//! otherwise empty/pending. Empty scores become `None` here while the
//! fixture keeps `""`; downstream schemas expect that asymmetry.

use chrono::{DateTime, Utc};

use crate::model::{Fixture, MatchResult};

pub const STATUS_FINAL: &str = "Final";

pub fn derive_results(fixtures: &[Fixture]) -> Vec<MatchResult> {
    fixtures
        .iter()
        .map(|fixture| {
            let status = if !fixture.score1.is_empty() && !fixture.score2.is_empty() {
                STATUS_FINAL.to_string()
            } else {
                String::new()
            };
            MatchResult {
                fixture_id: fixture.id.clone(),
                score1: parse_score(&fixture.score1),
                score2: parse_score(&fixture.score2),
                status,
                source: String::new(),
                source_row_hash: String::new(),
                ingested_at: DateTime::<Utc>::MIN_UTC,
            }
        })
        .collect()
}

fn parse_score(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<i64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(score1: &str, score2: &str) -> Fixture {
        Fixture {
            tournament_id: "cup".into(),
            id: "fx1".into(),
            group_id: "U13B".into(),
            date: "2025-06-01".into(),
            time: "09:00".into(),
            venue: "".into(),
            round: "".into(),
            pool: "".into(),
            team1: "Lions".into(),
            team2: "Tigers".into(),
            fixture_key: "k".into(),
            score1: score1.into(),
            score2: score2.into(),
            status: "".into(),
            source: String::new(),
            source_row_hash: String::new(),
            ingested_at: DateTime::<Utc>::MIN_UTC,
        }
    }

    #[test]
    fn both_scores_present_is_final() {
        let results = derive_results(&[fixture("2", "1")]);
        assert_eq!(results[0].status, STATUS_FINAL);
        assert_eq!(results[0].score1, Some(2));
        assert_eq!(results[0].score2, Some(1));
    }

    #[test]
    fn half_scored_fixture_is_pending_with_null_score() {
        let fixtures = [fixture("2", "")];
        let results = derive_results(&fixtures);
        assert_eq!(results[0].status, "");
        assert_eq!(results[0].score1, Some(2));
        assert_eq!(results[0].score2, None);
        // The fixture keeps its empty-string sentinel.
        assert_eq!(fixtures[0].score2, "");
    }

    #[test]
    fn unscored_fixture_is_pending() {
        let results = derive_results(&[fixture("", "")]);
        assert_eq!(results[0].status, "");
        assert_eq!(results[0].score1, None);
    }

    #[test]
    fn non_numeric_scores_still_finalize() {
        // Walkovers and the like: present but not numeric.
        let results = derive_results(&[fixture("W", "L")]);
        assert_eq!(results[0].status, STATUS_FINAL);
        assert_eq!(results[0].score1, None);
    }

    #[test]
    fn one_result_per_fixture() {
        let results = derive_results(&[fixture("2", "1"), fixture("", "")]);
        assert_eq!(results.len(), 2);
    }
}
