//! Team reconciliation.
//!
//! Standings rows are the primary source of real team names and are
//! consumed first; fixture rows are then scanned and any name not
//! already known is inserted as "discovered via fixture" and recorded
//! as a missing-team diagnostic (an upstream data-entry gap, not a
//! failure). Processing order matters for provenance, not final content.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use crate::identity;
use crate::model::Team;
use crate::normalization::team::is_placeholder;
use crate::source::{field, NormalizedBundle};

/// A team seen in fixtures but absent from standings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingTeam {
    pub group_id: String,
    pub team: String,
}

#[derive(Debug)]
pub struct TeamBuildOutput {
    pub teams: Vec<Team>,
    pub missing_teams: Vec<MissingTeam>,
}

pub fn build_teams(tournament_id: &str, bundle: &NormalizedBundle) -> TeamBuildOutput {
    let mut teams: IndexMap<String, Team> = IndexMap::new();
    let mut missing_teams: Vec<MissingTeam> = Vec::new();

    for group in &bundle.groups {
        let empty = Vec::new();
        let standings = bundle.standings_by_group.get(&group.id).unwrap_or(&empty);
        for row in standings {
            let name = field(row, "Team").trim();
            if name.is_empty() {
                continue;
            }
            insert_team(&mut teams, tournament_id, &group.id, name);
        }

        let fixtures = bundle.fixtures_by_group.get(&group.id).unwrap_or(&empty);
        for row in fixtures {
            for col in ["Team1", "Team2"] {
                let name = field(row, col).trim();
                if name.is_empty() {
                    continue;
                }
                let id = identity::team_id(tournament_id, &group.id, name);
                let key = map_key(&group.id, &id);
                if !teams.contains_key(&key) {
                    insert_team(&mut teams, tournament_id, &group.id, name);
                    missing_teams.push(MissingTeam {
                        group_id: group.id.clone(),
                        team: name.to_string(),
                    });
                }
            }
        }
    }

    TeamBuildOutput {
        teams: teams.into_values().collect(),
        missing_teams,
    }
}

fn map_key(group_id: &str, team_id: &str) -> String {
    format!("{group_id}:{team_id}")
}

fn insert_team(
    teams: &mut IndexMap<String, Team>,
    tournament_id: &str,
    group_id: &str,
    name: &str,
) {
    let id = identity::team_id(tournament_id, group_id, name);
    let key = map_key(group_id, &id);
    teams.entry(key).or_insert_with(|| Team {
        tournament_id: tournament_id.to_string(),
        id,
        group_id: group_id.to_string(),
        name: name.to_string(),
        // Computed once at insertion, never re-evaluated.
        is_placeholder: is_placeholder(name),
        source: String::new(),
        source_row_hash: String::new(),
        ingested_at: DateTime::<Utc>::MIN_UTC,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::sheets::bundle_from_csv;

    #[test]
    fn standings_teams_come_first_and_are_deduplicated() {
        let bundle = bundle_from_csv(
            "ageId,Team1,Team2\nU13B,Lions,Tigers\n",
            "ageId,Team\nU13B,Lions\nU13B,Lions\nU13B,Tigers\n",
        );
        let out = build_teams("cup", &bundle);
        assert_eq!(out.teams.len(), 2);
        assert!(out.missing_teams.is_empty());
    }

    #[test]
    fn fixture_only_teams_are_discovered_and_flagged_missing() {
        let bundle = bundle_from_csv(
            "ageId,Team1,Team2\nU13B,Lions,Sharks\n",
            "ageId,Team\nU13B,Lions\n",
        );
        let out = build_teams("cup", &bundle);
        assert_eq!(out.teams.len(), 2);
        assert_eq!(out.missing_teams.len(), 1);
        assert_eq!(out.missing_teams[0].team, "Sharks");
        assert_eq!(out.missing_teams[0].group_id, "U13B");
    }

    #[test]
    fn placeholders_are_flagged_at_insertion() {
        let bundle = bundle_from_csv(
            "ageId,Team1,Team2\nU13B,Winner QF1,3rd Place\n",
            "ageId,Team\nU13B,Wildcats\n",
        );
        let out = build_teams("cup", &bundle);
        let by_name = |n: &str| out.teams.iter().find(|t| t.name == n).unwrap();
        assert!(!by_name("Wildcats").is_placeholder);
        assert!(by_name("Winner QF1").is_placeholder);
        assert!(by_name("3rd Place").is_placeholder);
    }

    #[test]
    fn same_name_in_two_groups_is_two_teams() {
        let bundle = bundle_from_csv(
            "ageId,Team1,Team2\n",
            "ageId,Team\nU13B,Lions\nU15B,Lions\n",
        );
        let out = build_teams("cup", &bundle);
        assert_eq!(out.teams.len(), 2);
        assert_ne!(out.teams[0].id, out.teams[1].id);
    }

    #[test]
    fn team_ids_are_stable_across_builds() {
        let make = || {
            build_teams(
                "cup",
                &bundle_from_csv("ageId,Team1,Team2\n", "ageId,Team\nU13B,Lions\n"),
            )
        };
        assert_eq!(make().teams[0].id, make().teams[0].id);
    }
}
