use std::collections::HashMap;

use crate::dto::draft_dto::{Match, Participant, Standing};

/// League table for a round-robin between draft participants.
///
/// Win 3, draw 1, loss 0. Sorted by points, then goal difference, then goals
/// for (all descending), then draft order. Matches naming a team that is not a
/// participant are ignored.
pub fn compute_standings(participants: &[Participant], matches: &[Match]) -> Vec<Standing> {
    let mut table: Vec<(i64, Standing)> = participants
        .iter()
        .map(|p| {
            (
                p.draft_order,
                Standing {
                    team_name: p.name.clone(),
                    team_id: p.id,
                    ..Standing::default()
                },
            )
        })
        .collect();

    let index: HashMap<String, usize> = table
        .iter()
        .enumerate()
        .map(|(i, (_, s))| (s.team_name.clone(), i))
        .collect();

    for m in matches {
        let (Some(&home), Some(&away)) = (index.get(&m.home_team_name), index.get(&m.away_team_name))
        else {
            continue;
        };

        let (home_points, away_points) = match m.home_score.cmp(&m.away_score) {
            std::cmp::Ordering::Greater => (3, 0),
            std::cmp::Ordering::Less => (0, 3),
            std::cmp::Ordering::Equal => (1, 1),
        };

        record(&mut table[home].1, m.home_score, m.away_score, home_points);
        record(&mut table[away].1, m.away_score, m.home_score, away_points);
    }

    table.sort_by(|(order_a, a), (order_b, b)| {
        b.points
            .cmp(&a.points)
            .then(b.goal_difference.cmp(&a.goal_difference))
            .then(b.goals_for.cmp(&a.goals_for))
            .then(order_a.cmp(order_b))
    });

    table.into_iter().map(|(_, s)| s).collect()
}

fn record(standing: &mut Standing, scored: i64, conceded: i64, points: i64) {
    standing.games_played += 1;
    standing.goals_for += scored;
    standing.goals_against += conceded;
    standing.goal_difference = standing.goals_for - standing.goals_against;
    standing.points += points;
    match points {
        3 => standing.wins += 1,
        1 => standing.draws += 1,
        _ => standing.losses += 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn participant(id: i64, name: &str, order: i64) -> Participant {
        Participant {
            id,
            draft_id: 1,
            name: name.into(),
            draft_order: order,
            is_admin: false,
            joined_at: Utc::now(),
            picks_85_89: 0,
            picks_80_84: 0,
            picks_75_79: 0,
            picks_up_to_74: 0,
        }
    }

    fn played(home: &str, away: &str, home_score: i64, away_score: i64) -> Match {
        Match {
            id: 0,
            draft_id: 1,
            home_team_id: 0,
            away_team_id: 0,
            home_team_name: home.into(),
            away_team_name: away.into(),
            home_score,
            away_score,
            played_at: Utc::now(),
            recorded_by: "ana".into(),
        }
    }

    #[test]
    fn every_participant_gets_a_row_before_any_match() {
        let participants = vec![participant(1, "ana", 2), participant(2, "bo", 1)];
        let table = compute_standings(&participants, &[]);
        assert_eq!(table.len(), 2);
        assert_eq!(table[0].team_name, "bo");
        assert!(table.iter().all(|s| s.games_played == 0 && s.points == 0));
    }

    #[test]
    fn wins_draws_and_losses_accumulate() {
        let participants = vec![
            participant(1, "ana", 1),
            participant(2, "bo", 2),
            participant(3, "cy", 3),
        ];
        let matches = vec![
            played("ana", "bo", 3, 1),
            played("bo", "cy", 2, 2),
            played("cy", "ana", 0, 1),
        ];
        let table = compute_standings(&participants, &matches);

        assert_eq!(table[0].team_name, "ana");
        assert_eq!(table[0].points, 6);
        assert_eq!(table[0].wins, 2);
        assert_eq!(table[0].goals_for, 4);
        assert_eq!(table[0].goals_against, 1);
        assert_eq!(table[0].goal_difference, 3);

        let bo = table.iter().find(|s| s.team_name == "bo").unwrap();
        assert_eq!((bo.wins, bo.draws, bo.losses, bo.points), (0, 1, 1, 1));
        assert_eq!(bo.goal_difference, -2);
    }

    #[test]
    fn ties_break_on_goal_difference_then_goals_for() {
        let participants = vec![
            participant(1, "ana", 1),
            participant(2, "bo", 2),
            participant(3, "cy", 3),
            participant(4, "di", 4),
        ];
        let matches = vec![played("ana", "bo", 1, 0), played("cy", "di", 4, 3)];
        let table = compute_standings(&participants, &matches);
        let names: Vec<&str> = table.iter().map(|s| s.team_name.as_str()).collect();
        assert_eq!(names, vec!["cy", "ana", "di", "bo"]);
    }

    #[test]
    fn unknown_teams_are_skipped() {
        let participants = vec![participant(1, "ana", 1), participant(2, "bo", 2)];
        let table = compute_standings(&participants, &[played("ana", "zed", 5, 0)]);
        assert!(table.iter().all(|s| s.games_played == 0));
    }

    #[test]
    fn result_is_independent_of_match_order() {
        let participants = vec![
            participant(1, "ana", 1),
            participant(2, "bo", 2),
            participant(3, "cy", 3),
        ];
        let mut matches = vec![
            played("ana", "bo", 2, 2),
            played("bo", "cy", 1, 0),
            played("cy", "ana", 3, 1),
        ];
        let forward = compute_standings(&participants, &matches);
        matches.reverse();
        assert_eq!(forward, compute_standings(&participants, &matches));
    }
}
