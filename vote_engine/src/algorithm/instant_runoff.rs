use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info};

use crate::algorithm::{
    eligible_candidates, tally_of, ElectionResult, EvalAlgorithm, RoundStats,
};
use crate::error::EngineError;
use crate::model::{Candidate, Race};
use crate::vote::Vote;

/// Classic unweighted ranked elimination.
///
/// Each round, every unassigned voter caucuses with their highest-ranked
/// candidate still standing. A candidate holding a strict majority of the
/// currently assigned votes wins outright; otherwise all candidates tied
/// for the fewest votes are eliminated together and their voters return
/// to the pool. Voters whose entire ranking is exhausted drop out.
///
/// Known quirk, preserved on purpose: a tie for last place eliminates
/// every tied candidate at once, not just one of them.
pub struct InstantRunoff;

impl EvalAlgorithm for InstantRunoff {
    fn evaluate(&self, race: &Race, votes: &[Vote]) -> Result<ElectionResult, EngineError> {
        let eligible = eligible_candidates(race, votes);
        let rankings: Vec<Vec<Candidate>> = votes.iter().map(|v| v.rankings()).collect();

        // Voter index -> assigned candidate; the pool holds unassigned voters.
        let mut standings: BTreeMap<Candidate, Vec<usize>> =
            eligible.iter().map(|c| (c.clone(), Vec::new())).collect();
        let mut pool: Vec<usize> = (0..votes.len()).collect();
        let mut rounds: Vec<RoundStats> = Vec::new();

        if standings.is_empty() {
            return Ok(ElectionResult {
                winners: Default::default(),
                rounds,
            });
        }

        loop {
            let round_id = rounds.len() as u32 + 1;

            // Caucus: assign every pooled voter to their best surviving choice.
            for voter in pool.drain(..) {
                let assigned = rankings[voter]
                    .iter()
                    .find(|c| standings.contains_key(*c));
                match assigned.cloned() {
                    Some(candidate) => {
                        if let Some(voters) = standings.get_mut(&candidate) {
                            voters.push(voter);
                        }
                    }
                    None => {
                        // Ranking exhausted: this voter no longer counts.
                        debug!("round {}: voter {} exhausted", round_id, voter);
                    }
                }
            }

            let counts: BTreeMap<Candidate, f64> = standings
                .iter()
                .map(|(c, vs)| (c.clone(), vs.len() as f64))
                .collect();
            let assigned_total: usize = standings.values().map(Vec::len).sum();
            info!("round {}: tally {:?}", round_id, counts);

            // Strict majority of the currently assigned votes.
            let majority = standings
                .iter()
                .find(|(_, vs)| 2 * vs.len() > assigned_total);
            if let Some((winner, _)) = majority {
                let winner = winner.clone();
                rounds.push(RoundStats {
                    round: round_id,
                    tally: tally_of(&counts),
                    eliminated: vec![],
                    transfers: vec![],
                });
                return Ok(ElectionResult {
                    winners: [winner].into(),
                    rounds,
                });
            }

            let fewest = standings.values().map(Vec::len).min().unwrap_or(0);
            let losers: BTreeSet<Candidate> = standings
                .iter()
                .filter(|(_, vs)| vs.len() == fewest)
                .map(|(c, _)| c.clone())
                .collect();

            // Everyone left is tied at the minimum: co-winners, stop.
            if losers.len() == standings.len() {
                rounds.push(RoundStats {
                    round: round_id,
                    tally: tally_of(&counts),
                    eliminated: vec![],
                    transfers: vec![],
                });
                return Ok(ElectionResult {
                    winners: standings.keys().cloned().collect(),
                    rounds,
                });
            }

            for loser in &losers {
                if let Some(voters) = standings.remove(loser) {
                    pool.extend(voters);
                }
            }
            rounds.push(RoundStats {
                round: round_id,
                tally: tally_of(&counts),
                eliminated: losers.iter().map(|c| c.name().to_string()).collect(),
                transfers: vec![],
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn race_abc() -> Race {
        Race::new("game", ["A", "B", "C"].map(Candidate::from)).unwrap()
    }

    fn ranked(voter: &str, race: &Race, names: &[&str]) -> Vote {
        Vote::ranked(voter, race, names.iter().map(|n| Candidate::from(*n)).collect()).unwrap()
    }

    #[test]
    fn eliminated_voters_transfer_to_next_choice() {
        let race = race_abc();
        let votes = vec![
            ranked("v1", &race, &["A"]),
            ranked("v2", &race, &["A"]),
            ranked("v3", &race, &["B"]),
            ranked("v4", &race, &["B"]),
            ranked("v5", &race, &["C", "A"]),
        ];
        let result = InstantRunoff.evaluate(&race, &votes).unwrap();
        assert_eq!(result.winners, [Candidate::from("A")].into());
        assert_eq!(result.rounds.len(), 2);
        assert_eq!(result.rounds[0].eliminated, vec!["C".to_string()]);
        // Round 2: A picked up C's voter for the strict majority 3 of 5.
        let tally: BTreeMap<_, _> = result.rounds[1].tally.iter().cloned().collect();
        assert_eq!(tally["A"], 3.0);
        assert_eq!(tally["B"], 2.0);
    }

    #[test]
    fn tie_for_last_eliminates_every_tied_candidate() {
        let race = Race::new("game", ["A", "B", "C", "D"].map(Candidate::from)).unwrap();
        let votes = vec![
            ranked("v1", &race, &["A", "D"]),
            ranked("v2", &race, &["B", "D"]),
            ranked("v3", &race, &["C", "D"]),
            ranked("v4", &race, &["D"]),
            ranked("v5", &race, &["D"]),
        ];
        let result = InstantRunoff.evaluate(&race, &votes).unwrap();
        // A, B and C all tie at one vote and go out together.
        assert_eq!(result.rounds[0].eliminated.len(), 3);
        assert_eq!(result.winners, [Candidate::from("D")].into());
    }

    #[test]
    fn all_tied_candidates_are_co_winners() {
        let race = race_abc();
        let votes = vec![
            ranked("v1", &race, &["A"]),
            ranked("v2", &race, &["B"]),
            ranked("v3", &race, &["C"]),
        ];
        let result = InstantRunoff.evaluate(&race, &votes).unwrap();
        assert_eq!(result.winners.len(), 3);
        assert_eq!(result.rounds.len(), 1);
    }

    #[test]
    fn exhausted_ballots_leave_the_count() {
        let race = race_abc();
        let votes = vec![
            ranked("v1", &race, &["A"]),
            ranked("v2", &race, &["A"]),
            ranked("v3", &race, &["B"]),
            ranked("v4", &race, &["C"]),
            ranked("v5", &race, &["C"]),
        ];
        let result = InstantRunoff.evaluate(&race, &votes).unwrap();
        // B goes out first and v3's ballot exhausts, leaving A and C tied
        // at two votes each among the four still assigned.
        assert_eq!(
            result.winners,
            [Candidate::from("A"), Candidate::from("C")].into()
        );
    }

    #[test]
    fn terminates_within_candidate_count_rounds() {
        let race = Race::new("game", ["A", "B", "C", "D", "E"].map(Candidate::from)).unwrap();
        let votes = vec![
            ranked("v1", &race, &["A", "B", "C", "D", "E"]),
            ranked("v2", &race, &["B", "C", "D", "E", "A"]),
            ranked("v3", &race, &["C", "D", "E", "A", "B"]),
            ranked("v4", &race, &["A", "C", "E", "B", "D"]),
        ];
        let result = InstantRunoff.evaluate(&race, &votes).unwrap();
        assert!(result.rounds.len() <= 5);
        assert!(!result.winners.is_empty());
    }
}
