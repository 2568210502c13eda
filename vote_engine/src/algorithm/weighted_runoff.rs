use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info};

use crate::algorithm::{
    eligible_candidates, keys_at_max, keys_at_min, sort_flows, tally_of, ElectionResult,
    EvalAlgorithm, FlowRecord, RoundStats,
};
use crate::error::EngineError;
use crate::model::{Candidate, Race};
use crate::vote::Vote;

/// The generalized multi-round runoff over votes of any kind.
///
/// Weighted ballots are re-normalized against the shrinking survivor set
/// every round, which redistributes an eliminated candidate's share of a
/// voter's power proportionally among the voter's remaining preferences.
/// Shadow ballots (carried-over weight from a prior election) contribute
/// their raw ratings and are never re-normalized. Plain ranked and single
/// ballots count 1.0 toward their best surviving choice.
///
/// Each round the portion of every loser's prior weight that lands on a
/// surviving candidate is recorded as a [`FlowRecord`], for audit and
/// flow-diagram rendering only.
///
/// Quirks preserved on purpose: the majority threshold is the full weight
/// in play (not half of it) and the winner check is strictly greater, so
/// races normally resolve through elimination; and a tie for last place
/// eliminates every tied candidate at once.
pub struct WeightedRunoff {
    multi_round: bool,
}

impl WeightedRunoff {
    /// The standard multi-round race.
    pub fn new() -> WeightedRunoff {
        WeightedRunoff { multi_round: true }
    }

    /// A single round of weighted counting: no elimination, no majority
    /// threshold, the strict maximum score wins (ties are co-winners).
    pub fn single_round() -> WeightedRunoff {
        WeightedRunoff { multi_round: false }
    }

    /// Tallies one caucus over the given survivor set.
    fn caucus(votes: &[Vote], survivors: &BTreeSet<Candidate>) -> BTreeMap<Candidate, f64> {
        let mut standings: BTreeMap<Candidate, f64> =
            survivors.iter().map(|c| (c.clone(), 0.0)).collect();
        for vote in votes {
            for (candidate, weight) in vote.contribution_to(survivors) {
                if let Some(standing) = standings.get_mut(&candidate) {
                    *standing += weight;
                }
            }
        }
        standings
    }

    /// The sum of full voting weight in play for the given survivor set:
    /// 1.0 per live ballot, the raw rating sum for shadow ballots.
    fn score_to_win(votes: &[Vote], survivors: &BTreeSet<Candidate>) -> f64 {
        votes
            .iter()
            .map(|vote| {
                if !vote.is_shadow() {
                    1.0
                } else if vote.is_weighted() {
                    survivors
                        .iter()
                        .filter_map(|c| vote.raw_rating(c))
                        .sum()
                } else {
                    0.0
                }
            })
            .sum()
    }

    /// The weight flowing from each round loser to each survivor:
    /// the voter's new normalized rating of the survivor scaled by the
    /// magnitude of their old normalized rating of the loser.
    fn record_flows(
        votes: &[Vote],
        survivors: &BTreeSet<Candidate>,
        losers: &BTreeSet<Candidate>,
    ) -> Vec<FlowRecord> {
        let mut flows: BTreeMap<(Candidate, Candidate), f64> = BTreeMap::new();
        let previous: BTreeSet<Candidate> = survivors.union(losers).cloned().collect();
        for vote in votes {
            if !vote.is_weighted() || vote.is_shadow() {
                continue;
            }
            let old = vote.normalized_ratings(&previous);
            let new = vote.normalized_ratings(survivors);
            for loser in losers {
                let spent = match old.get(loser) {
                    Some(rating) => rating.abs(),
                    None => continue,
                };
                for (survivor, new_rating) in &new {
                    *flows
                        .entry((loser.clone(), survivor.clone()))
                        .or_insert(0.0) += new_rating * spent;
                }
            }
        }
        let mut records: Vec<FlowRecord> = flows
            .into_iter()
            .map(|((from, to), weight)| FlowRecord {
                from: from.name().to_string(),
                to: to.name().to_string(),
                weight,
            })
            .collect();
        sort_flows(&mut records);
        records
    }
}

impl Default for WeightedRunoff {
    fn default() -> WeightedRunoff {
        WeightedRunoff::new()
    }
}

impl EvalAlgorithm for WeightedRunoff {
    fn evaluate(&self, race: &Race, votes: &[Vote]) -> Result<ElectionResult, EngineError> {
        let mut survivors = eligible_candidates(race, votes);
        let mut rounds: Vec<RoundStats> = Vec::new();

        if survivors.is_empty() {
            return Ok(ElectionResult {
                winners: Default::default(),
                rounds,
            });
        }

        if !self.multi_round {
            let standings = WeightedRunoff::caucus(votes, &survivors);
            let winners = keys_at_max(&standings);
            rounds.push(RoundStats {
                round: 1,
                tally: tally_of(&standings),
                eliminated: vec![],
                transfers: vec![],
            });
            return Ok(ElectionResult { winners, rounds });
        }

        let mut latest_losers: BTreeSet<Candidate> = BTreeSet::new();
        loop {
            let round_id = rounds.len() as u32 + 1;
            let standings = WeightedRunoff::caucus(votes, &survivors);
            let transfers = if latest_losers.is_empty() {
                vec![]
            } else {
                WeightedRunoff::record_flows(votes, &survivors, &latest_losers)
            };

            let score_to_win = WeightedRunoff::score_to_win(votes, &survivors);
            info!(
                "round {}: standings {:?}, score to win {}",
                round_id, standings, score_to_win
            );

            if let Some((winner, standing)) =
                standings.iter().find(|(_, s)| **s > score_to_win)
            {
                debug!("round {}: {} holds {} > {}", round_id, winner, standing, score_to_win);
                let winner = winner.clone();
                rounds.push(RoundStats {
                    round: round_id,
                    tally: tally_of(&standings),
                    eliminated: vec![],
                    transfers,
                });
                return Ok(ElectionResult {
                    winners: [winner].into(),
                    rounds,
                });
            }

            let losers = keys_at_min(&standings);
            if losers.len() == survivors.len() {
                // Everyone left is tied: co-winners.
                rounds.push(RoundStats {
                    round: round_id,
                    tally: tally_of(&standings),
                    eliminated: vec![],
                    transfers,
                });
                return Ok(ElectionResult {
                    winners: survivors,
                    rounds,
                });
            }

            for loser in &losers {
                survivors.remove(loser);
            }
            rounds.push(RoundStats {
                round: round_id,
                tally: tally_of(&standings),
                eliminated: losers.iter().map(|c| c.name().to_string()).collect(),
                transfers,
            });
            latest_losers = losers;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn race(names: &[&str]) -> Race {
        Race::new("game", names.iter().map(|n| Candidate::from(*n))).unwrap()
    }

    fn weighted(voter: &str, race: &Race, pairs: &[(&str, f64)]) -> Vote {
        let mut vote = Vote::weighted(voter);
        for (name, rating) in pairs {
            vote.rate(race, Candidate::from(*name), *rating).unwrap();
        }
        vote
    }

    #[test]
    fn elimination_redistributes_weight_proportionally() {
        let race = race(&["A", "B", "C"]);
        let votes = vec![
            weighted("v1", &race, &[("A", 3.0), ("C", 1.0)]),
            weighted("v2", &race, &[("B", 2.0), ("C", 1.0)]),
            weighted("v3", &race, &[("A", 1.0)]),
        ];
        let result = WeightedRunoff::new().evaluate(&race, &votes).unwrap();
        assert_eq!(result.winners, [Candidate::from("A")].into());
        assert_eq!(result.rounds[0].eliminated, vec!["C".to_string()]);

        // Round 2: v1's quarter share of C flows to A, v2's third to B.
        let transfers = &result.rounds[1].transfers;
        let c_to_a = transfers
            .iter()
            .find(|f| f.from == "C" && f.to == "A")
            .unwrap();
        assert!((c_to_a.weight - 0.25).abs() < 1e-12);
        let c_to_b = transfers
            .iter()
            .find(|f| f.from == "C" && f.to == "B")
            .unwrap();
        assert!((c_to_b.weight - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn weight_is_conserved_across_rounds() {
        let race = race(&["A", "B", "C"]);
        // Every voter rates every candidate positively, so the full weight
        // of each ballot stays in play for the first two rounds.
        let votes = vec![
            weighted("v1", &race, &[("A", 3.0), ("B", 2.0), ("C", 1.0)]),
            weighted("v2", &race, &[("B", 3.0), ("C", 2.0), ("A", 1.0)]),
            weighted("v3", &race, &[("C", 3.0), ("A", 2.0), ("B", 2.0)]),
        ];
        let result = WeightedRunoff::new().evaluate(&race, &votes).unwrap();
        for round in &result.rounds {
            let total: f64 = round.tally.iter().map(|(_, s)| s).sum();
            assert!((total - 3.0).abs() < 1e-9, "round {}: {}", round.round, total);
        }
    }

    #[test]
    fn negative_weight_is_not_redistributed_as_support() {
        let race = race(&["A", "B", "C"]);
        let votes = vec![
            weighted("v1", &race, &[("A", 3.0), ("B", 1.0), ("C", -2.0)]),
            weighted("v2", &race, &[("B", 2.0), ("C", 1.0)]),
            weighted("v3", &race, &[("A", 1.0)]),
        ];
        let result = WeightedRunoff::new().evaluate(&race, &votes).unwrap();
        // C goes out first: v1 scored it -1/3 and v2 +1/3, so it nets to
        // zero while A and B hold positive standings.
        assert_eq!(result.rounds[0].eliminated, vec!["C".to_string()]);
        // v1's re-normalization across {A, B} preserves the 3:1 ratio.
        let tally: BTreeMap<_, _> = result.rounds[1].tally.iter().cloned().collect();
        assert!((tally["A"] - (0.75 + 1.0)).abs() < 1e-12);
        assert!((tally["B"] - (0.25 + 1.0)).abs() < 1e-12);
        assert_eq!(result.winners, [Candidate::from("A")].into());
    }

    #[test]
    fn vetoed_candidate_is_disqualified_outright() {
        let race = race(&["A", "B", "C"]);
        let mut v1 = weighted("v1", &race, &[("B", 1.0)]);
        v1.veto_toggle(Candidate::from("A"));
        let votes = vec![
            v1,
            weighted("v2", &race, &[("A", 5.0), ("B", 0.5)]),
            weighted("v3", &race, &[("A", 5.0), ("C", 0.5)]),
        ];
        let result = WeightedRunoff::new().evaluate(&race, &votes).unwrap();
        assert!(!result.winners.contains(&Candidate::from("A")));
        assert_eq!(result.winners, [Candidate::from("B")].into());
    }

    #[test]
    fn shadow_votes_tip_otherwise_tied_races() {
        let race = race(&["A", "B", "C"]);
        let mut shadow = weighted("carried", &race, &[("A", 0.6)]);
        shadow.set_shadow(true);
        let votes = vec![
            shadow,
            Vote::single("v2", &race, Candidate::from("A")).unwrap(),
            Vote::single("v3", &race, Candidate::from("B")).unwrap(),
        ];
        let result = WeightedRunoff::new().evaluate(&race, &votes).unwrap();
        assert_eq!(result.winners, [Candidate::from("A")].into());
    }

    #[test]
    fn all_tied_survivors_are_co_winners() {
        let race = race(&["A", "B"]);
        let votes = vec![
            weighted("v1", &race, &[("A", 1.0)]),
            weighted("v2", &race, &[("B", 1.0)]),
        ];
        let result = WeightedRunoff::new().evaluate(&race, &votes).unwrap();
        assert_eq!(result.winners.len(), 2);
        assert_eq!(result.rounds.len(), 1);
    }

    #[test]
    fn single_round_mode_takes_the_maximum_score() {
        let race = race(&["A", "B", "C"]);
        let votes = vec![
            weighted("v1", &race, &[("A", 1.0), ("B", 3.0)]),
            weighted("v2", &race, &[("C", 1.0)]),
        ];
        let result = WeightedRunoff::single_round()
            .evaluate(&race, &votes)
            .unwrap();
        assert_eq!(result.winners, [Candidate::from("C")].into());
        assert_eq!(result.rounds.len(), 1);
    }

    #[test]
    fn terminates_within_candidate_count_rounds() {
        let race = race(&["A", "B", "C", "D"]);
        let votes = vec![
            weighted("v1", &race, &[("A", 4.0), ("B", 3.0), ("C", 2.0), ("D", 1.0)]),
            weighted("v2", &race, &[("B", 4.0), ("C", 3.0), ("D", 2.0), ("A", 1.0)]),
            weighted("v3", &race, &[("C", 4.0), ("D", 3.0), ("A", 2.0), ("B", 1.0)]),
        ];
        let result = WeightedRunoff::new().evaluate(&race, &votes).unwrap();
        assert!(result.rounds.len() <= 4);
        assert!(!result.winners.is_empty());
    }
}
