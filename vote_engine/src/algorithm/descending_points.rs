use std::collections::BTreeMap;

use log::debug;

use crate::algorithm::{
    eligible_candidates, keys_at_max, tally_of, ElectionResult, EvalAlgorithm, RoundStats,
};
use crate::error::EngineError;
use crate::model::{Candidate, Race};
use crate::vote::{points_for_rank, Vote};

/// Borda-style descending points, single pass, no elimination.
///
/// A ranked ballot contributes 2/(rank+1) points to each ranked candidate
/// (1.0, 0.67, 0.5, ...). A ballot that is already weighted contributes
/// its normalized ratings directly instead of the rank-derived series.
pub struct DescendingPoints;

impl EvalAlgorithm for DescendingPoints {
    fn evaluate(&self, race: &Race, votes: &[Vote]) -> Result<ElectionResult, EngineError> {
        let eligible = eligible_candidates(race, votes);
        let mut scores: BTreeMap<Candidate, f64> =
            eligible.iter().map(|c| (c.clone(), 0.0)).collect();

        for vote in votes {
            if vote.is_weighted() {
                for (candidate, rating) in vote.normalized_ratings(&eligible) {
                    if let Some(score) = scores.get_mut(&candidate) {
                        *score += rating;
                    }
                }
            } else {
                for (idx, candidate) in vote.rankings().into_iter().enumerate() {
                    if let Some(score) = scores.get_mut(&candidate) {
                        *score += points_for_rank(idx + 1);
                    }
                }
            }
        }
        debug!("descending points scores: {:?}", scores);

        let winners = if scores.is_empty() {
            Default::default()
        } else {
            keys_at_max(&scores)
        };
        Ok(ElectionResult {
            winners,
            rounds: vec![RoundStats {
                round: 1,
                tally: tally_of(&scores),
                eliminated: vec![],
                transfers: vec![],
            }],
        })
    }
}
