use std::collections::BTreeMap;

use log::debug;

use crate::algorithm::{
    eligible_candidates, keys_at_max, tally_of, ElectionResult, EvalAlgorithm, RoundStats,
};
use crate::error::EngineError;
use crate::model::{Candidate, Race};
use crate::vote::Vote;

/// Plurality: every vote collapses to its single top choice and the
/// candidate(s) with the most first choices win.
///
/// With no votes at all, every eligible candidate ties at zero and the
/// whole field is returned as co-winners.
pub struct SingleChoice;

impl EvalAlgorithm for SingleChoice {
    fn evaluate(&self, race: &Race, votes: &[Vote]) -> Result<ElectionResult, EngineError> {
        let eligible = eligible_candidates(race, votes);
        let mut counts: BTreeMap<Candidate, f64> =
            eligible.iter().map(|c| (c.clone(), 0.0)).collect();

        for vote in votes {
            if let Some(choice) = vote.top_choice() {
                if let Some(count) = counts.get_mut(&choice) {
                    *count += 1.0;
                }
            }
        }
        debug!("single choice counts: {:?}", counts);

        let winners = if counts.is_empty() {
            Default::default()
        } else {
            keys_at_max(&counts)
        };
        Ok(ElectionResult {
            winners,
            rounds: vec![RoundStats {
                round: 1,
                tally: tally_of(&counts),
                eliminated: vec![],
                transfers: vec![],
            }],
        })
    }
}
