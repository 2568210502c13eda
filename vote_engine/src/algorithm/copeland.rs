use std::collections::BTreeMap;

use log::debug;

use crate::algorithm::{
    eligible_candidates, keys_at_max, tally_of, ElectionResult, EvalAlgorithm, RoundStats,
};
use crate::error::EngineError;
use crate::model::{Candidate, Race};
use crate::vote::Vote;

/// Condorcet-style pairwise scoring.
///
/// Every unordered pair of candidates is simulated head-to-head across
/// all ballots; each matchup outcome converts to Copeland points
/// (win 1.0, draw 0.5, loss 0.0) and the points sum across opponents.
///
/// Known quirk, preserved on purpose: a ballot ranking only one of the
/// pair hands that candidate the matchup by default, so candidates on
/// shorter ballots collect default wins more easily. Partial rankings
/// therefore bias scores toward them.
pub struct CopelandMethod;

/// One head-to-head outcome, counted in ballots.
#[derive(Debug, Clone, Copy, Default)]
struct MatchupScore {
    left: u32,
    right: u32,
}

impl MatchupScore {
    /// Copeland points for the left candidate. Equal counts are a draw,
    /// including the 0-0 matchup nobody voted in.
    fn left_points(&self) -> f64 {
        match self.left.cmp(&self.right) {
            std::cmp::Ordering::Greater => 1.0,
            std::cmp::Ordering::Equal => 0.5,
            std::cmp::Ordering::Less => 0.0,
        }
    }

    fn right_points(&self) -> f64 {
        MatchupScore {
            left: self.right,
            right: self.left,
        }
        .left_points()
    }
}

impl CopelandMethod {
    /// Which of the two candidates this ballot prefers, if it ranks
    /// either of them.
    fn preference(
        candidate: &Candidate,
        other: &Candidate,
        rankings: &[Candidate],
    ) -> Option<Candidate> {
        let candidate_rank = rankings.iter().position(|c| c == candidate);
        let other_rank = rankings.iter().position(|c| c == other);
        match (candidate_rank, other_rank) {
            (Some(a), Some(b)) => Some(if a < b { candidate.clone() } else { other.clone() }),
            (Some(_), None) => Some(candidate.clone()),
            (None, Some(_)) => Some(other.clone()),
            (None, None) => None,
        }
    }
}

impl EvalAlgorithm for CopelandMethod {
    fn evaluate(&self, race: &Race, votes: &[Vote]) -> Result<ElectionResult, EngineError> {
        let eligible: Vec<Candidate> = eligible_candidates(race, votes).into_iter().collect();
        let rankings: Vec<Vec<Candidate>> = votes.iter().map(|v| v.rankings()).collect();

        let mut scores: BTreeMap<Candidate, f64> =
            eligible.iter().map(|c| (c.clone(), 0.0)).collect();

        for (i, candidate) in eligible.iter().enumerate() {
            for other in eligible.iter().skip(i + 1) {
                let mut matchup = MatchupScore::default();
                for ballot in &rankings {
                    match CopelandMethod::preference(candidate, other, ballot) {
                        Some(winner) if winner == *candidate => matchup.left += 1,
                        Some(_) => matchup.right += 1,
                        None => {} // ballot ranks neither; matchup not counted
                    }
                }
                debug!(
                    "matchup {} vs {}: {}-{}",
                    candidate, other, matchup.left, matchup.right
                );
                if let Some(score) = scores.get_mut(candidate) {
                    *score += matchup.left_points();
                }
                if let Some(score) = scores.get_mut(other) {
                    *score += matchup.right_points();
                }
            }
        }

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
