//! The family of tally algorithms and their shared result types.
//!
//! Every algorithm is a deterministic pure function of the race and the
//! vote snapshot it is handed: no hidden state survives between calls.
//! Vetoes are honored uniformly: a candidate vetoed by any voter is
//! removed before tallying starts and can never win, regardless of score.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::error::EngineError;
use crate::model::{Candidate, Race};
use crate::vote::Vote;

mod copeland;
mod descending_points;
mod instant_runoff;
mod single_choice;
mod weighted_runoff;

pub use copeland::CopelandMethod;
pub use descending_points::DescendingPoints;
pub use instant_runoff::InstantRunoff;
pub use single_choice::SingleChoice;
pub use weighted_runoff::WeightedRunoff;

/// One transfer of voting weight from an eliminated candidate to a
/// survivor, observed during a single round.
#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct FlowRecord {
    pub from: String,
    pub to: String,
    pub weight: f64,
}

/// Diagnostics for one tally round: the standings, who got eliminated,
/// and where the eliminated weight flowed.
#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct RoundStats {
    pub round: u32,
    /// Candidate name and score, in candidate order.
    pub tally: Vec<(String, f64)>,
    pub eliminated: Vec<String>,
    pub transfers: Vec<FlowRecord>,
}

/// The outcome of evaluating one race: the set of tied winners plus
/// per-round accounting.
///
/// The round data exists purely for observability (flow diagrams, audit
/// output); no decision logic ever reads it back.
#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct ElectionResult {
    pub winners: BTreeSet<Candidate>,
    pub rounds: Vec<RoundStats>,
}

/// A tally strategy over an immutable snapshot of votes.
pub trait EvalAlgorithm {
    fn evaluate(&self, race: &Race, votes: &[Vote]) -> Result<ElectionResult, EngineError>;
}

/// Selects one of the built-in tally strategies.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Method {
    /// First-choice plurality count.
    SingleChoice,
    /// Pairwise Condorcet-style scoring.
    Copeland,
    /// Classic unweighted ranked elimination.
    InstantRunoff,
    /// Borda-style descending points, single pass.
    DescendingPoints,
    /// Multi-round weighted runoff with proportional redistribution.
    WeightedRunoff,
    /// Weighted tally without elimination rounds.
    SingleRound,
}

impl Method {
    pub fn algorithm(&self) -> Box<dyn EvalAlgorithm> {
        match self {
            Method::SingleChoice => Box::new(SingleChoice),
            Method::Copeland => Box::new(CopelandMethod),
            Method::InstantRunoff => Box::new(InstantRunoff),
            Method::DescendingPoints => Box::new(DescendingPoints),
            Method::WeightedRunoff => Box::new(WeightedRunoff::new()),
            Method::SingleRound => Box::new(WeightedRunoff::single_round()),
        }
    }
}

impl std::str::FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Method, String> {
        match s {
            "plurality" | "single_choice" => Ok(Method::SingleChoice),
            "copeland" => Ok(Method::Copeland),
            "irv" | "instant_runoff" => Ok(Method::InstantRunoff),
            "descending_points" | "borda" => Ok(Method::DescendingPoints),
            "weighted_runoff" | "runoff" => Ok(Method::WeightedRunoff),
            "single_round" => Ok(Method::SingleRound),
            other => Err(format!("unknown evaluation method {:?}", other)),
        }
    }
}

/// The candidates still eligible once every voter's vetoes are applied.
/// A veto is an absolute disqualification, independent of score.
pub(crate) fn eligible_candidates(race: &Race, votes: &[Vote]) -> BTreeSet<Candidate> {
    let mut eligible = race.candidates().clone();
    for vote in votes {
        for vetoed in vote.vetoes() {
            eligible.remove(vetoed);
        }
    }
    eligible
}

/// All keys tied at the maximum value.
pub(crate) fn keys_at_max(scores: &BTreeMap<Candidate, f64>) -> BTreeSet<Candidate> {
    let max = scores
        .values()
        .cloned()
        .fold(f64::NEG_INFINITY, f64::max);
    scores
        .iter()
        .filter(|(_, s)| **s == max)
        .map(|(c, _)| c.clone())
        .collect()
}

/// All keys tied at the minimum value.
pub(crate) fn keys_at_min(scores: &BTreeMap<Candidate, f64>) -> BTreeSet<Candidate> {
    let min = scores.values().cloned().fold(f64::INFINITY, f64::min);
    scores
        .iter()
        .filter(|(_, s)| **s == min)
        .map(|(c, _)| c.clone())
        .collect()
}

/// The tally of a standings map, in candidate order.
pub(crate) fn tally_of(scores: &BTreeMap<Candidate, f64>) -> Vec<(String, f64)> {
    scores
        .iter()
        .map(|(c, s)| (c.name().to_string(), *s))
        .collect()
}

pub(crate) fn sort_flows(flows: &mut [FlowRecord]) {
    flows.sort_by(|a, b| {
        (a.from.as_str(), a.to.as_str())
            .cmp(&(b.from.as_str(), b.to.as_str()))
            .then(a.weight.partial_cmp(&b.weight).unwrap_or(Ordering::Equal))
    });
}
