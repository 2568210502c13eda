/*!
Evaluation engine for preferential elections.

The crate tallies ballots cast for a fixed slate of candidates and
resolves the winner(s) of a race under one of several competing methods:

- [`SingleChoice`]: first-choice plurality;
- [`CopelandMethod`]: pairwise Condorcet-style scoring;
- [`InstantRunoff`]: classic unweighted ranked elimination;
- [`DescendingPoints`]: Borda-style descending points, single pass;
- [`WeightedRunoff`]: the generalized multi-round runoff that
  re-normalizes weighted ballots against the shrinking survivor set,
  honors vetoes and carried-over shadow votes, and records per-round
  vote flows for auditing.

The engine is single-threaded and synchronous: gather all votes for a
race, then call [`evaluate`] with the method of your choice. Evaluation
is a deterministic pure function of its inputs and retains no state
between calls.

```
use vote_engine::{evaluate, Candidate, Method, Race, Vote};

let race = Race::new("lunch", ["tacos", "soup", "salad"].map(Candidate::from))?;
let votes = vec![
    Vote::ranked("ada", &race, vec![Candidate::from("tacos"), Candidate::from("soup")])?,
    Vote::ranked("ben", &race, vec![Candidate::from("soup")])?,
    Vote::single("cleo", &race, Candidate::from("tacos"))?,
];
let result = evaluate(&race, &votes, Method::WeightedRunoff)?;
assert!(result.winners.contains(&Candidate::from("tacos")));
# Ok::<(), vote_engine::EngineError>(())
```
*/

mod algorithm;
mod error;
mod model;
mod vote;

pub use crate::algorithm::{
    CopelandMethod, DescendingPoints, ElectionResult, EvalAlgorithm, FlowRecord, InstantRunoff,
    Method, RoundStats, SingleChoice, WeightedRunoff,
};
pub use crate::error::EngineError;
pub use crate::model::{Ballot, Candidate, Election, Race};
pub use crate::vote::{accumulate_unspent, points_for_rank, unspent_weight, Selection, Vote};

use log::info;

/// Evaluates one race over an immutable snapshot of votes with the chosen
/// method.
///
/// Every vote must be valid for the race; degenerate inputs (no votes,
/// all-zero ratings) resolve to a best-effort winner set instead of an
/// error.
pub fn evaluate(
    race: &Race,
    votes: &[Vote],
    method: Method,
) -> Result<ElectionResult, EngineError> {
    info!(
        "evaluating race {:?}: {} candidates, {} votes, method {:?}",
        race.name(),
        race.candidates().len(),
        votes.len(),
        method
    );
    for vote in votes {
        vote.validate_against(race)?;
    }
    method.algorithm().evaluate(race, votes)
}
