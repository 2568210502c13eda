//! One voter's submission, in any of its three forms: a single choice, an
//! ordered ranking, or a map of signed ratings.
//!
//! The variants are one tagged union rather than a type hierarchy; tally
//! code dispatches through [`Vote::contribution_to`] instead of inspecting
//! the variant. Normalized ratings are recomputed eagerly as a pure
//! function of the ratings and the requested subset, so there is no cache
//! to invalidate.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::model::{Candidate, Race};

/// The selection payload of a vote, with a `kind` discriminator in the
/// serialized form so vote records are self-describing.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Selection {
    /// One candidate.
    Single { choice: Candidate },
    /// An explicit ordered list, most-preferred first, no weights.
    Ranked { choices: Vec<Candidate> },
    /// Signed real-valued ratings. Negative means opposition.
    Weighted { ratings: BTreeMap<Candidate, f64> },
}

/// A single voter's ballot for one race.
///
/// Identity for replace-on-revote purposes is the voter name plus the
/// shadow flag; the selection payload carries no identity.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    voter: String,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    vetoes: BTreeSet<Candidate>,
    #[serde(default)]
    shadow: bool,
    #[serde(flatten)]
    selection: Selection,
}

impl Vote {
    /// A plurality-style vote for one candidate.
    pub fn single(
        voter: impl Into<String>,
        race: &Race,
        choice: Candidate,
    ) -> Result<Vote, EngineError> {
        let vote = Vote {
            voter: voter.into(),
            vetoes: BTreeSet::new(),
            shadow: false,
            selection: Selection::Single { choice },
        };
        vote.validate_against(race)?;
        Ok(vote)
    }

    /// An ordered ranking, most-preferred first. Choices must be unique
    /// and belong to the race.
    pub fn ranked(
        voter: impl Into<String>,
        race: &Race,
        choices: Vec<Candidate>,
    ) -> Result<Vote, EngineError> {
        let vote = Vote {
            voter: voter.into(),
            vetoes: BTreeSet::new(),
            shadow: false,
            selection: Selection::Ranked { choices },
        };
        vote.validate_against(race)?;
        Ok(vote)
    }

    /// A weighted vote with no ratings yet; see [`Vote::rate`].
    pub fn weighted(voter: impl Into<String>) -> Vote {
        Vote {
            voter: voter.into(),
            vetoes: BTreeSet::new(),
            shadow: false,
            selection: Selection::Weighted {
                ratings: BTreeMap::new(),
            },
        }
    }

    pub fn voter(&self) -> &str {
        &self.voter
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn is_shadow(&self) -> bool {
        self.shadow
    }

    pub fn set_shadow(&mut self, shadow: bool) {
        self.shadow = shadow;
    }

    pub fn is_weighted(&self) -> bool {
        matches!(self.selection, Selection::Weighted { .. })
    }

    /// Stores or overwrites a rating. A non-weighted vote is first
    /// converted to weighted form (descending points over its current
    /// rankings), then the rating is applied on top.
    pub fn rate(
        &mut self,
        race: &Race,
        candidate: Candidate,
        rating: f64,
    ) -> Result<(), EngineError> {
        if !race.contains(&candidate) {
            return Err(EngineError::UnknownCandidate {
                candidate: candidate.name().to_string(),
                race: race.name().to_string(),
            });
        }
        if !rating.is_finite() {
            return Err(EngineError::NonFiniteRating {
                candidate: candidate.name().to_string(),
                rating,
            });
        }
        if !self.is_weighted() {
            *self = self.to_weighted();
        }
        if let Selection::Weighted { ratings } = &mut self.selection {
            ratings.insert(candidate, rating);
        }
        Ok(())
    }

    /// Removes a rating entirely (distinct from rating zero).
    pub fn clear_rating(&mut self, candidate: &Candidate) {
        if let Selection::Weighted { ratings } = &mut self.selection {
            ratings.remove(candidate);
        }
    }

    /// The unnormalized rating for a candidate, or `None` if the candidate
    /// was never rated (or the vote is not weighted).
    pub fn raw_rating(&self, candidate: &Candidate) -> Option<f64> {
        match &self.selection {
            Selection::Weighted { ratings } => ratings.get(candidate).copied(),
            _ => None,
        }
    }

    /// Toggles a veto and returns the veto state after the call
    /// (`true` = the candidate is now vetoed).
    pub fn veto_toggle(&mut self, candidate: Candidate) -> bool {
        if self.vetoes.remove(&candidate) {
            false
        } else {
            self.vetoes.insert(candidate);
            true
        }
    }

    pub fn vetoes(&self) -> &BTreeSet<Candidate> {
        &self.vetoes
    }

    pub fn clear_vetoes(&mut self) {
        self.vetoes.clear();
    }

    /// The ordered preferences of this vote, most-preferred first.
    ///
    /// Weighted votes sort by descending raw rating; rating ties break by
    /// candidate name so the order is deterministic.
    pub fn rankings(&self) -> Vec<Candidate> {
        match &self.selection {
            Selection::Single { choice } => vec![choice.clone()],
            Selection::Ranked { choices } => choices.clone(),
            Selection::Weighted { ratings } => {
                let mut ranked: Vec<(&Candidate, f64)> =
                    ratings.iter().map(|(c, r)| (c, *r)).collect();
                // Stable sort on a name-ordered map keeps ties in name order.
                ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
                ranked.into_iter().map(|(c, _)| c.clone()).collect()
            }
        }
    }

    /// Collapses this vote to its most-preferred candidate, if it has one.
    pub fn top_choice(&self) -> Option<Candidate> {
        self.rankings().into_iter().next()
    }

    /// This vote's ratings scaled so their absolute values sum to 1.0
    /// across the rated candidates inside `subset`.
    ///
    /// Candidates never rated are absent from the result, not zero. If the
    /// absolute sum over the subset is exactly zero the result is empty:
    /// no candidate has a defined normalized rating. Non-weighted votes
    /// have no normalized ratings.
    pub fn normalized_ratings(&self, subset: &BTreeSet<Candidate>) -> BTreeMap<Candidate, f64> {
        let ratings = match &self.selection {
            Selection::Weighted { ratings } => ratings,
            _ => return BTreeMap::new(),
        };
        let sum: f64 = ratings
            .iter()
            .filter(|(c, _)| subset.contains(c))
            .map(|(_, r)| r.abs())
            .sum();
        if sum == 0.0 {
            return BTreeMap::new();
        }
        ratings
            .iter()
            .filter(|(c, _)| subset.contains(c))
            .map(|(c, r)| (c.clone(), r / sum))
            .collect()
    }

    /// The weighted form of this vote.
    ///
    /// A weighted vote is returned unchanged. A ranked vote converts by
    /// descending points (rank r gets 2/(r+1): 1.0, 0.67, 0.5, ...), so a
    /// single-choice vote becomes one candidate rated 1.0.
    pub fn to_weighted(&self) -> Vote {
        if self.is_weighted() {
            return self.clone();
        }
        let ratings: BTreeMap<Candidate, f64> = self
            .rankings()
            .into_iter()
            .enumerate()
            .map(|(idx, c)| (c, points_for_rank(idx + 1)))
            .collect();
        Vote {
            voter: self.voter.clone(),
            vetoes: self.vetoes.clone(),
            shadow: self.shadow,
            selection: Selection::Weighted { ratings },
        }
    }

    /// The voting power this ballot hands to each survivor in one runoff
    /// round.
    ///
    /// - A weighted vote contributes its ratings normalized across the
    ///   survivor set, which redistributes an eliminated candidate's share
    ///   proportionally among the voter's surviving preferences.
    /// - A shadow weighted vote contributes its raw ratings instead:
    ///   carried-over weight is already normalized and must not be
    ///   re-scaled against a different survivor set.
    /// - Any other vote contributes 1.0 to its highest surviving ranked
    ///   choice only.
    pub fn contribution_to(&self, survivors: &BTreeSet<Candidate>) -> BTreeMap<Candidate, f64> {
        match &self.selection {
            Selection::Weighted { ratings } if self.shadow => ratings
                .iter()
                .filter(|(c, _)| survivors.contains(c))
                .map(|(c, r)| (c.clone(), *r))
                .collect(),
            Selection::Weighted { .. } => self.normalized_ratings(survivors),
            _ => self
                .rankings()
                .into_iter()
                .find(|c| survivors.contains(c))
                .map(|c| (c, 1.0))
                .into_iter()
                .collect(),
        }
    }

    /// A copy of this vote with every candidate outside `race` dropped:
    /// vetoes, ranked choices, and ratings of candidates the race does not
    /// know. A single choice outside the race degrades to an empty
    /// weighted vote. Used when carrying a shadow vote into a race with a
    /// different slate.
    pub fn restrict_to(&self, race: &Race) -> Vote {
        let mut vote = self.clone();
        vote.vetoes.retain(|c| race.contains(c));
        vote.selection = match vote.selection {
            Selection::Single { choice } if race.contains(&choice) => {
                Selection::Single { choice }
            }
            Selection::Single { .. } => Selection::Weighted {
                ratings: BTreeMap::new(),
            },
            Selection::Ranked { choices } => Selection::Ranked {
                choices: choices.into_iter().filter(|c| race.contains(c)).collect(),
            },
            Selection::Weighted { mut ratings } => {
                ratings.retain(|c, _| race.contains(c));
                Selection::Weighted { ratings }
            }
        };
        vote
    }

    /// True if this vote selects nothing at all.
    pub fn is_blank(&self) -> bool {
        match &self.selection {
            Selection::Single { .. } => false,
            Selection::Ranked { choices } => choices.is_empty(),
            Selection::Weighted { ratings } => ratings.is_empty(),
        }
    }

    /// Checks that every candidate this vote selects belongs to the race
    /// and that a ranked ballot holds no duplicate choices.
    pub fn validate_against(&self, race: &Race) -> Result<(), EngineError> {
        let unknown = |candidate: &Candidate| EngineError::UnknownCandidate {
            candidate: candidate.name().to_string(),
            race: race.name().to_string(),
        };
        match &self.selection {
            Selection::Single { choice } => {
                if !race.contains(choice) {
                    return Err(unknown(choice));
                }
            }
            Selection::Ranked { choices } => {
                let mut seen: BTreeSet<&Candidate> = BTreeSet::new();
                for choice in choices {
                    if !race.contains(choice) {
                        return Err(unknown(choice));
                    }
                    if !seen.insert(choice) {
                        return Err(EngineError::DuplicateChoice(choice.name().to_string()));
                    }
                }
            }
            Selection::Weighted { ratings } => {
                for (candidate, rating) in ratings {
                    if !race.contains(candidate) {
                        return Err(unknown(candidate));
                    }
                    if !rating.is_finite() {
                        return Err(EngineError::NonFiniteRating {
                            candidate: candidate.name().to_string(),
                            rating: *rating,
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

/// The descending-points value of a 1-based rank: 1 -> 1.0, 2 -> 0.67,
/// 3 -> 0.5, 4 -> 0.4, ...
pub fn points_for_rank(rank: usize) -> f64 {
    2.0 / (rank as f64 + 1.0)
}

/// The portion of a vote that was "wasted" on a race the given candidate
/// won: the normalized weight spent on every candidate the voter preferred
/// over the winner, plus any negative rating of the winner itself.
///
/// The result is a shadow weighted vote (vetoes cleared) whose absolute
/// ratings sum to at most 1.0, ready to be carried into a later election.
/// A non-weighted vote counts its single top choice as fully unspent when
/// that choice lost.
pub fn unspent_weight(vote: &Vote, winner: &Candidate) -> Vote {
    let mut unspent = Vote::weighted(vote.voter());
    unspent.set_shadow(true);

    match vote.selection() {
        Selection::Weighted { ratings } => {
            let everything: BTreeSet<Candidate> = ratings.keys().cloned().collect();
            let normalized = vote.normalized_ratings(&everything);
            let mut carried: BTreeMap<Candidate, f64> = BTreeMap::new();
            for candidate in vote.rankings() {
                let portion = match normalized.get(&candidate) {
                    Some(p) => *p,
                    None => continue,
                };
                if candidate == *winner {
                    if portion < 0.0 {
                        // Voting against the winner is unspent as well.
                        carried.insert(candidate, portion);
                    }
                    break; // remaining candidates ranked below the winner are spent
                }
                if portion > 0.0 {
                    carried.insert(candidate, portion);
                }
            }
            unspent.selection = Selection::Weighted { ratings: carried };
        }
        _ => {
            if let Some(chosen) = vote.top_choice() {
                if chosen != *winner {
                    let mut ratings = BTreeMap::new();
                    ratings.insert(chosen, 1.0);
                    unspent.selection = Selection::Weighted { ratings };
                }
            }
        }
    }
    unspent
}

/// Folds a freshly measured unspent-weight vote into the shadow vote
/// previously carried for the same voter.
///
/// Carried support for the new winner is satisfied and drops to zero, as
/// does carried opposition to any candidate who just lost. What survives
/// adds to the fresh measurement, except that carried weight the fresh
/// measurement no longer backs is halved as it merges. Ratings that end
/// at exactly zero are removed.
pub fn accumulate_unspent(prior: &Vote, update: &Vote, winner: &Candidate) -> Vote {
    let rated = |vote: &Vote| -> BTreeSet<Candidate> {
        match vote.selection() {
            Selection::Weighted { ratings } => ratings.keys().cloned().collect(),
            _ => BTreeSet::new(),
        }
    };
    let mut candidates = rated(prior);
    candidates.extend(rated(update));

    let mut ratings: BTreeMap<Candidate, f64> = BTreeMap::new();
    for candidate in candidates {
        let fresh = update.raw_rating(&candidate).unwrap_or(0.0);
        let mut past = prior.raw_rating(&candidate).unwrap_or(0.0);
        if candidate == *winner {
            if past > 0.0 {
                past = 0.0; // carried support was satisfied
            }
        } else if past < 0.0 {
            past = 0.0; // the opposed candidate lost
        }
        let contradicted = (past > 0.0 && fresh <= 0.0) || (past < 0.0 && fresh >= 0.0);
        let mut next = fresh + past;
        if contradicted {
            next *= 0.5;
        }
        if next != 0.0 {
            ratings.insert(candidate, next);
        }
    }

    let mut merged = Vote::weighted(prior.voter());
    merged.set_shadow(true);
    merged.selection = Selection::Weighted { ratings };
    merged
}
