//! Value types describing an election: candidates, races, ballots, and the
//! vote storage attached to a ballot.
//!
//! `Candidate` and `Race` are plain immutable values with equality by
//! content, so set membership and map keys behave predictably. A race is
//! never mutated in place: suggesting a new candidate builds a replacement
//! race and [`Election::update_race`] rekeys the vote storage.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::vote::Vote;

/// One candidate (choice) in a race, identified by name.
#[derive(Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Candidate(String);

impl Candidate {
    pub fn new(name: impl Into<String>) -> Candidate {
        Candidate(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Candidate {
    fn from(name: &str) -> Candidate {
        Candidate(name.to_string())
    }
}

/// A named contest over a unique, unordered set of candidates.
#[derive(Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Clone)]
pub struct Race {
    name: String,
    candidates: BTreeSet<Candidate>,
}

impl Race {
    /// Builds a race. Duplicate candidates collapse into one entry; a race
    /// with no candidates at all is rejected.
    pub fn new(
        name: impl Into<String>,
        candidates: impl IntoIterator<Item = Candidate>,
    ) -> Result<Race, EngineError> {
        let name = name.into();
        let candidates: BTreeSet<Candidate> = candidates.into_iter().collect();
        if candidates.is_empty() {
            return Err(EngineError::EmptyRace(name));
        }
        Ok(Race { name, candidates })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn candidates(&self) -> &BTreeSet<Candidate> {
        &self.candidates
    }

    pub fn contains(&self, candidate: &Candidate) -> bool {
        self.candidates.contains(candidate)
    }

    /// Returns a replacement race with one more candidate. The original is
    /// left untouched; callers must propagate the swap with
    /// [`Election::update_race`].
    pub fn with_candidate(&self, candidate: Candidate) -> Race {
        let mut candidates = self.candidates.clone();
        candidates.insert(candidate);
        Race {
            name: self.name.clone(),
            candidates,
        }
    }
}

/// Groups one or more races under an election name.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Ballot {
    name: String,
    races: BTreeSet<Race>,
}

impl Ballot {
    pub fn new(name: impl Into<String>, races: impl IntoIterator<Item = Race>) -> Ballot {
        Ballot {
            name: name.into(),
            races: races.into_iter().collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn races(&self) -> &BTreeSet<Race> {
        &self.races
    }
}

/// Identity key for replace-on-revote semantics: a voter's live ballot and
/// their carried-over shadow ballot coexist, but a second vote with the
/// same key supersedes the first.
type VoterKey = (String, bool);

/// Owns the current set of votes for every race on a ballot.
///
/// One vote per voter name (per shadow flag); adding a vote with an
/// existing key replaces the prior one. The `include_shadow` toggle
/// controls whether carried-over shadow votes show up in retrieval.
#[derive(Debug, Clone)]
pub struct Election {
    ballot: Ballot,
    votes: BTreeMap<Race, BTreeMap<VoterKey, Vote>>,
    include_shadow: bool,
}

impl Election {
    pub fn new(ballot: Ballot) -> Election {
        let votes = ballot
            .races()
            .iter()
            .map(|race| (race.clone(), BTreeMap::new()))
            .collect();
        Election {
            ballot,
            votes,
            include_shadow: true,
        }
    }

    pub fn ballot(&self) -> &Ballot {
        &self.ballot
    }

    /// Swaps `race` for `new_race`, carrying the recorded votes over to the
    /// new key. Used when a suggested candidate expands the option set.
    pub fn update_race(&mut self, race: &Race, new_race: Race) -> Result<(), EngineError> {
        let old_votes = self
            .votes
            .remove(race)
            .ok_or_else(|| EngineError::UnknownRace(race.name().to_string()))?;
        self.votes.insert(new_race.clone(), old_votes);

        let mut races = self.ballot.races().clone();
        races.remove(race);
        races.insert(new_race);
        self.ballot = Ballot::new(self.ballot.name().to_string(), races);
        Ok(())
    }

    /// Records a vote, replacing any prior vote with the same voter name
    /// and shadow flag. The vote must be valid for the given race.
    pub fn add_vote(&mut self, race: &Race, vote: Vote) -> Result<(), EngineError> {
        vote.validate_against(race)?;
        let slot = self
            .votes
            .get_mut(race)
            .ok_or_else(|| EngineError::UnknownRace(race.name().to_string()))?;
        slot.insert((vote.voter().to_string(), vote.is_shadow()), vote);
        Ok(())
    }

    /// The current votes for a race, honoring the shadow toggle.
    pub fn votes(&self, race: &Race) -> Result<Vec<Vote>, EngineError> {
        self.votes_filtered(race, self.include_shadow)
    }

    /// The current votes for a race, with explicit shadow inclusion.
    pub fn votes_filtered(
        &self,
        race: &Race,
        including_shadow: bool,
    ) -> Result<Vec<Vote>, EngineError> {
        let slot = self
            .votes
            .get(race)
            .ok_or_else(|| EngineError::UnknownRace(race.name().to_string()))?;
        Ok(slot
            .values()
            .filter(|v| including_shadow || !v.is_shadow())
            .cloned()
            .collect())
    }

    /// The live (non-shadow) vote cast by a voter, if any.
    pub fn vote_for(&self, race: &Race, voter: &str) -> Result<Option<&Vote>, EngineError> {
        let slot = self
            .votes
            .get(race)
            .ok_or_else(|| EngineError::UnknownRace(race.name().to_string()))?;
        Ok(slot.get(&(voter.to_string(), false)))
    }

    /// Removes both the live and the shadow vote recorded for a voter.
    /// Returns true if anything was removed.
    pub fn remove_votes_for(&mut self, race: &Race, voter: &str) -> Result<bool, EngineError> {
        let slot = self
            .votes
            .get_mut(race)
            .ok_or_else(|| EngineError::UnknownRace(race.name().to_string()))?;
        let live = slot.remove(&(voter.to_string(), false)).is_some();
        let shadow = slot.remove(&(voter.to_string(), true)).is_some();
        Ok(live || shadow)
    }

    pub fn set_include_shadow(&mut self, include_shadow: bool) -> bool {
        self.include_shadow = include_shadow;
        self.include_shadow
    }

    pub fn toggle_include_shadow(&mut self) -> bool {
        self.include_shadow = !self.include_shadow;
        self.include_shadow
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vote::Vote;

    fn race_abc() -> Race {
        Race::new("game", ["A", "B", "C"].map(Candidate::from)).unwrap()
    }

    #[test]
    fn empty_race_is_rejected() {
        let err = Race::new("empty", []).unwrap_err();
        assert_eq!(err, EngineError::EmptyRace("empty".to_string()));
    }

    #[test]
    fn revote_replaces_prior_ballot() {
        let race = race_abc();
        let mut election = Election::new(Ballot::new("night", [race.clone()]));

        let first = Vote::single("ada", &race, Candidate::from("A")).unwrap();
        let second = Vote::single("ada", &race, Candidate::from("B")).unwrap();
        election.add_vote(&race, first).unwrap();
        election.add_vote(&race, second).unwrap();

        let votes = election.votes(&race).unwrap();
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].top_choice(), Some(Candidate::from("B")));
    }

    #[test]
    fn shadow_votes_coexist_and_filter() {
        let race = race_abc();
        let mut election = Election::new(Ballot::new("night", [race.clone()]));

        let live = Vote::single("ada", &race, Candidate::from("A")).unwrap();
        let mut shadow = Vote::single("ada", &race, Candidate::from("C")).unwrap();
        shadow.set_shadow(true);
        election.add_vote(&race, live).unwrap();
        election.add_vote(&race, shadow).unwrap();

        assert_eq!(election.votes(&race).unwrap().len(), 2);
        assert!(!election.set_include_shadow(false));
        assert_eq!(election.votes(&race).unwrap().len(), 1);
        assert!(election.toggle_include_shadow());
        assert_eq!(election.votes(&race).unwrap().len(), 2);
    }

    #[test]
    fn update_race_rekeys_votes() {
        let race = race_abc();
        let mut election = Election::new(Ballot::new("night", [race.clone()]));
        let vote = Vote::single("ada", &race, Candidate::from("A")).unwrap();
        election.add_vote(&race, vote).unwrap();

        let expanded = race.with_candidate(Candidate::from("D"));
        election.update_race(&race, expanded.clone()).unwrap();

        assert_eq!(election.votes(&expanded).unwrap().len(), 1);
        assert_eq!(
            election.votes(&race).unwrap_err(),
            EngineError::UnknownRace("game".to_string())
        );
        assert!(election.ballot().races().contains(&expanded));
    }

    #[test]
    fn vote_for_unknown_candidate_is_rejected() {
        let race = race_abc();
        let err = Vote::single("ada", &race, Candidate::from("Z")).unwrap_err();
        assert_eq!(
            err,
            EngineError::UnknownCandidate {
                candidate: "Z".to_string(),
                race: "game".to_string(),
            }
        );
    }
}
