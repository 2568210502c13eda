//! Orchestration of one tabulation session: build the race, collect and
//! amend votes, resolve the winner, and carry unspent weight forward.
//!
//! The session keeps two stores: one for default votes that apply when a
//! voter sits an election out, and one for the shadow votes that carry
//! unspent weight from past elections into the next one.

use std::collections::BTreeMap;

use log::{debug, info, warn};
use snafu::Snafu;
use vote_engine::{
    accumulate_unspent, evaluate, unspent_weight, Ballot, Candidate, Election, ElectionResult,
    EngineError, Method, Race, Vote,
};

use crate::store::{StoreError, VoteStore};

#[derive(Debug, Snafu)]
pub enum SessionError {
    #[snafu(display("no election in progress"))]
    NoElection,
    #[snafu(display("{input:?} does not name a candidate unambiguously"))]
    AmbiguousCandidate { input: String },
    #[snafu(context(false), display("{source}"))]
    Engine { source: EngineError },
    #[snafu(context(false), display("{source}"))]
    Store { source: StoreError },
}

pub struct Session {
    election: Option<(Election, Race)>,
    default_store: Box<dyn VoteStore>,
    unspent_store: Box<dyn VoteStore>,
}

impl Session {
    pub fn new(default_store: Box<dyn VoteStore>, unspent_store: Box<dyn VoteStore>) -> Session {
        Session {
            election: None,
            default_store,
            unspent_store,
        }
    }

    /// Opens a fresh election over the given slate, discarding any
    /// election already in progress.
    pub fn start_election(
        &mut self,
        name: &str,
        candidates: impl IntoIterator<Item = Candidate>,
    ) -> Result<(), SessionError> {
        let race = Race::new(name, candidates)?;
        info!(
            "starting election {:?} with {} candidates",
            name,
            race.candidates().len()
        );
        let election = Election::new(Ballot::new(name, [race.clone()]));
        self.election = Some((election, race));
        Ok(())
    }

    pub fn race(&self) -> Result<&Race, SessionError> {
        self.election
            .as_ref()
            .map(|(_, race)| race)
            .ok_or(SessionError::NoElection)
    }

    /// The number of live votes cast so far.
    pub fn vote_count(&self) -> Result<usize, SessionError> {
        match &self.election {
            Some((election, race)) => Ok(election.votes_filtered(race, false)?.len()),
            None => Err(SessionError::NoElection),
        }
    }

    /// The live vote a voter has on record, if any.
    pub fn current_vote(&self, voter: &str) -> Result<Option<Vote>, SessionError> {
        match &self.election {
            Some((election, race)) => Ok(election.vote_for(race, voter)?.cloned()),
            None => Err(SessionError::NoElection),
        }
    }

    fn current(&mut self) -> Result<(&mut Election, &Race), SessionError> {
        match &mut self.election {
            Some((election, race)) => Ok((election, &*race)),
            None => Err(SessionError::NoElection),
        }
    }

    /// Records a ranked submission for a voter. The vote is stored in
    /// weighted form so later per-candidate amendments compose with it.
    pub fn submit(&mut self, voter: &str, ranking: Vec<Candidate>) -> Result<(), SessionError> {
        let (election, race) = self.current()?;
        let vote = Vote::ranked(voter, race, ranking)?.to_weighted();
        election.add_vote(race, vote)?;
        Ok(())
    }

    /// Records a raw vote as-is, shadow flag and all.
    pub fn submit_vote(&mut self, vote: Vote) -> Result<(), SessionError> {
        let (election, race) = self.current()?;
        election.add_vote(race, vote)?;
        Ok(())
    }

    /// Sets one candidate's rating on a voter's ballot, creating an empty
    /// weighted ballot for the voter if they have not voted yet.
    pub fn rate(
        &mut self,
        voter: &str,
        candidate: Candidate,
        rating: f64,
    ) -> Result<(), SessionError> {
        let (election, race) = self.current()?;
        let mut vote = match election.vote_for(race, voter)? {
            Some(existing) => existing.clone(),
            None => Vote::weighted(voter),
        };
        vote.rate(race, candidate, rating)?;
        election.add_vote(race, vote)?;
        Ok(())
    }

    /// Toggles a voter's veto of a candidate; returns the state after the
    /// toggle (`true` = now vetoed).
    pub fn veto(&mut self, voter: &str, candidate: Candidate) -> Result<bool, SessionError> {
        let (election, race) = self.current()?;
        let mut vote = match election.vote_for(race, voter)? {
            Some(existing) => existing.clone(),
            None => Vote::weighted(voter),
        };
        let vetoed = vote.veto_toggle(candidate);
        election.add_vote(race, vote)?;
        Ok(vetoed)
    }

    /// Adds a suggested candidate to the slate mid-election. Votes already
    /// cast are unaffected; they simply do not mention the newcomer.
    pub fn suggest(&mut self, candidate: Candidate) -> Result<(), SessionError> {
        let (election, race) = self.current()?;
        if race.contains(&candidate) {
            return Ok(());
        }
        info!("adding suggested candidate {:?}", candidate.name());
        let expanded = race.with_candidate(candidate);
        election.update_race(race, expanded.clone())?;
        if let Some(slot) = self.election.as_mut() {
            slot.1 = expanded;
        }
        Ok(())
    }

    /// Resolves user input to a candidate of the current race: an exact
    /// name, else a unique case-insensitive prefix, else a unique
    /// case-insensitive substring.
    pub fn interpret(&self, input: &str) -> Result<Candidate, SessionError> {
        let race = self.race()?;
        let exact = Candidate::from(input);
        if race.contains(&exact) {
            return Ok(exact);
        }
        let needle = input.to_lowercase();
        let unique = |matches: Vec<&Candidate>| match matches[..] {
            [single] => Some(single.clone()),
            _ => None,
        };
        let prefixed = race
            .candidates()
            .iter()
            .filter(|c| c.name().to_lowercase().starts_with(&needle))
            .collect();
        if let Some(found) = unique(prefixed) {
            return Ok(found);
        }
        let contained = race
            .candidates()
            .iter()
            .filter(|c| c.name().to_lowercase().contains(&needle))
            .collect();
        if let Some(found) = unique(contained) {
            return Ok(found);
        }
        Err(SessionError::AmbiguousCandidate {
            input: input.to_string(),
        })
    }

    /// Stores a voter's current ballot as their default vote, to be cast
    /// on their behalf in elections they sit out.
    pub fn save_default_vote(&mut self, voter: &str) -> Result<bool, SessionError> {
        let vote = match self.current_vote(voter)? {
            Some(vote) => vote,
            None => return Ok(false),
        };
        let mut defaults = self.load_keyed(true)?;
        defaults.insert(voter.to_string(), vote);
        self.default_store
            .save(&defaults.into_values().collect::<Vec<_>>())?;
        Ok(true)
    }

    pub fn clear_default_vote(&mut self, voter: &str) -> Result<bool, SessionError> {
        let mut defaults = self.load_keyed(true)?;
        let removed = defaults.remove(voter).is_some();
        if removed {
            self.default_store
                .save(&defaults.into_values().collect::<Vec<_>>())?;
        }
        Ok(removed)
    }

    /// Casts stored default votes for every voter who has not voted in the
    /// current election. Defaults are restricted to the current slate; a
    /// default left blank by the restriction is skipped.
    pub fn apply_default_votes(&mut self) -> Result<usize, SessionError> {
        let defaults = self.default_store.load()?;
        let (election, race) = self.current()?;
        let mut applied = 0;
        for vote in defaults {
            if election.vote_for(race, vote.voter())?.is_some() {
                continue;
            }
            let mut vote = vote.restrict_to(race);
            vote.set_shadow(false);
            if vote.is_blank() {
                debug!("default vote of {} names no current candidate", vote.voter());
                continue;
            }
            election.add_vote(race, vote)?;
            applied += 1;
        }
        if applied > 0 {
            info!("applied {} default votes", applied);
        }
        Ok(applied)
    }

    /// Evaluates the current race, first merging in the carried-over
    /// shadow votes of every voter who cast a live vote.
    pub fn pick_winner(&mut self, method: Method) -> Result<ElectionResult, SessionError> {
        let carried = self.unspent_store.load()?;
        let (election, race) = self.current()?;
        let mut merged = 0;
        for shadow in carried {
            if election.vote_for(race, shadow.voter())?.is_none() {
                continue; // only voters present tonight carry weight in
            }
            let shadow = shadow.restrict_to(race);
            if shadow.is_blank() {
                continue;
            }
            election.add_vote(race, shadow)?;
            merged += 1;
        }
        if merged > 0 {
            info!("merged {} carried-over shadow votes", merged);
        }
        let votes = election.votes(race)?;
        Ok(evaluate(race, &votes, method)?)
    }

    /// Measures the weight each live voter wasted on the finished election
    /// and folds it into the carried-over shadow votes for next time.
    pub fn record_unspent(&mut self, winner: &Candidate) -> Result<(), SessionError> {
        let (election, race) = self.current()?;
        if !race.contains(winner) {
            warn!("recording unspent weight against a winner outside the race");
        }
        let live = election.votes_filtered(race, false)?;

        let mut recorded = self.load_keyed(false)?;
        for vote in &live {
            let update = unspent_weight(vote, winner);
            let voter = vote.voter().to_string();
            let merged = match recorded.get(&voter) {
                Some(prior) => accumulate_unspent(prior, &update, winner),
                None => update,
            };
            if merged.is_blank() {
                recorded.remove(&voter);
            } else {
                recorded.insert(voter, merged);
            }
        }
        let carried: Vec<Vote> = recorded.into_values().collect();
        debug!("carrying unspent weight for {} voters", carried.len());
        self.unspent_store.save(&carried)?;
        Ok(())
    }

    fn load_keyed(&self, defaults: bool) -> Result<BTreeMap<String, Vote>, SessionError> {
        let store = if defaults {
            &self.default_store
        } else {
            &self.unspent_store
        };
        Ok(store
            .load()?
            .into_iter()
            .map(|vote| (vote.voter().to_string(), vote))
            .collect())
    }
}
