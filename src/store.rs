//! Line-oriented vote persistence.
//!
//! Votes are stored one self-describing JSON record per line, so the
//! files can be inspected and edited by hand. The engine never touches
//! this layer; stores are injected into the session.

use std::fs;
use std::path::PathBuf;

use log::debug;
use snafu::{ResultExt, Snafu};
use vote_engine::Vote;

#[derive(Debug, Snafu)]
pub enum StoreError {
    #[snafu(display("could not read votes file {}", path.display()))]
    ReadFile {
        source: std::io::Error,
        path: PathBuf,
    },
    #[snafu(display("could not write votes file {}", path.display()))]
    WriteFile {
        source: std::io::Error,
        path: PathBuf,
    },
    #[snafu(display("invalid vote record at {}:{}", path.display(), line))]
    DecodeVote {
        source: serde_json::Error,
        path: PathBuf,
        line: usize,
    },
    #[snafu(display("could not encode vote for {voter}"))]
    EncodeVote {
        source: serde_json::Error,
        voter: String,
    },
}

/// Repository boundary for vote records.
pub trait VoteStore {
    fn load(&self) -> Result<Vec<Vote>, StoreError>;
    fn save(&self, votes: &[Vote]) -> Result<(), StoreError>;
}

/// A `VoteStore` over a plain file, one JSON vote per line.
/// A missing file reads as an empty vote set.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> FileStore {
        FileStore { path: path.into() }
    }
}

impl VoteStore for FileStore {
    fn load(&self) -> Result<Vec<Vote>, StoreError> {
        if !self.path.exists() {
            debug!("votes file {} absent, treating as empty", self.path.display());
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&self.path).context(ReadFileSnafu {
            path: self.path.clone(),
        })?;
        let mut votes = Vec::new();
        for (idx, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let vote: Vote = serde_json::from_str(line).context(DecodeVoteSnafu {
                path: self.path.clone(),
                line: idx + 1,
            })?;
            votes.push(vote);
        }
        debug!("loaded {} votes from {}", votes.len(), self.path.display());
        Ok(votes)
    }

    fn save(&self, votes: &[Vote]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).context(WriteFileSnafu {
                    path: self.path.clone(),
                })?;
            }
        }
        let mut lines = Vec::with_capacity(votes.len());
        for vote in votes {
            let line = serde_json::to_string(vote).context(EncodeVoteSnafu {
                voter: vote.voter().to_string(),
            })?;
            lines.push(line);
        }
        fs::write(&self.path, lines.join("\n")).context(WriteFileSnafu {
            path: self.path.clone(),
        })?;
        debug!("saved {} votes to {}", votes.len(), self.path.display());
        Ok(())
    }
}

/// An in-memory store for tests and for sessions with no persistence.
#[derive(Default)]
pub struct MemoryStore {
    votes: std::cell::RefCell<Vec<Vote>>,
}

impl VoteStore for MemoryStore {
    fn load(&self) -> Result<Vec<Vote>, StoreError> {
        Ok(self.votes.borrow().clone())
    }

    fn save(&self, votes: &[Vote]) -> Result<(), StoreError> {
        *self.votes.borrow_mut() = votes.to_vec();
        Ok(())
    }
}
