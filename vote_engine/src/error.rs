use thiserror::Error;

/// Errors surfaced by the evaluation engine.
///
/// Every variant is a precondition or input-validation failure: the
/// algorithms themselves are deterministic pure functions and have nothing
/// to retry. Degenerate-but-valid inputs (no votes, all-zero ratings) are
/// not errors and produce best-effort winner sets instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// A race must carry at least one candidate.
    #[error("race {0:?} has no candidates")]
    EmptyRace(String),

    /// A vote referenced a candidate that is not part of the race.
    #[error("candidate {candidate:?} does not appear in race {race:?}")]
    UnknownCandidate { candidate: String, race: String },

    /// A ranked ballot listed the same candidate twice.
    #[error("candidate {0:?} appears more than once on the ballot")]
    DuplicateChoice(String),

    /// A weighted rating must be a finite number: NaN or an infinity
    /// would poison every normalized standing it touches.
    #[error("rating {rating} for candidate {candidate:?} is not a finite number")]
    NonFiniteRating { candidate: String, rating: f64 },

    /// The election has no such race (or the race was replaced).
    #[error("race {0:?} does not appear on this ballot")]
    UnknownRace(String),
}
