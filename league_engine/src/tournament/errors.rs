//! Tournament error types.

use thiserror::Error;

use super::models::{MatchId, RoundId, SeasonId, TeamId, TournamentId, TournamentStatus};
use crate::qualification::QualificationType;
use crate::ranking::RuleType;

/// Tournament errors
#[derive(Debug, Error)]
pub enum TournamentError {
    /// Empty or blank tournament name
    #[error("Tournament name must not be empty")]
    InvalidName,

    #[error("Insufficient teams: need {needed}, have {current}")]
    InsufficientTeams { needed: usize, current: usize },

    #[error("Team {0} listed more than once")]
    DuplicateTeam(TeamId),

    #[error("Season not found: {0}")]
    SeasonNotFound(SeasonId),

    #[error("Team not found: {0}")]
    TeamNotFound(TeamId),

    /// Blank or already used team name
    #[error("Invalid team: {0}")]
    InvalidTeam(String),

    #[error("Invalid tournament structure: {0}")]
    InvalidStructure(String),

    #[error("Tournament '{name}' already exists in season {season_id}")]
    DuplicateName { season_id: SeasonId, name: String },

    #[error("Structure requires a {0} qualification rule")]
    MissingQualificationRule(QualificationType),

    #[error("Invalid qualification rule: {0}")]
    InvalidQualificationRule(String),

    #[error("Unknown scoring rule type: {0}")]
    UnknownRuleType(String),

    #[error("Invalid value for scoring rule {rule_type}: {reason}")]
    InvalidRuleValue { rule_type: RuleType, reason: String },

    #[error("Scoring rule {0} already set for this tournament")]
    DuplicateScoringRule(RuleType),

    #[error("Tournament not found: {0}")]
    NotFound(TournamentId),

    #[error("Match not found: {0}")]
    MatchNotFound(MatchId),

    #[error("Round not found: {0}")]
    RoundNotFound(RoundId),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: TournamentStatus,
        to: TournamentStatus,
    },

    #[error("Round {round} still has {pending} match(es) without a result")]
    RoundNotResolved { round: u32, pending: usize },

    #[error("Match {0} has no winner")]
    UnresolvedMatch(MatchId),

    #[error("Tournament {0} is not a knockout tournament")]
    NotKnockout(TournamentId),

    #[error("Match {0} is cancelled")]
    MatchCancelled(MatchId),

    /// Knockout ties cannot be cancelled, nor their results changed once the bracket moved on
    #[error("Knockout match {0} can no longer be changed")]
    KnockoutLocked(MatchId),

    #[error("Match {0} has already been played")]
    MatchAlreadyPlayed(MatchId),

    #[error("Tournament {id} is {status}, not active")]
    NotActive {
        id: TournamentId,
        status: TournamentStatus,
    },

    #[error("Tournament {id} cannot be completed: {reason}")]
    TournamentIncomplete { id: TournamentId, reason: String },
}

impl TournamentError {
    /// Whether the error stems from invalid caller input rather than tournament state
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            TournamentError::InvalidName
                | TournamentError::InsufficientTeams { .. }
                | TournamentError::DuplicateTeam(_)
                | TournamentError::SeasonNotFound(_)
                | TournamentError::TeamNotFound(_)
                | TournamentError::InvalidTeam(_)
                | TournamentError::InvalidStructure(_)
                | TournamentError::DuplicateName { .. }
                | TournamentError::MissingQualificationRule(_)
                | TournamentError::InvalidQualificationRule(_)
                | TournamentError::UnknownRuleType(_)
                | TournamentError::InvalidRuleValue { .. }
                | TournamentError::DuplicateScoringRule(_)
        )
    }

    /// Get a client-safe error message
    ///
    /// Internal identifiers are redacted from lookup failures.
    pub fn client_message(&self) -> String {
        match self {
            TournamentError::NotFound(_) => "Tournament not found".to_string(),
            TournamentError::MatchNotFound(_) => "Match not found".to_string(),
            TournamentError::RoundNotFound(_) => "Round not found".to_string(),
            TournamentError::SeasonNotFound(_) => "Season not found".to_string(),
            TournamentError::TeamNotFound(_) => "Team not found".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for tournament operations
pub type TournamentResult<T> = Result<T, TournamentError>;
