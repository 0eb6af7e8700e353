//! Standings computation for tournaments.
//!
//! - Scoring rules resolved into a [`PointsTable`]
//! - Team records computed from played matches, with extra time and penalties
//!   deciding level scores when draws are not allowed
//! - Total ordering of standings by points, configurable tie-breakers, team name
//!   and ranking id

pub mod calculator;
pub mod models;
pub mod rules;

pub use calculator::{
    RankingCalculator, compare_rankings, filter_group, position_of, sort_standings, standings_rows,
};
pub use models::{
    MatchOutcome, RankingId, StandingsRow, TeamRecord, TieBreaker, TournamentRanking,
};
pub use rules::{PointsTable, RuleId, RuleType, ScoringRule, ScoringRuleDraft};
