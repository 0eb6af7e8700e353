//! Repository trait definitions for testability and dependency injection.
//!
//! The tournament services only talk to storage through [`TournamentRepository`].
//! Operations that write several entities at once (a new tournament with its
//! schedule, a tournament start, a knockout round) are single calls so that an
//! implementation can apply them atomically.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::qualification::{QualificationRule, QualificationRuleDraft};
use crate::ranking::{ScoringRule, ScoringRuleDraft, TournamentRanking};
use crate::schedule::RoundDraft;
use crate::tournament::{
    Match, MatchId, Round, Season, SeasonId, Team, TeamId, Tournament, TournamentId,
    TournamentResult, TournamentStatus, TournamentStructure,
};

/// Everything written when a tournament is created
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TournamentPlan {
    pub name: String,
    pub description: String,
    pub season_id: SeasonId,
    pub structure: TournamentStructure,
    pub team_ids: Vec<TeamId>,
    pub status: TournamentStatus,
    pub parent_id: Option<TournamentId>,
    /// Rounds to materialise; empty for a pending tournament
    pub rounds: Vec<RoundDraft>,
    /// Group of each team, for tournaments with a group phase
    pub groups: BTreeMap<TeamId, String>,
    pub scoring_rules: Vec<ScoringRuleDraft>,
    pub qualification_rules: Vec<QualificationRuleDraft>,
}

/// Storage for seasons, teams and everything hanging off a tournament
#[async_trait]
pub trait TournamentRepository: Send + Sync {
    /// Create a new season
    async fn create_season(&self, league: &str, year: u16) -> TournamentResult<Season>;

    async fn find_season(&self, season_id: SeasonId) -> TournamentResult<Option<Season>>;

    /// Create a team; names are unique
    async fn create_team(&self, name: &str, code: &str) -> TournamentResult<Team>;

    /// Teams for the given ids, skipping unknown ones
    async fn find_teams(&self, team_ids: &[TeamId]) -> TournamentResult<Vec<Team>>;

    /// Whether `name` is already used by a tournament of the season
    async fn tournament_name_taken(&self, season_id: SeasonId, name: &str) -> TournamentResult<bool>;

    /// Store a tournament with its rounds, matches, seeded rankings and rules.
    ///
    /// Either every entity of the plan is stored or none is.
    async fn insert_tournament(&self, plan: TournamentPlan) -> TournamentResult<Tournament>;

    async fn find_tournament(&self, tournament_id: TournamentId) -> TournamentResult<Option<Tournament>>;

    async fn update_tournament(&self, tournament: &Tournament) -> TournamentResult<()>;

    /// Add entrants to a pending tournament, returning the teams that were new
    async fn add_entrants(
        &self,
        tournament_id: TournamentId,
        team_ids: &[TeamId],
    ) -> TournamentResult<Vec<TeamId>>;

    /// Activate a pending tournament: store its rounds and matches and seed rankings.
    async fn activate_tournament(
        &self,
        tournament_id: TournamentId,
        rounds: Vec<RoundDraft>,
    ) -> TournamentResult<Tournament>;

    /// Rounds of a tournament ordered by number
    async fn rounds(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Round>>;

    async fn update_round(&self, round: &Round) -> TournamentResult<()>;

    /// Store one more round with its matches
    async fn append_round(&self, tournament_id: TournamentId, draft: RoundDraft) -> TournamentResult<Round>;

    /// Matches of a tournament in creation order
    async fn matches(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Match>>;

    async fn find_match(&self, match_id: MatchId) -> TournamentResult<Option<Match>>;

    async fn update_match(&self, m: &Match) -> TournamentResult<()>;

    /// Rankings of a tournament in creation order
    async fn rankings(&self, tournament_id: TournamentId) -> TournamentResult<Vec<TournamentRanking>>;

    /// Write back ranking aggregates and flags
    async fn update_rankings(&self, rankings: &[TournamentRanking]) -> TournamentResult<()>;

    async fn scoring_rules(&self, tournament_id: TournamentId) -> TournamentResult<Vec<ScoringRule>>;

    /// Store a scoring rule; one rule per type and tournament
    async fn insert_scoring_rule(
        &self,
        tournament_id: TournamentId,
        draft: ScoringRuleDraft,
    ) -> TournamentResult<ScoringRule>;

    /// Rules whose origin is `from_tournament`
    async fn qualification_rules(
        &self,
        from_tournament: TournamentId,
    ) -> TournamentResult<Vec<QualificationRule>>;

    async fn insert_qualification_rule(
        &self,
        from_tournament: TournamentId,
        draft: QualificationRuleDraft,
    ) -> TournamentResult<QualificationRule>;
}
