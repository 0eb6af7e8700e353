//! Tournament data models: seasons, teams, structures, rounds and matches.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::qualification::QualificationType;
use crate::ranking::{PointsTable, TieBreaker};

/// Tournament ID type
pub type TournamentId = i64;
/// Season ID type
pub type SeasonId = i64;
/// Team ID type
pub type TeamId = i64;
/// Round ID type
pub type RoundId = i64;
/// Match ID type
pub type MatchId = i64;

/// A season of a league, owning any number of tournaments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Season {
    pub id: SeasonId,
    pub league: String,
    pub year: u16,
    pub is_active: bool,
}

/// A team that can take part in tournaments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    /// Short code, always upper case
    pub code: String,
}

/// Tournament lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TournamentStatus {
    /// Declared, schedule not generated yet
    Pending,
    /// Schedule generated, matches being played
    Active,
    /// All results in
    Completed,
    /// Abandoned
    Cancelled,
}

impl TournamentStatus {
    /// Whether a transition from `self` to `next` moves forward.
    pub fn can_transition_to(self, next: TournamentStatus) -> bool {
        use TournamentStatus::*;
        matches!(
            (self, next),
            (Pending, Active) | (Active, Completed) | (Pending, Cancelled) | (Active, Cancelled)
        )
    }
}

impl std::fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TournamentStatus::Pending => write!(f, "pending"),
            TournamentStatus::Active => write!(f, "active"),
            TournamentStatus::Completed => write!(f, "completed"),
            TournamentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Base format of a tournament
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentFormat {
    /// Round-robin championship
    League,
    /// Single elimination
    Cup,
    /// Group phase, scheduled as round-robin
    GroupStage,
    /// League phase followed by a playoff tournament
    Hybrid,
}

impl std::str::FromStr for TournamentFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "league" => Ok(TournamentFormat::League),
            "cup" | "knockout" => Ok(TournamentFormat::Cup),
            "group_stage" | "groups" => Ok(TournamentFormat::GroupStage),
            "hybrid" => Ok(TournamentFormat::Hybrid),
            other => Err(format!("unknown tournament format '{other}'")),
        }
    }
}

impl std::fmt::Display for TournamentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TournamentFormat::League => write!(f, "league"),
            TournamentFormat::Cup => write!(f, "cup"),
            TournamentFormat::GroupStage => write!(f, "group_stage"),
            TournamentFormat::Hybrid => write!(f, "hybrid"),
        }
    }
}

/// Structure and rules shared by tournaments of the same kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentStructure {
    /// Structure name (e.g. "Championship", "Cup")
    pub name: String,
    pub format: TournamentFormat,
    /// Matches per pairing in round-robin formats (1 or 2)
    pub legs: u8,
    /// Whether a level score stands as a draw
    pub allow_draws: bool,
    pub has_playoff: bool,
    pub playoff_teams: u32,
    pub has_playout: bool,
    pub playout_teams: u32,
    pub promotion_teams: u32,
    pub relegation_teams: u32,
    /// Spots for external competitions
    pub qualification_spots: u32,
    /// Fallback points when no explicit scoring rule is set
    pub points: PointsTable,
    /// Tie-breakers applied after points, in order
    pub tie_breakers: Vec<TieBreaker>,
}

impl TournamentStructure {
    /// Double round-robin championship with 3/1/0 points
    pub fn league(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            format: TournamentFormat::League,
            legs: 2,
            allow_draws: true,
            has_playoff: false,
            playoff_teams: 0,
            has_playout: false,
            playout_teams: 0,
            promotion_teams: 0,
            relegation_teams: 0,
            qualification_spots: 0,
            points: PointsTable::default(),
            tie_breakers: TieBreaker::defaults(),
        }
    }

    /// Single elimination cup, level scores go to extra time and penalties
    pub fn cup(name: impl Into<String>) -> Self {
        Self {
            format: TournamentFormat::Cup,
            legs: 1,
            allow_draws: false,
            ..Self::league(name)
        }
    }

    /// Set the number of legs
    pub fn with_legs(mut self, legs: u8) -> Self {
        self.legs = legs;
        self
    }

    /// Enable a playoff stage for the given number of teams
    pub fn with_playoff(mut self, teams: u32) -> Self {
        self.has_playoff = true;
        self.playoff_teams = teams;
        self
    }

    /// Enable a playout stage for the given number of teams
    pub fn with_playout(mut self, teams: u32) -> Self {
        self.has_playout = true;
        self.playout_teams = teams;
        self
    }

    /// Enable direct promotion for the given number of teams
    pub fn with_promotion(mut self, teams: u32) -> Self {
        self.promotion_teams = teams;
        self
    }

    /// Enable direct relegation for the given number of teams
    pub fn with_relegation(mut self, teams: u32) -> Self {
        self.relegation_teams = teams;
        self
    }

    pub fn with_qualification_spots(mut self, spots: u32) -> Self {
        self.qualification_spots = spots;
        self
    }

    /// Most teams a rule of `kind` may send on, `None` when unlimited
    pub fn entrant_cap(&self, kind: QualificationType) -> Option<usize> {
        let cap = match kind {
            QualificationType::Playoff => self.playoff_teams,
            QualificationType::Playout => self.playout_teams,
            QualificationType::Promotion => self.promotion_teams,
            QualificationType::Relegation => self.relegation_teams,
            QualificationType::Qualification => self.qualification_spots,
        };
        (cap > 0).then(|| usize::try_from(cap).unwrap_or(usize::MAX))
    }

    pub fn is_cup(&self) -> bool {
        self.format == TournamentFormat::Cup
    }
}

/// A tournament within a season
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub description: String,
    pub season_id: SeasonId,
    pub structure: TournamentStructure,
    /// Participating teams (entrants while pending)
    pub team_ids: Vec<TeamId>,
    /// Group of each team, for tournaments with a group phase
    pub groups: BTreeMap<TeamId, String>,
    pub current_match_day: u32,
    pub status: TournamentStatus,
    /// Origin tournament for playoffs and other derived stages
    pub parent_id: Option<TournamentId>,
    /// Knockout champion, once decided
    pub winner: Option<TeamId>,
    pub created_at: DateTime<Utc>,
}

impl Tournament {
    pub fn format(&self) -> TournamentFormat {
        self.structure.format
    }
}

/// Progress of a round's results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundState {
    /// No result recorded yet
    Scheduled,
    /// Some results in, some matches outstanding
    AwaitingResults,
    /// Every non-cancelled match played
    Resolved,
}

/// A match day (league) or a knockout stage (cup)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Round {
    pub id: RoundId,
    pub tournament_id: TournamentId,
    /// 1-based round number
    pub number: u32,
    pub label: Option<String>,
    pub knockout: bool,
    pub state: RoundState,
    pub match_ids: Vec<MatchId>,
    /// Teams advancing from this round without playing
    pub byes: Vec<TeamId>,
}

/// Final score of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchScore {
    pub home: u32,
    pub away: u32,
    /// Goals scored during extra time only
    pub extra_time: Option<(u32, u32)>,
    /// Penalty shoot-out result
    pub penalties: Option<(u32, u32)>,
}

impl MatchScore {
    /// Result decided in regulation
    pub fn regular(home: u32, away: u32) -> Self {
        Self {
            home,
            away,
            extra_time: None,
            penalties: None,
        }
    }

    pub fn with_extra_time(mut self, home: u32, away: u32) -> Self {
        self.extra_time = Some((home, away));
        self
    }

    pub fn with_penalties(mut self, home: u32, away: u32) -> Self {
        self.penalties = Some((home, away));
        self
    }

    /// Goals for home and away including extra time (penalties excluded)
    pub fn total_goals(&self) -> (u32, u32) {
        let (et_home, et_away) = self.extra_time.unwrap_or((0, 0));
        (self.home.saturating_add(et_home), self.away.saturating_add(et_away))
    }
}

/// A fixture between two teams
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub tournament_id: TournamentId,
    pub round_id: RoundId,
    pub home_team: TeamId,
    pub away_team: TeamId,
    pub score: Option<MatchScore>,
    pub played: bool,
    pub cancelled: bool,
    pub postponed: bool,
    pub kickoff: Option<DateTime<Utc>>,
}

impl Match {
    pub fn involves(&self, team_id: TeamId) -> bool {
        self.home_team == team_id || self.away_team == team_id
    }

    /// Whether the match counts towards standings
    pub fn counts(&self) -> bool {
        self.played && !self.cancelled && self.score.is_some()
    }

    /// Whether the match no longer blocks its round
    pub fn is_settled(&self) -> bool {
        self.cancelled || self.counts()
    }

    /// Winner of a decided match, looking at regulation, extra time and penalties in order.
    pub fn winner(&self) -> Option<TeamId> {
        let score = self.score.filter(|_| self.counts())?;
        let stages = [Some((score.home, score.away)), score.extra_time, score.penalties];
        stages
            .into_iter()
            .flatten()
            .find(|(home, away)| home != away)
            .map(|(home, away)| {
                if home > away {
                    self.home_team
                } else {
                    self.away_team
                }
            })
    }
}
