//! Ranking data models.

use serde::{Deserialize, Serialize};

use super::rules::PointsTable;
use crate::tournament::{TeamId, TournamentId};

/// Tournament ranking ID type
pub type RankingId = i64;

/// Secondary sort keys applied after points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreaker {
    /// More wins of any kind
    TotalWins,
    /// More wins in regulation
    RegularWins,
    GoalDifference,
    GoalsFor,
    /// Fewer goals conceded
    GoalsAgainst,
    /// Fewer losses of any kind
    FewerLosses,
}

impl TieBreaker {
    /// Regulation wins, then goal difference, then goals scored
    pub fn defaults() -> Vec<TieBreaker> {
        vec![
            TieBreaker::RegularWins,
            TieBreaker::GoalDifference,
            TieBreaker::GoalsFor,
        ]
    }
}

/// Result of a single match from one team's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchOutcome {
    Win,
    Draw,
    Loss,
    ExtraTimeWin,
    ExtraTimeLoss,
    ShootoutWin,
    ShootoutLoss,
}

/// Aggregate record of a team over its played matches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRecord {
    pub played: u32,
    pub win: u32,
    pub draw: u32,
    pub loss: u32,
    pub extra_time_win: u32,
    pub extra_time_loss: u32,
    pub shootout_win: u32,
    pub shootout_loss: u32,
    pub goals_for: u32,
    pub goals_against: u32,
}

impl TeamRecord {
    /// Count one outcome
    pub fn add(&mut self, outcome: MatchOutcome) {
        self.played += 1;
        match outcome {
            MatchOutcome::Win => self.win += 1,
            MatchOutcome::Draw => self.draw += 1,
            MatchOutcome::Loss => self.loss += 1,
            MatchOutcome::ExtraTimeWin => self.extra_time_win += 1,
            MatchOutcome::ExtraTimeLoss => self.extra_time_loss += 1,
            MatchOutcome::ShootoutWin => self.shootout_win += 1,
            MatchOutcome::ShootoutLoss => self.shootout_loss += 1,
        }
    }

    /// Points before deductions
    pub fn points(&self, table: &PointsTable) -> i32 {
        let count = |n: u32| i32::try_from(n).unwrap_or(i32::MAX);
        [
            (self.win, table.win),
            (self.draw, table.draw),
            (self.loss, table.loss),
            (self.extra_time_win, table.extra_time_win),
            (self.extra_time_loss, table.extra_time_loss),
            (self.shootout_win, table.shootout_win),
            (self.shootout_loss, table.shootout_loss),
        ]
        .into_iter()
        .fold(0i32, |total, (n, value)| total.saturating_add(count(n).saturating_mul(value)))
    }
}

/// Standing of one team in a tournament (or one of its groups)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentRanking {
    pub id: RankingId,
    pub tournament_id: TournamentId,
    pub team_id: TeamId,
    pub group: Option<String>,
    pub matches_played: u32,
    pub win: u32,
    pub draw: u32,
    pub loss: u32,
    pub extra_time_win: u32,
    pub extra_time_loss: u32,
    pub shootout_win: u32,
    pub shootout_loss: u32,
    pub goals_for: u32,
    pub goals_against: u32,
    pub points: i32,
    /// Points deducted by the organisers
    pub points_penalty: i32,
    pub qualified: bool,
    pub relegated: bool,
}

impl TournamentRanking {
    /// Zeroed ranking for a team
    pub fn seed(
        id: RankingId,
        tournament_id: TournamentId,
        team_id: TeamId,
        group: Option<String>,
    ) -> Self {
        Self {
            id,
            tournament_id,
            team_id,
            group,
            matches_played: 0,
            win: 0,
            draw: 0,
            loss: 0,
            extra_time_win: 0,
            extra_time_loss: 0,
            shootout_win: 0,
            shootout_loss: 0,
            goals_for: 0,
            goals_against: 0,
            points: 0,
            points_penalty: 0,
            qualified: false,
            relegated: false,
        }
    }

    /// Overwrite the aggregate fields from a freshly computed record
    pub fn apply_record(&mut self, record: &TeamRecord, table: &PointsTable) {
        self.matches_played = record.played;
        self.win = record.win;
        self.draw = record.draw;
        self.loss = record.loss;
        self.extra_time_win = record.extra_time_win;
        self.extra_time_loss = record.extra_time_loss;
        self.shootout_win = record.shootout_win;
        self.shootout_loss = record.shootout_loss;
        self.goals_for = record.goals_for;
        self.goals_against = record.goals_against;
        self.points = record.points(table).saturating_sub(self.points_penalty);
    }

    pub fn total_wins(&self) -> u32 {
        self.win
            .saturating_add(self.extra_time_win)
            .saturating_add(self.shootout_win)
    }

    pub fn total_losses(&self) -> u32 {
        self.loss
            .saturating_add(self.extra_time_loss)
            .saturating_add(self.shootout_loss)
    }

    pub fn goal_difference(&self) -> i64 {
        i64::from(self.goals_for) - i64::from(self.goals_against)
    }
}

/// One row of a rendered standings table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandingsRow {
    /// 1-based position
    pub position: usize,
    pub ranking_id: RankingId,
    pub team_id: TeamId,
    pub team_name: String,
    pub group: Option<String>,
    pub played: u32,
    pub win: u32,
    pub draw: u32,
    pub loss: u32,
    pub goals_for: u32,
    pub goals_against: u32,
    pub goal_difference: i64,
    pub points: i32,
    pub qualified: bool,
    pub relegated: bool,
}
