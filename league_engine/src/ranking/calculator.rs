//! Team record computation and standings ordering.

use std::{cmp::Ordering, collections::HashMap};

use tracing::Span;

use super::{
    models::{MatchOutcome, RankingId, StandingsRow, TeamRecord, TieBreaker, TournamentRanking},
    rules::{PointsTable, ScoringRule},
};
use crate::tournament::{Match, TeamId, TournamentStructure};

/// Computes team records and orders standings
#[derive(Debug, Clone)]
pub struct RankingCalculator {
    span: Span,
}

impl RankingCalculator {
    /// Create a calculator logging into `span`
    pub fn new(span: Span) -> Self {
        Self { span }
    }

    /// Outcome of `m` for `team_id` together with goals for and against.
    ///
    /// Returns `None` if the team did not take part or the match does not count.
    pub fn outcome(
        &self,
        m: &Match,
        team_id: TeamId,
        allow_draws: bool,
    ) -> Option<(MatchOutcome, u32, u32)> {
        if !m.counts() || !m.involves(team_id) {
            return None;
        }
        let score = m.score?;
        let is_home = m.home_team == team_id;
        let orient = |(home, away): (u32, u32)| if is_home { (home, away) } else { (away, home) };

        let (goals_for, goals_against) = orient(score.total_goals());
        let (own, other) = orient((score.home, score.away));

        let outcome = if own != other {
            if own > other {
                MatchOutcome::Win
            } else {
                MatchOutcome::Loss
            }
        } else if allow_draws {
            MatchOutcome::Draw
        } else if let Some((own, other)) = score.extra_time.map(orient).filter(|(a, b)| a != b) {
            if own > other {
                MatchOutcome::ExtraTimeWin
            } else {
                MatchOutcome::ExtraTimeLoss
            }
        } else if let Some((own, other)) = score.penalties.map(orient).filter(|(a, b)| a != b) {
            if own > other {
                MatchOutcome::ShootoutWin
            } else {
                MatchOutcome::ShootoutLoss
            }
        } else {
            self.span.in_scope(|| {
                tracing::warn!(
                    match_id = m.id,
                    team_id,
                    "level score without extra time or penalties, counted as a draw"
                )
            });
            MatchOutcome::Draw
        };

        Some((outcome, goals_for, goals_against))
    }

    /// Aggregate record of `team_id` over `matches`
    pub fn record(&self, team_id: TeamId, matches: &[Match], allow_draws: bool) -> TeamRecord {
        let mut record = TeamRecord::default();
        for (outcome, goals_for, goals_against) in matches
            .iter()
            .filter_map(|m| self.outcome(m, team_id, allow_draws))
        {
            record.add(outcome);
            record.goals_for += goals_for;
            record.goals_against += goals_against;
        }
        record
    }

    /// Rewrite `ranking` from the tournament's matches.
    ///
    /// Idempotent: the same match set always yields the same ranking.
    pub fn recompute(
        &self,
        ranking: &mut TournamentRanking,
        matches: &[Match],
        structure: &TournamentStructure,
        rules: &[ScoringRule],
    ) {
        let record = self.record(ranking.team_id, matches, structure.allow_draws);
        let table = PointsTable::resolve(structure.points, rules);
        ranking.apply_record(&record, &table);

        self.span.in_scope(|| {
            tracing::debug!(
                tournament_id = ranking.tournament_id,
                team_id = ranking.team_id,
                played = ranking.matches_played,
                points = ranking.points,
                "ranking recomputed"
            )
        });
    }
}

fn compare_tie_breaker(a: &TournamentRanking, b: &TournamentRanking, tie_breaker: TieBreaker) -> Ordering {
    match tie_breaker {
        TieBreaker::TotalWins => b.total_wins().cmp(&a.total_wins()),
        TieBreaker::RegularWins => b.win.cmp(&a.win),
        TieBreaker::GoalDifference => b.goal_difference().cmp(&a.goal_difference()),
        TieBreaker::GoalsFor => b.goals_for.cmp(&a.goals_for),
        TieBreaker::GoalsAgainst => a.goals_against.cmp(&b.goals_against),
        TieBreaker::FewerLosses => a.total_losses().cmp(&b.total_losses()),
    }
}

/// Total order over rankings: points, tie-breakers, team name, ranking id.
pub fn compare_rankings(
    a: &TournamentRanking,
    b: &TournamentRanking,
    tie_breakers: &[TieBreaker],
    names: &HashMap<TeamId, String>,
) -> Ordering {
    let name = |r: &TournamentRanking| names.get(&r.team_id).map(String::as_str).unwrap_or("");

    tie_breakers
        .iter()
        .fold(b.points.cmp(&a.points), |ord, tb| {
            ord.then_with(|| compare_tie_breaker(a, b, *tb))
        })
        .then_with(|| name(a).cmp(name(b)))
        .then_with(|| a.id.cmp(&b.id))
}

/// Sort rankings into standings order
pub fn sort_standings(
    rankings: &mut [TournamentRanking],
    tie_breakers: &[TieBreaker],
    names: &HashMap<TeamId, String>,
) {
    rankings.sort_by(|a, b| compare_rankings(a, b, tie_breakers, names));
}

/// Keep only the rankings of `group` (all rankings when `None`)
pub fn filter_group(rankings: Vec<TournamentRanking>, group: Option<&str>) -> Vec<TournamentRanking> {
    match group {
        Some(group) => rankings
            .into_iter()
            .filter(|r| r.group.as_deref() == Some(group))
            .collect(),
        None => rankings,
    }
}

/// 1-based position of `ranking_id` in sorted standings
pub fn position_of(sorted: &[TournamentRanking], ranking_id: RankingId) -> Option<usize> {
    sorted
        .iter()
        .position(|r| r.id == ranking_id)
        .map(|index| index + 1)
}

/// Render sorted rankings as standings rows
pub fn standings_rows(sorted: &[TournamentRanking], names: &HashMap<TeamId, String>) -> Vec<StandingsRow> {
    sorted
        .iter()
        .enumerate()
        .map(|(index, r)| StandingsRow {
            position: index + 1,
            ranking_id: r.id,
            team_id: r.team_id,
            team_name: names.get(&r.team_id).cloned().unwrap_or_default(),
            group: r.group.clone(),
            played: r.matches_played,
            win: r.total_wins(),
            draw: r.draw,
            loss: r.total_losses(),
            goals_for: r.goals_for,
            goals_against: r.goals_against,
            goal_difference: r.goal_difference(),
            points: r.points,
            qualified: r.qualified,
            relegated: r.relegated,
        })
        .collect()
}
