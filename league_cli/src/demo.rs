//! Demo tournament: build, play out with random scores, render standings.

use std::fmt::Write as _;
use std::sync::Arc;

use chrono::Datelike;
use league_engine::ranking::{ScoringRuleDraft, StandingsRow};
use league_engine::tournament::{
    AdvanceOutcome, CreateTournamentRequest, MatchScore, TeamId, Tournament, TournamentManager,
    TournamentResult,
};
use league_engine::{InMemoryRepository, TournamentRepository};
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::Serialize;
use tracing::Span;

use crate::config::CliConfig;

const FALLBACK_YEAR: u16 = 2025;

/// A demo tournament and the manager that owns it
pub struct Demo {
    pub manager: TournamentManager,
    pub tournament: Tournament,
}

/// Machine-readable summary printed with `--json`
#[derive(Debug, Serialize)]
pub struct Summary {
    pub tournament: String,
    pub format: String,
    pub status: String,
    pub champion: Option<String>,
    pub standings: Vec<StandingsRow>,
}

impl Summary {
    pub fn new(tournament: Tournament, champion: Option<String>, standings: Vec<StandingsRow>) -> Self {
        Self {
            format: tournament.structure.format.to_string(),
            status: tournament.status.to_string(),
            tournament: tournament.name,
            champion,
            standings,
        }
    }
}

/// Create a season, `config.teams` teams and one tournament in a fresh in-memory repository.
pub async fn build(config: &CliConfig, rules: Vec<ScoringRuleDraft>, span: Span) -> TournamentResult<Demo> {
    let repo = Arc::new(InMemoryRepository::new());
    let year = u16::try_from(chrono::Utc::now().year()).unwrap_or(FALLBACK_YEAR);
    let season = repo.create_season("Demo League", year).await?;

    let mut team_ids = Vec::with_capacity(config.teams);
    for i in 1..=config.teams {
        let team = repo
            .create_team(&format!("Team {i:02}"), &format!("T{i:02}"))
            .await?;
        team_ids.push(team.id);
    }

    let manager = match config.seed {
        Some(seed) => TournamentManager::with_seed(repo, seed, span),
        None => TournamentManager::new(repo, span),
    };

    let name = format!("Demo {} {year}", config.format);
    let request = rules.into_iter().fold(
        CreateTournamentRequest::new(name, season.id, config.structure(), team_ids),
        CreateTournamentRequest::with_scoring_rule,
    );
    let tournament = manager.create_tournament(request).await?;

    Ok(Demo {
        manager,
        tournament,
    })
}

/// Random scorelines for simulated matches
pub struct Simulator {
    rng: StdRng,
}

impl Simulator {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self { rng }
    }

    /// A scoreline, going to extra time and penalties when draws are not allowed
    pub fn score(&mut self, allow_draws: bool) -> MatchScore {
        let home = self.rng.random_range(0..=4);
        let away = self.rng.random_range(0..=4);
        let mut score = MatchScore::regular(home, away);
        if allow_draws || home != away {
            return score;
        }

        let extra = (self.rng.random_range(0..=1), self.rng.random_range(0..=1));
        score = score.with_extra_time(extra.0, extra.1);
        if extra.0 != extra.1 {
            return score;
        }

        let scored = self.rng.random_range(3..=5);
        let missed_one = if self.rng.random_bool(0.5) { scored - 1 } else { scored + 1 };
        score.with_penalties(scored, missed_one)
    }

    /// Record a result for every open match, advancing knockout rounds as they
    /// resolve. Returns the champion of a cup.
    pub async fn play(&mut self, demo: &Demo) -> TournamentResult<Option<TeamId>> {
        let manager = &demo.manager;
        let id = demo.tournament.id;
        let allow_draws = demo.tournament.structure.allow_draws;

        if !demo.tournament.structure.is_cup() {
            for m in manager.matches(id).await? {
                if !m.played && !m.cancelled {
                    manager.record_result(m.id, self.score(allow_draws)).await?;
                }
            }
            return Ok(None);
        }

        loop {
            let rounds = manager.rounds(id).await?;
            let match_ids = rounds.last().map(|r| r.match_ids.clone()).unwrap_or_default();
            for match_id in match_ids {
                manager.record_result(match_id, self.score(false)).await?;
            }

            match manager.advance_round(id).await? {
                AdvanceOutcome::NextRound(round) => {
                    tracing::debug!(round = round.number, label = ?round.label, "next round drawn");
                }
                AdvanceOutcome::Champion(team_id) => return Ok(Some(team_id)),
            }
        }
    }
}

/// Render standings as a fixed-width text table
pub fn render_table(rows: &[StandingsRow]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>3}  {:<20} {:>3} {:>3} {:>3} {:>3} {:>4} {:>4} {:>4} {:>4}",
        "Pos", "Team", "P", "W", "D", "L", "GF", "GA", "GD", "Pts"
    );
    for row in rows {
        let mark = if row.qualified {
            "*"
        } else if row.relegated {
            "v"
        } else {
            ""
        };
        let _ = writeln!(
            out,
            "{:>3}  {:<20} {:>3} {:>3} {:>3} {:>3} {:>4} {:>4} {:>+4} {:>4} {}",
            row.position,
            row.team_name,
            row.played,
            row.win,
            row.draw,
            row.loss,
            row.goals_for,
            row.goals_against,
            row.goal_difference,
            row.points,
            mark
        );
    }
    out
}
