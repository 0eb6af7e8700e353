//! Fixture generation for round-robin and knockout formats.

use std::collections::{BTreeMap, HashSet};

use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use serde::{Deserialize, Serialize};
use tracing::Span;

use crate::tournament::{
    Match, Round, RoundState, TeamId, TournamentError, TournamentResult, TournamentStructure,
};

/// Minimum number of teams for any tournament
pub const MIN_TEAMS: usize = 2;

/// A round that has not been persisted yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundDraft {
    /// 1-based round number
    pub number: u32,
    pub label: Option<String>,
    pub knockout: bool,
    /// (home, away) pairs
    pub fixtures: Vec<(TeamId, TeamId)>,
    /// Teams advancing without playing
    pub byes: Vec<TeamId>,
}

impl RoundDraft {
    /// Number of teams that take part in this round, playing or not
    pub fn team_count(&self) -> usize {
        self.fixtures.len() * 2 + self.byes.len()
    }
}

/// What follows a resolved knockout round
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KnockoutAdvance {
    NextRound(RoundDraft),
    /// Only one team left standing
    Champion(TeamId),
}

/// Knockout round label for a stage contested by `teams` teams.
pub fn round_label(teams: usize) -> String {
    match teams {
        2 => "Final".to_string(),
        4 => "Semifinal".to_string(),
        8 => "Quarterfinal".to_string(),
        n => format!("Round of {n}"),
    }
}

/// Largest power of two not greater than `n` (`n` must be non-zero)
fn power_of_two_floor(n: usize) -> usize {
    1 << n.ilog2()
}

/// Check the entrant list before any schedule is built.
///
/// # Errors
///
/// * `TournamentError::InsufficientTeams` - Fewer than two teams
/// * `TournamentError::DuplicateTeam` - A team appears twice
pub fn validate_entrants(teams: &[TeamId]) -> TournamentResult<()> {
    if teams.len() < MIN_TEAMS {
        return Err(TournamentError::InsufficientTeams {
            needed: MIN_TEAMS,
            current: teams.len(),
        });
    }

    let mut seen = HashSet::with_capacity(teams.len());
    if let Some(dup) = teams.iter().find(|team| !seen.insert(**team)) {
        return Err(TournamentError::DuplicateTeam(*dup));
    }

    Ok(())
}

/// Pair an ordered entrant list into a knockout round.
///
/// When the count is not a power of two, only enough teams play to bring the
/// next round down to one; the rest advance with a bye.
fn bracket(number: u32, entrants: &[TeamId]) -> RoundDraft {
    let n = entrants.len();
    let power = power_of_two_floor(n);
    let playing = if n == power { n } else { 2 * (n - power) };

    let fixtures = entrants[..playing]
        .chunks_exact(2)
        .map(|pair| (pair[0], pair[1]))
        .collect();

    RoundDraft {
        number,
        label: Some(round_label(n)),
        knockout: true,
        fixtures,
        byes: entrants[playing..].to_vec(),
    }
}

/// State of a round given its matches
pub fn round_state<'a>(matches: impl IntoIterator<Item = &'a Match>) -> RoundState {
    let (mut settled, mut total) = (0usize, 0usize);
    for m in matches {
        total += 1;
        if m.is_settled() {
            settled += 1;
        }
    }

    match settled {
        0 if total > 0 => RoundState::Scheduled,
        s if s == total => RoundState::Resolved,
        _ => RoundState::AwaitingResults,
    }
}

/// Builds round and fixture plans from a team list.
///
/// All shuffling goes through one seedable RNG, so a generator created with
/// [`ScheduleGenerator::from_seed`] always yields the same schedule for the same input.
#[derive(Debug)]
pub struct ScheduleGenerator {
    rng: StdRng,
    span: Span,
}

impl ScheduleGenerator {
    /// Generator seeded from the operating system
    pub fn new(span: Span) -> Self {
        Self {
            rng: StdRng::from_os_rng(),
            span,
        }
    }

    /// Deterministic generator
    pub fn from_seed(seed: u64, span: Span) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            span,
        }
    }

    /// Reset the RNG to a known seed
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Full initial plan for a structure: every round for round-robin formats,
    /// the first round only for cups.
    ///
    /// When `groups` assigns teams to groups, round-robin formats only pair
    /// teams of the same group.
    pub fn generate(
        &mut self,
        structure: &TournamentStructure,
        teams: &[TeamId],
        groups: &BTreeMap<TeamId, String>,
    ) -> TournamentResult<Vec<RoundDraft>> {
        if structure.is_cup() {
            Ok(vec![self.knockout_first_round(teams)?])
        } else if groups.is_empty() {
            self.round_robin(teams, structure.legs)
        } else {
            self.grouped_round_robin(teams, groups, structure.legs)
        }
    }

    /// Round-robin inside each group, with round `k` of every group merged into
    /// one match day.
    ///
    /// # Errors
    ///
    /// * `TournamentError::InvalidStructure` - A team has no group, or a group has a single team
    /// * Everything [`ScheduleGenerator::round_robin`] rejects
    pub fn grouped_round_robin(
        &mut self,
        teams: &[TeamId],
        groups: &BTreeMap<TeamId, String>,
        legs: u8,
    ) -> TournamentResult<Vec<RoundDraft>> {
        validate_entrants(teams)?;

        let mut members: BTreeMap<&str, Vec<TeamId>> = BTreeMap::new();
        for team in teams {
            let group = groups.get(team).ok_or_else(|| {
                TournamentError::InvalidStructure(format!("team {team} is not assigned to a group"))
            })?;
            members.entry(group.as_str()).or_default().push(*team);
        }

        let mut rounds: Vec<RoundDraft> = Vec::new();
        for (group, group_teams) in &members {
            if group_teams.len() < MIN_TEAMS {
                return Err(TournamentError::InvalidStructure(format!(
                    "group {group} needs at least {MIN_TEAMS} teams"
                )));
            }
            for (index, round) in self.round_robin(group_teams, legs)?.into_iter().enumerate() {
                match rounds.get_mut(index) {
                    Some(merged) => merged.fixtures.extend(round.fixtures),
                    None => rounds.push(round),
                }
            }
        }

        self.span.in_scope(|| {
            tracing::debug!(
                teams = teams.len(),
                groups = members.len(),
                rounds = rounds.len(),
                "group schedule generated"
            )
        });

        Ok(rounds)
    }

    /// Round-robin schedule.
    ///
    /// Every pair meets once per leg. Fixtures are shuffled and then cut into
    /// rounds of `n / 2` matches, so a team may appear twice in one round.
    ///
    /// # Errors
    ///
    /// * `TournamentError::InvalidStructure` - `legs` is not 1 or 2
    /// * `TournamentError::InsufficientTeams` / `DuplicateTeam` - Bad entrant list
    pub fn round_robin(&mut self, teams: &[TeamId], legs: u8) -> TournamentResult<Vec<RoundDraft>> {
        if !matches!(legs, 1 | 2) {
            return Err(TournamentError::InvalidStructure(format!(
                "legs must be 1 or 2, got {legs}"
            )));
        }
        validate_entrants(teams)?;

        let n = teams.len();
        let mut fixtures = Vec::with_capacity(n * (n - 1) / 2 * usize::from(legs));
        for (i, home) in teams.iter().enumerate() {
            for away in &teams[i + 1..] {
                fixtures.push((*home, *away));
            }
        }
        if legs == 2 {
            let reversed: Vec<_> = fixtures.iter().map(|(home, away)| (*away, *home)).collect();
            fixtures.extend(reversed);
        }

        fixtures.shuffle(&mut self.rng);

        let rounds: Vec<RoundDraft> = fixtures
            .chunks(n / 2)
            .zip(1u32..)
            .map(|(chunk, number)| RoundDraft {
                number,
                label: None,
                knockout: false,
                fixtures: chunk.to_vec(),
                byes: Vec::new(),
            })
            .collect();

        self.span.in_scope(|| {
            tracing::debug!(
                teams = n,
                legs,
                matches = fixtures.len(),
                rounds = rounds.len(),
                "round-robin schedule generated"
            )
        });

        Ok(rounds)
    }

    /// First knockout round from a shuffled entrant list.
    pub fn knockout_first_round(&mut self, teams: &[TeamId]) -> TournamentResult<RoundDraft> {
        validate_entrants(teams)?;

        let mut seeded = teams.to_vec();
        seeded.shuffle(&mut self.rng);
        let round = bracket(1, &seeded);

        self.span.in_scope(|| {
            tracing::debug!(
                teams = teams.len(),
                matches = round.fixtures.len(),
                byes = round.byes.len(),
                label = round.label.as_deref().unwrap_or_default(),
                "knockout first round generated"
            )
        });

        Ok(round)
    }

    /// Next knockout step after `round` is resolved.
    ///
    /// Bye teams enter the next round first, followed by the winners in match
    /// order. `matches` must contain every match of `round`.
    ///
    /// # Errors
    ///
    /// * `TournamentError::NotKnockout` - Round is a league match day
    /// * `TournamentError::RoundNotResolved` - Results still outstanding
    /// * `TournamentError::MatchCancelled` - A tie was cancelled and has no winner
    /// * `TournamentError::UnresolvedMatch` - A tie ended level with no decider
    pub fn advance_round(&self, round: &Round, matches: &[Match]) -> TournamentResult<KnockoutAdvance> {
        if !round.knockout {
            return Err(TournamentError::NotKnockout(round.tournament_id));
        }

        let mut winners = Vec::with_capacity(round.match_ids.len());
        let mut pending = 0;
        for match_id in &round.match_ids {
            let m = matches
                .iter()
                .find(|m| m.id == *match_id)
                .ok_or(TournamentError::MatchNotFound(*match_id))?;
            if !m.is_settled() {
                pending += 1;
                continue;
            }
            if m.cancelled {
                return Err(TournamentError::MatchCancelled(m.id));
            }
            winners.push(m.winner().ok_or(TournamentError::UnresolvedMatch(m.id))?);
        }
        if pending > 0 {
            return Err(TournamentError::RoundNotResolved {
                round: round.number,
                pending,
            });
        }

        let mut entrants = round.byes.clone();
        entrants.extend(winners);

        let advance = match entrants.as_slice() {
            [champion] => KnockoutAdvance::Champion(*champion),
            _ => KnockoutAdvance::NextRound(bracket(round.number + 1, &entrants)),
        };

        self.span.in_scope(|| match &advance {
            KnockoutAdvance::Champion(team_id) => {
                tracing::info!(tournament_id = round.tournament_id, team_id, "knockout champion decided")
            }
            KnockoutAdvance::NextRound(next) => tracing::debug!(
                tournament_id = round.tournament_id,
                round = next.number,
                matches = next.fixtures.len(),
                "next knockout round drawn"
            ),
        });

        Ok(advance)
    }
}
