//! Tournament manager for creating tournaments, recording results and moving teams between them.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{Instrument, Span};

use super::errors::{TournamentError, TournamentResult};
use super::models::{
    Match, MatchId, MatchScore, Round, RoundState, SeasonId, TeamId, Tournament, TournamentId,
    TournamentStatus, TournamentStructure,
};
use crate::db::{TournamentPlan, TournamentRepository};
use crate::qualification::{
    QualificationEngine, QualificationReport, QualificationRule, QualificationRuleDraft,
    QualificationType, apply_flags, cap_outcomes,
};
use crate::ranking::{
    RankingCalculator, ScoringRule, ScoringRuleDraft, StandingsRow, TournamentRanking,
    filter_group, position_of, sort_standings, standings_rows,
};
use crate::schedule::{KnockoutAdvance, ScheduleGenerator, round_state, validate_entrants};

/// Input for creating or declaring a tournament
#[derive(Debug, Clone)]
pub struct CreateTournamentRequest {
    pub name: String,
    pub description: String,
    pub season_id: SeasonId,
    pub structure: TournamentStructure,
    pub team_ids: Vec<TeamId>,
    /// Group of each team, for tournaments with a group phase
    pub groups: BTreeMap<TeamId, String>,
    pub parent_id: Option<TournamentId>,
    pub scoring_rules: Vec<ScoringRuleDraft>,
    pub qualification_rules: Vec<QualificationRuleDraft>,
}

impl CreateTournamentRequest {
    pub fn new(
        name: impl Into<String>,
        season_id: SeasonId,
        structure: TournamentStructure,
        team_ids: Vec<TeamId>,
    ) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            season_id,
            structure,
            team_ids,
            groups: BTreeMap::new(),
            parent_id: None,
            scoring_rules: Vec::new(),
            qualification_rules: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_group(mut self, team_id: TeamId, group: impl Into<String>) -> Self {
        self.groups.insert(team_id, group.into());
        self
    }

    pub fn with_parent(mut self, parent_id: TournamentId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_scoring_rule(mut self, rule: ScoringRuleDraft) -> Self {
        self.scoring_rules.push(rule);
        self
    }

    pub fn with_qualification_rule(mut self, rule: QualificationRuleDraft) -> Self {
        self.qualification_rules.push(rule);
        self
    }
}

/// Result of advancing a knockout tournament
#[derive(Debug, Clone)]
pub enum AdvanceOutcome {
    /// The stored next round
    NextRound(Round),
    Champion(TeamId),
}

/// Tournament manager
///
/// Clones share the repository, the RNG and the per-tournament write locks.
#[derive(Clone)]
pub struct TournamentManager {
    repo: Arc<dyn TournamentRepository>,
    generator: Arc<Mutex<ScheduleGenerator>>,
    /// Serialises result writes and ranking rewrites within one tournament
    locks: Arc<Mutex<HashMap<TournamentId, Arc<Mutex<()>>>>>,
    calculator: RankingCalculator,
    qualifier: QualificationEngine,
    span: Span,
}

impl TournamentManager {
    /// Create a manager drawing schedules from OS randomness.
    ///
    /// Everything the manager logs is recorded under `span`.
    pub fn new(repo: Arc<dyn TournamentRepository>, span: Span) -> Self {
        let generator = ScheduleGenerator::new(span.clone());
        Self::with_generator(repo, generator, span)
    }

    /// Create a manager whose schedules are reproducible from `seed`
    pub fn with_seed(repo: Arc<dyn TournamentRepository>, seed: u64, span: Span) -> Self {
        let generator = ScheduleGenerator::from_seed(seed, span.clone());
        Self::with_generator(repo, generator, span)
    }

    fn with_generator(repo: Arc<dyn TournamentRepository>, generator: ScheduleGenerator, span: Span) -> Self {
        Self {
            repo,
            generator: Arc::new(Mutex::new(generator)),
            locks: Arc::new(Mutex::new(HashMap::new())),
            calculator: RankingCalculator::new(span.clone()),
            qualifier: QualificationEngine::new(span.clone()),
            span,
        }
    }

    /// Reset the schedule RNG
    pub async fn reseed(&self, seed: u64) {
        self.generator.lock().await.reseed(seed);
    }

    pub fn repository(&self) -> &Arc<dyn TournamentRepository> {
        &self.repo
    }

    /// Create an active tournament with its full initial schedule.
    ///
    /// Round-robin formats get every round, cups their first knockout round.
    /// Rankings are seeded at zero for every team. Nothing is stored unless
    /// every step succeeds.
    ///
    /// # Errors
    ///
    /// Any validation error (see [`TournamentError::is_validation`]) before
    /// anything is written.
    pub async fn create_tournament(
        &self,
        request: CreateTournamentRequest,
    ) -> TournamentResult<Tournament> {
        let span = tracing::info_span!(parent: &self.span, "create_tournament", name = %request.name);
        async move {
            self.validate_request(&request, true).await?;

            let rounds = self
                .generator
                .lock()
                .await
                .generate(&request.structure, &request.team_ids, &request.groups)?;
            let match_count: usize = rounds.iter().map(|r| r.fixtures.len()).sum();
            let round_count = rounds.len();

            let tournament = self
                .repo
                .insert_tournament(plan_from(request, TournamentStatus::Active, rounds))
                .await?;

            tracing::info!(
                tournament_id = tournament.id,
                format = %tournament.format(),
                teams = tournament.team_ids.len(),
                rounds = round_count,
                matches = match_count,
                "tournament created"
            );
            Ok(tournament)
        }
        .instrument(span)
        .await
    }

    /// Declare a pending tournament without a schedule.
    ///
    /// Pending tournaments collect entrants, typically from qualification,
    /// and are started later with [`TournamentManager::start_tournament`].
    pub async fn declare_tournament(
        &self,
        request: CreateTournamentRequest,
    ) -> TournamentResult<Tournament> {
        let span = tracing::info_span!(parent: &self.span, "declare_tournament", name = %request.name);
        async move {
            self.validate_request(&request, false).await?;

            let tournament = self
                .repo
                .insert_tournament(plan_from(request, TournamentStatus::Pending, Vec::new()))
                .await?;

            tracing::info!(
                tournament_id = tournament.id,
                entrants = tournament.team_ids.len(),
                "tournament declared"
            );
            Ok(tournament)
        }
        .instrument(span)
        .await
    }

    /// Generate the schedule of a pending tournament and activate it
    pub async fn start_tournament(&self, tournament_id: TournamentId) -> TournamentResult<Tournament> {
        let span = tracing::info_span!(parent: &self.span, "start_tournament", tournament_id);
        async move {
            let tournament = self.load(tournament_id).await?;
            if !tournament.status.can_transition_to(TournamentStatus::Active) {
                return Err(TournamentError::InvalidTransition {
                    from: tournament.status,
                    to: TournamentStatus::Active,
                });
            }

            let rounds = self
                .generator
                .lock()
                .await
                .generate(&tournament.structure, &tournament.team_ids, &tournament.groups)?;
            let tournament = self.repo.activate_tournament(tournament_id, rounds).await?;

            tracing::info!(teams = tournament.team_ids.len(), "tournament started");
            Ok(tournament)
        }
        .instrument(span)
        .await
    }

    /// Store a result and recompute the rankings of both teams.
    ///
    /// Recording a new score for an already played match replaces the old one,
    /// except in knockout rounds the bracket has already moved past.
    ///
    /// # Errors
    ///
    /// * `TournamentError::MatchNotFound` - Unknown match
    /// * `TournamentError::MatchCancelled` - Match was cancelled
    /// * `TournamentError::NotActive` - Tournament is not running
    /// * `TournamentError::UnresolvedMatch` - Knockout tie without a winner
    /// * `TournamentError::KnockoutLocked` - Later round drawn or champion decided
    pub async fn record_result(&self, match_id: MatchId, score: MatchScore) -> TournamentResult<Match> {
        let span = tracing::info_span!(parent: &self.span, "record_result", match_id);
        async move {
            let tournament_id = self.load_match(match_id).await?.tournament_id;
            let _guard = self.lock_tournament(tournament_id).await;

            let mut m = self.load_match(match_id).await?;
            if m.cancelled {
                return Err(TournamentError::MatchCancelled(match_id));
            }
            let tournament = self.load_active(tournament_id).await?;

            m.score = Some(score);
            m.played = true;
            m.postponed = false;

            let round = self.round_of(&m).await?;
            if round.knockout {
                if self.bracket_moved_on(&tournament, &round).await? {
                    return Err(TournamentError::KnockoutLocked(match_id));
                }
                if m.winner().is_none() {
                    return Err(TournamentError::UnresolvedMatch(match_id));
                }
            }

            self.repo.update_match(&m).await?;
            self.recompute_teams(&tournament, &[m.home_team, m.away_team])
                .await?;
            self.refresh_progress(tournament).await?;

            tracing::info!(
                home = m.home_team,
                away = m.away_team,
                home_goals = score.home,
                away_goals = score.away,
                "result recorded"
            );
            Ok(m)
        }
        .instrument(span)
        .await
    }

    /// Mark an unplayed match as postponed, optionally with a new kickoff
    pub async fn postpone_match(
        &self,
        match_id: MatchId,
        kickoff: Option<DateTime<Utc>>,
    ) -> TournamentResult<Match> {
        let mut m = self.load_match(match_id).await?;
        if m.cancelled {
            return Err(TournamentError::MatchCancelled(match_id));
        }
        if m.played {
            return Err(TournamentError::MatchAlreadyPlayed(match_id));
        }
        self.load_active(m.tournament_id).await?;

        m.postponed = true;
        if kickoff.is_some() {
            m.kickoff = kickoff;
        }
        self.repo.update_match(&m).await?;

        self.span
            .in_scope(|| tracing::info!(match_id, kickoff = ?m.kickoff, "match postponed"));
        Ok(m)
    }

    /// Cancel a match; a cancelled match no longer counts towards standings.
    ///
    /// Knockout ties cannot be cancelled.
    pub async fn cancel_match(&self, match_id: MatchId) -> TournamentResult<Match> {
        let span = tracing::info_span!(parent: &self.span, "cancel_match", match_id);
        async move {
            let tournament_id = self.load_match(match_id).await?.tournament_id;
            let _guard = self.lock_tournament(tournament_id).await;

            let mut m = self.load_match(match_id).await?;
            let tournament = self.load_active(tournament_id).await?;
            if m.cancelled {
                return Ok(m);
            }
            if self.round_of(&m).await?.knockout {
                return Err(TournamentError::KnockoutLocked(match_id));
            }

            m.cancelled = true;
            m.postponed = false;
            self.repo.update_match(&m).await?;
            self.recompute_teams(&tournament, &[m.home_team, m.away_team])
                .await?;
            self.refresh_progress(tournament).await?;

            tracing::info!("match cancelled");
            Ok(m)
        }
        .instrument(span)
        .await
    }

    /// Recompute one team's ranking from scratch.
    ///
    /// Idempotent: calling it again without new results changes nothing.
    pub async fn recompute_ranking(
        &self,
        tournament_id: TournamentId,
        team_id: TeamId,
    ) -> TournamentResult<TournamentRanking> {
        let _guard = self.lock_tournament(tournament_id).await;
        let tournament = self.load(tournament_id).await?;
        self.recompute_team(&tournament, team_id).await
    }

    /// Deduct `penalty` points from a team and rescore its ranking
    pub async fn set_points_penalty(
        &self,
        tournament_id: TournamentId,
        team_id: TeamId,
        penalty: i32,
    ) -> TournamentResult<TournamentRanking> {
        let _guard = self.lock_tournament(tournament_id).await;
        let tournament = self.load(tournament_id).await?;
        let mut ranking = self
            .repo
            .rankings(tournament_id)
            .await?
            .into_iter()
            .find(|r| r.team_id == team_id)
            .ok_or(TournamentError::TeamNotFound(team_id))?;

        ranking.points_penalty = penalty;
        self.repo.update_rankings(std::slice::from_ref(&ranking)).await?;

        self.span
            .in_scope(|| tracing::info!(tournament_id, team_id, penalty, "points penalty set"));
        self.recompute_team(&tournament, team_id).await
    }

    /// Draw the next knockout round, or crown the champion after the final.
    ///
    /// # Errors
    ///
    /// * `TournamentError::NotKnockout` - Tournament is not a cup
    /// * `TournamentError::RoundNotResolved` - Latest round still has open matches
    pub async fn advance_round(&self, tournament_id: TournamentId) -> TournamentResult<AdvanceOutcome> {
        let span = tracing::info_span!(parent: &self.span, "advance_round", tournament_id);
        async move {
            let _guard = self.lock_tournament(tournament_id).await;
            let mut tournament = self.load_active(tournament_id).await?;
            if !tournament.structure.is_cup() {
                return Err(TournamentError::NotKnockout(tournament_id));
            }
            if let Some(champion) = tournament.winner {
                return Ok(AdvanceOutcome::Champion(champion));
            }

            let rounds = self.repo.rounds(tournament_id).await?;
            let latest = rounds
                .last()
                .ok_or(TournamentError::NotKnockout(tournament_id))?;
            let matches = self.repo.matches(tournament_id).await?;

            let advance = self.generator.lock().await.advance_round(latest, &matches)?;
            match advance {
                KnockoutAdvance::NextRound(draft) => {
                    let round = self.repo.append_round(tournament_id, draft).await?;
                    tournament.current_match_day = round.number;
                    self.repo.update_tournament(&tournament).await?;

                    tracing::info!(
                        round = round.number,
                        label = round.label.as_deref().unwrap_or_default(),
                        matches = round.match_ids.len(),
                        byes = round.byes.len(),
                        "knockout round added"
                    );
                    Ok(AdvanceOutcome::NextRound(round))
                }
                KnockoutAdvance::Champion(champion) => {
                    tournament.winner = Some(champion);
                    self.repo.update_tournament(&tournament).await?;
                    Ok(AdvanceOutcome::Champion(champion))
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Close a tournament once every match is settled.
    ///
    /// Knockout tournaments must also have a champion.
    pub async fn complete_tournament(&self, tournament_id: TournamentId) -> TournamentResult<Tournament> {
        let mut tournament = self.load(tournament_id).await?;
        self.check_transition(&tournament, TournamentStatus::Completed)?;

        let open = self
            .repo
            .matches(tournament_id)
            .await?
            .iter()
            .filter(|m| !m.is_settled())
            .count();
        if open > 0 {
            return Err(TournamentError::TournamentIncomplete {
                id: tournament_id,
                reason: format!("{open} match(es) without a result"),
            });
        }
        if tournament.structure.is_cup() && tournament.winner.is_none() {
            return Err(TournamentError::TournamentIncomplete {
                id: tournament_id,
                reason: "knockout champion not decided".to_string(),
            });
        }

        tournament.status = TournamentStatus::Completed;
        self.repo.update_tournament(&tournament).await?;
        self.span
            .in_scope(|| tracing::info!(tournament_id, winner = ?tournament.winner, "tournament completed"));
        Ok(tournament)
    }

    /// Abandon a pending or active tournament
    pub async fn cancel_tournament(&self, tournament_id: TournamentId) -> TournamentResult<Tournament> {
        let mut tournament = self.load(tournament_id).await?;
        self.check_transition(&tournament, TournamentStatus::Cancelled)?;

        tournament.status = TournamentStatus::Cancelled;
        self.repo.update_tournament(&tournament).await?;
        self.span
            .in_scope(|| tracing::warn!(tournament_id, "tournament cancelled"));
        Ok(tournament)
    }

    /// Apply the qualification rules of a completed tournament.
    ///
    /// Selected rankings are flagged, selected teams join pending destination
    /// tournaments, and a pending playoff destination is started right away
    /// when the structure has a playoff stage. Without rules this logs a
    /// warning and returns an empty report.
    pub async fn apply_qualification(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<QualificationReport> {
        let span = tracing::info_span!(parent: &self.span, "apply_qualification", tournament_id);
        async move {
            let origin = self.load(tournament_id).await?;
            if origin.status != TournamentStatus::Completed {
                return Err(TournamentError::TournamentIncomplete {
                    id: tournament_id,
                    reason: format!("qualification needs a completed tournament, status is {}", origin.status),
                });
            }

            let rules = self.repo.qualification_rules(tournament_id).await?;
            if !rules.iter().any(|r| r.is_active) {
                tracing::warn!("no qualification rules found");
                return Ok(QualificationReport::empty(tournament_id));
            }

            let mut sorted = self.repo.rankings(tournament_id).await?;
            let names = self.team_names(&origin.team_ids).await?;
            sort_standings(&mut sorted, &origin.structure.tie_breakers, &names);

            let mut outcomes = self.qualifier.select(&sorted, &rules);
            cap_outcomes(&mut outcomes, &origin.structure);
            apply_flags(&mut sorted, &outcomes);
            self.repo.update_rankings(&sorted).await?;

            for outcome in outcomes.iter().filter(|o| !o.team_ids.is_empty()) {
                let Some(destination) = self.repo.find_tournament(outcome.to_tournament).await? else {
                    tracing::warn!(to_tournament = outcome.to_tournament, "destination tournament missing");
                    continue;
                };
                if destination.status != TournamentStatus::Pending {
                    tracing::warn!(
                        to_tournament = destination.id,
                        status = %destination.status,
                        "destination already started, teams not added"
                    );
                    continue;
                }
                let added = self
                    .repo
                    .add_entrants(destination.id, &outcome.team_ids)
                    .await?;
                tracing::info!(
                    to_tournament = destination.id,
                    kind = %outcome.qualification_type,
                    added = added.len(),
                    "teams qualified"
                );
            }

            let mut report = QualificationReport {
                tournament_id,
                outcomes,
                playoff: None,
            };
            if origin.structure.has_playoff {
                report.playoff = self.start_playoff(&origin, &rules).await?;
            }
            Ok(report)
        }
        .instrument(span)
        .await
    }

    async fn start_playoff(
        &self,
        origin: &Tournament,
        rules: &[QualificationRule],
    ) -> TournamentResult<Option<TournamentId>> {
        let Some(rule) = rules
            .iter()
            .find(|r| r.is_active && r.qualification_type == QualificationType::Playoff)
        else {
            tracing::warn!("structure has a playoff stage but no playoff rule");
            return Ok(None);
        };

        let mut playoff = self.load(rule.to_tournament).await?;
        if playoff.status != TournamentStatus::Pending {
            tracing::warn!(playoff_id = playoff.id, status = %playoff.status, "playoff already started");
            return Ok(None);
        }
        if playoff.team_ids.len() < 2 {
            tracing::warn!(
                playoff_id = playoff.id,
                teams = playoff.team_ids.len(),
                "not enough qualified teams for a playoff"
            );
            return Ok(None);
        }
        if playoff.parent_id.is_none() {
            playoff.parent_id = Some(origin.id);
            self.repo.update_tournament(&playoff).await?;
        }

        let started = self.start_tournament(playoff.id).await?;
        Ok(Some(started.id))
    }

    /// Ordered standings, optionally restricted to one group
    pub async fn standings(
        &self,
        tournament_id: TournamentId,
        group: Option<&str>,
    ) -> TournamentResult<Vec<StandingsRow>> {
        let tournament = self.load(tournament_id).await?;
        let names = self.team_names(&tournament.team_ids).await?;

        let mut rankings = filter_group(self.repo.rankings(tournament_id).await?, group);
        sort_standings(&mut rankings, &tournament.structure.tie_breakers, &names);
        Ok(standings_rows(&rankings, &names))
    }

    /// 1-based position of a team within its group (or the whole table)
    pub async fn ranking_position(
        &self,
        tournament_id: TournamentId,
        team_id: TeamId,
    ) -> TournamentResult<Option<usize>> {
        let tournament = self.load(tournament_id).await?;
        let rankings = self.repo.rankings(tournament_id).await?;
        let Some(own) = rankings.iter().find(|r| r.team_id == team_id) else {
            return Ok(None);
        };
        let (ranking_id, group) = (own.id, own.group.clone());

        let names = self.team_names(&tournament.team_ids).await?;
        let mut peers = filter_group(rankings, group.as_deref());
        sort_standings(&mut peers, &tournament.structure.tie_breakers, &names);
        Ok(position_of(&peers, ranking_id))
    }

    /// Add a scoring rule and rescore every ranking of the tournament
    pub async fn add_scoring_rule(
        &self,
        tournament_id: TournamentId,
        draft: ScoringRuleDraft,
    ) -> TournamentResult<ScoringRule> {
        let _guard = self.lock_tournament(tournament_id).await;
        let tournament = self.load(tournament_id).await?;
        let rule = self.repo.insert_scoring_rule(tournament_id, draft).await?;
        self.recompute_teams(&tournament, &tournament.team_ids).await?;

        self.span.in_scope(|| {
            tracing::info!(tournament_id, rule_type = %rule.rule_type, value = rule.value, "scoring rule added")
        });
        Ok(rule)
    }

    /// Add a qualification rule originating from `from_tournament`
    pub async fn add_qualification_rule(
        &self,
        from_tournament: TournamentId,
        draft: QualificationRuleDraft,
    ) -> TournamentResult<QualificationRule> {
        draft.validate(Some(from_tournament))?;
        self.load(from_tournament).await?;
        self.repo.insert_qualification_rule(from_tournament, draft).await
    }

    pub async fn tournament(&self, tournament_id: TournamentId) -> TournamentResult<Tournament> {
        self.load(tournament_id).await
    }

    pub async fn rounds(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Round>> {
        self.repo.rounds(tournament_id).await
    }

    pub async fn matches(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Match>> {
        self.repo.matches(tournament_id).await
    }

    async fn validate_request(
        &self,
        request: &CreateTournamentRequest,
        needs_schedule: bool,
    ) -> TournamentResult<()> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(TournamentError::InvalidName);
        }
        validate_structure(&request.structure)?;
        if needs_schedule {
            validate_entrants(&request.team_ids)?;
        } else if let Some(dup) = first_duplicate(&request.team_ids) {
            return Err(TournamentError::DuplicateTeam(dup));
        }

        if self.repo.find_season(request.season_id).await?.is_none() {
            return Err(TournamentError::SeasonNotFound(request.season_id));
        }
        let known = self.repo.find_teams(&request.team_ids).await?;
        if let Some(missing) = request
            .team_ids
            .iter()
            .find(|id| !known.iter().any(|t| t.id == **id))
        {
            return Err(TournamentError::TeamNotFound(*missing));
        }
        if self
            .repo
            .tournament_name_taken(request.season_id, name)
            .await?
        {
            return Err(TournamentError::DuplicateName {
                season_id: request.season_id,
                name: name.to_string(),
            });
        }

        for rule in &request.qualification_rules {
            rule.validate(None)?;
        }
        let declares = |kind: QualificationType| {
            request
                .qualification_rules
                .iter()
                .any(|r| r.is_active && r.qualification_type == kind)
        };
        if request.structure.has_playoff && !declares(QualificationType::Playoff) {
            return Err(TournamentError::MissingQualificationRule(QualificationType::Playoff));
        }
        if request.structure.has_playout && !declares(QualificationType::Playout) {
            return Err(TournamentError::MissingQualificationRule(QualificationType::Playout));
        }
        let slots = [
            (request.structure.promotion_teams, QualificationType::Promotion),
            (request.structure.relegation_teams, QualificationType::Relegation),
            (request.structure.qualification_spots, QualificationType::Qualification),
        ];
        for (teams, kind) in slots {
            if teams > 0 && !declares(kind) {
                return Err(TournamentError::MissingQualificationRule(kind));
            }
        }

        Ok(())
    }

    async fn load(&self, tournament_id: TournamentId) -> TournamentResult<Tournament> {
        self.repo
            .find_tournament(tournament_id)
            .await?
            .ok_or(TournamentError::NotFound(tournament_id))
    }

    async fn load_active(&self, tournament_id: TournamentId) -> TournamentResult<Tournament> {
        let tournament = self.load(tournament_id).await?;
        if tournament.status != TournamentStatus::Active {
            return Err(TournamentError::NotActive {
                id: tournament_id,
                status: tournament.status,
            });
        }
        Ok(tournament)
    }

    async fn load_match(&self, match_id: MatchId) -> TournamentResult<Match> {
        self.repo
            .find_match(match_id)
            .await?
            .ok_or(TournamentError::MatchNotFound(match_id))
    }

    async fn round_of(&self, m: &Match) -> TournamentResult<Round> {
        self.repo
            .rounds(m.tournament_id)
            .await?
            .into_iter()
            .find(|r| r.id == m.round_id)
            .ok_or(TournamentError::RoundNotFound(m.round_id))
    }

    /// Exclusive access to one tournament's results and rankings
    async fn lock_tournament(&self, tournament_id: TournamentId) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .lock()
            .await
            .entry(tournament_id)
            .or_default()
            .clone();
        lock.lock_owned().await
    }

    /// Whether a knockout round is already behind a later round or a champion
    async fn bracket_moved_on(&self, tournament: &Tournament, round: &Round) -> TournamentResult<bool> {
        if tournament.winner.is_some() {
            return Ok(true);
        }
        let rounds = self.repo.rounds(tournament.id).await?;
        Ok(rounds.last().is_some_and(|latest| latest.number > round.number))
    }

    fn check_transition(&self, tournament: &Tournament, to: TournamentStatus) -> TournamentResult<()> {
        if tournament.status.can_transition_to(to) {
            Ok(())
        } else {
            Err(TournamentError::InvalidTransition {
                from: tournament.status,
                to,
            })
        }
    }

    async fn team_names(&self, team_ids: &[TeamId]) -> TournamentResult<HashMap<TeamId, String>> {
        Ok(self
            .repo
            .find_teams(team_ids)
            .await?
            .into_iter()
            .map(|t| (t.id, t.name))
            .collect())
    }

    async fn recompute_team(
        &self,
        tournament: &Tournament,
        team_id: TeamId,
    ) -> TournamentResult<TournamentRanking> {
        self.recompute_teams(tournament, &[team_id])
            .await?
            .into_iter()
            .next()
            .ok_or(TournamentError::TeamNotFound(team_id))
    }

    /// Rewrite the rankings of `team_ids` from the tournament's matches.
    ///
    /// Callers hold the tournament lock.
    async fn recompute_teams(
        &self,
        tournament: &Tournament,
        team_ids: &[TeamId],
    ) -> TournamentResult<Vec<TournamentRanking>> {
        let matches = self.repo.matches(tournament.id).await?;
        let rules = self.repo.scoring_rules(tournament.id).await?;

        let mut updated: Vec<TournamentRanking> = self
            .repo
            .rankings(tournament.id)
            .await?
            .into_iter()
            .filter(|r| team_ids.contains(&r.team_id))
            .collect();
        for ranking in &mut updated {
            self.calculator
                .recompute(ranking, &matches, &tournament.structure, &rules);
        }

        self.repo.update_rankings(&updated).await?;
        Ok(updated)
    }

    /// Bring round states and the current match day in line with the results
    async fn refresh_progress(&self, mut tournament: Tournament) -> TournamentResult<()> {
        let matches = self.repo.matches(tournament.id).await?;
        let rounds = self.repo.rounds(tournament.id).await?;

        let mut current = None;
        for mut round in rounds.iter().cloned() {
            let state = round_state(matches.iter().filter(|m| m.round_id == round.id));
            if state != round.state {
                round.state = state;
                self.repo.update_round(&round).await?;
            }
            if state != RoundState::Resolved && current.is_none() {
                current = Some(round.number);
            }
        }

        let match_day = current
            .or_else(|| rounds.last().map(|r| r.number))
            .unwrap_or(1);
        if match_day != tournament.current_match_day {
            tournament.current_match_day = match_day;
            self.repo.update_tournament(&tournament).await?;
        }
        Ok(())
    }
}

fn first_duplicate(team_ids: &[TeamId]) -> Option<TeamId> {
    team_ids
        .iter()
        .enumerate()
        .find(|(i, id)| team_ids[..*i].contains(id))
        .map(|(_, id)| *id)
}

fn validate_structure(structure: &TournamentStructure) -> TournamentResult<()> {
    if !matches!(structure.legs, 1 | 2) {
        return Err(TournamentError::InvalidStructure(format!(
            "legs must be 1 or 2, got {}",
            structure.legs
        )));
    }
    if structure.has_playoff && structure.playoff_teams < 2 {
        return Err(TournamentError::InvalidStructure(
            "a playoff needs at least 2 teams".to_string(),
        ));
    }
    if structure.has_playout && structure.playout_teams < 2 {
        return Err(TournamentError::InvalidStructure(
            "a playout needs at least 2 teams".to_string(),
        ));
    }
    Ok(())
}

fn plan_from(
    request: CreateTournamentRequest,
    status: TournamentStatus,
    rounds: Vec<crate::schedule::RoundDraft>,
) -> TournamentPlan {
    TournamentPlan {
        name: request.name.trim().to_string(),
        description: request.description,
        season_id: request.season_id,
        structure: request.structure,
        team_ids: request.team_ids,
        status,
        parent_id: request.parent_id,
        rounds,
        groups: request.groups,
        scoring_rules: request.scoring_rules,
        qualification_rules: request.qualification_rules,
    }
}
