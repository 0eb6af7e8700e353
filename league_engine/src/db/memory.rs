//! In-memory repository backed by id-indexed arenas.
//!
//! Every entity lives in a `Vec` and its id is its index plus one. All writes
//! take the single arena write lock, and multi-entity writes validate
//! everything before mutating, so a failed call leaves no trace.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::repository::{TournamentPlan, TournamentRepository};
use crate::qualification::{QualificationRule, QualificationRuleDraft, QualificationType};
use crate::ranking::{ScoringRule, ScoringRuleDraft, TournamentRanking};
use crate::schedule::RoundDraft;
use crate::tournament::{
    Match, MatchId, Round, RoundState, Season, SeasonId, Team, TeamId, Tournament, TournamentError,
    TournamentId, TournamentResult, TournamentStatus,
};

fn next_id(len: usize) -> i64 {
    i64::try_from(len).map_or(i64::MAX, |n| n + 1)
}

fn slot(id: i64) -> Option<usize> {
    usize::try_from(id.checked_sub(1)?).ok()
}

#[derive(Debug, Default)]
struct Arena {
    seasons: Vec<Season>,
    teams: Vec<Team>,
    tournaments: Vec<Tournament>,
    rounds: Vec<Round>,
    matches: Vec<Match>,
    rankings: Vec<TournamentRanking>,
    scoring_rules: Vec<ScoringRule>,
    qualification_rules: Vec<QualificationRule>,
}

impl Arena {
    fn tournament(&self, id: TournamentId) -> TournamentResult<&Tournament> {
        slot(id)
            .and_then(|i| self.tournaments.get(i))
            .ok_or(TournamentError::NotFound(id))
    }

    fn tournament_mut(&mut self, id: TournamentId) -> TournamentResult<&mut Tournament> {
        slot(id)
            .and_then(|i| self.tournaments.get_mut(i))
            .ok_or(TournamentError::NotFound(id))
    }

    fn has_team(&self, id: TeamId) -> bool {
        slot(id).is_some_and(|i| i < self.teams.len())
    }

    fn name_taken(&self, season_id: SeasonId, name: &str) -> bool {
        self.tournaments
            .iter()
            .any(|t| t.season_id == season_id && t.name == name)
    }

    fn check_teams(&self, team_ids: &[TeamId]) -> TournamentResult<()> {
        match team_ids.iter().find(|id| !self.has_team(**id)) {
            Some(missing) => Err(TournamentError::TeamNotFound(*missing)),
            None => Ok(()),
        }
    }

    fn season(&self, id: SeasonId) -> TournamentResult<&Season> {
        slot(id)
            .and_then(|i| self.seasons.get(i))
            .ok_or(TournamentError::SeasonNotFound(id))
    }

    /// Destinations must exist, sit in the season the rule's offset points at,
    /// and be knockout tournaments for playoff rules
    fn check_destinations(
        &self,
        origin_season: SeasonId,
        drafts: &[QualificationRuleDraft],
    ) -> TournamentResult<()> {
        let origin_year = i32::from(self.season(origin_season)?.year);
        for draft in drafts {
            let Ok(destination) = self.tournament(draft.to_tournament) else {
                return Err(TournamentError::InvalidQualificationRule(format!(
                    "destination tournament {} does not exist",
                    draft.to_tournament
                )));
            };

            let expected = origin_year.saturating_add(draft.season_offset);
            let year = i32::from(self.season(destination.season_id)?.year);
            if year != expected {
                return Err(TournamentError::InvalidQualificationRule(format!(
                    "destination tournament {} is in {year}, rule expects {expected}",
                    destination.id
                )));
            }

            if draft.qualification_type == QualificationType::Playoff
                && !destination.structure.is_cup()
            {
                return Err(TournamentError::InvalidQualificationRule(format!(
                    "playoff destination {} must be a knockout tournament",
                    destination.id
                )));
            }
        }
        Ok(())
    }

    fn push_round(&mut self, tournament_id: TournamentId, draft: RoundDraft) -> Round {
        let round_id = next_id(self.rounds.len());
        let mut match_ids = Vec::with_capacity(draft.fixtures.len());
        for (home_team, away_team) in draft.fixtures {
            let id = next_id(self.matches.len());
            self.matches.push(Match {
                id,
                tournament_id,
                round_id,
                home_team,
                away_team,
                score: None,
                played: false,
                cancelled: false,
                postponed: false,
                kickoff: None,
            });
            match_ids.push(id);
        }

        let round = Round {
            id: round_id,
            tournament_id,
            number: draft.number,
            label: draft.label,
            knockout: draft.knockout,
            state: RoundState::Scheduled,
            match_ids,
            byes: draft.byes,
        };
        self.rounds.push(round.clone());
        round
    }

    fn seed_rankings(&mut self, tournament_id: TournamentId) -> TournamentResult<()> {
        let tournament = self.tournament(tournament_id)?;
        let entrants: Vec<(TeamId, Option<String>)> = tournament
            .team_ids
            .iter()
            .map(|id| (*id, tournament.groups.get(id).cloned()))
            .collect();

        for (team_id, group) in entrants {
            let exists = self
                .rankings
                .iter()
                .any(|r| r.tournament_id == tournament_id && r.team_id == team_id);
            if !exists {
                let id = next_id(self.rankings.len());
                self.rankings
                    .push(TournamentRanking::seed(id, tournament_id, team_id, group));
            }
        }
        Ok(())
    }

    fn push_scoring_rule(&mut self, tournament_id: TournamentId, draft: ScoringRuleDraft) -> ScoringRule {
        let rule = ScoringRule {
            id: next_id(self.scoring_rules.len()),
            tournament_id,
            rule_type: draft.rule_type,
            value: draft.value,
            priority: draft.priority,
            is_active: draft.is_active,
            description: draft.description,
        };
        self.scoring_rules.push(rule.clone());
        rule
    }
}

/// Repository keeping everything in process memory
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    arena: RwLock<Arena>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TournamentRepository for InMemoryRepository {
    async fn create_season(&self, league: &str, year: u16) -> TournamentResult<Season> {
        let mut arena = self.arena.write().await;
        let season = Season {
            id: next_id(arena.seasons.len()),
            league: league.to_string(),
            year,
            is_active: true,
        };
        arena.seasons.push(season.clone());
        Ok(season)
    }

    async fn find_season(&self, season_id: SeasonId) -> TournamentResult<Option<Season>> {
        let arena = self.arena.read().await;
        Ok(slot(season_id).and_then(|i| arena.seasons.get(i)).cloned())
    }

    async fn create_team(&self, name: &str, code: &str) -> TournamentResult<Team> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TournamentError::InvalidTeam("name must not be empty".to_string()));
        }

        let mut arena = self.arena.write().await;
        if arena.teams.iter().any(|t| t.name == name) {
            return Err(TournamentError::InvalidTeam(format!("'{name}' already exists")));
        }
        let team = Team {
            id: next_id(arena.teams.len()),
            name: name.to_string(),
            code: code.trim().to_uppercase(),
        };
        arena.teams.push(team.clone());
        Ok(team)
    }

    async fn find_teams(&self, team_ids: &[TeamId]) -> TournamentResult<Vec<Team>> {
        let arena = self.arena.read().await;
        Ok(team_ids
            .iter()
            .filter_map(|id| slot(*id).and_then(|i| arena.teams.get(i)))
            .cloned()
            .collect())
    }

    async fn tournament_name_taken(&self, season_id: SeasonId, name: &str) -> TournamentResult<bool> {
        Ok(self.arena.read().await.name_taken(season_id, name))
    }

    async fn insert_tournament(&self, plan: TournamentPlan) -> TournamentResult<Tournament> {
        let mut arena = self.arena.write().await;

        if slot(plan.season_id).is_none_or(|i| i >= arena.seasons.len()) {
            return Err(TournamentError::SeasonNotFound(plan.season_id));
        }
        if arena.name_taken(plan.season_id, &plan.name) {
            return Err(TournamentError::DuplicateName {
                season_id: plan.season_id,
                name: plan.name,
            });
        }
        arena.check_teams(&plan.team_ids)?;
        if let Some(parent_id) = plan.parent_id {
            arena.tournament(parent_id)?;
        }
        let mut rule_types = Vec::with_capacity(plan.scoring_rules.len());
        for draft in &plan.scoring_rules {
            if rule_types.contains(&draft.rule_type) {
                return Err(TournamentError::DuplicateScoringRule(draft.rule_type));
            }
            rule_types.push(draft.rule_type);
        }
        arena.check_destinations(plan.season_id, &plan.qualification_rules)?;

        let tournament_id = next_id(arena.tournaments.len());
        let tournament = Tournament {
            id: tournament_id,
            name: plan.name,
            description: plan.description,
            season_id: plan.season_id,
            structure: plan.structure,
            team_ids: plan.team_ids,
            groups: plan.groups,
            current_match_day: 1,
            status: plan.status,
            parent_id: plan.parent_id,
            winner: None,
            created_at: Utc::now(),
        };
        arena.tournaments.push(tournament.clone());

        for draft in plan.rounds {
            arena.push_round(tournament_id, draft);
        }
        if tournament.status == TournamentStatus::Active {
            arena.seed_rankings(tournament_id)?;
        }
        for draft in plan.scoring_rules {
            arena.push_scoring_rule(tournament_id, draft);
        }
        for draft in plan.qualification_rules {
            let id = next_id(arena.qualification_rules.len());
            arena
                .qualification_rules
                .push(draft.into_rule(id, tournament_id));
        }

        Ok(tournament)
    }

    async fn find_tournament(&self, tournament_id: TournamentId) -> TournamentResult<Option<Tournament>> {
        Ok(self.arena.read().await.tournament(tournament_id).ok().cloned())
    }

    async fn update_tournament(&self, tournament: &Tournament) -> TournamentResult<()> {
        let mut arena = self.arena.write().await;
        *arena.tournament_mut(tournament.id)? = tournament.clone();
        Ok(())
    }

    async fn add_entrants(
        &self,
        tournament_id: TournamentId,
        team_ids: &[TeamId],
    ) -> TournamentResult<Vec<TeamId>> {
        let mut arena = self.arena.write().await;
        arena.check_teams(team_ids)?;

        let tournament = arena.tournament_mut(tournament_id)?;
        let mut added = Vec::new();
        for team_id in team_ids {
            if !tournament.team_ids.contains(team_id) {
                tournament.team_ids.push(*team_id);
                added.push(*team_id);
            }
        }
        Ok(added)
    }

    async fn activate_tournament(
        &self,
        tournament_id: TournamentId,
        rounds: Vec<RoundDraft>,
    ) -> TournamentResult<Tournament> {
        let mut arena = self.arena.write().await;

        let tournament = arena.tournament_mut(tournament_id)?;
        if !tournament.status.can_transition_to(TournamentStatus::Active) {
            return Err(TournamentError::InvalidTransition {
                from: tournament.status,
                to: TournamentStatus::Active,
            });
        }
        tournament.status = TournamentStatus::Active;
        tournament.current_match_day = 1;
        let activated = tournament.clone();

        for draft in rounds {
            arena.push_round(tournament_id, draft);
        }
        arena.seed_rankings(tournament_id)?;

        Ok(activated)
    }

    async fn rounds(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Round>> {
        let arena = self.arena.read().await;
        let mut rounds: Vec<Round> = arena
            .rounds
            .iter()
            .filter(|r| r.tournament_id == tournament_id)
            .cloned()
            .collect();
        rounds.sort_by_key(|r| r.number);
        Ok(rounds)
    }

    async fn update_round(&self, round: &Round) -> TournamentResult<()> {
        let mut arena = self.arena.write().await;
        let rounds = &mut arena.rounds;
        let stored = slot(round.id)
            .and_then(|i| rounds.get_mut(i))
            .ok_or(TournamentError::RoundNotFound(round.id))?;
        *stored = round.clone();
        Ok(())
    }

    async fn append_round(&self, tournament_id: TournamentId, draft: RoundDraft) -> TournamentResult<Round> {
        let mut arena = self.arena.write().await;
        arena.tournament(tournament_id)?;
        Ok(arena.push_round(tournament_id, draft))
    }

    async fn matches(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Match>> {
        let arena = self.arena.read().await;
        Ok(arena
            .matches
            .iter()
            .filter(|m| m.tournament_id == tournament_id)
            .cloned()
            .collect())
    }

    async fn find_match(&self, match_id: MatchId) -> TournamentResult<Option<Match>> {
        let arena = self.arena.read().await;
        Ok(slot(match_id).and_then(|i| arena.matches.get(i)).cloned())
    }

    async fn update_match(&self, m: &Match) -> TournamentResult<()> {
        let mut arena = self.arena.write().await;
        let matches = &mut arena.matches;
        let stored = slot(m.id)
            .and_then(|i| matches.get_mut(i))
            .ok_or(TournamentError::MatchNotFound(m.id))?;
        *stored = m.clone();
        Ok(())
    }

    async fn rankings(&self, tournament_id: TournamentId) -> TournamentResult<Vec<TournamentRanking>> {
        let arena = self.arena.read().await;
        Ok(arena
            .rankings
            .iter()
            .filter(|r| r.tournament_id == tournament_id)
            .cloned()
            .collect())
    }

    async fn update_rankings(&self, rankings: &[TournamentRanking]) -> TournamentResult<()> {
        let mut arena = self.arena.write().await;
        if let Some(missing) = rankings
            .iter()
            .find(|r| slot(r.id).is_none_or(|i| i >= arena.rankings.len()))
        {
            return Err(TournamentError::NotFound(missing.tournament_id));
        }
        let stored_rankings = &mut arena.rankings;
        for ranking in rankings {
            if let Some(stored) = slot(ranking.id).and_then(|i| stored_rankings.get_mut(i)) {
                *stored = ranking.clone();
            }
        }
        Ok(())
    }

    async fn scoring_rules(&self, tournament_id: TournamentId) -> TournamentResult<Vec<ScoringRule>> {
        let arena = self.arena.read().await;
        Ok(arena
            .scoring_rules
            .iter()
            .filter(|r| r.tournament_id == tournament_id)
            .cloned()
            .collect())
    }

    async fn insert_scoring_rule(
        &self,
        tournament_id: TournamentId,
        draft: ScoringRuleDraft,
    ) -> TournamentResult<ScoringRule> {
        let mut arena = self.arena.write().await;
        arena.tournament(tournament_id)?;
        if arena
            .scoring_rules
            .iter()
            .any(|r| r.tournament_id == tournament_id && r.rule_type == draft.rule_type)
        {
            return Err(TournamentError::DuplicateScoringRule(draft.rule_type));
        }
        Ok(arena.push_scoring_rule(tournament_id, draft))
    }

    async fn qualification_rules(
        &self,
        from_tournament: TournamentId,
    ) -> TournamentResult<Vec<QualificationRule>> {
        let arena = self.arena.read().await;
        Ok(arena
            .qualification_rules
            .iter()
            .filter(|r| r.from_tournament == from_tournament)
            .cloned()
            .collect())
    }

    async fn insert_qualification_rule(
        &self,
        from_tournament: TournamentId,
        draft: QualificationRuleDraft,
    ) -> TournamentResult<QualificationRule> {
        let mut arena = self.arena.write().await;
        let origin_season = arena.tournament(from_tournament)?.season_id;
        arena.check_destinations(origin_season, std::slice::from_ref(&draft))?;

        let rule = draft.into_rule(next_id(arena.qualification_rules.len()), from_tournament);
        arena.qualification_rules.push(rule.clone());
        Ok(rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::RuleType;
    use crate::tournament::TournamentStructure;
    use std::collections::BTreeMap;

    async fn seeded() -> (InMemoryRepository, Season, Vec<TeamId>) {
        let repo = InMemoryRepository::new();
        let season = repo.create_season("Serie A", 2025).await.unwrap();
        let mut teams = Vec::new();
        for name in ["Inter", "Milan", "Juventus", "Napoli"] {
            teams.push(repo.create_team(name, &name[..3]).await.unwrap().id);
        }
        (repo, season, teams)
    }

    fn plan(season_id: SeasonId, team_ids: Vec<TeamId>, rounds: Vec<RoundDraft>) -> TournamentPlan {
        TournamentPlan {
            name: "Campionato".to_string(),
            description: String::new(),
            season_id,
            structure: TournamentStructure::league("League"),
            team_ids,
            status: TournamentStatus::Active,
            parent_id: None,
            rounds,
            groups: BTreeMap::new(),
            scoring_rules: Vec::new(),
            qualification_rules: Vec::new(),
        }
    }

    fn draft(number: u32, fixtures: Vec<(TeamId, TeamId)>) -> RoundDraft {
        RoundDraft {
            number,
            label: None,
            knockout: false,
            fixtures,
            byes: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_team_codes_upper_case_and_names_unique() {
        let (repo, _, _) = seeded().await;
        let team = repo.create_team("Roma", "rom").await.unwrap();
        assert_eq!(team.code, "ROM");
        assert_eq!(team.id, 5);
        assert!(matches!(
            repo.create_team("Roma", "ASR").await,
            Err(TournamentError::InvalidTeam(_))
        ));
        assert!(repo.create_team("  ", "X").await.is_err());
    }

    #[tokio::test]
    async fn test_insert_tournament_writes_everything() {
        let (repo, season, teams) = seeded().await;
        let rounds = vec![draft(1, vec![(1, 2), (3, 4)]), draft(2, vec![(1, 3), (2, 4)])];

        let tournament = repo.insert_tournament(plan(season.id, teams, rounds)).await.unwrap();
        assert_eq!(tournament.id, 1);
        assert_eq!(tournament.current_match_day, 1);

        let rounds = repo.rounds(1).await.unwrap();
        assert_eq!(rounds.len(), 2);
        assert_eq!(rounds[1].match_ids, vec![3, 4]);
        assert_eq!(repo.matches(1).await.unwrap().len(), 4);

        let rankings = repo.rankings(1).await.unwrap();
        assert_eq!(rankings.len(), 4);
        assert!(rankings.iter().all(|r| r.points == 0 && r.matches_played == 0));
        assert!(repo.tournament_name_taken(season.id, "Campionato").await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_insert_leaves_nothing_behind() {
        let (repo, season, teams) = seeded().await;
        let mut bad = plan(season.id, teams, vec![draft(1, vec![(1, 2)])]);
        bad.scoring_rules = vec![
            ScoringRuleDraft::new(RuleType::PointWin, 3),
            ScoringRuleDraft::new(RuleType::PointWin, 2),
        ];

        assert!(matches!(
            repo.insert_tournament(bad).await,
            Err(TournamentError::DuplicateScoringRule(RuleType::PointWin))
        ));
        assert!(repo.find_tournament(1).await.unwrap().is_none());
        assert!(repo.matches(1).await.unwrap().is_empty());
        assert!(repo.rankings(1).await.unwrap().is_empty());
        assert!(!repo.tournament_name_taken(season.id, "Campionato").await.unwrap());
    }

    #[tokio::test]
    async fn test_insert_rejects_unknown_references() {
        let (repo, season, _) = seeded().await;
        assert!(matches!(
            repo.insert_tournament(plan(season.id, vec![1, 99], vec![])).await,
            Err(TournamentError::TeamNotFound(99))
        ));
        assert!(matches!(
            repo.insert_tournament(plan(42, vec![1, 2], vec![])).await,
            Err(TournamentError::SeasonNotFound(42))
        ));
    }

    #[tokio::test]
    async fn test_pending_tournament_collects_entrants_then_activates() {
        let (repo, season, _) = seeded().await;
        let mut pending = plan(season.id, vec![], vec![]);
        pending.status = TournamentStatus::Pending;
        let tournament = repo.insert_tournament(pending).await.unwrap();
        assert!(repo.rankings(tournament.id).await.unwrap().is_empty());

        assert_eq!(repo.add_entrants(tournament.id, &[1, 2]).await.unwrap(), vec![1, 2]);
        assert_eq!(repo.add_entrants(tournament.id, &[2, 3]).await.unwrap(), vec![3]);

        let active = repo
            .activate_tournament(tournament.id, vec![draft(1, vec![(1, 2)])])
            .await
            .unwrap();
        assert_eq!(active.status, TournamentStatus::Active);
        assert_eq!(repo.rankings(tournament.id).await.unwrap().len(), 3);

        assert!(matches!(
            repo.activate_tournament(tournament.id, vec![]).await,
            Err(TournamentError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_scoring_rule_unique_per_type() {
        let (repo, season, teams) = seeded().await;
        let tournament = repo.insert_tournament(plan(season.id, teams, vec![])).await.unwrap();

        repo.insert_scoring_rule(tournament.id, ScoringRuleDraft::new(RuleType::PointDraw, 2))
            .await
            .unwrap();
        assert!(matches!(
            repo.insert_scoring_rule(tournament.id, ScoringRuleDraft::new(RuleType::PointDraw, 1))
                .await,
            Err(TournamentError::DuplicateScoringRule(RuleType::PointDraw))
        ));
        assert_eq!(repo.scoring_rules(tournament.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_unknown_match_fails() {
        let (repo, _, _) = seeded().await;
        let ghost = Match {
            id: 7,
            tournament_id: 1,
            round_id: 1,
            home_team: 1,
            away_team: 2,
            score: None,
            played: false,
            cancelled: false,
            postponed: false,
            kickoff: None,
        };
        assert!(matches!(
            repo.update_match(&ghost).await,
            Err(TournamentError::MatchNotFound(7))
        ));
    }

    #[tokio::test]
    async fn test_rule_destinations_checked_for_season_and_format() {
        let (repo, season, teams) = seeded().await;
        let next = repo.create_season("Serie A", 2026).await.unwrap();
        let origin = repo.insert_tournament(plan(season.id, teams, vec![])).await.unwrap();

        let mut league_next_year = plan(next.id, vec![], vec![]);
        league_next_year.status = TournamentStatus::Pending;
        let league_next_year = repo.insert_tournament(league_next_year).await.unwrap();

        let mut cup = plan(season.id, vec![], vec![]);
        cup.name = "Coppa".to_string();
        cup.structure = TournamentStructure::cup("Cup");
        cup.status = TournamentStatus::Pending;
        let cup = repo.insert_tournament(cup).await.unwrap();

        let promotion = QualificationRuleDraft::new(league_next_year.id, 1, 2, QualificationType::Promotion);
        assert!(matches!(
            repo.insert_qualification_rule(origin.id, promotion.clone()).await,
            Err(TournamentError::InvalidQualificationRule(_))
        ));
        repo.insert_qualification_rule(origin.id, promotion.with_season_offset(1))
            .await
            .unwrap();

        let playoff = QualificationRuleDraft::new(league_next_year.id, 3, 6, QualificationType::Playoff);
        assert!(matches!(
            repo.insert_qualification_rule(origin.id, playoff.with_season_offset(1)).await,
            Err(TournamentError::InvalidQualificationRule(_))
        ));
        repo.insert_qualification_rule(
            origin.id,
            QualificationRuleDraft::new(cup.id, 3, 6, QualificationType::Playoff),
        )
        .await
        .unwrap();
        assert_eq!(repo.qualification_rules(origin.id).await.unwrap().len(), 2);
    }
}
