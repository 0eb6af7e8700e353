//! Integration tests for qualification between tournaments
//!
//! A league is played out with a fixed pecking order (the lower team id always
//! wins), completed, and its qualification rules applied.

use league_engine::db::{InMemoryRepository, TournamentRepository};
use league_engine::qualification::{QualificationRuleDraft, QualificationType};
use league_engine::tournament::{
    CreateTournamentRequest, MatchScore, SeasonId, TeamId, Tournament, TournamentError,
    TournamentId, TournamentManager, TournamentStatus, TournamentStructure,
};
use std::sync::Arc;
use tracing::Span;

async fn setup(teams: usize) -> (TournamentManager, SeasonId, Vec<TeamId>) {
    let repo = Arc::new(InMemoryRepository::new());
    let season = repo.create_season("Serie B", 2025).await.unwrap();
    let mut ids = Vec::with_capacity(teams);
    for i in 0..teams {
        ids.push(repo.create_team(&format!("Squadra {i:02}"), "SQ").await.unwrap().id);
    }
    (TournamentManager::with_seed(repo, 9, Span::none()), season.id, ids)
}

async fn declare(manager: &TournamentManager, season: SeasonId, name: &str, structure: TournamentStructure) -> Tournament {
    manager
        .declare_tournament(CreateTournamentRequest::new(name, season, structure, Vec::new()))
        .await
        .unwrap()
}

/// Lower team id wins every match, then the league is completed
async fn play_out(manager: &TournamentManager, tournament_id: TournamentId) {
    for m in manager.matches(tournament_id).await.unwrap() {
        let score = if m.home_team < m.away_team {
            MatchScore::regular(1, 0)
        } else {
            MatchScore::regular(0, 1)
        };
        manager.record_result(m.id, score).await.unwrap();
    }
    manager.complete_tournament(tournament_id).await.unwrap();
}

#[tokio::test]
async fn test_promotion_and_relegation() {
    let (manager, season, teams) = setup(10).await;
    let serie_a = declare(&manager, season, "Serie A", TournamentStructure::league("League")).await;
    let serie_c = declare(&manager, season, "Serie C", TournamentStructure::league("League")).await;

    let request = CreateTournamentRequest::new(
        "Serie B",
        season,
        TournamentStructure::league("League").with_relegation(2),
        teams.clone(),
    )
    .with_qualification_rule(QualificationRuleDraft::new(serie_a.id, 1, 2, QualificationType::Promotion))
    .with_qualification_rule(QualificationRuleDraft::new(serie_c.id, 9, 10, QualificationType::Relegation));
    let serie_b = manager.create_tournament(request).await.unwrap();
    play_out(&manager, serie_b.id).await;

    let report = manager.apply_qualification(serie_b.id).await.unwrap();
    assert_eq!(report.teams_for(QualificationType::Promotion), vec![teams[0], teams[1]]);
    assert_eq!(report.teams_for(QualificationType::Relegation), vec![teams[8], teams[9]]);
    assert_eq!(report.playoff, None);

    let rows = manager.standings(serie_b.id, None).await.unwrap();
    let qualified: Vec<TeamId> = rows.iter().filter(|r| r.qualified).map(|r| r.team_id).collect();
    let relegated: Vec<TeamId> = rows.iter().filter(|r| r.relegated).map(|r| r.team_id).collect();
    assert_eq!(qualified, vec![teams[0], teams[1]]);
    assert_eq!(relegated, vec![teams[8], teams[9]]);

    assert_eq!(manager.tournament(serie_a.id).await.unwrap().team_ids, vec![teams[0], teams[1]]);
    assert_eq!(manager.tournament(serie_c.id).await.unwrap().team_ids, vec![teams[8], teams[9]]);
}

#[tokio::test]
async fn test_playoff_started_from_qualified_teams() {
    let (manager, season, teams) = setup(8).await;
    let serie_a = declare(&manager, season, "Serie A", TournamentStructure::league("League")).await;
    let playoff = declare(&manager, season, "Playoff", TournamentStructure::cup("Playoff")).await;

    let request = CreateTournamentRequest::new(
        "Serie B",
        season,
        TournamentStructure::league("League").with_legs(1).with_playoff(4),
        teams.clone(),
    )
    .with_qualification_rule(QualificationRuleDraft::new(serie_a.id, 1, 2, QualificationType::Promotion))
    .with_qualification_rule(QualificationRuleDraft::new(playoff.id, 3, 6, QualificationType::Playoff));
    let serie_b = manager.create_tournament(request).await.unwrap();
    play_out(&manager, serie_b.id).await;

    let report = manager.apply_qualification(serie_b.id).await.unwrap();
    assert_eq!(report.playoff, Some(playoff.id));

    let playoff = manager.tournament(playoff.id).await.unwrap();
    assert_eq!(playoff.status, TournamentStatus::Active);
    assert_eq!(playoff.parent_id, Some(serie_b.id));
    assert_eq!(playoff.team_ids, teams[2..6].to_vec());

    let rounds = manager.rounds(playoff.id).await.unwrap();
    assert_eq!(rounds.len(), 1);
    assert_eq!(rounds[0].label.as_deref(), Some("Semifinal"));
    assert_eq!(rounds[0].match_ids.len(), 2);
}

#[tokio::test]
async fn test_playoff_structure_requires_playoff_rule() {
    let (manager, season, teams) = setup(6).await;
    let request = CreateTournamentRequest::new(
        "Serie B",
        season,
        TournamentStructure::league("League").with_playoff(4),
        teams,
    );
    assert!(matches!(
        manager.create_tournament(request).await,
        Err(TournamentError::MissingQualificationRule(QualificationType::Playoff))
    ));
}

#[tokio::test]
async fn test_no_rules_returns_empty_report() {
    let (manager, season, teams) = setup(4).await;
    let league = manager
        .create_tournament(CreateTournamentRequest::new(
            "Amichevoli",
            season,
            TournamentStructure::league("League").with_legs(1),
            teams,
        ))
        .await
        .unwrap();
    play_out(&manager, league.id).await;

    let report = manager.apply_qualification(league.id).await.unwrap();
    assert!(report.is_empty());
    assert!(
        manager
            .standings(league.id, None)
            .await
            .unwrap()
            .iter()
            .all(|r| !r.qualified && !r.relegated)
    );
}

#[tokio::test]
async fn test_qualification_needs_completed_tournament() {
    let (manager, season, teams) = setup(4).await;
    let league = manager
        .create_tournament(CreateTournamentRequest::new(
            "In corso",
            season,
            TournamentStructure::league("League"),
            teams,
        ))
        .await
        .unwrap();
    assert!(matches!(
        manager.apply_qualification(league.id).await,
        Err(TournamentError::TournamentIncomplete { .. })
    ));
}

#[tokio::test]
async fn test_overlapping_rules_select_each_team_once() {
    let (manager, season, teams) = setup(6).await;
    let europe = declare(&manager, season, "Europa", TournamentStructure::cup("Cup")).await;
    let conference = declare(&manager, season, "Conference", TournamentStructure::cup("Cup")).await;
    let league = manager
        .create_tournament(CreateTournamentRequest::new(
            "Campionato",
            season,
            TournamentStructure::league("League").with_legs(1),
            teams.clone(),
        ))
        .await
        .unwrap();

    manager
        .add_qualification_rule(
            league.id,
            QualificationRuleDraft::new(conference.id, 2, 4, QualificationType::Qualification),
        )
        .await
        .unwrap();
    manager
        .add_qualification_rule(
            league.id,
            QualificationRuleDraft::new(europe.id, 1, 3, QualificationType::Qualification),
        )
        .await
        .unwrap();
    play_out(&manager, league.id).await;

    let report = manager.apply_qualification(league.id).await.unwrap();
    assert_eq!(report.outcomes[0].to_tournament, europe.id);
    assert_eq!(report.outcomes[0].team_ids, vec![teams[0], teams[1], teams[2]]);
    assert_eq!(report.outcomes[1].team_ids, vec![teams[3]]);
    assert_eq!(manager.tournament(conference.id).await.unwrap().team_ids, vec![teams[3]]);
}

#[tokio::test]
async fn test_started_destination_is_left_alone() {
    let (manager, season, teams) = setup(4).await;
    let running = manager
        .create_tournament(CreateTournamentRequest::new(
            "Gia iniziato",
            season,
            TournamentStructure::cup("Cup"),
            teams[2..].to_vec(),
        ))
        .await
        .unwrap();
    let league = manager
        .create_tournament(
            CreateTournamentRequest::new(
                "Campionato",
                season,
                TournamentStructure::league("League").with_legs(1),
                teams.clone(),
            )
            .with_qualification_rule(QualificationRuleDraft::new(
                running.id,
                1,
                1,
                QualificationType::Promotion,
            )),
        )
        .await
        .unwrap();
    play_out(&manager, league.id).await;

    let report = manager.apply_qualification(league.id).await.unwrap();
    assert_eq!(report.outcomes[0].team_ids, vec![teams[0]]);
    assert_eq!(manager.tournament(running.id).await.unwrap().team_ids, teams[2..].to_vec());
    assert!(manager.standings(league.id, None).await.unwrap()[0].qualified);
}

#[tokio::test]
async fn test_rule_cannot_target_its_origin() {
    let (manager, season, teams) = setup(2).await;
    let league = manager
        .create_tournament(CreateTournamentRequest::new(
            "Campionato",
            season,
            TournamentStructure::league("League"),
            teams,
        ))
        .await
        .unwrap();
    assert!(matches!(
        manager
            .add_qualification_rule(
                league.id,
                QualificationRuleDraft::new(league.id, 1, 1, QualificationType::Promotion),
            )
            .await,
        Err(TournamentError::InvalidQualificationRule(_))
    ));
}

#[tokio::test]
async fn test_playoff_destination_must_be_knockout() {
    let (manager, season, teams) = setup(6).await;
    let mini_league = declare(&manager, season, "Poule", TournamentStructure::league("League")).await;

    let request = CreateTournamentRequest::new(
        "Serie B",
        season,
        TournamentStructure::league("League").with_playoff(4),
        teams.clone(),
    )
    .with_qualification_rule(QualificationRuleDraft::new(mini_league.id, 1, 4, QualificationType::Playoff));
    assert!(matches!(
        manager.create_tournament(request).await,
        Err(TournamentError::InvalidQualificationRule(_))
    ));

    let league = manager
        .create_tournament(CreateTournamentRequest::new(
            "Campionato",
            season,
            TournamentStructure::league("League"),
            teams,
        ))
        .await
        .unwrap();
    assert!(matches!(
        manager
            .add_qualification_rule(
                league.id,
                QualificationRuleDraft::new(mini_league.id, 1, 4, QualificationType::Playoff),
            )
            .await,
        Err(TournamentError::InvalidQualificationRule(_))
    ));
}

#[tokio::test]
async fn test_playoff_entrants_capped_by_structure() {
    let (manager, season, teams) = setup(8).await;
    let playoff = declare(&manager, season, "Playoff", TournamentStructure::cup("Playoff")).await;

    let request = CreateTournamentRequest::new(
        "Serie B",
        season,
        TournamentStructure::league("League").with_legs(1).with_playoff(2),
        teams.clone(),
    )
    .with_qualification_rule(QualificationRuleDraft::new(playoff.id, 3, 8, QualificationType::Playoff));
    let serie_b = manager.create_tournament(request).await.unwrap();
    play_out(&manager, serie_b.id).await;

    let report = manager.apply_qualification(serie_b.id).await.unwrap();
    assert_eq!(report.teams_for(QualificationType::Playoff), vec![teams[2], teams[3]]);

    let playoff = manager.tournament(playoff.id).await.unwrap();
    assert_eq!(playoff.team_ids, vec![teams[2], teams[3]]);
    let rounds = manager.rounds(playoff.id).await.unwrap();
    assert_eq!(rounds[0].label.as_deref(), Some("Final"));

    let flagged = manager
        .standings(serie_b.id, None)
        .await
        .unwrap()
        .iter()
        .filter(|r| r.qualified)
        .count();
    assert_eq!(flagged, 2);
}

#[tokio::test]
async fn test_season_offset_selects_next_season_destination() {
    let (manager, season, teams) = setup(4).await;
    let next = manager
        .repository()
        .create_season("Serie A", 2026)
        .await
        .unwrap();
    let next_top_flight = declare(&manager, next.id, "Serie A", TournamentStructure::league("League")).await;
    let league = manager
        .create_tournament(CreateTournamentRequest::new(
            "Serie B",
            season,
            TournamentStructure::league("League").with_legs(1),
            teams.clone(),
        ))
        .await
        .unwrap();

    let promotion = QualificationRuleDraft::new(next_top_flight.id, 1, 1, QualificationType::Promotion);
    assert!(matches!(
        manager.add_qualification_rule(league.id, promotion.clone()).await,
        Err(TournamentError::InvalidQualificationRule(_))
    ));
    manager
        .add_qualification_rule(league.id, promotion.with_season_offset(1))
        .await
        .unwrap();
    play_out(&manager, league.id).await;

    manager.apply_qualification(league.id).await.unwrap();
    assert_eq!(manager.tournament(next_top_flight.id).await.unwrap().team_ids, vec![teams[0]]);
}
