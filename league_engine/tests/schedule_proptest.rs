/// Property-based tests for fixture generation and standings using proptest
///
/// These tests check the counting rules of round-robin and knockout schedules
/// and the ordering guarantees of the standings across random inputs.
use league_engine::ranking::{RankingCalculator, TieBreaker, TournamentRanking, compare_rankings};
use league_engine::schedule::ScheduleGenerator;
use league_engine::tournament::{Match, MatchScore, TeamId, TournamentStructure};
use proptest::prelude::*;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tracing::Span;

fn generator(seed: u64) -> ScheduleGenerator {
    ScheduleGenerator::from_seed(seed, Span::none())
}

// Team ids 1..=n
fn teams(n: usize) -> Vec<TeamId> {
    (1..=n as TeamId).collect()
}

// Strategy to generate a ranking with arbitrary aggregates
fn ranking_strategy() -> impl Strategy<Value = TournamentRanking> {
    (1i64..=20, 1i64..=6, 0u32..10, 0u32..10, 0u32..10, 0u32..30, 0u32..30, -3i32..40).prop_map(
        |(id, team_id, win, draw, loss, goals_for, goals_against, points)| {
            let mut ranking = TournamentRanking::seed(id, 1, team_id, None);
            ranking.win = win;
            ranking.draw = draw;
            ranking.loss = loss;
            ranking.matches_played = win + draw + loss;
            ranking.goals_for = goals_for;
            ranking.goals_against = goals_against;
            ranking.points = points;
            ranking
        },
    )
}

// Strategy to generate the played results of a four-team single round-robin
fn results_strategy() -> impl Strategy<Value = Vec<Option<(u32, u32)>>> {
    prop::collection::vec(prop::option::of((0u32..5, 0u32..5)), 6)
}

fn four_team_matches(results: &[Option<(u32, u32)>]) -> Vec<Match> {
    let pairings = [(1, 2), (3, 4), (1, 3), (2, 4), (1, 4), (2, 3)];
    pairings
        .iter()
        .zip(results)
        .enumerate()
        .map(|(index, ((home, away), result))| Match {
            id: index as i64 + 1,
            tournament_id: 1,
            round_id: index as i64 / 2 + 1,
            home_team: *home,
            away_team: *away,
            score: result.map(|(h, a)| MatchScore::regular(h, a)),
            played: result.is_some(),
            cancelled: false,
            postponed: false,
            kickoff: None,
        })
        .collect()
}

fn names() -> HashMap<TeamId, String> {
    (1..=6).map(|id| (id, format!("Team {id}"))).collect()
}

proptest! {
    #[test]
    fn test_round_robin_match_count(n in 2usize..=20, legs in 1u8..=2, seed in any::<u64>()) {
        let rounds = generator(seed).round_robin(&teams(n), legs).unwrap();
        let matches: usize = rounds.iter().map(|r| r.fixtures.len()).sum();

        prop_assert_eq!(matches, n * (n - 1) / 2 * usize::from(legs));

        // Rounds are cut into n / 2 fixtures, the last one may be short
        prop_assert!(rounds.iter().all(|r| r.fixtures.len() <= n / 2));
        prop_assert!(rounds.iter().zip(1u32..).all(|(r, number)| r.number == number));
    }

    #[test]
    fn test_round_robin_pairs_every_team(n in 2usize..=16, seed in any::<u64>()) {
        let rounds = generator(seed).round_robin(&teams(n), 1).unwrap();
        let pairs: HashSet<(TeamId, TeamId)> = rounds
            .iter()
            .flat_map(|r| r.fixtures.iter())
            .map(|(home, away)| (*home.min(away), *home.max(away)))
            .collect();

        prop_assert_eq!(pairs.len(), n * (n - 1) / 2);
    }

    #[test]
    fn test_knockout_bye_arithmetic(n in 2usize..=64, seed in any::<u64>()) {
        let round = generator(seed).knockout_first_round(&teams(n)).unwrap();
        let power = 1usize << n.ilog2();
        let expected_matches = if n == power { n / 2 } else { n - power };

        prop_assert_eq!(round.fixtures.len(), expected_matches);
        prop_assert_eq!(round.byes.len(), n - 2 * expected_matches);
        prop_assert_eq!(round.team_count(), n);

        // Winners plus byes always make a power of two
        prop_assert!((round.fixtures.len() + round.byes.len()).is_power_of_two());
    }

    #[test]
    fn test_same_seed_same_bracket(n in 2usize..=32, seed in any::<u64>()) {
        let first = generator(seed).knockout_first_round(&teams(n)).unwrap();
        let second = generator(seed).knockout_first_round(&teams(n)).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn test_compare_rankings_is_total_order(
        a in ranking_strategy(),
        b in ranking_strategy(),
        c in ranking_strategy(),
    ) {
        let tie_breakers = TieBreaker::defaults();
        let names = names();
        let cmp = |x: &TournamentRanking, y: &TournamentRanking| compare_rankings(x, y, &tie_breakers, &names);

        // Antisymmetric
        prop_assert_eq!(cmp(&a, &b), cmp(&b, &a).reverse());

        // Equal only for the same ranking id
        if cmp(&a, &b) == Ordering::Equal {
            prop_assert_eq!(a.id, b.id);
        }

        // Transitive
        if cmp(&a, &b) != Ordering::Greater && cmp(&b, &c) != Ordering::Greater {
            prop_assert_ne!(cmp(&a, &c), Ordering::Greater);
        }
    }

    #[test]
    fn test_recompute_is_idempotent(results in results_strategy()) {
        let calculator = RankingCalculator::new(Span::none());
        let structure = TournamentStructure::league("League").with_legs(1);
        let matches = four_team_matches(&results);

        for team_id in 1..=4 {
            let mut once = TournamentRanking::seed(team_id, 1, team_id, None);
            calculator.recompute(&mut once, &matches, &structure, &[]);
            let mut twice = once.clone();
            calculator.recompute(&mut twice, &matches, &structure, &[]);

            prop_assert_eq!(&once, &twice);
            prop_assert_eq!(once.matches_played, once.win + once.draw + once.loss);
        }
    }

    #[test]
    fn test_goals_balance_across_teams(results in results_strategy()) {
        let calculator = RankingCalculator::new(Span::none());
        let structure = TournamentStructure::league("League").with_legs(1);
        let matches = four_team_matches(&results);

        let (mut scored, mut conceded) = (0u32, 0u32);
        for team_id in 1..=4 {
            let mut ranking = TournamentRanking::seed(team_id, 1, team_id, None);
            calculator.recompute(&mut ranking, &matches, &structure, &[]);
            scored += ranking.goals_for;
            conceded += ranking.goals_against;
        }
        prop_assert_eq!(scored, conceded);
    }
}
