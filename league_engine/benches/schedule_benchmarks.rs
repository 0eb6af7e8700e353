use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use league_engine::{
    ranking::{RankingCalculator, TieBreaker, TournamentRanking, sort_standings},
    schedule::ScheduleGenerator,
    tournament::{Match, MatchScore, TeamId, TournamentStructure},
};
use std::collections::HashMap;
use tracing::Span;

fn teams(n: usize) -> Vec<TeamId> {
    (1..=n as TeamId).collect()
}

/// Helper to build a fully played double round-robin for `n` teams
fn played_league(n: usize) -> Vec<Match> {
    let mut generator = ScheduleGenerator::from_seed(7, Span::none());
    let rounds = generator.round_robin(&teams(n), 2).unwrap();

    let mut matches = Vec::new();
    for (round_index, round) in rounds.iter().enumerate() {
        for (home, away) in &round.fixtures {
            let id = matches.len() as i64 + 1;
            matches.push(Match {
                id,
                tournament_id: 1,
                round_id: round_index as i64 + 1,
                home_team: *home,
                away_team: *away,
                score: Some(MatchScore::regular((id % 4) as u32, (id % 3) as u32)),
                played: true,
                cancelled: false,
                postponed: false,
                kickoff: None,
            });
        }
    }
    matches
}

/// Benchmark round-robin generation with different league sizes
fn bench_round_robin(c: &mut Criterion) {
    let mut group = c.benchmark_group("round_robin");

    for n_teams in [4, 10, 20, 40].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_teams", n_teams)),
            n_teams,
            |b, &n| {
                let mut generator = ScheduleGenerator::from_seed(1, Span::none());
                let entrants = teams(n);
                b.iter(|| generator.round_robin(&entrants, 2));
            },
        );
    }

    group.finish();
}

/// Benchmark first knockout round generation, including sizes that need byes
fn bench_knockout(c: &mut Criterion) {
    let mut group = c.benchmark_group("knockout_first_round");

    for n_teams in [8, 13, 64, 100].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_teams", n_teams)),
            n_teams,
            |b, &n| {
                let mut generator = ScheduleGenerator::from_seed(1, Span::none());
                let entrants = teams(n);
                b.iter(|| generator.knockout_first_round(&entrants));
            },
        );
    }

    group.finish();
}

/// Benchmark recomputing and sorting a 20-team league table
fn bench_standings(c: &mut Criterion) {
    let calculator = RankingCalculator::new(Span::none());
    let structure = TournamentStructure::league("League");
    let matches = played_league(20);
    let names: HashMap<TeamId, String> = teams(20)
        .into_iter()
        .map(|id| (id, format!("Club {id:02}")))
        .collect();
    let tie_breakers = TieBreaker::defaults();

    c.bench_function("standings_20_teams", |b| {
        b.iter(|| {
            let mut rankings: Vec<TournamentRanking> = teams(20)
                .into_iter()
                .map(|id| {
                    let mut ranking = TournamentRanking::seed(id, 1, id, None);
                    calculator.recompute(&mut ranking, &matches, &structure, &[]);
                    ranking
                })
                .collect();
            sort_standings(&mut rankings, &tie_breakers, &names);
            rankings
        });
    });
}

criterion_group!(schedule_generation, bench_round_robin, bench_knockout);

criterion_group!(standings, bench_standings);

criterion_main!(schedule_generation, standings);
