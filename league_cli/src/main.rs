//! Command-line driver for the league engine.
//!
//! Builds a demo tournament in memory, optionally plays it out with random
//! scores and prints the standings.

mod config;
mod demo;
mod logging;

use anyhow::{Context, Error, anyhow};
use league_engine::ranking::ScoringRuleDraft;
use league_engine::tournament::TournamentError;
use pico_args::Arguments;
use tracing::info;

use crate::config::{CliConfig, CliOverrides};
use crate::demo::{Simulator, Summary};

const HELP: &str = "\
Generate a league or cup schedule and print its standings

USAGE:
  league_cli [OPTIONS]

OPTIONS:
  --teams      N           Number of teams              [default: env LEAGUE_TEAMS or 8]
  --format     FORMAT      league, cup, group_stage     [default: env LEAGUE_FORMAT or league]
  --legs       N           Legs per pairing (1 or 2)    [default: env LEAGUE_LEGS or 2]
  --seed       N           Seed for draws and scores    [default: env LEAGUE_SEED or random]
  --rule       TYPE=VALUE  Scoring rule, repeatable (e.g. point_win=3, shootout_win=2)

FLAGS:
  --simulate               Play every match with random scores
  --json                   Print standings as JSON
  -h, --help               Print help information

ENVIRONMENT:
  LEAGUE_ALLOW_DRAWS       Whether level scores stand (default: true for leagues)
  POINTS_WIN               Points for a win   [default: 3]
  POINTS_DRAW              Points for a draw  [default: 1]
  POINTS_LOSS              Points for a loss  [default: 0]
  RUST_LOG                 Log filter         [default: info]
";

struct Args {
    overrides: CliOverrides,
    rules: Vec<String>,
    json: bool,
}

/// Report a tournament failure without internal identifiers
fn client_error(err: TournamentError) -> Error {
    tracing::debug!(error = %err, "tournament operation failed");
    anyhow!(err.client_message())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        overrides: CliOverrides {
            teams: pargs.opt_value_from_str("--teams")?,
            format: pargs.opt_value_from_str("--format")?,
            legs: pargs.opt_value_from_str("--legs")?,
            seed: pargs.opt_value_from_str("--seed")?,
            simulate: pargs.contains("--simulate"),
        },
        rules: pargs.values_from_str("--rule")?,
        json: pargs.contains("--json"),
    };

    logging::init();

    let remaining = pargs.finish();
    if !remaining.is_empty() {
        tracing::warn!(?remaining, "ignoring unknown arguments");
    }

    let config = CliConfig::from_env(args.overrides)?;
    config.validate()?;

    let rules = args
        .rules
        .iter()
        .map(|raw| ScoringRuleDraft::parse(raw).with_context(|| format!("invalid --rule '{raw}'")))
        .collect::<Result<Vec<_>, _>>()?;

    let span = tracing::info_span!("league", format = %config.format, teams = config.teams);
    let demo = demo::build(&config, rules, span).await.map_err(client_error)?;
    let tournament_id = demo.tournament.id;
    info!(
        tournament_id,
        name = %demo.tournament.name,
        rounds = demo.manager.rounds(tournament_id).await?.len(),
        matches = demo.manager.matches(tournament_id).await?.len(),
        "Tournament created"
    );

    let mut champion = None;
    if config.simulate {
        champion = Simulator::new(config.seed)
            .play(&demo)
            .await
            .map_err(client_error)?;
        demo.manager
            .complete_tournament(tournament_id)
            .await
            .map_err(client_error)?;
        info!(tournament_id, ?champion, "Tournament played out");
    }

    let tournament = demo.manager.tournament(tournament_id).await?;
    let standings = demo.manager.standings(tournament_id, None).await?;
    let champion = match champion {
        Some(team_id) => standings
            .iter()
            .find(|row| row.team_id == team_id)
            .map(|row| row.team_name.clone()),
        None => None,
    };

    if args.json {
        let summary = Summary::new(tournament, champion, standings);
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{} ({})", tournament.name, tournament.status);
        if let Some(name) = champion {
            println!("Champion: {name}");
        }
        print!("{}", demo::render_table(&standings));
    }

    Ok(())
}
