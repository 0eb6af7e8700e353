//! # League Engine
//!
//! Tournament generation, standings and qualification for league and cup
//! competitions.
//!
//! ## Architecture
//!
//! Entities (seasons, teams, tournaments, rounds, matches, rankings, rules)
//! reference each other by id and live behind the [`db::TournamentRepository`]
//! trait. The [`tournament::TournamentManager`] service drives them through
//! three pure components:
//!
//! - **Schedule generator**: round-robin fixture lists and knockout brackets
//!   with byes, drawn from a seedable RNG
//! - **Ranking calculator**: team records from played matches, points from the
//!   tournament's scoring rules, and a total standings order
//! - **Qualification engine**: rank-range rules that flag rankings and move
//!   teams into promotion, relegation and playoff tournaments
//!
//! Logging goes through `tracing`. Every component is handed a [`tracing::Span`]
//! at construction and logs inside it; the library never installs a subscriber.
//!
//! ## Core Modules
//!
//! - [`tournament`]: Models, errors and the manager service
//! - [`schedule`]: Fixture generation and knockout progression
//! - [`ranking`]: Scoring rules and standings
//! - [`qualification`]: Qualification rules between tournaments
//! - [`db`]: Repository trait and the in-memory implementation

pub mod db;
pub mod qualification;
pub mod ranking;
pub mod schedule;
pub mod tournament;

pub use db::{InMemoryRepository, TournamentRepository};
pub use tournament::{
    CreateTournamentRequest, TournamentError, TournamentManager, TournamentResult,
};
