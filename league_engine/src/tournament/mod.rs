//! Tournament module for league and cup competitions.
//!
//! This module provides tournament management functionality including:
//! - Tournament creation with an atomically stored initial schedule
//! - Result recording with ranking recomputation
//! - Knockout progression round by round up to the champion
//! - Qualification of teams into promotion, relegation and playoff tournaments
//!
//! ## Example
//!
//! ```
//! use league_engine::db::{InMemoryRepository, TournamentRepository};
//! use league_engine::tournament::{CreateTournamentRequest, TournamentManager, TournamentStructure};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let repo = Arc::new(InMemoryRepository::new());
//!     let season = repo.create_season("Serie A", 2025).await?;
//!     let mut teams = Vec::new();
//!     for name in ["Inter", "Milan", "Roma", "Lazio"] {
//!         teams.push(repo.create_team(name, &name[..3]).await?.id);
//!     }
//!
//!     let manager = TournamentManager::with_seed(repo, 42, tracing::Span::none());
//!     let request = CreateTournamentRequest::new(
//!         "Campionato",
//!         season.id,
//!         TournamentStructure::league("Championship"),
//!         teams,
//!     );
//!     let tournament = manager.create_tournament(request).await?;
//!     assert_eq!(manager.matches(tournament.id).await?.len(), 12);
//!
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{TournamentError, TournamentResult};
pub use manager::{AdvanceOutcome, CreateTournamentRequest, TournamentManager};
pub use models::{
    Match, MatchId, MatchScore, Round, RoundId, RoundState, Season, SeasonId, Team, TeamId,
    Tournament, TournamentFormat, TournamentId, TournamentStatus, TournamentStructure,
};
