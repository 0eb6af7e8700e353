//! Storage layer for tournaments.
//!
//! Services receive an `Arc<dyn TournamentRepository>`; entities reference each
//! other by id only. [`InMemoryRepository`] is the bundled implementation and
//! is what the tests and the command line driver run against.
//!
//! # Examples
//!
//! ```
//! use league_engine::db::{InMemoryRepository, TournamentRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), league_engine::TournamentError> {
//!     let repo = InMemoryRepository::new();
//!     let season = repo.create_season("Serie A", 2025).await?;
//!     let team = repo.create_team("Inter", "int").await?;
//!     assert_eq!(season.id, 1);
//!     assert_eq!(team.code, "INT");
//!     Ok(())
//! }
//! ```

pub mod memory;
pub mod repository;

pub use memory::InMemoryRepository;
pub use repository::{TournamentPlan, TournamentRepository};
