//! # Reflection Engine
//!
//! A personal reflection journal with wellness analytics: reflections are
//! screened for crisis language, aggregated into streaks, mood trends and
//! heuristic scores, and mined for insights and goal progress.
//!
//! ## Features
//!
//! - **Reflections**: validated CRUD with derived word count, reading time and
//!   therapeutic value
//! - **Safety screen**: phrase-based crisis detection with a pluggable
//!   escalation hook
//! - **Aggregation**: full-recompute stats after every mutation
//! - **Insights**: rule-based observations ranked by severity
//! - **Goals**: per-category frequency targets with progress tracking
//! - **Query**: composable filters and sorting
//! - **Persistence**: snapshot blobs stored in SQLite, JSON/CSV export, import
//!
//! ## Architecture
//!
//! ```text
//! CLI → ReflectionStore → analytics (stats, insights, goals)
//!            ↓        ↘
//!     SnapshotStorage   EscalationHook
//!        (SQLite)
//! ```
//!
//! Scores produced here are heuristics, not clinical measures.
//!
//! ## Example
//!
//! ```ignore
//! use reflection_engine::{Category, EngineSettings, ReflectionDraft, ReflectionStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut store = ReflectionStore::new(EngineSettings::default());
//!     let draft = ReflectionDraft::new("Evening", "Long walk by the river", Category::Gratitude)
//!         .with_mood(7);
//!     store.add_reflection(draft).await?;
//!     println!("streak: {}", store.stats().current_streak);
//!     Ok(())
//! }
//! ```

/// Derived analytics: stats, insights and goal progress.
pub mod analytics;
/// Command-line interface.
pub mod cli;
/// Configuration management.
pub mod config;
/// Error types and result aliases.
pub mod error;
/// Entity types and validation.
pub mod model;
/// Built-in writing prompt library.
pub mod prompts;
/// Filtering and sorting over reflections.
pub mod query;
/// Crisis screening and escalation.
pub mod safety;
/// SQLite storage layer for snapshot persistence.
pub mod storage;
/// The reflection store and its export/import.
pub mod store;

pub use config::{Config, EngineSettings};
pub use error::{AppError, AppResult, EngineError, EngineResult};
pub use model::{Category, Goal, Insight, Reflection, ReflectionDraft, ReflectionPatch, Stats};
pub use store::{ReflectionStore, Snapshot};
