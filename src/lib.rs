//! Weavery - engagement graph and feed engine
//!
//! Weavery stores maker-built webs, the collections and assets around them,
//! and the engagement edges (reactions, follows, saves) profiles draw
//! between each other, then serves ranked, viewer-aware feeds computed
//! entirely at read time.
//!
//! ## Layers
//!
//! - **Content**: lifecycle stores for profiles, webs, collections,
//!   comments, assets, and editor preferences
//! - **Engagement**: atomic toggles over the edge collections
//! - **Projection**: aggregation-stage builders for counts and viewer flags
//! - **Feed**: paginated, deterministically sorted listings
//! - **Cascade**: dependents-first teardown on every delete

pub mod auth;
pub mod cascade;
pub mod config;
pub mod content;
pub mod db;
pub mod engagement;
pub mod engine;
pub mod feed;
pub mod projection;
pub mod services;
pub mod types;

pub use config::Args;
pub use engine::Engine;
pub use types::{EngineError, Result};
