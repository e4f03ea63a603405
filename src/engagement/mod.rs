//! Engagement edges and their toggles

mod toggle;

pub use toggle::{reaction_key, ToggleEngine, ToggleOutcome};
