//! Projection Engine
//!
//! Derives counts and viewer-relative flags (`likes_count`, `is_liked_by_me`,
//! `is_followed_by_me`) for content at read time. All joins happen in one
//! aggregation pipeline per page; per-item round trips and stored counters
//! are both ruled out, so a count can never drift from the edge store.

pub mod stages;

pub use stages::{
    comment_count_stages, follower_stages, impression_stage, like_stages, likes_fields,
    likes_lookup, owner_identity_lookup, owner_profile_lookup, owner_unwrap, replace_with,
    reply_count_stages, save_stages, strip_arrays, text_score_stage, viewer_flag,
    webs_count_stages,
};
