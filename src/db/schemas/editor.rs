//! Editor preferences schema
//!
//! Per-profile code editor settings. Defaults match what a profile gets
//! before it has ever saved preferences, so reads fall back to `default()`
//! when no document exists.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, Stamped, Timestamps};

/// Collection name for editor preferences
pub const EDITOR_PREFS_COLLECTION: &str = "editor_prefs";

/// Editor preferences stored in MongoDB, one document per profile
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct EditorPrefsDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Lifecycle timestamps (created_at, updated_at)
    #[serde(flatten, default)]
    pub timestamps: Timestamps,

    /// Owning profile
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<ObjectId>,

    #[serde(default = "default_theme")]
    pub theme: String,

    #[serde(default = "default_indentation")]
    pub indentation: i32,

    #[serde(default = "default_font_size")]
    pub font_size: String,

    #[serde(default = "default_font_weight")]
    pub font_weight: String,

    #[serde(default = "default_true")]
    pub format_on_type: bool,

    #[serde(default)]
    pub minimap: bool,

    #[serde(default = "default_line_height")]
    pub line_height: i32,

    #[serde(default = "default_true")]
    pub mouse_wheel_zoom: bool,

    #[serde(default = "default_word_wrap")]
    pub word_wrap: String,
}

fn default_theme() -> String {
    "vs-dark".to_string()
}

fn default_indentation() -> i32 {
    1
}

fn default_font_size() -> String {
    "15px".to_string()
}

fn default_font_weight() -> String {
    "500".to_string()
}

fn default_line_height() -> i32 {
    20
}

fn default_word_wrap() -> String {
    "on".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for EditorPrefsDoc {
    fn default() -> Self {
        Self {
            _id: None,
            timestamps: Timestamps::default(),
            owner: None,
            theme: default_theme(),
            indentation: default_indentation(),
            font_size: default_font_size(),
            font_weight: default_font_weight(),
            format_on_type: true,
            minimap: false,
            line_height: default_line_height(),
            mouse_wheel_zoom: true,
            word_wrap: default_word_wrap(),
        }
    }
}

impl EditorPrefsDoc {
    /// Default preferences bound to a profile
    pub fn for_owner(owner: ObjectId) -> Self {
        Self {
            owner: Some(owner),
            ..Self::default()
        }
    }
}

impl IntoIndexes for EditorPrefsDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // One preferences document per profile
            (
                doc! { "owner": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("owner_unique".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl Stamped for EditorPrefsDoc {
    fn timestamps_mut(&mut self) -> &mut Timestamps {
        &mut self.timestamps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_fresh_profile() {
        let prefs = EditorPrefsDoc::default();
        assert_eq!(prefs.theme, "vs-dark");
        assert_eq!(prefs.indentation, 1);
        assert_eq!(prefs.font_size, "15px");
        assert_eq!(prefs.font_weight, "500");
        assert!(prefs.format_on_type);
        assert!(!prefs.minimap);
        assert_eq!(prefs.line_height, 20);
        assert!(prefs.mouse_wheel_zoom);
        assert_eq!(prefs.word_wrap, "on");
    }

    #[test]
    fn test_missing_fields_deserialize_to_defaults() {
        let partial = doc! { "owner": ObjectId::new(), "theme": "vs-light" };
        let prefs: EditorPrefsDoc = bson::from_document(partial).unwrap();
        assert_eq!(prefs.theme, "vs-light");
        assert_eq!(prefs.line_height, 20);
        assert_eq!(prefs.word_wrap, "on");
    }
}
