//! Editor preference operations
//!
//! Read-with-default plus upsert. A profile that has never saved preferences
//! reads the stock set; the first save creates its document.

use bson::{doc, oid::ObjectId, DateTime, Document};

use crate::db::schemas::EditorPrefsDoc;
use crate::db::{touch_update, Collections};
use crate::types::{EngineError, Result};

/// Partial preference update; absent fields keep their stored value
#[derive(Debug, Clone, Default)]
pub struct EditorPrefsUpdate {
    pub theme: Option<String>,
    pub font_size: Option<String>,
    pub font_weight: Option<String>,
    pub format_on_type: Option<bool>,
    pub minimap: Option<bool>,
    pub line_height: Option<i32>,
    pub mouse_wheel_zoom: Option<bool>,
    pub word_wrap: Option<String>,
}

impl EditorPrefsUpdate {
    fn set_document(&self) -> Document {
        let mut set = Document::new();
        if let Some(ref theme) = self.theme {
            set.insert("theme", theme);
        }
        if let Some(ref font_size) = self.font_size {
            set.insert("font_size", font_size);
        }
        if let Some(ref font_weight) = self.font_weight {
            set.insert("font_weight", font_weight);
        }
        if let Some(format_on_type) = self.format_on_type {
            set.insert("format_on_type", format_on_type);
        }
        if let Some(minimap) = self.minimap {
            set.insert("minimap", minimap);
        }
        if let Some(line_height) = self.line_height {
            set.insert("line_height", line_height);
        }
        if let Some(mouse_wheel_zoom) = self.mouse_wheel_zoom {
            set.insert("mouse_wheel_zoom", mouse_wheel_zoom);
        }
        if let Some(ref word_wrap) = self.word_wrap {
            set.insert("word_wrap", word_wrap);
        }
        set
    }
}

/// Editor preference store
#[derive(Clone)]
pub struct EditorStore {
    collections: Collections,
}

impl EditorStore {
    pub fn new(collections: Collections) -> Self {
        Self { collections }
    }

    /// The viewer's preferences; anonymous viewers and profiles that never
    /// saved any get the stock set
    pub async fn prefs_for(&self, viewer: Option<ObjectId>) -> Result<EditorPrefsDoc> {
        let Some(owner) = viewer else {
            return Ok(EditorPrefsDoc::default());
        };

        let stored = self
            .collections
            .editor_prefs
            .find_one(doc! { "owner": owner })
            .await?;
        Ok(stored.unwrap_or_else(|| EditorPrefsDoc::for_owner(owner)))
    }

    /// Save preferences, creating the document on first use
    pub async fn save(
        &self,
        owner: ObjectId,
        update: EditorPrefsUpdate,
    ) -> Result<EditorPrefsDoc> {
        let set = update.set_document();
        if set.is_empty() {
            return Err(EngineError::invalid("at least one preference is required"));
        }

        self.upsert(owner, set).await
    }

    /// Change only the indentation width
    pub async fn set_indentation(&self, owner: ObjectId, indentation: i32) -> Result<EditorPrefsDoc> {
        if indentation < 1 {
            return Err(EngineError::invalid("indentation must be positive"));
        }

        self.upsert(owner, doc! { "indentation": indentation }).await
    }

    async fn upsert(&self, owner: ObjectId, set: Document) -> Result<EditorPrefsDoc> {
        self.collections
            .editor_prefs
            .upsert_one(
                doc! { "owner": owner },
                touch_update(doc! {
                    "$set": set,
                    "$setOnInsert": { "created_at": DateTime::now() },
                }),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_update_has_no_set_fields() {
        assert!(EditorPrefsUpdate::default().set_document().is_empty());
    }

    #[test]
    fn test_partial_update_keeps_only_given_fields() {
        let update = EditorPrefsUpdate {
            theme: Some("vs-light".to_string()),
            minimap: Some(true),
            ..EditorPrefsUpdate::default()
        };
        let set = update.set_document();
        assert_eq!(set.len(), 2);
        assert_eq!(set.get_str("theme").unwrap(), "vs-light");
        assert!(set.get_bool("minimap").unwrap());
    }
}
