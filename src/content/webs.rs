//! Web lifecycle operations
//!
//! Creation, forking, payload edits, publish toggling, link lists, and the
//! view counter. Ownership rides inside the conditional write itself, never
//! a separate check.

use std::sync::Arc;

use bson::{doc, oid::ObjectId, Document};
use tracing::{debug, warn};

use crate::db::schemas::WebDoc;
use crate::db::{touch_update, Collections, Timestamps};
use crate::services::MediaStore;
use crate::types::{EngineError, Result};

/// Fields for a new web
#[derive(Debug, Clone, Default)]
pub struct NewWeb {
    pub title: String,
    pub description: String,
    pub html: String,
    pub css: String,
    pub js: String,
    pub is_public: bool,
    pub css_links: Vec<String>,
    pub js_links: Vec<String>,
}

/// Optional overrides applied when forking
#[derive(Debug, Clone, Default)]
pub struct ForkOptions {
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_public: Option<bool>,
}

/// Partial payload update; absent fields keep their stored value
#[derive(Debug, Clone, Default)]
pub struct WebUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub html: Option<String>,
    pub css: Option<String>,
    pub js: Option<String>,
    pub is_public: Option<bool>,
}

impl WebUpdate {
    /// Whether this update would blank the entire payload at once
    fn blanks_payload(&self) -> bool {
        matches!(
            (&self.html, &self.css, &self.js),
            (Some(h), Some(c), Some(j)) if h.is_empty() && c.is_empty() && j.is_empty()
        )
    }
}

/// Web lifecycle store
#[derive(Clone)]
pub struct WebStore {
    collections: Collections,
    media: Arc<dyn MediaStore>,
}

impl WebStore {
    pub fn new(collections: Collections, media: Arc<dyn MediaStore>) -> Self {
        Self { collections, media }
    }

    /// Create a web with an uploaded preview image
    pub async fn create(
        &self,
        owner: ObjectId,
        new_web: NewWeb,
        preview_path: &str,
    ) -> Result<WebDoc> {
        if new_web.title.trim().is_empty() || new_web.description.trim().is_empty() {
            return Err(EngineError::invalid("title and description are required"));
        }
        if new_web.html.is_empty() && new_web.css.is_empty() && new_web.js.is_empty() {
            return Err(EngineError::invalid("at least one of html, css, js is required"));
        }

        let preview = self.media.upload(preview_path).await?;

        let web = WebDoc {
            _id: None,
            timestamps: Timestamps::default(),
            owner,
            title: new_web.title,
            description: new_web.description,
            html: new_web.html,
            css: new_web.css,
            js: new_web.js,
            image: preview.url,
            image_public_id: preview.public_id,
            css_links: new_web.css_links,
            js_links: new_web.js_links,
            views: 0,
            is_public: new_web.is_public,
            forked_from: None,
        };

        let id = self.collections.webs.insert_one(web).await?;
        debug!(web = %id, %owner, "created web");

        self.fetch(id).await
    }

    /// Fork another profile's web, copying its payload and preview.
    ///
    /// Forks keep the source's media handle; preview cleanup checks for
    /// remaining references before deleting.
    pub async fn fork(
        &self,
        actor: ObjectId,
        source: ObjectId,
        options: ForkOptions,
    ) -> Result<WebDoc> {
        let original = self
            .collections
            .webs
            .find_one(doc! { "_id": source })
            .await?
            .ok_or_else(|| EngineError::not_found(format!("web {}", source)))?;

        if original.owner == actor {
            return Err(EngineError::invalid("cannot fork your own web"));
        }

        let fork = WebDoc {
            _id: None,
            timestamps: Timestamps::default(),
            owner: actor,
            title: options.title.unwrap_or(original.title),
            description: options.description.unwrap_or(original.description),
            html: original.html,
            css: original.css,
            js: original.js,
            image: original.image,
            image_public_id: original.image_public_id,
            css_links: original.css_links,
            js_links: original.js_links,
            views: 0,
            is_public: options.is_public.unwrap_or(true),
            forked_from: Some(source),
        };

        let id = self.collections.webs.insert_one(fork).await?;
        debug!(web = %id, %actor, %source, "forked web");

        self.fetch(id).await
    }

    /// Update a web's payload, optionally replacing the preview image
    pub async fn update(
        &self,
        owner: ObjectId,
        web: ObjectId,
        update: WebUpdate,
        new_preview: Option<&str>,
    ) -> Result<WebDoc> {
        if update.blanks_payload() {
            return Err(EngineError::invalid("cannot blank html, css, and js at once"));
        }

        let mut set = Document::new();
        if let Some(title) = update.title.filter(|t| !t.trim().is_empty()) {
            set.insert("title", title);
        }
        if let Some(description) = update.description.filter(|d| !d.trim().is_empty()) {
            set.insert("description", description);
        }
        if let Some(html) = update.html {
            set.insert("html", html);
        }
        if let Some(css) = update.css {
            set.insert("css", css);
        }
        if let Some(js) = update.js {
            set.insert("js", js);
        }
        if let Some(is_public) = update.is_public {
            set.insert("is_public", is_public);
        }

        if set.is_empty() && new_preview.is_none() {
            return Err(EngineError::invalid("at least one field is required"));
        }

        let replaced = match new_preview {
            Some(path) => {
                let current = self
                    .collections
                    .webs
                    .find_one(doc! { "_id": web, "owner": owner })
                    .await?
                    .ok_or_else(|| not_owned(web, owner))?;
                let stored = self.media.upload(path).await?;
                set.insert("image", stored.url);
                set.insert("image_public_id", stored.public_id);
                Some(current.image_public_id)
            }
            None => None,
        };

        let updated = self
            .collections
            .webs
            .find_one_and_update(
                doc! { "_id": web, "owner": owner },
                touch_update(doc! { "$set": set }),
            )
            .await?
            .ok_or_else(|| not_owned(web, owner))?;

        if let Some(old_handle) = replaced {
            self.discard_preview(web, &old_handle).await;
        }

        debug!(%web, %owner, "updated web");
        Ok(updated)
    }

    /// Flip a web's publish status
    pub async fn toggle_publish(&self, owner: ObjectId, web: ObjectId) -> Result<WebDoc> {
        let flip = vec![doc! {
            "$set": { "is_public": { "$not": "$is_public" }, "updated_at": "$$NOW" }
        }];

        self.collections
            .webs
            .find_one_and_update(doc! { "_id": web, "owner": owner }, flip)
            .await?
            .ok_or_else(|| not_owned(web, owner))
    }

    /// Bump the view counter; any viewer may do this
    pub async fn increment_views(&self, web: ObjectId) -> Result<()> {
        let result = self
            .collections
            .webs
            .update_one(doc! { "_id": web }, doc! { "$inc": { "views": 1 } })
            .await?;

        if result.matched_count == 0 {
            return Err(EngineError::not_found(format!("web {}", web)));
        }
        Ok(())
    }

    pub async fn add_css_link(&self, owner: ObjectId, web: ObjectId, link: &str) -> Result<WebDoc> {
        let link = require_link(link)?;
        self.edit_links(owner, web, doc! { "$addToSet": { "css_links": link } })
            .await
    }

    pub async fn remove_css_link(
        &self,
        owner: ObjectId,
        web: ObjectId,
        link: &str,
    ) -> Result<WebDoc> {
        let link = require_link(link)?;
        self.edit_links(owner, web, doc! { "$pull": { "css_links": link } })
            .await
    }

    pub async fn add_js_link(&self, owner: ObjectId, web: ObjectId, link: &str) -> Result<WebDoc> {
        let link = require_link(link)?;
        self.edit_links(owner, web, doc! { "$addToSet": { "js_links": link } })
            .await
    }

    pub async fn remove_js_link(
        &self,
        owner: ObjectId,
        web: ObjectId,
        link: &str,
    ) -> Result<WebDoc> {
        let link = require_link(link)?;
        self.edit_links(owner, web, doc! { "$pull": { "js_links": link } })
            .await
    }

    async fn edit_links(&self, owner: ObjectId, web: ObjectId, update: Document) -> Result<WebDoc> {
        self.collections
            .webs
            .find_one_and_update(doc! { "_id": web, "owner": owner }, update)
            .await?
            .ok_or_else(|| not_owned(web, owner))
    }

    /// Best-effort delete of a replaced preview, skipped while other webs
    /// (forks or fork sources) still reference the same stored object.
    async fn discard_preview(&self, web: ObjectId, public_id: &str) {
        let still_referenced = self
            .collections
            .webs
            .count(doc! { "image_public_id": public_id, "_id": { "$ne": web } })
            .await
            .unwrap_or(1);
        if still_referenced > 0 {
            return;
        }
        if let Err(e) = self.media.delete(public_id).await {
            warn!(%web, error = %e, "failed to delete replaced preview");
        }
    }

    async fn fetch(&self, id: ObjectId) -> Result<WebDoc> {
        self.collections
            .webs
            .find_one(doc! { "_id": id })
            .await?
            .ok_or_else(|| EngineError::unavailable("stored web vanished before readback"))
    }
}

fn not_owned(web: ObjectId, owner: ObjectId) -> EngineError {
    EngineError::not_found(format!("web {} owned by {}", web, owner))
}

fn require_link(link: &str) -> Result<&str> {
    let trimmed = link.trim();
    if trimmed.is_empty() {
        return Err(EngineError::invalid("link is required"));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blanking_whole_payload_detected() {
        let update = WebUpdate {
            html: Some(String::new()),
            css: Some(String::new()),
            js: Some(String::new()),
            ..Default::default()
        };
        assert!(update.blanks_payload());
    }

    #[test]
    fn test_blanking_one_field_is_allowed() {
        let update = WebUpdate {
            html: Some(String::new()),
            css: Some("body { margin: 0 }".into()),
            ..Default::default()
        };
        assert!(!update.blanks_payload());
    }

    #[test]
    fn test_blank_link_rejected() {
        assert!(require_link("  ").is_err());
        assert_eq!(require_link(" https://cdn.example/x.css ").unwrap(),
            "https://cdn.example/x.css");
    }
}
