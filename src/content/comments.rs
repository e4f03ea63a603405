//! Comment and reply lifecycle operations
//!
//! Creation requires the target to resolve; edits are owner-scoped inside
//! the write. Deletion is a cascade concern and lives with the coordinator.

use bson::{doc, oid::ObjectId};
use tracing::debug;

use crate::db::schemas::{CommentDoc, ReplyDoc};
use crate::db::{touch_update, Collections};
use crate::types::{EngineError, Result};

/// Comment and reply store
#[derive(Clone)]
pub struct CommentStore {
    collections: Collections,
}

impl CommentStore {
    pub fn new(collections: Collections) -> Self {
        Self { collections }
    }

    /// Comment on a web
    pub async fn create_comment(
        &self,
        owner: ObjectId,
        web: ObjectId,
        text: &str,
    ) -> Result<CommentDoc> {
        let text = require_text(text)?;

        if !self.collections.webs.exists(doc! { "_id": web }).await? {
            return Err(EngineError::invalid(format!("web {} does not exist", web)));
        }

        let id = self
            .collections
            .comments
            .insert_one(CommentDoc::new(owner, web, text.to_string()))
            .await?;
        debug!(comment = %id, %web, %owner, "created comment");

        self.collections
            .comments
            .find_one(doc! { "_id": id })
            .await?
            .ok_or_else(|| EngineError::unavailable("stored comment vanished before readback"))
    }

    /// Edit your own comment's text
    pub async fn update_comment(
        &self,
        owner: ObjectId,
        comment: ObjectId,
        text: &str,
    ) -> Result<CommentDoc> {
        let text = require_text(text)?;

        self.collections
            .comments
            .find_one_and_update(
                doc! { "_id": comment, "owner": owner },
                touch_update(doc! { "$set": { "text": text } }),
            )
            .await?
            .ok_or_else(|| {
                EngineError::not_found(format!("comment {} owned by {}", comment, owner))
            })
    }

    /// Reply to a comment
    pub async fn create_reply(
        &self,
        owner: ObjectId,
        comment: ObjectId,
        text: &str,
    ) -> Result<ReplyDoc> {
        let text = require_text(text)?;

        if !self.collections.comments.exists(doc! { "_id": comment }).await? {
            return Err(EngineError::invalid(format!(
                "comment {} does not exist",
                comment
            )));
        }

        let id = self
            .collections
            .replies
            .insert_one(ReplyDoc::new(owner, comment, text.to_string()))
            .await?;
        debug!(reply = %id, %comment, %owner, "created reply");

        self.collections
            .replies
            .find_one(doc! { "_id": id })
            .await?
            .ok_or_else(|| EngineError::unavailable("stored reply vanished before readback"))
    }

    /// Edit your own reply's text
    pub async fn update_reply(
        &self,
        owner: ObjectId,
        reply: ObjectId,
        text: &str,
    ) -> Result<ReplyDoc> {
        let text = require_text(text)?;

        self.collections
            .replies
            .find_one_and_update(
                doc! { "_id": reply, "owner": owner },
                touch_update(doc! { "$set": { "text": text } }),
            )
            .await?
            .ok_or_else(|| EngineError::not_found(format!("reply {} owned by {}", reply, owner)))
    }
}

fn require_text(text: &str) -> Result<&str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(EngineError::invalid("text is required"));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace_text_rejected() {
        assert!(require_text("\n\t ").is_err());
        assert_eq!(require_text(" nice work ").unwrap(), "nice work");
    }
}
