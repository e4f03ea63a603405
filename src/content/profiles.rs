//! Profile lifecycle operations
//!
//! Registration, identity edits, credential changes, imagery, and the
//! pinned/showcase lists. Mail is always fire-and-forget: the write commits
//! and the result is returned before delivery is attempted.

use std::collections::HashSet;
use std::sync::Arc;

use bson::{doc, oid::ObjectId, Document};
use tracing::{debug, info, warn};

use crate::auth::{hash_password, verify_password};
use crate::db::schemas::{
    ProfileDoc, DEFAULT_AVATAR_PUBLIC_ID, DEFAULT_COVER_PUBLIC_ID,
};
use crate::db::{touch_update, Collections};
use crate::services::{MailKind, MailRequest, Mailer, MediaStore};
use crate::types::{EngineError, Result};

/// Fields for a new profile
#[derive(Debug, Clone, Default)]
pub struct NewProfile {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: String,
}

/// Partial identity update; absent or blank fields keep their stored value
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub link1: Option<String>,
    pub link2: Option<String>,
    pub link3: Option<String>,
}

impl ProfileUpdate {
    fn set_document(&self) -> Document {
        let mut set = Document::new();
        let fields = [
            ("full_name", &self.full_name),
            ("bio", &self.bio),
            ("link1", &self.link1),
            ("link2", &self.link2),
            ("link3", &self.link3),
        ];
        for (name, value) in fields {
            if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                set.insert(name, value);
            }
        }
        set
    }
}

/// Profile lifecycle store
#[derive(Clone)]
pub struct ProfileStore {
    collections: Collections,
    media: Arc<dyn MediaStore>,
    mailer: Arc<dyn Mailer>,
}

impl ProfileStore {
    pub fn new(
        collections: Collections,
        media: Arc<dyn MediaStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            collections,
            media,
            mailer,
        }
    }

    /// Register a new profile and queue the welcome mail
    pub async fn register(&self, input: NewProfile, verification_url: &str) -> Result<ProfileDoc> {
        let username = validate_username(&input.username)?;
        let email = validate_email(&input.email)?;
        validate_password(&input.password)?;
        let full_name = input.full_name.trim();
        if full_name.is_empty() {
            return Err(EngineError::invalid("full name is required"));
        }

        let taken = self
            .collections
            .profiles
            .exists(doc! { "$or": [ { "username": username }, { "email": email } ] })
            .await?;
        if taken {
            return Err(EngineError::invalid("user already exists"));
        }

        let password_hash = hash_password(&input.password)?;
        let id = self
            .collections
            .profiles
            .insert_one(ProfileDoc::new(
                username.to_string(),
                email.to_string(),
                full_name.to_string(),
                password_hash,
            ))
            .await
            .map_err(already_exists)?;
        info!(profile = %id, username, "registered profile");

        let profile = self
            .collections
            .profiles
            .find_one(doc! { "_id": id })
            .await?
            .ok_or_else(|| EngineError::unavailable("stored profile vanished before readback"))?;

        self.mail_later(MailRequest {
            email: profile.email.clone(),
            full_name: profile.full_name.clone(),
            kind: MailKind::Welcome,
            url: verification_url.to_string(),
        });

        Ok(profile)
    }

    /// Update display name, bio, or links; at least one field must be given
    pub async fn update_profile(
        &self,
        owner: ObjectId,
        update: ProfileUpdate,
    ) -> Result<ProfileDoc> {
        let set = update.set_document();
        if set.is_empty() {
            return Err(EngineError::invalid("at least one field is required"));
        }

        self.collections
            .profiles
            .find_one_and_update(doc! { "_id": owner }, touch_update(doc! { "$set": set }))
            .await?
            .ok_or_else(|| EngineError::not_found(format!("profile {}", owner)))
    }

    /// Swap the avatar; the replaced object is discarded unless it is the
    /// stock one
    pub async fn update_avatar(
        &self,
        owner: ObjectId,
        image_url: &str,
        public_id: &str,
    ) -> Result<ProfileDoc> {
        self.swap_image(
            owner,
            image_url,
            public_id,
            "avatar",
            "avatar_public_id",
            DEFAULT_AVATAR_PUBLIC_ID,
            |profile| &profile.avatar_public_id,
        )
        .await
    }

    /// Swap the cover image; same replacement rules as the avatar
    pub async fn update_cover(
        &self,
        owner: ObjectId,
        image_url: &str,
        public_id: &str,
    ) -> Result<ProfileDoc> {
        self.swap_image(
            owner,
            image_url,
            public_id,
            "cover_image",
            "cover_image_public_id",
            DEFAULT_COVER_PUBLIC_ID,
            |profile| &profile.cover_image_public_id,
        )
        .await
    }

    async fn swap_image(
        &self,
        owner: ObjectId,
        image_url: &str,
        public_id: &str,
        url_field: &str,
        handle_field: &str,
        stock_handle: &str,
        current_handle: fn(&ProfileDoc) -> &str,
    ) -> Result<ProfileDoc> {
        let image_url = image_url.trim();
        let public_id = public_id.trim();
        if image_url.is_empty() || public_id.is_empty() {
            return Err(EngineError::invalid("image url and public_id are required"));
        }

        // Pre-read only to learn which stored object the swap replaces.
        let previous = self.fetch(owner).await?;
        let old_handle = current_handle(&previous).to_string();

        let updated = self
            .collections
            .profiles
            .find_one_and_update(
                doc! { "_id": owner },
                touch_update(doc! { "$set": { url_field: image_url, handle_field: public_id } }),
            )
            .await?
            .ok_or_else(|| EngineError::not_found(format!("profile {}", owner)))?;

        if !old_handle.is_empty() && old_handle != stock_handle && old_handle != public_id {
            if let Err(error) = self.media.delete(&old_handle).await {
                warn!(%owner, %error, "failed to discard replaced profile image");
            }
        }

        Ok(updated)
    }

    /// Send (or re-send) the verification mail for an unverified address
    pub async fn request_email_verification(
        &self,
        owner: ObjectId,
        verification_url: &str,
    ) -> Result<()> {
        let profile = self.fetch(owner).await?;
        if profile.is_verified {
            return Err(EngineError::invalid("email already verified"));
        }

        self.mail_later(MailRequest {
            email: profile.email,
            full_name: profile.full_name,
            kind: MailKind::VerifyEmail,
            url: verification_url.to_string(),
        });
        Ok(())
    }

    /// Mark the profile's address as confirmed
    pub async fn verify_email(&self, profile: ObjectId) -> Result<()> {
        let current = self.fetch(profile).await?;
        if current.is_verified {
            return Err(EngineError::invalid("email already verified"));
        }

        let updated = self
            .collections
            .profiles
            .update_one(
                doc! { "_id": profile },
                touch_update(doc! { "$set": { "is_verified": true } }),
            )
            .await?;
        if updated.matched_count == 0 {
            return Err(EngineError::not_found(format!("profile {}", profile)));
        }
        debug!(%profile, "email verified");
        Ok(())
    }

    /// Change the contact address; the new one starts unverified and a
    /// verification mail is queued
    pub async fn change_email(
        &self,
        owner: ObjectId,
        new_email: &str,
        password: &str,
        verification_url: &str,
    ) -> Result<ProfileDoc> {
        let email = validate_email(new_email)?;

        let profile = self.fetch(owner).await?;
        if profile.email == email {
            return Err(EngineError::invalid(
                "new email must differ from the old one",
            ));
        }
        if self
            .collections
            .profiles
            .exists(doc! { "email": email })
            .await?
        {
            return Err(EngineError::invalid("email already exists"));
        }
        if !verify_password(password, &profile.password_hash)? {
            return Err(EngineError::invalid("invalid credentials"));
        }

        let updated = self
            .collections
            .profiles
            .find_one_and_update(
                doc! { "_id": owner },
                touch_update(doc! { "$set": { "email": email, "is_verified": false } }),
            )
            .await
            .map_err(already_exists)?
            .ok_or_else(|| EngineError::not_found(format!("profile {}", owner)))?;
        info!(profile = %owner, "email changed");

        self.mail_later(MailRequest {
            email: updated.email.clone(),
            full_name: updated.full_name.clone(),
            kind: MailKind::ChangeEmail,
            url: verification_url.to_string(),
        });

        Ok(updated)
    }

    /// Change the password after verifying the old one
    pub async fn change_password(
        &self,
        owner: ObjectId,
        old_password: &str,
        new_password: &str,
    ) -> Result<()> {
        let profile = self.fetch(owner).await?;
        if !verify_password(old_password, &profile.password_hash)? {
            return Err(EngineError::invalid("invalid credentials"));
        }
        if old_password == new_password {
            return Err(EngineError::invalid(
                "new password must differ from the old one",
            ));
        }
        validate_password(new_password)?;

        self.store_password(owner, new_password).await?;
        info!(profile = %owner, "password changed");
        Ok(())
    }

    /// Queue a password-reset mail for the profile owning this address
    pub async fn request_password_reset(&self, email: &str, reset_url: &str) -> Result<()> {
        let email = validate_email(email)?;
        let profile = self
            .collections
            .profiles
            .find_one(doc! { "email": email })
            .await?
            .ok_or_else(|| EngineError::not_found(format!("profile with email '{}'", email)))?;

        self.mail_later(MailRequest {
            email: profile.email,
            full_name: profile.full_name,
            kind: MailKind::ForgotPassword,
            url: reset_url.to_string(),
        });
        Ok(())
    }

    /// Set a fresh password without the old one (reset flow)
    pub async fn reset_password(&self, profile: ObjectId, new_password: &str) -> Result<()> {
        validate_password(new_password)?;
        self.store_password(profile, new_password).await?;
        info!(%profile, "password reset");
        Ok(())
    }

    /// Pin a web to the profile; pinning an already pinned web is a no-op
    pub async fn pin_web(&self, owner: ObjectId, web: ObjectId) -> Result<()> {
        if !self.collections.webs.exists(doc! { "_id": web }).await? {
            return Err(EngineError::invalid(format!("web {} does not exist", web)));
        }

        let updated = self
            .collections
            .profiles
            .update_one(doc! { "_id": owner }, doc! { "$addToSet": { "pinned": web } })
            .await?;
        if updated.matched_count == 0 {
            return Err(EngineError::not_found(format!("profile {}", owner)));
        }
        Ok(())
    }

    /// Unpin a web; unpinning a web that is not pinned is a no-op
    pub async fn unpin_web(&self, owner: ObjectId, web: ObjectId) -> Result<()> {
        let updated = self
            .collections
            .profiles
            .update_one(doc! { "_id": owner }, doc! { "$pull": { "pinned": web } })
            .await?;
        if updated.matched_count == 0 {
            return Err(EngineError::not_found(format!("profile {}", owner)));
        }
        Ok(())
    }

    /// Replace the showcase list; every entry must be a web the profile owns
    pub async fn update_showcase(
        &self,
        owner: ObjectId,
        webs: Vec<ObjectId>,
    ) -> Result<ProfileDoc> {
        let mut webs = webs;
        let mut seen = HashSet::new();
        webs.retain(|id| seen.insert(*id));

        let owned = self
            .collections
            .webs
            .count(doc! { "_id": { "$in": &webs }, "owner": owner })
            .await?;
        if owned != webs.len() as u64 {
            return Err(EngineError::invalid(
                "showcase may only contain your own webs",
            ));
        }

        self.collections
            .profiles
            .find_one_and_update(
                doc! { "_id": owner },
                touch_update(doc! { "$set": { "showcase": webs } }),
            )
            .await?
            .ok_or_else(|| EngineError::not_found(format!("profile {}", owner)))
    }

    /// Check a password against the stored hash, returning the profile on
    /// success
    pub async fn verify_credentials(&self, owner: ObjectId, password: &str) -> Result<ProfileDoc> {
        let profile = self.fetch(owner).await?;
        if !verify_password(password, &profile.password_hash)? {
            return Err(EngineError::invalid("invalid credentials"));
        }
        Ok(profile)
    }

    async fn fetch(&self, owner: ObjectId) -> Result<ProfileDoc> {
        self.collections
            .profiles
            .find_one(doc! { "_id": owner })
            .await?
            .ok_or_else(|| EngineError::not_found(format!("profile {}", owner)))
    }

    async fn store_password(&self, profile: ObjectId, password: &str) -> Result<()> {
        let password_hash = hash_password(password)?;
        let updated = self
            .collections
            .profiles
            .update_one(
                doc! { "_id": profile },
                touch_update(doc! { "$set": { "password_hash": password_hash } }),
            )
            .await?;
        if updated.matched_count == 0 {
            return Err(EngineError::not_found(format!("profile {}", profile)));
        }
        Ok(())
    }

    fn mail_later(&self, request: MailRequest) {
        let mailer = Arc::clone(&self.mailer);
        tokio::spawn(async move {
            let kind = request.kind;
            let email = request.email.clone();
            if let Err(error) = mailer.send(request).await {
                warn!(?kind, %email, %error, "mail delivery failed");
            }
        });
    }
}

/// Handles are lowercase, at least four characters, drawn from `a-z`, `0-9`
/// and `-`, and start with a letter.
pub fn validate_username(username: &str) -> Result<&str> {
    let username = username.trim();
    if username.chars().count() < 4 {
        return Err(EngineError::invalid(
            "username must be at least 4 characters long",
        ));
    }
    let mut chars = username.chars();
    match chars.next() {
        Some(first) if first.is_ascii_lowercase() => {}
        _ => {
            return Err(EngineError::invalid(
                "username must start with a lowercase letter",
            ))
        }
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(EngineError::invalid(
            "username may only contain lowercase letters, digits, and dashes",
        ));
    }
    Ok(username)
}

/// Minimal address shape check: one `@`, a dotted domain, no whitespace
pub fn validate_email(email: &str) -> Result<&str> {
    let email = email.trim();
    let well_formed = email
        .split_once('@')
        .filter(|(local, domain)| {
            let clean = |part: &str| {
                !part.is_empty() && !part.contains('@') && !part.contains(char::is_whitespace)
            };
            let dotted = domain
                .rsplit_once('.')
                .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty());
            clean(local) && clean(domain) && dotted
        })
        .is_some();
    if !well_formed {
        return Err(EngineError::invalid("invalid email address"));
    }
    Ok(email)
}

pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < 8 {
        return Err(EngineError::invalid(
            "password must be at least 8 characters long",
        ));
    }
    Ok(())
}

fn already_exists(error: EngineError) -> EngineError {
    if error.is_conflict() {
        EngineError::conflict("a profile with that username or email already exists")
    } else {
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_rules() {
        assert_eq!(validate_username(" maker-01 ").unwrap(), "maker-01");
        assert!(validate_username("abc").is_err());
        assert!(validate_username("1maker").is_err());
        assert!(validate_username("-maker").is_err());
        assert!(validate_username("Maker").is_err());
        assert!(validate_username("mak er").is_err());
    }

    #[test]
    fn test_email_rules() {
        assert!(validate_email("maker@example.com").is_ok());
        assert!(validate_email("m.a-k+er@sub.example.co").is_ok());
        assert!(validate_email("makerexample.com").is_err());
        assert!(validate_email("maker@example").is_err());
        assert!(validate_email("maker@.com").is_err());
        assert!(validate_email("maker@example.").is_err());
        assert!(validate_email("ma ker@example.com").is_err());
        assert!(validate_email("maker@@example.com").is_err());
    }

    #[test]
    fn test_password_length() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("longenough").is_ok());
    }

    #[test]
    fn test_blank_update_rejected() {
        let update = ProfileUpdate {
            bio: Some("   ".to_string()),
            ..ProfileUpdate::default()
        };
        assert!(update.set_document().is_empty());

        let update = ProfileUpdate {
            full_name: Some("Ada Weaver".to_string()),
            link1: Some("https://example.com".to_string()),
            ..ProfileUpdate::default()
        };
        let set = update.set_document();
        assert_eq!(set.get_str("full_name").unwrap(), "Ada Weaver");
        assert_eq!(set.get_str("link1").unwrap(), "https://example.com");
        assert!(set.get_str("bio").is_err());
    }
}
