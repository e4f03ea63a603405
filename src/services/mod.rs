//! External service seams
//!
//! Media storage and transactional mail sit behind traits so the engine
//! never binds to a concrete CDN or SMTP backend.

pub mod mailer;
pub mod media;

pub use mailer::{MailKind, MailRequest, Mailer, RecordingMailer};
pub use media::{InMemoryMediaStore, MediaStore, StoredMedia};
