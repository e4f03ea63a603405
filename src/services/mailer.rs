//! Transactional mail seam
//!
//! Mail is fire-and-forget: operations enqueue a send after they commit and
//! never fail because delivery did. The subject and body copy live here so
//! every backend sends the same text.

use std::collections::VecDeque;

use tokio::sync::Mutex;

use crate::types::Result;

/// The transactional mails the engine sends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailKind {
    Welcome,
    VerifyEmail,
    ChangeEmail,
    ForgotPassword,
}

/// One mail to send: recipient, display name, and the action link
#[derive(Debug, Clone)]
pub struct MailRequest {
    pub email: String,
    pub full_name: String,
    pub kind: MailKind,
    pub url: String,
}

impl MailRequest {
    pub fn subject(&self) -> &'static str {
        match self.kind {
            MailKind::Welcome => "Welcome to Weavery",
            MailKind::VerifyEmail => "Verify your email address",
            MailKind::ChangeEmail => "Verify your new email address",
            MailKind::ForgotPassword => "Reset your password",
        }
    }

    pub fn body(&self) -> String {
        let middle = match self.kind {
            MailKind::Welcome => format!(
                "Welcome to Weavery! We're excited to have you as an early user.\n\n\
                 For a better experience, please verify your email address by clicking the link below:\n\n{}",
                self.url
            ),
            MailKind::VerifyEmail => format!(
                "Thanks for signing up for Weavery! Please verify your email address by clicking the link below:\n\n{}\n\n\
                 If you didn't create an account with this email address, please ignore this email.",
                self.url
            ),
            MailKind::ChangeEmail => format!(
                "We received a request to change your email address on Weavery. \
                 Please verify your new email address by clicking the link below:\n\n{}\n\n\
                 If you did not request to change your email address, please ignore this email.",
                self.url
            ),
            MailKind::ForgotPassword => format!(
                "We received a request to reset your password for your Weavery account. \
                 Please click the link below to reset your password:\n\n{}\n\n\
                 If you did not request a password reset, please ignore this email.",
                self.url
            ),
        };

        format!("Hello {},\n\n{}\n\nThanks,\nThe Weavery Team", self.full_name, middle)
    }
}

/// Trait for mail delivery (allows mocking in tests)
#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, request: MailRequest) -> Result<()>;
}

/// Mailer that records instead of sending, for tests and local development
pub struct RecordingMailer {
    sent: Mutex<VecDeque<MailRequest>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(VecDeque::new()),
        }
    }

    /// Pop the oldest recorded mail
    pub async fn take(&self) -> Option<MailRequest> {
        self.sent.lock().await.pop_front()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }
}

impl Default for RecordingMailer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, request: MailRequest) -> Result<()> {
        self.sent.lock().await.push_back(request);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_welcome_mail_copy() {
        let request = MailRequest {
            email: "mira@example.com".into(),
            full_name: "Mira L".into(),
            kind: MailKind::Welcome,
            url: "https://weavery.example/verify/abc".into(),
        };

        assert_eq!(request.subject(), "Welcome to Weavery");
        let body = request.body();
        assert!(body.starts_with("Hello Mira L,"));
        assert!(body.contains("https://weavery.example/verify/abc"));
    }

    #[tokio::test]
    async fn test_recording_mailer_keeps_order() {
        let mailer = RecordingMailer::new();
        for kind in [MailKind::Welcome, MailKind::VerifyEmail] {
            mailer
                .send(MailRequest {
                    email: "a@example.com".into(),
                    full_name: "A".into(),
                    kind,
                    url: String::new(),
                })
                .await
                .unwrap();
        }

        assert_eq!(mailer.sent_count().await, 2);
        assert_eq!(mailer.take().await.unwrap().kind, MailKind::Welcome);
    }
}
