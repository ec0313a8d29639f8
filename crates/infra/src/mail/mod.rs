//! Outbound mail.
//!
//! The account flows only need fire-and-report delivery of one message with
//! HTML and plain text alternatives, so the seam is a single `send`.

use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

mod smtp;

pub use smtp::{SmtpConfig, SmtpMailer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("mail transport error: {0}")]
    Transport(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: MailMessage) -> Result<(), MailError>;
}

/// Logs the envelope of each message instead of delivering it.
///
/// Used when no SMTP relay is configured. Bodies are never logged: they carry
/// reset links.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: MailMessage) -> Result<(), MailError> {
        tracing::info!(
            from = %message.from,
            to = %message.to,
            subject = %message.subject,
            "mail not delivered (no relay configured)"
        );
        Ok(())
    }
}

/// Keeps every message in memory. Test double.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<MailMessage>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose every delivery fails with a transport error.
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// Messages accepted so far, oldest first.
    pub fn sent(&self) -> Vec<MailMessage> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: MailMessage) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::Transport("relay refused the message".to_string()));
        }
        self.sent
            .lock()
            .map_err(|_| MailError::Transport("recorder lock poisoned".to_string()))?
            .push(message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::Arc;

    use tracing_subscriber::fmt::MakeWriter;

    use super::*;

    fn message() -> MailMessage {
        MailMessage {
            from: "no-reply@fitshop.local".to_string(),
            to: "a@x.com".to_string(),
            subject: "hello".to_string(),
            html: "<p>hi</p>".to_string(),
            text: "hi".to_string(),
        }
    }

    #[tokio::test]
    async fn recording_mailer_keeps_messages_in_order() {
        let mailer = RecordingMailer::new();
        mailer.send(message()).await.unwrap();
        let mut second = message();
        second.subject = "again".to_string();
        mailer.send(second).await.unwrap();

        let sent = mailer.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].subject, "hello");
        assert_eq!(sent[1].subject, "again");
    }

    #[tokio::test]
    async fn failing_mailer_records_nothing() {
        let mailer = RecordingMailer::failing();
        let err = mailer.send(message()).await.unwrap_err();
        assert!(matches!(err, MailError::Transport(_)));
        assert!(mailer.sent().is_empty());
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[tokio::test]
    async fn log_mailer_logs_the_envelope_but_not_the_body() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let mut reset = message();
        reset.subject = "Your Password Reset Token".to_string();
        reset.html = "<a href=\"http://shop.test/reset?resetToken=deadbeef01\">reset</a>".to_string();
        reset.text = "http://shop.test/reset?resetToken=deadbeef01".to_string();
        LogMailer.send(reset).await.unwrap();

        let out = String::from_utf8_lossy(&logs.0.lock().unwrap()).into_owned();
        assert!(out.contains("mail not delivered"));
        assert!(out.contains("a@x.com"));
        assert!(out.contains("Your Password Reset Token"));
        assert!(!out.contains("deadbeef01"), "{out}");
    }
}
