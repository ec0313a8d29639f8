//! Infrastructure layer: persistence and mail transport.

pub mod mail;
pub mod store;

pub use mail::{LogMailer, MailError, MailMessage, Mailer, RecordingMailer, SmtpConfig, SmtpMailer};
#[cfg(feature = "postgres")]
pub use store::PostgresStore;
pub use store::{InMemoryStore, Page, Store, StoreError};
