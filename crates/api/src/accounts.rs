//! Password lifecycle: signup, signin, reset requests and reset redemption.
//!
//! Hashing runs on the blocking pool; Argon2 at server cost takes long enough
//! to stall other requests if it ran on an executor thread.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{Span, field, instrument};

use fitshop_auth::{
    CredentialCodec, HashCost, NewUser, PasswordError, ResetTicket, SessionClaims, User,
    hash_password, verify_password,
};
use fitshop_core::Email;
use fitshop_infra::{MailMessage, Mailer, Store, StoreError};

use crate::emails;
use crate::error::{ApiError, ApiResult};

/// Fixed at startup from configuration.
#[derive(Debug, Clone)]
pub struct AccountSettings {
    /// Origin the reset link points at, without trailing slash.
    pub frontend_url: String,
    pub mail_from: String,
    pub hash_cost: HashCost,
}

/// A principal together with a freshly minted credential.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub credential: String,
}

#[derive(Debug, Clone)]
pub struct Accounts {
    codec: Arc<CredentialCodec>,
    settings: AccountSettings,
}

impl Accounts {
    pub fn new(codec: Arc<CredentialCodec>, settings: AccountSettings) -> Self {
        Self { codec, settings }
    }

    pub fn codec(&self) -> &Arc<CredentialCodec> {
        &self.codec
    }

    #[instrument(skip_all, fields(email = %email, user_id = field::Empty), err(Display))]
    pub async fn signup(
        &self,
        store: &dyn Store,
        email: &str,
        password: &str,
        name: &str,
        now: DateTime<Utc>,
    ) -> ApiResult<Session> {
        let email = Email::parse(email)?;
        let password_hash = self.hash(password).await?;
        let user = NewUser::new(email, name, password_hash)?.into_user(now);

        let user = match store.insert_user(user).await {
            Ok(user) => user,
            Err(StoreError::Conflict(_)) => return Err(ApiError::DuplicateEmail),
            Err(err) => return Err(err.into()),
        };

        Span::current().record("user_id", field::display(user.id));
        tracing::info!("user signed up");
        self.session(user)
    }

    /// Fails with `NoSuchUser` or `BadCredentials`; callers facing the outside
    /// world should present both the same way.
    #[instrument(skip_all, fields(email = %email, user_id = field::Empty), err(Display))]
    pub async fn signin(&self, store: &dyn Store, email: &str, password: &str) -> ApiResult<Session> {
        let email = Email::parse(email)?;
        let Some(user) = store.user_by_email(&email).await? else {
            tracing::info!("signin failed: unknown email");
            return Err(ApiError::NoSuchUser);
        };

        Span::current().record("user_id", field::display(user.id));

        match self.verify(password, &user.password_hash).await {
            Ok(()) => {}
            Err(ApiError::BadCredentials) => {
                tracing::info!("signin failed: wrong password");
                return Err(ApiError::BadCredentials);
            }
            Err(err) => return Err(err),
        }

        self.session(user)
    }

    /// Issue a reset ticket and mail the link. The ticket is persisted before
    /// sending, so a mail failure leaves a valid but undelivered ticket that
    /// the next request simply replaces.
    #[instrument(skip_all, fields(email = %email, user_id = field::Empty), err(Display))]
    pub async fn request_reset(
        &self,
        store: &dyn Store,
        mailer: &dyn Mailer,
        email: &str,
        now: DateTime<Utc>,
    ) -> ApiResult<()> {
        let email = Email::parse(email)?;
        let Some(user) = store.user_by_email(&email).await? else {
            return Err(ApiError::NoSuchUser);
        };
        Span::current().record("user_id", field::display(user.id));

        let ticket = ResetTicket::issue(now);
        let rendered = emails::password_reset(&user.name, &self.reset_link(&ticket.token))?;
        store
            .set_reset_ticket(user.id, ticket)
            .await?
            .ok_or(ApiError::NoSuchUser)?;

        mailer
            .send(MailMessage {
                from: self.settings.mail_from.clone(),
                to: user.email.to_string(),
                subject: rendered.subject.to_string(),
                html: rendered.html,
                text: rendered.text,
            })
            .await
            .map_err(|err| {
                tracing::error!(error = %err, "reset mail not delivered");
                ApiError::from(err)
            })?;

        tracing::info!("reset ticket issued");
        Ok(())
    }

    /// Redeem a reset ticket. The lookup, password swap and ticket clearing
    /// are one store call, so a token can be redeemed at most once.
    #[instrument(skip_all, fields(user_id = field::Empty), err(Display))]
    pub async fn reset_password(
        &self,
        store: &dyn Store,
        password: &str,
        confirm_password: &str,
        token: &str,
        now: DateTime<Utc>,
    ) -> ApiResult<Session> {
        if password != confirm_password {
            return Err(ApiError::PasswordMismatch);
        }
        if token.is_empty() {
            return Err(ApiError::InvalidOrExpiredToken);
        }

        let password_hash = self.hash(password).await?;
        let Some(user) = store.redeem_reset_ticket(token, now, &password_hash).await? else {
            tracing::warn!("reset token rejected");
            return Err(ApiError::InvalidOrExpiredToken);
        };

        Span::current().record("user_id", field::display(user.id));
        tracing::info!("password reset");
        self.session(user)
    }

    fn session(&self, user: User) -> ApiResult<Session> {
        let credential = self.codec.issue(&SessionClaims::new(user.id))?;
        Ok(Session { user, credential })
    }

    fn reset_link(&self, token: &str) -> String {
        format!("{}/reset?resetToken={}", self.settings.frontend_url, token)
    }

    async fn hash(&self, password: &str) -> ApiResult<String> {
        let password = password.to_string();
        let cost = self.settings.hash_cost;
        tokio::task::spawn_blocking(move || hash_password(&password, cost))
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?
            .map_err(ApiError::from)
    }

    async fn verify(&self, password: &str, stored: &str) -> ApiResult<()> {
        let password = password.to_string();
        let stored = stored.to_string();
        tokio::task::spawn_blocking(move || verify_password(&password, &stored))
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?
            .map_err(|err| match err {
                PasswordError::Empty | PasswordError::Mismatch => ApiError::BadCredentials,
                other => ApiError::from(other),
            })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use secrecy::SecretString;

    use fitshop_auth::Permission;
    use fitshop_infra::{InMemoryStore, RecordingMailer};

    use super::*;

    fn accounts() -> Accounts {
        let codec = CredentialCodec::new(&SecretString::from("test-secret".to_string()));
        Accounts::new(
            Arc::new(codec),
            AccountSettings {
                frontend_url: "http://shop.test".to_string(),
                mail_from: "no-reply@shop.test".to_string(),
                hash_cost: HashCost::fast(),
            },
        )
    }

    fn token_from(mailer: &RecordingMailer) -> String {
        let sent = mailer.sent();
        let text = &sent.last().expect("a reset mail").text;
        let start = text.find("resetToken=").expect("link in body") + "resetToken=".len();
        text[start..].chars().take_while(|c| c.is_ascii_hexdigit()).collect()
    }

    #[tokio::test]
    async fn signup_then_signin_returns_same_principal() {
        let accounts = accounts();
        let store = InMemoryStore::new();
        let now = Utc::now();

        let signed_up = accounts
            .signup(&store, "  Wes@Example.COM ", "hunter2", "Wes", now)
            .await
            .unwrap();
        assert_eq!(signed_up.user.email.as_str(), "wes@example.com");
        assert_eq!(
            signed_up.user.permissions.iter().collect::<Vec<_>>(),
            vec![Permission::User]
        );

        let signed_in = accounts.signin(&store, "WES@example.com", "hunter2").await.unwrap();
        assert_eq!(signed_in.user.id, signed_up.user.id);
        assert_eq!(
            accounts.codec().verify(&signed_in.credential).unwrap().user_id,
            signed_up.user.id
        );
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_case_insensitively() {
        let accounts = accounts();
        let store = InMemoryStore::new();
        let now = Utc::now();
        accounts.signup(&store, "a@x.com", "pw", "A", now).await.unwrap();
        let err = accounts.signup(&store, "A@X.com", "pw2", "B", now).await.unwrap_err();
        assert_eq!(err, ApiError::DuplicateEmail);
    }

    #[tokio::test]
    async fn signup_validates_input() {
        let accounts = accounts();
        let store = InMemoryStore::new();
        let now = Utc::now();
        assert!(matches!(
            accounts.signup(&store, "not-an-email", "pw", "A", now).await,
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            accounts.signup(&store, "a@x.com", "", "A", now).await,
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            accounts.signup(&store, "a@x.com", "pw", "  ", now).await,
            Err(ApiError::Validation(_))
        ));
        assert!(store.list_users().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn signin_failures_stay_distinct_internally() {
        let accounts = accounts();
        let store = InMemoryStore::new();
        accounts.signup(&store, "a@x.com", "right", "A", Utc::now()).await.unwrap();

        assert_eq!(
            accounts.signin(&store, "nobody@x.com", "right").await.unwrap_err(),
            ApiError::NoSuchUser
        );
        assert_eq!(
            accounts.signin(&store, "a@x.com", "wrong").await.unwrap_err(),
            ApiError::BadCredentials
        );
        assert_eq!(
            accounts.signin(&store, "a@x.com", "").await.unwrap_err(),
            ApiError::BadCredentials
        );
    }

    #[tokio::test]
    async fn reset_flow_changes_password_once() {
        let accounts = accounts();
        let store = InMemoryStore::new();
        let mailer = RecordingMailer::new();
        let now = Utc::now();
        let user = accounts.signup(&store, "a@x.com", "old", "A", now).await.unwrap().user;

        accounts.request_reset(&store, &mailer, "a@x.com", now).await.unwrap();
        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "a@x.com");
        assert_eq!(sent[0].from, "no-reply@shop.test");
        assert_eq!(sent[0].subject, "Your Password Reset Token");
        assert!(sent[0].text.contains("http://shop.test/reset?resetToken="));
        assert!(sent[0].html.contains("resetToken="));

        let token = token_from(&mailer);
        assert_eq!(token.len(), 40);

        let session = accounts
            .reset_password(&store, "new", "new", &token, now + Duration::minutes(5))
            .await
            .unwrap();
        assert_eq!(session.user.id, user.id);
        assert!(session.user.reset.is_none());

        let again = accounts
            .reset_password(&store, "newer", "newer", &token, now + Duration::minutes(6))
            .await
            .unwrap_err();
        assert_eq!(again, ApiError::InvalidOrExpiredToken);

        accounts.signin(&store, "a@x.com", "new").await.unwrap();
        assert_eq!(
            accounts.signin(&store, "a@x.com", "old").await.unwrap_err(),
            ApiError::BadCredentials
        );
    }

    #[tokio::test]
    async fn concurrent_redemptions_succeed_at_most_once() {
        let accounts = Arc::new(accounts());
        let store = Arc::new(InMemoryStore::new());
        let mailer = RecordingMailer::new();
        let now = Utc::now();
        accounts.signup(store.as_ref(), "a@x.com", "old", "A", now).await.unwrap();
        accounts.request_reset(store.as_ref(), &mailer, "a@x.com", now).await.unwrap();
        let token = token_from(&mailer);

        let mut handles = Vec::new();
        for i in 0..4 {
            let (accounts, store, token) = (accounts.clone(), store.clone(), token.clone());
            handles.push(tokio::spawn(async move {
                let pw = format!("pw{i}");
                accounts.reset_password(store.as_ref(), &pw, &pw, &token, now).await
            }));
        }

        let mut ok = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(err) => assert_eq!(err, ApiError::InvalidOrExpiredToken),
            }
        }
        assert_eq!(ok, 1);
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let accounts = accounts();
        let store = InMemoryStore::new();
        let mailer = RecordingMailer::new();
        let now = Utc::now();
        accounts.signup(&store, "a@x.com", "old", "A", now).await.unwrap();
        accounts.request_reset(&store, &mailer, "a@x.com", now).await.unwrap();
        let token = token_from(&mailer);

        let late = now + Duration::hours(1) + Duration::seconds(1);
        let err = accounts
            .reset_password(&store, "new", "new", &token, late)
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::InvalidOrExpiredToken);
        accounts.signin(&store, "a@x.com", "old").await.unwrap();
    }

    #[tokio::test]
    async fn mismatch_is_checked_before_the_token() {
        let accounts = accounts();
        let store = InMemoryStore::new();
        let err = accounts
            .reset_password(&store, "a", "b", "whatever", Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::PasswordMismatch);
    }

    #[tokio::test]
    async fn reset_for_unknown_email_sends_nothing() {
        let accounts = accounts();
        let store = InMemoryStore::new();
        let mailer = RecordingMailer::new();
        let err = accounts
            .request_reset(&store, &mailer, "ghost@x.com", Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::NoSuchUser);
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn mail_failure_is_reported() {
        let accounts = accounts();
        let store = InMemoryStore::new();
        let mailer = RecordingMailer::failing();
        accounts.signup(&store, "a@x.com", "pw", "A", Utc::now()).await.unwrap();
        let err = accounts
            .request_reset(&store, &mailer, "a@x.com", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::MailDeliveryFailed(_)));
    }

    #[tokio::test]
    async fn reset_mail_escapes_the_account_name() {
        let accounts = accounts();
        let store = InMemoryStore::new();
        let mailer = RecordingMailer::new();
        accounts
            .signup(&store, "eve@x.com", "pw", "<b>Eve</b>", Utc::now())
            .await
            .unwrap();
        accounts.request_reset(&store, &mailer, "eve@x.com", Utc::now()).await.unwrap();

        let sent = mailer.sent();
        assert!(sent[0].html.contains("&lt;b&gt;Eve"));
        assert!(!sent[0].html.contains("<b>Eve"));
    }
}
