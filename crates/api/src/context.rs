use chrono::{DateTime, Utc};
use tracing::{Span, field};

use fitshop_auth::{CredentialError, Principal};
use fitshop_core::UserId;
use fitshop_infra::{Mailer, Store};

use crate::error::{ApiError, ApiResult};

/// Identity resolved by the identity middleware for one request.
///
/// A rejected credential is kept rather than turned into an immediate 401 so
/// that anonymous-friendly operations still run; it only fails once an
/// operation actually needs a signed-in caller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Identity {
    #[default]
    Anonymous,
    User(UserId),
    Rejected(CredentialError),
}

impl Identity {
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Self::User(id) => Some(*id),
            _ => None,
        }
    }

    /// The caller's id, or the deferred failure.
    pub fn require(&self) -> ApiResult<UserId> {
        match self {
            Self::User(id) => Ok(*id),
            Self::Anonymous => Err(ApiError::Unauthenticated),
            Self::Rejected(_) => Err(ApiError::InvalidCredential),
        }
    }
}

/// What an operation may touch while serving one request.
///
/// Built per request from the shared services; nothing in here is global.
pub struct RequestContext<'a> {
    identity: &'a Identity,
    store: &'a dyn Store,
    mailer: &'a dyn Mailer,
    now: DateTime<Utc>,
}

impl<'a> RequestContext<'a> {
    pub fn new(
        identity: &'a Identity,
        store: &'a dyn Store,
        mailer: &'a dyn Mailer,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            identity,
            store,
            mailer,
            now,
        }
    }

    pub fn identity(&self) -> &'a Identity {
        self.identity
    }

    pub fn store(&self) -> &'a dyn Store {
        self.store
    }

    pub fn mailer(&self) -> &'a dyn Mailer {
        self.mailer
    }

    /// Request time, fixed once so every check in an operation agrees.
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Fill the current span's `user_id` field with the caller, if signed in.
    pub fn record_caller(&self) {
        if let Some(user_id) = self.identity.user_id() {
            Span::current().record("user_id", field::display(user_id));
        }
    }

    /// Load the caller with their current permissions. Every operation that
    /// acts as a user goes through here, so an unknown user is rejected the
    /// same way everywhere.
    pub async fn principal(&self) -> ApiResult<Principal> {
        let principal = crate::authz::resolve_principal(self.store, self.identity).await?;
        Span::current().record("user_id", field::display(principal.id()));
        Ok(principal)
    }
}
