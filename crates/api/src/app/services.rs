//! Shared services handed to every handler.

use std::sync::Arc;

use chrono::Utc;

use fitshop_infra::{Mailer, Store};

use crate::accounts::Accounts;
use crate::context::{Identity, RequestContext};

pub struct AppServices {
    pub store: Arc<dyn Store>,
    pub mailer: Arc<dyn Mailer>,
    pub accounts: Accounts,
    /// Add `Secure` to the session cookie.
    pub cookie_secure: bool,
}

impl AppServices {
    pub fn new(
        store: Arc<dyn Store>,
        mailer: Arc<dyn Mailer>,
        accounts: Accounts,
        cookie_secure: bool,
    ) -> Self {
        Self {
            store,
            mailer,
            accounts,
            cookie_secure,
        }
    }

    /// Per-request view of the services for `identity`.
    pub fn context<'a>(&'a self, identity: &'a Identity) -> RequestContext<'a> {
        RequestContext::new(identity, self.store.as_ref(), self.mailer.as_ref(), Utc::now())
    }
}
