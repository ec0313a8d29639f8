//! Password reset tickets.

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// How long a freshly issued reset ticket stays redeemable.
pub const RESET_TOKEN_TTL: Duration = Duration::hours(1);

const RESET_TOKEN_BYTES: usize = 20;

/// Single-use, time-limited token authorizing a password change.
///
/// An expired ticket is kept on the user record until it is replaced or
/// redeemed; it simply stops being usable.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetTicket {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl ResetTicket {
    /// Issue a ticket with a fresh random token, valid until `now + RESET_TOKEN_TTL`.
    pub fn issue(now: DateTime<Utc>) -> Self {
        let mut bytes = [0u8; RESET_TOKEN_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        Self {
            token: hex::encode(bytes),
            expires_at: now + RESET_TOKEN_TTL,
        }
    }

    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        now <= self.expires_at
    }

    /// True iff `token` is this ticket's token and the ticket is still usable.
    pub fn redeemable_with(&self, token: &str, now: DateTime<Utc>) -> bool {
        self.token == token && self.is_usable_at(now)
    }
}

impl core::fmt::Debug for ResetTicket {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ResetTicket")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
