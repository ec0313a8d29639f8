use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use fitshop_core::UserId;

/// Claims carried by a session credential.
///
/// Only the opaque user id is embedded. Profile fields and permissions are
/// looked up per request so they can never go stale inside a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    #[serde(rename = "userId")]
    pub user_id: UserId,
}

impl SessionClaims {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("no signing secret configured")]
    MissingSecret,

    #[error("credential signature does not match")]
    BadSignature,

    #[error("malformed credential: {0}")]
    Malformed(String),
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

/// Signs and verifies session credentials (HS256 JWT).
///
/// Credentials carry no expiry; a credential stays valid for as long as the
/// signing secret is unchanged.
pub struct CredentialCodec {
    keys: Option<Keys>,
    validation: Validation,
}

impl CredentialCodec {
    /// Build a codec from the process-wide secret.
    ///
    /// An empty secret yields a codec that refuses to issue or verify anything.
    pub fn new(secret: &SecretString) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        let keys = (!bytes.is_empty()).then(|| Keys {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
        });

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Self { keys, validation }
    }

    pub fn issue(&self, claims: &SessionClaims) -> Result<String, CredentialError> {
        let keys = self.keys.as_ref().ok_or(CredentialError::MissingSecret)?;
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &keys.encoding)
            .map_err(|e| CredentialError::Malformed(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims, CredentialError> {
        let keys = self.keys.as_ref().ok_or(CredentialError::MissingSecret)?;
        jsonwebtoken::decode::<SessionClaims>(token, &keys.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => CredentialError::BadSignature,
                _ => CredentialError::Malformed(e.to_string()),
            })
    }
}

impl core::fmt::Debug for CredentialCodec {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CredentialCodec")
            .field("configured", &self.keys.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec(secret: &str) -> CredentialCodec {
        CredentialCodec::new(&SecretString::from(secret.to_string()))
    }

    #[test]
    fn issued_credentials_verify_to_the_same_claims() {
        let codec = codec("s3cret");
        let claims = SessionClaims::new(UserId::new());
        let token = codec.issue(&claims).unwrap();
        assert_eq!(codec.verify(&token).unwrap(), claims);
    }

    #[test]
    fn signing_is_deterministic() {
        let codec = codec("s3cret");
        let claims = SessionClaims::new(UserId::new());
        assert_eq!(codec.issue(&claims).unwrap(), codec.issue(&claims).unwrap());
    }

    #[test]
    fn credential_from_another_secret_is_rejected() {
        let token = codec("one").issue(&SessionClaims::new(UserId::new())).unwrap();
        assert_eq!(codec("two").verify(&token), Err(CredentialError::BadSignature));
    }

    #[test]
    fn garbage_and_wrong_payload_shapes_are_malformed() {
        let codec = codec("s3cret");
        assert!(matches!(codec.verify("not.a.jwt"), Err(CredentialError::Malformed(_))));

        let other_shape = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &serde_json::json!({ "userId": "not-a-uuid" }),
            &EncodingKey::from_secret(b"s3cret"),
        )
        .unwrap();
        assert!(matches!(codec.verify(&other_shape), Err(CredentialError::Malformed(_))));
    }

    #[test]
    fn old_credentials_without_expiry_stay_valid() {
        let codec = codec("s3cret");
        let ancient = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &serde_json::json!({ "userId": UserId::new(), "iat": 0 }),
            &EncodingKey::from_secret(b"s3cret"),
        )
        .unwrap();
        assert!(codec.verify(&ancient).is_ok());
    }

    #[test]
    fn empty_secret_refuses_everything() {
        let codec = codec("");
        let claims = SessionClaims::new(UserId::new());
        assert_eq!(codec.issue(&claims), Err(CredentialError::MissingSecret));
        assert_eq!(codec.verify("a.b.c"), Err(CredentialError::MissingSecret));
    }
}
