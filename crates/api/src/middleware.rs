use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};

use fitshop_auth::CredentialCodec;

use crate::context::Identity;

/// Name of the cookie carrying the session credential.
pub const SESSION_COOKIE: &str = "token";

const SESSION_MAX_AGE_SECS: u64 = 60 * 60 * 24 * 365;

#[derive(Clone)]
pub struct IdentityState {
    pub codec: Arc<CredentialCodec>,
}

/// Attach an [`Identity`] to every request. Never rejects.
///
/// Credentials carry no expiry, so any credential whose signature still
/// verifies is accepted however old it is.
pub async fn identity_middleware(
    State(state): State<IdentityState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let identity = match extract_credential(req.headers()) {
        None => Identity::Anonymous,
        Some(token) => match state.codec.verify(token) {
            Ok(claims) => Identity::User(claims.user_id),
            Err(err) => {
                tracing::debug!(error = %err, "credential rejected");
                Identity::Rejected(err)
            }
        },
    };

    req.extensions_mut().insert(identity);
    next.run(req).await
}

/// The session cookie wins over an `Authorization: Bearer` header.
fn extract_credential(headers: &HeaderMap) -> Option<&str> {
    cookie_value(headers, SESSION_COOKIE).or_else(|| extract_bearer(headers))
}

fn cookie_value<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let token = headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")?
        .trim();
    (!token.is_empty()).then_some(token)
}

/// `Set-Cookie` value delivering a fresh credential.
pub fn session_cookie(credential: &str, secure: bool) -> String {
    build_cookie(credential, SESSION_MAX_AGE_SECS, secure)
}

/// `Set-Cookie` value that makes the client drop its credential.
pub fn clear_session_cookie(secure: bool) -> String {
    build_cookie("", 0, secure)
}

fn build_cookie(value: &str, max_age: u64, secure: bool) -> String {
    let mut cookie =
        format!("{SESSION_COOKIE}={value}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age}");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(pairs: &[(header::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn cookie_is_found_among_others() {
        let h = headers(&[(header::COOKIE, "theme=dark; token=abc.def.ghi; lang=en")]);
        assert_eq!(extract_credential(&h), Some("abc.def.ghi"));
    }

    #[test]
    fn cookie_split_over_multiple_headers() {
        let h = headers(&[(header::COOKIE, "theme=dark"), (header::COOKIE, "token=xyz")]);
        assert_eq!(extract_credential(&h), Some("xyz"));
    }

    #[test]
    fn bearer_is_the_fallback() {
        let h = headers(&[(header::AUTHORIZATION, "Bearer   tok  ")]);
        assert_eq!(extract_credential(&h), Some("tok"));

        let both = headers(&[
            (header::COOKIE, "token=from-cookie"),
            (header::AUTHORIZATION, "Bearer from-header"),
        ]);
        assert_eq!(extract_credential(&both), Some("from-cookie"));
    }

    #[test]
    fn empty_or_foreign_values_mean_anonymous() {
        assert_eq!(extract_credential(&HeaderMap::new()), None);
        assert_eq!(extract_credential(&headers(&[(header::COOKIE, "token=")])), None);
        assert_eq!(extract_credential(&headers(&[(header::COOKIE, "tokenx=1")])), None);
        assert_eq!(
            extract_credential(&headers(&[(header::AUTHORIZATION, "Basic abc")])),
            None
        );
    }

    #[test]
    fn cookie_attributes() {
        assert_eq!(
            session_cookie("abc", false),
            "token=abc; HttpOnly; SameSite=Lax; Path=/; Max-Age=31536000"
        );
        assert_eq!(
            clear_session_cookie(true),
            "token=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0; Secure"
        );
    }
}
