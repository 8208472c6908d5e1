//! HMAC request authentication
//!
//! Every request to the dictionary endpoint carries a client id, a timestamp
//! and a hex-encoded HMAC-SHA256 signature over
//! `clientId:timestamp:canonicalQuery:canonicalBody`. The gate is a pure
//! per-request check: it holds the shared secret and the freshness window,
//! nothing else.

pub mod canonical;

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;

use crate::error::AuthError;

pub use canonical::{base_string, canonical_json, canonical_query};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the caller's identifier.
pub const CLIENT_ID_HEADER: &str = "x-client-id";
/// Header carrying the hex-encoded signature.
pub const SIGNATURE_HEADER: &str = "x-signature";
/// Header carrying the signing timestamp (ISO 8601).
pub const TIMESTAMP_HEADER: &str = "x-timestamp";

/// Maximum accepted distance between the request timestamp and the server
/// clock, in either direction. The bound is inclusive.
pub const TIMESTAMP_WINDOW_SECS: i64 = 300;

/// The signing secret shared with clients.
///
/// `Debug` is redacted so the value never ends up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct SharedSecret(String);

impl SharedSecret {
    /// Wrap a secret; empty strings count as "not configured".
    pub fn new(secret: impl Into<String>) -> Option<Self> {
        let secret = secret.into();
        if secret.is_empty() {
            None
        } else {
            Some(Self(secret))
        }
    }

    fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret(<redacted>)")
    }
}

/// Request metadata the gate needs to verify a signature.
#[derive(Debug, Clone, Default)]
pub struct SignedRequest {
    pub client_id: Option<String>,
    pub signature: Option<String>,
    /// Timestamp exactly as sent; it is part of the signed base string.
    pub timestamp: Option<String>,
    /// Canonical query string (see [`canonical_query`]).
    pub query: String,
    pub body: Value,
}

/// Verifies request authenticity and freshness.
#[derive(Debug, Clone)]
pub struct AuthGate {
    secret: Option<SharedSecret>,
    window: TimeDelta,
}

impl AuthGate {
    /// Create a gate with the default 300 second window.
    ///
    /// A gate without a secret rejects every credentialed request with
    /// [`AuthError::ServerMisconfigured`].
    pub fn new(secret: Option<SharedSecret>) -> Self {
        Self {
            secret,
            window: TimeDelta::seconds(TIMESTAMP_WINDOW_SECS),
        }
    }

    /// Override the freshness window.
    pub fn with_window(mut self, window: TimeDelta) -> Self {
        self.window = window;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }

    /// Verify against the current wall clock.
    pub fn verify(&self, request: &SignedRequest) -> Result<(), AuthError> {
        self.verify_at(request, Utc::now())
    }

    /// Verify as if the server clock read `now`.
    pub fn verify_at(&self, request: &SignedRequest, now: DateTime<Utc>) -> Result<(), AuthError> {
        let (client_id, signature, timestamp) = match (
            non_empty(&request.client_id),
            non_empty(&request.signature),
            non_empty(&request.timestamp),
        ) {
            (Some(c), Some(s), Some(t)) => (c, s, t),
            _ => return Err(AuthError::MissingCredentials),
        };

        let secret = self.secret.as_ref().ok_or_else(|| {
            tracing::error!("CLIENT_SECRET is not set; rejecting signed request");
            AuthError::ServerMisconfigured
        })?;

        let sent = parse_timestamp(timestamp).ok_or(AuthError::StaleOrFutureTimestamp)?;
        if now - sent > self.window || sent - now > self.window {
            return Err(AuthError::StaleOrFutureTimestamp);
        }

        let body = canonical_json(&request.body);
        let base = base_string(client_id, timestamp, &request.query, &body);

        let supplied = hex::decode(signature).map_err(|_| AuthError::InvalidSignature)?;
        let mut mac =
            HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| AuthError::ServerMisconfigured)?;
        mac.update(base.as_bytes());
        // constant-time comparison
        mac.verify_slice(&supplied)
            .map_err(|_| AuthError::InvalidSignature)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Parse an RFC 3339 timestamp, falling back to integer epoch milliseconds.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    raw.parse::<i64>()
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
}

/// Compute the signature a client sends in `X-Signature`.
///
/// `query` is the canonical query string; `body` is the JSON request body.
pub fn sign(
    secret: &SharedSecret,
    client_id: &str,
    timestamp: &str,
    query: &str,
    body: &Value,
) -> Result<String, AuthError> {
    let base = base_string(client_id, timestamp, query, &canonical_json(body));
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| AuthError::ServerMisconfigured)?;
    mac.update(base.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Format an instant the way clients are expected to send it.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CLIENT: &str = "web-app";

    fn secret() -> SharedSecret {
        SharedSecret::new("s3cr3t").unwrap()
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-03-01T12:00:00.000Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn signed(at: DateTime<Utc>, query: &str, body: Value) -> SignedRequest {
        let timestamp = format_timestamp(at);
        let signature = sign(&secret(), CLIENT, &timestamp, query, &body).unwrap();
        SignedRequest {
            client_id: Some(CLIENT.to_string()),
            signature: Some(signature),
            timestamp: Some(timestamp),
            query: query.to_string(),
            body,
        }
    }

    fn gate() -> AuthGate {
        AuthGate::new(Some(secret()))
    }

    fn body() -> Value {
        json!({"word": "chat", "lang": "french"})
    }

    #[test]
    fn test_valid_request_is_accepted() {
        let request = signed(now(), "{}", body());
        assert_eq!(gate().verify_at(&request, now()), Ok(()));
    }

    #[test]
    fn test_missing_headers() {
        for field in 0..3 {
            let mut request = signed(now(), "{}", body());
            match field {
                0 => request.client_id = None,
                1 => request.signature = Some(String::new()),
                _ => request.timestamp = None,
            }
            assert_eq!(
                gate().verify_at(&request, now()),
                Err(AuthError::MissingCredentials)
            );
        }
    }

    #[test]
    fn test_missing_secret_is_misconfiguration() {
        let request = signed(now(), "{}", body());
        assert_eq!(
            AuthGate::new(None).verify_at(&request, now()),
            Err(AuthError::ServerMisconfigured)
        );
        assert!(SharedSecret::new("").is_none());
    }

    #[test]
    fn test_missing_credentials_checked_before_secret() {
        let request = SignedRequest::default();
        assert_eq!(
            AuthGate::new(None).verify_at(&request, now()),
            Err(AuthError::MissingCredentials)
        );
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        let window = TimeDelta::seconds(TIMESTAMP_WINDOW_SECS);
        let past = signed(now() - window, "{}", body());
        let future = signed(now() + window, "{}", body());
        assert_eq!(gate().verify_at(&past, now()), Ok(()));
        assert_eq!(gate().verify_at(&future, now()), Ok(()));
    }

    #[test]
    fn test_just_outside_window_is_rejected() {
        let window = TimeDelta::seconds(TIMESTAMP_WINDOW_SECS) + TimeDelta::milliseconds(1);
        let past = signed(now() - window, "{}", body());
        let future = signed(now() + window, "{}", body());
        assert_eq!(
            gate().verify_at(&past, now()),
            Err(AuthError::StaleOrFutureTimestamp)
        );
        assert_eq!(
            gate().verify_at(&future, now()),
            Err(AuthError::StaleOrFutureTimestamp)
        );
    }

    #[test]
    fn test_unparseable_timestamp() {
        let mut request = signed(now(), "{}", body());
        request.timestamp = Some("yesterday".to_string());
        assert_eq!(
            gate().verify_at(&request, now()),
            Err(AuthError::StaleOrFutureTimestamp)
        );
    }

    #[test]
    fn test_epoch_millis_timestamp() {
        let timestamp = now().timestamp_millis().to_string();
        let signature = sign(&secret(), CLIENT, &timestamp, "{}", &body()).unwrap();
        let request = SignedRequest {
            client_id: Some(CLIENT.to_string()),
            signature: Some(signature),
            timestamp: Some(timestamp),
            query: "{}".to_string(),
            body: body(),
        };
        assert_eq!(gate().verify_at(&request, now()), Ok(()));
    }

    #[test]
    fn test_single_byte_signature_mutation() {
        let request = signed(now(), "{}", body());
        let original = request.signature.clone().unwrap();
        for i in 0..original.len() {
            let mut bytes = original.clone().into_bytes();
            bytes[i] = if bytes[i] == b'0' { b'1' } else { b'0' };
            let mut mutated = request.clone();
            mutated.signature = Some(String::from_utf8(bytes).unwrap());
            assert_eq!(
                gate().verify_at(&mutated, now()),
                Err(AuthError::InvalidSignature),
                "mutation at byte {i} was accepted"
            );
        }
    }

    #[test]
    fn test_body_mutation() {
        let mut request = signed(now(), "{}", body());
        request.body = json!({"word": "chas", "lang": "french"});
        assert_eq!(
            gate().verify_at(&request, now()),
            Err(AuthError::InvalidSignature)
        );
    }

    #[test]
    fn test_query_mutation() {
        let query = canonical_query(Some("v=1")).unwrap();
        let mut request = signed(now(), &query, body());
        assert_eq!(gate().verify_at(&request, now()), Ok(()));
        request.query = canonical_query(Some("v=2")).unwrap();
        assert_eq!(
            gate().verify_at(&request, now()),
            Err(AuthError::InvalidSignature)
        );
    }

    #[test]
    fn test_client_id_is_covered() {
        let mut request = signed(now(), "{}", body());
        request.client_id = Some("other-app".to_string());
        assert_eq!(
            gate().verify_at(&request, now()),
            Err(AuthError::InvalidSignature)
        );
    }

    #[test]
    fn test_non_hex_signature() {
        let mut request = signed(now(), "{}", body());
        request.signature = Some("not-hex".to_string());
        assert_eq!(
            gate().verify_at(&request, now()),
            Err(AuthError::InvalidSignature)
        );
    }

    #[test]
    fn test_uppercase_hex_accepted() {
        let mut request = signed(now(), "{}", body());
        request.signature = request.signature.map(|s| s.to_uppercase());
        assert_eq!(gate().verify_at(&request, now()), Ok(()));
    }

    #[test]
    fn test_signature_independent_of_key_order() {
        let timestamp = format_timestamp(now());
        let a: Value = serde_json::from_str(r#"{"word":"bark","lang":"english","phrase":"p"}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"phrase":"p","lang":"english","word":"bark"}"#).unwrap();
        let qa = canonical_query(Some("b=2&a=1")).unwrap();
        let qb = canonical_query(Some("a=1&b=2")).unwrap();
        assert_eq!(
            sign(&secret(), CLIENT, &timestamp, &qa, &a).unwrap(),
            sign(&secret(), CLIENT, &timestamp, &qb, &b).unwrap()
        );
    }

    #[test]
    fn test_secret_is_redacted() {
        assert_eq!(format!("{:?}", secret()), "SharedSecret(<redacted>)");
        assert!(!format!("{:?}", gate()).contains("s3cr3t"));
    }
}
