//! Device-login credential exchange
//!
//! Trades the long-lived master token for a short-lived OAuth token by
//! impersonating the Android client. Every fixed parameter below has to
//! match what the service accepts from that client, or the exchange is
//! refused. Caching the result is the caller's business.

use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::form;
use super::transport::{HttpRequest, HttpTransport};
use crate::models::{Credential, SessionToken};
use crate::util::excerpt;

/// Why a credential exchange did not produce a token
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Could not reach the login service: {0}")]
    Transport(String),

    #[error("Login rejected: {0}")]
    Rejected(String),

    #[error("Unexpected login response (status {status}, keys [{}]): {excerpt}", .keys.join(", "))]
    MalformedResponse {
        status: u16,
        keys: Vec<String>,
        excerpt: String,
    },
}

/// Form parameters for one exchange, in the shape the endpoint expects
#[derive(Clone)]
pub struct AuthRequest {
    pub email: String,
    pub encrypted_passwd: String,
    pub android_id: String,
}

impl AuthRequest {
    const ACCOUNT_TYPE: &'static str = "HOSTED_OR_GOOGLE";
    const HAS_PERMISSION: &'static str = "1";
    const SERVICE: &'static str =
        "oauth2:https://www.googleapis.com/auth/memento https://www.googleapis.com/auth/reminders";
    const SOURCE: &'static str = "android";
    const APP: &'static str = "com.google.android.keep";
    const CLIENT_SIG: &'static str = "38918a453d07199354f8b19af05ec6562ced5788";
    const COUNTRY: &'static str = "us";
    const LANG: &'static str = "en";
    const SDK_VERSION: &'static str = "17";
    const PLAY_SERVICES_VERSION: &'static str = "240913000";

    pub fn for_credential(credential: &Credential) -> Self {
        Self {
            email: credential.account.clone(),
            encrypted_passwd: credential.secret.clone(),
            android_id: credential.device_id.to_ascii_lowercase(),
        }
    }

    /// All parameters sorted by key
    pub fn to_pairs(&self) -> Vec<(&'static str, &str)> {
        let mut pairs = vec![
            ("accountType", Self::ACCOUNT_TYPE),
            ("Email", self.email.as_str()),
            ("has_permission", Self::HAS_PERMISSION),
            ("EncryptedPasswd", self.encrypted_passwd.as_str()),
            ("service", Self::SERVICE),
            ("source", Self::SOURCE),
            ("androidId", self.android_id.as_str()),
            ("app", Self::APP),
            ("client_sig", Self::CLIENT_SIG),
            ("device_country", Self::COUNTRY),
            ("operatorCountry", Self::COUNTRY),
            ("lang", Self::LANG),
            ("sdk_version", Self::SDK_VERSION),
            ("google_play_services_version", Self::PLAY_SERVICES_VERSION),
        ];
        pairs.sort_by(|a, b| a.0.cmp(b.0));
        pairs
    }

    pub fn encode(&self) -> String {
        form::encode(self.to_pairs())
    }
}

/// Stateless client for the device-login endpoint
pub struct AuthClient {
    transport: Arc<dyn HttpTransport>,
    auth_url: String,
}

impl AuthClient {
    /// Production device-login endpoint
    pub const DEFAULT_URL: &'static str = "https://android.clients.google.com/auth";

    const USER_AGENT: &'static str = "GoogleAuth/1.4";

    pub fn new(transport: Arc<dyn HttpTransport>, auth_url: impl Into<String>) -> Self {
        Self {
            transport,
            auth_url: auth_url.into(),
        }
    }

    /// Exchange the credential for a session token
    pub fn exchange(&self, credential: &Credential) -> Result<SessionToken, AuthError> {
        debug!(
            "Requesting session token for {} (device {})",
            credential.account, credential.device_id
        );

        let request = HttpRequest::post(&self.auth_url, AuthRequest::for_credential(credential).encode())
            .header("Content-Type", "application/x-www-form-urlencoded")
            .header("User-Agent", Self::USER_AGENT)
            .header("Accept-Encoding", "identity");

        let response = self.transport.post(request).map_err(|e| {
            warn!("Login request failed: {}", e);
            AuthError::Transport(e.to_string())
        })?;

        debug!("Login response status {}", response.status);
        let token = parse_auth_response(response.status, &response.body, Utc::now())?;

        match token.expiry {
            Some(expiry) => info!("Session token acquired, expires {}", expiry),
            None => info!("Session token acquired, no expiry given"),
        }
        Ok(token)
    }
}

/// Turn a login response body into a token or an error.
///
/// `now` anchors relative expiries (`ExpiresInDurationSec`).
pub fn parse_auth_response(
    status: u16,
    body: &str,
    now: DateTime<Utc>,
) -> Result<SessionToken, AuthError> {
    let fields = form::decode(body);
    debug!("Login response keys: {:?}", fields.keys().collect::<Vec<_>>());

    if let Some(error) = fields.get("Error") {
        warn!("Login rejected: {}", error);
        return Err(AuthError::Rejected(error.clone()));
    }

    let Some(auth) = fields.get("Auth").filter(|a| !a.is_empty()) else {
        warn!("Login response without Auth (status {}): {}", status, excerpt(body, 200));
        return Err(AuthError::MalformedResponse {
            status,
            keys: fields.keys().cloned().collect(),
            excerpt: excerpt(&redact(&fields), 200),
        });
    };

    Ok(SessionToken::new(auth.clone(), expiry_from(&fields, now)))
}

/// Relative lifetime wins over an absolute expiry; values that are not
/// finite numbers or that fall outside the representable date range count
/// as absent.
fn expiry_from(fields: &BTreeMap<String, String>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let seconds = |key: &str| {
        fields
            .get(key)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
    };

    if let Some(lifetime) = seconds("ExpiresInDurationSec") {
        let expiry = Duration::try_milliseconds((lifetime * 1000.0) as i64)
            .and_then(|delta| now.checked_add_signed(delta));
        if expiry.is_none() {
            warn!("Ignoring out-of-range token lifetime {}", lifetime);
        }
        return expiry;
    }
    seconds("Expiry").and_then(|epoch| DateTime::from_timestamp(epoch as i64, 0))
}

/// Render fields for diagnostics with token-like values masked
fn redact(fields: &BTreeMap<String, String>) -> String {
    fields
        .iter()
        .map(|(key, value)| {
            if matches!(key.as_str(), "Auth" | "Token" | "SID" | "LSID") {
                format!("{}=[REDACTED]", key)
            } else {
                format!("{}={}", key, value)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{HttpResponse, ScriptedTransport};

    const URL: &str = "https://auth.test/auth";

    fn credential() -> Credential {
        Credential::new("user@example.com", "aas_et/master", "0123456789ABCDEF")
    }

    fn client(transport: &Arc<ScriptedTransport>) -> AuthClient {
        AuthClient::new(transport.clone(), URL)
    }

    #[test]
    fn test_request_pairs_are_sorted_and_complete() {
        let request = AuthRequest::for_credential(&credential());
        let pairs = request.to_pairs();

        let keys: Vec<&str> = pairs.iter().map(|(k, _)| *k).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert_eq!(pairs.len(), 14);

        let lookup = |key: &str| pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| *v);
        assert_eq!(lookup("androidId"), Some("0123456789abcdef"));
        assert_eq!(lookup("EncryptedPasswd"), Some("aas_et/master"));
        assert_eq!(lookup("sdk_version"), Some("17"));
        assert_eq!(lookup("google_play_services_version"), Some("240913000"));
    }

    #[test]
    fn test_exchange_success_with_relative_expiry() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(URL, HttpResponse::ok("Auth=xyz\nExpiresInDurationSec=3600\n"));

        let before = Utc::now();
        let token = client(&transport).exchange(&credential()).unwrap();
        let after = Utc::now();

        assert_eq!(token.value, "xyz");
        let expiry = token.expiry.unwrap();
        assert!(expiry >= before + Duration::seconds(3600));
        assert!(expiry <= after + Duration::seconds(3600));

        let sent = transport.requests_to(URL);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].header_value("User-Agent"), Some("GoogleAuth/1.4"));
        assert!(sent[0].body.contains("Email=user%40example.com"));
        assert!(sent[0].body.starts_with("Email="));
    }

    #[test]
    fn test_exchange_rejected() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(URL, HttpResponse::new(403, "Error=BadAuthentication\n"));

        let err = client(&transport).exchange(&credential()).unwrap_err();
        assert_eq!(err, AuthError::Rejected("BadAuthentication".to_string()));
        assert_eq!(err.to_string(), "Login rejected: BadAuthentication");
    }

    #[test]
    fn test_exchange_transport_failure() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.fail(URL, "connection refused");

        let err = client(&transport).exchange(&credential()).unwrap_err();
        assert_eq!(err, AuthError::Transport("connection refused".to_string()));
    }

    #[test]
    fn test_absolute_expiry() {
        let token = parse_auth_response(200, "Auth=abc\nExpiry=1700000000\n", Utc::now()).unwrap();
        assert_eq!(token.expiry.unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_relative_expiry_wins_over_absolute() {
        let now = DateTime::from_timestamp(1_000, 0).unwrap();
        let body = "Auth=abc\nExpiry=5000\nExpiresInDurationSec=60\n";
        let token = parse_auth_response(200, body, now).unwrap();
        assert_eq!(token.expiry.unwrap().timestamp(), 1_060);
    }

    #[test]
    fn test_no_expiry() {
        let token = parse_auth_response(200, "Auth=abc\nExpiresInDurationSec=soon\n", Utc::now())
            .unwrap();
        assert_eq!(token.expiry, None);
    }

    #[test]
    fn test_out_of_range_lifetime_means_no_expiry() {
        for lifetime in ["1e300", "-1e300", "inf", "NaN"] {
            let body = format!("Auth=xyz\nExpiresInDurationSec={}\n", lifetime);
            let token = parse_auth_response(200, &body, Utc::now()).unwrap();
            assert_eq!(token.value, "xyz");
            assert_eq!(token.expiry, None, "lifetime {}", lifetime);
        }
    }

    #[test]
    fn test_out_of_range_absolute_expiry_ignored() {
        let token = parse_auth_response(200, "Auth=xyz\nExpiry=1e300\n", Utc::now()).unwrap();
        assert_eq!(token.expiry, None);
    }

    #[test]
    fn test_missing_auth_is_malformed() {
        let err = parse_auth_response(200, "SID=abc\nissueAdvice=auto\n", Utc::now()).unwrap_err();
        match err {
            AuthError::MalformedResponse { status, keys, excerpt } => {
                assert_eq!(status, 200);
                assert_eq!(keys, vec!["SID".to_string(), "issueAdvice".to_string()]);
                assert!(!excerpt.contains("abc"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_error_takes_precedence_over_auth() {
        let err = parse_auth_response(200, "Auth=abc\nError=NeedsBrowser\n", Utc::now()).unwrap_err();
        assert_eq!(err, AuthError::Rejected("NeedsBrowser".to_string()));
    }
}
