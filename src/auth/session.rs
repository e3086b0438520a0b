//! Session lifecycle and request dispatch for the FileMaker Data API.
//!
//! A `Session` owns the connection parameters and the current token, and
//! wraps every outbound call with authentication and uniform envelope
//! interpretation. Token state lives behind an async mutex held across
//! the whole check-then-authenticate sequence, so concurrent callers
//! await a single authentication instead of each performing their own.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::{header, Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::api::FmError;
use crate::config::{ApiVersion, ClientConfig};
use crate::models::{ApiResponse, SessionResponse};

use super::store::{EncryptedTokenStore, MemoryTokenStore, TokenStore};
use super::token::Token;

/// HTTP request timeout in seconds.
/// 30s allows for slow script executions while still bounding a hung call.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// How a request authenticates itself.
enum AuthScheme<'a> {
    /// Raw credentials; only the session-open endpoint uses this.
    Basic,
    /// The current session token.
    Bearer(&'a str),
}

/// An authenticated connection to one database on one server.
///
/// Clone is cheap: clones share the HTTP connection pool and the token
/// slot, so a token obtained through one handle is visible to all of
/// them. Independent sessions get independent tokens.
#[derive(Clone)]
pub struct Session {
    host: String,
    database: String,
    username: String,
    password: String,
    api_version: ApiVersion,
    profiling: bool,
    http: Client,
    store: Arc<Mutex<Box<dyn TokenStore>>>,
}

impl Session {
    pub fn new(config: &ClientConfig) -> Result<Self, FmError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        let store: Box<dyn TokenStore> = match config.persistent {
            Some(ref mode) => Box::new(EncryptedTokenStore::new(
                mode.token_encryption_key.clone(),
                mode.existing_encrypted_token.clone(),
            )),
            None => Box::new(MemoryTokenStore::new()),
        };

        Ok(Self {
            host: normalize_host(&config.host),
            database: config.database.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            api_version: config.api_version,
            profiling: config.profiling,
            http,
            store: Arc::new(Mutex::new(store)),
        })
    }

    /// Ensure a live token exists, authenticating only when the cached
    /// one is missing or expired. Returns whether a new token was
    /// created.
    pub async fn open(&self) -> Result<bool, FmError> {
        let mut store = self.store.lock().await;
        match store.load()? {
            Some(token) if !token.expired() => Ok(false),
            _ => {
                let token = self.authenticate().await?;
                store.save(token)?;
                Ok(true)
            }
        }
    }

    /// Invalidate the session server-side and drop the cached token.
    ///
    /// The cache is cleared before the network call, so even a rejected
    /// invalidation leaves this client ready to re-authenticate; the
    /// rejection itself still propagates to the caller.
    pub async fn close(&self) -> Result<(), FmError> {
        let token = {
            let mut store = self.store.lock().await;
            let token = store.load()?;
            store.invalidate();
            token
        };
        let Some(mut token) = token else {
            return Ok(());
        };

        let value = token.use_token().to_string();
        let _: serde_json::Value = self
            .dispatch(
                &format!("/sessions/{value}"),
                Method::DELETE,
                &[],
                None::<&serde_json::Value>,
                AuthScheme::Bearer(&value),
            )
            .await?;
        Ok(())
    }

    /// Issue a bearer-authenticated request against a database endpoint.
    ///
    /// Opens the session first if needed. The body is omitted entirely
    /// for GET and serialized as JSON otherwise (an empty object when no
    /// body is given).
    pub async fn request<T, B>(
        &self,
        endpoint: &str,
        method: Method,
        query: &[(String, String)],
        body: Option<&B>,
    ) -> Result<T, FmError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let bearer = self.use_token().await?;
        self.dispatch(endpoint, method, query, body, AuthScheme::Bearer(&bearer))
            .await
    }

    /// Whether a live token is available locally, decrypting the seeded
    /// blob if necessary. No network call is made.
    pub async fn validate_session(&self) -> Result<bool, FmError> {
        let mut store = self.store.lock().await;
        Ok(matches!(store.load()?, Some(token) if !token.expired()))
    }

    /// Ask the server whether the current token is still honored.
    ///
    /// HTTP 401 means the token is dead: the local cache is cleared and
    /// `false` is returned. Without a local token this reports `false`
    /// immediately.
    pub async fn validate_session_strict(&self) -> Result<bool, FmError> {
        let value = {
            let mut store = self.store.lock().await;
            let mut token = match store.load()? {
                Some(token) if !token.expired() => token,
                _ => return Ok(false),
            };
            let value = token.use_token().to_string();
            store.save(token)?;
            value
        };

        let url = Url::parse(&format!(
            "{}/fmi/data/{}/validateSession",
            self.host, self.api_version
        ))
        .map_err(|e| FmError::Url(e.to_string()))?;

        let response = self
            .http
            .get(url)
            .header(header::CONTENT_TYPE, "application/json")
            .bearer_auth(&value)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            self.store.lock().await.invalidate();
            return Ok(false);
        }
        if status.is_success() {
            Ok(true)
        } else {
            Err(FmError::from_status(status))
        }
    }

    /// Export the encrypted token for external storage, authenticating
    /// first if the session has not produced one yet.
    ///
    /// Calling this on a session without persistent mode is a programmer
    /// error and fails immediately.
    pub async fn persist(&self) -> Result<String, FmError> {
        let mut store = self.store.lock().await;
        if !store.supports_export() {
            return Err(FmError::PersistentModeRequired);
        }
        if store.export().is_none() {
            let token = self.authenticate().await?;
            store.save(token)?;
        }
        store.export().map(str::to_owned).ok_or(FmError::TokenEncrypt)
    }

    /// Take the current token for one request, renewing its sliding
    /// expiry, and authenticate first when it is missing or expired.
    async fn use_token(&self) -> Result<String, FmError> {
        let mut store = self.store.lock().await;
        let mut token = match store.load()? {
            Some(token) if !token.expired() => token,
            _ => self.authenticate().await?,
        };
        let value = token.use_token().to_string();
        store.save(token)?;
        Ok(value)
    }

    /// Trade credentials for a fresh session token.
    async fn authenticate(&self) -> Result<Token, FmError> {
        debug!(host = %self.host, database = %self.database, "Opening Data API session");
        let payload: SessionResponse = self
            .dispatch(
                "/sessions",
                Method::POST,
                &[],
                None::<&serde_json::Value>,
                AuthScheme::Basic,
            )
            .await?;
        Ok(Token::new(payload.token))
    }

    /// Perform one HTTP call and interpret the envelope.
    async fn dispatch<T, B>(
        &self,
        endpoint: &str,
        method: Method,
        query: &[(String, String)],
        body: Option<&B>,
        auth: AuthScheme<'_>,
    ) -> Result<T, FmError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.endpoint_url(endpoint, query)?;

        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .header(header::CONTENT_TYPE, "application/json");

        request = match auth {
            AuthScheme::Basic => request.basic_auth(&self.username, Some(&self.password)),
            AuthScheme::Bearer(token) => request.bearer_auth(token),
        };

        if method != Method::GET {
            request = match body {
                Some(body) => request.json(body),
                None => request.json(&serde_json::json!({})),
            };
        }

        let started = Instant::now();
        let result = request.send().await;
        if self.profiling {
            // Timing is observability only; it never alters the outcome.
            debug!(
                method = %method,
                url = %url,
                elapsed_ms = started.elapsed().as_millis() as u64,
                ok = result.is_ok(),
                "Data API request timing"
            );
        }

        let response = result?;
        let status = response.status();
        let text = response.text().await?;
        interpret_envelope(status, &text)
    }

    fn base_url(&self) -> String {
        format!(
            "{}/fmi/data/{}/databases/{}",
            self.host, self.api_version, self.database
        )
    }

    fn endpoint_url(&self, endpoint: &str, query: &[(String, String)]) -> Result<Url, FmError> {
        let mut url = Url::parse(&format!("{}{}", self.base_url(), endpoint))
            .map_err(|e| FmError::Url(e.to_string()))?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        Ok(url)
    }
}

/// Decode a response body in two explicit steps.
///
/// A parsed envelope is authoritative regardless of HTTP status: the
/// first non-zero message code wins, and only a clean envelope has its
/// payload deserialized into the caller's type (error envelopes carry an
/// empty payload that would never fit it). A body that is not an envelope
/// at all is tolerated only when the status already signals failure; on a
/// nominally successful status it is fatal.
fn interpret_envelope<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<T, FmError> {
    match serde_json::from_str::<ApiResponse<serde_json::Value>>(body) {
        Ok(envelope) => {
            let payload = envelope.into_result()?;
            serde_json::from_value(payload).map_err(|err| FmError::InvalidResponse(err.to_string()))
        }
        Err(err) if status.is_success() => Err(FmError::InvalidResponse(err.to_string())),
        Err(_) => Err(FmError::from_status(status)),
    }
}

/// Prepend `https://` to a host given without a scheme; leave an explicit
/// scheme untouched.
fn normalize_host(host: &str) -> String {
    let trimmed = host.trim_end_matches('/');
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use wiremock::matchers::{method as http_method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(host: &str) -> ClientConfig {
        ClientConfig::new("alice", "s3cr3t", host, "Inventory")
    }

    #[test]
    fn test_normalize_host_prepends_https() {
        assert_eq!(normalize_host("example.com"), "https://example.com");
        assert_eq!(normalize_host("example.com/"), "https://example.com");
    }

    #[test]
    fn test_normalize_host_keeps_existing_scheme() {
        assert_eq!(normalize_host("http://127.0.0.1:9000"), "http://127.0.0.1:9000");
        assert_eq!(normalize_host("https://fm.example.com"), "https://fm.example.com");
    }

    #[test]
    fn test_base_url_shape() {
        let session = Session::new(&config("fm.example.com")).unwrap();
        assert_eq!(
            session.base_url(),
            "https://fm.example.com/fmi/data/vLatest/databases/Inventory"
        );
    }

    #[test]
    fn test_endpoint_url_appends_query_pairs() {
        let session = Session::new(&config("fm.example.com")).unwrap();
        let url = session
            .endpoint_url(
                "/layouts/Products/records",
                &[("_limit".to_string(), "10".to_string())],
            )
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://fm.example.com/fmi/data/vLatest/databases/Inventory/layouts/Products/records?_limit=10"
        );
    }

    #[test]
    fn test_interpret_envelope_success() {
        let body = r#"{"messages":[{"code":"0","message":"OK"}],"response":{"token":"abc"}}"#;
        let payload: serde_json::Value = interpret_envelope(StatusCode::OK, body).unwrap();
        assert_eq!(payload["token"], "abc");
    }

    #[test]
    fn test_interpret_envelope_operation_error_wins_over_status() {
        // FileMaker reports application errors inside the envelope even on
        // non-2xx statuses; the envelope code is authoritative.
        let body = r#"{"messages":[{"code":"952","message":"Invalid FileMaker Data API token"}],"response":{}}"#;
        let result: Result<serde_json::Value, _> =
            interpret_envelope(StatusCode::UNAUTHORIZED, body);
        match result {
            Err(FmError::Operation { code, .. }) => assert_eq!(code, "952"),
            other => panic!("expected operation error, got {:?}", other),
        }
    }

    #[test]
    fn test_interpret_envelope_http_error_on_unparsable_failure_body() {
        let result: Result<serde_json::Value, _> =
            interpret_envelope(StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>");
        match result {
            Err(FmError::Http { code, .. }) => assert_eq!(code, 500),
            other => panic!("expected http error, got {:?}", other),
        }
    }

    #[test]
    fn test_interpret_envelope_unparsable_success_body_is_fatal() {
        let result: Result<serde_json::Value, _> =
            interpret_envelope(StatusCode::OK, "not json at all");
        assert!(matches!(result, Err(FmError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_expired_cached_token_triggers_reauthentication() {
        let server = MockServer::start().await;

        Mock::given(http_method("POST"))
            .and(path("/fmi/data/vLatest/databases/Inventory/sessions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "messages": [{"code": "0", "message": "OK"}],
                "response": {"token": "fresh-token"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(http_method("GET"))
            .and(path("/fmi/data/vLatest/databases/Inventory/layouts/Products/records"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "messages": [{"code": "0", "message": "OK"}],
                "response": {}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = Session::new(&config(&server.uri())).unwrap();

        // Plant a token that has already expired; the next request must
        // replace it rather than send it.
        session
            .store
            .lock()
            .await
            .save(Token::with_expiration(
                "stale-token",
                Utc::now().timestamp_millis() - 1,
            ))
            .unwrap();

        let _: serde_json::Value = session
            .request(
                "/layouts/Products/records",
                Method::GET,
                &[],
                None::<&serde_json::Value>,
            )
            .await
            .unwrap();

        let cached = session.store.lock().await.load().unwrap().unwrap();
        assert!(!cached.expired());
    }
}
