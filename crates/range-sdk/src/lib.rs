//! # Cyber Range Admin SDK
//!
//! Authenticated client for the Cyber Range admin API, plus the session
//! object and guard it reports to.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use range_sdk::{AdminClient, Router, Session, SessionGuard};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let session = Arc::new(Session::in_memory());
//! let guard = Arc::new(SessionGuard::new(session, Arc::new(Router::new("/admin/login"))));
//! let client = AdminClient::new("http://localhost:8080/api", guard.clone())?;
//!
//! let login = client.login("admin", "secret").await?;
//! guard.login(&login.token, &login.admin)?;
//!
//! let page = client.list_instances(&Default::default()).await?;
//! println!("{} instances", page.total);
//! # Ok(())
//! # }
//! ```
//!
//! ## Session expiry
//!
//! Every protected call goes through [`AdminClient::send`]. Any HTTP 401
//! response clears the session and navigates to the login surface through
//! the [`SessionGuard`], whichever caller issued the request. Callers cannot
//! opt out of this.
//!
//! ## Response envelope
//!
//! The backend wraps every body in `{code, msg, data}`. Code 200 yields
//! `data` (a missing `data` decodes as `()`), anything else becomes
//! [`GatewayError::Business`] carrying the server message verbatim.

use range_common::{
    ContainerLogs, Envelope, InstancePage, InstanceQuery, LoginRequest, LoginResponse,
    OverviewStats, StatsSnapshot, SubmissionPage, SubmissionQuery,
};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, warn};

pub mod guard;
pub mod navigator;
pub mod session;

pub use guard::{Access, SessionGuard};
pub use navigator::{Navigator, Router, HOME_PATH, LOGIN_PATH};
pub use session::{FileSessionStore, MemorySessionStore, Session, SessionError, SessionStore};

/// Transport-level default timeout. Individual calls never override it.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const TRANSPORT_MESSAGE: &str = "Network error, please check the connection and retry";

#[derive(Error, Debug)]
pub enum GatewayError {
    /// No response was received (connect failure, timeout, aborted body).
    #[error("Transport error: {0}")]
    Transport(String),
    /// Envelope code other than 200.
    #[error("API error ({code}): {msg}")]
    Business { code: i64, msg: String },
    /// HTTP 401. The session has already been torn down when this is seen.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    /// Non-2xx status whose body is not an envelope.
    #[error("Request failed with status code {status}")]
    Status { status: u16, body: String },
    #[error("Failed to decode response: {0}")]
    Decode(String),
    #[error("Client setup failed: {0}")]
    Setup(String),
}

impl GatewayError {
    /// Message suitable for showing to the admin.
    pub fn user_message(&self) -> String {
        match self {
            GatewayError::Transport(_) => TRANSPORT_MESSAGE.to_string(),
            GatewayError::Business { msg, .. } | GatewayError::Unauthorized(msg) => msg.clone(),
            other => other.to_string(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, GatewayError::Unauthorized(_))
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        GatewayError::Transport(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Auth {
    Bearer,
    Anonymous,
}

#[derive(Debug, Serialize)]
struct TailQuery {
    tail: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    msg: String,
}

/// Authenticated admin API client.
///
/// `AdminClient` is cheap to share behind an `Arc`; the underlying
/// `reqwest::Client` pools connections.
pub struct AdminClient {
    client: Client,
    base_url: String,
    guard: Arc<SessionGuard>,
}

impl AdminClient {
    /// Create a client rooted at `base_url` (for example
    /// `http://localhost:8080/api`). Admin routes are resolved under
    /// `{base_url}/admin/`.
    pub fn new(base_url: impl Into<String>, guard: Arc<SessionGuard>) -> Result<Self, GatewayError> {
        Self::with_timeout(base_url, guard, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        guard: Arc<SessionGuard>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Setup(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            guard,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/admin/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Dispatch a protected call and unwrap its envelope.
    ///
    /// Attaches `Authorization: Bearer <token>` when a session is present.
    /// An HTTP 401 tears the session down before the error is returned.
    #[instrument(skip_all, fields(method = %method, path = %path))]
    pub async fn send<T, B, Q>(
        &self,
        method: Method,
        path: &str,
        payload: Option<&B>,
        query: Option<&Q>,
    ) -> Result<T, GatewayError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
        Q: Serialize + ?Sized,
    {
        self.dispatch(Auth::Bearer, method, path, payload, query).await
    }

    /// Admin login. Never carries a bearer token. A 401 here still runs the
    /// session-expiry reaction like any other call.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, GatewayError> {
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        self.dispatch(Auth::Anonymous, Method::POST, "login", Some(&body), None::<&()>)
            .await
    }

    async fn dispatch<T, B, Q>(
        &self,
        auth: Auth,
        method: Method,
        path: &str,
        payload: Option<&B>,
        query: Option<&Q>,
    ) -> Result<T, GatewayError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
        Q: Serialize + ?Sized,
    {
        let mut request = self.client.request(method, self.url(path));
        if auth == Auth::Bearer {
            if let Some(token) = self.guard.session().token() {
                request = request.bearer_auth(token);
            }
        }
        if let Some(query) = query {
            request = request.query(query);
        }
        if let Some(payload) = payload {
            request = request.json(payload);
        }

        let response = request.send().await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            let body = response.text().await.unwrap_or_default();
            let msg = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.msg)
                .ok()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "Unauthorized".to_string());
            self.guard.handle_expired();
            return Err(GatewayError::Unauthorized(msg));
        }

        unwrap_envelope(response).await
    }

    pub async fn list_instances(&self, query: &InstanceQuery) -> Result<InstancePage, GatewayError> {
        self.send(Method::GET, "instances", None::<&()>, Some(query)).await
    }

    pub async fn instance_stats(&self, instance_id: &str) -> Result<StatsSnapshot, GatewayError> {
        let path = format!("instances/{instance_id}/stats");
        self.send(Method::GET, &path, None::<&()>, None::<&()>).await
    }

    pub async fn instance_logs(&self, instance_id: &str, tail: u32) -> Result<ContainerLogs, GatewayError> {
        let path = format!("instances/{instance_id}/logs");
        self.send(Method::GET, &path, None::<&()>, Some(&TailQuery { tail }))
            .await
    }

    pub async fn overview_stats(&self) -> Result<OverviewStats, GatewayError> {
        self.send(Method::GET, "overview/stats", None::<&()>, None::<&()>)
            .await
    }

    pub async fn list_submissions(&self, query: &SubmissionQuery) -> Result<SubmissionPage, GatewayError> {
        self.send(Method::GET, "submissions", None::<&()>, Some(query)).await
    }
}

async fn unwrap_envelope<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
    let status = response.status();
    let body = response.text().await?;

    let envelope: Envelope = match serde_json::from_str(&body) {
        Ok(envelope) => envelope,
        Err(e) if status.is_success() => return Err(GatewayError::Decode(e.to_string())),
        Err(_) => {
            warn!(status = status.as_u16(), "Non-envelope error response");
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }
    };

    if !envelope.is_success() {
        debug!(code = envelope.code, msg = %envelope.msg, "Business error");
        return Err(GatewayError::Business {
            code: envelope.code,
            msg: envelope.msg,
        });
    }

    let data = envelope.data.unwrap_or(serde_json::Value::Null);
    serde_json::from_value(data).map_err(|e| GatewayError::Decode(e.to_string()))
}
