//! API client with bearer injection and the 401 → refresh → resubmit cycle.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{field::Empty, Instrument, Level};
use url::Url;

use crate::error::ApiError;
use crate::http::request::{ApiRequest, RequestBody};
use crate::session::{AuthState, Session, SignOutReason};

/// Endpoint that exchanges a refresh token for a new access token.
pub const REFRESH_PATH: &str = "/users/refresh-token";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: String,
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    session: Arc<Session>,
}

impl ApiClient {
    pub fn new(http: reqwest::Client, base: Url, session: Arc<Session>) -> Self {
        Self {
            http,
            base,
            session,
        }
    }

    /// Build a client with its own connection pool. `timeout_sec == 0` disables
    /// the per-request timeout.
    pub fn from_config(base: Url, timeout_sec: u64, session: Arc<Session>) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder().user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ));
        if timeout_sec > 0 {
            builder = builder.timeout(Duration::from_secs(timeout_sec));
        }
        let http = builder.build().map_err(ApiError::Transport)?;
        Ok(Self::new(http, base, session))
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Absolute URL for an API path plus query pairs.
    pub fn url_for(&self, path: &str, query: &[(String, String)]) -> Result<Url, ApiError> {
        let joined = format!(
            "{}/{}",
            self.base.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        let mut url = Url::parse(&joined)
            .map_err(|e| ApiError::InvalidRequest(format!("bad path '{}': {}", path, e)))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query.iter());
        }
        Ok(url)
    }

    /// Send one attempt of `req`. Non-2xx statuses are returned as-is.
    async fn dispatch(
        &self,
        req: &ApiRequest,
        bearer: Option<&str>,
    ) -> Result<reqwest::Response, ApiError> {
        let url = self.url_for(&req.path, &req.query)?;

        let span = tracing::span!(
            Level::INFO, "outgoing_http",
            http.method = %req.method,
            http.url = %url,
            http.status_code = Empty,
        );

        let mut builder = self.http.request(req.method.clone(), url);
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }
        builder = match &req.body {
            RequestBody::Empty => builder,
            RequestBody::Json(v) => builder.json(v),
            RequestBody::Multipart(form) => builder.multipart(form.to_reqwest()?),
        };

        let resp = builder
            .send()
            .instrument(span.clone())
            .await
            .map_err(|e| {
                tracing::debug!(parent: &span, error = %e, "request failed without a response");
                ApiError::Transport(e)
            })?;

        span.record("http.status_code", resp.status().as_u16());
        Ok(resp)
    }

    /// Turn a non-success response into an [`ApiError`].
    async fn check(resp: reqwest::Response, path: &str) -> Result<reqwest::Response, ApiError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        tracing::debug!(status = status.as_u16(), path, "request rejected");
        Err(ApiError::from_status(status, path, &body))
    }

    /// Send `req` through the interceptor.
    ///
    /// Authenticated requests carry the current access token. A 401 triggers
    /// one refresh and one resubmission; a 401 on the resubmission is returned
    /// as [`ApiError::Unauthorized`] without another cycle.
    pub async fn send(&self, req: ApiRequest) -> Result<reqwest::Response, ApiError> {
        if !req.authenticated {
            let resp = self.dispatch(&req, None).await?;
            return Self::check(resp, &req.path).await;
        }

        let token = self.session.access_token();
        let resp = self.dispatch(&req, token.as_deref()).await?;
        if resp.status() != reqwest::StatusCode::UNAUTHORIZED {
            return Self::check(resp, &req.path).await;
        }

        tracing::debug!(path = %req.path, "access token rejected, refreshing");
        let fresh = self.refresh_access_token(token.as_deref()).await?;

        let retried = self.dispatch(&req, Some(&fresh)).await?;
        if retried.status() == reqwest::StatusCode::UNAUTHORIZED {
            tracing::warn!(path = %req.path, "request still unauthorized after refresh");
            return Err(ApiError::Unauthorized);
        }
        Self::check(retried, &req.path).await
    }

    /// Obtain a usable access token after `stale` was rejected.
    ///
    /// Single-flight: callers queue on the session's refresh gate. Whoever gets
    /// in first performs the exchange; later callers find the token already
    /// replaced and reuse it. Any failure tears the session down once; callers
    /// queued behind a failed exchange get the published sign-out reason.
    pub async fn refresh_access_token(&self, stale: Option<&str>) -> Result<String, ApiError> {
        let _gate = self.session.refresh_gate().lock().await;

        if let Some(current) = self.session.access_token() {
            if stale != Some(current.as_str()) {
                tracing::debug!("access token already refreshed by a concurrent request");
                return Ok(current);
            }
        }

        // an earlier holder of the gate already tore the session down
        if let AuthState::SignedOut(reason) = self.session.auth_state() {
            return Err(ApiError::SessionExpired(reason));
        }

        let Some(refresh_token) = self.session.refresh_token() else {
            return Err(self.expire(SignOutReason::MissingRefreshToken));
        };

        let req = ApiRequest::post(REFRESH_PATH)
            .json(&RefreshRequest {
                refresh_token: &refresh_token,
            })?
            .without_auth();

        // dispatched directly: going through `send` would make the cycle recursive
        let fresh = match self.exchange_refresh(&req).await {
            Ok(r) => r.access_token,
            Err(e) => {
                tracing::warn!(error = %e, "refresh token exchange failed");
                return Err(self.expire(SignOutReason::RefreshRejected));
            }
        };

        if let Err(e) = self.session.replace_access_token(&fresh) {
            tracing::warn!(error = %e, "refreshed access token is unusable");
            return Err(self.expire(SignOutReason::InvalidToken));
        }

        tracing::info!("access token refreshed");
        Ok(fresh)
    }

    async fn exchange_refresh(&self, req: &ApiRequest) -> Result<RefreshResponse, ApiError> {
        let resp = Self::check(self.dispatch(req, None).await?, &req.path).await?;
        let bytes = resp.bytes().await.map_err(ApiError::Transport)?;
        serde_json::from_slice(&bytes).map_err(|source| ApiError::Decode {
            path: req.path.clone(),
            source,
        })
    }

    fn expire(&self, reason: SignOutReason) -> ApiError {
        if let Err(e) = self.session.teardown(reason) {
            tracing::error!(error = %e, "failed to clear persisted session");
        }
        ApiError::SessionExpired(reason)
    }

    /// Send and decode a JSON response body.
    pub async fn json<T: DeserializeOwned>(&self, req: ApiRequest) -> Result<T, ApiError> {
        let path = req.path.clone();
        let resp = self.send(req).await?;
        let bytes = resp.bytes().await.map_err(ApiError::Transport)?;
        serde_json::from_slice(&bytes).map_err(|source| ApiError::Decode { path, source })
    }

    /// Send and discard the response body.
    pub async fn execute_unit(&self, req: ApiRequest) -> Result<(), ApiError> {
        self.send(req).await.map(drop)
    }

    /// Fetch an absolute URL (e.g. a signed receipt URL). The API bearer is
    /// never sent to foreign hosts.
    pub async fn download(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        let parsed = Url::parse(url)
            .map_err(|e| ApiError::InvalidRequest(format!("bad download url: {}", e)))?;

        let span = tracing::span!(
            Level::INFO, "outgoing_http",
            http.method = "GET",
            http.url = %parsed.origin().ascii_serialization(),
            http.status_code = Empty,
        );

        let resp = self
            .http
            .get(parsed.clone())
            .send()
            .instrument(span.clone())
            .await
            .map_err(ApiError::Transport)?;
        span.record("http.status_code", resp.status().as_u16());

        // the signed query string stays out of error paths and logs
        let resp = Self::check(resp, parsed.path()).await?;
        let bytes = resp.bytes().await.map_err(ApiError::Transport)?;
        Ok(bytes.to_vec())
    }
}
