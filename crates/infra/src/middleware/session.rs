//! Session middleware for applications that delegate sign-in to the gateway
//!
//! On every request the middleware reads (or mints) the session cookie and
//! asks the gateway's `POST /api/exchange` who it belongs to:
//! - `200` attaches a [`CurrentUser`] extension and refreshes the cookie
//! - `302` sends the browser to the gateway start endpoint, carrying the
//!   session and a `return_url` back to the original request
//! - anything else is logged and the request continues without a user
//!
//! After sign-in the gateway redirects back with a single-use handoff code
//! in the query. The middleware trades it, together with the cookie that
//! started the flow, for the session the gateway minted, stores that as the
//! new cookie and redirects to the same URL without the code.
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use authgate_infra::middleware::{CurrentUser, SessionMiddleware};
//! use axum::{middleware, routing::get, Extension, Router};
//!
//! async fn hello(Extension(CurrentUser(user)): Extension<CurrentUser>) -> String {
//!     format!("Hello, {}!", user.name)
//! }
//!
//! # fn example() -> authgate_domain::Result<()> {
//! let session = SessionMiddleware::new(
//!     "http://localhost:8080",
//!     "http://localhost:3000",
//!     Duration::from_secs(10),
//! )?;
//! let app: Router = Router::new()
//!     .route("/", get(hello))
//!     .layer(middleware::from_fn_with_state(session, SessionMiddleware::middleware));
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use authgate_common::auth::generate_session_token;
use authgate_common::privacy::redact;
use authgate_domain::{AuthGateError, Result, UserRecord, HANDOFF_PARAM};
use axum::extract::{Request, State};
use axum::http::header::{HeaderValue, LOCATION, SET_COOKIE};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use reqwest::redirect::Policy;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};
use url::form_urlencoded;

use crate::cookies::CookieSettings;
use crate::errors::InfraError;

/// Paths served without consulting the gateway
const SKIPPED_PREFIXES: &[&str] = &["/static"];

/// The authenticated user, attached to request extensions
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserRecord);

/// Result of one exchange call
#[derive(Debug, Clone, PartialEq)]
pub enum ExchangeOutcome {
    Authenticated(UserRecord),
    AuthenticationRequired,
}

/// Body of a successful `POST /api/handoff`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HandoffGrant {
    pub session_token: String,
    pub user: UserRecord,
}

#[derive(Debug)]
struct Inner {
    http: reqwest::Client,
    gateway_url: String,
    app_url: String,
    cookies: CookieSettings,
}

/// Consumer-side client of the gateway's exchange contract
#[derive(Debug, Clone)]
pub struct SessionMiddleware {
    inner: Arc<Inner>,
}

impl SessionMiddleware {
    /// Build the middleware for an app served at `app_url`
    ///
    /// Redirect following is disabled so the gateway's `302` is observed.
    ///
    /// # Errors
    /// `Internal` if the HTTP client cannot be built.
    pub fn new(gateway_url: &str, app_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .redirect(Policy::none())
            .timeout(timeout)
            .build()
            .map_err(|err| AuthGateError::Internal(format!("failed to build HTTP client: {err}")))?;

        let app_url = app_url.trim_end_matches('/').to_string();
        Ok(Self {
            inner: Arc::new(Inner {
                http,
                gateway_url: gateway_url.trim_end_matches('/').to_string(),
                cookies: CookieSettings::for_public_url(&app_url),
                app_url,
            }),
        })
    }

    #[must_use]
    pub fn cookies(&self) -> &CookieSettings {
        &self.inner.cookies
    }

    /// Resolve `session` through the gateway
    ///
    /// # Errors
    /// `Network` on transport failure; `Upstream` for any status other than
    /// `200` or `302`, or an undecodable user record.
    pub async fn exchange(&self, session: &str) -> Result<ExchangeOutcome> {
        let response = self
            .inner
            .http
            .post(format!("{}/api/exchange", self.inner.gateway_url))
            .json(&json!({ "session_token": session }))
            .send()
            .await
            .map_err(InfraError::from)?;

        match response.status() {
            StatusCode::OK => {
                let user = response.json::<UserRecord>().await.map_err(InfraError::from)?;
                Ok(ExchangeOutcome::Authenticated(user))
            }
            StatusCode::FOUND => Ok(ExchangeOutcome::AuthenticationRequired),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(AuthGateError::Upstream { status: status.as_u16(), body })
            }
        }
    }

    /// Trade a handoff code for the session the gateway minted
    ///
    /// `session` must be the cookie this browser carried into the flow.
    /// `Ok(None)` when the gateway refuses the code.
    ///
    /// # Errors
    /// As [`Self::exchange`].
    pub async fn redeem(&self, handoff: &str, session: &str) -> Result<Option<HandoffGrant>> {
        let response = self
            .inner
            .http
            .post(format!("{}/api/handoff", self.inner.gateway_url))
            .json(&json!({ "handoff": handoff, "session_token": session }))
            .send()
            .await
            .map_err(InfraError::from)?;

        match response.status() {
            StatusCode::OK => {
                Ok(Some(response.json::<HandoffGrant>().await.map_err(InfraError::from)?))
            }
            StatusCode::FOUND => Ok(None),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(AuthGateError::Upstream { status: status.as_u16(), body })
            }
        }
    }

    /// Gateway start URL that returns the browser to `path_and_query`
    #[must_use]
    pub fn login_url(&self, session: &str, path_and_query: &str) -> String {
        let return_url = format!("{}{}", self.inner.app_url, path_and_query);
        format!(
            "{}/?return_url={}&session={}",
            self.inner.gateway_url,
            urlencoding::encode(&return_url),
            urlencoding::encode(session),
        )
    }

    /// Axum middleware entry point, for `from_fn_with_state`
    pub async fn middleware(
        State(session_mw): State<Self>,
        mut request: Request,
        next: Next,
    ) -> Response {
        let path = request.uri().path();
        if SKIPPED_PREFIXES.iter().any(|prefix| path.starts_with(prefix)) {
            return next.run(request).await;
        }

        let cookies = session_mw.cookies();
        if let Some((handoff, clean)) = split_handoff(request.uri().path(), request.uri().query()) {
            let requester = cookies.read(request.headers());
            return session_mw.complete_handoff(requester, &handoff, &clean).await;
        }

        let session =
            cookies.read(request.headers()).unwrap_or_else(generate_session_token);
        let cookie = cookies.set(&session);

        let mut response = match session_mw.exchange(&session).await {
            Ok(ExchangeOutcome::Authenticated(user)) => {
                debug!(user = %redact(&user.id), "request authenticated");
                request.extensions_mut().insert(CurrentUser(user));
                next.run(request).await
            }
            Ok(ExchangeOutcome::AuthenticationRequired) => {
                let target = request
                    .uri()
                    .path_and_query()
                    .map_or_else(|| request.uri().path().to_string(), ToString::to_string);
                debug!(session = %redact(&session), path = %target, "redirecting to gateway");
                (StatusCode::FOUND, [(LOCATION, session_mw.login_url(&session, &target))])
                    .into_response()
            }
            Err(error) => {
                warn!(reason = error.label(), error = %error, "gateway exchange failed, continuing without user");
                next.run(request).await
            }
        };

        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(SET_COOKIE, value);
        }
        response
    }

    /// Redeem `handoff` and send the browser to `clean` either way
    async fn complete_handoff(
        &self,
        requester: Option<String>,
        handoff: &str,
        clean: &str,
    ) -> Response {
        let mut response = (StatusCode::FOUND, [(LOCATION, clean.to_string())]).into_response();
        let Some(requester) = requester else {
            debug!("handoff arrived without a session cookie");
            return response;
        };

        match self.redeem(handoff, &requester).await {
            Ok(Some(grant)) => {
                info!(user = %redact(&grant.user.id), "adopted session from gateway handoff");
                if let Ok(value) = HeaderValue::from_str(&self.cookies().set(&grant.session_token))
                {
                    response.headers_mut().append(SET_COOKIE, value);
                }
            }
            Ok(None) => debug!(handoff = %redact(handoff), "gateway refused handoff"),
            Err(error) => {
                warn!(reason = error.label(), error = %error, "handoff redemption failed");
            }
        }
        response
    }
}

/// Split the handoff code off a request target
///
/// Returns the code and the path with the remaining query, or `None` when
/// the query carries no code.
fn split_handoff(path: &str, query: Option<&str>) -> Option<(String, String)> {
    let query = query?;
    let mut handoff = None;
    let mut kept = form_urlencoded::Serializer::new(String::new());
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        if key == HANDOFF_PARAM {
            handoff = Some(value.into_owned());
        } else {
            kept.append_pair(&key, &value);
        }
    }
    let handoff = handoff.filter(|code| !code.is_empty())?;
    let kept = kept.finish();
    let clean = if kept.is_empty() { path.to_string() } else { format!("{path}?{kept}") };
    Some((handoff, clean))
}
