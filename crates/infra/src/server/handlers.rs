//! Route handlers: thin adapters from HTTP onto [`GatewayService`]

use std::sync::Arc;

use authgate_common::privacy::redact;
use authgate_core::{CallbackParams, DebugSnapshot, GatewayService, SessionHandoff};
use authgate_domain::{AuthGateError, DataKind, UserListing, UserRecord};
use axum::extract::{Path, Query, State};
use axum::http::header::{LOCATION, SET_COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::error::{status_for, ApiError};
use super::pages;
use crate::cookies::CookieSettings;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<GatewayService>,
    pub cookies: CookieSettings,
}

impl AppState {
    #[must_use]
    pub fn new(gateway: Arc<GatewayService>, cookies: CookieSettings) -> Self {
        Self { gateway, cookies }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct StartQuery {
    pub return_url: Option<String>,
    pub session: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExchangeRequest {
    pub session_token: String,
}

#[derive(Debug, Deserialize)]
pub struct HandoffRequest {
    pub handoff: String,
    /// The consumer session that started the flow
    pub session_token: String,
}

fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(LOCATION, location.to_string())]).into_response()
}

fn found_with_cookie(location: &str, cookie: String) -> Response {
    (StatusCode::FOUND, [(LOCATION, location.to_string()), (SET_COOKIE, cookie)]).into_response()
}

/// Browser routes send unauthenticated users back through the start flow
fn browser_error(error: AuthGateError, path: &str) -> Response {
    match error {
        AuthGateError::NotAuthenticated => {
            found(&format!("/?return_url={}", urlencoding::encode(path)))
        }
        other => ApiError(other).into_response(),
    }
}

/// `GET /`: register a challenge and redirect to the provider
///
/// A `session` query parameter (consumer middleware forwarding its cookie)
/// is recorded as the flow's requester. It is never bound or set as the
/// gateway cookie; the callback mints the session that gets authenticated.
pub async fn start(
    State(state): State<AppState>,
    Query(query): Query<StartQuery>,
) -> Result<Response, ApiError> {
    let flow =
        state.gateway.start_flow(query.return_url.as_deref(), query.session.as_deref())?;
    Ok(found(&flow.authorization_url))
}

/// `GET /callback`: failures render a page, never a JSON body
///
/// Success sets the gateway cookie to the session minted for this login.
pub async fn callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Response {
    match state.gateway.handle_callback(params).await {
        Ok(outcome) => {
            let cookie = state.cookies.set(&outcome.session);
            match outcome.redirect {
                Some(target) => found_with_cookie(&target, cookie),
                None => ([(SET_COOKIE, cookie)], Html(pages::success_page(&outcome.user)))
                    .into_response(),
            }
        }
        Err(error) => {
            let status = match status_for(&error) {
                StatusCode::FOUND => StatusCode::BAD_REQUEST,
                other => other,
            };
            (status, Html(pages::failure_page(&error))).into_response()
        }
    }
}

pub async fn debug(State(state): State<AppState>) -> Json<DebugSnapshot> {
    Json(state.gateway.debug_snapshot())
}

async fn user_data(state: &AppState, headers: &HeaderMap, kind: DataKind) -> Response {
    let path = format!("/{}", kind.as_str());
    let Some(session) = state.cookies.read(headers) else {
        return browser_error(AuthGateError::NotAuthenticated, &path);
    };
    match state.gateway.user_data_for_session(&session, kind).await {
        Ok(value) => Json(value).into_response(),
        Err(error) => browser_error(error, &path),
    }
}

pub async fn profile(State(state): State<AppState>, headers: HeaderMap) -> Response {
    user_data(&state, &headers, DataKind::Profile).await
}

pub async fn emails(State(state): State<AppState>, headers: HeaderMap) -> Response {
    user_data(&state, &headers, DataKind::Emails).await
}

pub async fn files(State(state): State<AppState>, headers: HeaderMap) -> Response {
    user_data(&state, &headers, DataKind::Files).await
}

pub async fn dashboard(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(session) = state.cookies.read(&headers) else {
        return browser_error(AuthGateError::NotAuthenticated, "/dashboard");
    };
    match state.gateway.dashboard(&session).await {
        Ok(dashboard) => Html(pages::dashboard_page(&dashboard)).into_response(),
        Err(error) => browser_error(error, "/dashboard"),
    }
}

/// `GET /logout`: log out the cookie's user and clear the cookie
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(session) = state.cookies.read(&headers) {
        state.gateway.logout_session(&session);
    }
    ([(SET_COOKIE, state.cookies.clear())], Html(pages::logged_out_page())).into_response()
}

pub async fn admin_consent(State(state): State<AppState>) -> Html<String> {
    Html(pages::admin_consent_page(state.gateway.client_id(), &state.gateway.admin_consent_url()))
}

/// `POST /api/exchange`: the contract consumer middleware relies on
///
/// `200` with the user record, or `302 Location: /` when the caller must
/// send the browser through the start flow.
pub async fn exchange(
    State(state): State<AppState>,
    Json(request): Json<ExchangeRequest>,
) -> Result<Json<UserRecord>, ApiError> {
    if request.session_token.is_empty() {
        return Err(AuthGateError::NotAuthenticated.into());
    }
    Ok(Json(state.gateway.exchange_session(&request.session_token).await?))
}

/// `POST /api/handoff`: trade a single-use handoff code for a session
///
/// `200` with the new session and user record, or `302 Location: /` for an
/// unknown, expired, reused or mismatched code.
pub async fn handoff(
    State(state): State<AppState>,
    Json(request): Json<HandoffRequest>,
) -> Result<Json<SessionHandoff>, ApiError> {
    if request.handoff.is_empty() || request.session_token.is_empty() {
        return Err(AuthGateError::NotAuthenticated.into());
    }
    Ok(Json(state.gateway.redeem_handoff(&request.handoff, &request.session_token).await?))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserRecord>, ApiError> {
    Ok(Json(state.gateway.get_user(&user_id)?))
}

pub async fn delete_user(State(state): State<AppState>, Path(user_id): Path<String>) -> Json<Value> {
    if !state.gateway.logout_user(&user_id) {
        debug!(user = %redact(&user_id), "logout for uncached user");
    }
    Json(json!({ "status": "logged_out", "user_id": user_id }))
}

pub async fn list_users(State(state): State<AppState>) -> Json<UserListing> {
    Json(state.gateway.list_users())
}
