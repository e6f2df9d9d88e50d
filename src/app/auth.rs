use crate::session::{RegisterProfile, SessionError};
use crate::state;
use crate::templates;

use axum::Json;
use axum::body::Body;
use axum::extract::Form;
use axum::extract::Query;
use axum::extract::State;
use axum::http::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;
use serde::Serialize;

#[derive(Serialize)]
struct AuthErrorResponse {
    error: &'static str,
}

pub(crate) async fn session_middleware(
    State(state): State<state::AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let path = req.uri().path();
    if is_public_path(path) {
        return next.run(req).await;
    }

    if state.sessions.is_authenticated() {
        return next.run(req).await;
    }

    if path.starts_with("/api/") {
        return (
            StatusCode::UNAUTHORIZED,
            Json(AuthErrorResponse {
                error: "unauthorized",
            }),
        )
            .into_response();
    }

    Redirect::to("/login").into_response()
}

// `/api/session` stays public so an anonymous caller can ask "am I signed
// in" and get `authenticated: false` instead of a 401.
fn is_public_path(path: &str) -> bool {
    path == "/login"
        || path == "/register"
        || path == "/logout"
        || path == "/health"
        || path == "/api/session"
        || path.starts_with("/static/")
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginQuery {
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginForm {
    identifier: String,
    secret: String,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RegisterForm {
    display_name: String,
    contact_email: String,
    organization: Option<String>,
}

pub(crate) async fn login_form(
    State(state): State<state::AppState>,
    Query(query): Query<LoginQuery>,
) -> templates::LoginTemplate {
    let next = sanitize_next(query.next.as_deref()).unwrap_or_else(|| "/".to_string());
    templates::LoginTemplate {
        app_name: state.config.app_name,
        error: String::new(),
        next,
    }
}

pub(crate) async fn login_submit(
    State(state): State<state::AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, (StatusCode, templates::LoginTemplate)> {
    let next = sanitize_next(form.next.as_deref()).unwrap_or_else(|| "/".to_string());

    match state.sessions.login(&form.identifier, &form.secret).await {
        Ok(_) => Ok(Redirect::to(&next).into_response()),
        Err(SessionError::EmptyCredentials) => Err((
            StatusCode::UNAUTHORIZED,
            templates::LoginTemplate {
                app_name: state.config.app_name,
                error: "Enter your email and password.".to_string(),
                next,
            },
        )),
        Err(err) => {
            eprintln!("failed to sign in: {err}");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                templates::LoginTemplate {
                    app_name: state.config.app_name,
                    error: "Failed to sign in.".to_string(),
                    next,
                },
            ))
        }
    }
}

pub(crate) async fn register_form(State(state): State<state::AppState>) -> templates::RegisterTemplate {
    templates::RegisterTemplate {
        app_name: state.config.app_name,
        error: String::new(),
    }
}

pub(crate) async fn register_submit(
    State(state): State<state::AppState>,
    Form(form): Form<RegisterForm>,
) -> Result<Response, (StatusCode, templates::RegisterTemplate)> {
    let profile = RegisterProfile {
        display_name: form.display_name,
        contact_email: form.contact_email,
        organization: form.organization.unwrap_or_default(),
    };

    match state.sessions.register(profile).await {
        Ok(_) => Ok(Redirect::to("/").into_response()),
        Err(SessionError::EmptyProfile) => Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            templates::RegisterTemplate {
                app_name: state.config.app_name,
                error: "Enter your name and email.".to_string(),
            },
        )),
        Err(err) => {
            eprintln!("failed to register: {err}");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                templates::RegisterTemplate {
                    app_name: state.config.app_name,
                    error: "Failed to create the account.".to_string(),
                },
            ))
        }
    }
}

pub(crate) async fn logout(State(state): State<state::AppState>) -> Response {
    state.sessions.logout();
    Redirect::to("/login").into_response()
}

fn sanitize_next(next: Option<&str>) -> Option<String> {
    let next = next?.trim();
    if next.is_empty() {
        return None;
    }
    if !next.starts_with('/') || next.starts_with("//") || next.contains("://") {
        return None;
    }
    Some(next.to_string())
}
