use crate::notify::AddOptions;
use crate::state;
use crate::templates;
use crate::types::{Category, Notification, NotificationAction};

use axum::Json;
use axum::extract::Path as AxumPath;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;
use serde::Serialize;
use std::time::Duration;
use time::format_description::well_known::Rfc3339;

pub(crate) async fn dashboard(State(state): State<state::AppState>) -> Response {
    // The middleware already vouched for the session, but it may expire
    // between that check and this read.
    let Some(session) = state.sessions.current() else {
        return Redirect::to("/login").into_response();
    };

    let entries = state
        .notifications
        .snapshot()
        .into_iter()
        .map(notification_row)
        .collect();

    templates::DashboardTemplate {
        app_name: state.config.app_name,
        display_name: session.display_name,
        organization: session.organization,
        plan_tier: session.plan_tier,
        unread: state.notifications.unread_count(),
        entries,
    }
    .into_response()
}

fn notification_row(notification: Notification) -> templates::NotificationRow {
    let created_at = notification
        .created_at
        .format(&Rfc3339)
        .unwrap_or_default();
    templates::NotificationRow {
        id: notification.id,
        category: notification.category.as_str().to_string(),
        title: notification.title,
        message: notification.message.unwrap_or_default(),
        created_at,
        read: notification.read,
    }
}

pub(crate) async fn mark_read_form(
    State(state): State<state::AppState>,
    AxumPath(id): AxumPath<String>,
) -> Redirect {
    state.notifications.mark_read(&id);
    Redirect::to("/")
}

pub(crate) async fn dismiss_form(
    State(state): State<state::AppState>,
    AxumPath(id): AxumPath<String>,
) -> Redirect {
    state.notifications.remove(&id);
    Redirect::to("/")
}

pub(crate) async fn mark_all_read_form(State(state): State<state::AppState>) -> Redirect {
    state.notifications.mark_all_read();
    Redirect::to("/")
}

pub(crate) async fn clear_form(State(state): State<state::AppState>) -> Redirect {
    state.notifications.clear();
    Redirect::to("/")
}

#[derive(Serialize)]
#[cfg_attr(test, derive(Deserialize))]
pub(crate) struct SessionResponse {
    pub(crate) authenticated: bool,
    pub(crate) session: Option<crate::types::Session>,
}

pub(crate) async fn session_info(State(state): State<state::AppState>) -> Json<SessionResponse> {
    let session = state.sessions.current();
    Json(SessionResponse {
        authenticated: session.is_some(),
        session,
    })
}

#[derive(Serialize)]
#[cfg_attr(test, derive(Deserialize))]
pub(crate) struct NotificationsResponse {
    pub(crate) unread: usize,
    pub(crate) notifications: Vec<Notification>,
}

pub(crate) async fn list(State(state): State<state::AppState>) -> Json<NotificationsResponse> {
    Json(NotificationsResponse {
        unread: state.notifications.unread_count(),
        notifications: state.notifications.snapshot(),
    })
}

#[derive(Debug, Deserialize)]
#[cfg_attr(test, derive(Serialize))]
pub(crate) struct AddRequest {
    pub(crate) category: Category,
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) message: Option<String>,
    #[serde(default)]
    pub(crate) auto_hide: Option<bool>,
    #[serde(default)]
    pub(crate) duration_ms: Option<u64>,
    #[serde(default)]
    pub(crate) actions: Vec<NotificationAction>,
}

#[derive(Serialize)]
#[cfg_attr(test, derive(Deserialize))]
pub(crate) struct AddResponse {
    pub(crate) id: String,
}

#[derive(Serialize)]
struct AddErrorResponse {
    error: &'static str,
}

pub(crate) async fn add(
    State(state): State<state::AppState>,
    Json(request): Json<AddRequest>,
) -> Response {
    if request.title.trim().is_empty() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(AddErrorResponse {
                error: "title is required",
            }),
        )
            .into_response();
    }

    let id = state.notifications.add(
        request.category,
        request.title.trim(),
        request.message.as_deref(),
        AddOptions {
            auto_hide: request.auto_hide.unwrap_or(true),
            duration: request.duration_ms.map(Duration::from_millis),
            actions: request.actions,
        },
    );

    (StatusCode::CREATED, Json(AddResponse { id })).into_response()
}

#[derive(Serialize)]
#[cfg_attr(test, derive(Deserialize))]
pub(crate) struct FeedDebugResponse {
    pub(crate) running: bool,
    pub(crate) interval_ms: u64,
}

pub(crate) async fn feed_debug(State(state): State<state::AppState>) -> Json<FeedDebugResponse> {
    let running = (*state.feed)
        .as_ref()
        .is_some_and(|feed| !feed.is_finished());
    Json(FeedDebugResponse {
        running,
        interval_ms: state.config.feed_interval.as_millis() as u64,
    })
}

pub(crate) async fn mark_read(
    State(state): State<state::AppState>,
    AxumPath(id): AxumPath<String>,
) -> StatusCode {
    state.notifications.mark_read(&id);
    StatusCode::NO_CONTENT
}

pub(crate) async fn mark_all_read(State(state): State<state::AppState>) -> StatusCode {
    state.notifications.mark_all_read();
    StatusCode::NO_CONTENT
}

pub(crate) async fn remove(
    State(state): State<state::AppState>,
    AxumPath(id): AxumPath<String>,
) -> StatusCode {
    state.notifications.remove(&id);
    StatusCode::NO_CONTENT
}

pub(crate) async fn clear(State(state): State<state::AppState>) -> StatusCode {
    state.notifications.clear();
    StatusCode::NO_CONTENT
}
