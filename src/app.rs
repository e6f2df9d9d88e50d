use crate::adapters::{FileStore, TokioTimeProvider};
use crate::assets;
use crate::config;
use crate::feed::SyntheticFeed;
use crate::notify::NotificationCenter;
use crate::session::SessionStore;
use crate::state;

use axum::Router;
use axum::middleware;
use axum::routing::delete;
use axum::routing::get;
use axum::routing::post;

mod auth;
mod notifications;

pub fn app(config: config::AppConfig) -> Router {
    let time = TokioTimeProvider;
    let store = FileStore::open(&config.state_dir).unwrap_or_else(|err| {
        panic!(
            "failed to open state directory {}: {err}",
            config.state_dir.display()
        )
    });
    let sessions = SessionStore::new(store, time, config.session_ttl, config.login_delay);
    let center = NotificationCenter::new(time, config.notification_cap, config.dismiss_after);
    let feed = SyntheticFeed::new(time, config.feed_interval).spawn(center.clone());
    let state = state::AppState {
        config,
        sessions,
        notifications: center,
        feed: std::sync::Arc::new(feed),
    };
    Router::new()
        .route("/", get(notifications::dashboard))
        .route("/login", get(auth::login_form).post(auth::login_submit))
        .route(
            "/register",
            get(auth::register_form).post(auth::register_submit),
        )
        .route("/logout", post(auth::logout))
        .route(
            "/notifications/{id}/read",
            post(notifications::mark_read_form),
        )
        .route(
            "/notifications/{id}/dismiss",
            post(notifications::dismiss_form),
        )
        .route(
            "/notifications/read-all",
            post(notifications::mark_all_read_form),
        )
        .route("/notifications/clear", post(notifications::clear_form))
        .route("/api/session", get(notifications::session_info))
        .route(
            "/api/notifications",
            get(notifications::list)
                .post(notifications::add)
                .delete(notifications::clear),
        )
        .route(
            "/api/notifications/read-all",
            post(notifications::mark_all_read),
        )
        .route(
            "/api/notifications/{id}/read",
            post(notifications::mark_read),
        )
        .route("/api/notifications/{id}", delete(notifications::remove))
        .route("/api/debug/feed", get(notifications::feed_debug))
        .route("/static/style.css", get(assets::stylesheet))
        .route("/health", get(health))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state,
            auth::session_middleware,
        ))
}

pub(crate) async fn health() -> &'static str {
    "ok"
}

#[cfg(test)]
#[allow(non_snake_case)]
pub(crate) mod tests {
    use super::*;
    use crate::templates;
    use axum::body::Body;
    use axum::body::to_bytes;
    use axum::http::Request;
    use axum::http::StatusCode;
    use axum::http::header::LOCATION;
    use serde_json::Value as JsonValue;
    use serde_json::from_slice as json_from_slice;
    use serde_json::json;
    use tower::ServiceExt;

    use askama::Template as _;
    use std::path::PathBuf;

    #[tokio::test]
    async fn app__should_return_ok_on_health_endpoint() {
        // Given
        let app = app(config::AppConfig::default());

        // When
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        assert_eq!(body.as_ref(), b"ok");
    }

    #[tokio::test]
    async fn session_middleware__should_redirect_html_when_anonymous() {
        // Given
        let root = create_temp_state("redirect-anonymous");
        let app = app(test_config(root.clone()));

        // When
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response.headers().get(LOCATION).expect("location header");
        assert_eq!(location, "/login");

        std::fs::remove_dir_all(&root).expect("cleanup");
    }

    #[tokio::test]
    async fn session_middleware__should_return_json_unauthorized_for_api() {
        // Given
        let root = create_temp_state("api-unauthorized");
        let app = app(test_config(root.clone()));

        // When
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/notifications")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let payload: JsonValue = json_from_slice(&body).expect("parse json");
        assert_eq!(payload["error"], "unauthorized");

        std::fs::remove_dir_all(&root).expect("cleanup");
    }

    #[tokio::test]
    async fn session_info__should_report_anonymous() {
        // Given
        let root = create_temp_state("session-anonymous");
        let app = app(test_config(root.clone()));

        // When
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/session")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let payload: JsonValue = json_from_slice(&body).expect("parse json");
        assert_eq!(payload["authenticated"], false);
        assert!(payload["session"].is_null());

        std::fs::remove_dir_all(&root).expect("cleanup");
    }

    #[tokio::test]
    async fn login__should_redirect_and_persist_session() {
        // Given
        let root = create_temp_state("login-success");
        let app = app(test_config(root.clone()));

        // When
        let response = app
            .clone()
            .oneshot(login_request("a%40b.com", "x"))
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(LOCATION).expect("location header"),
            "/"
        );
        assert!(root.join("deskbell.session").exists());
        assert!(root.join("deskbell.session.issued-at").exists());

        let payload = session_payload(&app).await;
        assert_eq!(payload["authenticated"], true);
        assert_eq!(payload["session"]["subject_id"], "a@b.com");

        std::fs::remove_dir_all(&root).expect("cleanup");
    }

    #[tokio::test]
    async fn login__should_reject_empty_credentials() {
        // Given
        let root = create_temp_state("login-empty");
        let app = app(test_config(root.clone()));

        // When
        let response = app
            .oneshot(login_request("%20", "x"))
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let body = std::str::from_utf8(&body).expect("utf8 body");
        assert!(body.contains("Enter your email and password."));

        std::fs::remove_dir_all(&root).expect("cleanup");
    }

    #[tokio::test]
    async fn login__should_honor_sanitized_next_target() {
        // Given
        let root = create_temp_state("login-next");
        let app = app(test_config(root.clone()));

        // When
        let form = "identifier=a%40b.com&secret=x&next=https%3A%2F%2Fevil.example";
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/login")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from(form))
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then: absolute URLs are discarded in favor of the dashboard.
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(LOCATION).expect("location header"),
            "/"
        );

        std::fs::remove_dir_all(&root).expect("cleanup");
    }

    #[tokio::test]
    async fn register__should_authenticate() {
        // Given
        let root = create_temp_state("register-success");
        let app = app(test_config(root.clone()));

        // When
        let form = "display_name=Renata&contact_email=renata%40acme.example&organization=Acme";
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/register")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from(form))
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let payload = session_payload(&app).await;
        assert_eq!(payload["authenticated"], true);
        assert_eq!(payload["session"]["display_name"], "Renata");
        assert_eq!(payload["session"]["organization"], "Acme");

        std::fs::remove_dir_all(&root).expect("cleanup");
    }

    #[tokio::test]
    async fn register__should_reject_missing_fields() {
        // Given
        let root = create_temp_state("register-missing");
        let app = app(test_config(root.clone()));

        // When
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/register")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from("display_name=&contact_email="))
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        std::fs::remove_dir_all(&root).expect("cleanup");
    }

    #[tokio::test]
    async fn logout__should_clear_persisted_session() {
        // Given
        let root = create_temp_state("logout");
        let app = app(test_config(root.clone()));
        sign_in(&app).await;

        // When
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/logout")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(LOCATION).expect("location header"),
            "/login"
        );
        assert!(!root.join("deskbell.session").exists());
        assert!(!root.join("deskbell.session.issued-at").exists());
        let payload = session_payload(&app).await;
        assert_eq!(payload["authenticated"], false);

        std::fs::remove_dir_all(&root).expect("cleanup");
    }

    #[tokio::test]
    async fn session__should_survive_restart() {
        // Given
        let root = create_temp_state("restart");
        {
            let first = app(test_config(root.clone()));
            sign_in(&first).await;
        }

        // When
        let second = app(test_config(root.clone()));

        // Then
        let payload = session_payload(&second).await;
        assert_eq!(payload["authenticated"], true);
        assert_eq!(payload["session"]["subject_id"], "a@b.com");

        std::fs::remove_dir_all(&root).expect("cleanup");
    }

    #[tokio::test]
    async fn notifications_api__should_add_and_list() {
        // Given
        let root = create_temp_state("api-add");
        let app = app(test_config(root.clone()));
        sign_in(&app).await;

        // When
        let response = app
            .clone()
            .oneshot(add_request(json!({
                "category": "success",
                "title": "Saved",
                "message": "Changes saved",
                "auto_hide": false,
            })))
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let created: JsonValue = json_from_slice(&body).expect("parse json");
        let id = created["id"].as_str().expect("id").to_string();

        let listed = notifications_payload(&app).await;
        assert_eq!(listed["unread"], 1);
        assert_eq!(listed["notifications"][0]["id"], id.as_str());
        assert_eq!(listed["notifications"][0]["title"], "Saved");
        assert_eq!(listed["notifications"][0]["read"], false);

        std::fs::remove_dir_all(&root).expect("cleanup");
    }

    #[tokio::test]
    async fn notifications_api__should_reject_blank_title() {
        // Given
        let root = create_temp_state("api-blank-title");
        let app = app(test_config(root.clone()));
        sign_in(&app).await;

        // When
        let response = app
            .oneshot(add_request(json!({
                "category": "info",
                "title": "   ",
            })))
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        std::fs::remove_dir_all(&root).expect("cleanup");
    }

    #[tokio::test]
    async fn notifications_api__should_mark_read_and_read_all() {
        // Given
        let root = create_temp_state("api-mark-read");
        let app = app(test_config(root.clone()));
        sign_in(&app).await;
        let first = add_notification(&app, "First").await;
        add_notification(&app, "Second").await;

        // When
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/notifications/{first}/read"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let listed = notifications_payload(&app).await;
        assert_eq!(listed["unread"], 1);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/notifications/read-all")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let listed = notifications_payload(&app).await;
        assert_eq!(listed["unread"], 0);

        std::fs::remove_dir_all(&root).expect("cleanup");
    }

    #[tokio::test]
    async fn notifications_api__should_remove_and_clear() {
        // Given
        let root = create_temp_state("api-remove");
        let app = app(test_config(root.clone()));
        sign_in(&app).await;
        let first = add_notification(&app, "First").await;
        add_notification(&app, "Second").await;

        // When
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/api/notifications/{first}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let listed = notifications_payload(&app).await;
        assert_eq!(listed["notifications"].as_array().expect("array").len(), 1);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/notifications")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let listed = notifications_payload(&app).await;
        assert!(listed["notifications"].as_array().expect("array").is_empty());

        std::fs::remove_dir_all(&root).expect("cleanup");
    }

    #[tokio::test]
    async fn notifications_api__should_tolerate_unknown_id() {
        // Given
        let root = create_temp_state("api-unknown-id");
        let app = app(test_config(root.clone()));
        sign_in(&app).await;

        // When
        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/notifications/no-such-id")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        std::fs::remove_dir_all(&root).expect("cleanup");
    }

    #[tokio::test]
    async fn feed_debug__should_report_disabled_feed() {
        // Given
        let root = create_temp_state("feed-debug");
        let app = app(test_config(root.clone()));
        sign_in(&app).await;

        // When
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/debug/feed")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let payload: JsonValue = json_from_slice(&body).expect("parse json");
        assert_eq!(payload["running"], false);
        assert_eq!(payload["interval_ms"], 0);

        std::fs::remove_dir_all(&root).expect("cleanup");
    }

    #[tokio::test]
    async fn dashboard__should_render_notifications() {
        // Given
        let root = create_temp_state("dashboard");
        let app = app(test_config(root.clone()));
        sign_in(&app).await;
        add_notification(&app, "Report ready").await;

        // When
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let body = std::str::from_utf8(&body).expect("utf8 body");
        assert!(body.contains("Report ready"));
        assert!(body.contains("1 unread"));
        assert!(body.contains(r#"<span class="account-name">a</span>"#));

        std::fs::remove_dir_all(&root).expect("cleanup");
    }

    #[test]
    fn render_login__should_include_form_and_error() {
        // Given
        let template = templates::LoginTemplate {
            app_name: "Deskbell".to_string(),
            error: "Enter your email and password.".to_string(),
            next: "/".to_string(),
        };

        // When
        let html = template.render().unwrap();

        // Then
        assert!(html.contains(r#"action="/login""#));
        assert!(html.contains(r#"name="identifier""#));
        assert!(html.contains("Enter your email and password."));
    }

    #[test]
    fn render_dashboard__should_mark_unread_entries() {
        // Given
        let template = templates::DashboardTemplate {
            app_name: "Deskbell".to_string(),
            display_name: "Renata".to_string(),
            organization: "Acme".to_string(),
            plan_tier: "pro".to_string(),
            unread: 1,
            entries: vec![
                templates::NotificationRow {
                    id: "1-a".to_string(),
                    category: "success".to_string(),
                    title: "Saved".to_string(),
                    message: "Changes saved".to_string(),
                    created_at: "2025-06-01T10:00:00Z".to_string(),
                    read: false,
                },
                templates::NotificationRow {
                    id: "2-b".to_string(),
                    category: "info".to_string(),
                    title: "Heads up".to_string(),
                    message: String::new(),
                    created_at: "2025-06-01T10:01:00Z".to_string(),
                    read: true,
                },
            ],
        };

        // When
        let html = template.render().unwrap();

        // Then
        assert!(html.contains("notification success unread"));
        assert!(html.contains(r#"action="/notifications/1-a/read""#));
        assert!(html.contains(r#"action="/notifications/2-b/dismiss""#));
        assert!(html.contains("1 unread"));
    }

    #[test]
    fn render_dashboard__should_show_empty_state() {
        // Given
        let template = templates::DashboardTemplate {
            app_name: "Deskbell".to_string(),
            display_name: "Renata".to_string(),
            organization: "Acme".to_string(),
            plan_tier: "pro".to_string(),
            unread: 0,
            entries: Vec::new(),
        };

        // When
        let html = template.render().unwrap();

        // Then
        assert!(html.contains("No notifications yet."));
    }

    fn test_config(state_dir: PathBuf) -> config::AppConfig {
        config::AppConfig {
            state_dir,
            ..Default::default()
        }
    }

    fn login_request(identifier: &str, secret: &str) -> Request<Body> {
        let form = format!("identifier={identifier}&secret={secret}");
        Request::builder()
            .method("POST")
            .uri("/login")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(form))
            .unwrap()
    }

    fn add_request(payload: JsonValue) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/notifications")
            .header("content-type", "application/json")
            .body(Body::from(payload.to_string()))
            .unwrap()
    }

    async fn sign_in(app: &Router) {
        let response = app
            .clone()
            .oneshot(login_request("a%40b.com", "x"))
            .await
            .expect("login request failed");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    async fn add_notification(app: &Router, title: &str) -> String {
        let response = app
            .clone()
            .oneshot(add_request(json!({
                "category": "info",
                "title": title,
                "auto_hide": false,
            })))
            .await
            .expect("add request failed");
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let created: JsonValue = json_from_slice(&body).expect("parse json");
        created["id"].as_str().expect("id").to_string()
    }

    async fn session_payload(app: &Router) -> JsonValue {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/session")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("session request failed");
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        json_from_slice(&body).expect("parse json")
    }

    async fn notifications_payload(app: &Router) -> JsonValue {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/notifications")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("list request failed");
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        json_from_slice(&body).expect("parse json")
    }

    fn create_temp_state(test_name: &str) -> PathBuf {
        let mut root = std::env::temp_dir();
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time")
            .as_nanos();
        root.push(format!("deskbell-{}-{}", test_name, nanos));
        std::fs::create_dir_all(&root).expect("create temp dir");
        root
    }
}
