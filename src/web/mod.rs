//! # Web API
//!
//! axum boundary over the task and user services. Paths follow the existing client:
//!
//! | Method | Path | Session |
//! |---|---|---|
//! | POST | `/sign_up`, `/sign_in` | no |
//! | GET | `/health` | no |
//! | POST | `/logout` | yes |
//! | GET | `/get_tasks`, `/get_task` | yes |
//! | POST | `/create_task`, `/update_task`, `/update_priority` | yes |

pub mod auth;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod state;

pub use auth::{AuthenticatedUser, SessionAuthenticator};
pub use errors::{ApiError, ApiResult};
pub use state::AppState;

use axum::routing::{get, post};
use axum::Router;

/// Build the application router with its full middleware stack
pub fn create_app(state: AppState) -> Router {
    let protected = Router::new()
        .route("/logout", post(handlers::users::logout))
        .route("/get_tasks", get(handlers::tasks::get_tasks))
        .route("/get_task", get(handlers::tasks::get_task))
        .route("/create_task", post(handlers::tasks::create_task))
        .route("/update_task", post(handlers::tasks::update_task))
        .route("/update_priority", post(handlers::tasks::update_priority))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_session,
        ));

    let router = Router::new()
        .route("/sign_up", post(handlers::users::sign_up))
        .route("/sign_in", post(handlers::users::sign_in))
        .route("/health", get(handlers::health::basic_health))
        .merge(protected);

    middleware::apply_middleware_stack(router, &state.config.http_server).with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Method, Request, Response, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::test_helpers::{test_config, InMemoryStore};

    fn app() -> Router {
        let state = AppState::from_store(test_config(), Arc::new(InMemoryStore::default()))
            .expect("state");
        create_app(state)
    }

    fn json_request(method: Method, uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_json(response: Response<Body>) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// Sign up `username` and return the `name=value` pair of the session cookie
    async fn sign_up(app: &Router, username: &str) -> String {
        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/sign_up",
                None,
                json!({"username": username, "password": "secret", "email": "x@example.com"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .expect("session cookie")
            .to_str()
            .unwrap()
            .to_string();
        set_cookie.split(';').next().unwrap().to_string()
    }

    async fn create(app: &Router, cookie: &str, title: &str) -> Value {
        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/create_task",
                Some(cookie),
                json!({"task": {"title": title, "description": ""}}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await["task"].clone()
    }

    async fn list(app: &Router, cookie: &str) -> Vec<Value> {
        let response = app
            .clone()
            .oneshot(get_request("/get_tasks", Some(cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        body_json(response).await["tasks"]
            .as_array()
            .cloned()
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_task_routes_require_session() {
        let app = app();

        let response = app
            .clone()
            .oneshot(get_request("/get_tasks", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"]["code"], "UNAUTHORIZED");

        let response = app
            .oneshot(get_request("/get_tasks", Some("todo_session=garbage")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_create_list_and_reorder() {
        let app = app();
        let cookie = sign_up(&app, "alice").await;

        let a = create(&app, &cookie, "buy milk").await;
        let b = create(&app, &cookie, "walk dog").await;
        assert_eq!(a["priority"], 10_000);
        assert_eq!(a["status"], 1);
        assert_eq!(b["priority"], 20_000);

        let titles: Vec<Value> = list(&app, &cookie)
            .await
            .iter()
            .map(|t| t["title"].clone())
            .collect();
        assert_eq!(titles, vec![json!("walk dog"), json!("buy milk")]);

        // move A to the top: no prev neighbor
        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/update_priority",
                Some(&cookie),
                json!({"target_task": a, "next_task_priority": 20_000}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["task"]["priority"], 30_000);

        let titles: Vec<Value> = list(&app, &cookie)
            .await
            .iter()
            .map(|t| t["title"].clone())
            .collect();
        assert_eq!(titles, vec![json!("buy milk"), json!("walk dog")]);
    }

    #[tokio::test]
    async fn test_close_task_via_update() {
        let app = app();
        let cookie = sign_up(&app, "alice").await;
        let mut task = create(&app, &cookie, "buy milk").await;
        create(&app, &cookie, "walk dog").await;

        task["status"] = json!(2);
        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/update_task",
                Some(&cookie),
                json!({ "task": task }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["task"]["priority"], i32::MIN);

        let tasks = list(&app, &cookie).await;
        assert_eq!(tasks[1]["title"], "buy milk");
        assert_eq!(tasks[1]["status"], 2);
    }

    #[tokio::test]
    async fn test_foreign_task_is_a_bad_request() {
        let app = app();
        let alice = sign_up(&app, "alice").await;
        let bob = sign_up(&app, "bob").await;
        let task = create(&app, &alice, "private").await;

        let uri = format!("/get_task?task_id={}", task["id"]);
        let response = app
            .clone()
            .oneshot(get_request(&uri, Some(&bob)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "NOT_FOUND");

        let response = app.oneshot(get_request(&uri, Some(&alice))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["task"]["title"], "private");
    }

    #[tokio::test]
    async fn test_sign_in_and_logout() {
        let app = app();
        sign_up(&app, "alice").await;

        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/sign_in",
                None,
                json!({"username": "alice", "password": "wrong"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/sign_in",
                None,
                json!({"username": "alice", "password": "secret"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string();
        let body = body_json(response).await;
        assert_eq!(body["user"]["username"], "alice");
        assert!(body["user"].get("password_hash").is_none());

        let response = app
            .oneshot(json_request(Method::POST, "/logout", Some(&cookie), json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cleared = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(cleared.starts_with("todo_session="));
        assert_eq!(body_json(response).await["message"], "user alice logged out");
    }

    #[tokio::test]
    async fn test_logout_requires_existing_account() {
        let state = AppState::from_store(test_config(), Arc::new(InMemoryStore::default()))
            .expect("state");
        let ghost = crate::models::User {
            id: 404,
            username: "ghost".to_string(),
            password_hash: String::new(),
            email: String::new(),
            creation_ts: chrono::Utc::now(),
        };
        let token = state.authenticator.issue(&ghost).unwrap();
        let app = create_app(state);

        let response = app
            .oneshot(json_request(
                Method::POST,
                "/logout",
                Some(&format!("todo_session={token}")),
                json!({}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_malformed_body_and_query_are_bad_requests() {
        let app = app();
        let cookie = sign_up(&app, "alice").await;

        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/create_task",
                Some(&cookie),
                json!({"title": "missing envelope"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .clone()
            .oneshot(get_request("/get_task?task_id=abc", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(get_request("/get_tasks?limit=-5", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_health_and_request_id() {
        let app = app();
        let request_id = "6f2b1c1e-8d7a-4c5b-9e3f-0a1b2c3d4e5f";

        let request = Request::builder()
            .uri("/health")
            .header("x-request-id", request_id)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-request-id"], request_id);
        assert_eq!(body_json(response).await["status"], "ok");

        let response = app.oneshot(get_request("/health", None)).await.unwrap();
        assert!(response.headers().contains_key("x-request-id"));
    }
}
