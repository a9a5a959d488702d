use std::sync::Arc;

use axum::extract::rejection::StringRejection;
use axum::extract::{Path, State};
use axum::http::Method;
use axum::routing::{any, get};
use axum::Router;

use crate::dispatch::{dispatch, Envelope, VisitRequest};
use crate::error::ServerError;
use crate::hello::hello;
use crate::store::SiteStore;

/// Handle to the store, shared by every request of this execution environment.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SiteStore>,
}

pub fn create_app(state: AppState) -> Router {
    // Every method reaches the dispatcher so unsupported ones get the JSON 400.
    let visits = Router::new()
        .route("/visits", any(visit))
        .route("/visits/{website}", any(visit_site))
        .with_state(state);
    let greeting = Router::new().route("/hello", get(hello));

    Router::new().merge(visits).merge(greeting)
}

async fn visit(
    State(state): State<AppState>,
    method: Method,
    body: Result<String, StringRejection>,
) -> Result<Envelope, ServerError> {
    let request = VisitRequest {
        method,
        website: None,
        body: body?,
    };
    dispatch(state.store.as_ref(), request).await
}

async fn visit_site(
    State(state): State<AppState>,
    method: Method,
    Path(website): Path<String>,
    body: Result<String, StringRejection>,
) -> Result<Envelope, ServerError> {
    let request = VisitRequest {
        method,
        website: Some(website),
        body: body?,
    };
    dispatch(state.store.as_ref(), request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FailingStore, InMemoryStore};
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        response::Response,
    };
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    fn app_with(store: InMemoryStore) -> Router {
        create_app(AppState {
            store: Arc::new(store),
        })
    }

    async fn body_json(response: Response) -> Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    fn assert_cors(response: &Response) {
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
    }

    #[tokio::test]
    async fn test_unsupported_method() {
        let app = app_with(InMemoryStore::new());

        let response = app
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/visits/example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_cors(&response);
        assert_eq!(body_json(response).await["code"], "Error");
    }

    #[tokio::test]
    async fn test_incorrect_body() {
        let app = app_with(InMemoryStore::new());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/visits")
                    .header("Content-Type", "application/json")
                    .body(Body::from(r#"{"webs": "example.net"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_cors(&response);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({ "code": "Error", "message": "Incorrect body" })
        );
    }

    #[tokio::test]
    async fn test_post_then_get() {
        let app = app_with(InMemoryStore::new());

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/visits")
                    .body(Body::from(r#"{"website":"new.example"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_cors(&response);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        let body = body_json(response).await;
        assert_eq!(body["code"], "Success");
        assert_eq!(body["data"]["counter"], 1);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/visits/new.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_cors(&response);
        let body = body_json(response).await;
        assert_eq!(body["data"]["site"], "new.example");
        assert_eq!(body["data"]["counter"], 1);
    }

    #[tokio::test]
    async fn test_post_existing_site() {
        let store = InMemoryStore::new();
        store.seed("existing.example", 5, 100).await;
        let app = app_with(store);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/visits")
                    .body(Body::from(r#"{"website":"existing.example"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["code"], "Success");
        assert_eq!(body["data"]["counter"], 6);
    }

    #[tokio::test]
    async fn test_get_missing_site() {
        let app = app_with(InMemoryStore::new());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/visits/example.org")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_cors(&response);
        assert_eq!(body_json(response).await["code"], "Error");
    }

    #[tokio::test]
    async fn test_get_without_website() {
        let app = app_with(InMemoryStore::new());

        let response = app
            .oneshot(Request::builder().uri("/visits").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_cors(&response);
    }

    #[tokio::test]
    async fn test_non_utf8_body_is_rejected() {
        let app = app_with(InMemoryStore::new());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/visits")
                    .body(Body::from(vec![0xff, 0xfe, 0xfd]))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_store_fault_is_internal_error() {
        let app = create_app(AppState {
            store: Arc::new(FailingStore),
        });

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/visits")
                    .body(Body::from(r#"{"website":"example.com"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_hello_route() {
        let app = app_with(InMemoryStore::new());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/hello?input=ping")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["message"], crate::hello::GREETING);
        assert_eq!(body["input"], "ping");
    }
}
