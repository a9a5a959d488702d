use axum::extract::Query;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

pub const GREETING: &str = "Go Serverless v1.0! Your function executed successfully!";

#[derive(Debug, Deserialize)]
pub struct HelloQueryParams {
    pub input: Option<String>,
}

pub async fn hello(Query(params): Query<HelloQueryParams>) -> Json<Value> {
    Json(json!({ "message": GREETING, "input": params.input }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hello_without_input() {
        let Json(body) = hello(Query(HelloQueryParams { input: None })).await;

        assert_eq!(body, json!({ "message": GREETING, "input": null }));
    }

    #[tokio::test]
    async fn test_hello_echoes_input() {
        let Json(body) = hello(Query(HelloQueryParams {
            input: Some("ping".to_string()),
        }))
        .await;

        assert_eq!(body["input"], "ping");
    }
}
