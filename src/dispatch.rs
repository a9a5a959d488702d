use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use lambda_http::tracing;
use serde_json::Value;

use crate::codec::{self, CodecError, Payload};
use crate::error::ServerError;
use crate::sites::{create_site, increment_site, read_site, Outcome};
use crate::store::{Item, SiteStore, StoreError};

pub const INCORRECT_BODY: &str = "Incorrect body";
pub const UNSUPPORTED_OPERATION: &str = "Unsupported operation";
pub const MISSING_WEBSITE: &str = "Missing website";

/// The parts of an inbound gateway event the dispatcher looks at.
#[derive(Debug, Clone)]
pub struct VisitRequest {
    pub method: Method,
    /// `website` path parameter, when the route carries one.
    pub website: Option<String>,
    pub body: String,
}

/// Uniform response: status, CORS header and a JSON body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub status: StatusCode,
    pub body: String,
}

impl Envelope {
    fn ok<T: Payload>(outcome: &Outcome<T>) -> Result<Self, CodecError> {
        Ok(Self {
            status: StatusCode::OK,
            body: codec::encode(outcome)?,
        })
    }

    fn bad_request(message: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: codec::error_body(message),
        }
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        (
            self.status,
            [
                (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
                (header::CONTENT_TYPE, "application/json"),
            ],
            self.body,
        )
            .into_response()
    }
}

pub async fn dispatch(
    store: &dyn SiteStore,
    request: VisitRequest,
) -> Result<Envelope, ServerError> {
    tracing::info!(method = %request.method, website = ?request.website, "visit request");

    match request.method {
        Method::GET => {
            let Some(site) = request.website else {
                return Ok(Envelope::bad_request(MISSING_WEBSITE));
            };
            let outcome = read_site(store, &site).await?;
            Ok(Envelope::ok(&outcome)?)
        }
        Method::POST => {
            let Some(site) = website_from_body(&request.body) else {
                tracing::debug!(body_len = request.body.len(), "rejected visit body");
                return Ok(Envelope::bad_request(INCORRECT_BODY));
            };
            let outcome = record_visit(store, &site).await?;
            Ok(Envelope::ok(&outcome)?)
        }
        _ => Ok(Envelope::bad_request(UNSUPPORTED_OPERATION)),
    }
}

/// Extracts a non-empty string `website` from a JSON object body.
fn website_from_body(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("website")?
        .as_str()
        .filter(|site| !site.trim().is_empty())
        .map(str::to_string)
}

/// Counts a visit, creating the record on the first one.
async fn record_visit(store: &dyn SiteStore, site: &str) -> Result<Outcome<Item>, StoreError> {
    let outcome = increment_site(store, site).await?;
    if outcome.is_done() {
        return Ok(outcome);
    }

    if create_site(store, site).await?.is_done() {
        return read_site(store, site).await;
    }

    // A concurrent first visit created the record; count this one on top.
    let outcome = increment_site(store, site).await?;
    if outcome.is_done() {
        return Ok(outcome);
    }
    read_site(store, site).await
}
