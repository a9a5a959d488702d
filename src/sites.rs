//! Create, read and increment operations on site records.
//!
//! Each operation makes exactly one store call. Conditional-write failures
//! come back as [`Outcome::Miss`]; any other store error is returned as `Err`
//! and must not be reported as a business miss.

use chrono::Utc;
use lambda_http::tracing;

use crate::store::{Item, SiteStore, StoreError};

/// An expected negative outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Miss {
    AlreadyExists,
    NotFound,
}

impl Miss {
    pub fn message(&self) -> &'static str {
        match self {
            Miss::AlreadyExists => "Item Exists. Use update.",
            Miss::NotFound => "Item not found.",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Done(T),
    Miss(Miss),
}

impl<T> Outcome<T> {
    pub fn is_done(&self) -> bool {
        matches!(self, Outcome::Done(_))
    }
}

fn now() -> i64 {
    Utc::now().timestamp()
}

/// Records the first visit of `site`.
pub async fn create_site(
    store: &dyn SiteStore,
    site: &str,
) -> Result<Outcome<()>, StoreError> {
    match store.put_new(site, now()).await {
        Ok(()) => {
            tracing::info!(site, "Item Added");
            Ok(Outcome::Done(()))
        }
        Err(StoreError::AlreadyExists { .. }) => {
            tracing::debug!(site, "create skipped, site exists");
            Ok(Outcome::Miss(Miss::AlreadyExists))
        }
        Err(err) => Err(err),
    }
}

pub async fn read_site(store: &dyn SiteStore, site: &str) -> Result<Outcome<Item>, StoreError> {
    match store.get(site).await? {
        Some(item) => Ok(Outcome::Done(item)),
        None => {
            tracing::debug!(site, "Item not found");
            Ok(Outcome::Miss(Miss::NotFound))
        }
    }
}

/// Counts one more visit of an existing `site`.
pub async fn increment_site(
    store: &dyn SiteStore,
    site: &str,
) -> Result<Outcome<Item>, StoreError> {
    match store.increment(site, now()).await {
        Ok(item) => Ok(Outcome::Done(item)),
        Err(StoreError::NotFound { .. }) => {
            tracing::debug!(site, "increment skipped, site not found");
            Ok(Outcome::Miss(Miss::NotFound))
        }
        Err(err) => Err(err),
    }
}
