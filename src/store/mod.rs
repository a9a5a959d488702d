//! Persistence for site records.
//!
//! The handler talks to storage only through [`SiteStore`], so tests can swap
//! the DynamoDB table for [`InMemoryStore`] without touching global state.

mod dynamodb;
mod memory;

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use thiserror::Error;

pub use dynamodb::DynamoDbStore;
pub use memory::InMemoryStore;

/// A stored row, exactly as the table returns it.
pub type Item = HashMap<String, AttributeValue>;

pub const SITE: &str = "site";
pub const COUNTER: &str = "counter";
pub const LAST_UPDATED: &str = "last_updated";

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum StoreError {
    #[error("Site already exists: {site}")]
    AlreadyExists { site: String },
    #[error("Site not found: {site}")]
    NotFound { site: String },
    #[error("Query failed: {0}")]
    QueryFailed(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Single-row operations against the visits table.
///
/// Each method is one round trip. The conditional variants report their
/// condition failing through [`StoreError::AlreadyExists`] and
/// [`StoreError::NotFound`]; every other error is an infrastructure fault.
#[async_trait]
pub trait SiteStore: Send + Sync {
    /// Inserts `{site, counter: 1, last_updated: timestamp}` unless the key exists.
    async fn put_new(&self, site: &str, timestamp: i64) -> Result<()>;

    /// Strongly consistent point read.
    async fn get(&self, site: &str) -> Result<Option<Item>>;

    /// Sets `last_updated` and bumps `counter` by one if the key exists,
    /// returning every attribute of the updated row.
    async fn increment(&self, site: &str, timestamp: i64) -> Result<Item>;
}

/// Builds the attribute map for a freshly created site.
pub(crate) fn new_item(site: &str, timestamp: i64) -> Item {
    HashMap::from([
        (SITE.to_string(), AttributeValue::S(site.to_string())),
        (COUNTER.to_string(), AttributeValue::N("1".to_string())),
        (
            LAST_UPDATED.to_string(),
            AttributeValue::N(timestamp.to_string()),
        ),
    ])
}

/// A store whose every call fails the way an unreachable table does.
#[cfg(test)]
pub(crate) struct FailingStore;

#[cfg(test)]
#[async_trait]
impl SiteStore for FailingStore {
    async fn put_new(&self, _site: &str, _timestamp: i64) -> Result<()> {
        Err(StoreError::QueryFailed("Table not found".to_string()))
    }

    async fn get(&self, _site: &str) -> Result<Option<Item>> {
        Err(StoreError::QueryFailed("Table not found".to_string()))
    }

    async fn increment(&self, _site: &str, _timestamp: i64) -> Result<Item> {
        Err(StoreError::QueryFailed("Table not found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_item_starts_counter_at_one() {
        let item = new_item("example.com", 1_700_000_000);

        assert_eq!(item.len(), 3);
        assert_eq!(item[SITE], AttributeValue::S("example.com".to_string()));
        assert_eq!(item[COUNTER], AttributeValue::N("1".to_string()));
        assert_eq!(
            item[LAST_UPDATED],
            AttributeValue::N("1700000000".to_string())
        );
    }

    #[test]
    fn test_store_error_display() {
        let error = StoreError::AlreadyExists {
            site: "example.com".to_string(),
        };
        assert_eq!(error.to_string(), "Site already exists: example.com");

        let error = StoreError::QueryFailed("Table not found".to_string());
        assert_eq!(error.to_string(), "Query failed: Table not found");
    }
}
