use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use tokio::sync::RwLock;

use super::{new_item, Item, Result, SiteStore, StoreError, COUNTER, LAST_UPDATED};

/// Table emulation for tests and local runs.
///
/// Every operation holds the lock for its whole check-and-write, which gives
/// the same atomic conditional writes as the managed table.
/// Data is lost when the last clone is dropped.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    items: Arc<RwLock<HashMap<String, Item>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes a row unconditionally, replacing any existing one.
    #[cfg(test)]
    pub async fn seed(&self, site: &str, counter: i64, last_updated: i64) {
        let mut item = new_item(site, last_updated);
        item.insert(COUNTER.to_string(), AttributeValue::N(counter.to_string()));
        self.items.write().await.insert(site.to_string(), item);
    }
}

#[async_trait]
impl SiteStore for InMemoryStore {
    async fn put_new(&self, site: &str, timestamp: i64) -> Result<()> {
        let mut items = self.items.write().await;
        if items.contains_key(site) {
            return Err(StoreError::AlreadyExists {
                site: site.to_string(),
            });
        }
        items.insert(site.to_string(), new_item(site, timestamp));
        Ok(())
    }

    async fn get(&self, site: &str) -> Result<Option<Item>> {
        let items = self.items.read().await;
        Ok(items.get(site).cloned())
    }

    async fn increment(&self, site: &str, timestamp: i64) -> Result<Item> {
        let mut items = self.items.write().await;
        let item = items.get_mut(site).ok_or_else(|| StoreError::NotFound {
            site: site.to_string(),
        })?;

        let counter = match item.get(COUNTER) {
            Some(AttributeValue::N(raw)) => raw.parse::<i64>().map_err(|_| {
                StoreError::InvalidData(format!("counter of {site} is not an integer: {raw}"))
            })?,
            Some(other) => {
                return Err(StoreError::InvalidData(format!(
                    "counter of {site} is not a number: {other:?}"
                )))
            }
            None => {
                return Err(StoreError::InvalidData(format!(
                    "counter of {site} is missing"
                )))
            }
        };

        let counter = counter.checked_add(1).ok_or_else(|| {
            StoreError::InvalidData(format!("counter of {site} overflows"))
        })?;

        item.insert(COUNTER.to_string(), AttributeValue::N(counter.to_string()));
        item.insert(
            LAST_UPDATED.to_string(),
            AttributeValue::N(timestamp.to_string()),
        );

        Ok(item.clone())
    }
}
