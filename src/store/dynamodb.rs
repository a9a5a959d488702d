use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::create_table::CreateTableError;
use aws_sdk_dynamodb::operation::describe_table::DescribeTableError;
use aws_sdk_dynamodb::operation::get_item::GetItemError;
use aws_sdk_dynamodb::operation::put_item::PutItemError;
use aws_sdk_dynamodb::operation::update_item::UpdateItemError;
use aws_sdk_dynamodb::types::{
    AttributeDefinition, AttributeValue, KeySchemaElement, KeyType, ProvisionedThroughput,
    ReturnValue, ScalarAttributeType, TableDescription, TableStatus,
};
use aws_sdk_dynamodb::Client;
use lambda_http::tracing;

use super::{new_item, Item, Result, SiteStore, StoreError, COUNTER, SITE};
use crate::config::Config;

const TABLE_ACTIVE_ATTEMPTS: u32 = 60;
const TABLE_ACTIVE_DELAY: Duration = Duration::from_secs(1);

/// Site store over a single DynamoDB table keyed by `site`.
#[derive(Debug, Clone)]
pub struct DynamoDbStore {
    client: Client,
    table_name: String,
}

impl DynamoDbStore {
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    /// Builds a client from the default credential chain, pinned to the
    /// configured region and, when set, a local endpoint.
    pub async fn connect(config: &Config) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()));

        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }

        let sdk_config = loader.load().await;
        Self::new(Client::new(&sdk_config), config.table_name.clone())
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Creates the visits table unless it already exists, then waits for it
    /// to become active.
    ///
    /// Returns a one-line description of the table such as
    /// `Table Status: ACTIVE. Item Count: 3`.
    pub async fn ensure_table(&self) -> Result<String> {
        if let Some(table) = self.describe_table().await? {
            return Ok(describe(&table));
        }

        tracing::info!(table = %self.table_name, "Creating table");
        self.create_table().await?;
        self.wait_for_table_active().await
    }

    /// Drops the visits table.
    #[cfg(test)]
    pub async fn delete_table(&self) -> Result<()> {
        self.client
            .delete_table()
            .table_name(&self.table_name)
            .send()
            .await
            .map_err(|e| StoreError::QueryFailed(format!("DeleteTable failed: {e}")))?;

        tracing::info!(table = %self.table_name, "Deleted table");
        Ok(())
    }

    async fn describe_table(&self) -> Result<Option<TableDescription>> {
        match self
            .client
            .describe_table()
            .table_name(&self.table_name)
            .send()
            .await
        {
            Ok(output) => Ok(output.table),
            Err(err) => match err.into_service_error() {
                DescribeTableError::ResourceNotFoundException(_) => Ok(None),
                err => Err(StoreError::QueryFailed(format!(
                    "DescribeTable failed: {err:?}"
                ))),
            },
        }
    }

    async fn create_table(&self) -> Result<()> {
        let key_schema = KeySchemaElement::builder()
            .attribute_name(SITE)
            .key_type(KeyType::Hash)
            .build()
            .map_err(|e| StoreError::InvalidData(e.to_string()))?;

        let attribute_definition = AttributeDefinition::builder()
            .attribute_name(SITE)
            .attribute_type(ScalarAttributeType::S)
            .build()
            .map_err(|e| StoreError::InvalidData(e.to_string()))?;

        let throughput = ProvisionedThroughput::builder()
            .read_capacity_units(1)
            .write_capacity_units(1)
            .build()
            .map_err(|e| StoreError::InvalidData(e.to_string()))?;

        let created = self
            .client
            .create_table()
            .table_name(&self.table_name)
            .key_schema(key_schema)
            .attribute_definitions(attribute_definition)
            .provisioned_throughput(throughput)
            .send()
            .await;

        match created {
            Ok(_) => Ok(()),
            Err(err) => match err.into_service_error() {
                // Someone else created it between describe and create.
                CreateTableError::ResourceInUseException(_) => Ok(()),
                err => Err(StoreError::QueryFailed(format!(
                    "CreateTable failed: {err:?}"
                ))),
            },
        }
    }

    async fn wait_for_table_active(&self) -> Result<String> {
        for _ in 0..TABLE_ACTIVE_ATTEMPTS {
            if let Some(table) = self.describe_table().await? {
                if table.table_status() == Some(&TableStatus::Active) {
                    return Ok(describe(&table));
                }
            }
            tokio::time::sleep(TABLE_ACTIVE_DELAY).await;
        }

        Err(StoreError::QueryFailed(format!(
            "Table {} did not become active",
            self.table_name
        )))
    }
}

fn describe(table: &TableDescription) -> String {
    format!(
        "Table Status: {}. Item Count: {}",
        table
            .table_status()
            .map(|status| status.as_str())
            .unwrap_or("UNKNOWN"),
        table.item_count().unwrap_or_default()
    )
}

#[async_trait]
impl SiteStore for DynamoDbStore {
    async fn put_new(&self, site: &str, timestamp: i64) -> Result<()> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(new_item(site, timestamp)))
            .condition_expression("attribute_not_exists(site)")
            .send()
            .await
            .map_err(|e| map_put_item_error(e, site))?;

        Ok(())
    }

    async fn get(&self, site: &str) -> Result<Option<Item>> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(SITE, AttributeValue::S(site.to_string()))
            .consistent_read(true)
            .send()
            .await
            .map_err(map_get_item_error)?;

        Ok(result.item)
    }

    async fn increment(&self, site: &str, timestamp: i64) -> Result<Item> {
        let result = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key(SITE, AttributeValue::S(site.to_string()))
            .condition_expression("attribute_exists(site)")
            // `counter` is a reserved word.
            .update_expression("SET last_updated = :t, #c = #c + :inc")
            .expression_attribute_names("#c", COUNTER)
            .expression_attribute_values(":t", AttributeValue::N(timestamp.to_string()))
            .expression_attribute_values(":inc", AttributeValue::N("1".to_string()))
            .return_values(ReturnValue::AllNew)
            .send()
            .await
            .map_err(|e| map_update_item_error(e, site))?;

        result.attributes.ok_or_else(|| {
            StoreError::InvalidData(format!("UpdateItem returned no attributes for {site}"))
        })
    }
}

fn map_put_item_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<PutItemError, R>,
    site: &str,
) -> StoreError {
    match err.into_service_error() {
        PutItemError::ConditionalCheckFailedException(_) => StoreError::AlreadyExists {
            site: site.to_string(),
        },
        PutItemError::ResourceNotFoundException(_) => {
            StoreError::QueryFailed("Table not found".to_string())
        }
        PutItemError::ProvisionedThroughputExceededException(_) => {
            StoreError::QueryFailed("Throughput exceeded".to_string())
        }
        PutItemError::InternalServerError(_) => {
            StoreError::QueryFailed("DynamoDB internal server error".to_string())
        }
        err => StoreError::QueryFailed(format!("PutItem failed: {err:?}")),
    }
}

fn map_get_item_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<GetItemError, R>,
) -> StoreError {
    match err.into_service_error() {
        GetItemError::ResourceNotFoundException(_) => {
            StoreError::QueryFailed("Table not found".to_string())
        }
        GetItemError::ProvisionedThroughputExceededException(_) => {
            StoreError::QueryFailed("Throughput exceeded".to_string())
        }
        GetItemError::InternalServerError(_) => {
            StoreError::QueryFailed("DynamoDB internal server error".to_string())
        }
        err => StoreError::QueryFailed(format!("GetItem failed: {err:?}")),
    }
}

fn map_update_item_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<UpdateItemError, R>,
    site: &str,
) -> StoreError {
    match err.into_service_error() {
        UpdateItemError::ConditionalCheckFailedException(_) => StoreError::NotFound {
            site: site.to_string(),
        },
        UpdateItemError::ResourceNotFoundException(_) => {
            StoreError::QueryFailed("Table not found".to_string())
        }
        UpdateItemError::ProvisionedThroughputExceededException(_) => {
            StoreError::QueryFailed("Throughput exceeded".to_string())
        }
        UpdateItemError::InternalServerError(_) => {
            StoreError::QueryFailed("DynamoDB internal server error".to_string())
        }
        err => StoreError::QueryFailed(format!("UpdateItem failed: {err:?}")),
    }
}
