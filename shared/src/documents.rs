use crate::error::{ProviderError, ProviderResult};
use async_trait::async_trait;
use aws_sdk_dynamodb::{error::DisplayErrorContext, types::AttributeValue, Client as DynamoClient};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// `collection/id` address of a mirrored document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPath {
    pub collection: String,
    pub id: String,
}

impl DocumentPath {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }

    pub fn medico(uid: &str) -> Self {
        Self::new("medicos", uid)
    }

    /// Single-table key, e.g. `MEDICOS#abc123`
    pub fn partition_key(&self) -> String {
        format!("{}#{}", self.collection.to_ascii_uppercase(), self.id)
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Bool(bool),
    Text(String),
    /// Resolved by the store at write time
    ServerTimestamp,
}

pub type Fields = BTreeMap<String, FieldValue>;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create the document if absent, otherwise overwrite only the given fields
    async fn upsert_merge(&self, path: &DocumentPath, fields: Fields) -> ProviderResult<()>;
}

/// `SET` expression plus its placeholder maps for an `UpdateItem` call
#[derive(Debug)]
pub struct UpdatePlan {
    pub expression: String,
    pub names: HashMap<String, String>,
    pub values: HashMap<String, AttributeValue>,
}

pub fn plan_update(fields: &Fields, now: &str) -> UpdatePlan {
    let mut assignments = Vec::with_capacity(fields.len());
    let mut names = HashMap::new();
    let mut values = HashMap::new();

    for (i, (field, value)) in fields.iter().enumerate() {
        let name = format!("#f{}", i);
        let placeholder = format!(":v{}", i);
        let attr = match value {
            FieldValue::Bool(b) => AttributeValue::Bool(*b),
            FieldValue::Text(s) => AttributeValue::S(s.clone()),
            FieldValue::ServerTimestamp => AttributeValue::S(now.to_string()),
        };
        assignments.push(format!("{} = {}", name, placeholder));
        names.insert(name, field.clone());
        values.insert(placeholder, attr);
    }

    UpdatePlan {
        expression: format!("SET {}", assignments.join(", ")),
        names,
        values,
    }
}

/// DynamoDB single-table store; PK and SK both hold the document key
pub struct DynamoDocumentStore {
    client: DynamoClient,
    table_name: String,
}

impl DynamoDocumentStore {
    pub fn new(client: DynamoClient, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }
}

#[async_trait]
impl DocumentStore for DynamoDocumentStore {
    async fn upsert_merge(&self, path: &DocumentPath, fields: Fields) -> ProviderResult<()> {
        if fields.is_empty() {
            return Ok(());
        }

        let pk = path.partition_key();
        let now = chrono::Utc::now().to_rfc3339();
        let plan = plan_update(&fields, &now);

        let mut builder = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(pk.clone()))
            .key("SK", AttributeValue::S(pk))
            .update_expression(plan.expression);

        for (k, v) in plan.names {
            builder = builder.expression_attribute_names(k, v);
        }

        for (k, v) in plan.values {
            builder = builder.expression_attribute_values(k, v);
        }

        builder
            .send()
            .await
            .map_err(|e| ProviderError::new(DisplayErrorContext(e).to_string()))?;

        tracing::info!("Merged {} field(s) into {}", fields.len(), path);
        Ok(())
    }
}
