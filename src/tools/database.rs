//! Direct MongoDB introspection tools.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use super::{ParamSpec, ParamType, ToolDescriptor, ToolHandler, ToolRegistry, ValidatedArgs};
use crate::error::ToolError;
use crate::mongo::DatabaseApi;
use crate::InvokeOutput;

pub const DEFAULT_TOP_N: i64 = 10;
pub const MAX_TOP_N: i64 = 100;

const CONNECTION_STRING_DESCRIPTION: &str = "MongoDB connection string including user and \
     password. Query it with `describe_replica_set_role` when an instance ID is known, \
     preferring the public network address. Defaults to the server's configured deployment.";

pub fn register(registry: &mut ToolRegistry, database: &Arc<dyn DatabaseApi>) {
    registry.register(Arc::new(ListDatabasesTool::new(database.clone())));
    registry.register(Arc::new(TopReusableSpaceTool::new(database.clone())));
}

fn connection_string_param() -> ParamSpec {
    ParamSpec::optional(
        "connection_string",
        ParamType::String,
        CONNECTION_STRING_DESCRIPTION,
    )
    .secret()
}

pub struct ListDatabasesTool {
    descriptor: ToolDescriptor,
    database: Arc<dyn DatabaseApi>,
}

impl ListDatabasesTool {
    pub fn new(database: Arc<dyn DatabaseApi>) -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: "list_databases",
                description: "List every database of a MongoDB deployment with its size on disk, \
                              largest first.",
                params: vec![connection_string_param()],
            },
            database,
        }
    }
}

#[async_trait]
impl ToolHandler for ListDatabasesTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, args: ValidatedArgs) -> Result<InvokeOutput, ToolError> {
        let mut databases = self
            .database
            .list_databases(args.opt_str("connection_string"))
            .await?;
        databases.sort_by(|a, b| {
            b.size_on_disk
                .cmp(&a.size_on_disk)
                .then_with(|| a.name.cmp(&b.name))
        });
        let total_size_on_disk: u64 = databases.iter().map(|d| d.size_on_disk).sum();

        Ok(InvokeOutput {
            output: json!({
                "databases": serde_json::to_value(&databases)?,
                "total_size_on_disk": total_size_on_disk,
            }),
        })
    }
}

pub struct TopReusableSpaceTool {
    descriptor: ToolDescriptor,
    database: Arc<dyn DatabaseApi>,
}

impl TopReusableSpaceTool {
    pub fn new(database: Arc<dyn DatabaseApi>) -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: "get_top_reusable_space_collections",
                description: "Get the collections with the most reusable (reclaimable by \
                              compaction) storage space in a MongoDB deployment.",
                params: vec![
                    connection_string_param(),
                    ParamSpec::optional(
                        "database",
                        ParamType::String,
                        "Only inspect this database. Default: all databases.",
                    ),
                    ParamSpec::optional(
                        "top_n",
                        ParamType::Integer,
                        "Number of collections to return. Default: 10, at most 100.",
                    ),
                ],
            },
            database,
        }
    }
}

#[async_trait]
impl ToolHandler for TopReusableSpaceTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, args: ValidatedArgs) -> Result<InvokeOutput, ToolError> {
        let top_n = args.opt_int("top_n").unwrap_or(DEFAULT_TOP_N);
        if top_n < 1 {
            return Err(ToolError::invalid("top_n", "must be at least 1"));
        }
        let top_n = top_n.min(MAX_TOP_N) as usize;

        let mut collections = self
            .database
            .collection_reusable_space(args.opt_str("connection_string"), args.opt_str("database"))
            .await?;
        collections.sort_by(|a, b| {
            b.reusable_bytes
                .cmp(&a.reusable_bytes)
                .then_with(|| a.database.cmp(&b.database))
                .then_with(|| a.collection.cmp(&b.collection))
        });
        collections.truncate(top_n);

        Ok(InvokeOutput {
            output: json!({
                "top_n": top_n,
                "collections": serde_json::to_value(&collections)?,
            }),
        })
    }
}
