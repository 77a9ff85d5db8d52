pub mod config;
pub mod error;
pub mod mcp_server;
pub mod mongo;
pub mod openapi;
pub mod tools;

pub use config::{Config, Credentials};
pub use error::{ConfigError, DatabaseError, McpError, RemoteError, ToolError};
pub use mcp_server::ApsaraDbMcpServer;
pub use mongo::{DatabaseApi, MongoIntrospector};
pub use openapi::{CloudApi, OpenApiClient};
pub use tools::{ToolHandler, ToolRegistry};

/// Maximum size for tool response output
pub const MAX_TOOL_RESPONSE_SIZE: usize = 100_000;

/// Tool invocation output
#[derive(Debug, Clone)]
pub struct InvokeOutput {
    pub output: serde_json::Value,
}
