use std::io::{BufRead, BufReader, Write};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Result;
use crate::mongo::MongoIntrospector;
use crate::openapi::OpenApiClient;
use crate::tools::{render_output, ToolRegistry};

const SERVER_NAME: &str = "apsaradb_mongodb_mcp_server";
const PROTOCOL_VERSION: &str = "2024-11-05";

const PARSE_ERROR: i32 = -32700;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;

/// JSON-RPC message types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcMessage {
    Request(JsonRpcRequest),
    Response(JsonRpcResponse),
    Notification(JsonRpcNotification),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: serde_json::Value,
    pub method: String,
    pub params: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: String,
    pub method: String,
    pub params: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

impl JsonRpcResponse {
    fn success(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    fn failure(
        id: serde_json::Value,
        code: i32,
        message: impl Into<String>,
        data: Option<serde_json::Value>,
    ) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data,
            }),
        }
    }
}

/// MCP server exposing the ApsaraDB for MongoDB tool catalog over stdio.
pub struct ApsaraDbMcpServer {
    registry: ToolRegistry,
}

impl ApsaraDbMcpServer {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    /// Wires the OpenAPI client and MongoDB introspector from `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let cloud = OpenApiClient::new(config)?;
        let database = MongoIntrospector::new(
            config.mongodb_connection_string.clone(),
            config.request_timeout,
        );
        Ok(Self::new(ToolRegistry::new(
            Arc::new(cloud),
            Arc::new(database),
        )))
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub async fn run(&self) -> Result<()> {
        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        self.serve(BufReader::new(stdin.lock()), stdout.lock()).await
    }

    /// Serves line-delimited JSON-RPC from `reader` until EOF.
    pub async fn serve<R: BufRead, W: Write>(&self, reader: R, mut writer: W) -> Result<()> {
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let response = match serde_json::from_str::<JsonRpcMessage>(&line) {
                Ok(message) => self.handle_message(message).await,
                Err(e) => {
                    tracing::warn!("Discarding malformed JSON-RPC message: {}", e);
                    Some(JsonRpcResponse::failure(
                        serde_json::Value::Null,
                        PARSE_ERROR,
                        format!("Parse error: {}", e),
                        None,
                    ))
                }
            };

            if let Some(response) = response {
                let response_str = serde_json::to_string(&response)?;
                writeln!(writer, "{}", response_str)?;
                writer.flush()?;
            }
        }

        Ok(())
    }

    async fn handle_message(&self, message: JsonRpcMessage) -> Option<JsonRpcResponse> {
        match message {
            JsonRpcMessage::Request(request) => Some(self.handle_request(request).await),
            JsonRpcMessage::Notification(notification) => {
                self.handle_notification(notification);
                None
            }
            // We don't send requests, so we shouldn't receive responses
            JsonRpcMessage::Response(_) => None,
        }
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        match request.method.as_str() {
            "initialize" => self.handle_initialize(request),
            "ping" => JsonRpcResponse::success(request.id, serde_json::json!({})),
            "tools/list" => self.handle_tools_list(request),
            "tools/call" => self.handle_tool_call(request).await,
            _ => JsonRpcResponse::failure(
                request.id,
                METHOD_NOT_FOUND,
                format!("Method '{}' not found", request.method),
                None,
            ),
        }
    }

    fn handle_initialize(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let capabilities = serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": {
                    "listChanged": false
                }
            },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            }
        });
        JsonRpcResponse::success(request.id, capabilities)
    }

    fn handle_tools_list(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let tools: Vec<serde_json::Value> = self
            .registry
            .descriptors()
            .into_iter()
            .map(|descriptor| descriptor.to_json())
            .collect();
        JsonRpcResponse::success(request.id, serde_json::json!({ "tools": tools }))
    }

    async fn handle_tool_call(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let tool_call = match request.params.map(serde_json::from_value::<ToolCall>) {
            Some(Ok(tool_call)) => tool_call,
            Some(Err(e)) => {
                return JsonRpcResponse::failure(
                    request.id,
                    INVALID_PARAMS,
                    format!("Invalid params for tools/call: {}", e),
                    None,
                )
            }
            None => {
                return JsonRpcResponse::failure(
                    request.id,
                    INVALID_PARAMS,
                    "Missing params for tools/call".to_string(),
                    None,
                )
            }
        };

        let mut description_output = Vec::new();
        let result = self
            .registry
            .invoke(&tool_call.name, tool_call.arguments, &mut description_output)
            .await;

        match result {
            Ok(invoke_output) => {
                let description = String::from_utf8(description_output).unwrap_or_default();
                let content = serde_json::json!([
                    {
                        "type": "text",
                        "text": format!("{}\n\nResult:\n{}", description, render_output(&invoke_output))
                    }
                ]);
                JsonRpcResponse::success(request.id, serde_json::json!({ "content": content }))
            }
            Err(e) => JsonRpcResponse::failure(
                request.id,
                e.rpc_code(),
                format!("Tool execution failed: {}", e),
                Some(e.data()),
            ),
        }
    }

    fn handle_notification(&self, notification: JsonRpcNotification) {
        match notification.method.as_str() {
            "notifications/initialized" => tracing::info!("Client initialized"),
            other => tracing::debug!(method = other, "ignoring notification"),
        }
    }
}
