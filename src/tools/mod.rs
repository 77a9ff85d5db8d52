//! Tool descriptors, argument validation and the name → handler dispatcher.

pub mod database;
pub mod instance;
pub mod network;

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;
use crossterm::{queue, style};
use serde_json::{json, Map, Value};

use crate::error::ToolError;
use crate::mongo::DatabaseApi;
use crate::openapi::CloudApi;
use crate::{InvokeOutput, MAX_TOOL_RESPONSE_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Integer,
}

impl ParamType {
    fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
        }
    }
}

/// One declared tool argument.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamType,
    pub required: bool,
    pub description: &'static str,
    /// Accepted string values. Empty means any.
    pub allowed: &'static [&'static str],
    /// Masked in call descriptions and never logged.
    pub secret: bool,
}

impl ParamSpec {
    pub const fn required(name: &'static str, kind: ParamType, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: true,
            description,
            allowed: &[],
            secret: false,
        }
    }

    pub const fn optional(name: &'static str, kind: ParamType, description: &'static str) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind, description)
        }
    }

    pub const fn one_of(self, allowed: &'static [&'static str]) -> Self {
        Self { allowed, ..self }
    }

    pub const fn secret(self) -> Self {
        Self {
            secret: true,
            ..self
        }
    }

    fn schema(&self) -> Value {
        let mut schema = json!({
            "type": self.kind.as_str(),
            "description": self.description,
        });
        if !self.allowed.is_empty() {
            schema["enum"] = json!(self.allowed);
        }
        schema
    }
}

/// Static description of a tool as advertised in `tools/list`.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub params: Vec<ParamSpec>,
}

impl ToolDescriptor {
    pub fn input_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .params
            .iter()
            .map(|p| (p.name.to_string(), p.schema()))
            .collect();
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    pub fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema(),
        })
    }

    /// Checks `arguments` against the declared parameters. Undeclared arguments
    /// are dropped and `null` counts as absent.
    pub fn validate(&self, arguments: Value) -> Result<ValidatedArgs, ToolError> {
        let mut supplied = match arguments {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(ToolError::invalid(
                    "arguments",
                    format!("expected an object, got {}", json_type(&other)),
                ))
            }
        };

        let mut values = Map::new();
        for param in &self.params {
            match supplied.remove(param.name) {
                None | Some(Value::Null) => {
                    if param.required {
                        return Err(ToolError::MissingArgument(param.name.to_string()));
                    }
                }
                Some(value) => {
                    check_type(param, &value)?;
                    values.insert(param.name.to_string(), value);
                }
            }
        }

        for name in supplied.keys() {
            tracing::debug!(tool = self.name, argument = %name, "dropping undeclared argument");
        }

        Ok(ValidatedArgs {
            tool: self.name,
            values,
        })
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn check_type(param: &ParamSpec, value: &Value) -> Result<(), ToolError> {
    match (param.kind, value) {
        (ParamType::String, Value::String(s)) => {
            if !param.allowed.is_empty() && !param.allowed.contains(&s.as_str()) {
                return Err(ToolError::invalid(
                    param.name,
                    format!("must be one of {}", param.allowed.join(", ")),
                ));
            }
            Ok(())
        }
        (ParamType::Integer, Value::Number(n)) if n.is_i64() => Ok(()),
        (kind, other) => Err(ToolError::invalid(
            param.name,
            format!("expected {}, got {}", kind.as_str(), json_type(other)),
        )),
    }
}

/// Arguments that passed [`ToolDescriptor::validate`].
#[derive(Debug, Clone)]
pub struct ValidatedArgs {
    tool: &'static str,
    values: Map<String, Value>,
}

impl ValidatedArgs {
    pub fn opt_str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    pub fn str(&self, name: &str) -> Result<&str, ToolError> {
        self.opt_str(name)
            .ok_or_else(|| ToolError::MissingArgument(name.to_string()))
    }

    pub fn opt_int(&self, name: &str) -> Option<i64> {
        self.values.get(name).and_then(Value::as_i64)
    }

    pub fn int(&self, name: &str) -> Result<i64, ToolError> {
        self.opt_int(name)
            .ok_or_else(|| ToolError::MissingArgument(name.to_string()))
    }

    pub fn string(&self, name: &str) -> Result<String, ToolError> {
        self.str(name).map(str::to_string)
    }

    pub fn opt_string(&self, name: &str) -> Option<String> {
        self.opt_str(name).map(str::to_string)
    }
}

/// One advertised tool.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn descriptor(&self) -> &ToolDescriptor;

    async fn execute(&self, args: ValidatedArgs) -> Result<InvokeOutput, ToolError>;
}

/// The fixed tool set, built once at startup.
pub struct ToolRegistry {
    order: Vec<&'static str>,
    handlers: HashMap<&'static str, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    pub fn empty() -> Self {
        Self {
            order: Vec::new(),
            handlers: HashMap::new(),
        }
    }

    /// Registers the complete ApsaraDB for MongoDB tool catalog.
    pub fn new(cloud: Arc<dyn CloudApi>, database: Arc<dyn DatabaseApi>) -> Self {
        let mut registry = Self::empty();
        instance::register(&mut registry, &cloud);
        network::register(&mut registry, &cloud);
        database::register(&mut registry, &database);
        registry
    }

    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) {
        let name = handler.descriptor().name;
        if self.handlers.insert(name, handler).is_none() {
            self.order.push(name);
        }
    }

    pub fn names(&self) -> &[&'static str] {
        &self.order
    }

    pub fn descriptors(&self) -> Vec<&ToolDescriptor> {
        self.order
            .iter()
            .filter_map(|name| self.handlers.get(name))
            .map(|handler| handler.descriptor())
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn ToolHandler>> {
        self.handlers.get(name)
    }

    /// Resolves, validates and runs one tool call. The human readable call
    /// description is written to `updates` before the handler runs.
    pub async fn invoke(
        &self,
        name: &str,
        arguments: Value,
        updates: &mut impl Write,
    ) -> Result<InvokeOutput, ToolError> {
        let handler = self
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        let descriptor = handler.descriptor();
        let args = descriptor.validate(arguments)?;

        if let Err(e) = queue_description(descriptor, &args, updates) {
            tracing::warn!("Failed to generate tool call description: {}", e);
        }

        tracing::info!(tool = name, "invoking tool");
        let result = handler.execute(args).await;
        if let Err(e) = &result {
            tracing::error!(tool = name, code = e.code(), "tool call failed: {}", e);
        }
        result
    }
}

/// Writes a human readable summary of the call with secret arguments masked.
pub fn queue_description(
    descriptor: &ToolDescriptor,
    args: &ValidatedArgs,
    updates: &mut impl Write,
) -> std::io::Result<()> {
    queue!(
        updates,
        style::Print("Running ApsaraDB MongoDB tool:\n\n"),
        style::Print(format!("Tool name: {}\n", descriptor.name)),
    )?;
    debug_assert_eq!(descriptor.name, args.tool);

    let supplied: Vec<&ParamSpec> = descriptor
        .params
        .iter()
        .filter(|p| args.values.contains_key(p.name))
        .collect();
    if !supplied.is_empty() {
        queue!(updates, style::Print("Parameters:\n"))?;
        for param in supplied {
            if param.secret {
                queue!(updates, style::Print(format!("- {}: ******\n", param.name)))?;
            } else if let Some(value) = args.values.get(param.name) {
                queue!(updates, style::Print(format!("- {}: {}\n", param.name, value)))?;
            }
        }
    }
    Ok(())
}

/// Renders the output as tool result text, truncated to [`MAX_TOOL_RESPONSE_SIZE`].
pub fn render_output(output: &InvokeOutput) -> String {
    let text = serde_json::to_string_pretty(&output.output)
        .unwrap_or_else(|_| output.output.to_string());
    truncate(text, MAX_TOOL_RESPONSE_SIZE)
}

fn truncate(mut text: String, limit: usize) -> String {
    if text.len() <= limit {
        return text;
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text.truncate(end);
    text.push_str(" ... truncated");
    text
}


#[cfg(test)]
mod tests {
    use super::testing::{registry, FakeCloud, FakeDatabase};
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    const CATALOG: [&str; 11] = [
        "create_db_instance",
        "allocate_public_network_address",
        "describe_replica_set_role",
        "describe_db_instance_attribute",
        "describe_db_instances",
        "describe_available_resource",
        "describe_available_zones",
        "describe_vpcs",
        "describe_vswitches",
        "list_databases",
        "get_top_reusable_space_collections",
    ];

    fn sample() -> ToolDescriptor {
        ToolDescriptor {
            name: "sample",
            description: "Sample tool.",
            params: vec![
                ParamSpec::required("region_id", ParamType::String, "Region."),
                ParamSpec::optional("page_size", ParamType::Integer, "Page size."),
                ParamSpec::optional("charge_type", ParamType::String, "Charge type.")
                    .one_of(&["PrePaid", "PostPaid"]),
                ParamSpec::optional("password", ParamType::String, "Password.").secret(),
            ],
        }
    }

    #[test]
    fn test_catalog_is_complete() {
        let registry = registry(Arc::new(FakeCloud::default()), Arc::new(FakeDatabase::default()));
        assert_eq!(registry.names(), CATALOG);
        for descriptor in registry.descriptors() {
            let schema = descriptor.input_schema();
            let properties = schema["properties"].as_object().unwrap();
            assert_eq!(properties.len(), descriptor.params.len(), "{}", descriptor.name);
            for required in schema["required"].as_array().unwrap() {
                assert!(properties.contains_key(required.as_str().unwrap()));
            }
            assert!(!descriptor.description.is_empty());
        }
    }

    #[test]
    fn test_input_schema() {
        let schema = sample().input_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["region_id"]));
        assert_eq!(schema["properties"]["page_size"]["type"], "integer");
        assert_eq!(schema["properties"]["charge_type"]["enum"], json!(["PrePaid", "PostPaid"]));
        assert!(schema["properties"]["region_id"].get("enum").is_none());
    }

    #[test]
    fn test_validate() {
        let descriptor = sample();

        let args = assert_ok!(descriptor.validate(json!({
            "region_id": "cn-hangzhou",
            "page_size": 20,
            "charge_type": null,
            "unexpected": true
        })));
        assert_eq!(args.str("region_id").unwrap(), "cn-hangzhou");
        assert_eq!(args.opt_int("page_size"), Some(20));
        assert_eq!(args.opt_str("charge_type"), None);
        assert_eq!(args.opt_str("unexpected"), None);

        let err = assert_err!(descriptor.validate(json!({ "page_size": 20 })));
        assert!(matches!(err, ToolError::MissingArgument(ref f) if f == "region_id"));

        let err = assert_err!(descriptor.validate(Value::Null));
        assert!(matches!(err, ToolError::MissingArgument(ref f) if f == "region_id"));

        let err = assert_err!(descriptor.validate(json!({ "region_id": 7 })));
        assert!(
            matches!(err, ToolError::InvalidArgument { ref field, .. } if field == "region_id")
        );

        let err = assert_err!(descriptor.validate(json!({ "region_id": "r", "page_size": "10" })));
        assert!(
            matches!(err, ToolError::InvalidArgument { ref field, .. } if field == "page_size")
        );

        let err = assert_err!(descriptor.validate(json!({ "region_id": "r", "page_size": 1.5 })));
        assert!(
            matches!(err, ToolError::InvalidArgument { ref field, .. } if field == "page_size")
        );

        let err =
            assert_err!(descriptor.validate(json!({ "region_id": "r", "charge_type": "Free" })));
        assert!(
            matches!(err, ToolError::InvalidArgument { ref field, .. } if field == "charge_type")
        );

        let err = assert_err!(descriptor.validate(json!(["cn-hangzhou"])));
        assert!(
            matches!(err, ToolError::InvalidArgument { ref field, .. } if field == "arguments")
        );
    }

    #[test]
    fn test_queue_description_masks_secrets() {
        let descriptor = sample();
        let args = descriptor
            .validate(json!({ "region_id": "cn-hangzhou", "password": "hunter2" }))
            .unwrap();

        let mut output = Vec::new();
        queue_description(&descriptor, &args, &mut output).unwrap();
        let output_str = String::from_utf8(output).unwrap();

        assert!(output_str.contains("Running ApsaraDB MongoDB tool:"));
        assert!(output_str.contains("Tool name: sample"));
        assert!(output_str.contains("- region_id: \"cn-hangzhou\""));
        assert!(output_str.contains("- password: ******"));
        assert!(!output_str.contains("hunter2"));
        assert!(!output_str.contains("page_size"));
    }

    #[test]
    fn test_queue_description_without_parameters() {
        let descriptor = sample();
        let args = ValidatedArgs {
            tool: "sample",
            values: Map::new(),
        };
        let mut output = Vec::new();
        queue_description(&descriptor, &args, &mut output).unwrap();
        let output_str = String::from_utf8(output).unwrap();
        assert!(output_str.contains("Tool name: sample"));
        assert!(!output_str.contains("Parameters:"));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("short".to_string(), 10), "short");
        assert_eq!(truncate("abcdef".to_string(), 3), "abc ... truncated");
        // 'é' is two bytes; cutting at byte 2 would split it.
        assert_eq!(truncate("aé".to_string(), 2), "a ... truncated");
    }

    #[tokio::test]
    async fn test_unknown_tool_is_client_error() {
        let cloud = Arc::new(FakeCloud::default());
        let registry = registry(cloud.clone(), Arc::new(FakeDatabase::default()));

        let mut updates: Vec<u8> = Vec::new();
        let err = registry
            .invoke("drop_everything", json!({}), &mut updates)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool(ref n) if n == "drop_everything"));
        assert!(updates.is_empty());

        // The rest of the catalog keeps working.
        let output = registry
            .invoke("describe_db_instances", json!({ "region_id": "cn-hangzhou" }), &mut updates)
            .await
            .unwrap();
        assert_eq!(output.output["RequestId"], "fake");
        assert_eq!(cloud.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_required_argument_never_calls_downstream() {
        let cloud = Arc::new(FakeCloud::default());
        let database = Arc::new(FakeDatabase::default());
        let registry = registry(cloud.clone(), database.clone());

        for descriptor in registry.descriptors() {
            let Some(required) = descriptor.params.iter().find(|p| p.required) else {
                continue;
            };
            let mut updates: Vec<u8> = Vec::new();
            let err = registry
                .invoke(descriptor.name, json!({}), &mut updates)
                .await
                .unwrap_err();
            match err {
                ToolError::MissingArgument(field) => assert_eq!(field, required.name),
                other => panic!("{}: unexpected error {:?}", descriptor.name, other),
            }
        }
        assert!(cloud.calls().is_empty());
        assert!(database.calls().is_empty());
    }
}
