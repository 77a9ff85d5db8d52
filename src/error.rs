use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum McpError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("OpenAPI client error: {0}")]
    Remote(#[from] RemoteError),
}

pub type Result<T> = std::result::Result<T, McpError>;

/// Startup configuration failures. Any of these prevents the server from serving.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    MissingVar(&'static str),

    #[error("environment variable {var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Failures reported by the AlibabaCloud OpenAPI endpoints.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("{code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
        request_id: Option<String>,
        recommend: Option<String>,
    },

    #[error("OpenAPI transport error: {0}")]
    Transport(String),

    #[error("failed to decode OpenAPI response: {0}")]
    Decode(String),

    #[error("failed to encode OpenAPI request: {0}")]
    Encode(String),
}

/// Failures reported while introspecting a MongoDB deployment.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DatabaseError {
    #[error(
        "no MongoDB connection string configured; set MONGODB_CONNECTION_STRING or pass connection_string"
    )]
    NotConfigured,

    #[error("invalid MongoDB connection string: {0}")]
    InvalidConnectionString(String),

    #[error("cannot reach MongoDB: {0}")]
    Connectivity(String),

    #[error("MongoDB authentication failed: {0}")]
    Authentication(String),

    #[error("MongoDB command not permitted: {0}")]
    PermissionDenied(String),

    #[error("MongoDB query failed: {0}")]
    Query(String),
}

impl DatabaseError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotConfigured => "not_configured",
            Self::InvalidConnectionString(_) => "invalid_connection_string",
            Self::Connectivity(_) => "connectivity",
            Self::Authentication(_) => "authentication",
            Self::PermissionDenied(_) => "permission_denied",
            Self::Query(_) => "query",
        }
    }
}

/// Per-invocation tool failures. None of these affect other invocations.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Tool '{0}' not found")]
    UnknownTool(String),

    #[error("missing required argument '{0}'")]
    MissingArgument(String),

    #[error("invalid argument '{field}': {reason}")]
    InvalidArgument { field: String, reason: String },

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("failed to serialize tool output: {0}")]
    Output(#[from] serde_json::Error),
}

/// Error category reported to the caller alongside the JSON-RPC error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Client,
    Remote,
    Database,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Remote => "remote",
            Self::Database => "database",
            Self::Internal => "internal",
        }
    }
}

impl ToolError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownTool(_) | Self::MissingArgument(_) | Self::InvalidArgument { .. } => {
                ErrorKind::Client
            }
            Self::Remote(_) => ErrorKind::Remote,
            Self::Database(_) => ErrorKind::Database,
            Self::Output(_) => ErrorKind::Internal,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownTool(_) => "unknown_tool",
            Self::MissingArgument(_) => "missing_argument",
            Self::InvalidArgument { .. } => "invalid_argument",
            Self::Remote(RemoteError::Api { .. }) => "remote_api",
            Self::Remote(RemoteError::Transport(_)) => "remote_transport",
            Self::Remote(RemoteError::Decode(_)) => "remote_decode",
            Self::Remote(RemoteError::Encode(_)) => "request_encode",
            Self::Database(e) => e.code(),
            Self::Output(_) => "output",
        }
    }

    /// JSON-RPC error code used when this error is returned from `tools/call`.
    pub fn rpc_code(&self) -> i32 {
        match self {
            Self::UnknownTool(_) => -32601,
            Self::MissingArgument(_) | Self::InvalidArgument { .. } => -32602,
            Self::Remote(_) => -32000,
            Self::Database(_) => -32001,
            Self::Output(_) => -32603,
        }
    }

    /// Structured error payload carried in the JSON-RPC `data` member.
    pub fn data(&self) -> serde_json::Value {
        let mut data = json!({
            "kind": self.kind().as_str(),
            "code": self.code(),
        });
        match self {
            Self::UnknownTool(name) => data["tool"] = json!(name),
            Self::MissingArgument(field) | Self::InvalidArgument { field, .. } => {
                data["field"] = json!(field)
            }
            Self::Remote(RemoteError::Api {
                status,
                code,
                message,
                request_id,
                recommend,
            }) => {
                data["status"] = json!(status);
                data["remote_code"] = json!(code);
                data["remote_message"] = json!(message);
                if let Some(request_id) = request_id {
                    data["request_id"] = json!(request_id);
                }
                if let Some(recommend) = recommend {
                    data["recommend"] = json!(recommend);
                }
            }
            _ => {}
        }
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_identify_field() {
        let err = ToolError::MissingArgument("region_id".to_string());
        assert_eq!(err.kind(), ErrorKind::Client);
        assert_eq!(err.rpc_code(), -32602);
        assert_eq!(err.data()["field"], "region_id");
        assert_eq!(err.to_string(), "missing required argument 'region_id'");

        let err = ToolError::invalid("page_size", "must be between 1 and 50");
        assert_eq!(err.data()["code"], "invalid_argument");
        assert_eq!(err.data()["field"], "page_size");
    }

    #[test]
    fn test_remote_error_keeps_remote_code() {
        let err = ToolError::from(RemoteError::Api {
            status: 400,
            code: "InvalidParameter".to_string(),
            message: "The specified parameter is not valid.".to_string(),
            request_id: Some("A1B2".to_string()),
            recommend: None,
        });
        assert_eq!(err.kind(), ErrorKind::Remote);
        assert_eq!(err.to_string(), "InvalidParameter: The specified parameter is not valid.");
        let data = err.data();
        assert_eq!(data["remote_code"], "InvalidParameter");
        assert_eq!(data["request_id"], "A1B2");
        assert!(data.get("recommend").is_none());
    }

    #[test]
    fn test_database_errors_have_distinct_codes() {
        let errors = [
            DatabaseError::NotConfigured,
            DatabaseError::InvalidConnectionString(String::new()),
            DatabaseError::Connectivity(String::new()),
            DatabaseError::Authentication(String::new()),
            DatabaseError::PermissionDenied(String::new()),
            DatabaseError::Query(String::new()),
        ];
        let mut codes: Vec<_> = errors.iter().map(|e| e.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());

        let err = ToolError::from(DatabaseError::Connectivity("timed out".to_string()));
        assert_eq!(err.rpc_code(), -32001);
        assert_eq!(err.data()["kind"], "database");
        assert_eq!(err.data()["code"], "connectivity");
    }

    #[test]
    fn test_output_error_is_internal() {
        let cause = serde_json::from_str::<serde_json::Value>("{\"databases\":").unwrap_err();
        let err = ToolError::from(cause);
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.rpc_code(), -32603);
        assert_eq!(err.data()["code"], "output");
        assert!(err.to_string().starts_with("failed to serialize tool output"));
    }
}
