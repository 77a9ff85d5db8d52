//! Authenticated client for the ApsaraDB for MongoDB (DDS) and VPC OpenAPIs.

pub mod actions;
pub mod signer;

use std::collections::BTreeMap;

use async_trait::async_trait;
use bstr::ByteSlice;
use serde::{Deserialize, Serialize};

use crate::config::{Config, Credentials};
use crate::error::RemoteError;

const USER_AGENT_APP_NAME: &str = "ApsaraDB-MongoDB-MCP-Server";
const USER_AGENT_VERSION_VALUE: &str = env!("CARGO_PKG_VERSION");

/// Remote control-plane service an action belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Dds,
    Vpc,
}

impl Service {
    pub fn version(&self) -> &'static str {
        match self {
            Self::Dds => "2015-12-01",
            Self::Vpc => "2016-04-28",
        }
    }
}

/// A typed OpenAPI action.
pub trait Action: Serialize {
    const SERVICE: Service;
    const NAME: &'static str;

    /// Region used to pick a regional endpoint.
    fn region_id(&self) -> Option<&str> {
        None
    }
}

/// An action flattened into its wire parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRequest {
    pub service: Service,
    pub action: &'static str,
    pub region_id: Option<String>,
    pub params: BTreeMap<String, String>,
}

impl ActionRequest {
    pub fn new<A: Action>(action: &A) -> Result<Self, RemoteError> {
        let value = serde_json::to_value(action).map_err(|e| RemoteError::Encode(e.to_string()))?;
        let serde_json::Value::Object(fields) = value else {
            return Err(RemoteError::Encode(format!(
                "{} parameters must serialize to an object",
                A::NAME
            )));
        };

        let params = fields
            .into_iter()
            .filter_map(|(name, value)| match value {
                serde_json::Value::Null => None,
                serde_json::Value::String(s) => Some((name, s)),
                other => Some((name, other.to_string())),
            })
            .collect();

        Ok(Self {
            service: A::SERVICE,
            action: A::NAME,
            region_id: action.region_id().map(str::to_string),
            params,
        })
    }
}

/// The control-plane operations available to tool handlers.
#[async_trait]
pub trait CloudApi: Send + Sync {
    /// Issues one remote call and returns the decoded response body.
    async fn call(&self, request: ActionRequest) -> Result<serde_json::Value, RemoteError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiErrorBody {
    code: Option<String>,
    message: Option<String>,
    request_id: Option<String>,
    recommend: Option<String>,
}

/// `reqwest`-backed [`CloudApi`] signing each request with ACS3-HMAC-SHA256.
#[derive(Debug, Clone)]
pub struct OpenApiClient {
    http: reqwest::Client,
    credentials: Credentials,
    dds_endpoint: String,
    vpc_endpoint: String,
}

impl OpenApiClient {
    pub fn new(config: &Config) -> Result<Self, RemoteError> {
        let mut builder = reqwest::Client::builder().user_agent(format!(
            "{}/{}",
            USER_AGENT_APP_NAME, USER_AGENT_VERSION_VALUE
        ));
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            credentials: config.credentials.clone(),
            dds_endpoint: config.dds_endpoint.clone(),
            vpc_endpoint: config.vpc_endpoint.clone(),
        })
    }

    fn endpoint(&self, service: Service, region_id: Option<&str>) -> String {
        match (service, region_id) {
            (Service::Dds, _) => self.dds_endpoint.clone(),
            (Service::Vpc, Some(region)) => self.vpc_endpoint.replace("{region}", region),
            (Service::Vpc, None) => "vpc.aliyuncs.com".to_string(),
        }
    }
}

/// Splits an endpoint into its base URL and `host` header value.
fn base_url_and_host(endpoint: &str) -> (String, String) {
    let endpoint = endpoint.trim_end_matches('/');
    let (base, rest) = if let Some(rest) = endpoint.strip_prefix("http://") {
        (endpoint.to_string(), rest)
    } else if let Some(rest) = endpoint.strip_prefix("https://") {
        (endpoint.to_string(), rest)
    } else {
        (format!("https://{}", endpoint), endpoint)
    };
    let host = rest.split('/').next().unwrap_or(rest).to_string();
    (base, host)
}

fn api_error(status: u16, body: &[u8]) -> RemoteError {
    match serde_json::from_slice::<ApiErrorBody>(body) {
        Ok(parsed) => RemoteError::Api {
            status,
            code: parsed.code.unwrap_or_else(|| format!("HTTP{}", status)),
            message: parsed
                .message
                .unwrap_or_else(|| body.to_str_lossy().into_owned()),
            request_id: parsed.request_id,
            recommend: parsed.recommend,
        },
        Err(_) => RemoteError::Api {
            status,
            code: format!("HTTP{}", status),
            message: body.to_str_lossy().into_owned(),
            request_id: None,
            recommend: None,
        },
    }
}

#[async_trait]
impl CloudApi for OpenApiClient {
    async fn call(&self, request: ActionRequest) -> Result<serde_json::Value, RemoteError> {
        let endpoint = self.endpoint(request.service, request.region_id.as_deref());
        let (base, host) = base_url_and_host(&endpoint);
        let query = signer::canonical_query(&request.params);

        let headers = signer::sign(
            &self.credentials,
            &signer::SigningInput {
                method: "POST",
                host: &host,
                action: request.action,
                version: request.service.version(),
                query: &query,
                payload: b"",
                date: chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
                nonce: uuid::Uuid::new_v4().simple().to_string(),
            },
        )?;

        let url = if query.is_empty() {
            format!("{}/", base)
        } else {
            format!("{}/?{}", base, query)
        };

        tracing::debug!(action = request.action, %host, "sending OpenAPI request");

        let mut builder = self.http.post(&url);
        for (name, value) in headers {
            builder = builder.header(name, value);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(api_error(status.as_u16(), &body));
        }

        serde_json::from_slice(&body).map_err(|e| {
            RemoteError::Decode(format!("{}: {}", e, body.to_str_lossy()))
        })
    }
}
