use std::fmt;
use std::time::Duration;

use crate::error::ConfigError;

pub const ACCESS_KEY_ID_VAR: &str = "ALIBABA_CLOUD_ACCESS_KEY_ID";
pub const ACCESS_KEY_SECRET_VAR: &str = "ALIBABA_CLOUD_ACCESS_KEY_SECRET";
pub const SECURITY_TOKEN_VAR: &str = "ALIBABA_CLOUD_SECURITY_TOKEN";
pub const CONNECTION_STRING_VAR: &str = "MONGODB_CONNECTION_STRING";
pub const DDS_ENDPOINT_VAR: &str = "ALIBABA_CLOUD_DDS_ENDPOINT";
pub const VPC_ENDPOINT_VAR: &str = "ALIBABA_CLOUD_VPC_ENDPOINT";
pub const TIMEOUT_VAR: &str = "APSARADB_MCP_TIMEOUT_SECS";

pub const DEFAULT_DDS_ENDPOINT: &str = "mongodb.aliyuncs.com";
/// `{region}` is replaced with the request's region id.
pub const DEFAULT_VPC_ENDPOINT: &str = "vpc.{region}.aliyuncs.com";

/// AccessKey pair used to sign every OpenAPI request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub access_key_secret: String,
    pub security_token: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"******")
            .field("security_token", &self.security_token.as_ref().map(|_| "******"))
            .finish()
    }
}

/// Process configuration, built once at startup and shared by reference.
#[derive(Clone)]
pub struct Config {
    pub credentials: Credentials,
    pub mongodb_connection_string: Option<String>,
    pub dds_endpoint: String,
    pub vpc_endpoint: String,
    pub request_timeout: Option<Duration>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("credentials", &self.credentials)
            .field(
                "mongodb_connection_string",
                &self.mongodb_connection_string.as_ref().map(|_| "******"),
            )
            .field("dds_endpoint", &self.dds_endpoint)
            .field("vpc_endpoint", &self.vpc_endpoint)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::MissingVar(key));

        let credentials = Credentials {
            access_key_id: require(ACCESS_KEY_ID_VAR)?,
            access_key_secret: require(ACCESS_KEY_SECRET_VAR)?,
            security_token: get(SECURITY_TOKEN_VAR),
        };

        let mongodb_connection_string = match get(CONNECTION_STRING_VAR) {
            Some(uri) => Some(uri),
            None => compose_connection_string(&get)?,
        };

        let request_timeout = match get(TIMEOUT_VAR) {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|e| ConfigError::Invalid {
                    var: TIMEOUT_VAR,
                    reason: format!("{}", e),
                })?;
                if secs == 0 {
                    return Err(ConfigError::Invalid {
                        var: TIMEOUT_VAR,
                        reason: "must be greater than zero".to_string(),
                    });
                }
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            credentials,
            mongodb_connection_string,
            dds_endpoint: get(DDS_ENDPOINT_VAR).unwrap_or_else(|| DEFAULT_DDS_ENDPOINT.to_string()),
            vpc_endpoint: get(VPC_ENDPOINT_VAR).unwrap_or_else(|| DEFAULT_VPC_ENDPOINT.to_string()),
            request_timeout,
        })
    }
}

/// Builds a connection string from the individual `MONGODB_*` variables when all
/// of them are present.
fn compose_connection_string<F>(get: &F) -> Result<Option<String>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let (Some(host), Some(port), Some(user), Some(password), Some(database)) = (
        get("MONGODB_HOST"),
        get("MONGODB_PORT"),
        get("MONGODB_USER"),
        get("MONGODB_PASSWORD"),
        get("MONGODB_DATABASE"),
    ) else {
        return Ok(None);
    };

    let port: u16 = port.trim().parse().map_err(|e| ConfigError::Invalid {
        var: "MONGODB_PORT",
        reason: format!("{}", e),
    })?;

    Ok(Some(format!(
        "mongodb://{}:{}@{}:{}/{}",
        urlencoding::encode(&user),
        urlencoding::encode(&password),
        host,
        port,
        database
    )))
}
