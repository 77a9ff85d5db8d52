//! Read-only MongoDB introspection over the official driver.

use std::time::Duration;

use async_trait::async_trait;
use mongodb::bson::{doc, Bson, Document};
use mongodb::error::ErrorKind;
use mongodb::options::ClientOptions;
use mongodb::Client;
use serde::Serialize;
use tokio::sync::OnceCell;

use crate::error::DatabaseError;

const APP_NAME: &str = "apsaradb-mongodb-mcp";

/// MongoDB server error codes with a dedicated [`DatabaseError`] variant.
const UNAUTHORIZED: i32 = 13;
const AUTHENTICATION_FAILED: i32 = 18;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseSize {
    pub name: String,
    pub size_on_disk: u64,
    pub empty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionReusableSpace {
    pub database: String,
    pub collection: String,
    pub reusable_bytes: u64,
}

/// Introspection queries available to tool handlers.
///
/// `connection_string` overrides the configured deployment for one call.
#[async_trait]
pub trait DatabaseApi: Send + Sync {
    async fn list_databases(
        &self,
        connection_string: Option<&str>,
    ) -> Result<Vec<DatabaseSize>, DatabaseError>;

    /// Reusable bytes of every collection in `database`, or in every database
    /// when `database` is `None`. Unordered.
    async fn collection_reusable_space(
        &self,
        connection_string: Option<&str>,
        database: Option<&str>,
    ) -> Result<Vec<CollectionReusableSpace>, DatabaseError>;
}

impl From<mongodb::error::Error> for DatabaseError {
    fn from(err: mongodb::error::Error) -> Self {
        match err.kind.as_ref() {
            ErrorKind::Authentication { message, .. } => Self::Authentication(message.clone()),
            ErrorKind::InvalidArgument { message, .. } => {
                Self::InvalidConnectionString(message.clone())
            }
            ErrorKind::ServerSelection { .. }
            | ErrorKind::Io(_)
            | ErrorKind::DnsResolve { .. }
            | ErrorKind::ConnectionPoolCleared { .. } => Self::Connectivity(err.to_string()),
            ErrorKind::Command(command) if command.code == AUTHENTICATION_FAILED => {
                Self::Authentication(command.message.clone())
            }
            ErrorKind::Command(command) if command.code == UNAUTHORIZED => {
                Self::PermissionDenied(command.message.clone())
            }
            _ => Self::Query(err.to_string()),
        }
    }
}

/// Whether a failed `collStats` skips the collection rather than the whole scan.
/// Views and non-WiredTiger collections fail with an ordinary command error.
fn skips_collection(err: &DatabaseError) -> bool {
    matches!(err, DatabaseError::Query(_))
}

/// Reads `wiredTiger."block-manager"."file bytes available for reuse"` from
/// `collStats` output.
pub fn reusable_bytes(stats: &Document) -> Option<u64> {
    let value = stats
        .get_document("wiredTiger")
        .ok()?
        .get_document("block-manager")
        .ok()?
        .get("file bytes available for reuse")?;
    match value {
        Bson::Int32(n) => u64::try_from(*n).ok(),
        Bson::Int64(n) => u64::try_from(*n).ok(),
        Bson::Double(n) if *n >= 0.0 => Some(*n as u64),
        _ => None,
    }
}

/// [`DatabaseApi`] backed by a pooled `mongodb::Client`.
///
/// The configured connection string is parsed on first use and the client
/// reused for every later call; override strings get a client per call.
pub struct MongoIntrospector {
    default_uri: Option<String>,
    timeout: Option<Duration>,
    shared: OnceCell<Client>,
}

impl MongoIntrospector {
    pub fn new(default_uri: Option<String>, timeout: Option<Duration>) -> Self {
        Self {
            default_uri,
            timeout,
            shared: OnceCell::new(),
        }
    }

    async fn connect(&self, uri: &str) -> Result<Client, DatabaseError> {
        let mut options = ClientOptions::parse(uri)
            .await
            .map_err(|e| DatabaseError::InvalidConnectionString(e.to_string()))?;
        if options.app_name.is_none() {
            options.app_name = Some(APP_NAME.to_string());
        }
        if let Some(timeout) = self.timeout {
            options.connect_timeout = Some(timeout);
            options.server_selection_timeout = Some(timeout);
        }
        Ok(Client::with_options(options)?)
    }

    async fn client(&self, connection_string: Option<&str>) -> Result<Client, DatabaseError> {
        match connection_string {
            Some(uri) => self.connect(uri).await,
            None => {
                let uri = self
                    .default_uri
                    .as_deref()
                    .ok_or(DatabaseError::NotConfigured)?;
                self.shared
                    .get_or_try_init(|| self.connect(uri))
                    .await
                    .cloned()
            }
        }
    }
}

#[async_trait]
impl DatabaseApi for MongoIntrospector {
    async fn list_databases(
        &self,
        connection_string: Option<&str>,
    ) -> Result<Vec<DatabaseSize>, DatabaseError> {
        let client = self.client(connection_string).await?;
        let databases = client.list_databases().await?;
        Ok(databases
            .into_iter()
            .map(|spec| DatabaseSize {
                name: spec.name,
                size_on_disk: spec.size_on_disk,
                empty: spec.empty,
            })
            .collect())
    }

    async fn collection_reusable_space(
        &self,
        connection_string: Option<&str>,
        database: Option<&str>,
    ) -> Result<Vec<CollectionReusableSpace>, DatabaseError> {
        let client = self.client(connection_string).await?;
        let names = match database {
            Some(name) => vec![name.to_string()],
            None => client.list_database_names().await?,
        };

        let mut results = Vec::new();
        for db_name in names {
            let db = client.database(&db_name);
            for coll_name in db.list_collection_names().await? {
                let stats = match db.run_command(doc! { "collStats": coll_name.as_str() }).await {
                    Ok(stats) => stats,
                    Err(e) => {
                        let err = DatabaseError::from(e);
                        if !skips_collection(&err) {
                            return Err(err);
                        }
                        tracing::warn!(
                            "Failed to fetch stats for {}.{}: {}",
                            db_name,
                            coll_name,
                            err
                        );
                        continue;
                    }
                };
                match reusable_bytes(&stats) {
                    Some(reusable_bytes) => results.push(CollectionReusableSpace {
                        database: db_name.clone(),
                        collection: coll_name,
                        reusable_bytes,
                    }),
                    None => tracing::warn!(
                        "Missing reusable space field in stats for {}.{}",
                        db_name,
                        coll_name
                    ),
                }
            }
        }
        Ok(results)
    }
}
