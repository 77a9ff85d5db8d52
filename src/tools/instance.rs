//! Instance lifecycle and catalog tools backed by the DDS OpenAPI.

use std::sync::Arc;

use async_trait::async_trait;

use super::{ParamSpec, ParamType, ToolDescriptor, ToolHandler, ToolRegistry, ValidatedArgs};
use crate::error::ToolError;
use crate::openapi::actions::{
    AllocatePublicNetworkAddress, CreateDbInstance, DescribeAvailabilityZones,
    DescribeAvailableResource, DescribeDbInstanceAttribute, DescribeDbInstances,
    DescribeReplicaSetRole,
};
use crate::openapi::{Action, ActionRequest, CloudApi};
use crate::InvokeOutput;

const CHARGE_TYPES: &[&str] = &["PrePaid", "PostPaid"];
const STORAGE_TYPES: &[&str] = &[
    "local_ssd",
    "cloud_essd1",
    "cloud_essd2",
    "cloud_essd3",
    "cloud_auto",
];
const DB_TYPES: &[&str] = &["normal", "sharding"];
const REPLICATION_FACTORS: [i64; 4] = [1, 3, 5, 7];
const DEFAULT_REPLICATION_FACTOR: i64 = 3;

const STORAGE_TYPE_DESCRIPTION: &str = "Storage type. Versions below 4.2 only support local_ssd, \
     versions above 4.2 only the cloud_* types, version 4.2 supports all of them.";
const DB_INSTANCE_ID_DESCRIPTION: &str = "The ID of the MongoDB instance.";

pub fn register(registry: &mut ToolRegistry, cloud: &Arc<dyn CloudApi>) {
    registry.register(Arc::new(CreateDbInstanceTool::new(cloud.clone())));
    registry.register(Arc::new(InstanceIdTool::allocate_public_network_address(cloud.clone())));
    registry.register(Arc::new(InstanceIdTool::describe_replica_set_role(cloud.clone())));
    registry.register(Arc::new(InstanceIdTool::describe_db_instance_attribute(cloud.clone())));
    registry.register(Arc::new(RegionTool::describe_db_instances(cloud.clone())));
    registry.register(Arc::new(DescribeAvailableResourceTool::new(cloud.clone())));
    registry.register(Arc::new(RegionTool::describe_available_zones(cloud.clone())));
}

/// Sends `action` and returns the response body unmodified.
pub(crate) async fn forward<A: Action>(
    cloud: &dyn CloudApi,
    action: &A,
) -> Result<InvokeOutput, ToolError> {
    let request = ActionRequest::new(action)?;
    let body = cloud.call(request).await?;
    Ok(InvokeOutput { output: body })
}

fn check_replication_factor(value: i64) -> Result<i64, ToolError> {
    if REPLICATION_FACTORS.contains(&value) {
        Ok(value)
    } else {
        Err(ToolError::invalid(
            "replication_factor",
            "must be one of 1, 3, 5, 7",
        ))
    }
}

pub struct CreateDbInstanceTool {
    descriptor: ToolDescriptor,
    cloud: Arc<dyn CloudApi>,
}

impl CreateDbInstanceTool {
    pub fn new(cloud: Arc<dyn CloudApi>) -> Self {
        let descriptor = ToolDescriptor {
            name: "create_db_instance",
            description: "Create a MongoDB replica set instance.",
            params: vec![
                ParamSpec::required("region_id", ParamType::String, "Region ID."),
                ParamSpec::required("zone_id", ParamType::String, "Zone ID."),
                ParamSpec::required("engine_version", ParamType::String, "Database version."),
                ParamSpec::required(
                    "db_instance_class",
                    ParamType::String,
                    "Instance class. Query valid classes with `describe_available_resource` first. \
                     Classes ending in .c are general purpose and usually create faster than \
                     dedicated classes ending in .d.",
                ),
                ParamSpec::required(
                    "db_instance_storage",
                    ParamType::Integer,
                    "Storage space in GB.",
                ),
                ParamSpec::required(
                    "account_password",
                    ParamType::String,
                    "Password of the root user.",
                )
                .secret(),
                ParamSpec::required("charge_type", ParamType::String, "Instance payment type.")
                    .one_of(CHARGE_TYPES),
                ParamSpec::required(
                    "vpc_id",
                    ParamType::String,
                    "VPC ID. Query available VPCs with `describe_vpcs`.",
                ),
                ParamSpec::required(
                    "vswitch_id",
                    ParamType::String,
                    "VSwitch ID in the zone. Query available VSwitches with `describe_vswitches`.",
                ),
                ParamSpec::required("storage_type", ParamType::String, STORAGE_TYPE_DESCRIPTION)
                    .one_of(STORAGE_TYPES),
                ParamSpec::optional(
                    "security_ip_list",
                    ParamType::String,
                    "IP whitelist, separated by commas. The service default is 127.0.0.1.",
                ),
                ParamSpec::optional(
                    "period",
                    ParamType::Integer,
                    "Purchase duration in months. Required when charge_type is PrePaid.",
                ),
                ParamSpec::optional(
                    "replication_factor",
                    ParamType::Integer,
                    "Number of nodes: 1, 3, 5 or 7. Default: 3.",
                ),
            ],
        };
        Self { descriptor, cloud }
    }
}

#[async_trait]
impl ToolHandler for CreateDbInstanceTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, args: ValidatedArgs) -> Result<InvokeOutput, ToolError> {
        let charge_type = args.string("charge_type")?;
        let period = args.opt_int("period");
        if charge_type == "PrePaid" && period.is_none() {
            return Err(ToolError::MissingArgument("period".to_string()));
        }
        if let Some(period) = period {
            if period < 1 {
                return Err(ToolError::invalid("period", "must be at least 1 month"));
            }
        }
        let db_instance_storage = args.int("db_instance_storage")?;
        if db_instance_storage < 1 {
            return Err(ToolError::invalid(
                "db_instance_storage",
                "must be a positive number of GB",
            ));
        }
        let replication_factor = check_replication_factor(
            args.opt_int("replication_factor")
                .unwrap_or(DEFAULT_REPLICATION_FACTOR),
        )?;

        let request = CreateDbInstance {
            region_id: args.string("region_id")?,
            zone_id: args.string("zone_id")?,
            engine_version: args.string("engine_version")?,
            db_instance_class: args.string("db_instance_class")?,
            db_instance_storage,
            account_password: args.string("account_password")?,
            charge_type,
            vpc_id: args.string("vpc_id")?,
            vswitch_id: args.string("vswitch_id")?,
            storage_type: args.string("storage_type")?,
            security_ip_list: args.opt_string("security_ip_list"),
            period,
            replication_factor: Some(replication_factor),
        };
        forward(self.cloud.as_ref(), &request).await
    }
}

#[derive(Debug, Clone, Copy)]
enum InstanceAction {
    AllocatePublicNetworkAddress,
    DescribeReplicaSetRole,
    DescribeDbInstanceAttribute,
}

/// Tools whose only argument is `db_instance_id`.
pub struct InstanceIdTool {
    descriptor: ToolDescriptor,
    action: InstanceAction,
    cloud: Arc<dyn CloudApi>,
}

impl InstanceIdTool {
    fn new(
        name: &'static str,
        description: &'static str,
        action: InstanceAction,
        cloud: Arc<dyn CloudApi>,
    ) -> Self {
        Self {
            descriptor: ToolDescriptor {
                name,
                description,
                params: vec![ParamSpec::required(
                    "db_instance_id",
                    ParamType::String,
                    DB_INSTANCE_ID_DESCRIPTION,
                )],
            },
            action,
            cloud,
        }
    }

    pub fn allocate_public_network_address(cloud: Arc<dyn CloudApi>) -> Self {
        Self::new(
            "allocate_public_network_address",
            "Assign a public IP address to every non-hidden node of the instance to enable \
             public network access.",
            InstanceAction::AllocatePublicNetworkAddress,
            cloud,
        )
    }

    pub fn describe_replica_set_role(cloud: Arc<dyn CloudApi>) -> Self {
        Self::new(
            "describe_replica_set_role",
            "Query the connection strings and node roles of a MongoDB instance. Public network \
             addresses are only available through this tool.",
            InstanceAction::DescribeReplicaSetRole,
            cloud,
        )
    }

    pub fn describe_db_instance_attribute(cloud: Arc<dyn CloudApi>) -> Self {
        Self::new(
            "describe_db_instance_attribute",
            "Query detailed information about a specific MongoDB instance.",
            InstanceAction::DescribeDbInstanceAttribute,
            cloud,
        )
    }
}

#[async_trait]
impl ToolHandler for InstanceIdTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, args: ValidatedArgs) -> Result<InvokeOutput, ToolError> {
        let db_instance_id = args.string("db_instance_id")?;
        let cloud = self.cloud.as_ref();
        match self.action {
            InstanceAction::AllocatePublicNetworkAddress => {
                forward(cloud, &AllocatePublicNetworkAddress { db_instance_id }).await
            }
            InstanceAction::DescribeReplicaSetRole => {
                forward(cloud, &DescribeReplicaSetRole { db_instance_id }).await
            }
            InstanceAction::DescribeDbInstanceAttribute => {
                forward(cloud, &DescribeDbInstanceAttribute { db_instance_id }).await
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum RegionAction {
    DescribeDbInstances,
    DescribeAvailabilityZones,
}

/// Tools whose only argument is `region_id`.
pub struct RegionTool {
    descriptor: ToolDescriptor,
    action: RegionAction,
    cloud: Arc<dyn CloudApi>,
}

impl RegionTool {
    pub fn describe_db_instances(cloud: Arc<dyn CloudApi>) -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: "describe_db_instances",
                description: "Query all MongoDB instances in a region.",
                params: vec![ParamSpec::required(
                    "region_id",
                    ParamType::String,
                    "Region to query instances in (e.g. cn-hangzhou).",
                )],
            },
            action: RegionAction::DescribeDbInstances,
            cloud,
        }
    }

    pub fn describe_available_zones(cloud: Arc<dyn CloudApi>) -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: "describe_available_zones",
                description: "Query the zones where MongoDB instances can be created.",
                params: vec![ParamSpec::required(
                    "region_id",
                    ParamType::String,
                    "Region to query zones in (e.g. cn-hangzhou).",
                )],
            },
            action: RegionAction::DescribeAvailabilityZones,
            cloud,
        }
    }
}

#[async_trait]
impl ToolHandler for RegionTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, args: ValidatedArgs) -> Result<InvokeOutput, ToolError> {
        let region_id = args.string("region_id")?;
        let cloud = self.cloud.as_ref();
        match self.action {
            RegionAction::DescribeDbInstances => {
                forward(cloud, &DescribeDbInstances { region_id }).await
            }
            RegionAction::DescribeAvailabilityZones => {
                forward(cloud, &DescribeAvailabilityZones { region_id }).await
            }
        }
    }
}

pub struct DescribeAvailableResourceTool {
    descriptor: ToolDescriptor,
    cloud: Arc<dyn CloudApi>,
}

impl DescribeAvailableResourceTool {
    pub fn new(cloud: Arc<dyn CloudApi>) -> Self {
        let descriptor = ToolDescriptor {
            name: "describe_available_resource",
            description: "Query the instance classes available for new MongoDB instances.",
            params: vec![
                ParamSpec::required("region_id", ParamType::String, "Region ID of the instance."),
                ParamSpec::required(
                    "zone_id",
                    ParamType::String,
                    "Zone ID of the instance. Query zones with `describe_available_zones`.",
                ),
                ParamSpec::required(
                    "instance_charge_type",
                    ParamType::String,
                    "Instance payment type.",
                )
                .one_of(CHARGE_TYPES),
                ParamSpec::required(
                    "db_type",
                    ParamType::String,
                    "Instance category: normal is a replica set, sharding is a sharded cluster.",
                )
                .one_of(DB_TYPES),
                ParamSpec::required("storage_type", ParamType::String, STORAGE_TYPE_DESCRIPTION)
                    .one_of(STORAGE_TYPES),
                ParamSpec::required(
                    "engine_version",
                    ParamType::String,
                    "MongoDB version: 3.4, 4.0, 4.2, 4.4, 5.0, 6.0, 7.0 or 8.0.",
                ),
                ParamSpec::required(
                    "replication_factor",
                    ParamType::Integer,
                    "Number of nodes: 1, 3, 5 or 7.",
                ),
            ],
        };
        Self { descriptor, cloud }
    }
}

#[async_trait]
impl ToolHandler for DescribeAvailableResourceTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, args: ValidatedArgs) -> Result<InvokeOutput, ToolError> {
        let request = DescribeAvailableResource {
            region_id: args.string("region_id")?,
            zone_id: args.string("zone_id")?,
            instance_charge_type: args.string("instance_charge_type")?,
            db_type: args.string("db_type")?,
            storage_type: args.string("storage_type")?,
            engine_version: args.string("engine_version")?,
            replication_factor: check_replication_factor(args.int("replication_factor")?)?,
        };
        forward(self.cloud.as_ref(), &request).await
    }
}
