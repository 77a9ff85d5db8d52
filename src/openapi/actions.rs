//! Typed request parameters for every OpenAPI action the server forwards.
//!
//! Field names serialize to the parameter names the API expects; `None`
//! fields are left out of the query.

use serde::Serialize;

use super::{Action, Service};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateDbInstance {
    pub region_id: String,
    pub zone_id: String,
    pub engine_version: String,
    #[serde(rename = "DBInstanceClass")]
    pub db_instance_class: String,
    #[serde(rename = "DBInstanceStorage")]
    pub db_instance_storage: i64,
    pub account_password: String,
    pub charge_type: String,
    pub vpc_id: String,
    #[serde(rename = "VSwitchId")]
    pub vswitch_id: String,
    pub storage_type: String,
    #[serde(rename = "SecurityIPList", skip_serializing_if = "Option::is_none")]
    pub security_ip_list: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replication_factor: Option<i64>,
}

impl Action for CreateDbInstance {
    const SERVICE: Service = Service::Dds;
    const NAME: &'static str = "CreateDBInstance";
}

#[derive(Debug, Clone, Serialize)]
pub struct AllocatePublicNetworkAddress {
    #[serde(rename = "DBInstanceId")]
    pub db_instance_id: String,
}

impl Action for AllocatePublicNetworkAddress {
    const SERVICE: Service = Service::Dds;
    const NAME: &'static str = "AllocatePublicNetworkAddress";
}

#[derive(Debug, Clone, Serialize)]
pub struct DescribeReplicaSetRole {
    #[serde(rename = "DBInstanceId")]
    pub db_instance_id: String,
}

impl Action for DescribeReplicaSetRole {
    const SERVICE: Service = Service::Dds;
    const NAME: &'static str = "DescribeReplicaSetRole";
}

#[derive(Debug, Clone, Serialize)]
pub struct DescribeDbInstanceAttribute {
    #[serde(rename = "DBInstanceId")]
    pub db_instance_id: String,
}

impl Action for DescribeDbInstanceAttribute {
    const SERVICE: Service = Service::Dds;
    const NAME: &'static str = "DescribeDBInstanceAttribute";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeDbInstances {
    pub region_id: String,
}

impl Action for DescribeDbInstances {
    const SERVICE: Service = Service::Dds;
    const NAME: &'static str = "DescribeDBInstances";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeAvailableResource {
    pub region_id: String,
    pub zone_id: String,
    pub instance_charge_type: String,
    pub db_type: String,
    pub storage_type: String,
    pub engine_version: String,
    pub replication_factor: i64,
}

impl Action for DescribeAvailableResource {
    const SERVICE: Service = Service::Dds;
    const NAME: &'static str = "DescribeAvailableResource";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeAvailabilityZones {
    pub region_id: String,
}

impl Action for DescribeAvailabilityZones {
    const SERVICE: Service = Service::Dds;
    const NAME: &'static str = "DescribeAvailabilityZones";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeVpcs {
    pub region_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_name: Option<String>,
    pub page_number: i64,
    pub page_size: i64,
}

impl Action for DescribeVpcs {
    const SERVICE: Service = Service::Vpc;
    const NAME: &'static str = "DescribeVpcs";

    fn region_id(&self) -> Option<&str> {
        Some(&self.region_id)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeVSwitches {
    pub region_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
    #[serde(rename = "VSwitchId", skip_serializing_if = "Option::is_none")]
    pub vswitch_id: Option<String>,
    #[serde(rename = "VSwitchName", skip_serializing_if = "Option::is_none")]
    pub vswitch_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<String>,
    pub page_number: i64,
    pub page_size: i64,
}

impl Action for DescribeVSwitches {
    const SERVICE: Service = Service::Vpc;
    const NAME: &'static str = "DescribeVSwitches";

    fn region_id(&self) -> Option<&str> {
        Some(&self.region_id)
    }
}
