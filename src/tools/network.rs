//! VPC and VSwitch lookups used to place a new instance.

use std::sync::Arc;

use async_trait::async_trait;

use super::instance::forward;
use super::{ParamSpec, ParamType, ToolDescriptor, ToolHandler, ToolRegistry, ValidatedArgs};
use crate::error::ToolError;
use crate::openapi::actions::{DescribeVSwitches, DescribeVpcs};
use crate::openapi::CloudApi;
use crate::InvokeOutput;

const DEFAULT_PAGE_NUMBER: i64 = 1;
const DEFAULT_PAGE_SIZE: i64 = 10;
const MAX_PAGE_SIZE: i64 = 50;

pub fn register(registry: &mut ToolRegistry, cloud: &Arc<dyn CloudApi>) {
    registry.register(Arc::new(DescribeVpcsTool::new(cloud.clone())));
    registry.register(Arc::new(DescribeVSwitchesTool::new(cloud.clone())));
}

fn paging_params() -> [ParamSpec; 2] {
    [
        ParamSpec::optional(
            "page_number",
            ParamType::Integer,
            "Page number of the list. Default: 1.",
        ),
        ParamSpec::optional(
            "page_size",
            ParamType::Integer,
            "Entries per page, at most 50. Default: 10.",
        ),
    ]
}

fn paging(args: &ValidatedArgs) -> Result<(i64, i64), ToolError> {
    let page_number = args.opt_int("page_number").unwrap_or(DEFAULT_PAGE_NUMBER);
    if page_number < 1 {
        return Err(ToolError::invalid("page_number", "must be at least 1"));
    }
    let page_size = args.opt_int("page_size").unwrap_or(DEFAULT_PAGE_SIZE);
    if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
        return Err(ToolError::invalid(
            "page_size",
            format!("must be between 1 and {}", MAX_PAGE_SIZE),
        ));
    }
    Ok((page_number, page_size))
}

pub struct DescribeVpcsTool {
    descriptor: ToolDescriptor,
    cloud: Arc<dyn CloudApi>,
}

impl DescribeVpcsTool {
    pub fn new(cloud: Arc<dyn CloudApi>) -> Self {
        let mut params = vec![
            ParamSpec::required("region_id", ParamType::String, "Region ID of the VPC."),
            ParamSpec::optional(
                "vpc_id",
                ParamType::String,
                "VPC ID. Up to 20 IDs separated by commas.",
            ),
            ParamSpec::optional("vpc_name", ParamType::String, "Name of the VPC."),
        ];
        params.extend(paging_params());
        Self {
            descriptor: ToolDescriptor {
                name: "describe_vpcs",
                description: "Query the VPC list of a region.",
                params,
            },
            cloud,
        }
    }
}

#[async_trait]
impl ToolHandler for DescribeVpcsTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, args: ValidatedArgs) -> Result<InvokeOutput, ToolError> {
        let (page_number, page_size) = paging(&args)?;
        let request = DescribeVpcs {
            region_id: args.string("region_id")?,
            vpc_id: args.opt_string("vpc_id"),
            vpc_name: args.opt_string("vpc_name"),
            page_number,
            page_size,
        };
        forward(self.cloud.as_ref(), &request).await
    }
}

pub struct DescribeVSwitchesTool {
    descriptor: ToolDescriptor,
    cloud: Arc<dyn CloudApi>,
}

impl DescribeVSwitchesTool {
    pub fn new(cloud: Arc<dyn CloudApi>) -> Self {
        let mut params = vec![
            ParamSpec::required("region_id", ParamType::String, "Region ID of the VSwitch."),
            ParamSpec::optional(
                "vpc_id",
                ParamType::String,
                "ID of the VPC the VSwitch belongs to.",
            ),
            ParamSpec::optional("vswitch_id", ParamType::String, "ID of the VSwitch."),
            ParamSpec::optional("vswitch_name", ParamType::String, "Name of the VSwitch."),
            ParamSpec::optional("zone_id", ParamType::String, "Zone ID of the VSwitch."),
        ];
        params.extend(paging_params());
        Self {
            descriptor: ToolDescriptor {
                name: "describe_vswitches",
                description: "Query the VSwitch list of a region.",
                params,
            },
            cloud,
        }
    }
}

#[async_trait]
impl ToolHandler for DescribeVSwitchesTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, args: ValidatedArgs) -> Result<InvokeOutput, ToolError> {
        let (page_number, page_size) = paging(&args)?;
        let request = DescribeVSwitches {
            region_id: args.string("region_id")?,
            vpc_id: args.opt_string("vpc_id"),
            vswitch_id: args.opt_string("vswitch_id"),
            vswitch_name: args.opt_string("vswitch_name"),
            zone_id: args.opt_string("zone_id"),
            page_number,
            page_size,
        };
        forward(self.cloud.as_ref(), &request).await
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{registry, FakeCloud, FakeDatabase};
    use super::*;
    use crate::openapi::Service;
    use serde_json::json;

    #[tokio::test]
    async fn test_describe_vpcs_defaults() {
        let cloud = Arc::new(FakeCloud::default());
        let registry = registry(cloud.clone(), Arc::new(FakeDatabase::default()));
        registry
            .invoke("describe_vpcs", json!({ "region_id": "cn-hangzhou" }), &mut std::io::sink())
            .await
            .unwrap();

        let calls = cloud.calls();
        assert_eq!(calls[0].service, Service::Vpc);
        assert_eq!(calls[0].action, "DescribeVpcs");
        assert_eq!(calls[0].region_id.as_deref(), Some("cn-hangzhou"));
        assert_eq!(calls[0].params["PageNumber"], "1");
        assert_eq!(calls[0].params["PageSize"], "10");
        assert!(!calls[0].params.contains_key("VpcId"));
    }

    #[tokio::test]
    async fn test_describe_vswitches_filters() {
        let cloud = Arc::new(FakeCloud::default());
        let registry = registry(cloud.clone(), Arc::new(FakeDatabase::default()));
        registry
            .invoke(
                "describe_vswitches",
                json!({
                    "region_id": "cn-hangzhou",
                    "vpc_id": "vpc-bp1",
                    "zone_id": "cn-hangzhou-h",
                    "page_number": 2,
                    "page_size": 50
                }),
                &mut std::io::sink(),
            )
            .await
            .unwrap();

        let calls = cloud.calls();
        assert_eq!(calls[0].action, "DescribeVSwitches");
        assert_eq!(calls[0].params["VpcId"], "vpc-bp1");
        assert_eq!(calls[0].params["ZoneId"], "cn-hangzhou-h");
        assert_eq!(calls[0].params["PageNumber"], "2");
        assert_eq!(calls[0].params["PageSize"], "50");
        assert!(!calls[0].params.contains_key("VSwitchName"));
    }

    #[tokio::test]
    async fn test_page_bounds() {
        let cloud = Arc::new(FakeCloud::default());
        let registry = registry(cloud.clone(), Arc::new(FakeDatabase::default()));

        for (args, field) in [
            (json!({ "region_id": "r", "page_size": 51 }), "page_size"),
            (json!({ "region_id": "r", "page_size": 0 }), "page_size"),
            (json!({ "region_id": "r", "page_number": 0 }), "page_number"),
        ] {
            let err = registry
                .invoke("describe_vpcs", args, &mut std::io::sink())
                .await
                .unwrap_err();
            assert!(
                matches!(err, ToolError::InvalidArgument { field: ref f, .. } if f == field),
                "{:?}",
                err
            );
        }
        assert!(cloud.calls().is_empty());
    }
}
