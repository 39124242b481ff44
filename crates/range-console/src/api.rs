use async_trait::async_trait;
use range_common::{ContainerLogs, InstancePage, InstanceQuery, StatsSnapshot};
use range_sdk::{AdminClient, GatewayError};

/// Instance endpoints the console depends on.
#[async_trait]
pub trait InstanceApi: Send + Sync {
    async fn list_instances(&self, query: &InstanceQuery) -> Result<InstancePage, GatewayError>;
    async fn instance_stats(&self, instance_id: &str) -> Result<StatsSnapshot, GatewayError>;
    async fn instance_logs(&self, instance_id: &str, tail: u32) -> Result<ContainerLogs, GatewayError>;
}

#[async_trait]
impl InstanceApi for AdminClient {
    async fn list_instances(&self, query: &InstanceQuery) -> Result<InstancePage, GatewayError> {
        AdminClient::list_instances(self, query).await
    }

    async fn instance_stats(&self, instance_id: &str) -> Result<StatsSnapshot, GatewayError> {
        AdminClient::instance_stats(self, instance_id).await
    }

    async fn instance_logs(&self, instance_id: &str, tail: u32) -> Result<ContainerLogs, GatewayError> {
        AdminClient::instance_logs(self, instance_id, tail).await
    }
}
