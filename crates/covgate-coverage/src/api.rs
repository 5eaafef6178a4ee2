use async_trait::async_trait;
use covgate_core::Result;
use covgate_sfapi::{ApexClassInfo, ApexCodeCoverage, Connection, MetadataComponentDependency};
use tokio_util::sync::CancellationToken;

/// Access-layer seam between the selection strategies and the platform API.
///
/// Production code goes through `Connection`; tests substitute stubs.
#[async_trait]
pub trait ToolingApi: Sync {
    async fn request_coverage(
        &self,
        names: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<ApexCodeCoverage>>;

    async fn request_dependencies(
        &self,
        component_types: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<MetadataComponentDependency>>;

    async fn request_apex_classes(
        &self,
        names: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<ApexClassInfo>>;
}

#[async_trait]
impl ToolingApi for Connection {
    async fn request_coverage(
        &self,
        names: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<ApexCodeCoverage>> {
        Connection::request_coverage(self, names, cancel).await
    }

    async fn request_dependencies(
        &self,
        component_types: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<MetadataComponentDependency>> {
        Connection::request_dependencies(self, component_types, cancel).await
    }

    async fn request_apex_classes(
        &self,
        names: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<ApexClassInfo>> {
        Connection::request_apex_classes(self, names, cancel).await
    }
}
