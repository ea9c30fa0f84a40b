use crate::core::ColumnMetadata;
use crate::core::menu::{DynamicParameters, DynamicParamsRequest, TransformMenu};
use crate::error::{PrepError, Result};
use crate::services::rest::RestClient;
use futures::FutureExt;
use futures::future::{self, BoxFuture};
use tracing::debug;

/// Transformation catalogue of the server
pub trait TransformationService: Send + Sync {
    /// Menus applicable to a column
    fn column_transformations(&self, column: &ColumnMetadata) -> BoxFuture<'static, Result<Vec<TransformMenu>>>;

    /// Parameters the server computes for a dynamic menu
    fn init_dynamic_parameters(
        &self,
        menu: &TransformMenu,
        request: DynamicParamsRequest,
    ) -> BoxFuture<'static, Result<DynamicParameters>>;
}

#[derive(Debug, Clone)]
pub struct RestTransformationService {
    client: RestClient,
}

impl RestTransformationService {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }
}

impl TransformationService for RestTransformationService {
    fn column_transformations(&self, column: &ColumnMetadata) -> BoxFuture<'static, Result<Vec<TransformMenu>>> {
        let client = self.client.clone();
        let column = column.clone();
        async move { client.column_transformations(&column).await }.boxed()
    }

    fn init_dynamic_parameters(
        &self,
        menu: &TransformMenu,
        request: DynamicParamsRequest,
    ) -> BoxFuture<'static, Result<DynamicParameters>> {
        debug!(menu = %menu.name, column = %request.column_id, "fetching dynamic parameters");
        let client = self.client.clone();
        let action = menu.name.clone();
        async move { client.dynamic_parameters(&action, &request).await }.boxed()
    }
}

/// Catalogue of a local file: nothing can be applied
#[derive(Debug, Clone, Default)]
pub struct OfflineTransformationService;

impl TransformationService for OfflineTransformationService {
    fn column_transformations(&self, _column: &ColumnMetadata) -> BoxFuture<'static, Result<Vec<TransformMenu>>> {
        future::ready(Ok(Vec::new())).boxed()
    }

    fn init_dynamic_parameters(
        &self,
        _menu: &TransformMenu,
        _request: DynamicParamsRequest,
    ) -> BoxFuture<'static, Result<DynamicParameters>> {
        future::ready(Err(PrepError::MissingContext("preparation server"))).boxed()
    }
}
