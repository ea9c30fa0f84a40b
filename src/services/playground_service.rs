use crate::core::menu::Params;
use crate::core::{ColumnMetadata, DatasetMetadata, PreparationId};
use crate::error::{PrepError, Result};
use crate::services::rest::RestClient;
use futures::FutureExt;
use futures::future::{self, BoxFuture};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// Appends transformation steps to the current preparation
pub trait PlaygroundService: Send + Sync {
    /// Append a step when the returned future runs
    ///
    /// Implementations may defer all work until the future is first polled.
    fn append_step(&self, name: &str, column: &ColumnMetadata, params: Params) -> BoxFuture<'static, Result<()>>;
}

/// Add the column the step applies to
fn with_column(mut params: Params, column: &ColumnMetadata) -> Params {
    params.insert("column_id".to_string(), Value::String(column.id.to_string()));
    params.insert("column_name".to_string(), Value::String(column.name.clone()));
    params
}

#[derive(Debug, Default)]
struct Context {
    dataset: Option<DatasetMetadata>,
    preparation_id: Option<PreparationId>,
}

/// Playground backed by the preparation server
///
/// The preparation is created on the first appended step.
#[derive(Debug, Clone)]
pub struct RestPlaygroundService {
    client: RestClient,
    context: Arc<Mutex<Context>>,
}

fn lock(context: &Mutex<Context>) -> MutexGuard<'_, Context> {
    context.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RestPlaygroundService {
    pub fn new(client: RestClient) -> Self {
        Self {
            client,
            context: Arc::new(Mutex::new(Context::default())),
        }
    }

    pub fn set_dataset(&self, dataset: DatasetMetadata, preparation_id: Option<PreparationId>) {
        let mut context = lock(&self.context);
        context.dataset = Some(dataset);
        context.preparation_id = preparation_id;
    }

    pub fn preparation_id(&self) -> Option<PreparationId> {
        lock(&self.context).preparation_id.clone()
    }
}

impl PlaygroundService for RestPlaygroundService {
    fn append_step(&self, name: &str, column: &ColumnMetadata, params: Params) -> BoxFuture<'static, Result<()>> {
        let params = with_column(params, column);
        let client = self.client.clone();
        let context = self.context.clone();
        let name = name.to_string();

        async move {
            let (dataset, existing) = {
                let context = lock(&context);
                (context.dataset.clone(), context.preparation_id.clone())
            };
            let dataset = dataset.ok_or(PrepError::MissingContext("dataset"))?;

            let preparation_id = match existing {
                Some(id) => id,
                None => {
                    let id = client
                        .create_preparation(&format!("{} Preparation", dataset.name), &dataset.id)
                        .await?;
                    info!(preparation = %id, "created preparation");
                    lock(&context).preparation_id = Some(id.clone());
                    id
                }
            };

            debug!(preparation = %preparation_id, step = %name, "appending step");
            client.append_actions(&preparation_id, &[(name, params)]).await
        }
        .boxed()
    }
}

/// Playground of a local file; steps cannot be applied
#[derive(Debug, Clone, Default)]
pub struct OfflinePlaygroundService;

impl PlaygroundService for OfflinePlaygroundService {
    fn append_step(&self, _name: &str, _column: &ColumnMetadata, _params: Params) -> BoxFuture<'static, Result<()>> {
        future::ready(Err(PrepError::MissingContext("preparation server"))).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_column_is_added_to_params() {
        let column = ColumnMetadata::new("0001", "city", "string");
        let mut params = Params::new();
        params.insert("scope".to_string(), json!("column"));

        let params = with_column(params, &column);
        assert_eq!(params.get("column_id"), Some(&json!("0001")));
        assert_eq!(params.get("column_name"), Some(&json!("city")));
        assert_eq!(params.get("scope"), Some(&json!("column")));
    }

    #[tokio::test]
    async fn test_append_without_dataset_fails() {
        let service = RestPlaygroundService::new(RestClient::new("http://127.0.0.1:9").unwrap());
        let column = ColumnMetadata::new("0001", "city", "string");
        let err = service.append_step("uppercase", &column, Params::new()).await.unwrap_err();
        assert!(matches!(err, PrepError::MissingContext("dataset")));
        assert_eq!(service.preparation_id(), None);
    }

    #[tokio::test]
    async fn test_offline_append_fails() {
        let column = ColumnMetadata::new("0001", "city", "string");
        let result = OfflinePlaygroundService.append_step("uppercase", &column, Params::new()).await;
        assert!(result.is_err());
    }
}
