//! REST client of the preparation server

use crate::core::menu::{DynamicParameters, DynamicParamsRequest, Params, TransformMenu};
use crate::core::{ColumnMetadata, DatasetContent, DatasetId, ExportType, PreparationId, TypeDescriptor};
use crate::error::{PrepError, Result};
use reqwest::{Client as HttpClient, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// Endpoints derived from the server base url
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestUrls {
    server: String,
}

impl RestUrls {
    pub fn new(server_url: &str) -> Self {
        Self {
            server: server_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn server_url(&self) -> &str {
        &self.server
    }

    pub fn export_url(&self) -> String {
        format!("{}/api/export", self.server)
    }

    pub fn transform_url(&self) -> String {
        format!("{}/api/transform", self.server)
    }

    pub fn datasets_url(&self) -> String {
        format!("{}/api/datasets", self.server)
    }

    pub fn preparations_url(&self) -> String {
        format!("{}/api/preparations", self.server)
    }

    pub fn types_url(&self) -> String {
        format!("{}/api/types", self.server)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatePreparation<'a> {
    name: &'a str,
    data_set_id: &'a DatasetId,
}

#[derive(Serialize)]
struct AppendAction<'a> {
    action: &'a str,
    parameters: &'a Params,
}

#[derive(Serialize)]
struct AppendActions<'a> {
    actions: Vec<AppendAction<'a>>,
}

#[derive(Debug, Clone)]
pub struct RestClient {
    http: HttpClient,
    urls: RestUrls,
}

impl RestClient {
    pub fn new(server_url: &str) -> Result<Self> {
        let http = HttpClient::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            urls: RestUrls::new(server_url),
        })
    }

    pub fn urls(&self) -> &RestUrls {
        &self.urls
    }

    async fn send(&self, url: &str, request: RequestBuilder) -> Result<reqwest::Response> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(url, status = status.as_u16(), "request failed");
            return Err(PrepError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(&self, url: &str, request: RequestBuilder) -> Result<T> {
        let body = self.send(url, request).await?.text().await?;
        serde_json::from_str(&body).map_err(|source| PrepError::Decode {
            url: url.to_string(),
            source,
        })
    }

    /// Export formats offered by the server
    pub async fn export_types(&self) -> Result<Vec<ExportType>> {
        let url = format!("{}/formats", self.urls.export_url());
        self.decode(&url, self.http.get(&url)).await
    }

    /// Export a dataset or preparation in the given format
    pub async fn export(
        &self,
        export_type: &ExportType,
        dataset_id: &DatasetId,
        preparation_id: Option<&PreparationId>,
        parameters: &[(String, String)],
    ) -> Result<Vec<u8>> {
        let url = self.urls.export_url();
        let mut query: Vec<(String, String)> = vec![
            ("exportType".to_string(), export_type.id.clone()),
            ("datasetId".to_string(), dataset_id.to_string()),
        ];
        if let Some(preparation_id) = preparation_id {
            query.push(("preparationId".to_string(), preparation_id.to_string()));
        }
        query.extend(parameters.iter().cloned());

        debug!(format = %export_type.id, "exporting");
        let response = self.send(&url, self.http.get(&url).query(&query)).await?;
        Ok(response.bytes().await?.to_vec())
    }

    pub async fn types(&self) -> Result<Vec<TypeDescriptor>> {
        let url = self.urls.types_url();
        self.decode(&url, self.http.get(&url)).await
    }

    pub async fn dataset_content(&self, dataset_id: &DatasetId) -> Result<DatasetContent> {
        let url = format!("{}/{}", self.urls.datasets_url(), dataset_id);
        self.decode(&url, self.http.get(&url).query(&[("metadata", "true")]))
            .await
    }

    pub async fn preparation_content(&self, preparation_id: &PreparationId) -> Result<DatasetContent> {
        let url = format!("{}/{}/content", self.urls.preparations_url(), preparation_id);
        self.decode(&url, self.http.get(&url).query(&[("version", "head")]))
            .await
    }

    /// Create a preparation on a dataset; returns its id
    pub async fn create_preparation(&self, name: &str, dataset_id: &DatasetId) -> Result<PreparationId> {
        let url = self.urls.preparations_url();
        let body = CreatePreparation {
            name,
            data_set_id: dataset_id,
        };
        let text = self
            .send(&url, self.http.post(&url).json(&body))
            .await?
            .text()
            .await?;
        let id = text.trim().trim_matches('"');
        if id.is_empty() {
            return Err(PrepError::MissingContext("preparation id in server response"));
        }
        Ok(PreparationId::new(id))
    }

    /// Append steps at the head of a preparation
    pub async fn append_actions(&self, preparation_id: &PreparationId, actions: &[(String, Params)]) -> Result<()> {
        let url = format!("{}/{}/actions", self.urls.preparations_url(), preparation_id);
        let body = AppendActions {
            actions: actions
                .iter()
                .map(|(action, parameters)| AppendAction { action, parameters })
                .collect(),
        };
        self.send(&url, self.http.post(&url).json(&body)).await?;
        Ok(())
    }

    /// Transformations applicable to a column
    pub async fn column_transformations(&self, column: &ColumnMetadata) -> Result<Vec<TransformMenu>> {
        let url = format!("{}/actions/column", self.urls.transform_url());
        self.decode(&url, self.http.post(&url).json(column)).await
    }

    pub async fn dynamic_parameters(&self, action: &str, request: &DynamicParamsRequest) -> Result<DynamicParameters> {
        let url = format!("{}/suggest/{}/params", self.urls.transform_url(), action);
        let mut query = vec![
            ("columnId", request.column_id.to_string()),
            ("datasetId", request.dataset_id.to_string()),
        ];
        if let Some(preparation_id) = &request.preparation_id {
            query.push(("preparationId", preparation_id.to_string()));
        }
        self.decode(&url, self.http.get(&url).query(&query)).await
    }
}
