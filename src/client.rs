use std::sync::Arc;

use futures::future;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::{
    annotations::{AnnotationData, AnnotationSourceRegistry},
    connection::{Connection, RequestConfig, RequestOptions, TransportError},
    error::Error,
    form_data::{AnnotationLayerMetadata, ChartDataRequest, FormData},
    registry::QueryBuilderRegistry,
};

const FORM_DATA_ENDPOINT: &str = "/api/v1/formData/";
const QUERY_ENDPOINT: &str = "/api/v1/query/";
const DATASOURCE_METADATA_ENDPOINT: &str = "/superset/fetch_datasource_metadata";

/// Everything needed to render a single chart.
///
/// Owned by the caller; serializes with the wire field names
/// (`formData`, `queryData`, `annotationData`).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    pub form_data: FormData,
    pub datasource: Value,
    pub query_data: Value,
    pub annotation_data: AnnotationData,
}

/// Assembles chart data over an injected [`Connection`].
///
/// Each call is an independent, stateless pipeline; the registries are
/// read-only shared state, safe for concurrent lookups from parallel calls.
#[derive(Clone)]
pub struct ChartClient {
    connection: Arc<dyn Connection>,
    query_builders: Arc<QueryBuilderRegistry>,
    annotation_sources: Arc<AnnotationSourceRegistry>,
}

impl ChartClient {
    pub fn new(connection: Arc<dyn Connection>, query_builders: Arc<QueryBuilderRegistry>) -> Self {
        Self {
            connection,
            query_builders,
            annotation_sources: Arc::new(AnnotationSourceRegistry::new()),
        }
    }

    pub fn with_annotation_sources(
        mut self,
        annotation_sources: Arc<AnnotationSourceRegistry>,
    ) -> Self {
        self.annotation_sources = annotation_sources;
        self
    }

    /// Resolves the canonical form data for a chart.
    ///
    /// A slice id fetches the stored form data, with a supplied override
    /// shallow-merged on top. Without a slice id the supplied form data is
    /// used as-is; supplying neither is an [`Error::InvalidInput`].
    pub async fn load_form_data(
        &self,
        input: &ChartDataRequest,
        options: RequestOptions,
    ) -> Result<FormData, Error> {
        match (input.slice_id, input.form_data.clone()) {
            (Some(slice_id), overrides) => {
                let request = RequestConfig::new(FORM_DATA_ENDPOINT)
                    .query(&json::SliceIdQuery { slice_id })
                    .options(options);
                let response = self.connection.get(request).await?;
                let stored: json::StoredFormData =
                    serde_json::from_value(response).map_err(TransportError::from)?;
                Ok(match overrides {
                    Some(overrides) => stored.form_data.merged(overrides),
                    None => stored.form_data,
                })
            }
            (None, Some(form_data)) => form_data.try_into(),
            (None, None) => Err(Error::InvalidInput(
                "at least one of slice_id or form_data must be specified".to_string(),
            )),
        }
    }

    /// Builds the query payload for the chart type and posts it to the query
    /// endpoint.
    ///
    /// A chart type with no registered builder fails before any network
    /// activity.
    pub async fn load_query_data(
        &self,
        form_data: &FormData,
        options: RequestOptions,
    ) -> Result<Value, Error> {
        let builder = self
            .query_builders
            .get(&form_data.viz_type)
            .ok_or_else(|| Error::UnknownChartType(form_data.viz_type.clone()))?;
        let query_context = builder.build(form_data);
        let request = RequestConfig::new(QUERY_ENDPOINT)
            .post_payload(json!({ "query_context": query_context }))
            .options(options);
        Ok(self.connection.post(request).await?)
    }

    /// Fetches metadata for a named datasource.
    ///
    /// The key is passed through without validation; a malformed key surfaces
    /// as a transport failure.
    pub async fn load_datasource(
        &self,
        datasource_key: &str,
        options: RequestOptions,
    ) -> Result<Value, Error> {
        let request = RequestConfig::new(DATASOURCE_METADATA_ENDPOINT)
            .query(&json::DatasourceQuery { datasource_key })
            .options(options);
        Ok(self.connection.get(request).await?)
    }

    /// Resolves the data of a single annotation layer.
    pub async fn load_annotation(&self, layer: &AnnotationLayerMetadata) -> Result<Value, Error> {
        // Layers without a source type need no query.
        let Some(source_type) = layer.source_type.as_deref() else {
            return Ok(Value::Object(Map::new()));
        };
        match self.annotation_sources.get(source_type) {
            Some(source) => source.load(layer).await,
            None => Err(Error::NotImplemented(source_type.to_string())),
        }
    }

    /// Loads all annotation layers concurrently into a name-keyed map.
    ///
    /// An empty layer list resolves immediately with no network activity.
    /// The first failing layer fails the whole aggregate and the remaining
    /// layer results are discarded.
    pub async fn load_annotations(
        &self,
        layers: &[AnnotationLayerMetadata],
    ) -> Result<AnnotationData, Error> {
        let results =
            future::try_join_all(layers.iter().map(|layer| self.load_annotation(layer))).await?;
        Ok(layers
            .iter()
            .map(|layer| layer.name.clone())
            .zip(results)
            .collect())
    }

    /// Resolves the chart's form data, then fans out the annotation,
    /// datasource and query loads concurrently and assembles the aggregate.
    ///
    /// Form-data resolution strictly precedes the fan-out since its output
    /// parameterizes every other load. The first failure among the three
    /// fails the whole call; no partial aggregate is ever returned.
    pub async fn load_chart_data(&self, input: &ChartDataRequest) -> Result<ChartData, Error> {
        let form_data = self
            .load_form_data(input, RequestOptions::default())
            .await?;
        debug!(
            viz_type = %form_data.viz_type,
            datasource = %form_data.datasource,
            "form data resolved, fanning out dependent loads"
        );
        let (annotation_data, datasource, query_data) = futures::try_join!(
            self.load_annotations(&form_data.annotation_layers),
            self.load_datasource(&form_data.datasource, RequestOptions::default()),
            self.load_query_data(&form_data, RequestOptions::default()),
        )?;
        Ok(ChartData {
            form_data,
            datasource,
            query_data,
            annotation_data,
        })
    }
}

mod json {
    use serde::{Deserialize, Serialize};

    use crate::form_data::FormData;

    #[derive(Debug, Serialize)]
    pub struct SliceIdQuery {
        pub slice_id: i64,
    }

    #[derive(Debug, Serialize)]
    pub struct DatasourceQuery<'a> {
        #[serde(rename = "datasourceKey")]
        pub datasource_key: &'a str,
    }

    #[derive(Debug, Deserialize)]
    pub struct StoredFormData {
        pub form_data: FormData,
    }
}
