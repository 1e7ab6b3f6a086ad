//! Client library assembling everything needed to render a single chart: the
//! resolved form data, the query result derived from it, the metadata of the
//! datasource it refers to, and any annotation overlays it requests.
//!
//! The entry point is [`ChartClient::load_chart_data`]: it resolves the form
//! data first (stored, explicit, or a merge of both), then issues the query,
//! datasource and annotation loads concurrently and returns one [`ChartData`]
//! aggregate or the first failure.

mod annotations;
mod client;
mod connection;
mod error;
mod form_data;
mod registry;

pub use annotations::{AnnotationData, AnnotationSource, AnnotationSourceRegistry};
pub use client::{ChartClient, ChartData};
pub use connection::{
    serialize_query, Connection, ConnectionConfig, HttpConnection, RequestConfig, RequestOptions,
    TransportError,
};
pub use error::Error;
pub use form_data::{AnnotationLayerMetadata, ChartDataRequest, FormData, FormDataOverride};
pub use registry::{QueryBuilder, QueryBuilderRegistry};
