use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;

/// Configuration describing a single chart.
///
/// The fields relevant to orchestration are explicit; everything else a chart
/// carries (filters, display options, builder-specific settings) lives in the
/// flattened `extra` bag and is passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormData {
    /// Chart type, selects the query builder.
    pub viz_type: String,
    /// Key of the datasource the chart reads from.
    pub datasource: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotation_layers: Vec<AnnotationLayerMetadata>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FormData {
    pub fn new(viz_type: impl Into<String>, datasource: impl Into<String>) -> Self {
        Self {
            viz_type: viz_type.into(),
            datasource: datasource.into(),
            annotation_layers: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Shallow field-level merge: every field present in `overrides` replaces
    /// the stored field, absent fields keep their stored value. Extension-bag
    /// entries replace key-wise; values are not deep-merged.
    pub fn merged(mut self, overrides: FormDataOverride) -> FormData {
        let FormDataOverride {
            viz_type,
            datasource,
            annotation_layers,
            extra,
        } = overrides;
        if let Some(viz_type) = viz_type {
            self.viz_type = viz_type;
        }
        if let Some(datasource) = datasource {
            self.datasource = datasource;
        }
        if let Some(annotation_layers) = annotation_layers {
            self.annotation_layers = annotation_layers;
        }
        self.extra.extend(extra);
        self
    }
}

/// Partial [`FormData`]: a field-level override on top of stored form data,
/// or the form data itself when no stored identifier is given.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormDataOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viz_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datasource: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation_layers: Option<Vec<AnnotationLayerMetadata>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl From<FormData> for FormDataOverride {
    fn from(value: FormData) -> Self {
        let FormData {
            viz_type,
            datasource,
            annotation_layers,
            extra,
        } = value;
        Self {
            viz_type: Some(viz_type),
            datasource: Some(datasource),
            annotation_layers: Some(annotation_layers),
            extra,
        }
    }
}

impl TryFrom<FormDataOverride> for FormData {
    type Error = Error;

    fn try_from(value: FormDataOverride) -> Result<Self, Self::Error> {
        let FormDataOverride {
            viz_type,
            datasource,
            annotation_layers,
            extra,
        } = value;
        let missing = |field: &str| {
            Error::InvalidInput(format!(
                "form_data given without slice_id must specify `{field}`"
            ))
        };
        Ok(FormData {
            viz_type: viz_type.ok_or_else(|| missing("viz_type"))?,
            datasource: datasource.ok_or_else(|| missing("datasource"))?,
            annotation_layers: annotation_layers.unwrap_or_default(),
            extra,
        })
    }
}

/// Metadata describing one annotation overlay requested by a chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationLayerMetadata {
    /// Unique within one chart's layer list; used as the aggregation key, so
    /// a duplicate name silently overwrites the earlier entry.
    pub name: String,
    /// Absent means the layer needs no query and yields an empty result.
    #[serde(rename = "sourceType", default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AnnotationLayerMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_type: None,
            extra: Map::new(),
        }
    }

    pub fn with_source_type(mut self, source_type: impl Into<String>) -> Self {
        self.source_type = Some(source_type.into());
        self
    }
}

/// Input to [`ChartClient::load_chart_data`](crate::ChartClient::load_chart_data):
/// a stored slice identifier, an explicit form data, or both (the form data
/// then acts as an override on top of the stored one).
///
/// At least one of the two must be present; this is checked when the form
/// data is resolved, not by the type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartDataRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slice_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_data: Option<FormDataOverride>,
}

impl ChartDataRequest {
    pub fn from_slice_id(slice_id: i64) -> Self {
        Self {
            slice_id: Some(slice_id),
            form_data: None,
        }
    }

    pub fn from_form_data(form_data: FormData) -> Self {
        Self {
            slice_id: None,
            form_data: Some(form_data.into()),
        }
    }

    pub fn with_form_data(mut self, form_data: FormDataOverride) -> Self {
        self.form_data = Some(form_data);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn stored() -> FormData {
        let mut form_data = FormData::new("bar", "ds1");
        form_data
            .extra
            .insert("granularity".to_string(), json!("P1D"));
        form_data.extra.insert("limit".to_string(), json!(100));
        form_data
    }

    #[test]
    fn merged_replaces_present_fields_and_keeps_absent_ones() {
        let overrides = FormDataOverride {
            datasource: Some("ds2".to_string()),
            extra: Map::from_iter([("limit".to_string(), json!(10))]),
            ..Default::default()
        };

        let merged = stored().merged(overrides);

        assert_eq!(merged.viz_type, "bar");
        assert_eq!(merged.datasource, "ds2");
        assert_eq!(merged.extra["granularity"], json!("P1D"));
        assert_eq!(merged.extra["limit"], json!(10));
    }

    #[test]
    fn merged_replaces_extension_values_without_deep_merging() {
        let mut form_data = stored();
        form_data
            .extra
            .insert("time_range".to_string(), json!({"since": "2020", "until": "2021"}));
        let overrides = FormDataOverride {
            extra: Map::from_iter([("time_range".to_string(), json!({"since": "2022"}))]),
            ..Default::default()
        };

        let merged = form_data.merged(overrides);

        assert_eq!(merged.extra["time_range"], json!({"since": "2022"}));
    }

    #[test]
    fn override_roundtrips_complete_form_data() {
        let form_data = stored();
        let roundtripped =
            FormData::try_from(FormDataOverride::from(form_data.clone())).unwrap();
        assert_eq!(form_data, roundtripped);
    }

    #[test]
    fn standalone_override_requires_viz_type() {
        let overrides = FormDataOverride {
            datasource: Some("ds1".to_string()),
            ..Default::default()
        };
        let err = FormData::try_from(overrides).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(msg) if msg.contains("viz_type")));
    }

    #[test]
    fn deserializes_stored_form_data_without_annotation_layers() {
        let form_data: FormData = serde_json::from_value(json!({
            "viz_type": "bar",
            "datasource": "ds1",
            "metric": "count"
        }))
        .unwrap();

        assert!(form_data.annotation_layers.is_empty());
        assert_eq!(form_data.extra["metric"], json!("count"));
    }

    #[test]
    fn annotation_layer_uses_wire_field_names() {
        let layer: AnnotationLayerMetadata = serde_json::from_value(json!({
            "name": "holidays",
            "sourceType": "NATIVE",
            "color": "#fff"
        }))
        .unwrap();

        assert_eq!(layer.source_type.as_deref(), Some("NATIVE"));
        assert_eq!(layer.extra["color"], json!("#fff"));
        assert_eq!(
            serde_json::to_value(AnnotationLayerMetadata::new("plain")).unwrap(),
            json!({"name": "plain"})
        );
    }
}
