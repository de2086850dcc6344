//! Output type definitions.

use crate::constants::{APP_VERSION, PRODUCER_APP_NAME, attributes};
use crate::geo::{Geometry, PixelRect};
use crate::inference::Prediction;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Supported output formats.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// GeoJSON feature collection.
    #[default]
    Geojson,
    /// CSV with WKT geometry.
    Csv,
}

impl OutputFormat {
    /// File extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Geojson => "geojson",
            Self::Csv => "csv",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Geojson => write!(f, "geojson"),
            Self::Csv => write!(f, "csv"),
        }
    }
}

/// Metadata describing who produced a feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducerInfo {
    /// Operator running the tool.
    pub user_name: String,
    /// Tool name.
    pub app: String,
    /// Tool version.
    pub app_version: String,
}

impl ProducerInfo {
    /// Producer info for the current process.
    pub fn current() -> Self {
        let user_name = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_default();
        Self {
            user_name,
            app: PRODUCER_APP_NAME.to_string(),
            app_version: APP_VERSION.to_string(),
        }
    }
}

/// Attributes attached to every output feature.
#[derive(Debug, Clone, PartialEq)]
pub struct Attributes {
    /// Top class label.
    pub label: String,
    /// Confidence of the top class.
    pub confidence: f32,
    /// Run start time, shared by all features of a run.
    pub date: DateTime<Utc>,
    /// Best predictions for the window, highest first.
    pub top_predictions: Vec<Prediction>,
    /// Present when producer info is enabled.
    pub producer: Option<ProducerInfo>,
}

impl Attributes {
    /// Ordered attribute columns as text.
    pub fn columns(&self) -> Vec<(&'static str, String)> {
        let mut columns = vec![
            (attributes::TOP_CATEGORY, self.label.clone()),
            (attributes::TOP_SCORE, self.confidence.to_string()),
            (attributes::DATE, self.date_string()),
            (attributes::TOP_FIVE, self.top_five_json().to_string()),
        ];
        if let Some(producer) = &self.producer {
            columns.push((attributes::USER_NAME, producer.user_name.clone()));
            columns.push((attributes::APP, producer.app.clone()));
            columns.push((attributes::APP_VERSION, producer.app_version.clone()));
        }
        columns
    }

    /// Attributes as a GeoJSON properties object.
    pub fn to_properties(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut props = serde_json::Map::new();
        props.insert(attributes::TOP_CATEGORY.into(), self.label.clone().into());
        props.insert(
            attributes::TOP_SCORE.into(),
            f64::from(self.confidence).into(),
        );
        props.insert(attributes::DATE.into(), self.date_string().into());
        props.insert(attributes::TOP_FIVE.into(), self.top_five_json());
        if let Some(producer) = &self.producer {
            props.insert(attributes::USER_NAME.into(), producer.user_name.clone().into());
            props.insert(attributes::APP.into(), producer.app.clone().into());
            props.insert(attributes::APP_VERSION.into(), producer.app_version.clone().into());
        }
        props
    }

    fn date_string(&self) -> String {
        self.date.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    fn top_five_json(&self) -> serde_json::Value {
        serde_json::Value::Array(
            self.top_predictions
                .iter()
                .map(|p| {
                    serde_json::json!({
                        "label": p.label,
                        "confidence": f64::from(p.confidence),
                    })
                })
                .collect(),
        )
    }
}

/// A geo-referenced detection.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoFeature {
    /// Geometry in the source's spatial reference.
    pub geometry: Geometry,
    /// Pixel footprint of the window, used for overlap tests.
    pub footprint: PixelRect,
    /// Feature attributes.
    pub attributes: Attributes,
}
