use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};

/// One station row as read from an upload or entered by hand.
///
/// Field names on the wire match the CSV header used by the prediction service.
/// Readings that could not be parsed are `None` and go out as JSON `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationRecord {
    #[serde(rename = "Station_Names")]
    pub name: String,
    #[serde(rename = "Year")]
    pub year: Option<i32>,
    #[serde(rename = "Month")]
    pub month: Option<i32>,
    #[serde(rename = "Max_Temp")]
    pub max_temp: Option<f64>,
    #[serde(rename = "Min_Temp")]
    pub min_temp: Option<f64>,
    #[serde(rename = "Rainfall")]
    pub rainfall: Option<f64>,
    #[serde(rename = "Relative_Humidity")]
    pub relative_humidity: Option<f64>,
    #[serde(rename = "Wind_Speed")]
    pub wind_speed: Option<f64>,
    #[serde(rename = "Cloud_Coverage")]
    pub cloud_coverage: Option<f64>,
    #[serde(rename = "Bright_Sunshine")]
    pub bright_sunshine: Option<f64>,
    #[serde(rename = "Station_Number")]
    pub station_number: Option<i32>,
    #[serde(rename = "X_COR")]
    pub x_cor: Option<f64>,
    #[serde(rename = "Y_COR")]
    pub y_cor: Option<f64>,
    #[serde(rename = "LATITUDE")]
    pub latitude: f64,
    #[serde(rename = "LONGITUDE")]
    pub longitude: f64,
    #[serde(rename = "ALT")]
    pub alt: Option<f64>,
    #[serde(rename = "Period")]
    pub period: Option<f64>,
}

impl StationRecord {
    /// A record carrying only the required fields.
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            year: None,
            month: None,
            max_temp: None,
            min_temp: None,
            rainfall: None,
            relative_humidity: None,
            wind_speed: None,
            cloud_coverage: None,
            bright_sunshine: None,
            station_number: None,
            x_cor: None,
            y_cor: None,
            latitude,
            longitude,
            alt: None,
            period: None,
        }
    }
}

/// Successful response from the scoring endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub risk_percentage: f64,
    #[serde(default)]
    pub flood_prediction: Option<String>,
}

/// The service reports failures as `{"error": ...}` with a 200 status.
///
/// `Failed` is tried first so payloads whose fields all have defaults
/// cannot swallow an error body.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ServiceBody<T> {
    Failed { error: String },
    Data(T),
}

impl<T> ServiceBody<T> {
    pub(crate) fn into_result(self) -> Result<T> {
        match self {
            ServiceBody::Data(data) => Ok(data),
            ServiceBody::Failed { error } => Err(AppError::Prediction(error)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Low,
    Moderate,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatedStation {
    #[serde(flatten)]
    pub record: StationRecord,
    pub risk_percentage: f64,
    pub flood_prediction: Option<String>,
    pub tier: RiskTier,
}

impl AnnotatedStation {
    pub fn new(record: StationRecord, prediction: Prediction) -> Self {
        Self {
            record,
            tier: RiskTier::from_risk(prediction.risk_percentage),
            risk_percentage: prediction.risk_percentage,
            flood_prediction: prediction.flood_prediction,
        }
    }
}

/// A monitoring site as returned by the listing endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationSite {
    pub id: i64,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

/// The listing endpoint comes in two shapes: full sites, or bare names under `stations`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StationListing {
    Sites(Vec<StationSite>),
    Names { stations: Vec<String> },
}

impl StationListing {
    pub fn names(&self) -> Vec<&str> {
        match self {
            StationListing::Sites(sites) => sites.iter().map(|s| s.name.as_str()).collect(),
            StationListing::Names { stations } => stations.iter().map(String::as_str).collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            StationListing::Sites(sites) => sites.len(),
            StationListing::Names { stations } => stations.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationRainfall {
    #[serde(rename = "Station_Names")]
    pub station: String,
    #[serde(rename = "Rainfall")]
    pub rainfall: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationFloods {
    #[serde(rename = "Station_Names")]
    pub station: String,
    #[serde(rename = "Flood?")]
    pub floods: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRainfall {
    #[serde(rename = "Month")]
    pub month: u32,
    #[serde(rename = "Rainfall")]
    pub rainfall: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RainfallFloodPoint {
    #[serde(rename = "Rainfall")]
    pub rainfall: f64,
    #[serde(rename = "Flood?")]
    pub flood_rate: f64,
}

/// Aggregates backing the rainfall and flood charts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RainfallAnalysis {
    #[serde(default)]
    pub stations: Vec<StationRainfall>,
    #[serde(default)]
    pub floods: Vec<StationFloods>,
    #[serde(default)]
    pub monthly_rainfall: Vec<MonthlyRainfall>,
    #[serde(default)]
    pub rainfall_flood_correlation: Vec<RainfallFloodPoint>,
}

impl RainfallAnalysis {
    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
            && self.floods.is_empty()
            && self.monthly_rainfall.is_empty()
            && self.rainfall_flood_correlation.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyPoint {
    pub year: i32,
    pub rainfall: Option<f64>,
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyPoint {
    pub month: u32,
    pub rainfall: Option<f64>,
    pub temperature: Option<f64>,
}

/// Per-station rainfall and temperature history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationSeries {
    pub station: String,
    #[serde(default)]
    pub yearly: Vec<YearlyPoint>,
    #[serde(default)]
    pub monthly: Vec<MonthlyPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct AlertRequest<'a> {
    pub message: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AlertResponse {
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertOutcome {
    Delivered,
    Rejected(String),
}
