use ::serde::{Deserialize, Serialize};
use chrono::{DateTime, Local, NaiveDate};

/// A validated order record. Field names on the wire are fixed by the client.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PredictionRequest {
    #[serde(rename = "PersonType")]
    pub person_type: String,
    #[serde(rename = "OrderQty")]
    pub order_qty: u32,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "ProductLine")]
    pub product_line: String,
    #[serde(rename = "Name_territory")]
    pub name_territory: String,
    #[serde(rename = "CountryRegionCode")]
    pub country_region_code: String,
    #[serde(rename = "Group")]
    pub group: String,
    #[serde(rename = "OrderDate")]
    pub order_date: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct PredictionResult {
    pub success: bool,
    pub prediction: f64,
    pub input_data: PredictionRequest,
    pub timestamp: DateTime<Local>,
    pub model_name: String,
}

#[derive(Debug, Serialize)]
pub struct BatchItem {
    pub index: usize,
    pub prediction: f64,
    pub input_data: PredictionRequest,
}

#[derive(Debug, Serialize)]
pub struct BatchResult {
    pub success: bool,
    pub total_records: usize,
    pub predictions: Vec<BatchItem>,
    pub timestamp: DateTime<Local>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model_loaded: bool,
    pub model_name: Option<String>,
    pub timestamp: DateTime<Local>,
}

/// Revenue cannot be negative; raw model outputs below zero are reported as zero.
pub fn clamp_prediction(raw: f64) -> f64 {
    raw.max(0.0)
}
