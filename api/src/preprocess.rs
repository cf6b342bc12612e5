//! Fitted feature transform: date parts, Box-Cox quantity, one-hot
//! categoricals and target-encoded product name.

use std::collections::HashMap;

use chrono::Datelike;
use serde::Deserialize;

use crate::model::InferenceError;
use crate::schema::PredictionRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleUnknown {
    Error,
    Ignore,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OneHotColumn {
    pub name: String,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OneHotEncoder {
    pub columns: Vec<OneHotColumn>,
    pub handle_unknown: HandleUnknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Preprocessor {
    pub one_hot: OneHotEncoder,
    pub boxcox_lambda: f64,
    pub product_target_mean: HashMap<String, f64>,
    pub overall_mean: f64,
}

pub const DATE_FEATURES: [&str; 3] = ["Year", "Month", "Day"];
pub const QTY_FEATURE: &str = "OrderQty_boxcox";
pub const NAME_FEATURE: &str = "Name_target_encoded";

/// Request fields the one-hot encoder may be fitted on.
pub const CATEGORICAL_COLUMNS: [&str; 5] = [
    "PersonType",
    "ProductLine",
    "Name_territory",
    "CountryRegionCode",
    "Group",
];

/// Box-Cox power transform for a strictly positive value.
pub fn boxcox(x: f64, lambda: f64) -> f64 {
    if lambda == 0.0 {
        x.ln()
    } else {
        (x.powf(lambda) - 1.0) / lambda
    }
}

fn categorical_value<'a>(req: &'a PredictionRequest, column: &str) -> Option<&'a str> {
    let value = match column {
        "PersonType" => &req.person_type,
        "ProductLine" => &req.product_line,
        "Name_territory" => &req.name_territory,
        "CountryRegionCode" => &req.country_region_code,
        "Group" => &req.group,
        _ => return None,
    };
    Some(value.as_str())
}

impl Preprocessor {
    /// Output feature names, in the order `transform` emits them.
    pub fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = DATE_FEATURES.iter().map(|s| s.to_string()).collect();
        names.push(QTY_FEATURE.to_string());
        for column in &self.one_hot.columns {
            for category in &column.categories {
                names.push(format!("{}_{}", column.name, category));
            }
        }
        names.push(NAME_FEATURE.to_string());
        names
    }

    /// Names of one-hot columns that do not correspond to a request field.
    pub fn unknown_columns(&self) -> Vec<&str> {
        self.one_hot
            .columns
            .iter()
            .map(|c| c.name.as_str())
            .filter(|name| !CATEGORICAL_COLUMNS.contains(name))
            .collect()
    }

    pub fn transform(&self, req: &PredictionRequest) -> Result<Vec<f64>, InferenceError> {
        let date = req.order_date;
        let mut row = vec![
            f64::from(date.year()),
            f64::from(date.month()),
            f64::from(date.day()),
            boxcox(f64::from(req.order_qty), self.boxcox_lambda),
        ];

        for column in &self.one_hot.columns {
            let value = categorical_value(req, &column.name)
                .ok_or_else(|| InferenceError::UnsupportedColumn(column.name.clone()))?;
            let hit = column.categories.iter().position(|c| c == value);
            if hit.is_none() && self.one_hot.handle_unknown == HandleUnknown::Error {
                return Err(InferenceError::UnknownCategory {
                    field: column.name.clone(),
                    value: value.to_string(),
                });
            }
            row.extend((0..column.categories.len()).map(|i| {
                if Some(i) == hit {
                    1.0
                } else {
                    0.0
                }
            }));
        }

        let encoded = self
            .product_target_mean
            .get(&req.name)
            .copied()
            .unwrap_or(self.overall_mean);
        row.push(encoded);
        Ok(row)
    }
}
