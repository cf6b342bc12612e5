//! Request validation. Rules run in a fixed field order and the first
//! failing rule is the one reported.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::catalog::OptionsCatalog;
use crate::schema::PredictionRequest;

pub const MIN_ORDER_QTY: i64 = 1;
pub const MAX_ORDER_QTY: i64 = 1000;
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Categorical,
    PositiveInteger,
    Date,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct FieldRule {
    pub field: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
}

const fn rule(field: &'static str, kind: FieldKind) -> FieldRule {
    FieldRule {
        field,
        kind,
        required: true,
        min: None,
        max: None,
    }
}

/// Published at `/validation-rules`; the browser client checks fields in this order.
pub const RULES: [FieldRule; 8] = [
    rule("PersonType", FieldKind::Categorical),
    FieldRule {
        min: Some(MIN_ORDER_QTY),
        max: Some(MAX_ORDER_QTY),
        ..rule("OrderQty", FieldKind::PositiveInteger)
    },
    rule("Name", FieldKind::Text),
    rule("ProductLine", FieldKind::Categorical),
    rule("Name_territory", FieldKind::Categorical),
    rule("CountryRegionCode", FieldKind::Categorical),
    rule("Group", FieldKind::Categorical),
    rule("OrderDate", FieldKind::Date),
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct Rejection {
    pub message: String,
}

impl Rejection {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    fn at_index(self, index: usize) -> Self {
        Self::new(format!("data[{index}]: {}", self.message))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Validator {
    /// When present, categorical fields must appear in the catalog.
    catalog: Option<OptionsCatalog>,
}

impl Validator {
    pub fn lenient() -> Self {
        Self { catalog: None }
    }

    pub fn strict(catalog: OptionsCatalog) -> Self {
        Self {
            catalog: Some(catalog),
        }
    }

    pub fn is_strict(&self) -> bool {
        self.catalog.is_some()
    }

    /// Validates and normalizes one raw request object.
    pub fn record(&self, raw: &Value) -> Result<PredictionRequest, Rejection> {
        let obj = raw
            .as_object()
            .ok_or_else(|| Rejection::new("request body must be a JSON object"))?;

        // Struct fields are evaluated in the order written, matching RULES.
        Ok(PredictionRequest {
            person_type: self.categorical(obj, "PersonType")?,
            order_qty: quantity(obj, "OrderQty")?,
            name: text(obj, "Name")?,
            product_line: self.categorical(obj, "ProductLine")?,
            name_territory: self.categorical(obj, "Name_territory")?,
            country_region_code: self.categorical(obj, "CountryRegionCode")?,
            group: self.categorical(obj, "Group")?,
            order_date: date(obj, "OrderDate")?,
        })
    }

    /// Validates a `{ "data": [...] }` body. Any bad record rejects the batch.
    pub fn batch(&self, raw: &Value, max_records: usize) -> Result<Vec<PredictionRequest>, Rejection> {
        let data = raw
            .as_object()
            .and_then(|obj| obj.get("data"))
            .ok_or_else(|| Rejection::new("data is required"))?;
        let rows = data
            .as_array()
            .ok_or_else(|| Rejection::new("data must be an array"))?;
        if rows.is_empty() {
            return Err(Rejection::new("data must contain at least 1 record"));
        }
        if rows.len() > max_records {
            return Err(Rejection::new(format!(
                "data must contain at most {max_records} records, got {}",
                rows.len()
            )));
        }
        rows.iter()
            .enumerate()
            .map(|(i, row)| self.record(row).map_err(|e| e.at_index(i)))
            .collect()
    }

    fn categorical(&self, obj: &Map<String, Value>, field: &str) -> Result<String, Rejection> {
        let value = text(obj, field)?;
        match &self.catalog {
            Some(catalog) if !catalog.allows(field, &value) => Err(Rejection::new(format!(
                "{field} '{value}' is not a recognised option"
            ))),
            _ => Ok(value),
        }
    }
}

fn present<'a>(obj: &'a Map<String, Value>, field: &str) -> Result<&'a Value, Rejection> {
    match obj.get(field) {
        None | Some(Value::Null) => Err(Rejection::new(format!("{field} is required"))),
        Some(value) => Ok(value),
    }
}

fn text(obj: &Map<String, Value>, field: &str) -> Result<String, Rejection> {
    let value = present(obj, field)?
        .as_str()
        .ok_or_else(|| Rejection::new(format!("{field} must be a string")))?
        .trim();
    if value.is_empty() {
        return Err(Rejection::new(format!("{field} must not be empty")));
    }
    Ok(value.to_string())
}

fn quantity(obj: &Map<String, Value>, field: &str) -> Result<u32, Rejection> {
    let parsed = match present(obj, field)? {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() <= i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    match parsed {
        Some(n) if n < MIN_ORDER_QTY => Err(Rejection::new(format!(
            "{field} must be a positive integer"
        ))),
        Some(n) if n > MAX_ORDER_QTY => Err(Rejection::new(format!(
            "{field} must not exceed {MAX_ORDER_QTY}"
        ))),
        // Bounded by MAX_ORDER_QTY, so the conversion cannot fail.
        Some(n) => u32::try_from(n)
            .map_err(|_| Rejection::new(format!("{field} must not exceed {MAX_ORDER_QTY}"))),
        None => Err(Rejection::new(format!("{field} must be a positive integer"))),
    }
}

fn date(obj: &Map<String, Value>, field: &str) -> Result<NaiveDate, Rejection> {
    let value = text(obj, field)?;
    let invalid = || Rejection::new(format!("{field} must be a valid date in YYYY-MM-DD format"));
    if value.len() != 10 {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(&value, DATE_FORMAT).map_err(|_| invalid())
}
