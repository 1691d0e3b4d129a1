// Wire models for the remote catalog API.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::data::NewProduct;
use crate::media::StagedImage;

/// One record of `GET public/get`.
///
/// The catalog is loose about numeric fields (numbers or numeric strings), so both
/// are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiProduct {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "string_or_null")]
    pub image: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub price: f64,
    pub product_name: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub product_type: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub tax: f64,
}

impl From<ApiProduct> for NewProduct {
    fn from(p: ApiProduct) -> Self {
        NewProduct {
            image: p.image,
            price: p.price,
            product_name: p.product_name,
            product_type: p.product_type,
            tax: p.tax,
        }
    }
}

/// Fields of a `POST public/add` submission. Numeric values travel as the text the
/// user entered.
#[derive(Debug, Clone)]
pub struct AddProductRequest {
    pub product_name: String,
    pub product_type: String,
    pub price: String,
    pub tax: String,
    pub image: Option<StagedImage>,
}

fn value_as_f64(v: &Value) -> Option<f64> {
    if let Some(n) = v.as_f64() {
        return Some(n);
    }
    if let Some(s) = v.as_str() {
        return s.trim().parse::<f64>().ok();
    }
    None
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    value_as_f64(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("expected a number, got {raw}")))
}

fn string_or_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
