use serde::{Deserialize, Serialize};

/// A cached catalog row. `id` is assigned by the local store; `product_name` is unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub image: String,
    pub price: f64,
    pub product_name: String,
    pub product_type: String,
    pub tax: f64,
}

/// Row payload before the store assigns an id. Upserts are keyed by `product_name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub image: String,
    pub price: f64,
    pub product_name: String,
    pub product_type: String,
    pub tax: f64,
}

impl NewProduct {
    pub fn new(
        product_name: impl Into<String>,
        product_type: impl Into<String>,
        price: f64,
        tax: f64,
    ) -> Self {
        Self {
            image: String::new(),
            price,
            product_name: product_name.into(),
            product_type: product_type.into(),
            tax,
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }
}

impl Product {
    /// Case-insensitive substring match on the product name.
    pub fn name_contains(&self, needle_lower: &str) -> bool {
        self.product_name.to_lowercase().contains(needle_lower)
    }
}
