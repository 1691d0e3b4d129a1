use std::path::PathBuf;

use thiserror::Error;

/// Label the category picker shows before a choice is made.
pub const CATEGORY_PLACEHOLDER: &str = "Select Product Category";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please provide all product details")]
    MissingFields,
    #[error("Tax should be digits only!")]
    TaxNotNumeric,
    #[error("Price should be digits only!")]
    PriceNotNumeric,
}

/// A local image chosen for upload. `content_type` is whatever the picker reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSource {
    pub path: PathBuf,
    pub content_type: Option<String>,
}

impl ImageSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Raw form input for a new catalog entry. Numeric fields stay textual until submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductDraft {
    pub product_name: String,
    pub product_type: String,
    pub price: String,
    pub tax: String,
    pub image: Option<ImageSource>,
}

impl ProductDraft {
    pub fn new(
        product_name: impl Into<String>,
        product_type: impl Into<String>,
        price: impl Into<String>,
        tax: impl Into<String>,
    ) -> Self {
        Self {
            product_name: product_name.into(),
            product_type: product_type.into(),
            price: price.into(),
            tax: tax.into(),
            image: None,
        }
    }

    pub fn with_image(mut self, image: ImageSource) -> Self {
        self.image = Some(image);
        self
    }

    /// Checks run in the order the form reports them: completeness, then tax, then price.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let category = self.product_type.trim();
        if self.product_name.trim().is_empty()
            || self.price.trim().is_empty()
            || self.tax.trim().is_empty()
            || category.is_empty()
            || category == CATEGORY_PLACEHOLDER
        {
            return Err(ValidationError::MissingFields);
        }
        if !is_unsigned_decimal(self.tax.trim()) {
            return Err(ValidationError::TaxNotNumeric);
        }
        if !is_unsigned_decimal(self.price.trim()) {
            return Err(ValidationError::PriceNotNumeric);
        }
        Ok(())
    }
}

/// `123` or `123.45`; no sign, no exponent, no thousands separators.
fn is_unsigned_decimal(raw: &str) -> bool {
    let (whole, frac) = match raw.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (raw, None),
    };
    let digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    digits(whole) && frac.map_or(true, digits)
}
