use crate::data::Product;

pub const NO_CONNECTION_MESSAGE: &str = "No internet connection";
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong";
pub const LOCAL_READ_ERROR_MESSAGE: &str = "Failed to fetch products from db";

/// What the product list screen shows.
#[derive(Debug, Clone, PartialEq)]
pub enum UiState {
    Loading,
    Success(Vec<Product>),
    Error(String),
}

impl UiState {
    pub fn products(&self) -> Option<&[Product]> {
        match self {
            UiState::Success(rows) => Some(rows.as_slice()),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            UiState::Error(msg) => Some(msg.as_str()),
            _ => None,
        }
    }
}

/// Outcome of the most recent add-product submission.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AddItemState {
    #[default]
    Idle,
    Submitting,
    Added {
        product_name: String,
    },
    Failed(String),
}

impl AddItemState {
    pub fn is_submitting(&self) -> bool {
        matches!(self, AddItemState::Submitting)
    }
}
