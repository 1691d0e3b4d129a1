pub mod api;
pub mod data;
pub mod database_ops;
pub mod error;
pub mod home;
pub mod logging;
pub mod media;
pub mod normalization;

pub mod util {
    pub mod env;
}

pub use error::{CatalogError, CatalogResult};
