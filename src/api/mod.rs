// Remote catalog API: wire models and the HTTP client behind the `ProductApi` seam.

pub mod client;
pub mod models;

pub use client::{CatalogClient, ProductApi};
pub use models::{AddProductRequest, ApiProduct};
