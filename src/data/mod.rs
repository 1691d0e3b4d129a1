pub mod draft;
pub mod product;

pub use draft::{ImageSource, ProductDraft, ValidationError, CATEGORY_PLACEHOLDER};
pub use product::{NewProduct, Product};
