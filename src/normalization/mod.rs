pub mod category;
pub mod price;

pub use category::ProductCategory;
pub use price::format_price;
