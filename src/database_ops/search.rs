use crate::data::Product;

/// Products whose name contains `query`, ignoring case. Input order is preserved.
/// Whitespace in the query is significant; only the empty query matches everything.
pub fn filter_by_name(products: &[Product], query: &str) -> Vec<Product> {
    let needle = query.to_lowercase();
    if needle.is_empty() {
        return products.to_vec();
    }
    products
        .iter()
        .filter(|p| p.name_contains(&needle))
        .cloned()
        .collect()
}
