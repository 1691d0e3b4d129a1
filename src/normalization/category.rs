/// Categories offered by the add-product form. The remote catalog accepts any
/// non-empty `product_type`, so this list only drives pickers and lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductCategory {
    Clothing,
    Electronics,
    HomeAndKitchen,
    Beauty,
    Furniture,
    Grocery,
    Watches,
    Other,
}

impl ProductCategory {
    pub const ALL: [ProductCategory; 8] = [
        ProductCategory::Clothing,
        ProductCategory::Electronics,
        ProductCategory::HomeAndKitchen,
        ProductCategory::Beauty,
        ProductCategory::Furniture,
        ProductCategory::Grocery,
        ProductCategory::Watches,
        ProductCategory::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ProductCategory::Clothing => "Clothing",
            ProductCategory::Electronics => "Electronics",
            ProductCategory::HomeAndKitchen => "Home & Kitchen",
            ProductCategory::Beauty => "Beauty",
            ProductCategory::Furniture => "Furniture",
            ProductCategory::Grocery => "Grocery",
            ProductCategory::Watches => "Watches",
            ProductCategory::Other => "Other",
        }
    }

    /// Lookup ignoring case and surrounding whitespace; `home and kitchen` also matches.
    pub fn from_label(raw: &str) -> Option<Self> {
        let wanted = raw.trim().to_ascii_lowercase().replace(" and ", " & ");
        Self::ALL
            .into_iter()
            .find(|c| c.label().to_ascii_lowercase() == wanted)
    }
}

impl std::fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_round_trip_through_lookup() {
        for c in ProductCategory::ALL {
            assert_eq!(ProductCategory::from_label(c.label()), Some(c));
        }
    }

    #[test]
    fn lookup_is_forgiving() {
        assert_eq!(
            ProductCategory::from_label("  home and KITCHEN "),
            Some(ProductCategory::HomeAndKitchen)
        );
        assert_eq!(ProductCategory::from_label("Toys"), None);
    }
}
