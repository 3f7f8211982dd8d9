//! Public browse filter over approved listings.

use serde::Deserialize;

use crate::product::{Category, Product, ProductStatus};

/// Optional narrowing of the public catalog.
///
/// Prices compare against the selling price. Search is a case-insensitive
/// substring match over title and description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProductFilter {
    pub category: Option<Category>,
    pub min_price: Option<u64>,
    pub max_price: Option<u64>,
    pub search: Option<String>,
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        if product.status() != ProductStatus::Approved {
            return false;
        }
        if let Some(category) = self.category {
            if product.category() != category {
                return false;
            }
        }
        if let Some(min) = self.min_price {
            if product.selling_price() < min {
                return false;
            }
        }
        if let Some(max) = self.max_price {
            if product.selling_price() > max {
                return false;
            }
        }
        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => {
                let needle = needle.to_lowercase();
                product.title().to_lowercase().contains(&needle)
                    || product.description().to_lowercase().contains(&needle)
            }
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::{ApproveProduct, Condition, ListProduct, ListingDetails, ProductCommand};
    use chrono::Utc;
    use setu_core::{Aggregate, ProductId, UserId};

    fn product(title: &str, category: Category, price: u64, approve: bool) -> Product {
        let product_id = ProductId::new();
        let mut p = Product::empty(product_id);
        p.execute(&ProductCommand::ListProduct(ListProduct {
            product_id,
            agency: UserId::new(),
            agency_name: "Police".to_string(),
            details: ListingDetails {
                title: title.to_string(),
                description: "recovered property".to_string(),
                category,
                original_price: price * 2,
                selling_price: price,
                quantity: 1,
                condition: Condition::Fair,
                images: vec![],
            },
            occurred_at: Utc::now(),
        }))
        .unwrap();
        if approve {
            p.execute(&ProductCommand::ApproveProduct(ApproveProduct {
                product_id,
                occurred_at: Utc::now(),
            }))
            .unwrap();
        }
        p
    }

    #[test]
    fn unapproved_never_matches() {
        let p = product("Bike", Category::Vehicles, 100, false);
        assert!(!ProductFilter::default().matches(&p));
    }

    #[test]
    fn price_bounds_are_inclusive() {
        let p = product("Sofa", Category::Furniture, 300, true);
        let f = ProductFilter {
            min_price: Some(300),
            max_price: Some(300),
            ..Default::default()
        };
        assert!(f.matches(&p));
        let f = ProductFilter {
            min_price: Some(301),
            ..Default::default()
        };
        assert!(!f.matches(&p));
    }

    #[test]
    fn search_is_case_insensitive_over_title_and_description() {
        let p = product("Gold Watch", Category::Others, 50, true);
        let by_title = ProductFilter {
            search: Some("gold".to_string()),
            ..Default::default()
        };
        let by_description = ProductFilter {
            search: Some("RECOVERED".to_string()),
            ..Default::default()
        };
        let miss = ProductFilter {
            search: Some("silver".to_string()),
            ..Default::default()
        };
        assert!(by_title.matches(&p));
        assert!(by_description.matches(&p));
        assert!(!miss.matches(&p));
    }

    #[test]
    fn category_filter() {
        let p = product("Drill", Category::Appliances, 80, true);
        let f = ProductFilter {
            category: Some(Category::Toys),
            ..Default::default()
        };
        assert!(!f.matches(&p));
    }
}
