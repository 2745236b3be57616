// src/models/supplier.rs
use crate::listview::{self, SortOrder};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::cmp::Ordering;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Supplier {
    pub id: String,
    pub user_id: i32,
    pub name: String,
    pub sector: String,
    pub contact_email: String,
    pub city: String,
    pub rating: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SupplierListParams {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub min_rating: Option<f64>,
    #[serde(default)]
    pub max_rating: Option<f64>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_order: Option<SortOrder>,
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub per_page: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSupplierRequest {
    pub name: String,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct SupplierListResponse {
    pub suppliers: Vec<Supplier>,
    pub page: usize,
    pub per_page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

/// Search matches name, contact email, or city; sector is exact with the
/// "all" sentinel; rating bounds are inclusive.
pub fn filter_suppliers(
    suppliers: Vec<Supplier>,
    search: &str,
    sector: &str,
    min_rating: Option<f64>,
    max_rating: Option<f64>,
) -> Vec<Supplier> {
    suppliers
        .into_iter()
        .filter(|s| {
            listview::matches_search(search, &[&s.name, &s.contact_email, &s.city])
                && listview::matches_category(sector, &s.sector)
                && listview::in_range(s.rating, min_rating, max_rating)
        })
        .collect()
}

pub fn sort_suppliers(suppliers: &mut [Supplier], sort_by: &str, order: SortOrder) {
    suppliers.sort_by(|a, b| {
        let ord = match sort_by {
            "rating" => a.rating.partial_cmp(&b.rating).unwrap_or(Ordering::Equal),
            "sector" => listview::cmp_str_ci(&a.sector, &b.sector),
            "city" => listview::cmp_str_ci(&a.city, &b.city),
            "date" | "created_at" => a.created_at.cmp(&b.created_at),
            _ => listview::cmp_str_ci(&a.name, &b.name),
        };
        order.apply(ord)
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn supplier(id: &str, name: &str, sector: &str, city: &str, rating: f64) -> Supplier {
        Supplier {
            id: id.to_string(),
            user_id: 1,
            name: name.to_string(),
            sector: sector.to_string(),
            contact_email: format!("contact@{}.example.com", id),
            city: city.to_string(),
            rating,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn fixture() -> Vec<Supplier> {
        vec![
            supplier("sup-001", "Acme Industrial", "manufacturing", "Lyon", 4.5),
            supplier("sup-002", "Globex Logistics", "logistics", "Rotterdam", 3.0),
            supplier("sup-003", "Initech Services", "services", "Berlin", 2.4),
            supplier("sup-004", "Northwind Foods", "food", "Copenhagen", 5.0),
            supplier("sup-005", "Stark Metalworks", "manufacturing", "Gdansk", 3.9),
        ]
    }

    #[test]
    fn rating_range_is_inclusive_on_both_bounds() {
        let filtered = filter_suppliers(fixture(), "", listview::ALL, Some(3.0), Some(4.5));
        let ids: Vec<&str> = filtered.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["sup-001", "sup-002", "sup-005"]);
    }

    #[test]
    fn sector_sentinel_bypasses_and_exact_matches() {
        assert_eq!(filter_suppliers(fixture(), "", "all", None, None).len(), 5);
        let manufacturing = filter_suppliers(fixture(), "", "manufacturing", None, None);
        assert_eq!(manufacturing.len(), 2);
    }

    #[test]
    fn search_spans_name_email_and_city() {
        assert_eq!(filter_suppliers(fixture(), "globex", "all", None, None).len(), 1);
        assert_eq!(filter_suppliers(fixture(), "sup-003", "all", None, None).len(), 1);
        assert_eq!(filter_suppliers(fixture(), "LYON", "all", None, None).len(), 1);
    }

    #[test]
    fn sort_by_rating_desc_puts_best_first() {
        let mut suppliers = fixture();
        sort_suppliers(&mut suppliers, "rating", SortOrder::Desc);
        assert_eq!(suppliers[0].id, "sup-004");
        assert_eq!(suppliers.last().unwrap().id, "sup-003");
    }

    #[test]
    fn combined_filters_compose() {
        let filtered = filter_suppliers(fixture(), "metal", "manufacturing", Some(3.0), None);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, "sup-005");
    }
}
