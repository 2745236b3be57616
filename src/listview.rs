// src/listview.rs
//! List-screen state shared by the documents and suppliers endpoints:
//! text/category/range filtering, stable sorting, pagination, and selection.
//!
//! Everything here is a pure function of (collection, state) so the grids stay
//! deterministic: the same fetch plus the same filter state always renders the
//! same page.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Sentinel value that disables a category filter.
pub const ALL: &str = "all";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn apply(self, ord: Ordering) -> Ordering {
        match self {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    }
}

/// Case-insensitive substring match ORed across `fields`.
/// An empty query matches everything.
pub fn matches_search(query: &str, fields: &[&str]) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    fields.iter().any(|f| f.to_lowercase().contains(&needle))
}

/// Exact-match category filter. The "all" sentinel (or an absent value) passes
/// every item through.
pub fn matches_category(filter: &str, value: &str) -> bool {
    filter.is_empty() || filter == ALL || filter == value
}

/// Inclusive `[min, max]` range check; open bounds always pass.
pub fn in_range(value: f64, min: Option<f64>, max: Option<f64>) -> bool {
    if let Some(lo) = min {
        if value < lo {
            return false;
        }
    }
    if let Some(hi) = max {
        if value > hi {
            return false;
        }
    }
    true
}

/// Case-insensitive comparison for string sort keys.
pub fn cmp_str_ci(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

/// Page window over the filtered collection.
///
/// Invariant: `1 <= current_page <= total_pages` and `total_pages >= 1`, even
/// for an empty collection. Recomputed synchronously on every filter or
/// collection change so a shrinking result set can never leave the view past
/// the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub current_page: usize,
    pub total_pages: usize,
    pub items_per_page: usize,
    pub total_items: usize,
}

impl Pagination {
    pub fn clamped(requested_page: usize, items_per_page: usize, total_items: usize) -> Self {
        let per_page = items_per_page.max(1);
        let total_pages = total_items.div_ceil(per_page).max(1);
        let current_page = requested_page.max(1).min(total_pages);
        Self {
            current_page,
            total_pages,
            items_per_page: per_page,
            total_items,
        }
    }

    /// The slice `[(page-1)*per_page, page*per_page)` of the sorted collection.
    pub fn page_slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = (self.current_page - 1) * self.items_per_page;
        if start >= items.len() {
            return &[];
        }
        let end = (start + self.items_per_page).min(items.len());
        &items[start..end]
    }
}

/// Row selection for bulk actions. `selected_ids` is semantically a set; order
/// and duplicates carry no meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    pub selected_ids: Vec<String>,
    pub is_all_selected: bool,
}

impl SelectionState {
    /// Add or remove a single id. Always drops the all-selected flag, even
    /// when the toggle happens to complete the page: select-all only goes
    /// through `select_all`.
    pub fn toggle(&mut self, id: &str, selected: bool) {
        if selected {
            if !self.selected_ids.iter().any(|s| s == id) {
                self.selected_ids.push(id.to_string());
            }
        } else {
            self.selected_ids.retain(|s| s != id);
        }
        self.is_all_selected = false;
    }

    /// Select exactly the ids visible on the current page, or clear everything.
    pub fn select_all(&mut self, visible_ids: &[String], selected: bool) {
        if selected {
            self.selected_ids = visible_ids.to_vec();
            self.is_all_selected = true;
        } else {
            self.selected_ids.clear();
            self.is_all_selected = false;
        }
    }

    /// The selection as a derived view over the live collection: ids that no
    /// longer resolve are silently dropped.
    pub fn resolve<'a, T>(&self, items: &'a [T], id_of: impl Fn(&T) -> &str) -> Vec<&'a T> {
        items
            .iter()
            .filter(|item| self.selected_ids.iter().any(|s| s == id_of(item)))
            .collect()
    }

    /// Re-validate after a collection refresh.
    pub fn retain_present(&mut self, present_ids: &[String]) {
        self.selected_ids.retain(|s| present_ids.contains(s));
        if self.selected_ids.is_empty() {
            self.is_all_selected = false;
        }
    }

    pub fn clear(&mut self) {
        self.selected_ids.clear();
        self.is_all_selected = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_is_case_insensitive_across_fields() {
        assert!(matches_search("INVOICE", &["Invoice_2024_001.pdf", ""]));
        assert!(matches_search("acme", &["report.pdf", "Quarterly report for ACME Corp"]));
        assert!(!matches_search("invoice", &["Contract_2024.pdf", "signed contract"]));
        assert!(matches_search("", &["anything"]));
        assert!(matches_search("   ", &["anything"]));
    }

    #[test]
    fn search_filter_is_idempotent() {
        let items = vec!["Invoice_A", "contract_B", "invoice_c", "Report_D"];
        let once: Vec<_> = items
            .iter()
            .filter(|s| matches_search("invoice", &[s]))
            .cloned()
            .collect();
        let twice: Vec<_> = once
            .iter()
            .filter(|s| matches_search("invoice", &[s]))
            .cloned()
            .collect();
        assert_eq!(once, twice);
        assert_eq!(once, vec!["Invoice_A", "invoice_c"]);
    }

    #[test]
    fn category_all_sentinel_bypasses_filter() {
        assert!(matches_category("all", "contract"));
        assert!(matches_category("", "contract"));
        assert!(matches_category("contract", "contract"));
        assert!(!matches_category("invoice", "contract"));
    }

    #[test]
    fn range_bounds_are_inclusive() {
        assert!(in_range(3.0, Some(3.0), Some(5.0)));
        assert!(in_range(5.0, Some(3.0), Some(5.0)));
        assert!(!in_range(2.9, Some(3.0), Some(5.0)));
        assert!(!in_range(5.1, Some(3.0), Some(5.0)));
        assert!(in_range(42.0, None, None));
    }

    #[test]
    fn pagination_clamps_requested_page_into_bounds() {
        let p = Pagination::clamped(3, 20, 21);
        assert_eq!(p.total_pages, 2);
        assert_eq!(p.current_page, 2);

        let p = Pagination::clamped(0, 20, 21);
        assert_eq!(p.current_page, 1);
    }

    #[test]
    fn per_page_change_resets_out_of_range_page() {
        // On page 2 of 21 items at 20/page, switching to 50/page collapses to one page.
        let p = Pagination::clamped(2, 50, 21);
        assert_eq!(p.total_pages, 1);
        assert_eq!(p.current_page, 1);
    }

    #[test]
    fn empty_collection_still_has_one_page() {
        let p = Pagination::clamped(5, 20, 0);
        assert_eq!(p.total_pages, 1);
        assert_eq!(p.current_page, 1);
        let items: Vec<u32> = vec![];
        assert!(p.page_slice(&items).is_empty());
    }

    #[test]
    fn page_slice_returns_the_requested_window() {
        let items: Vec<u32> = (0..21).collect();
        let p = Pagination::clamped(2, 20, items.len());
        assert_eq!(p.page_slice(&items), &[20]);

        let p = Pagination::clamped(1, 20, items.len());
        assert_eq!(p.page_slice(&items).len(), 20);
    }

    #[test]
    fn toggle_roundtrip_leaves_selection_empty() {
        let mut sel = SelectionState::default();
        sel.toggle("doc-001", true);
        assert_eq!(sel.selected_ids, vec!["doc-001".to_string()]);
        sel.toggle("doc-001", false);
        assert!(sel.selected_ids.is_empty());
        assert!(!sel.is_all_selected);
    }

    #[test]
    fn toggle_is_a_set_operation() {
        let mut sel = SelectionState::default();
        sel.toggle("doc-001", true);
        sel.toggle("doc-001", true);
        assert_eq!(sel.selected_ids.len(), 1);
    }

    #[test]
    fn toggling_every_row_never_sets_all_selected() {
        let visible = vec!["a".to_string(), "b".to_string()];
        let mut sel = SelectionState::default();
        sel.select_all(&visible, true);
        assert!(sel.is_all_selected);
        // Re-toggling an already-selected row drops the flag even though the
        // selection is still complete.
        sel.toggle("a", true);
        assert!(!sel.is_all_selected);
        assert_eq!(sel.selected_ids.len(), 2);
    }

    #[test]
    fn select_all_roundtrip_clears_everything() {
        let visible: Vec<String> = (0..100).map(|i| format!("id-{i}")).collect();
        let mut sel = SelectionState::default();
        sel.select_all(&visible, true);
        assert_eq!(sel.selected_ids.len(), 100);
        assert!(sel.is_all_selected);
        sel.select_all(&visible, false);
        assert!(sel.selected_ids.is_empty());
        assert!(!sel.is_all_selected);
    }

    #[test]
    fn resolve_drops_ids_missing_from_the_collection() {
        let items = vec![("doc-1", "a"), ("doc-2", "b")];
        let mut sel = SelectionState::default();
        sel.toggle("doc-1", true);
        sel.toggle("doc-gone", true);
        let resolved = sel.resolve(&items, |i| i.0);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].0, "doc-1");
    }

    #[test]
    fn retain_present_revalidates_after_refresh() {
        let mut sel = SelectionState::default();
        sel.select_all(&["a".to_string(), "b".to_string()], true);
        sel.retain_present(&["b".to_string()]);
        assert_eq!(sel.selected_ids, vec!["b".to_string()]);
        sel.retain_present(&[]);
        assert!(sel.selected_ids.is_empty());
        assert!(!sel.is_all_selected);
    }

    #[test]
    fn sort_order_desc_reverses() {
        let mut values = vec!["b", "A", "c"];
        values.sort_by(|a, b| SortOrder::Desc.apply(cmp_str_ci(a, b)));
        assert_eq!(values, vec!["c", "b", "A"]);
    }
}
