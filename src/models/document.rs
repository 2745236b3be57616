// src/models/document.rs
use crate::listview::{self, SortOrder};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Document {
    pub id: String,
    pub user_id: i32,
    pub name: String,
    pub doc_type: String,
    pub description: String,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DocumentListParams {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default, rename = "type")]
    pub doc_type: Option<String>,
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
pub struct CreateDocumentRequest {
    pub name: String,
    #[serde(default)]
    pub doc_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub size_bytes: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct BulkIdsRequest {
    pub ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DocumentListResponse {
    pub documents: Vec<Document>,
    pub page: usize,
    pub per_page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

#[derive(Debug, Serialize)]
pub struct BulkDeleteResponse {
    pub deleted: usize,
    pub missing: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Search matches name OR description; the type filter is exact with the
/// "all" sentinel.
pub fn filter_documents(documents: Vec<Document>, search: &str, doc_type: &str) -> Vec<Document> {
    documents
        .into_iter()
        .filter(|d| {
            listview::matches_search(search, &[&d.name, &d.description])
                && listview::matches_category(doc_type, &d.doc_type)
        })
        .collect()
}

/// Stable single-key sort; unknown keys fall back to name.
pub fn sort_documents(documents: &mut [Document], sort_by: &str, order: SortOrder) {
    documents.sort_by(|a, b| {
        let ord = match sort_by {
            "size" => a.size_bytes.cmp(&b.size_bytes),
            "type" => listview::cmp_str_ci(&a.doc_type, &b.doc_type),
            "date" | "created_at" => a.created_at.cmp(&b.created_at),
            _ => listview::cmp_str_ci(&a.name, &b.name),
        };
        order.apply(ord)
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, name: &str, doc_type: &str, description: &str) -> Document {
        Document {
            id: id.to_string(),
            user_id: 1,
            name: name.to_string(),
            doc_type: doc_type.to_string(),
            description: description.to_string(),
            size_bytes: 1024,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    /// 21-item sample mirroring a populated documents screen.
    fn fixture() -> Vec<Document> {
        vec![
            doc("doc-001", "Invoice_2024_001.pdf", "invoice", "January invoice"),
            doc("doc-002", "Contract_Acme_2024.pdf", "contract", "Master services agreement"),
            doc("doc-003", "Report_Q1_Sales.xlsx", "report", "Quarterly sales figures"),
            doc("doc-004", "Invoice_Acme_Corp_2024.pdf", "invoice", "Acme Corp billing"),
            doc("doc-005", "Supplier_Audit_Notes.docx", "report", "Audit walkthrough notes"),
            doc("doc-006", "Invoice_Office_Supplies.pdf", "invoice", "Office supplies order"),
            doc("doc-007", "NDA_Northwind.pdf", "contract", "Mutual NDA"),
            doc("doc-008", "Price_List_2024.xlsx", "other", "Current catalog pricing"),
            doc("doc-009", "Invoice_Consulting_Services.pdf", "invoice", "Consulting retainer"),
            doc("doc-010", "Meeting_Minutes_March.docx", "other", "Procurement sync notes"),
            doc("doc-011", "Delivery_Note_8841.pdf", "other", "Signed delivery note"),
            doc("doc-012", "Invoice_Maintenance_Contract.pdf", "invoice", "Annual maintenance"),
            doc("doc-013", "RFP_Logistics_Partner.docx", "other", "Request for proposal"),
            doc("doc-014", "Contract_Renewal_Globex.pdf", "contract", "Renewal terms"),
            doc("doc-015", "Report_Supplier_Ratings.xlsx", "report", "Scorecard export"),
            doc("doc-016", "Purchase_Order_5512.pdf", "other", "PO for raw materials"),
            doc("doc-017", "Warranty_Terms.pdf", "other", "Standard warranty"),
            doc("doc-018", "Report_Annual_2023.pdf", "report", "Year in review"),
            doc("doc-019", "Shipping_Manifest_0412.pdf", "other", "Container manifest"),
            doc("doc-020", "Contract_Initech_Draft.docx", "contract", "Draft for review"),
            doc("doc-021", "Onboarding_Checklist.pdf", "other", "New supplier onboarding"),
        ]
    }

    #[test]
    fn invoice_search_over_fixture_matches_exactly_five() {
        let filtered = filter_documents(fixture(), "invoice", listview::ALL);
        let mut names: Vec<String> = filtered.iter().map(|d| d.name.clone()).collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "Invoice_2024_001.pdf",
                "Invoice_Acme_Corp_2024.pdf",
                "Invoice_Consulting_Services.pdf",
                "Invoice_Maintenance_Contract.pdf",
                "Invoice_Office_Supplies.pdf",
            ]
        );
    }

    #[test]
    fn search_also_matches_description() {
        let filtered = filter_documents(fixture(), "billing", listview::ALL);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, "doc-004");
    }

    #[test]
    fn filter_is_idempotent() {
        let once = filter_documents(fixture(), "invoice", "invoice");
        let twice = filter_documents(once.clone(), "invoice", "invoice");
        assert_eq!(once.len(), twice.len());
        let ids_once: Vec<&str> = once.iter().map(|d| d.id.as_str()).collect();
        let ids_twice: Vec<&str> = twice.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids_once, ids_twice);
    }

    #[test]
    fn type_filter_is_exact_unless_all() {
        let contracts = filter_documents(fixture(), "", "contract");
        assert_eq!(contracts.len(), 4);
        assert!(contracts.iter().all(|d| d.doc_type == "contract"));

        let everything = filter_documents(fixture(), "", listview::ALL);
        assert_eq!(everything.len(), 21);
    }

    #[test]
    fn sort_by_name_is_case_insensitive_and_desc_flips() {
        let mut docs = vec![
            doc("a", "beta.pdf", "other", ""),
            doc("b", "Alpha.pdf", "other", ""),
            doc("c", "gamma.pdf", "other", ""),
        ];
        sort_documents(&mut docs, "name", SortOrder::Asc);
        assert_eq!(docs[0].name, "Alpha.pdf");
        sort_documents(&mut docs, "name", SortOrder::Desc);
        assert_eq!(docs[0].name, "gamma.pdf");
    }

    #[test]
    fn equal_sort_keys_retain_input_order() {
        let mut docs = vec![
            doc("first", "same.pdf", "other", ""),
            doc("second", "same.pdf", "other", ""),
            doc("third", "same.pdf", "other", ""),
        ];
        sort_documents(&mut docs, "name", SortOrder::Asc);
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }
}
