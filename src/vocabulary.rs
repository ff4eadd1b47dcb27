//! Canonical field vocabulary and the names each field travels under.
//!
//! Shape-specific extractors look keys up exactly; the introspection path
//! compares loosely (case, `_`, `-` and spaces ignored), which also catches the
//! PascalCase names AI field payloads use (`VendorName`, `InvoiceTotal`, ...).

use serde_json::{Map, Value};

/// Header fields of the canonical record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderField {
    VendorName,
    InvoiceNumber,
    Currency,
    IssueDate,
    DueDate,
    Subtotal,
    Tax,
    Total,
}

impl HeaderField {
    pub const ALL: [HeaderField; 8] = [
        HeaderField::VendorName,
        HeaderField::InvoiceNumber,
        HeaderField::Currency,
        HeaderField::IssueDate,
        HeaderField::DueDate,
        HeaderField::Subtotal,
        HeaderField::Tax,
        HeaderField::Total,
    ];

    pub fn name(self) -> &'static str {
        self.aliases()[0]
    }

    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            HeaderField::VendorName => &[
                "vendorName",
                "vendor_name",
                "vendor",
                "sellerName",
                "seller_name",
                "supplierName",
                "merchantName",
            ],
            HeaderField::InvoiceNumber => &[
                "invoiceNumber",
                "invoice_number",
                "invoiceId",
                "invoiceNo",
                "folio",
            ],
            HeaderField::Currency => &["currency", "currencyCode", "currency_code"],
            HeaderField::IssueDate => &[
                "invoiceDate",
                "invoice_date",
                "issueDate",
                "issue_date",
                "date",
            ],
            HeaderField::DueDate => &["dueDate", "due_date"],
            HeaderField::Subtotal => &["subtotal", "subTotal", "sub_total", "netAmount"],
            HeaderField::Tax => &["tax", "totalTax", "total_tax", "taxAmount", "tax_amount"],
            HeaderField::Total => &[
                "total",
                "invoiceTotal",
                "invoice_total",
                "totalAmount",
                "total_amount",
                "amountDue",
            ],
        }
    }
}

/// Per-line-item fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemField {
    Description,
    Amount,
    Quantity,
    UnitPrice,
    TaxCategory,
}

impl ItemField {
    pub fn name(self) -> &'static str {
        self.aliases()[0]
    }

    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            ItemField::Description => &["description", "desc", "concept", "itemDescription"],
            ItemField::Amount => &["amount", "lineTotal", "line_total", "totalPrice", "price"],
            ItemField::Quantity => &["quantity", "qty"],
            ItemField::UnitPrice => &["unitPrice", "unit_price"],
            ItemField::TaxCategory => &["taxCategory", "tax_category", "taxType", "category"],
        }
    }
}

/// Property holding the line-item collection.
pub const LINE_ITEM_KEYS: &[&str] = &["lineItems", "line_items", "items"];

/// Store-reported item counts; a mismatch with the extracted count means truncation.
pub const COUNT_HINT_KEYS: &[&str] = &[
    "lineItemCount",
    "line_item_count",
    "lineItemsCount",
    "itemCount",
    "item_count",
    "totalItems",
];

/// Objects that may wrap the whole invoice body.
pub const ENVELOPE_KEYS: &[&str] = &["invoiceData", "invoice_data", "invoice"];

/// Collection property exposed by projected-query wrappers.
pub const CHILDREN_KEYS: &[&str] = &["children", "Children"];

/// Lowercase and drop separators: `Vendor_Name` and `vendor-name` both become `vendorname`.
pub fn loose_key(key: &str) -> String {
    key.chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(|c| c.to_lowercase())
        .collect()
}

pub fn matches_loosely(key: &str, aliases: &[&str]) -> bool {
    let key = loose_key(key);
    aliases.iter().any(|a| loose_key(a) == key)
}

/// First alias present in `map` with a non-null value.
pub fn get_exact<'a>(map: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    aliases
        .iter()
        .filter_map(|a| map.get(*a))
        .find(|v| !v.is_null())
}

/// Like [`get_exact`] but case/separator-insensitive, in map order.
pub fn get_loose<'a>(map: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    get_exact(map, aliases).or_else(|| {
        map.iter()
            .find(|(k, v)| !v.is_null() && matches_loosely(k, aliases))
            .map(|(_, v)| v)
    })
}

pub fn children_of(map: &Map<String, Value>) -> Option<&Vec<Value>> {
    CHILDREN_KEYS
        .iter()
        .find_map(|k| map.get(*k))
        .and_then(|v| v.as_array())
}

/// True for `{"children": [...]}` wrapper nodes produced by projected queries.
pub fn is_children_wrapper(value: &Value) -> bool {
    value.as_object().and_then(children_of).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn loose_matching_ignores_case_and_separators() {
        assert!(matches_loosely("VendorName", HeaderField::VendorName.aliases()));
        assert!(matches_loosely("VENDOR-NAME", HeaderField::VendorName.aliases()));
        assert!(matches_loosely("InvoiceTotal", HeaderField::Total.aliases()));
        assert!(!matches_loosely("vendorAddress", HeaderField::VendorName.aliases()));
    }

    #[test]
    fn exact_lookup_skips_nulls() {
        let map = json!({ "vendorName": null, "vendor": "ACME" });
        let map = map.as_object().unwrap();
        assert_eq!(
            get_exact(map, HeaderField::VendorName.aliases()),
            Some(&json!("ACME"))
        );
    }

    #[test]
    fn wrapper_detection() {
        assert!(is_children_wrapper(&json!({ "children": [] })));
        assert!(is_children_wrapper(&json!({ "Children": [{ "a": 1 }] })));
        assert!(!is_children_wrapper(&json!({ "children": "x" })));
        assert!(!is_children_wrapper(&json!([1, 2])));
    }
}
