//! Record and found-set types returned by layout operations.

use serde::Deserialize;
use serde_json::{Map, Value};

/// Field data as returned by the server: a JSON object keyed by field name.
pub type FieldData = Map<String, Value>;

/// A single record from a layout.
///
/// `F` is the field-data shape; callers with a known layout can supply
/// their own serde type, otherwise the raw JSON object is used.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FmRecord<F = FieldData> {
    /// The record ID, unique within the table.
    pub record_id: String,
    /// The modification ID, incremented on every edit.
    pub mod_id: String,
    /// The record's fields.
    pub field_data: F,
    /// Related records keyed by portal name.
    #[serde(default)]
    pub portal_data: Map<String, Value>,
}

/// Metadata about the found set a records response was drawn from.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataInfo {
    /// The database the records are from.
    pub database: String,
    /// The layout the records are from.
    pub layout: String,
    /// The table the records are from.
    pub table: String,
    /// The total number of records in the table.
    pub total_record_count: u64,
    /// The number of records in the found set.
    pub found_count: u64,
    /// The number of records in the returned set.
    pub returned_count: u64,
}

/// Payload shared by get, range, and find operations.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordsResponse<F = FieldData> {
    pub data: Vec<FmRecord<F>>,
    pub data_info: DataInfo,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_records_response() {
        let json = r#"{
            "dataInfo": {
                "database": "Inventory",
                "layout": "ProductDetails",
                "table": "Products",
                "totalRecordCount": 42,
                "foundCount": 2,
                "returnedCount": 2
            },
            "data": [
                {
                    "fieldData": {"Name": "Widget", "Quantity": 7},
                    "portalData": {"Transactions": [{"recordId": "9"}]},
                    "recordId": "5",
                    "modId": "3"
                },
                {
                    "fieldData": {"Name": "Gadget", "Quantity": 0},
                    "portalData": {},
                    "recordId": "6",
                    "modId": "0"
                }
            ]
        }"#;

        let parsed: RecordsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.data_info.found_count, 2);
        assert_eq!(parsed.data_info.layout, "ProductDetails");
        assert_eq!(parsed.data.len(), 2);
        assert_eq!(parsed.data[0].record_id, "5");
        assert_eq!(parsed.data[0].field_data["Name"], "Widget");
        assert!(parsed.data[0].portal_data.contains_key("Transactions"));
    }

    #[test]
    fn test_parse_record_with_typed_field_data() {
        #[derive(Debug, Deserialize)]
        struct Product {
            #[serde(rename = "Name")]
            name: String,
        }

        let json = r#"{"fieldData":{"Name":"Widget"},"recordId":"5","modId":"0"}"#;
        let record: FmRecord<Product> = serde_json::from_str(json).unwrap();
        assert_eq!(record.field_data.name, "Widget");
        assert!(record.portal_data.is_empty());
    }
}
