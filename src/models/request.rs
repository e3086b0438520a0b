//! Request-side shapes: find queries, sort orders, portal ranges, and
//! script execution directives.

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// One entry of a find request: field criteria, optionally inverted.
///
/// The wire format flattens the criteria into the object itself and, for
/// omit entries, adds `"omit": "true"` (a string, per the server's
/// conventions).
#[derive(Debug, Clone, Default, Serialize)]
pub struct FindQuery {
    #[serde(flatten)]
    fields: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "is_false", serialize_with = "omit_as_string")]
    omit: bool,
}

impl FindQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field criterion, e.g. `("Quantity", "<10")`.
    pub fn field(mut self, name: impl Into<String>, criterion: impl Into<String>) -> Self {
        self.fields.insert(name.into(), criterion.into());
        self
    }

    /// Mark this entry as an omit request: matching records are removed
    /// from the found set instead of added.
    pub fn omit(mut self) -> Self {
        self.omit = true;
        self
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn omit_as_string<S: Serializer>(_: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str("true")
}

/// Sort directive for range and find operations.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SortOrder {
    pub field_name: String,
    pub sort_order: SortDirection,
}

impl SortOrder {
    pub fn ascend(field_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            sort_order: SortDirection::Ascend,
        }
    }

    pub fn descend(field_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            sort_order: SortDirection::Descend,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascend,
    Descend,
}

/// A window onto one portal's related records.
#[derive(Debug, Clone)]
pub struct PortalRange {
    pub name: String,
    pub offset: Option<u32>,
    pub limit: Option<u32>,
}

impl PortalRange {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            offset: None,
            limit: None,
        }
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Scripts to run around a record operation.
///
/// The Data API lets a call name up to three scripts: one before the
/// request, one after the request but before the sort, and one after
/// everything. Each takes a single optional string parameter.
#[derive(Debug, Clone, Default)]
pub struct ScriptExecution {
    pub script: Option<ScriptCall>,
    pub prerequest: Option<ScriptCall>,
    pub presort: Option<ScriptCall>,
}

#[derive(Debug, Clone)]
pub struct ScriptCall {
    pub name: String,
    pub param: Option<String>,
}

impl ScriptCall {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param: None,
        }
    }

    pub fn param(mut self, param: impl Into<String>) -> Self {
        self.param = Some(param.into());
        self
    }
}

impl ScriptExecution {
    /// Run `script` after the operation completes.
    pub fn after(script: ScriptCall) -> Self {
        Self {
            script: Some(script),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.script.is_none() && self.prerequest.is_none() && self.presort.is_none()
    }

    /// Project into query-string parameters, for operations whose script
    /// directives travel in the URL.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        let mut push = |key: &str, call: &Option<ScriptCall>| {
            if let Some(call) = call {
                pairs.push((key.to_string(), call.name.clone()));
                if let Some(ref param) = call.param {
                    pairs.push((format!("{key}.param"), param.clone()));
                }
            }
        };
        push("script", &self.script);
        push("script.prerequest", &self.prerequest);
        push("script.presort", &self.presort);
        pairs
    }

    /// Merge into a JSON request body, for operations whose script
    /// directives travel with the payload.
    pub fn apply_to_body(&self, body: &mut Map<String, Value>) {
        let mut set = |key: &str, call: &Option<ScriptCall>| {
            if let Some(call) = call {
                body.insert(key.to_string(), Value::String(call.name.clone()));
                if let Some(ref param) = call.param {
                    body.insert(format!("{key}.param"), Value::String(param.clone()));
                }
            }
        };
        set("script", &self.script);
        set("script.prerequest", &self.prerequest);
        set("script.presort", &self.presort);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_query_serializes_flat_fields() {
        let query = FindQuery::new().field("Name", "Widget").field("Quantity", "<10");
        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(json["Name"], "Widget");
        assert_eq!(json["Quantity"], "<10");
        assert!(json.get("omit").is_none());
    }

    #[test]
    fn test_find_query_omit_is_the_string_true() {
        let query = FindQuery::new().field("Name", "Widget").omit();
        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(json["omit"], "true");
    }

    #[test]
    fn test_sort_order_wire_casing() {
        let json = serde_json::to_value(SortOrder::descend("Quantity")).unwrap();
        assert_eq!(json["fieldName"], "Quantity");
        assert_eq!(json["sortOrder"], "descend");
    }

    #[test]
    fn test_script_execution_query_pairs() {
        let scripts = ScriptExecution {
            script: Some(ScriptCall::new("Log").param("done")),
            prerequest: Some(ScriptCall::new("Prepare")),
            presort: None,
        };
        let pairs = scripts.to_query_pairs();
        assert_eq!(
            pairs,
            vec![
                ("script".to_string(), "Log".to_string()),
                ("script.param".to_string(), "done".to_string()),
                ("script.prerequest".to_string(), "Prepare".to_string()),
            ]
        );
    }

    #[test]
    fn test_script_execution_body_keys() {
        let scripts = ScriptExecution::after(ScriptCall::new("Log").param("done"));
        let mut body = Map::new();
        scripts.apply_to_body(&mut body);
        assert_eq!(body["script"], "Log");
        assert_eq!(body["script.param"], "done");
        assert!(!body.contains_key("script.prerequest"));
    }
}
