//! JSON shapes consumed from the PI Web API.
//!
//! Only the fields this crate reads are modelled; everything else in the
//! server's responses is ignored by serde.

use serde::Deserialize;
use serde_json::Value;

/// Fields requested from the interpolated endpoint.
pub const SELECTED_FIELDS: &str = "Items.Timestamp;Items.Value";

/// Response of `GET {base}/attributes?path=...`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttributeDto {
    /// Display name of the attribute.
    pub name: String,
    /// Default unit abbreviation; absent or empty for unitless attributes.
    #[serde(default)]
    pub default_units_name_abbreviation: Option<String>,
    /// Hypermedia links.
    pub links: AttributeLinks,
}

/// The subset of attribute links that matter here.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttributeLinks {
    /// URL of the interpolated-data endpoint for this attribute's stream.
    pub interpolated_data: String,
}

/// Response of the interpolated-data endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InterpolatedDto {
    /// Samples in server order.
    #[serde(default)]
    pub items: Vec<ItemDto>,
    /// Server-reported failure instead of data.
    #[serde(default)]
    pub errors: Option<Value>,
}

/// One interpolated sample.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemDto {
    /// Raw timestamp string; see [`crate::timestamp`].
    pub timestamp: String,
    /// A number for real data; an object (e.g. `{"Name": "No Data", ...}`)
    /// or null for markers.
    #[serde(default)]
    pub value: Value,
    /// Per-item failure.
    #[serde(default)]
    pub errors: Option<Value>,
}

impl ItemDto {
    /// The numeric value, if this item carries one.
    pub fn numeric_value(&self) -> Option<f64> {
        self.value.as_f64()
    }
}

/// `Errors` fields count only when they actually hold something.
pub fn has_errors(errors: &Option<Value>) -> bool {
    errors.as_ref().is_some_and(is_error_payload)
}

fn is_error_payload(errors: &Value) -> bool {
    match errors {
        Value::Null => false,
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// Extract a top-level `Errors` payload from an arbitrary response body.
pub fn body_errors(body: &Value) -> Option<Value> {
    body.get("Errors").filter(|e| is_error_payload(e)).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn attribute_decodes_with_and_without_unit() {
        let dto: AttributeDto = serde_json::from_value(json!({
            "WebId": "abc",
            "Name": "Flow Rate",
            "DefaultUnitsNameAbbreviation": "m3/h",
            "Links": {"Self": "x", "InterpolatedData": "https://pi/streams/abc/interpolated"}
        }))
        .unwrap();
        assert_eq!(dto.name, "Flow Rate");
        assert_eq!(dto.default_units_name_abbreviation.as_deref(), Some("m3/h"));
        assert_eq!(
            dto.links.interpolated_data,
            "https://pi/streams/abc/interpolated"
        );

        let dto: AttributeDto = serde_json::from_value(json!({
            "Name": "State",
            "Links": {"InterpolatedData": "https://pi/streams/def/interpolated"}
        }))
        .unwrap();
        assert!(dto.default_units_name_abbreviation.is_none());
    }

    #[test]
    fn items_keep_non_numeric_values_as_json() {
        let dto: InterpolatedDto = serde_json::from_value(json!({
            "Items": [
                {"Timestamp": "2023-08-29T22:00:00Z", "Value": 1.5},
                {"Timestamp": "2023-08-29T23:00:00Z", "Value": {"Name": "No Data", "Value": 248, "IsSystem": true}},
                {"Timestamp": "2023-08-30T00:00:00Z"}
            ]
        }))
        .unwrap();
        let values: Vec<Option<f64>> = dto.items.iter().map(ItemDto::numeric_value).collect();
        assert_eq!(values, vec![Some(1.5), None, None]);
        assert!(!has_errors(&dto.errors));
    }

    #[test]
    fn empty_errors_do_not_count() {
        assert!(!has_errors(&Some(json!([]))));
        assert!(!has_errors(&Some(Value::Null)));
        assert!(has_errors(&Some(json!(["boom"]))));
        assert_eq!(body_errors(&json!({"Errors": ["nope"]})), Some(json!(["nope"])));
        assert_eq!(body_errors(&json!({"Errors": []})), None);
        assert_eq!(body_errors(&json!({"Name": "x"})), None);
    }
}
