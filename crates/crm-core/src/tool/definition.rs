//! Tool definition helpers
//!
//! Re-exports ToolDefinition from llm module and provides
//! helper functions for creating tool schemas.

use serde_json::{json, Value as JsonValue};

/// Tool definition sent to the model
///
/// Re-exported from llm module for convenience.
pub use crate::llm::ToolDefinition;

/// Helper functions for creating tool schemas
pub struct SchemaBuilder;

impl SchemaBuilder {
    /// Create an object schema with descriptions for properties
    ///
    /// # Arguments
    /// * `properties` - A list of tuples (name, type, description, required)
    ///
    /// # Example
    /// ```ignore
    /// let schema = SchemaBuilder::object_schema_with_descriptions(vec![
    ///     ("firstname", "string", "Contact's first name", true),
    ///     ("phone", "string", "Contact's phone number (optional)", false),
    /// ]);
    /// ```
    pub fn object_schema_with_descriptions(
        properties: Vec<(&str, &str, &str, bool)>,
    ) -> JsonValue {
        let props: serde_json::Map<String, JsonValue> = properties
            .iter()
            .map(|(name, type_str, desc, _)| {
                (
                    name.to_string(),
                    json!({"type": type_str, "description": desc}),
                )
            })
            .collect();

        let required: Vec<&str> = properties
            .iter()
            .filter(|(_, _, _, required)| *required)
            .map(|(name, _, _, _)| *name)
            .collect();

        json!({
            "type": "object",
            "properties": props,
            "required": required
        })
    }

    /// Create a string enum schema
    ///
    /// # Arguments
    /// * `enum_values` - List of allowed string values
    pub fn string_enum(enum_values: Vec<&str>) -> JsonValue {
        json!({
            "type": "string",
            "enum": enum_values
        })
    }

    /// Attach a description to a schema object
    pub fn describe(mut schema: JsonValue, description: &str) -> JsonValue {
        if let Some(obj) = schema.as_object_mut() {
            obj.insert("description".to_string(), json!(description));
        }
        schema
    }
}
