//! Canonical tool schemas and provider dialect renderings.
//!
//! One canonical descriptor feeds two provider-specific shapes:
//!
//! - the **declaration** dialect: `{"function_declarations": [...]}` with
//!   UPPERCASE primitive type tags
//! - the **function-call** dialect: `[{"type": "function", "function":
//!   {...}}]` with lowercase JSON-Schema type tags
//!
//! Moving between the two is a pure structural walk over the JSON tree that
//! retags exactly the six primitive types and copies everything else
//! unchanged, so translation is lossless and applying a direction twice is
//! a no-op.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue, json};

/// The six primitive parameter types shared by both dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    /// Free text.
    String,
    /// Floating-point number.
    Number,
    /// Whole number.
    Integer,
    /// True/false.
    Boolean,
    /// Ordered list with a single item schema.
    Array,
    /// Nested object with named properties.
    Object,
}

impl ParamType {
    /// Lowercase JSON-Schema tag.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }

    /// Uppercase declaration-dialect tag.
    #[must_use]
    pub const fn tag_upper(&self) -> &'static str {
        match self {
            Self::String => "STRING",
            Self::Number => "NUMBER",
            Self::Integer => "INTEGER",
            Self::Boolean => "BOOLEAN",
            Self::Array => "ARRAY",
            Self::Object => "OBJECT",
        }
    }

    /// Parses either casing of the six tags.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "string" => Some(Self::String),
            "number" => Some(Self::Number),
            "integer" => Some(Self::Integer),
            "boolean" => Some(Self::Boolean),
            "array" => Some(Self::Array),
            "object" => Some(Self::Object),
            _ => None,
        }
    }
}

/// The provider-specific shapes a tool schema can be rendered into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaDialect {
    /// Nested declaration envelope, uppercase type tags.
    Declaration,
    /// Flat function envelope, lowercase JSON-Schema type tags.
    FunctionCall,
}

/// Canonical parameter schema tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSchema {
    /// The parameter type.
    pub param_type: ParamType,
    /// Human-readable description for the model.
    pub description: Option<String>,
    /// Allowed values, for string enumerations.
    pub enum_values: Vec<String>,
    /// Named child schemas, for objects. Order is preserved.
    pub properties: Vec<(String, ParamSchema)>,
    /// Names of required properties, for objects.
    pub required: Vec<String>,
    /// Item schema, for arrays.
    pub items: Option<Box<ParamSchema>>,
}

impl ParamSchema {
    fn leaf(param_type: ParamType) -> Self {
        Self {
            param_type,
            description: None,
            enum_values: Vec::new(),
            properties: Vec::new(),
            required: Vec::new(),
            items: None,
        }
    }

    /// A string parameter.
    #[must_use]
    pub fn string() -> Self {
        Self::leaf(ParamType::String)
    }

    /// A number parameter.
    #[must_use]
    pub fn number() -> Self {
        Self::leaf(ParamType::Number)
    }

    /// An integer parameter.
    #[must_use]
    pub fn integer() -> Self {
        Self::leaf(ParamType::Integer)
    }

    /// A boolean parameter.
    #[must_use]
    pub fn boolean() -> Self {
        Self::leaf(ParamType::Boolean)
    }

    /// An object parameter with no properties yet.
    #[must_use]
    pub fn object() -> Self {
        Self::leaf(ParamType::Object)
    }

    /// An array parameter with the given item schema.
    #[must_use]
    pub fn array(items: ParamSchema) -> Self {
        let mut schema = Self::leaf(ParamType::Array);
        schema.items = Some(Box::new(items));
        schema
    }

    /// Sets the description.
    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Restricts a string parameter to the given values.
    #[must_use]
    pub fn one_of(mut self, values: &[&str]) -> Self {
        self.enum_values = values.iter().map(|v| (*v).to_string()).collect();
        self
    }

    /// Adds a named property to an object schema.
    #[must_use]
    pub fn property(mut self, name: impl Into<String>, schema: ParamSchema) -> Self {
        self.properties.push((name.into(), schema));
        self
    }

    /// Marks a property as required.
    #[must_use]
    pub fn require(mut self, name: impl Into<String>) -> Self {
        self.required.push(name.into());
        self
    }

    /// Renders the canonical (lowercase-tag) JSON form.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        let mut map = Map::new();
        map.insert("type".to_string(), json!(self.param_type.tag()));
        if let Some(description) = &self.description {
            map.insert("description".to_string(), json!(description));
        }
        if !self.enum_values.is_empty() {
            map.insert("enum".to_string(), json!(self.enum_values));
        }
        if !self.properties.is_empty() {
            let mut properties = Map::new();
            for (name, schema) in &self.properties {
                properties.insert(name.clone(), schema.to_json());
            }
            map.insert("properties".to_string(), JsonValue::Object(properties));
        }
        if !self.required.is_empty() {
            map.insert("required".to_string(), json!(self.required));
        }
        if let Some(items) = &self.items {
            map.insert("items".to_string(), items.to_json());
        }
        JsonValue::Object(map)
    }

    /// Parses a schema from either dialect's JSON form.
    ///
    /// Accepts both tag casings so a rendered schema can be read back
    /// regardless of which dialect produced it.
    #[must_use]
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        let obj = value.as_object()?;
        let param_type = ParamType::from_tag(obj.get("type")?.as_str()?)?;
        let mut schema = Self::leaf(param_type);

        if let Some(description) = obj.get("description").and_then(JsonValue::as_str) {
            schema.description = Some(description.to_string());
        }
        if let Some(values) = obj.get("enum").and_then(JsonValue::as_array) {
            schema.enum_values = values
                .iter()
                .filter_map(JsonValue::as_str)
                .map(str::to_string)
                .collect();
        }
        if let Some(properties) = obj.get("properties").and_then(JsonValue::as_object) {
            for (name, child) in properties {
                schema.properties.push((name.clone(), Self::from_json(child)?));
            }
        }
        if let Some(required) = obj.get("required").and_then(JsonValue::as_array) {
            schema.required = required
                .iter()
                .filter_map(JsonValue::as_str)
                .map(str::to_string)
                .collect();
        }
        if let Some(items) = obj.get("items") {
            schema.items = Some(Box::new(Self::from_json(items)?));
        }
        Some(schema)
    }
}

/// Canonical description of one tool: name, description, parameter schema.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description shown to the model.
    pub description: String,
    /// Canonical parameter schema.
    pub parameters: ParamSchema,
}

impl ToolDescriptor {
    /// Creates a descriptor.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ParamSchema,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Renders the declaration-dialect entry (uppercase type tags).
    #[must_use]
    pub fn declaration_json(&self) -> JsonValue {
        json!({
            "name": self.name,
            "description": self.description,
            "parameters": uppercase_type_tags(&self.parameters.to_json()),
        })
    }

    /// Renders the function-call-dialect entry (lowercase type tags).
    #[must_use]
    pub fn function_call_json(&self) -> JsonValue {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters.to_json(),
            },
        })
    }
}

/// Maps the six primitive tags to their uppercase form throughout a JSON
/// tree, copying everything else unchanged. Idempotent.
#[must_use]
pub fn uppercase_type_tags(value: &JsonValue) -> JsonValue {
    retag(value, |t| t.tag_upper())
}

/// Maps the six primitive tags to their lowercase form throughout a JSON
/// tree, copying everything else unchanged. Idempotent.
#[must_use]
pub fn lowercase_type_tags(value: &JsonValue) -> JsonValue {
    retag(value, |t| t.tag())
}

fn retag(value: &JsonValue, tag_of: fn(&ParamType) -> &'static str) -> JsonValue {
    match value {
        JsonValue::Object(obj) => {
            let mut out = Map::new();
            for (key, child) in obj {
                let mapped = if key == "type" {
                    match child.as_str().and_then(ParamType::from_tag) {
                        Some(param_type) => json!(tag_of(&param_type)),
                        None => child.clone(),
                    }
                } else {
                    retag(child, tag_of)
                };
                out.insert(key.clone(), mapped);
            }
            JsonValue::Object(out)
        }
        JsonValue::Array(items) => {
            JsonValue::Array(items.iter().map(|item| retag(item, tag_of)).collect())
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_schema() -> ParamSchema {
        ParamSchema::object()
            .property("query", ParamSchema::string().describe("Search query"))
            .property("limit", ParamSchema::integer())
            .property("tags", ParamSchema::array(ParamSchema::string()))
            .property(
                "filters",
                ParamSchema::object()
                    .property("strict", ParamSchema::boolean())
                    .property("score", ParamSchema::number()),
            )
            .require("query")
    }

    #[test]
    fn canonical_json_uses_lowercase_tags() {
        let rendered = sample_schema().to_json();
        assert_eq!(rendered["type"], "object");
        assert_eq!(rendered["properties"]["query"]["type"], "string");
        assert_eq!(rendered["required"][0], "query");
    }

    #[test]
    fn declaration_rendering_uppercases_every_leaf() {
        let descriptor = ToolDescriptor::new("web_search", "Search the web", sample_schema());
        let declared = descriptor.declaration_json();
        assert_eq!(declared["parameters"]["type"], "OBJECT");
        assert_eq!(declared["parameters"]["properties"]["query"]["type"], "STRING");
        assert_eq!(declared["parameters"]["properties"]["tags"]["items"]["type"], "STRING");
        assert_eq!(
            declared["parameters"]["properties"]["filters"]["properties"]["score"]["type"],
            "NUMBER"
        );
    }

    #[test]
    fn function_call_rendering_uses_envelope() {
        let descriptor = ToolDescriptor::new("web_search", "Search the web", sample_schema());
        let wrapped = descriptor.function_call_json();
        assert_eq!(wrapped["type"], "function");
        assert_eq!(wrapped["function"]["name"], "web_search");
        assert_eq!(wrapped["function"]["parameters"]["type"], "object");
    }

    #[test]
    fn envelope_type_tag_is_not_remapped() {
        // "function" is not one of the six primitive tags; the walk must
        // leave it alone even though it sits under a "type" key.
        let descriptor = ToolDescriptor::new("t", "d", ParamSchema::object());
        let wrapped = uppercase_type_tags(&descriptor.function_call_json());
        assert_eq!(wrapped["type"], "function");
        assert_eq!(wrapped["function"]["parameters"]["type"], "OBJECT");
    }

    #[test]
    fn retagging_is_idempotent() {
        let canonical = sample_schema().to_json();
        let once = uppercase_type_tags(&canonical);
        let twice = uppercase_type_tags(&once);
        assert_eq!(once, twice);

        let down_once = lowercase_type_tags(&once);
        let down_twice = lowercase_type_tags(&down_once);
        assert_eq!(down_once, down_twice);
        assert_eq!(down_once, canonical);
    }

    #[test]
    fn dialect_round_trip_preserves_names_and_types() {
        let schema = sample_schema();
        let declared = uppercase_type_tags(&schema.to_json());
        let recovered = ParamSchema::from_json(&declared).expect("parse back");

        // JSON object ordering is not part of the contract; the name set and
        // the per-leaf type classification are.
        let mut names: Vec<&str> = recovered.properties.iter().map(|(n, _)| n.as_str()).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["filters", "limit", "query", "tags"]);

        let property = |name: &str| {
            recovered
                .properties
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, s)| s)
                .expect("property present")
        };
        assert_eq!(property("query").param_type, ParamType::String);
        assert_eq!(property("limit").param_type, ParamType::Integer);
        assert_eq!(
            property("tags").items.as_ref().map(|i| i.param_type),
            Some(ParamType::String)
        );
        assert_eq!(
            property("filters")
                .properties
                .iter()
                .find(|(n, _)| n == "score")
                .map(|(_, s)| s.param_type),
            Some(ParamType::Number)
        );
        assert_eq!(recovered.required, vec!["query"]);
    }

    #[test]
    fn unknown_type_tag_survives_the_walk() {
        let value = json!({"type": "null", "nested": {"type": "STRING"}});
        let mapped = lowercase_type_tags(&value);
        assert_eq!(mapped["type"], "null");
        assert_eq!(mapped["nested"]["type"], "string");
    }
}
