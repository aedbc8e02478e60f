//! Tool definitions advertised to the reasoning model.

use serde::{Deserialize, Serialize};

/// Parameter specification for a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    pub description: String,
    pub required: bool,
    /// JSON schema type (`string`, `integer`, `number`, `array`, `object`).
    pub param_type: String,
    /// Full JSON schema overriding `param_type` for structured parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<serde_json::Value>,
}

impl ToolParameter {
    pub fn new(name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required,
            param_type: "string".to_string(),
            schema: None,
        }
    }

    pub fn with_type(mut self, param_type: impl Into<String>) -> Self {
        self.param_type = param_type.into();
        self
    }

    pub fn with_schema(mut self, schema: serde_json::Value) -> Self {
        self.schema = Some(schema);
        self
    }

    fn json_schema(&self) -> serde_json::Value {
        let mut schema = self
            .schema
            .clone()
            .unwrap_or_else(|| serde_json::json!({ "type": self.param_type }));
        if let serde_json::Value::Object(map) = &mut schema {
            map.entry("description")
                .or_insert_with(|| serde_json::Value::String(self.description.clone()));
        }
        schema
    }
}

/// Definition of a tool that can be called by the planner's model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ToolParameter>,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, param: ToolParameter) -> Self {
        self.parameters.push(param);
        self
    }

    /// JSON schema of the argument object.
    pub fn input_schema(&self) -> serde_json::Value {
        let properties: serde_json::Map<String, serde_json::Value> = self
            .parameters
            .iter()
            .map(|p| (p.name.clone(), p.json_schema()))
            .collect();
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();
        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// OpenAI-style function tool object.
    pub fn to_api_tool(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.input_schema(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_schema_lists_required_parameters() {
        let def = ToolDefinition::new("web_search", "Search the web")
            .with_parameter(ToolParameter::new("query", "The query", true))
            .with_parameter(ToolParameter::new("limit", "Max hits", false).with_type("integer"));
        let schema = def.input_schema();
        assert_eq!(schema["required"], serde_json::json!(["query"]));
        assert_eq!(schema["properties"]["limit"]["type"], "integer");
        assert_eq!(schema["properties"]["query"]["description"], "The query");
    }

    #[test]
    fn test_custom_schema_keeps_its_own_description() {
        let param = ToolParameter::new("units", "fallback", true).with_schema(
            serde_json::json!({"type": "array", "description": "ordered units"}),
        );
        let def = ToolDefinition::new("plan_structure", "Plan").with_parameter(param);
        let api = def.to_api_tool();
        assert_eq!(api["type"], "function");
        assert_eq!(
            api["function"]["parameters"]["properties"]["units"]["description"],
            "ordered units"
        );
    }
}
