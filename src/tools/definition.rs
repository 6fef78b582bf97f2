// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Tool definition types
//!
//! A tool declares its parameters as a list of [`ParamSpec`]s. The
//! [`SchemaBuilder`] turns that list into the JSON-schema object that is sent
//! to the model with every request allowing tools.

use serde_json::Value;

use crate::llm::provider::ToolSchema;

/// JSON type of a tool parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    /// Array with the given item type name
    Array(String),
    Object,
}

impl ParamType {
    fn type_name(&self) -> &str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Array(_) => "array",
            ParamType::Object => "object",
        }
    }
}

/// Declaration of one tool parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    pub param_type: ParamType,
    pub description: String,
    /// Whether the caller must supply the argument
    pub required: bool,
    /// Value used when an optional argument is missing
    pub default: Option<Value>,
    /// Allowed values (empty means unconstrained)
    pub allowed: Vec<Value>,
}

impl ParamSpec {
    /// A required parameter of the given type
    pub fn new(name: impl Into<String>, param_type: ParamType) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: String::new(),
            required: true,
            default: None,
            allowed: vec![],
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::String)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Integer)
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Number)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Boolean)
    }

    pub fn array(name: impl Into<String>, item_type: impl Into<String>) -> Self {
        Self::new(name, ParamType::Array(item_type.into()))
    }

    /// Set the description shown to the model
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Mark the parameter as optional without a default
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Mark the parameter as optional with a default value
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.required = false;
        self.default = Some(default.into());
        self
    }

    /// Restrict the parameter to a fixed set of values
    pub fn one_of<V: Into<Value>>(mut self, values: impl IntoIterator<Item = V>) -> Self {
        self.allowed = values.into_iter().map(Into::into).collect();
        self
    }

    /// JSON-schema property for this parameter
    pub fn property(&self) -> Value {
        let mut property = serde_json::Map::new();
        property.insert(
            "type".to_string(),
            Value::String(self.param_type.type_name().to_string()),
        );
        if !self.description.is_empty() {
            property.insert(
                "description".to_string(),
                Value::String(self.description.clone()),
            );
        }
        if let ParamType::Array(item_type) = &self.param_type {
            property.insert("items".to_string(), serde_json::json!({ "type": item_type }));
        }
        if !self.allowed.is_empty() {
            property.insert("enum".to_string(), Value::Array(self.allowed.clone()));
        }
        if let Some(default) = &self.default {
            property.insert("default".to_string(), default.clone());
        }
        Value::Object(property)
    }
}

/// Helper to create a tool parameter schema
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    properties: serde_json::Map<String, Value>,
    required: Vec<String>,
}

impl SchemaBuilder {
    /// Create a new schema builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a declared parameter
    pub fn param(mut self, spec: &ParamSpec) -> Self {
        self.properties.insert(spec.name.clone(), spec.property());
        if spec.required && !self.required.contains(&spec.name) {
            self.required.push(spec.name.clone());
        }
        self
    }

    /// Add a string property
    pub fn string(self, name: &str, description: &str, required: bool) -> Self {
        self.simple(ParamSpec::string(name), description, required)
    }

    /// Add an integer property
    pub fn integer(self, name: &str, description: &str, required: bool) -> Self {
        self.simple(ParamSpec::integer(name), description, required)
    }

    /// Add a boolean property
    pub fn boolean(self, name: &str, description: &str, required: bool) -> Self {
        self.simple(ParamSpec::boolean(name), description, required)
    }

    /// Add an array property
    pub fn array(self, name: &str, description: &str, item_type: &str, required: bool) -> Self {
        self.simple(ParamSpec::array(name, item_type), description, required)
    }

    fn simple(self, spec: ParamSpec, description: &str, required: bool) -> Self {
        let spec = spec.describe(description);
        let spec = if required { spec } else { spec.optional() };
        self.param(&spec)
    }

    /// Build the parameter schema object
    pub fn build(self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": self.properties,
            "required": self.required,
        })
    }
}

/// Build the schema of a tool from its description and parameter list
pub fn build_schema(name: &str, description: &str, params: &[ParamSpec]) -> ToolSchema {
    let parameters = params
        .iter()
        .fold(SchemaBuilder::new(), |builder, spec| builder.param(spec))
        .build();

    ToolSchema {
        name: name.to_string(),
        description: description.to_string(),
        parameters,
    }
}
