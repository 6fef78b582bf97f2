// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Keyword arguments passed to a tool

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{RelayError, Result};

use super::definition::ParamSpec;

/// Decoded keyword arguments of one tool call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArgs {
    values: Map<String, Value>,
}

impl ToolArgs {
    pub fn new(values: Map<String, Value>) -> Self {
        Self { values }
    }

    /// Fill declared defaults and check required and enumerated parameters
    pub fn prepare(mut values: Map<String, Value>, params: &[ParamSpec]) -> Result<Self> {
        for spec in params {
            match values.get(&spec.name) {
                Some(value) => {
                    if !spec.allowed.is_empty() && !spec.allowed.contains(value) {
                        return Err(RelayError::InvalidInput(format!(
                            "argument '{}' must be one of {}, got {}",
                            spec.name,
                            Value::Array(spec.allowed.clone()),
                            value
                        )));
                    }
                }
                None => match &spec.default {
                    Some(default) => {
                        values.insert(spec.name.clone(), default.clone());
                    }
                    None if spec.required => {
                        return Err(RelayError::InvalidInput(format!(
                            "missing required argument '{}'",
                            spec.name
                        )));
                    }
                    None => {}
                },
            }
        }
        Ok(Self { values })
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Required string argument
    pub fn str(&self, name: &str) -> Result<&str> {
        self.get(name)
            .ok_or_else(|| missing(name))?
            .as_str()
            .ok_or_else(|| wrong_type(name, "a string"))
    }

    /// Optional string argument
    pub fn opt_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Required integer argument
    pub fn i64(&self, name: &str) -> Result<i64> {
        self.get(name)
            .ok_or_else(|| missing(name))?
            .as_i64()
            .ok_or_else(|| wrong_type(name, "an integer"))
    }

    /// Required number argument
    pub fn f64(&self, name: &str) -> Result<f64> {
        self.get(name)
            .ok_or_else(|| missing(name))?
            .as_f64()
            .ok_or_else(|| wrong_type(name, "a number"))
    }

    /// Optional boolean argument
    pub fn bool_or(&self, name: &str, default: bool) -> bool {
        self.get(name).and_then(Value::as_bool).unwrap_or(default)
    }

    /// Decode all arguments into a typed struct
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.values.clone()))
            .map_err(|e| RelayError::InvalidInput(e.to_string()))
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }
}

fn missing(name: &str) -> RelayError {
    RelayError::InvalidInput(format!("missing required argument '{}'", name))
}

fn wrong_type(name: &str, expected: &str) -> RelayError {
    RelayError::InvalidInput(format!("argument '{}' must be {}", name, expected))
}
