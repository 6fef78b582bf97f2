// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Canned weather report tool

use async_trait::async_trait;

use crate::tools::{ParamSpec, Tool, ToolArgs};

/// Reports a fixed forecast for any location
pub struct WeatherTool;

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        "get_current_weather"
    }

    fn description(&self) -> &str {
        "Get the current weather"
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::string("location")
                .describe("The city and state, e.g. San Francisco, CA"),
            ParamSpec::string("format")
                .describe("The temperature unit to use. Infer this from the user's location.")
                .with_default("celsius")
                .one_of(["celsius", "fahrenheit"]),
        ]
    }

    async fn call(&self, args: &ToolArgs) -> anyhow::Result<String> {
        let location = args.str("location")?;
        let range = match args.str("format")? {
            "fahrenheit" => "68~77°F",
            _ => "20~25°C",
        };
        Ok(format!("{}: sunny, {}", location, range))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::message::ToolCall;
    use crate::tools::ToolRegistry;

    #[tokio::test]
    async fn test_weather_defaults_to_celsius() {
        let mut registry = ToolRegistry::new();
        registry.register(WeatherTool);
        let result = registry
            .invoke(&ToolCall::new("c1", "get_current_weather", r#"{"location":"Boston, MA"}"#))
            .await;
        assert_eq!(result.output_text(), "Boston, MA: sunny, 20~25°C");
    }

    #[tokio::test]
    async fn test_weather_fahrenheit() {
        let mut registry = ToolRegistry::new();
        registry.register(WeatherTool);
        let result = registry
            .invoke(&ToolCall::new(
                "c1",
                "get_current_weather",
                r#"{"location":"Austin, TX","format":"fahrenheit"}"#,
            ))
            .await;
        assert!(result.output_text().ends_with("68~77°F"));
    }

    #[test]
    fn test_weather_schema_requires_location_only() {
        let mut registry = ToolRegistry::new();
        registry.register(WeatherTool);
        let schema = &registry.schemas()[0];
        assert_eq!(schema.parameters["required"], serde_json::json!(["location"]));
    }
}
