// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Built-in demo tools for relay

mod location;
mod weather;

pub use location::LocationTool;
pub use weather::WeatherTool;

use super::ToolRegistry;

/// Register every demo tool
pub fn register_demo_tools(registry: &mut ToolRegistry) {
    registry.register(WeatherTool);
    registry.register(LocationTool);
}
