// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Canned location tool

use async_trait::async_trait;

use crate::tools::{Tool, ToolArgs};

/// Reports a fixed current location
pub struct LocationTool;

#[async_trait]
impl Tool for LocationTool {
    fn name(&self) -> &str {
        "get_location"
    }

    fn description(&self) -> &str {
        "Get the user's current location"
    }

    async fn call(&self, _args: &ToolArgs) -> anyhow::Result<String> {
        Ok("beijing".to_string())
    }
}
