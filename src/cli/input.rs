// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Line input with a toggled multi-line mode
//!
//! A line consisting of `'''` opens multi-line mode; the following lines are
//! buffered until the next `'''`, and are then sent as one message.

/// Marker that opens and closes multi-line mode
pub const MULTILINE_MARKER: &str = "'''";

/// Collects typed lines into messages
#[derive(Debug, Default)]
pub struct MultilineInput {
    buffer: Vec<String>,
    multiline: bool,
}

impl MultilineInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether lines are currently being buffered
    pub fn is_multiline(&self) -> bool {
        self.multiline
    }

    /// Prompt to show before the next line
    pub fn prompt(&self) -> &'static str {
        if self.multiline {
            "... "
        } else {
            "user: "
        }
    }

    /// Feed one line; returns a message once one is complete.
    ///
    /// Blank single lines and empty multi-line blocks produce nothing.
    pub fn feed(&mut self, line: &str) -> Option<String> {
        let line = line.trim_end_matches(['\r', '\n']);

        if line.trim() == MULTILINE_MARKER {
            if !self.multiline {
                self.multiline = true;
                return None;
            }
            self.multiline = false;
            let message = std::mem::take(&mut self.buffer).join("\n");
            return (!message.trim().is_empty()).then_some(message);
        }

        if self.multiline {
            self.buffer.push(line.to_string());
            return None;
        }

        (!line.trim().is_empty()).then(|| line.to_string())
    }
}
