// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! CLI module for relay
//!
//! Handles command-line argument parsing and interactive line input.

pub mod args;
pub mod input;

pub use args::*;
pub use input::MultilineInput;
