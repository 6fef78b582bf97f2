// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! relay - a tool-calling chat loop over OpenAI-compatible completion APIs.
//!
//! This crate exposes the runtime used by the `relay` CLI (`src/main.rs`):
//! - `chat`: stream assembly, the request/tool loop and terminal display
//! - `llm`: message model, provider abstraction, retry and the HTTP provider
//! - `tools`: tool trait, registry, schema building and demo tools
//! - `config`: settings file handling
//! - `cli`: argument parsing and interactive line input

pub mod chat;
pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod tools;

pub use error::{RelayError, Result};
