// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Chat session management
//!
//! Turns streamed completions into messages, drives the tool loop and
//! renders the conversation.

pub mod assembler;
pub mod display;
pub mod engine;

pub use assembler::{MessageKind, StreamAssembler};
pub use display::TerminalDisplay;
pub use engine::{Chat, ChatConfig, ChatObserver, NoopObserver, RequestClient};
