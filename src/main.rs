// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! relay - chat with a model that can call your tools
//!
//! Entry point for the relay CLI application.

use std::sync::Arc;

use clap::Parser;

use relay::chat::{Chat, TerminalDisplay};
use relay::cli::Cli;
use relay::config::Settings;
use relay::error::Result;
use relay::llm::providers::OpenAiProvider;
use relay::tools::builtin::register_demo_tools;

#[path = "main/repl.rs"]
mod repl;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Credentials may live in a local .env file
    dotenvy::dotenv().ok();

    // Initialize tracing. `RUST_LOG` still takes precedence.
    let mut env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::WARN.into());
    for directive in cli.verbose_directives() {
        if let Ok(parsed) = directive.parse() {
            env_filter = env_filter.add_directive(parsed);
        }
    }
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    // Load settings, then let flags override them
    let mut settings = match &cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };
    cli.apply(&mut settings);
    settings.validate()?;

    let provider = OpenAiProvider::from_settings(&settings)?;
    let mut chat =
        Chat::from_settings(Arc::new(provider), &settings).with_observer(TerminalDisplay::stdout());

    if cli.demo_tools {
        register_demo_tools(chat.tools_mut());
    }

    tracing::debug!(
        target: "relay.chat.engine",
        model = %settings.provider.default_model,
        tools = chat.tools().len(),
        "starting interactive session"
    );

    repl::run(chat).await
}
