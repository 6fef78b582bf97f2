// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! CLI argument definitions using Clap

use clap::Parser;
use std::path::PathBuf;

use crate::config::Settings;

/// relay - chat with a model that can call your tools
#[derive(Parser, Debug, Default)]
#[command(name = "relay")]
#[command(version, about = "Chat with a model that can call your tools")]
pub struct Cli {
    /// Model to use (overrides provider.default_model)
    #[arg(short, long)]
    pub model: Option<String>,

    /// System prompt for the conversation
    #[arg(short, long)]
    pub system: Option<String>,

    /// Base URL of the OpenAI-compatible API
    #[arg(long)]
    pub base_url: Option<String>,

    /// Tool choice policy: auto, none, required or a tool name
    #[arg(long)]
    pub tool_choice: Option<String>,

    /// Maximum tool rounds per message (0 for no limit)
    #[arg(long)]
    pub max_tool_rounds: Option<usize>,

    /// Register the demo weather and location tools
    #[arg(long)]
    pub demo_tools: bool,

    /// Config file path
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Overlay command-line flags onto loaded settings
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(model) = &self.model {
            settings.provider.default_model = model.clone();
        }
        if let Some(system) = &self.system {
            settings.conversation.system_prompt = Some(system.clone());
        }
        if let Some(base_url) = &self.base_url {
            // An explicit flag wins over the environment
            settings.provider.base_url = base_url.clone();
            settings.provider.base_url_env = String::new();
        }
        if let Some(tool_choice) = &self.tool_choice {
            settings.conversation.tool_choice = tool_choice.clone();
        }
        if let Some(rounds) = self.max_tool_rounds {
            settings.conversation.max_tool_rounds = rounds;
        }
    }

    /// Tracing directives enabled by `-v`
    pub fn verbose_directives(&self) -> &'static [&'static str] {
        match self.verbose {
            0 => &[],
            1 => &["relay.chat.engine=debug", "relay.tools=debug"],
            _ => &[
                "relay.chat.engine=debug",
                "relay.tools=debug",
                "relay.llm=debug",
                "relay.config=debug",
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let cli = Cli::try_parse_from(["relay"]).unwrap();
        assert!(cli.model.is_none());
        assert!(!cli.demo_tools);
        assert_eq!(cli.verbose, 0);
        assert!(cli.verbose_directives().is_empty());
    }

    #[test]
    fn test_parse_all_flags() {
        let cli = Cli::try_parse_from([
            "relay",
            "--model",
            "gpt-4o",
            "--system",
            "be brief",
            "--base-url",
            "http://localhost:8000/v1",
            "--tool-choice",
            "required",
            "--max-tool-rounds",
            "4",
            "--demo-tools",
            "--config",
            "/tmp/relay.json",
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.model.as_deref(), Some("gpt-4o"));
        assert_eq!(cli.max_tool_rounds, Some(4));
        assert!(cli.demo_tools);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/relay.json")));
        assert_eq!(cli.verbose, 2);
        assert!(cli.verbose_directives().contains(&"relay.llm=debug"));
    }

    #[test]
    fn test_parse_rejects_bad_round_count() {
        assert!(Cli::try_parse_from(["relay", "--max-tool-rounds", "many"]).is_err());
    }

    #[test]
    fn test_apply_overrides_settings() {
        let cli = Cli::try_parse_from([
            "relay",
            "-m",
            "gpt-4o-mini",
            "-s",
            "be kind",
            "--base-url",
            "http://localhost:8000/v1",
            "--max-tool-rounds",
            "0",
        ])
        .unwrap();

        let mut settings = Settings::default();
        cli.apply(&mut settings);

        assert_eq!(settings.provider.default_model, "gpt-4o-mini");
        assert_eq!(settings.conversation.system_prompt.as_deref(), Some("be kind"));
        assert_eq!(settings.get_base_url(), "http://localhost:8000/v1");
        assert_eq!(settings.conversation.max_tool_rounds, 0);
        assert_eq!(settings.conversation.tool_choice, "auto");
    }

    #[test]
    fn test_apply_without_flags_keeps_settings() {
        let mut settings = Settings::default();
        Cli::default().apply(&mut settings);
        assert_eq!(settings, Settings::default());
    }
}
