// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use std::io::{self, Write};

use crossterm::{
    style::{Color, ResetColor, SetForegroundColor},
    ExecutableCommand,
};
use tokio::io::{AsyncBufReadExt, BufReader};

use relay::chat::Chat;
use relay::cli::MultilineInput;
use relay::error::Result;

fn print_prompt(input: &MultilineInput) -> Result<()> {
    let mut stdout = io::stdout();
    let color = if input.is_multiline() {
        Color::DarkGrey
    } else {
        Color::Green
    };
    stdout.execute(SetForegroundColor(color))?;
    print!("{}", input.prompt());
    stdout.execute(ResetColor)?;
    stdout.flush()?;
    Ok(())
}

fn print_error(error: &relay::RelayError) -> Result<()> {
    let mut stdout = io::stdout();
    stdout.execute(SetForegroundColor(Color::Red))?;
    println!("error: {}", error);
    stdout.execute(ResetColor)?;
    Ok(())
}

/// Interactive loop. EOF or Ctrl-C ends the session.
pub(super) async fn run(mut chat: Chat) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut input = MultilineInput::new();

    loop {
        print_prompt(&input)?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };
        let Some(message) = input.feed(&line) else {
            continue;
        };

        let outcome = tokio::select! {
            result = chat.send(message) => Some(result),
            _ = tokio::signal::ctrl_c() => None,
        };

        match outcome {
            None => {
                println!();
                break;
            }
            Some(Ok(_)) => {}
            Some(Err(error)) => {
                tracing::warn!(target: "relay.chat.engine", error = %error, "turn failed");
                print_error(&error)?;
            }
        }
    }

    println!("bye");
    Ok(())
}
