//! Command-line REPL: textual commands → page input events
//!
//! ```text
//! press Fader1 0.5        absolute value (default 1)
//! release Mute1           absolute 0
//! turn Rotary1 -1 [2]     relative delta, optional acceleration index
//! raw Rotary1 65          raw encoder byte
//! touch Fader1 [0|1]      touch sensor (default 1)
//! Extender:press Fader1   any input command, on a named surface
//! status | tree | help | quit
//! ```

use crate::page::{InputEvent, InputKind, Page};
use anyhow::{anyhow, bail, Context, Result};
use colored::*;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio::sync::mpsc;

/// Parsed REPL line
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    Input(InputEvent),
    Status,
    Tree,
    Help,
    Quit,
}

pub const HELP: &str = "\
press <widget> [value]      absolute value (default 1)
release <widget>            absolute 0
turn <widget> <delta> [acc] relative step
raw <widget> <byte>         raw encoder value
touch <widget> [value]      touch (default 1)
<surface>:<command> ...     target a specific surface
status | tree | help | quit";

fn number<T: std::str::FromStr>(token: Option<&str>, what: &str) -> Result<Option<T>> {
    token
        .map(|t| t.parse::<T>().map_err(|_| anyhow!("invalid {} '{}'", what, t)))
        .transpose()
}

/// Parse one line; `Ok(None)` for blank lines
pub fn parse_command(line: &str) -> Result<Option<ReplCommand>> {
    let mut tokens = line.split_whitespace();
    let Some(head) = tokens.next() else {
        return Ok(None);
    };

    let (surface, verb) = match head.split_once(':') {
        Some((surface, verb)) if !surface.is_empty() => (Some(surface.to_string()), verb),
        _ => (None, head),
    };

    let verb = verb.to_ascii_lowercase();
    match verb.as_str() {
        "status" => return Ok(Some(ReplCommand::Status)),
        "tree" => return Ok(Some(ReplCommand::Tree)),
        "help" | "?" => return Ok(Some(ReplCommand::Help)),
        "quit" | "exit" => return Ok(Some(ReplCommand::Quit)),
        _ => {}
    }

    let widget = tokens
        .next()
        .with_context(|| format!("'{}' needs a widget name", verb))?
        .to_string();

    let kind = match verb.as_str() {
        "press" => InputKind::Absolute(number(tokens.next(), "value")?.unwrap_or(1.0)),
        "release" => InputKind::Absolute(0.0),
        "turn" => {
            let delta = number(tokens.next(), "delta")?.context("turn needs a delta")?;
            let acceleration = number(tokens.next(), "acceleration index")?;
            InputKind::Relative { delta, acceleration }
        }
        "raw" => InputKind::RelativeRaw(number(tokens.next(), "raw value")?.context("raw needs a value 0-127")?),
        "touch" => InputKind::Touch(number(tokens.next(), "value")?.unwrap_or(1.0)),
        other => bail!("unknown command '{}' (try 'help')", other),
    };

    if let Some(extra) = tokens.next() {
        bail!("unexpected argument '{}'", extra);
    }

    Ok(Some(ReplCommand::Input(InputEvent {
        surface,
        widget,
        kind,
    })))
}

/// Blocking REPL loop; run it on its own thread
///
/// Parsed commands go to the tick loop. EOF simply ends the REPL; `quit`
/// asks the tick loop to stop.
pub fn run_repl(tx: mpsc::Sender<ReplCommand>) -> Result<()> {
    let mut rl = DefaultEditor::new()?;

    loop {
        match rl.readline("zones> ") {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());
                match parse_command(&line) {
                    Ok(Some(command)) => {
                        let quit = command == ReplCommand::Quit;
                        if tx.blocking_send(command).is_err() || quit {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => println!("{} {}", "✗".red(), e),
                }
            }
            Err(ReadlineError::Interrupted) => {
                let _ = tx.blocking_send(ReplCommand::Quit);
                break;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}

/// Print every surface's zone tree
pub fn print_tree(page: &Page) {
    println!("\n{} {}", "Page".bold(), page.name().cyan().bold());
    for surface in page.surfaces() {
        println!(
            "\n{} {} ({} widgets, {} zones)",
            "▸".bold(),
            surface.name().yellow().bold(),
            surface.widget_count(),
            surface.zone_count()
        );
        for line in surface.tree() {
            let marker = if line.active { "●".green() } else { "○".dimmed() };
            println!(
                "  {}{} {} {} {}",
                "  ".repeat(line.depth),
                marker,
                line.name.bold(),
                format!("[{:?} {} #{}]", line.role, line.navigator, line.slot_index).dimmed(),
                format!("{} bindings", line.bindings).blue()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(line: &str) -> InputEvent {
        match parse_command(line).unwrap() {
            Some(ReplCommand::Input(event)) => event,
            other => panic!("expected input, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_press() {
        let event = input("press Fader1 0.5");
        assert_eq!(event.widget, "Fader1");
        assert_eq!(event.kind, InputKind::Absolute(0.5));
        assert_eq!(event.surface, None);

        assert_eq!(input("press Mute3").kind, InputKind::Absolute(1.0));
        assert_eq!(input("release Mute3").kind, InputKind::Absolute(0.0));
    }

    #[test]
    fn test_parse_relative() {
        assert_eq!(
            input("turn Rotary1 -1").kind,
            InputKind::Relative {
                delta: -1.0,
                acceleration: None
            }
        );
        assert_eq!(
            input("turn Rotary1 1 3").kind,
            InputKind::Relative {
                delta: 1.0,
                acceleration: Some(3)
            }
        );
        assert_eq!(input("raw Rotary1 65").kind, InputKind::RelativeRaw(65));
        assert_eq!(input("touch Fader2 0").kind, InputKind::Touch(0.0));
    }

    #[test]
    fn test_parse_surface_prefix() {
        let event = input("Extender:press Fader1 0.2");
        assert_eq!(event.surface.as_deref(), Some("Extender"));
        assert_eq!(event.kind, InputKind::Absolute(0.2));
    }

    #[test]
    fn test_parse_control_commands() {
        assert_eq!(parse_command("status").unwrap(), Some(ReplCommand::Status));
        assert_eq!(parse_command("TREE").unwrap(), Some(ReplCommand::Tree));
        assert_eq!(parse_command("exit").unwrap(), Some(ReplCommand::Quit));
        assert_eq!(parse_command("   ").unwrap(), None);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_command("press").is_err());
        assert!(parse_command("turn Rotary1").is_err());
        assert!(parse_command("raw Rotary1 300").is_err());
        assert!(parse_command("press Fader1 loud").is_err());
        assert!(parse_command("fly Fader1").is_err());
        assert!(parse_command("press Fader1 1 2").is_err());
    }
}
