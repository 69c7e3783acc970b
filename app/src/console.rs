//! Console commands read between process numbers.

use paineel_core::RunControl;
use paineel_monitor::RunStats;
use std::io::BufRead;
use std::sync::{Arc, Mutex, PoisonError};

const HELP: &str = "\
Commands:
  p      pause / resume
  s      toggle step mode (ENTER runs the next number)
  q      stop after the current number
  i      show progress
  h      this help
  ENTER  next number in step mode";

/// What a console line asks for.
#[derive(Debug, PartialEq, Eq)]
pub enum ConsoleCommand {
    TogglePause,
    ToggleStep,
    Quit,
    Info,
    Help,
    Step,
    Unknown(String),
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> Self {
        match line.trim().to_lowercase().as_str() {
            "p" => Self::TogglePause,
            "s" => Self::ToggleStep,
            "q" => Self::Quit,
            "i" => Self::Info,
            "h" | "?" => Self::Help,
            "" => Self::Step,
            other => Self::Unknown(other.to_string()),
        }
    }
}

pub fn apply(command: &ConsoleCommand, control: &RunControl, stats: &Mutex<RunStats>) {
    match command {
        ConsoleCommand::TogglePause => {
            if control.toggle_pause() {
                println!("Paused. Press p to resume.");
            } else {
                println!("Resumed.");
            }
        }
        ConsoleCommand::ToggleStep => {
            if control.toggle_step_mode() {
                println!("Step mode on. Press ENTER for each number.");
            } else {
                println!("Step mode off.");
            }
        }
        ConsoleCommand::Quit => {
            println!("Stopping after the current number...");
            control.cancel();
        }
        ConsoleCommand::Info => {
            let stats = stats.lock().unwrap_or_else(PoisonError::into_inner);
            println!("{}", stats.progress_line());
        }
        ConsoleCommand::Help => println!("{HELP}"),
        ConsoleCommand::Step => control.step(),
        ConsoleCommand::Unknown(other) => println!("Unknown command '{other}', h for help."),
    }
}

/// Read commands from stdin on a detached thread until stdin closes or the
/// run is cancelled.
pub fn spawn(control: RunControl, stats: Arc<Mutex<RunStats>>) {
    println!("{HELP}");
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            apply(&ConsoleCommand::parse(&line), &control, &stats);
            if control.is_cancelled() {
                break;
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(ConsoleCommand::parse(" P "), ConsoleCommand::TogglePause);
        assert_eq!(ConsoleCommand::parse(""), ConsoleCommand::Step);
        assert_eq!(ConsoleCommand::parse("q"), ConsoleCommand::Quit);
        assert_eq!(
            ConsoleCommand::parse("x"),
            ConsoleCommand::Unknown("x".to_string())
        );
    }

    #[test]
    fn test_apply_flips_control_state() {
        let control = RunControl::new();
        let stats = Mutex::new(RunStats::new(2));

        apply(&ConsoleCommand::TogglePause, &control, &stats);
        assert!(control.is_paused());
        apply(&ConsoleCommand::TogglePause, &control, &stats);
        assert!(!control.is_paused());

        apply(&ConsoleCommand::ToggleStep, &control, &stats);
        assert!(control.is_step_mode());

        apply(&ConsoleCommand::Quit, &control, &stats);
        assert!(control.is_cancelled());
    }
}
