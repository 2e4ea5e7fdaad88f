//! Dispatch, error reporting and argument helpers shared by the shell and
//! the command handlers.

use std::io;

use ledgerwise_domain::Month;
use rustyline::error::ReadlineError;
use strsim::levenshtein;
use tracing::warn;

use crate::errors::AppError;

use super::output;
pub use super::shell_context::{CliMode, ShellContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopControl {
    Continue,
    Exit,
}

pub type CommandResult = Result<(), CommandError>;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("{0}")]
    InvalidArguments(String),
    #[error(transparent)]
    App(#[from] AppError),
    #[error("exit requested")]
    ExitRequested,
}

/// Failures that end the shell itself.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    App(#[from] AppError),
    #[error("Line editor error: {0}")]
    Readline(#[from] ReadlineError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ShellContext {
    pub(crate) fn dispatch(
        &mut self,
        command: &str,
        raw: &str,
        args: &[&str],
    ) -> Result<LoopControl, CommandError> {
        let Some(handler) = self.registry.handler(command) else {
            self.suggest_command(raw);
            return Ok(LoopControl::Continue);
        };
        match handler(self, args) {
            Ok(()) => Ok(LoopControl::Continue),
            Err(CommandError::ExitRequested) => Ok(LoopControl::Exit),
            Err(err) => Err(err),
        }
    }

    #[cfg(test)]
    pub(crate) fn process_line(&mut self, line: &str) -> Result<LoopControl, CommandError> {
        let tokens = crate::cli::shell::tokenize(line).map_err(CommandError::InvalidArguments)?;
        let Some((raw, rest)) = tokens.split_first() else {
            return Ok(LoopControl::Continue);
        };
        let args: Vec<&str> = rest.iter().map(String::as_str).collect();
        self.dispatch(&raw.to_lowercase(), raw, &args)
    }

    pub(crate) fn suggest_command(&self, input: &str) {
        output::warning(format!(
            "Unknown command `{input}`. Type `help` to see available commands."
        ));

        let needle = input.to_lowercase();
        let best = self
            .registry
            .names()
            .map(|name| (levenshtein(name, &needle), name))
            .min_by_key(|(distance, _)| *distance);

        if let Some((distance, name)) = best {
            if distance <= 3 {
                output::hint(format!("Did you mean `{name}`?"));
            }
        }
    }

    pub(crate) fn report_error(&self, err: CommandError) {
        match err {
            CommandError::ExitRequested => {}
            CommandError::InvalidArguments(message) => {
                output::error(message);
                output::hint("Use `help <command>` for usage details.");
            }
            CommandError::App(err) => {
                warn!(user = %self.app.user(), error = %err, "command failed");
                output::error(err.user_message());
            }
        }
    }
}

pub(crate) fn invalid(message: impl Into<String>) -> CommandError {
    CommandError::InvalidArguments(message.into())
}

pub(crate) fn parse_month(input: &str) -> Result<Month, CommandError> {
    input.parse().map_err(|err| invalid(format!("{err}")))
}

/// Reads an optional trailing `YYYY-MM` argument.
pub(crate) fn optional_month(args: &[&str]) -> Result<Option<Month>, CommandError> {
    match args {
        [] => Ok(None),
        [month] => parse_month(month).map(Some),
        _ => Err(invalid("expected at most one month argument (YYYY-MM)")),
    }
}

/// Parses an amount, tolerating a leading `$` and thousands separators.
pub(crate) fn parse_amount(input: &str) -> Result<f64, CommandError> {
    let cleaned: String = input
        .chars()
        .filter(|ch| !matches!(ch, '$' | ','))
        .collect();
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| invalid(format!("invalid amount `{input}`")))
}

#[cfg(test)]
pub(crate) fn process_script(
    app: crate::app::LedgerApp,
    lines: &[&str],
) -> Result<ShellContext, CommandError> {
    let mut context = ShellContext::with_app(CliMode::Script, app);
    for line in lines {
        match context.process_line(line)? {
            LoopControl::Continue => {}
            LoopControl::Exit => break,
        }
    }
    Ok(context)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_accept_currency_formatting() {
        assert_eq!(parse_amount("$1,250.50").unwrap(), 1250.5);
        assert!(parse_amount("abc").is_err());
        assert!(parse_amount("inf").is_err());
    }

    #[test]
    fn months_are_optional_and_validated() {
        assert_eq!(optional_month(&[]).unwrap(), None);
        assert_eq!(
            optional_month(&["2024-06"]).unwrap(),
            Month::new(2024, 6)
        );
        assert!(optional_month(&["June"]).is_err());
        assert!(optional_month(&["2024-06", "2024-07"]).is_err());
    }
}
