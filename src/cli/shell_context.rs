use crate::app::LedgerApp;

use super::commands;
use super::core::CliError;
use super::output;
use super::registry::{CommandEntry, CommandRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliMode {
    Interactive,
    Script,
}

pub struct ShellContext {
    pub mode: CliMode,
    pub registry: CommandRegistry,
    pub app: LedgerApp,
    pub last_command: Option<String>,
    pub running: bool,
}

impl ShellContext {
    pub fn new(mode: CliMode) -> Result<Self, CliError> {
        let app = LedgerApp::open()?;
        Ok(Self::with_app(mode, app))
    }

    pub fn with_app(mode: CliMode, app: LedgerApp) -> Self {
        output::set_color_enabled(mode == CliMode::Interactive && app.config().ui_color_enabled);

        let mut registry = CommandRegistry::new();
        commands::register_all(&mut registry);

        Self {
            mode,
            registry,
            app,
            last_command: None,
            running: true,
        }
    }

    pub fn prompt(&self) -> String {
        format!("ledgerwise[{}]> ", self.app.user())
    }

    pub fn command(&self, name: &str) -> Option<&CommandEntry> {
        self.registry.get(name)
    }

    pub fn command_names(&self) -> Vec<&'static str> {
        self.registry.names().collect()
    }
}
