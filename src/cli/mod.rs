pub mod commands;
pub mod core;
pub mod help;
pub mod output;
pub mod registry;
pub mod render;
pub mod shell;
pub mod shell_context;

pub use shell::run_cli;
