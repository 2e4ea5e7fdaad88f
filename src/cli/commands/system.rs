use crate::cli::core::{invalid, CommandError, CommandResult, ShellContext};
use crate::cli::help;
use crate::cli::output;
use crate::cli::registry::CommandEntry;
use crate::utils::build_info;

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new("version", "Show build metadata", "version", cmd_version),
        CommandEntry::new(
            "help",
            "Show available commands",
            "help [command]",
            cmd_help,
        ),
        CommandEntry::new(
            "backup",
            "Save a copy of the current configuration",
            "backup [note]",
            cmd_backup,
        ),
        CommandEntry::new(
            "backups",
            "List configuration backups, newest first",
            "backups",
            cmd_backups,
        ),
        CommandEntry::new(
            "restore",
            "Replace the configuration with a backup",
            "restore <backup-name>",
            cmd_restore,
        ),
        CommandEntry::new(
            "snapshots",
            "List or restore earlier aggregates of the active user",
            "snapshots [restore <id>]",
            cmd_snapshots,
        ),
        CommandEntry::new("exit", "Exit the shell", "exit", cmd_exit),
    ]
}

fn cmd_version(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let meta = build_info::current();
    output::section(format!("Ledgerwise {}", meta.version));
    output::line(format!("  Build hash   : {} ({})", meta.git_hash, meta.git_status));
    output::line(format!("  Built at     : {}", meta.timestamp));
    output::line(format!("  Target       : {}", meta.target));
    output::line(format!("  Profile      : {}", meta.profile));
    output::line(format!("  Rustc        : {}", meta.rustc));
    output::line(format!("  Extractor    : {}", context.app.config().extractor.model));
    Ok(())
}

fn cmd_help(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    match args.first() {
        Some(name) => match context.command(&name.to_lowercase()) {
            Some(entry) => help::print_command(entry),
            None => context.suggest_command(name),
        },
        None => help::print_overview(&context.registry),
    }
    Ok(())
}

fn cmd_backup(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let note = args.join(" ");
    let note = (!note.trim().is_empty()).then_some(note.as_str());
    let backup = context.app.backup_config(note)?;
    output::success(format!("Configuration saved as {}", backup.name));
    Ok(())
}

fn cmd_backups(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    if !args.is_empty() {
        return Err(invalid("usage: backups"));
    }
    let backups = context.app.config_backups()?;
    if backups.is_empty() {
        output::info("No configuration backups yet. Use `backup [note]` to create one.");
        return Ok(());
    }
    output::section("Configuration backups");
    output::lines(backups.iter().map(|backup| {
        let kind = if backup.is_automatic() { "auto" } else { "manual" };
        let when = backup
            .created_at
            .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        format!("  {:<46} {when}  {kind}", backup.name)
    }));
    Ok(())
}

fn cmd_restore(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let [name] = args else {
        return Err(invalid("usage: restore <backup-name>"));
    };
    context.app.restore_config(name)?;
    output::success(format!(
        "Configuration restored from {name}. Active user: {}",
        context.app.user()
    ));
    Ok(())
}

fn cmd_snapshots(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    match args {
        [] => {
            let snapshots = context.app.aggregate_backups()?;
            if snapshots.is_empty() {
                output::info(format!("No aggregate snapshots for {}.", context.app.user()));
                return Ok(());
            }
            output::section(format!("Aggregate snapshots for {}", context.app.user()));
            output::lines(snapshots.iter().map(|snapshot| {
                let when = snapshot
                    .created_at
                    .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                format!("  {:<38} {when}  {} bytes", snapshot.id, snapshot.size_bytes)
            }));
            Ok(())
        }
        ["restore", id] => {
            let restored = context.app.restore_aggregate(id)?;
            output::success(format!(
                "Aggregate restored from {id} (version {}).",
                restored.version
            ));
            Ok(())
        }
        _ => Err(invalid("usage: snapshots [restore <id>]")),
    }
}

fn cmd_exit(_context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    Err(CommandError::ExitRequested)
}
