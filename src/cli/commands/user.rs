use crate::cli::core::{invalid, parse_amount, CommandResult, ShellContext};
use crate::cli::output;
use crate::cli::registry::CommandEntry;

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "wage",
            "Show or set the true hourly wage",
            "wage [<rate> | <net-income> <work-costs> <hours> | clear]",
            cmd_wage,
        ),
        CommandEntry::new(
            "rebuild",
            "Recompute the aggregate from every ledger entry",
            "rebuild",
            cmd_rebuild,
        ),
        CommandEntry::new(
            "user",
            "Show users or switch the active one",
            "user [name]",
            cmd_user,
        ),
    ]
}

fn cmd_wage(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let outcome = match args {
        [] => {
            match context.app.aggregate()?.true_hourly_wage {
                Some(wage) => output::info(format!(
                    "True hourly wage: {}/hour",
                    context.app.money_format().format(wage)
                )),
                None => output::info("No true hourly wage set. Use `wage <rate>` to set one."),
            }
            return Ok(());
        }
        ["clear"] => context.app.set_wage(None)?,
        [rate] => context.app.set_wage(Some(parse_amount(rate)?))?,
        [net, costs, hours] => context.app.derive_wage(
            parse_amount(net)?,
            parse_amount(costs)?,
            parse_amount(hours)?,
        )?,
        _ => {
            return Err(invalid(
                "usage: wage [<rate> | <net-income> <work-costs> <hours> | clear]",
            ))
        }
    };

    match outcome.aggregate.true_hourly_wage {
        Some(wage) => output::success(format!(
            "True hourly wage set to {}/hour",
            context.app.money_format().format(wage)
        )),
        None => output::success("True hourly wage cleared."),
    }
    Ok(())
}

fn cmd_rebuild(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    if !args.is_empty() {
        return Err(invalid("usage: rebuild"));
    }
    let outcome = context.app.rebuild()?;
    if outcome.changed {
        output::success(format!(
            "Aggregate rebuilt (version {}).",
            outcome.aggregate.version
        ));
    } else {
        output::info("Aggregate already up to date.");
    }
    Ok(())
}

fn cmd_user(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    match args {
        [] => {
            output::info(format!("Active user: {}", context.app.user()));
            let users = context.app.users()?;
            if !users.is_empty() {
                output::section("Known users");
                output::lines(users.iter().map(|user| format!("  {user}")));
            }
            Ok(())
        }
        [name] => {
            context.app.switch_user(name)?;
            output::success(format!("Switched to user `{}`.", context.app.user()));
            Ok(())
        }
        _ => Err(invalid("usage: user [name]")),
    }
}
